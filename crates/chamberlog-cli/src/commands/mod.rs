pub mod analyze;
pub mod capture;
pub mod live;

use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chamberlog_core::{ReplayTransport, SerialConfig, SerialTransport, SessionSummary, StopCause, Transport};

/// Where wire lines come from: the heater's serial port or a replay file.
#[derive(Debug, Clone)]
pub enum InputSource {
    Serial(SerialConfig),
    Replay(PathBuf),
}

impl InputSource {
    pub fn new(port: &str, baud: u32, replay: Option<PathBuf>) -> Self {
        match replay {
            Some(path) => Self::Replay(path),
            None => Self::Serial(SerialConfig {
                port: port.to_string(),
                baud,
                ..SerialConfig::default()
            }),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Self::Serial(c) => format!("{} ({} baud)", c.port, c.baud),
            Self::Replay(path) => format!("replay {}", path.display()),
        }
    }

    /// Open the transport. Replayed lines are spaced by `pace` when given.
    pub fn open(&self, pace: Option<Duration>) -> io::Result<Box<dyn Transport>> {
        match self {
            Self::Serial(config) => Ok(Box::new(SerialTransport::open(config)?)),
            Self::Replay(path) => {
                let replay = ReplayTransport::open(path)?;
                Ok(match pace {
                    Some(interval) => Box::new(replay.with_pace(interval)),
                    None => Box::new(replay),
                })
            }
        }
    }
}

/// Install a Ctrl+C handler and return the flag it raises.
pub fn install_interrupt_handler() -> Arc<AtomicBool> {
    let stop = Arc::new(AtomicBool::new(false));
    let s = stop.clone();
    if let Err(e) = ctrlc::set_handler(move || s.store(true, Ordering::SeqCst)) {
        log::warn!("could not install Ctrl+C handler: {e}");
    }
    stop
}

/// Convert a `--refresh` value in seconds, clamped to a usable range.
pub fn refresh_interval(secs: f64) -> Duration {
    let secs = if secs.is_finite() { secs } else { 2.0 };
    Duration::from_secs_f64(secs.clamp(0.1, 60.0))
}

pub fn print_summary(summary: &SessionSummary) {
    let how = match summary.stop_cause {
        StopCause::Interrupted => "stopped",
        StopCause::EndOfStream => "input ended",
    };
    println!("Session {how} after {:.1}s.", summary.elapsed.as_secs_f64());
    match &summary.log_path {
        Some(path) => println!(
            "  {} samples saved to {}",
            summary.counts.samples_logged,
            path.display()
        ),
        None => println!("  {} samples received (not logged)", summary.counts.samples_accepted),
    }
    println!("  {} lines rejected", summary.counts.lines_rejected);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
