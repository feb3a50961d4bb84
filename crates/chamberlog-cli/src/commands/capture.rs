//! `chamberlog log`: capture telemetry into a durable session log.

use std::path::PathBuf;

use chamberlog_core::{
    Channel, RejectionReason, Sample, Session, SessionConfig, SessionObserver, Transport,
};

use super::{InputSource, install_interrupt_handler, print_summary};

/// Without `--verbose`, a progress line is printed every this many samples.
const PROGRESS_EVERY: u64 = 10;

pub struct CaptureCommandConfig {
    pub input: InputSource,
    pub output: PathBuf,
    pub verbose: bool,
}

/// Prints sample progress and, in verbose mode, rejected lines.
struct Progress {
    verbose: bool,
}

impl SessionObserver for Progress {
    fn on_sample(&mut self, seq: u64, sample: &Sample) {
        if self.verbose || seq % PROGRESS_EVERY == 0 {
            println!("{}", progress_line(seq, sample));
        }
    }

    fn on_rejected(&mut self, line: &str, reason: &RejectionReason) {
        if self.verbose {
            println!("  invalid line {line:?}: {reason}");
        }
    }
}

fn progress_line(seq: u64, sample: &Sample) -> String {
    format!(
        "[{seq:04}] Bed: {}°C | Ambient: {}°C | Humidity: {}% | Fan: {}",
        sample.field_text(Channel::BedTemp),
        sample.field_text(Channel::AmbTemp),
        sample.field_text(Channel::Humidity),
        sample.field_text(Channel::FanSpeed),
    )
}

pub fn run(cfg: CaptureCommandConfig) {
    println!("Connecting to {}...", cfg.input.describe());

    let config = SessionConfig {
        log_path: Some(cfg.output.clone()),
        ..SessionConfig::default()
    };
    let mut session: Session<Box<dyn Transport>> = Session::new(config);
    if let Err(e) = session.connect(|| cfg.input.open(None)) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }

    println!("Connected.");
    println!("Saving samples to {}", cfg.output.display());
    println!("Press Ctrl+C to stop.");
    println!();

    let stop = install_interrupt_handler();
    let mut progress = Progress {
        verbose: cfg.verbose,
    };
    match session.run(&stop, &mut progress) {
        Ok(summary) => {
            println!();
            print_summary(&summary);
        }
        Err(e) => {
            let counts = session.counts();
            eprintln!();
            eprintln!("Error: {e}");
            eprintln!(
                "  {} samples were saved to {} before the failure",
                counts.samples_logged,
                cfg.output.display()
            );
            std::process::exit(1);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
