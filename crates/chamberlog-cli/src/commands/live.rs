//! `chamberlog live`: live terminal charts, optionally logging as well.

use std::path::PathBuf;
use std::time::Duration;

use chamberlog_core::{Session, SessionConfig, StopCause, Transport};

use super::{InputSource, install_interrupt_handler, print_summary, refresh_interval};
use crate::tui::app::LiveApp;

/// Spacing between replayed lines, so a replay scrolls like a live sensor.
const REPLAY_PACE: Duration = Duration::from_millis(250);

pub struct LiveCommandConfig {
    pub input: InputSource,
    pub points: usize,
    pub refresh: f64,
    pub output: Option<PathBuf>,
}

pub fn run(cfg: LiveCommandConfig) {
    let config = SessionConfig {
        log_path: cfg.output.clone(),
        window_capacity: Some(cfg.points.max(1)),
        redraw_interval: refresh_interval(cfg.refresh),
        ..SessionConfig::default()
    };

    println!("Connecting to {}...", cfg.input.describe());
    let mut session: Session<Box<dyn Transport>> = Session::new(config);
    if let Err(e) = session.connect(|| cfg.input.open(Some(REPLAY_PACE))) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }

    let stop = install_interrupt_handler();
    let mut app = match LiveApp::enter(cfg.input.describe(), cfg.output.clone()) {
        Ok(app) => app,
        Err(e) => {
            session.abort();
            eprintln!("TUI error: {e}");
            std::process::exit(1);
        }
    };

    let result = session.run(&stop, &mut app);
    if let Ok(summary) = &result
        && summary.stop_cause == StopCause::EndOfStream
        && let Err(e) = app.wait_for_quit(&stop)
    {
        log::warn!("waiting for quit: {e}");
    }

    // Restore the terminal before printing anything.
    if let Err(e) = app.restore() {
        eprintln!("TUI error: {e}");
    }
    if let Some(path) = app.last_export() {
        println!("Snapshot saved to {}", path.display());
    }
    drop(app);

    match result {
        Ok(summary) => print_summary(&summary),
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}
