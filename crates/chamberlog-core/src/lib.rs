//! # chamberlog-core
//!
//! Telemetry pipeline for a heated print chamber: a microcontroller prints
//! bed temperature, ambient temperature, humidity and fan PWM as one CSV line
//! per reading; this crate turns those lines into a durable session log, a
//! live window for on-screen charts, and batch statistics after the fact.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::atomic::AtomicBool;
//! use chamberlog_core::{ReplayTransport, Session, SessionConfig};
//!
//! let config = SessionConfig {
//!     log_path: Some("chamber_log.csv".into()),
//!     ..Default::default()
//! };
//! let mut session = Session::new(config);
//! session.connect(|| ReplayTransport::open("capture.txt")).unwrap();
//! let summary = session.run(&AtomicBool::new(false), &mut ()).unwrap();
//! println!("{} logged, {} rejected", summary.counts.samples_logged, summary.counts.lines_rejected);
//!
//! let samples = chamberlog_core::analysis::load("chamber_log.csv").unwrap();
//! let report = chamberlog_core::summarize(&samples).unwrap();
//! println!("bed mean {:.2}", report.bed_temp.mean);
//! ```
//!
//! ## Architecture
//!
//! Transport → Parser → (Session log, Live window) → Renderer
//!
//! The [`Session`] drives a single read loop. Accepted samples are written to
//! the [`SessionLog`] first, then pushed into the [`LiveWindow`]. Rejected
//! lines are counted and skipped. The [`analysis`] module reads a finished log
//! back and summarizes it.

pub mod analysis;
pub mod clock;
pub mod error;
pub mod logger;
pub mod sample;
pub mod session;
pub mod transport;
pub mod window;

pub use analysis::{ChannelStats, Report, TimeUnit, elapsed_axis, summarize};
pub use clock::{Clock, IngestClock, SteppingClock, SystemClock};
pub use error::{AnalysisError, LogError, SessionError};
pub use logger::{DEFAULT_LOG_FILE, LOG_HEADER, SessionLog};
pub use sample::{Channel, RejectionReason, Sample, parse_line};
pub use session::{
    Session, SessionConfig, SessionCounts, SessionObserver, SessionState, SessionSummary, Step,
    StopCause,
};
pub use transport::{
    LineReader, ReadOutcome, ReplayTransport, SerialConfig, SerialTransport, Transport,
};
pub use window::{DEFAULT_WINDOW_CAPACITY, LiveWindow, WindowSnapshot};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
