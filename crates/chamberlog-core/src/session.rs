//! Capture session orchestrator.
//!
//! A [`Session`] moves through
//! `Idle -> Connecting -> Streaming -> Draining -> Closed`. Connection
//! failures and fatal mid-stream failures go straight to `Closed`. `Closed` is
//! terminal: every further operation fails with [`SessionError::InvalidState`].
//!
//! While streaming, each wire line is parsed; accepted samples go to the
//! durable log (when configured) and then to the live window (when
//! configured). Rejected lines are counted and never stop the loop.
//!
//! There is a single thread of control. A stop request is checked before each
//! read, and reads are bounded by `read_timeout`, so an interrupt is observed
//! within one timeout at worst. Redraws receive a [`WindowSnapshot`] copy.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::clock::IngestClock;
use crate::error::SessionError;
use crate::logger::SessionLog;
use crate::sample::{RejectionReason, Sample, parse_line};
use crate::transport::{ReadOutcome, Transport};
use crate::window::{LiveWindow, WindowSnapshot};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Default interval between live redraws.
pub const DEFAULT_REDRAW_INTERVAL: Duration = Duration::from_secs(2);

/// Default bound on a single transport read.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(1);

/// What a session writes to and how often it refreshes.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Durable log destination. `None` runs without a log.
    pub log_path: Option<PathBuf>,
    /// Live window capacity. `None` disables live mode.
    pub window_capacity: Option<usize>,
    pub redraw_interval: Duration,
    pub read_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            log_path: None,
            window_capacity: None,
            redraw_interval: DEFAULT_REDRAW_INTERVAL,
            read_timeout: DEFAULT_READ_TIMEOUT,
        }
    }
}

// ---------------------------------------------------------------------------
// State and results
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    Connecting,
    Streaming,
    Draining,
    Closed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Streaming => "streaming",
            Self::Draining => "draining",
            Self::Closed => "closed",
        })
    }
}

/// Running totals for a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SessionCounts {
    pub lines_read: u64,
    pub samples_accepted: u64,
    pub samples_logged: u64,
    pub lines_rejected: u64,
}

/// Why streaming ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopCause {
    /// Operator stop request.
    Interrupted,
    /// The transport reported end of stream.
    EndOfStream,
}

/// Final report returned when a session drains.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub counts: SessionCounts,
    pub log_path: Option<PathBuf>,
    pub elapsed: Duration,
    pub stop_cause: StopCause,
}

/// Outcome of a single read-and-parse cycle.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    Sample(Sample),
    Rejected {
        line: String,
        reason: RejectionReason,
    },
    /// The read timed out with no line.
    Idle,
    EndOfStream,
}

/// Hooks called from [`Session::run`]. Every method has a no-op default.
pub trait SessionObserver {
    /// Called for each accepted sample. `seq` counts accepted samples from 1.
    fn on_sample(&mut self, _seq: u64, _sample: &Sample) {}

    fn on_rejected(&mut self, _line: &str, _reason: &RejectionReason) {}

    /// Called at most once per redraw interval, only in live mode.
    fn redraw(&mut self, _snapshot: &WindowSnapshot, _counts: &SessionCounts) -> std::io::Result<()> {
        Ok(())
    }

    /// Polled before every read.
    fn stop_requested(&mut self) -> bool {
        false
    }
}

impl SessionObserver for () {}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// One capture session over a transport `T`.
pub struct Session<T> {
    config: SessionConfig,
    state: SessionState,
    clock: IngestClock,
    transport: Option<T>,
    log: Option<SessionLog>,
    window: Option<LiveWindow>,
    counts: SessionCounts,
    started: Option<Instant>,
}

impl<T: Transport> Session<T> {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            state: SessionState::Idle,
            clock: IngestClock::default(),
            transport: None,
            log: None,
            window: None,
            counts: SessionCounts::default(),
            started: None,
        }
    }

    /// Replace the ingestion clock.
    pub fn with_clock(mut self, clock: IngestClock) -> Self {
        self.clock = clock;
        self
    }

    /// Acquire the transport, then open the log. Moves to `Streaming` on
    /// success and to `Closed` on any failure.
    pub fn connect<F>(&mut self, open: F) -> Result<(), SessionError>
    where
        F: FnOnce() -> std::io::Result<T>,
    {
        self.expect_state("connect", SessionState::Idle)?;
        self.state = SessionState::Connecting;
        log::debug!("session connecting");

        let transport = match open() {
            Ok(t) => t,
            Err(e) => {
                log::error!("transport unavailable: {e}");
                self.state = SessionState::Closed;
                return Err(SessionError::TransportUnavailable(e));
            }
        };

        if let Some(path) = &self.config.log_path {
            match SessionLog::open(path) {
                Ok(log) => self.log = Some(log),
                Err(e) => {
                    log::error!("{e}");
                    drop(transport);
                    self.state = SessionState::Closed;
                    return Err(SessionError::IoUnavailable(e));
                }
            }
        }

        self.window = self.config.window_capacity.map(LiveWindow::new);
        self.transport = Some(transport);
        self.started = Some(Instant::now());
        self.state = SessionState::Streaming;
        log::info!("session streaming");
        Ok(())
    }

    /// Feed one wire line through the parser and into the sinks.
    pub fn ingest(&mut self, line: &str) -> Result<Step, SessionError> {
        self.expect_state("ingest", SessionState::Streaming)?;
        self.counts.lines_read += 1;

        let captured_at = self.clock.stamp();
        let sample = match parse_line(line, captured_at) {
            Ok(sample) => sample,
            Err(reason) => {
                self.counts.lines_rejected += 1;
                log::debug!("rejected line {line:?}: {reason}");
                return Ok(Step::Rejected {
                    line: line.to_string(),
                    reason,
                });
            }
        };

        if let Some(log) = self.log.as_mut() {
            if let Err(e) = log.append(&sample) {
                log::error!("session log append failed: {e}");
                self.release();
                return Err(SessionError::Log(e));
            }
            self.counts.samples_logged += 1;
        }
        if let Some(window) = self.window.as_mut() {
            window.push(sample.clone());
        }
        self.counts.samples_accepted += 1;
        Ok(Step::Sample(sample))
    }

    /// Read one line with the configured timeout and ingest it.
    ///
    /// A transport failure is fatal: the session releases its resources and
    /// moves to `Closed`.
    pub fn step(&mut self) -> Result<Step, SessionError> {
        self.expect_state("read", SessionState::Streaming)?;
        let timeout = self.config.read_timeout;
        let Some(transport) = self.transport.as_mut() else {
            return Err(self.invalid("read"));
        };

        match transport.read_line(timeout) {
            Ok(ReadOutcome::Line(line)) => self.ingest(&line),
            Ok(ReadOutcome::Timeout) => Ok(Step::Idle),
            Ok(ReadOutcome::Closed) => Ok(Step::EndOfStream),
            Err(e) => {
                log::error!("transport failed: {e}");
                self.release();
                Err(SessionError::Transport(e))
            }
        }
    }

    /// Stream until `stop` is set, the observer asks to stop, or the
    /// transport ends, then drain.
    pub fn run(
        &mut self,
        stop: &AtomicBool,
        observer: &mut dyn SessionObserver,
    ) -> Result<SessionSummary, SessionError> {
        self.expect_state("run", SessionState::Streaming)?;
        let mut last_redraw: Option<Instant> = None;

        let cause = loop {
            if stop.load(Ordering::SeqCst) || observer.stop_requested() {
                break StopCause::Interrupted;
            }

            match self.step()? {
                Step::Sample(sample) => observer.on_sample(self.counts.samples_accepted, &sample),
                Step::Rejected { line, reason } => observer.on_rejected(&line, &reason),
                Step::Idle => {}
                Step::EndOfStream => break StopCause::EndOfStream,
            }

            let due = last_redraw.is_none_or(|t| t.elapsed() >= self.config.redraw_interval);
            if due && self.window.is_some() {
                self.redraw(observer);
                last_redraw = Some(Instant::now());
            }
        };

        if self.window.is_some() {
            self.redraw(observer);
        }
        self.drain(cause)
    }

    /// Close the log, release the transport and report final counts.
    pub fn drain(&mut self, cause: StopCause) -> Result<SessionSummary, SessionError> {
        self.expect_state("drain", SessionState::Streaming)?;
        self.state = SessionState::Draining;
        log::info!("session draining ({cause:?})");

        let log_path = self.log.as_ref().map(|l| l.path().to_path_buf());
        let closed = match self.log.as_mut() {
            Some(log) => log.close(),
            None => Ok(()),
        };
        self.release();
        closed.map_err(SessionError::Log)?;

        let summary = SessionSummary {
            counts: self.counts,
            log_path,
            elapsed: self.started.map(|t| t.elapsed()).unwrap_or_default(),
            stop_cause: cause,
        };
        log::info!(
            "session closed: {} logged, {} rejected",
            summary.counts.samples_logged,
            summary.counts.lines_rejected
        );
        Ok(summary)
    }

    /// Release everything and move to `Closed` from any state. Idempotent.
    pub fn abort(&mut self) {
        if self.state != SessionState::Closed {
            log::warn!("session aborted while {}", self.state);
        }
        self.release();
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn counts(&self) -> SessionCounts {
        self.counts
    }

    /// Copy of the live window, empty when live mode is off.
    pub fn snapshot(&self) -> WindowSnapshot {
        self.window
            .as_ref()
            .map(LiveWindow::snapshot)
            .unwrap_or_default()
    }

    pub fn log_path(&self) -> Option<&Path> {
        self.config.log_path.as_deref()
    }

    fn redraw(&mut self, observer: &mut dyn SessionObserver) {
        let snapshot = self.snapshot();
        if let Err(e) = observer.redraw(&snapshot, &self.counts) {
            log::warn!("redraw failed: {e}");
        }
    }

    fn release(&mut self) {
        if let Some(mut log) = self.log.take() {
            if let Err(e) = log.close() {
                log::warn!("closing session log: {e}");
            }
        }
        self.transport = None;
        self.state = SessionState::Closed;
    }

    fn expect_state(&self, operation: &'static str, want: SessionState) -> Result<(), SessionError> {
        if self.state == want {
            Ok(())
        } else {
            Err(self.invalid(operation))
        }
    }

    fn invalid(&self, operation: &'static str) -> SessionError {
        SessionError::InvalidState {
            operation,
            state: self.state,
        }
    }
}

impl<T> fmt::Debug for Session<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("state", &self.state)
            .field("counts", &self.counts)
            .field("log_path", &self.config.log_path)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
