use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::session::SessionState;

/// Errors from the durable session log.
#[derive(Error, Debug)]
pub enum LogError {
    #[error("cannot open log file {}: {source}", path.display())]
    Unavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("log is already closed")]
    Closed,

    #[error("log write failed: {0}")]
    Write(#[from] io::Error),
}

/// Errors that end a capture session.
#[derive(Error, Debug)]
pub enum SessionError {
    /// The transport could not be acquired. Fatal, never retried.
    #[error("transport unavailable: {0}")]
    TransportUnavailable(#[source] io::Error),

    /// The session log could not be created. Aborts session start.
    #[error(transparent)]
    IoUnavailable(LogError),

    /// The transport failed mid-stream.
    #[error("transport failed: {0}")]
    Transport(#[source] io::Error),

    #[error("session log failed: {0}")]
    Log(#[source] LogError),

    #[error("cannot {operation} while session is {state}")]
    InvalidState {
        operation: &'static str,
        state: SessionState,
    },
}

/// Errors from loading or summarizing a recorded session.
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("log file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("malformed log at line {line}: {reason}")]
    MalformedLog { line: usize, reason: String },

    #[error("session has no samples")]
    EmptySession,

    #[error("cannot read log: {0}")]
    Io(#[from] io::Error),
}
