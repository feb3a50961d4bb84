//! Ingestion timestamps.
//!
//! Samples are stamped when they arrive, not by the sensor. Timestamps are
//! local wall-clock time without an offset, rendered as ISO-8601 with
//! microsecond precision (`2026-03-01T12:00:00.250000`).

use chrono::{DateTime, Local, NaiveDateTime, TimeDelta};

/// Format used for the `timestamp` column of the session log.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

/// Source of wall-clock time for ingestion.
pub trait Clock {
    fn now(&mut self) -> NaiveDateTime;
}

/// Local system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&mut self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Deterministic clock that advances by a fixed step on every reading.
#[derive(Debug, Clone)]
pub struct SteppingClock {
    next: NaiveDateTime,
    step: TimeDelta,
}

impl SteppingClock {
    pub fn new(start: NaiveDateTime, step: TimeDelta) -> Self {
        Self { next: start, step }
    }
}

impl Clock for SteppingClock {
    fn now(&mut self) -> NaiveDateTime {
        let now = self.next;
        self.next += self.step;
        now
    }
}

/// Stamps arrivals with a time that never goes backwards.
///
/// If the underlying clock steps back (NTP correction, DST fallback), the
/// previous timestamp is reused so stamps stay non-decreasing in arrival order.
pub struct IngestClock {
    clock: Box<dyn Clock + Send>,
    last: Option<NaiveDateTime>,
}

impl IngestClock {
    pub fn new(clock: impl Clock + Send + 'static) -> Self {
        Self {
            clock: Box::new(clock),
            last: None,
        }
    }

    pub fn stamp(&mut self) -> NaiveDateTime {
        let now = self.clock.now();
        let stamped = match self.last {
            Some(last) if now < last => last,
            _ => now,
        };
        self.last = Some(stamped);
        stamped
    }
}

impl Default for IngestClock {
    fn default() -> Self {
        Self::new(SystemClock)
    }
}

impl std::fmt::Debug for IngestClock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IngestClock").field("last", &self.last).finish()
    }
}

/// Render a timestamp for the session log.
pub fn format_timestamp(at: &NaiveDateTime) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

/// Parse a log timestamp.
///
/// Accepts `T` or space between date and time, with or without fractional
/// seconds. Timestamps carrying an offset (RFC 3339) keep their wall time.
pub fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.naive_local()))
}

/// Signed seconds from `start` to `at`, with microsecond resolution.
pub fn seconds_between(start: &NaiveDateTime, at: &NaiveDateTime) -> f64 {
    let delta = *at - *start;
    match delta.num_microseconds() {
        Some(us) => us as f64 / 1_000_000.0,
        None => delta.num_milliseconds() as f64 / 1_000.0,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
