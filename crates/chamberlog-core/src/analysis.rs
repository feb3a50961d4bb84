//! Post-session analysis of a recorded session log.
//!
//! [`load`] reads a complete log back into samples, validating the header and
//! every row. [`summarize`] turns the samples into a [`Report`]: per-channel
//! mean, min, max and sample standard deviation, the session's time span, and
//! an elapsed-time axis for plotting.
//!
//! Per-channel moments use Welford's single-pass update, which stays
//! numerically stable over long sessions and gives bit-identical results for
//! identical input.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::clock::{parse_timestamp, seconds_between};
use crate::error::AnalysisError;
use crate::logger::LOG_HEADER;
use crate::sample::{CHANNEL_COUNT, Channel, Sample, parse_values};

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// Unit for the elapsed-time axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeUnit {
    #[default]
    Seconds,
    Minutes,
}

impl TimeUnit {
    fn seconds_per_unit(self) -> f64 {
        match self {
            Self::Seconds => 1.0,
            Self::Minutes => 60.0,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Seconds => "s",
            Self::Minutes => "min",
        }
    }
}

/// Descriptive statistics for one channel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChannelStats {
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    /// Sample standard deviation (N−1 denominator); 0 for a single sample.
    pub std_dev: f64,
}

/// Read-only summary of a recorded session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub samples: usize,
    pub started_at: NaiveDateTime,
    pub ended_at: NaiveDateTime,
    pub duration_secs: f64,
    pub bed_temp: ChannelStats,
    pub amb_temp: ChannelStats,
    pub humidity: ChannelStats,
    pub fan_speed: ChannelStats,
    /// Pearson correlation of humidity against fan speed; `None` with fewer
    /// than two samples or when either channel is constant.
    pub humidity_fan_correlation: Option<f64>,
    /// Seconds since the first sample, one entry per sample.
    pub elapsed_secs: Vec<f64>,
}

impl Report {
    pub fn channel(&self, channel: Channel) -> &ChannelStats {
        match channel {
            Channel::BedTemp => &self.bed_temp,
            Channel::AmbTemp => &self.amb_temp,
            Channel::Humidity => &self.humidity,
            Channel::FanSpeed => &self.fan_speed,
        }
    }

    /// Elapsed-time axis in the requested unit.
    pub fn elapsed(&self, unit: TimeUnit) -> Vec<f64> {
        let div = unit.seconds_per_unit();
        self.elapsed_secs.iter().map(|s| s / div).collect()
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Load every sample from the session log at `path`.
pub fn load(path: impl AsRef<Path>) -> Result<Vec<Sample>, AnalysisError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => AnalysisError::NotFound(path.to_path_buf()),
        _ => AnalysisError::Io(e),
    })?;
    read_log(BufReader::new(file))
}

/// Read a session log from any buffered reader.
///
/// The first line must be exactly the log header. Every following line must
/// be a timestamp plus four numeric fields; the first bad line fails the load.
pub fn read_log<R: BufRead>(reader: R) -> Result<Vec<Sample>, AnalysisError> {
    let mut lines = reader.lines();

    let header = match lines.next() {
        Some(line) => line?,
        None => {
            return Err(AnalysisError::MalformedLog {
                line: 1,
                reason: "missing header".to_string(),
            });
        }
    };
    let header = header.trim_start_matches('\u{feff}').trim_end();
    if header != LOG_HEADER {
        return Err(AnalysisError::MalformedLog {
            line: 1,
            reason: format!("expected header `{LOG_HEADER}`, found `{header}`"),
        });
    }

    let mut samples = Vec::new();
    for (i, line) in lines.enumerate() {
        let line = line?;
        let line_no = i + 2;
        let sample = parse_row(&line).map_err(|reason| AnalysisError::MalformedLog {
            line: line_no,
            reason,
        })?;
        samples.push(sample);
    }

    log::debug!("loaded {} samples", samples.len());
    Ok(samples)
}

fn parse_row(line: &str) -> Result<Sample, String> {
    let line = line.trim_end_matches(['\r', '\n']);
    let Some((timestamp, rest)) = line.split_once(',') else {
        return Err(format!("expected {} columns, found 1", CHANNEL_COUNT + 1));
    };

    let captured_at =
        parse_timestamp(timestamp).ok_or_else(|| format!("invalid timestamp `{timestamp}`"))?;

    let fields: Vec<&str> = rest.split(',').collect();
    if fields.len() != CHANNEL_COUNT {
        return Err(format!(
            "expected {} columns, found {}",
            CHANNEL_COUNT + 1,
            fields.len() + 1
        ));
    }
    let values = parse_values(&fields).map_err(|reason| reason.to_string())?;

    Ok(Sample::new(captured_at, values))
}

// ---------------------------------------------------------------------------
// Statistics
// ---------------------------------------------------------------------------

/// Running mean/variance/extrema (Welford).
#[derive(Debug, Clone, Copy)]
struct Accumulator {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl Accumulator {
    fn new() -> Self {
        Self {
            count: 0,
            mean: 0.0,
            m2: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }

    fn push(&mut self, x: f64) {
        self.count += 1;
        let delta = x - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (x - self.mean);
        self.min = self.min.min(x);
        self.max = self.max.max(x);
    }

    fn finish(&self) -> ChannelStats {
        let std_dev = if self.count > 1 {
            (self.m2 / (self.count - 1) as f64).sqrt()
        } else {
            0.0
        };
        ChannelStats {
            mean: self.mean,
            min: self.min,
            max: self.max,
            std_dev,
        }
    }
}

/// Summarize a loaded session. Fails on an empty session.
pub fn summarize(samples: &[Sample]) -> Result<Report, AnalysisError> {
    let (first, last) = match (samples.first(), samples.last()) {
        (Some(first), Some(last)) => (first, last),
        _ => return Err(AnalysisError::EmptySession),
    };

    let mut acc = [Accumulator::new(); CHANNEL_COUNT];
    for sample in samples {
        for (a, v) in acc.iter_mut().zip(sample.values()) {
            a.push(v);
        }
    }
    let [bed_temp, amb_temp, humidity, fan_speed] = acc.map(|a| a.finish());

    let humidity_fan_correlation = correlation(
        samples,
        (Channel::Humidity, humidity.mean),
        (Channel::FanSpeed, fan_speed.mean),
    );

    Ok(Report {
        samples: samples.len(),
        started_at: first.captured_at,
        ended_at: last.captured_at,
        duration_secs: seconds_between(&first.captured_at, &last.captured_at),
        bed_temp,
        amb_temp,
        humidity,
        fan_speed,
        humidity_fan_correlation,
        elapsed_secs: elapsed_axis(samples, TimeUnit::Seconds),
    })
}

/// Time since the first sample for every sample, in `unit`.
pub fn elapsed_axis(samples: &[Sample], unit: TimeUnit) -> Vec<f64> {
    let Some(first) = samples.first() else {
        return Vec::new();
    };
    let div = unit.seconds_per_unit();
    samples
        .iter()
        .map(|s| seconds_between(&first.captured_at, &s.captured_at) / div)
        .collect()
}

/// Pearson correlation between two channels given their means.
fn correlation(
    samples: &[Sample],
    (x, x_mean): (Channel, f64),
    (y, y_mean): (Channel, f64),
) -> Option<f64> {
    if samples.len() < 2 {
        return None;
    }
    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for s in samples {
        let dx = s.value(x) - x_mean;
        let dy = s.value(y) - y_mean;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }
    if sxx <= 0.0 || syy <= 0.0 {
        return None;
    }
    Some((sxy / (sxx * syy).sqrt()).clamp(-1.0, 1.0))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
