//! Telemetry samples and the wire line parser.
//!
//! The firmware prints one reading per line as four comma-separated numbers:
//!
//! ```text
//! <bed_temp>,<amb_temp>,<humidity>,<fan_speed>\n
//! ```
//!
//! A line either becomes a complete [`Sample`] or is rejected with a
//! [`RejectionReason`]. There is no partially-valid sample: if any field fails
//! to parse, the whole line is dropped.

use std::borrow::Cow;
use std::fmt;

use chrono::NaiveDateTime;
use serde::Serialize;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Channels
// ---------------------------------------------------------------------------

/// Number of numeric channels carried by every sample.
pub const CHANNEL_COUNT: usize = 4;

/// One numeric channel of a telemetry reading, in wire order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    BedTemp,
    AmbTemp,
    Humidity,
    FanSpeed,
}

impl Channel {
    /// All channels in wire (and log column) order.
    pub const ALL: [Channel; CHANNEL_COUNT] = [
        Channel::BedTemp,
        Channel::AmbTemp,
        Channel::Humidity,
        Channel::FanSpeed,
    ];

    /// Position of this channel on the wire line.
    pub fn index(self) -> usize {
        match self {
            Self::BedTemp => 0,
            Self::AmbTemp => 1,
            Self::Humidity => 2,
            Self::FanSpeed => 3,
        }
    }

    /// Column name used in the session log header.
    pub fn column(self) -> &'static str {
        match self {
            Self::BedTemp => "bed_temp",
            Self::AmbTemp => "amb_temp",
            Self::Humidity => "humidity",
            Self::FanSpeed => "fan_speed",
        }
    }

    /// Human-readable label for charts and summaries.
    pub fn label(self) -> &'static str {
        match self {
            Self::BedTemp => "Bed temperature",
            Self::AmbTemp => "Ambient temperature",
            Self::Humidity => "Humidity",
            Self::FanSpeed => "Fan speed",
        }
    }

    pub fn unit(self) -> &'static str {
        match self {
            Self::BedTemp | Self::AmbTemp => "°C",
            Self::Humidity => "%",
            Self::FanSpeed => "PWM",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

// ---------------------------------------------------------------------------
// Sample
// ---------------------------------------------------------------------------

/// One validated, timestamped telemetry reading.
///
/// `captured_at` is assigned at ingestion, not by the sensor. Values carry no
/// range validation: out-of-range sensor readings are kept as reported.
#[derive(Debug, Clone, Serialize)]
pub struct Sample {
    pub captured_at: NaiveDateTime,
    pub bed_temp: f64,
    pub amb_temp: f64,
    pub humidity: f64,
    pub fan_speed: f64,
    /// Field text exactly as received, used to log values at their original precision.
    #[serde(skip)]
    text: Option<Box<[String; CHANNEL_COUNT]>>,
}

impl Sample {
    /// Build a sample from numeric values in channel order, with no source text.
    pub fn new(captured_at: NaiveDateTime, values: [f64; CHANNEL_COUNT]) -> Self {
        let [bed_temp, amb_temp, humidity, fan_speed] = values;
        Self {
            captured_at,
            bed_temp,
            amb_temp,
            humidity,
            fan_speed,
            text: None,
        }
    }

    pub(crate) fn with_text(
        captured_at: NaiveDateTime,
        values: [f64; CHANNEL_COUNT],
        text: [String; CHANNEL_COUNT],
    ) -> Self {
        let mut sample = Self::new(captured_at, values);
        sample.text = Some(Box::new(text));
        sample
    }

    pub fn value(&self, channel: Channel) -> f64 {
        match channel {
            Channel::BedTemp => self.bed_temp,
            Channel::AmbTemp => self.amb_temp,
            Channel::Humidity => self.humidity,
            Channel::FanSpeed => self.fan_speed,
        }
    }

    /// All four values in channel order.
    pub fn values(&self) -> [f64; CHANNEL_COUNT] {
        [self.bed_temp, self.amb_temp, self.humidity, self.fan_speed]
    }

    /// Field text for a channel: the received text when available, else the
    /// shortest decimal form that parses back to the same value.
    pub fn field_text(&self, channel: Channel) -> Cow<'_, str> {
        match &self.text {
            Some(text) => Cow::Borrowed(text[channel.index()].as_str()),
            None => Cow::Owned(self.value(channel).to_string()),
        }
    }
}

/// Samples compare by timestamp and values; the received text is ignored.
impl PartialEq for Sample {
    fn eq(&self, other: &Self) -> bool {
        self.captured_at == other.captured_at && self.values() == other.values()
    }
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

/// Why a wire line did not produce a sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RejectionReason {
    #[error("empty line")]
    Empty,

    #[error("expected 4 comma-separated fields, found {0}")]
    MalformedFieldCount(usize),

    /// Index (0-based) of the first field that is not a finite number.
    #[error("field {0} ({col}) is not a finite number", col = column_name(.0))]
    NotNumeric(usize),
}

fn column_name(index: &usize) -> &'static str {
    Channel::ALL.get(*index).map_or("?", |c| c.column())
}

/// Parse one raw wire line into a sample stamped with `captured_at`.
///
/// Surrounding whitespace and line terminators are ignored. The line must
/// split into exactly four fields, each a finite floating-point number.
pub fn parse_line(raw_line: &str, captured_at: NaiveDateTime) -> Result<Sample, RejectionReason> {
    let line = raw_line.trim();
    if line.is_empty() {
        return Err(RejectionReason::Empty);
    }

    let fields: Vec<&str> = line.split(',').collect();
    let values = parse_values(&fields)?;
    let text = std::array::from_fn(|i| fields[i].trim().to_string());
    Ok(Sample::with_text(captured_at, values, text))
}

/// Parse exactly four numeric fields. Shared with the log reader, whose rows
/// carry the same fields after the timestamp column.
pub(crate) fn parse_values(fields: &[&str]) -> Result<[f64; CHANNEL_COUNT], RejectionReason> {
    if fields.len() != CHANNEL_COUNT {
        return Err(RejectionReason::MalformedFieldCount(fields.len()));
    }

    let mut values = [0.0; CHANNEL_COUNT];
    for (i, field) in fields.iter().enumerate() {
        values[i] = match field.trim().parse::<f64>() {
            Ok(v) if v.is_finite() => v,
            _ => return Err(RejectionReason::NotNumeric(i)),
        };
    }
    Ok(values)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
