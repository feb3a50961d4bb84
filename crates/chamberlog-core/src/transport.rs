//! Line transports: where wire lines come from.
//!
//! The session only needs `read_line(timeout)`. [`SerialTransport`] talks to
//! the heater controller over a serial port; [`ReplayTransport`] replays lines
//! from a file or any in-memory reader, for tests and offline runs.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Cursor, Read};
use std::path::Path;
use std::time::Duration;

/// Result of one read attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    /// A complete line, terminator stripped.
    Line(String),
    /// Nothing arrived before the timeout.
    Timeout,
    /// The transport reached end of stream.
    Closed,
}

/// A source of newline-terminated text lines.
pub trait Transport {
    fn read_line(&mut self, timeout: Duration) -> io::Result<ReadOutcome>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn read_line(&mut self, timeout: Duration) -> io::Result<ReadOutcome> {
        (**self).read_line(timeout)
    }
}

/// Decode a raw line, dropping the terminator. Invalid UTF-8 is replaced
/// rather than failing the line; the parser rejects whatever is left.
fn decode_line(mut raw: Vec<u8>) -> String {
    while matches!(raw.last(), Some(b'\n' | b'\r')) {
        raw.pop();
    }
    match String::from_utf8(raw) {
        Ok(s) => s,
        Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
    }
}

// ---------------------------------------------------------------------------
// Serial
// ---------------------------------------------------------------------------

/// Default serial device.
pub const DEFAULT_PORT: &str = "/dev/ttyUSB0";
/// Default baud rate, matching the firmware's `Serial.begin`.
pub const DEFAULT_BAUD: u32 = 115_200;

/// Serial port settings.
#[derive(Debug, Clone)]
pub struct SerialConfig {
    pub port: String,
    pub baud: u32,
    /// Per-read timeout.
    pub timeout: Duration,
    /// Wait after opening: most boards reset when the port opens.
    pub settle: Duration,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT.to_string(),
            baud: DEFAULT_BAUD,
            timeout: Duration::from_secs(1),
            settle: Duration::from_secs(2),
        }
    }
}

/// Splits a byte stream with read timeouts into lines.
///
/// Bytes read before a timeout are kept and prefixed to the next read, so a
/// line split across timeouts is delivered whole. At end of stream, any
/// unterminated tail is delivered as a last line.
pub struct LineReader<R> {
    reader: BufReader<R>,
    pending: Vec<u8>,
}

impl<R: Read> LineReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader: BufReader::new(reader),
            pending: Vec::new(),
        }
    }

    pub fn get_mut(&mut self) -> &mut R {
        self.reader.get_mut()
    }

    /// Read until a newline, a timeout or end of stream.
    pub fn next_line(&mut self) -> io::Result<ReadOutcome> {
        match self.reader.read_until(b'\n', &mut self.pending) {
            Ok(0) if self.pending.is_empty() => Ok(ReadOutcome::Closed),
            Ok(_) => Ok(ReadOutcome::Line(decode_line(std::mem::take(&mut self.pending)))),
            Err(e) if matches!(e.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock) => {
                Ok(ReadOutcome::Timeout)
            }
            Err(e) => Err(e),
        }
    }
}

/// Line reader over a serial port.
pub struct SerialTransport {
    lines: LineReader<Box<dyn serialport::SerialPort>>,
    timeout: Duration,
    port: String,
}

impl SerialTransport {
    pub fn open(config: &SerialConfig) -> io::Result<Self> {
        log::info!("opening serial port {} at {} baud", config.port, config.baud);
        let port = serialport::new(&config.port, config.baud)
            .timeout(config.timeout)
            .open()
            .map_err(io::Error::from)?;

        if !config.settle.is_zero() {
            std::thread::sleep(config.settle);
        }
        // Drop whatever the board printed while resetting.
        if let Err(e) = port.clear(serialport::ClearBuffer::Input) {
            log::debug!("could not clear serial input buffer: {e}");
        }

        log::info!("serial port {} ready", config.port);
        Ok(Self {
            lines: LineReader::new(port),
            timeout: config.timeout,
            port: config.port.clone(),
        })
    }

    pub fn port(&self) -> &str {
        &self.port
    }
}

impl Transport for SerialTransport {
    fn read_line(&mut self, timeout: Duration) -> io::Result<ReadOutcome> {
        if timeout != self.timeout {
            self.lines
                .get_mut()
                .set_timeout(timeout)
                .map_err(io::Error::from)?;
            self.timeout = timeout;
        }
        self.lines.next_line()
    }
}

// ---------------------------------------------------------------------------
// Replay
// ---------------------------------------------------------------------------

/// Replays lines from a reader, ending with [`ReadOutcome::Closed`].
pub struct ReplayTransport<R> {
    reader: R,
    pace: Option<Duration>,
}

impl<R: BufRead> ReplayTransport<R> {
    pub fn new(reader: R) -> Self {
        Self { reader, pace: None }
    }

    /// Wait `interval` before each line, to mimic a live sensor.
    pub fn with_pace(mut self, interval: Duration) -> Self {
        self.pace = Some(interval);
        self
    }
}

impl ReplayTransport<BufReader<File>> {
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        Ok(Self::new(BufReader::new(File::open(path)?)))
    }
}

impl ReplayTransport<Cursor<Vec<u8>>> {
    /// Replay the given lines in order.
    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut buf = Vec::new();
        for line in lines {
            buf.extend_from_slice(line.as_ref().as_bytes());
            buf.push(b'\n');
        }
        Self::new(Cursor::new(buf))
    }
}

impl<R: BufRead> Transport for ReplayTransport<R> {
    fn read_line(&mut self, _timeout: Duration) -> io::Result<ReadOutcome> {
        if let Some(pace) = self.pace {
            std::thread::sleep(pace);
        }
        let mut raw = Vec::new();
        if self.reader.read_until(b'\n', &mut raw)? == 0 {
            return Ok(ReadOutcome::Closed);
        }
        Ok(ReadOutcome::Line(decode_line(raw)))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
