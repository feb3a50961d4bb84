//! Durable, append-only session log.
//!
//! A session log is a UTF-8 CSV file:
//!
//! ```text
//! timestamp,bed_temp,amb_temp,humidity,fan_speed
//! 2026-03-01T12:00:00.000000,60.0,25.0,40.0,128
//! ```
//!
//! The header is written once when the log is opened. Every appended row is
//! written and synced to stable storage before `append` returns, so a crash
//! never loses an acknowledged row. A row whose write fails is cut back off
//! the file, so a failed append never leaves half a row behind.

use std::fs::File;
use std::io::{self, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::clock::format_timestamp;
use crate::error::LogError;
use crate::sample::{Channel, Sample};

/// Header line of every session log.
pub const LOG_HEADER: &str = "timestamp,bed_temp,amb_temp,humidity,fan_speed";

/// Default file name for a capture session.
pub const DEFAULT_LOG_FILE: &str = "chamber_log.csv";

/// Handle to an open session log.
#[derive(Debug)]
pub struct SessionLog {
    path: PathBuf,
    file: Option<File>,
    /// Length of the file up to the last complete row.
    committed: u64,
    rows: u64,
}

impl SessionLog {
    /// Create (or truncate) the log at `path` and write the header.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, LogError> {
        let path = path.as_ref().to_path_buf();
        let unavailable = |source| LogError::Unavailable {
            path: path.clone(),
            source,
        };

        let mut file = File::create(&path).map_err(unavailable)?;
        let committed =
            append_row(&mut file, 0, format!("{LOG_HEADER}\n").as_bytes()).map_err(unavailable)?;

        log::info!("opened session log {}", path.display());
        Ok(Self {
            path,
            file: Some(file),
            committed,
            rows: 0,
        })
    }

    /// Append one sample and force it to stable storage.
    pub fn append(&mut self, sample: &Sample) -> Result<(), LogError> {
        let file = self.file.as_mut().ok_or(LogError::Closed)?;
        self.committed = append_row(file, self.committed, format_row(sample).as_bytes())?;
        self.rows += 1;
        Ok(())
    }

    /// Flush and release the file. Closing an already-closed log is a no-op.
    pub fn close(&mut self) -> Result<(), LogError> {
        let Some(file) = self.file.take() else {
            return Ok(());
        };
        file.sync_all()?;
        log::info!("closed session log {} ({} rows)", self.path.display(), self.rows);
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.file.is_none()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rows appended since the log was opened.
    pub fn rows(&self) -> u64 {
        self.rows
    }
}

impl Drop for SessionLog {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            log::warn!("closing session log {} on drop: {e}", self.path.display());
        }
    }
}

/// File-like target of [`append_row`].
trait RowSink: Write + Seek {
    fn sync(&mut self) -> io::Result<()>;
    fn truncate_to(&mut self, len: u64) -> io::Result<()>;
}

impl RowSink for File {
    fn sync(&mut self) -> io::Result<()> {
        self.sync_data()
    }

    fn truncate_to(&mut self, len: u64) -> io::Result<()> {
        self.set_len(len)
    }
}

/// Write `row` after the first `committed` bytes and sync it. On failure the
/// sink is cut back to `committed` and the write error is returned. Returns
/// the new committed length.
fn append_row<S: RowSink>(sink: &mut S, committed: u64, row: &[u8]) -> io::Result<u64> {
    let written = sink
        .write_all(row)
        .and_then(|()| sink.flush())
        .and_then(|()| sink.sync());
    if let Err(e) = written {
        let undo = sink
            .truncate_to(committed)
            .and_then(|()| sink.seek(SeekFrom::Start(committed)));
        if let Err(undo) = undo {
            log::warn!("could not remove partial row: {undo}");
        }
        return Err(e);
    }
    Ok(committed + row.len() as u64)
}

/// Render one log row, newline included.
pub fn format_row(sample: &Sample) -> String {
    let mut row = format_timestamp(&sample.captured_at);
    for channel in Channel::ALL {
        row.push(',');
        row.push_str(&sample.field_text(channel));
    }
    row.push('\n');
    row
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::parse_line;
    use chrono::{NaiveDate, NaiveDateTime};

    fn at(s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, 1)
            .unwrap()
            .and_hms_opt(12, 0, s)
            .unwrap()
    }

    // -----------------------------------------------------------------------
    // Schema
    // -----------------------------------------------------------------------

    #[test]
    fn header_matches_channel_columns() {
        let columns: Vec<&str> = std::iter::once("timestamp")
            .chain(Channel::ALL.iter().map(|c| c.column()))
            .collect();
        assert_eq!(LOG_HEADER, columns.join(","));
    }

    #[test]
    fn row_keeps_received_text() {
        let sample = parse_line("60.10,25.0,40,128", at(0)).unwrap();
        assert_eq!(format_row(&sample), "2026-03-01T12:00:00.000000,60.10,25.0,40,128\n");
    }

    #[test]
    fn row_falls_back_to_numeric_values() {
        let sample = Sample::new(at(1), [60.5, 25.25, 41.0, 130.0]);
        assert_eq!(format_row(&sample), "2026-03-01T12:00:01.000000,60.5,25.25,41,130\n");
    }

    // -----------------------------------------------------------------------
    // SessionLog
    // -----------------------------------------------------------------------

    #[test]
    fn open_writes_header_once() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("log.csv");

        let mut log = SessionLog::open(&path).unwrap();
        log.close().unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents, format!("{LOG_HEADER}\n"));
    }

    #[test]
    fn appended_rows_are_on_disk_before_close() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("log.csv");

        let mut log = SessionLog::open(&path).unwrap();
        log.append(&parse_line("60.0,25.0,40.0,128", at(0)).unwrap())
            .unwrap();
        log.append(&parse_line("60.5,25.1,41.0,130", at(2)).unwrap())
            .unwrap();

        // Still open: rows must already be visible to another reader.
        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], LOG_HEADER);
        assert_eq!(lines[1], "2026-03-01T12:00:00.000000,60.0,25.0,40.0,128");
        assert_eq!(lines[2], "2026-03-01T12:00:02.000000,60.5,25.1,41.0,130");
        assert!(contents.ends_with('\n'));
        assert_eq!(log.rows(), 2);
    }

    #[test]
    fn open_truncates_existing_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("log.csv");
        std::fs::write(&path, "old contents\nmore\n").unwrap();

        let mut log = SessionLog::open(&path).unwrap();
        log.close().unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), format!("{LOG_HEADER}\n"));
    }

    #[test]
    fn open_fails_for_missing_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("no_such_dir").join("log.csv");

        match SessionLog::open(&path) {
            Err(LogError::Unavailable { path: p, .. }) => assert_eq!(p, path),
            other => panic!("expected Unavailable, got {other:?}"),
        }
    }

    #[test]
    fn close_is_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        let mut log = SessionLog::open(tmp.path().join("log.csv")).unwrap();

        assert!(!log.is_closed());
        log.close().unwrap();
        assert!(log.is_closed());
        log.close().unwrap();
        log.close().unwrap();
    }

    #[test]
    fn append_after_close_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let mut log = SessionLog::open(tmp.path().join("log.csv")).unwrap();
        log.close().unwrap();

        let sample = Sample::new(at(0), [1.0, 2.0, 3.0, 4.0]);
        assert!(matches!(log.append(&sample), Err(LogError::Closed)));
        assert_eq!(log.rows(), 0);
    }

    /// In-memory sink that accepts `budget` more bytes, then fails.
    struct Budgeted {
        data: io::Cursor<Vec<u8>>,
        budget: usize,
    }

    impl Write for Budgeted {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.budget == 0 {
                return Err(io::Error::from(io::ErrorKind::StorageFull));
            }
            let n = buf.len().min(self.budget);
            self.budget -= n;
            self.data.write(&buf[..n])
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Seek for Budgeted {
        fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
            self.data.seek(pos)
        }
    }

    impl RowSink for Budgeted {
        fn sync(&mut self) -> io::Result<()> {
            Ok(())
        }

        fn truncate_to(&mut self, len: u64) -> io::Result<()> {
            self.data.get_mut().truncate(len as usize);
            Ok(())
        }
    }

    #[test]
    fn failed_row_write_is_cut_back() {
        let header = format!("{LOG_HEADER}\n");
        let mut sink = Budgeted {
            data: io::Cursor::new(Vec::new()),
            budget: header.len() + 10,
        };
        let committed = append_row(&mut sink, 0, header.as_bytes()).unwrap();
        assert_eq!(committed, header.len() as u64);

        let row = format_row(&Sample::new(at(0), [1.0, 2.0, 3.0, 4.0]));
        let err = append_row(&mut sink, committed, row.as_bytes()).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::StorageFull);
        assert_eq!(sink.data.get_ref().as_slice(), header.as_bytes());
        assert_eq!(sink.data.position(), committed);

        // Space freed: the next row lands right after the header.
        sink.budget = usize::MAX;
        let committed = append_row(&mut sink, committed, row.as_bytes()).unwrap();
        assert_eq!(
            String::from_utf8(sink.data.get_ref().clone()).unwrap(),
            format!("{header}{row}")
        );
        assert_eq!(committed, (header.len() + row.len()) as u64);
    }

    #[test]
    fn drop_closes_log() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("log.csv");
        {
            let mut log = SessionLog::open(&path).unwrap();
            log.append(&Sample::new(at(0), [1.0, 2.0, 3.0, 4.0])).unwrap();
        }
        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 2);
    }
}
