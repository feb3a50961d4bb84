//! Integration tests for chamberlog-core.
//!
//! These tests drive the full pipeline:
//! replayed wire lines → session → durable log + live window → analysis.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chamberlog_core::{
    AnalysisError, IngestClock, LOG_HEADER, RejectionReason, ReplayTransport, Sample, Session,
    SessionConfig, SessionCounts, SessionError, SessionObserver, SessionState, SteppingClock,
    StopCause, TimeUnit, WindowSnapshot, analysis, summarize,
};
use chrono::{NaiveDate, TimeDelta};

fn stepping_clock() -> IngestClock {
    let start = NaiveDate::from_ymd_opt(2026, 3, 1)
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap();
    IngestClock::new(SteppingClock::new(start, TimeDelta::seconds(2)))
}

const WIRE: [&str; 4] = [
    "60.0,25.0,40.0,128",
    "60.5,25.1,41.0,130",
    "bad,data",
    "61.0,25.2,39.5,125",
];

#[test]
fn live_and_logging_session_end_to_end() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("chamber_log.csv");
    let config = SessionConfig {
        log_path: Some(path.clone()),
        window_capacity: Some(100),
        ..Default::default()
    };

    let mut session = Session::new(config).with_clock(stepping_clock());
    session
        .connect(|| Ok(ReplayTransport::from_lines(WIRE)))
        .unwrap();
    let summary = session.run(&AtomicBool::new(false), &mut ()).unwrap();

    assert_eq!(summary.stop_cause, StopCause::EndOfStream);
    assert_eq!(summary.counts.samples_logged, 3);
    assert_eq!(summary.counts.lines_rejected, 1);
    assert_eq!(summary.log_path.as_deref(), Some(path.as_path()));
    assert_eq!(session.state(), SessionState::Closed);

    let snapshot = session.snapshot();
    assert_eq!(snapshot.len(), 3);
    let fans: Vec<f64> = snapshot.samples.iter().map(|s| s.fan_speed).collect();
    assert_eq!(fans, vec![128.0, 130.0, 125.0]);

    let samples = analysis::load(&path).unwrap();
    assert_eq!(samples.len(), 3);
    let report = summarize(&samples).unwrap();
    assert!((report.bed_temp.mean - 60.5).abs() < 1e-12);
    assert_eq!(report.bed_temp.min, 60.0);
    assert_eq!(report.bed_temp.max, 61.0);
    // The rejected line still consumed a clock tick.
    assert_eq!(report.elapsed(TimeUnit::Seconds), vec![0.0, 2.0, 6.0]);
}

#[test]
fn logged_rows_keep_wire_precision() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("log.csv");
    let config = SessionConfig {
        log_path: Some(path.clone()),
        ..Default::default()
    };

    let mut session = Session::new(config).with_clock(stepping_clock());
    session
        .connect(|| Ok(ReplayTransport::from_lines(WIRE)))
        .unwrap();
    session.run(&AtomicBool::new(false), &mut ()).unwrap();

    let contents = std::fs::read_to_string(&path).unwrap();
    let expected = format!(
        "{LOG_HEADER}\n\
         2026-03-01T12:00:00.000000,60.0,25.0,40.0,128\n\
         2026-03-01T12:00:02.000000,60.5,25.1,41.0,130\n\
         2026-03-01T12:00:06.000000,61.0,25.2,39.5,125\n"
    );
    assert_eq!(contents, expected);
}

/// Raises the stop flag from inside the loop, the way a signal handler would.
struct InterruptAfter {
    after: u64,
    stop: &'static AtomicBool,
}

impl SessionObserver for InterruptAfter {
    fn on_sample(&mut self, seq: u64, _sample: &Sample) {
        if seq >= self.after {
            self.stop.store(true, Ordering::SeqCst);
        }
    }
}

#[test]
fn interrupt_leaves_complete_log() {
    static STOP: AtomicBool = AtomicBool::new(false);

    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("log.csv");
    let lines: Vec<String> = (0..1000)
        .map(|i| format!("{}.25,25.0,40.0,{}", 50 + i % 20, i % 256))
        .collect();
    let config = SessionConfig {
        log_path: Some(path.clone()),
        window_capacity: Some(10),
        ..Default::default()
    };

    let mut session = Session::new(config).with_clock(stepping_clock());
    session
        .connect(|| Ok(ReplayTransport::from_lines(lines)))
        .unwrap();
    let mut observer = InterruptAfter {
        after: 37,
        stop: &STOP,
    };
    let summary = session.run(&STOP, &mut observer).unwrap();

    assert_eq!(summary.stop_cause, StopCause::Interrupted);
    assert_eq!(summary.counts.samples_logged, 37);

    let contents = std::fs::read_to_string(&path).unwrap();
    assert!(contents.starts_with(&format!("{LOG_HEADER}\n")));
    assert!(contents.ends_with('\n'));
    assert_eq!(contents.lines().count(), 38);
    for row in contents.lines().skip(1) {
        assert_eq!(row.split(',').count(), 5, "incomplete row {row:?}");
    }
    // The log reads back cleanly.
    assert_eq!(analysis::load(&path).unwrap().len(), 37);
}

#[test]
fn missing_transport_is_fatal_and_writes_nothing() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("log.csv");
    let config = SessionConfig {
        log_path: Some(path.clone()),
        ..Default::default()
    };

    let mut session = Session::new(config);
    let err = session
        .connect(|| ReplayTransport::open(tmp.path().join("no_such_capture.txt")))
        .unwrap_err();

    assert!(matches!(err, SessionError::TransportUnavailable(_)));
    assert_eq!(session.state(), SessionState::Closed);
    assert!(!path.exists());
}

#[derive(Default)]
struct Frames {
    frames: Vec<(WindowSnapshot, SessionCounts)>,
    rejected: Vec<(String, RejectionReason)>,
}

impl SessionObserver for Frames {
    fn on_rejected(&mut self, line: &str, reason: &RejectionReason) {
        self.rejected.push((line.to_string(), *reason));
    }

    fn redraw(&mut self, snapshot: &WindowSnapshot, counts: &SessionCounts) -> std::io::Result<()> {
        self.frames.push((snapshot.clone(), *counts));
        Ok(())
    }
}

#[test]
fn live_without_log_redraws_bounded_window() {
    let lines: Vec<String> = (0..25).map(|i| format!("60,25,40,{i}")).collect();
    let config = SessionConfig {
        window_capacity: Some(5),
        redraw_interval: Duration::ZERO,
        ..Default::default()
    };

    let mut session = Session::new(config).with_clock(stepping_clock());
    session
        .connect(|| Ok(ReplayTransport::from_lines(lines)))
        .unwrap();
    let mut frames = Frames::default();
    let summary = session.run(&AtomicBool::new(false), &mut frames).unwrap();

    assert_eq!(summary.counts.samples_accepted, 25);
    assert_eq!(summary.counts.samples_logged, 0);
    assert!(summary.log_path.is_none());
    assert!(frames.frames.iter().all(|(snap, _)| snap.len() <= 5));

    let (last, counts) = frames.frames.last().unwrap();
    assert_eq!(counts.samples_accepted, 25);
    assert_eq!(last.first_index, 20);
    let fans: Vec<f64> = last.samples.iter().map(|s| s.fan_speed).collect();
    assert_eq!(fans, vec![20.0, 21.0, 22.0, 23.0, 24.0]);
}

#[test]
fn rejected_lines_reach_observer() {
    let mut session = Session::new(SessionConfig::default()).with_clock(stepping_clock());
    session
        .connect(|| Ok(ReplayTransport::from_lines(["1,2,3,4", "1,x,3,4", "  ", "1,2"])))
        .unwrap();
    let mut frames = Frames::default();
    session.run(&AtomicBool::new(false), &mut frames).unwrap();

    let reasons: Vec<RejectionReason> = frames.rejected.iter().map(|(_, r)| *r).collect();
    assert_eq!(
        reasons,
        vec![
            RejectionReason::NotNumeric(1),
            RejectionReason::Empty,
            RejectionReason::MalformedFieldCount(2),
        ]
    );
}

#[test]
fn analysis_distinguishes_missing_and_malformed_logs() {
    let tmp = tempfile::tempdir().unwrap();

    let missing = tmp.path().join("missing.csv");
    assert!(matches!(analysis::load(&missing), Err(AnalysisError::NotFound(_))));

    let bad = tmp.path().join("bad.csv");
    std::fs::write(&bad, format!("{LOG_HEADER}\n2026-03-01T12:00:00,1,2,3\n")).unwrap();
    assert!(matches!(
        analysis::load(&bad),
        Err(AnalysisError::MalformedLog { line: 2, .. })
    ));

    let empty = tmp.path().join("empty.csv");
    std::fs::write(&empty, format!("{LOG_HEADER}\n")).unwrap();
    let samples = analysis::load(&empty).unwrap();
    assert!(matches!(summarize(&samples), Err(AnalysisError::EmptySession)));
}
