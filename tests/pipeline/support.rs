//! Capturing fakes and a ready-made logger shared by the pipeline tests.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, FixedOffset};
use tempfile::TempDir;

use fxslog::clock::ManualClock;
use fxslog::live::LiveSink;
use fxslog::terminal::{QuietFlags, TerminalWriter};
use fxslog::FxsLogger;

/// Start instant used by every harness: a Saturday morning at UTC+2.
pub const START: &str = "2026-03-14T09:26:53+02:00";

/// Prefix every line stamped at [`START`] carries.
pub const START_PREFIX: &str = "2026-03-14 09:26:53 UTC+2: ";

pub fn at(rfc3339: &str) -> DateTime<FixedOffset> {
    match DateTime::parse_from_rfc3339(rfc3339) {
        Ok(dt) => dt,
        Err(err) => panic!("test timestamp {rfc3339} should parse: {err}"),
    }
}

#[derive(Clone, Default)]
pub struct CapturedTerminal(Arc<Mutex<String>>);

impl CapturedTerminal {
    pub fn contents(&self) -> String {
        self.0.lock().expect("terminal lock").clone()
    }
}

impl TerminalWriter for CapturedTerminal {
    fn write_raw(&mut self, text: &str) {
        self.0.lock().expect("terminal lock").push_str(text);
    }
}

#[derive(Clone, Default)]
pub struct CapturedLive(Arc<Mutex<Vec<(String, String)>>>);

impl CapturedLive {
    pub fn chunks(&self) -> Vec<(String, String)> {
        self.0.lock().expect("live lock").clone()
    }

    pub fn joined(&self) -> String {
        self.chunks().into_iter().map(|(_, data)| data).collect()
    }
}

impl LiveSink for CapturedLive {
    fn buffer(&self, topic: &str, data: &str) {
        self.0
            .lock()
            .expect("live lock")
            .push((topic.to_owned(), data.to_owned()));
    }
}

pub struct Harness {
    pub logger: FxsLogger,
    pub clock: ManualClock,
    pub terminal: CapturedTerminal,
    pub live: CapturedLive,
    pub quiet: Arc<QuietFlags>,
    pub dir: TempDir,
}

impl Harness {
    /// Read the log file for `date` (`YYYY-MM-DD`), empty if absent.
    pub fn log_file(&self, date: &str) -> String {
        let path = self.dir.path().join(format!("{date}.log"));
        std::fs::read_to_string(path).unwrap_or_default()
    }
}

pub fn harness() -> Harness {
    harness_with_quiet(QuietFlags::new(false, false))
}

pub fn harness_with_quiet(quiet: QuietFlags) -> Harness {
    let dir = tempfile::tempdir().expect("should create temp dir");
    let clock = ManualClock::new(at(START));
    let terminal = CapturedTerminal::default();
    let live = CapturedLive::default();
    let quiet = Arc::new(quiet);

    let logger = FxsLogger::builder(dir.path())
        .clock(Arc::new(clock.clone()))
        .terminal(Box::new(terminal.clone()))
        .live(Box::new(live.clone()))
        .quiet(quiet.clone())
        .build();

    Harness {
        logger,
        clock,
        terminal,
        live,
        quiet,
        dir,
    }
}
