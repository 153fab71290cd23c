//! Tests for `src/runtime.rs`: flush and hitch timers, shutdown, live viewers.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::DateTime;
use tempfile::TempDir;

use fxslog::clock::ManualClock;
use fxslog::live::{LiveHub, LiveSink, LIVE_CONSOLE_TOPIC};
use fxslog::terminal::TerminalWriter;
use fxslog::{FxsLogger, SharedLogger, StdioSource};

const TODAY_LOG: &str = "2026-03-14.log";

struct Discard;

impl TerminalWriter for Discard {
    fn write_raw(&mut self, _text: &str) {}
}

/// Live sink whose first delivery fails with a panic.
#[derive(Default)]
struct PanicsOnce {
    tripped: AtomicBool,
}

impl LiveSink for PanicsOnce {
    fn buffer(&self, _topic: &str, _data: &str) {
        if !self.tripped.swap(true, Ordering::SeqCst) {
            panic!("viewer transport went away");
        }
    }
}

fn builder(dir: &Path) -> fxslog::FxsLoggerBuilder {
    let start = DateTime::parse_from_rfc3339("2026-03-14T09:26:53+02:00")
        .expect("test timestamp should parse");
    FxsLogger::builder(dir)
        .clock(Arc::new(ManualClock::new(start)))
        .terminal(Box::new(Discard))
        .flush_interval(Duration::from_secs(5))
        .hitch_report_interval(Duration::from_secs(60))
}

fn shared(dir: &Path, hub: Option<LiveHub>) -> SharedLogger {
    let mut builder = builder(dir);
    if let Some(hub) = hub {
        builder = builder.live(Box::new(hub));
    }
    SharedLogger::new(builder.build())
}

fn read_log(dir: &TempDir) -> Option<String> {
    std::fs::read_to_string(dir.path().join(TODAY_LOG)).ok()
}

fn hitch_line(ms: u64) -> String {
    format!("server thread hitch warning: timer interval of {ms} milliseconds\n")
}

#[tokio::test(start_paused = true)]
async fn flush_timer_writes_after_one_interval() {
    let dir = tempfile::tempdir().expect("should create temp dir");
    let logger = shared(dir.path(), None);
    let _tasks = logger.spawn_tasks();

    logger.ingest_output(StdioSource::StdOut, "hello\n");

    tokio::time::sleep(Duration::from_secs(4)).await;
    assert!(read_log(&dir).is_none(), "nothing written before the first tick");

    tokio::time::sleep(Duration::from_secs(2)).await;
    let contents = read_log(&dir).expect("log file should exist after a tick");
    assert!(contents.ends_with("hello\n"));
}

#[tokio::test(start_paused = true)]
async fn hitch_timer_reports_once_per_interval() {
    let dir = tempfile::tempdir().expect("should create temp dir");
    let logger = shared(dir.path(), None);
    let _tasks = logger.spawn_tasks();

    logger.ingest_output(StdioSource::StdOut, hitch_line(100));
    logger.ingest_output(StdioSource::StdOut, hitch_line(300));
    assert!(logger.recent_buffer().is_empty());

    tokio::time::sleep(Duration::from_secs(59)).await;
    assert!(logger.recent_buffer().is_empty());

    tokio::time::sleep(Duration::from_secs(2)).await;
    let recent = logger.recent_buffer();
    assert!(recent.contains("Suppressed x2 server hitch warnings over the last 60 second(s)"));
    assert!(recent.contains("[min: 100ms] [max: 300ms] [avg: 200ms]"));

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(logger.recent_buffer(), recent, "an empty interval adds nothing");
}

#[tokio::test(start_paused = true)]
async fn shutdown_flushes_pending_text() {
    let dir = tempfile::tempdir().expect("should create temp dir");
    let logger = shared(dir.path(), None);
    let tasks = logger.spawn_tasks();

    logger.log_informational("stopping");
    let written = tasks.shutdown().await.expect("final flush should succeed");

    assert!(written > 0);
    let contents = read_log(&dir).expect("log file should exist");
    assert!(contents.contains("[fxslog] stopping"));
}

#[tokio::test(start_paused = true)]
async fn dropped_tasks_stop_flushing() {
    let dir = tempfile::tempdir().expect("should create temp dir");
    let logger = shared(dir.path(), None);
    drop(logger.spawn_tasks());

    logger.ingest_output(StdioSource::StdOut, "orphaned\n");
    tokio::time::sleep(Duration::from_secs(30)).await;

    assert!(read_log(&dir).is_none());
    assert!(logger.recent_buffer().contains("orphaned"));
}

#[tokio::test]
async fn zero_interval_is_clamped() {
    let dir = tempfile::tempdir().expect("should create temp dir");
    let logger = SharedLogger::new(
        builder(dir.path())
            .flush_interval(Duration::ZERO)
            .hitch_report_interval(Duration::ZERO)
            .build(),
    );
    let tasks = logger.spawn_tasks();
    tokio::task::yield_now().await;
    tasks.shutdown().await.expect("final flush should succeed");
}

#[tokio::test]
async fn viewer_gets_history_then_new_output() {
    let dir = tempfile::tempdir().expect("should create temp dir");
    let hub = LiveHub::default();
    let logger = shared(dir.path(), Some(hub.clone()));

    logger.ingest_output(StdioSource::StdOut, "before\n");
    let (history, mut rx) = logger.attach_viewer(&hub);
    assert!(history.ends_with("before\n"));
    assert_eq!(hub.viewer_count(), 1);

    logger.ingest_output(StdioSource::StdOut, "after\n");
    let chunk = rx.recv().await.expect("viewer should receive new output");
    assert_eq!(chunk.topic, LIVE_CONSOLE_TOPIC);
    assert!(chunk.data.ends_with("after\n"));
    assert!(!chunk.data.contains("before"));
}

#[tokio::test]
async fn clones_share_one_logger() {
    let dir = tempfile::tempdir().expect("should create temp dir");
    let logger = shared(dir.path(), None);
    let other = logger.clone();

    let handle = tokio::spawn(async move {
        other.log_admin_command("alice", "restart chat");
    });
    handle.await.expect("task should finish");

    assert!(logger.recent_buffer().contains("restart chat"));
    assert_eq!(logger.usage_stats(), format!("Buffer: {} B", logger.recent_buffer().len()));
}

#[tokio::test(start_paused = true)]
async fn hitch_timer_survives_a_panicking_tick() {
    let dir = tempfile::tempdir().expect("should create temp dir");
    let logger = SharedLogger::new(
        builder(dir.path())
            .live(Box::new(PanicsOnce::default()))
            .build(),
    );
    let _tasks = logger.spawn_tasks();

    logger.ingest_output(StdioSource::StdOut, hitch_line(10));
    tokio::time::sleep(Duration::from_secs(61)).await;

    logger.ingest_output(StdioSource::StdOut, hitch_line(20));
    tokio::time::sleep(Duration::from_secs(60)).await;

    let recent = logger.recent_buffer();
    assert!(
        recent.contains("Suppressed x1 server hitch warnings"),
        "second tick should still report, got {recent:?}"
    );
    assert!(recent.contains("[min: 20ms]"));
    assert_eq!(logger.with(|l| l.pending_hitch_samples()), 0);
}

#[tokio::test(start_paused = true)]
async fn report_interval_comes_from_the_logger() {
    let dir = tempfile::tempdir().expect("should create temp dir");
    let logger = SharedLogger::new(
        builder(dir.path())
            .hitch_report_interval(Duration::from_millis(1500))
            .build(),
    );
    let _tasks = logger.spawn_tasks();

    logger.ingest_output(StdioSource::StdOut, hitch_line(40));
    tokio::time::sleep(Duration::from_millis(1600)).await;

    assert!(logger
        .recent_buffer()
        .contains("over the last 1.5 second(s)"));
}

#[tokio::test]
async fn on_demand_flush_runs_off_the_runtime() {
    let dir = tempfile::tempdir().expect("should create temp dir");
    let logger = shared(dir.path(), None);

    logger.ingest_output(StdioSource::StdOut, "now\n");
    let written = logger
        .flush_file_buffer()
        .await
        .expect("flush should succeed");

    assert!(written > 0);
    assert!(read_log(&dir).is_some_and(|log| log.ends_with("now\n")));
    // The logger stays usable while and after the write runs.
    logger.ingest_output(StdioSource::StdOut, "later\n");
    assert!(logger.recent_buffer().ends_with("later\n"));
}

#[tokio::test]
async fn failed_flush_is_reported_and_next_flush_retries() {
    let dir = tempfile::tempdir().expect("should create temp dir");
    let blocker = dir.path().join("occupied");
    std::fs::write(&blocker, "not a directory").expect("create blocking file");
    let logger = SharedLogger::new(builder(&blocker).build());

    logger.log_informational("lost");
    assert!(matches!(
        logger.flush_file_buffer().await,
        Err(fxslog::runtime::FlushError::Sink(_))
    ));

    std::fs::remove_file(&blocker).expect("remove blocking file");
    logger.log_informational("kept");
    logger
        .flush_file_buffer()
        .await
        .expect("flush should succeed once the directory can be created");
    let log = std::fs::read_to_string(blocker.join(TODAY_LOG)).expect("log file");
    assert!(log.contains("kept"));
    assert!(!log.contains("lost"));
}
