//! Tests for `src/logging.rs`.

use fxslog::logging::LoggingGuard;

#[test]
fn logging_guard_is_send() {
    fn assert_send<T: Send>() {}
    assert_send::<LoggingGuard>();
}

#[test]
fn init_production_creates_diagnostics_dir() {
    let tmp = tempfile::tempdir().expect("should create temp dir");
    let logs_dir = tmp.path().join("diagnostics");
    assert!(!logs_dir.exists());

    // Only one global subscriber per process; the directory is created
    // before installation is attempted.
    let _result = fxslog::logging::init_production(&logs_dir, "info");
    assert!(logs_dir.exists(), "diagnostics directory should be created");
}

#[test]
fn init_cli_tolerates_repeat_calls() {
    fxslog::logging::init_cli("warn");
    fxslog::logging::init_cli("debug");
}
