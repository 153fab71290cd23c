//! Tests for `src/reconstructor.rs`.

use chrono::TimeDelta;

use fxslog::clock::ManualClock;
use fxslog::reconstructor::LineReconstructor;
use fxslog::StdioSource;

use crate::support::{at, START, START_PREFIX};

#[test]
fn complete_lines_are_prefixed_and_emitted_in_order() {
    let clock = ManualClock::new(at(START));
    let mut rec = LineReconstructor::new();

    let lines = rec.push(StdioSource::StdOut, b"first\nsecond\n", &clock);

    assert_eq!(
        lines,
        vec![
            format!("{START_PREFIX}first\n"),
            format!("{START_PREFIX}second\n"),
        ]
    );
    assert_eq!(rec.pending_len(StdioSource::StdOut), 0);
}

#[test]
fn partial_line_keeps_timestamp_of_its_first_character() {
    let clock = ManualClock::new(at(START));
    let mut rec = LineReconstructor::new();

    assert!(rec.push(StdioSource::StdOut, b"hel", &clock).is_empty());
    clock.advance(TimeDelta::seconds(30));
    let lines = rec.push(StdioSource::StdOut, b"lo\nwor", &clock);

    assert_eq!(lines, vec![format!("{START_PREFIX}hello\n")]);
    assert_eq!(
        rec.pending_len(StdioSource::StdOut),
        "2026-03-14 09:27:23 UTC+2: wor".len()
    );

    let rest = rec.push(StdioSource::StdOut, b"ld\n", &clock);
    assert_eq!(rest, vec!["2026-03-14 09:27:23 UTC+2: world\n".to_owned()]);
}

#[test]
fn streams_never_share_a_line() {
    let clock = ManualClock::new(at(START));
    let mut rec = LineReconstructor::new();

    assert!(rec.push(StdioSource::StdOut, b"out-a ", &clock).is_empty());
    let err = rec.push(StdioSource::StdErr, b"err-b\n", &clock);
    let out = rec.push(StdioSource::StdOut, b"out-c\n", &clock);

    assert_eq!(err, vec![format!("{START_PREFIX}err-b\n")]);
    assert_eq!(out, vec![format!("{START_PREFIX}out-a out-c\n")]);
}

#[test]
fn bell_is_stripped_before_reconstruction() {
    let clock = ManualClock::new(at(START));
    let mut rec = LineReconstructor::new();

    let lines = rec.push(StdioSource::StdOut, b"be\x07ep\t\x1B[33mok\x1B[0m\r\n", &clock);

    assert_eq!(
        lines,
        vec![format!("{START_PREFIX}beep\t\x1B[33mok\x1B[0m\r\n")]
    );
}

#[test]
fn multibyte_character_split_across_chunks_survives() {
    let clock = ManualClock::new(at(START));
    let mut rec = LineReconstructor::new();
    let bytes = "naïve\n".as_bytes();

    assert!(rec.push(StdioSource::StdErr, &bytes[..3], &clock).is_empty());
    let lines = rec.push(StdioSource::StdErr, &bytes[3..], &clock);

    assert_eq!(lines, vec![format!("{START_PREFIX}naïve\n")]);
}

#[test]
fn pending_line_grows_without_cap() {
    let clock = ManualClock::new(at(START));
    let mut rec = LineReconstructor::new();
    let chunk = vec![b'x'; 64 * 1024];

    for _ in 0..8 {
        assert!(rec.push(StdioSource::StdOut, &chunk, &clock).is_empty());
    }

    assert_eq!(
        rec.pending_len(StdioSource::StdOut),
        START_PREFIX.len() + 8 * 64 * 1024
    );
}
