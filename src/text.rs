//! Line-level string helpers shared by the reconstructor, the transformer and
//! the file sink.
//!
//! The timestamp prefix produced by [`log_date_prefix_at`] is part of the
//! on-disk and console format and must stay byte-for-byte stable.

use std::sync::LazyLock;

use chrono::{DateTime, Datelike, FixedOffset, Local};
use regex::Regex;

/// Control characters the host terminal must never see, plus ANSI cursor and
/// erase sequences. CR, TAB and the ESC introducer of SGR colours survive.
static CONTROLS: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"[\x00-\x08\x0B-\x1A\x1C-\x1F\x7F]|(?:\x1B\[|\x{9B})[0-9;]+[@-K]").ok()
});

/// Any ESC-introduced sequence terminated by `m` (SGR colours).
static COLORS: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"\x1B[^m]*?m").ok());

/// Width of the rule lines produced by [`log_divider`].
const DIVIDER_WIDTH: usize = 64;

/// Result of [`split_first_line`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitFirstLine<'a> {
    /// First line including its terminator, or the whole input.
    pub first: &'a str,
    /// Content after the first line; `None` when the input ends exactly on
    /// its first line terminator or has no terminator at all.
    pub rest: Option<&'a str>,
    /// Whether a terminator was found (when `rest` is `None`) or whether
    /// `rest` itself ends with `\n`.
    pub eol: bool,
}

/// Split `text` into its first line and the remainder. Recognises `\n` and `\r\n`.
pub fn split_first_line(text: &str) -> SplitFirstLine<'_> {
    let Some(eol_index) = text.find('\n') else {
        return SplitFirstLine {
            first: text,
            rest: None,
            eol: false,
        };
    };

    let split_at = eol_index.saturating_add(1);
    if split_at == text.len() {
        return SplitFirstLine {
            first: text,
            rest: None,
            eol: true,
        };
    }

    let (first, rest) = text.split_at(split_at);
    SplitFirstLine {
        first,
        rest: Some(rest),
        eol: rest.ends_with('\n'),
    }
}

/// Remove one trailing `\r\n` or `\n`, returning the stripped text and the
/// terminator that was removed (empty if none).
pub fn strip_last_eol(text: &str) -> (&str, &'static str) {
    if let Some(stripped) = text.strip_suffix("\r\n") {
        (stripped, "\r\n")
    } else if let Some(stripped) = text.strip_suffix('\n') {
        (stripped, "\n")
    } else {
        (text, "")
    }
}

/// Insert `prefix` before every line of `text`, except a wholly empty
/// trailing line.
///
/// `"\n"` maps to an empty string; text without terminators is prefixed once.
pub fn prefix_multiline(text: &str, prefix: &str) -> String {
    if text.is_empty() || text == "\n" {
        return String::new();
    }

    let line_count = text.matches('\n').count().saturating_add(1);
    let mut out =
        String::with_capacity(text.len().saturating_add(prefix.len().saturating_mul(line_count)));
    for line in text.split_inclusive('\n') {
        out.push_str(prefix);
        out.push_str(line);
    }
    out
}

/// Zero-padded `YYYY-MM-DD`.
pub fn format_date_yyyymmdd(date: &impl Datelike) -> String {
    format!("{:04}-{:02}-{:02}", date.year(), date.month(), date.day())
}

/// Timestamp prefix for the current local time.
pub fn log_date_prefix() -> String {
    log_date_prefix_at(&Local::now().fixed_offset())
}

/// Build `"YYYY-MM-DD HH:MM:SS UTC±N: "` for `at`.
pub fn log_date_prefix_at(at: &DateTime<FixedOffset>) -> String {
    format!(
        "{} {}: ",
        at.format("%Y-%m-%d %H:%M:%S"),
        utc_offset_label(at.offset())
    )
}

/// `UTC` for a zero offset, otherwise `UTC+2`, `UTC-5`, `UTC+5.5`.
fn utc_offset_label(offset: &FixedOffset) -> String {
    let minutes = offset.local_minus_utc() / 60;
    if minutes == 0 {
        return "UTC".to_owned();
    }
    if minutes % 60 == 0 {
        return format!("UTC{:+}", minutes / 60);
    }
    format!("UTC{:+}", f64::from(minutes) / 60.0)
}

/// Strip disallowed control characters and cursor/erase sequences.
pub fn strip_controls(text: &str) -> String {
    match CONTROLS.as_ref() {
        Some(re) => re.replace_all(text, "").into_owned(),
        None => text.to_owned(),
    }
}

/// Strip SGR colour sequences.
pub fn strip_colors(text: &str) -> String {
    match COLORS.as_ref() {
        Some(re) => re.replace_all(text, "").into_owned(),
        None => text.to_owned(),
    }
}

/// Three-line banner framing `title`, each line terminated by `\n`.
pub fn log_divider(title: &str, at: &DateTime<FixedOffset>) -> String {
    let rule = "=".repeat(DIVIDER_WIDTH);
    let mut heading = format!(
        "======== {title} - {}",
        at.format("%Y-%m-%d %H:%M:%S")
    );
    if heading.len() < DIVIDER_WIDTH {
        heading.push(' ');
    }
    while heading.len() < DIVIDER_WIDTH {
        heading.push('=');
    }
    format!("{rule}\n{heading}\n{rule}\n")
}

/// Human-readable byte size, base 1024, up to two decimals: `512 B`, `12.06 KB`.
pub fn format_byte_size(bytes: usize) -> String {
    const UNITS: [&str; 4] = ["KB", "MB", "GB", "TB"];

    if bytes < 1024 {
        return format!("{bytes} B");
    }

    #[allow(clippy::cast_precision_loss)]
    let mut value = bytes as f64;
    let mut unit = UNITS[0];
    for candidate in UNITS {
        value /= 1024.0;
        unit = candidate;
        if value < 1024.0 {
            break;
        }
    }

    let rendered = format!("{value:.2}");
    let trimmed = rendered.trim_end_matches('0').trim_end_matches('.');
    format!("{trimmed} {unit}")
}
