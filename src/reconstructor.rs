//! Turns arbitrary stdio chunks into complete, timestamp-prefixed lines.
//!
//! Each physical stream owns its own accumulator so bytes from stdout and
//! stderr never end up in the same line. A line's timestamp is taken when its
//! first character arrives, not when its terminator does.
//!
//! Accumulators are unbounded: a stream that never emits `\n` keeps growing
//! its pending line until it does.

use crate::clock::Clock;
use crate::line::StdioSource;
use crate::text::{log_date_prefix_at, strip_controls};

/// Per-stream partial line plus any incomplete UTF-8 tail of the last chunk.
#[derive(Debug, Default)]
struct PendingLine {
    text: String,
    utf8_carry: Vec<u8>,
}

impl PendingLine {
    /// Decode `bytes`, carrying an incomplete trailing sequence to the next call.
    fn decode(&mut self, bytes: &[u8]) -> String {
        let mut joined = std::mem::take(&mut self.utf8_carry);
        joined.extend_from_slice(bytes);

        let mut out = String::with_capacity(joined.len());
        let mut remaining: &[u8] = &joined;
        loop {
            match std::str::from_utf8(remaining) {
                Ok(valid) => {
                    out.push_str(valid);
                    break;
                }
                Err(e) => {
                    let (valid, invalid) = remaining.split_at(e.valid_up_to());
                    out.push_str(&String::from_utf8_lossy(valid));
                    match e.error_len() {
                        Some(len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            remaining = invalid.get(len..).unwrap_or_default();
                        }
                        None => {
                            self.utf8_carry = invalid.to_vec();
                            break;
                        }
                    }
                }
            }
        }
        out
    }

    /// Append `chunk`, returning every line it completed.
    fn push(&mut self, chunk: &str, clock: &dyn Clock) -> Vec<String> {
        let mut completed = Vec::new();
        for segment in chunk.split_inclusive('\n') {
            if self.text.is_empty() {
                self.text.push_str(&log_date_prefix_at(&clock.now()));
            }
            self.text.push_str(segment);
            if segment.ends_with('\n') {
                completed.push(std::mem::take(&mut self.text));
            }
        }
        completed
    }
}

/// Line reconstructor holding one accumulator per stdio stream.
#[derive(Debug, Default)]
pub struct LineReconstructor {
    stdout: PendingLine,
    stderr: PendingLine,
}

impl LineReconstructor {
    /// Create a reconstructor with empty accumulators.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a raw chunk from `source`.
    ///
    /// The chunk is decoded as UTF-8 (invalid bytes become U+FFFD), stripped
    /// of disallowed control characters, then appended to that stream's
    /// accumulator. Returns the lines completed by this chunk, in order, each
    /// ending with `\n`.
    pub fn push(&mut self, source: StdioSource, data: &[u8], clock: &dyn Clock) -> Vec<String> {
        let pending = self.pending_mut(source);
        let decoded = pending.decode(data);
        pending.push(&strip_controls(&decoded), clock)
    }

    /// Length in bytes of the incomplete line pending for `source`.
    pub fn pending_len(&self, source: StdioSource) -> usize {
        match source {
            StdioSource::StdOut => self.stdout.text.len(),
            StdioSource::StdErr => self.stderr.text.len(),
        }
    }

    fn pending_mut(&mut self, source: StdioSource) -> &mut PendingLine {
        match source {
            StdioSource::StdOut => &mut self.stdout,
            StdioSource::StdErr => &mut self.stderr,
        }
    }
}
