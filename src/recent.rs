//! Bounded, line-aligned history of web-formatted output.
//!
//! Seeds newly attached live viewers; fresh output reaches existing viewers
//! through the broadcast channel instead.

/// Default size ceiling in bytes.
pub const RECENT_BUFFER_MAX: usize = 256 * 1024;

/// Default number of bytes released by one trim.
pub const RECENT_BUFFER_TRIM: usize = 32 * 1024;

/// Text buffer that never exceeds its ceiling and never starts mid-line.
#[derive(Debug, Clone)]
pub struct RecentBuffer {
    data: String,
    max: usize,
    trim: usize,
}

impl Default for RecentBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl RecentBuffer {
    /// Create an empty buffer with the default limits.
    pub fn new() -> Self {
        Self::with_limits(RECENT_BUFFER_MAX, RECENT_BUFFER_TRIM)
    }

    /// Create an empty buffer holding at most `max` bytes, trimming by `trim`.
    pub fn with_limits(max: usize, trim: usize) -> Self {
        Self {
            data: String::new(),
            max,
            trim,
        }
    }

    /// Append `text`, trimming from the front if the ceiling is exceeded.
    pub fn append(&mut self, text: &str) {
        self.data.push_str(text);
        if self.data.len() > self.max {
            self.trim_front();
        }
    }

    /// Keep the newest `max - trim` bytes, then drop through the first `\n`.
    fn trim_front(&mut self) {
        let keep = self.max.saturating_sub(self.trim);
        let cut = self.data.len().saturating_sub(keep);
        let newline = self
            .data
            .as_bytes()
            .get(cut..)
            .and_then(|tail| tail.iter().position(|b| *b == b'\n'));

        match newline {
            Some(offset) => {
                let end = cut.saturating_add(offset).saturating_add(1);
                self.data.drain(..end);
            }
            None => self.data.clear(),
        }
    }

    /// Current contents.
    pub fn as_str(&self) -> &str {
        &self.data
    }

    /// Current size in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether nothing has been retained.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
