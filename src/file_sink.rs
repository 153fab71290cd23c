//! Buffered, daily-rotated log file.
//!
//! File-formatted text accumulates in memory and is written out on each
//! flush tick. The target is `{dir}/YYYY-MM-DD.log` for the flush-time date.
//! When that date no longer matches the open file, the pending buffer goes
//! to the old file, which is then closed; the next day's file is opened on
//! the next write. Colour sequences never reach disk.
//!
//! The date is only checked against a file that is already open. If nothing
//! was written on a given day, text buffered before midnight and flushed after
//! it lands in the new day's file.
//!
//! The buffer ([`RotatingFileSink`]) and the open file ([`DayFileWriter`]) are
//! locked separately: taking a [`FileBatch`] is a cheap swap, and the blocking
//! `std::fs` write can then run without holding whatever guards the buffer.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, FixedOffset, NaiveDate};
use tracing::{debug, info};

use crate::text::{format_date_yyyymmdd, strip_colors};

/// Default cadence of buffer flushes.
pub const FILE_FLUSH_INTERVAL: Duration = Duration::from_secs(5);

/// Errors produced while writing the log file.
#[derive(Debug, thiserror::Error)]
pub enum FileSinkError {
    /// The log directory could not be created.
    #[error("failed to create log directory {path}: {source}")]
    CreateDir {
        /// Directory that was being created.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// The day's log file could not be opened for appending.
    #[error("failed to open log file {path}: {source}")]
    Open {
        /// File that was being opened.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// Buffered text could not be written.
    #[error("failed to write log file {path}: {source}")]
    Write {
        /// File that was being written.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

/// The currently open day file.
#[derive(Debug)]
struct ActiveFile {
    path: PathBuf,
    file: File,
}

impl ActiveFile {
    fn open(dir: &Path, path: PathBuf) -> Result<Self, FileSinkError> {
        fs::create_dir_all(dir).map_err(|source| FileSinkError::CreateDir {
            path: dir.to_path_buf(),
            source,
        })?;
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|source| FileSinkError::Open {
                path: path.clone(),
                source,
            })?;
        debug!(path = %path.display(), "opened log file");
        Ok(Self { path, file })
    }

    /// Write `text` without colour codes. Returns the number of bytes written.
    fn write(&mut self, text: &str) -> Result<usize, FileSinkError> {
        if text.is_empty() {
            return Ok(0);
        }
        let plain = strip_colors(text);
        self.file
            .write_all(plain.as_bytes())
            .and_then(|()| self.file.flush())
            .map_err(|source| FileSinkError::Write {
                path: self.path.clone(),
                source,
            })?;
        Ok(plain.len())
    }
}

/// Text swapped out of the buffer, stamped with the time of the swap.
#[derive(Debug, Clone)]
pub struct FileBatch {
    /// File-formatted text, possibly empty.
    pub text: String,
    /// Flush time; selects the day file.
    pub at: DateTime<FixedOffset>,
}

/// Owner of the currently open day file.
#[derive(Debug)]
pub struct DayFileWriter {
    dir: PathBuf,
    active: Option<ActiveFile>,
}

impl DayFileWriter {
    /// Create a writer for `dir`. Nothing is opened until the first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            active: None,
        }
    }

    /// Log file path for `date`.
    pub fn path_for(&self, date: NaiveDate) -> PathBuf {
        day_file(&self.dir, date)
    }

    /// Path of the file currently held open, if any.
    pub fn active_path(&self) -> Option<&Path> {
        self.active.as_ref().map(|a| a.path.as_path())
    }

    /// Write `batch` to the file for its date.
    ///
    /// On a date change the text goes to the previous day's file, which is
    /// then closed. On error the text is dropped; the writer stays usable.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or file cannot be created, or the
    /// write fails.
    pub fn write(&mut self, batch: &FileBatch) -> Result<usize, FileSinkError> {
        let path = self.path_for(batch.at.date_naive());

        if let Some(mut previous) = self.active.take_if(|active| active.path != path) {
            info!(
                from = %previous.path.display(),
                to = %path.display(),
                "rotating log file"
            );
            return previous.write(&batch.text);
        }

        if batch.text.is_empty() {
            return Ok(0);
        }

        let mut active = match self.active.take() {
            Some(active) => active,
            None => ActiveFile::open(&self.dir, path)?,
        };
        let written = active.write(&batch.text);
        self.active = Some(active);
        written
    }
}

/// Day-file writer shared between a buffer and whoever performs its writes.
pub type SharedDayFileWriter = Arc<Mutex<DayFileWriter>>;

/// Lock `writer`, recovering from poisoning; it only holds a file handle.
pub fn lock_writer(writer: &Mutex<DayFileWriter>) -> MutexGuard<'_, DayFileWriter> {
    writer.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Daily-rotated file sink: an in-memory write buffer plus its day file.
#[derive(Debug)]
pub struct RotatingFileSink {
    dir: PathBuf,
    buffer: String,
    writer: SharedDayFileWriter,
}

impl RotatingFileSink {
    /// Create a sink writing into `dir`. Nothing is opened until the first flush.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        Self {
            writer: Arc::new(Mutex::new(DayFileWriter::new(dir.clone()))),
            dir,
            buffer: String::new(),
        }
    }

    /// Queue `text` for the next flush.
    pub fn append(&mut self, text: &str) {
        self.buffer.push_str(text);
    }

    /// Bytes waiting for the next flush.
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    /// Log file path for `date`.
    pub fn path_for(&self, date: NaiveDate) -> PathBuf {
        day_file(&self.dir, date)
    }

    /// Path of the file currently held open, if any.
    pub fn active_path(&self) -> Option<PathBuf> {
        lock_writer(&self.writer).active_path().map(Path::to_path_buf)
    }

    /// Handle to the writer, for flushing outside the buffer's owner.
    pub fn writer(&self) -> SharedDayFileWriter {
        Arc::clone(&self.writer)
    }

    /// Swap out the buffer without writing it.
    pub fn take_batch(&mut self, now: DateTime<FixedOffset>) -> FileBatch {
        FileBatch {
            text: std::mem::take(&mut self.buffer),
            at: now,
        }
    }

    /// Swap out the buffer and write it to the file for `now`'s date.
    ///
    /// # Errors
    ///
    /// See [`DayFileWriter::write`].
    pub fn flush(&mut self, now: &DateTime<FixedOffset>) -> Result<usize, FileSinkError> {
        let batch = self.take_batch(*now);
        lock_writer(&self.writer).write(&batch)
    }
}

fn day_file(dir: &Path, date: NaiveDate) -> PathBuf {
    dir.join(format!("{}.log", format_date_yyyymmdd(&date)))
}
