//! Shared handle and owned timers for a running [`FxsLogger`].
//!
//! [`SharedLogger`] serialises every entry point and timer tick behind one
//! mutex, so ingestion, flushes and reports never interleave. Timers are
//! Tokio tasks owned by [`LoggerTasks`]; they stop when it is shut down or
//! dropped, and never keep the runtime alive on their own.
//!
//! File writes run on the blocking pool. The logger mutex is held only while
//! the file buffer is swapped out, so stdio ingestion never waits on the disk.
//! A tick that panics is logged and the timer keeps running.

use std::any::Any;
use std::fmt::Display;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::file_sink::{lock_writer, DayFileWriter, FileSinkError, SharedDayFileWriter};
use crate::line::StdioSource;
use crate::live::{LiveChunk, LiveHub};
use crate::logger::FxsLogger;

/// Errors from a flush run on the blocking pool.
#[derive(Debug, thiserror::Error)]
pub enum FlushError {
    /// The log file could not be written.
    #[error(transparent)]
    Sink(#[from] FileSinkError),
    /// The blocking write task panicked or was cancelled.
    #[error("log flush task failed: {0}")]
    Task(#[from] JoinError),
}

/// Cloneable, thread-safe handle to one logger instance.
#[derive(Debug, Clone)]
pub struct SharedLogger {
    inner: Arc<Mutex<FxsLogger>>,
}

impl SharedLogger {
    /// Wrap `logger` for shared use.
    pub fn new(logger: FxsLogger) -> Self {
        Self {
            inner: Arc::new(Mutex::new(logger)),
        }
    }

    /// Run `f` with exclusive access to the logger.
    ///
    /// A panic in an earlier holder does not poison the handle; the logger
    /// only holds text buffers, which stay valid.
    pub fn with<R>(&self, f: impl FnOnce(&mut FxsLogger) -> R) -> R {
        let mut guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut *guard)
    }

    /// See [`FxsLogger::ingest_output`].
    pub fn ingest_output(&self, source: StdioSource, data: impl AsRef<[u8]>) {
        self.with(|logger| logger.ingest_output(source, data));
    }

    /// See [`FxsLogger::log_informational`].
    pub fn log_informational(&self, message: &str) {
        self.with(|logger| logger.log_informational(message));
    }

    /// See [`FxsLogger::log_fxserver_spawn`].
    pub fn log_fxserver_spawn(&self, pid: impl Display) {
        self.with(|logger| logger.log_fxserver_spawn(pid));
    }

    /// See [`FxsLogger::log_admin_command`].
    pub fn log_admin_command(&self, author: &str, command: &str) {
        self.with(|logger| logger.log_admin_command(author, command));
    }

    /// See [`FxsLogger::log_system_command`].
    pub fn log_system_command(&self, command: &str) {
        self.with(|logger| logger.log_system_command(command));
    }

    /// See [`FxsLogger::usage_stats`].
    pub fn usage_stats(&self) -> String {
        self.with(|logger| logger.usage_stats())
    }

    /// Snapshot of [`FxsLogger::recent_buffer`].
    pub fn recent_buffer(&self) -> String {
        self.with(|logger| logger.recent_buffer().to_owned())
    }

    /// Attach a live viewer: the current history plus a receiver for
    /// everything published after it, taken atomically so nothing is lost
    /// or repeated in between.
    ///
    /// `hub` must be the sink the logger was built with.
    pub fn attach_viewer(&self, hub: &LiveHub) -> (String, broadcast::Receiver<LiveChunk>) {
        self.with(|logger| (logger.recent_buffer().to_owned(), hub.subscribe()))
    }

    /// Write the file buffer on the blocking pool.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails or the blocking task panics.
    pub async fn flush_file_buffer(&self) -> Result<usize, FlushError> {
        let writer = self.with(|logger| logger.file_writer());
        flush_off_runtime(self.clone(), writer).await
    }

    /// Start the flush and hitch-report timers at the intervals the logger
    /// was built with.
    ///
    /// The first tick of each fires one full interval after this call.
    pub fn spawn_tasks(&self) -> LoggerTasks {
        let (flush_every, report_every, writer) = self.with(|logger| {
            (
                logger.flush_interval(),
                logger.hitch_report_interval(),
                logger.file_writer(),
            )
        });
        let flush = tokio::spawn(run_flush_timer(
            self.clone(),
            Arc::clone(&writer),
            flush_every,
        ));
        let hitch = tokio::spawn(run_hitch_timer(self.clone(), report_every));
        info!(
            flush_ms = u64::try_from(flush_every.as_millis()).unwrap_or(u64::MAX),
            report_ms = u64::try_from(report_every.as_millis()).unwrap_or(u64::MAX),
            "logger timers started"
        );
        LoggerTasks {
            logger: self.clone(),
            writer,
            flush,
            hitch,
        }
    }
}

/// Owned timer tasks of a [`SharedLogger`]. Dropping this stops them.
#[derive(Debug)]
pub struct LoggerTasks {
    logger: SharedLogger,
    writer: SharedDayFileWriter,
    flush: JoinHandle<()>,
    hitch: JoinHandle<()>,
}

impl LoggerTasks {
    /// Stop both timers and write whatever is still buffered.
    ///
    /// A write already in flight finishes first, so text keeps its order.
    ///
    /// # Errors
    ///
    /// Returns the error of the final flush.
    pub async fn shutdown(self) -> Result<usize, FlushError> {
        self.flush.abort();
        self.hitch.abort();
        let written = flush_off_runtime(self.logger.clone(), Arc::clone(&self.writer)).await?;
        info!(bytes = written, "logger timers stopped");
        Ok(written)
    }
}

impl Drop for LoggerTasks {
    fn drop(&mut self) {
        self.flush.abort();
        self.hitch.abort();
    }
}

fn interval_after(every: Duration) -> tokio::time::Interval {
    let every = every.max(Duration::from_millis(1));
    let start = tokio::time::Instant::now()
        .checked_add(every)
        .unwrap_or_else(tokio::time::Instant::now);
    let mut interval = tokio::time::interval_at(start, every);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}

/// Swap the buffer under the logger lock, then write holding only the writer.
///
/// The writer is locked before the logger is released, so batches reach the
/// file in the order they were taken.
fn write_batch(
    logger: &SharedLogger,
    writer: &Mutex<DayFileWriter>,
) -> Result<usize, FileSinkError> {
    let (batch, mut file) = logger.with(|inner| (inner.take_file_batch(), lock_writer(writer)));
    file.write(&batch)
}

async fn flush_off_runtime(
    logger: SharedLogger,
    writer: SharedDayFileWriter,
) -> Result<usize, FlushError> {
    let written = tokio::task::spawn_blocking(move || write_batch(&logger, &writer)).await??;
    Ok(written)
}

async fn run_flush_timer(logger: SharedLogger, writer: SharedDayFileWriter, every: Duration) {
    let mut interval = interval_after(every);
    loop {
        interval.tick().await;
        match flush_off_runtime(logger.clone(), Arc::clone(&writer)).await {
            Ok(0) => {}
            Ok(bytes) => debug!(bytes, "flushed log buffer"),
            Err(FlushError::Sink(e)) => {
                warn!(error = %e, "log buffer flush failed, dropping buffered text");
            }
            Err(FlushError::Task(e)) => error!(error = %e, "log flush task failed"),
        }
    }
}

async fn run_hitch_timer(logger: SharedLogger, every: Duration) {
    let mut interval = interval_after(every);
    loop {
        interval.tick().await;
        let tick = std::panic::catch_unwind(AssertUnwindSafe(|| {
            logger.with(FxsLogger::report_suppressed_hitches)
        }));
        match tick {
            Ok(true) => debug!("reported suppressed hitch warnings"),
            Ok(false) => {}
            Err(panic) => error!(
                panic = panic_message(panic.as_ref()),
                "hitch report tick panicked"
            ),
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message
    } else {
        "non-string panic payload"
    }
}
