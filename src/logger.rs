//! Dispatch facade: classifies lines and fans each rendering out to its sinks.
//!
//! Every complete line, whether reconstructed from stdio or synthesised by
//! one of the `log_*` entry points, goes through the same path:
//! hitch suppression, then the transformer, then
//! file buffer / terminal (unless quiet) / recent buffer + live viewers.
//!
//! [`FxsLogger`] is synchronous and owns no timers; see
//! [`crate::runtime`] for the flush and hitch-report schedule.

use std::fmt::Display;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::clock::{Clock, SystemClock};
use crate::file_sink::{
    FileBatch, FileSinkError, RotatingFileSink, SharedDayFileWriter, FILE_FLUSH_INTERVAL,
};
use crate::hitch::{HitchAggregator, HITCH_REPORT_INTERVAL};
use crate::line::{LineType, StdioSource};
use crate::live::{LiveSink, NoViewers, LIVE_CONSOLE_TOPIC};
use crate::recent::RecentBuffer;
use crate::reconstructor::LineReconstructor;
use crate::terminal::{QuietFlags, QuietMode, StdoutTerminal, TerminalWriter};
use crate::text::{format_byte_size, log_date_prefix_at, log_divider};
use crate::transformer::{ConsoleTransformer, LineTransformer};

/// System commands starting with this are the control loop's own echo.
const CONSOLE_COMMAND_ECHO: &str = "txaEvent \"consoleCommand\"";

/// Builder for [`FxsLogger`]. Every collaborator has a working default.
pub struct FxsLoggerBuilder {
    log_dir: PathBuf,
    clock: Arc<dyn Clock>,
    transformer: Option<Box<dyn LineTransformer>>,
    terminal: Box<dyn TerminalWriter>,
    live: Box<dyn LiveSink>,
    quiet: Arc<dyn QuietMode>,
    recent: RecentBuffer,
    flush_interval: Duration,
    hitch_report_interval: Duration,
}

impl FxsLoggerBuilder {
    /// Use `clock` for timestamps and file rotation.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replace the default [`ConsoleTransformer`].
    pub fn transformer(mut self, transformer: Box<dyn LineTransformer>) -> Self {
        self.transformer = Some(transformer);
        self
    }

    /// Mirror terminal output somewhere other than stdout.
    pub fn terminal(mut self, terminal: Box<dyn TerminalWriter>) -> Self {
        self.terminal = terminal;
        self
    }

    /// Publish web output to `live`.
    pub fn live(mut self, live: Box<dyn LiveSink>) -> Self {
        self.live = live;
        self
    }

    /// Consult `quiet` before every terminal write.
    pub fn quiet(mut self, quiet: Arc<dyn QuietMode>) -> Self {
        self.quiet = quiet;
        self
    }

    /// Override the recent-buffer limits.
    pub fn recent_limits(mut self, max: usize, trim: usize) -> Self {
        self.recent = RecentBuffer::with_limits(max, trim);
        self
    }

    /// Cadence of the file flush timer.
    pub fn flush_interval(mut self, interval: Duration) -> Self {
        self.flush_interval = interval;
        self
    }

    /// Cadence of the hitch report timer, also quoted in the summary line.
    pub fn hitch_report_interval(mut self, interval: Duration) -> Self {
        self.hitch_report_interval = interval;
        self
    }

    /// Assemble the logger.
    pub fn build(self) -> FxsLogger {
        let transformer = self
            .transformer
            .unwrap_or_else(|| Box::new(ConsoleTransformer::new(Arc::clone(&self.clock))));
        FxsLogger {
            clock: self.clock,
            transformer,
            terminal: self.terminal,
            live: self.live,
            quiet: self.quiet,
            reconstructor: LineReconstructor::new(),
            hitches: HitchAggregator::new(),
            file: RotatingFileSink::new(self.log_dir),
            recent: self.recent,
            flush_interval: self.flush_interval,
            hitch_report_interval: self.hitch_report_interval,
        }
    }
}

/// Game-server output logger.
pub struct FxsLogger {
    clock: Arc<dyn Clock>,
    transformer: Box<dyn LineTransformer>,
    terminal: Box<dyn TerminalWriter>,
    live: Box<dyn LiveSink>,
    quiet: Arc<dyn QuietMode>,
    reconstructor: LineReconstructor,
    hitches: HitchAggregator,
    file: RotatingFileSink,
    recent: RecentBuffer,
    flush_interval: Duration,
    hitch_report_interval: Duration,
}

impl std::fmt::Debug for FxsLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FxsLogger")
            .field("file", &self.file)
            .field("recent_len", &self.recent.len())
            .field("pending_hitches", &self.hitches.pending())
            .finish_non_exhaustive()
    }
}

impl FxsLogger {
    /// Start building a logger that writes daily files into `log_dir`.
    pub fn builder(log_dir: impl Into<PathBuf>) -> FxsLoggerBuilder {
        FxsLoggerBuilder {
            log_dir: log_dir.into(),
            clock: Arc::new(SystemClock),
            transformer: None,
            terminal: Box::new(StdoutTerminal),
            live: Box::new(NoViewers),
            quiet: Arc::new(QuietFlags::default()),
            recent: RecentBuffer::new(),
            flush_interval: FILE_FLUSH_INTERVAL,
            hitch_report_interval: HITCH_REPORT_INTERVAL,
        }
    }

    /// Feed raw output of the child process. Accepts text or bytes.
    pub fn ingest_output(&mut self, source: StdioSource, data: impl AsRef<[u8]>) {
        let lines = self
            .reconstructor
            .push(source, data.as_ref(), self.clock.as_ref());
        let line_type = LineType::from(source);
        for line in lines {
            self.process_line(line_type, &line, None);
        }
    }

    /// Emit an informational note.
    pub fn log_informational(&mut self, message: &str) {
        self.process_line(LineType::MarkerInfo, &format!("{message}\n"), None);
    }

    /// Emit the banner announcing a (re)started server process.
    pub fn log_fxserver_spawn(&mut self, pid: impl Display) {
        if !self.recent.is_empty() {
            let separator = if self.transformer.last_eol() {
                "\n"
            } else {
                "\n\n"
            };
            self.process_line(LineType::MarkerInfo, separator, None);
        }

        let banner = log_divider(&format!("[{pid}] FXServer Starting"), &self.clock.now());
        for line in banner.split('\n') {
            if line.is_empty() {
                break;
            }
            self.process_line(LineType::MarkerInfo, &format!("{line}\n"), None);
        }
    }

    /// Emit a command typed by `author`.
    pub fn log_admin_command(&mut self, author: &str, command: &str) {
        self.process_line(
            LineType::MarkerAdminCmd,
            &format!("{command}\n"),
            Some(author),
        );
    }

    /// Emit a command issued by the supervisor. The control loop's own
    /// console-command echo is dropped.
    pub fn log_system_command(&mut self, command: &str) {
        if command.starts_with(CONSOLE_COMMAND_ECHO) {
            debug!("dropping console command echo");
            return;
        }
        self.process_line(LineType::MarkerSystemCmd, &format!("{command}\n"), None);
    }

    /// Short usage summary, e.g. `Buffer: 12.06 KB`.
    pub fn usage_stats(&self) -> String {
        format!("Buffer: {}", format_byte_size(self.recent.len()))
    }

    /// Full recent history, web-formatted. Not escaped for markup.
    pub fn recent_buffer(&self) -> &str {
        self.recent.as_str()
    }

    /// Bytes of the incomplete line pending for `source`.
    pub fn pending_line_len(&self, source: StdioSource) -> usize {
        self.reconstructor.pending_len(source)
    }

    /// Hitch samples waiting for the next report.
    pub fn pending_hitch_samples(&self) -> usize {
        self.hitches.pending()
    }

    /// Configured cadence of the file flush timer.
    pub fn flush_interval(&self) -> Duration {
        self.flush_interval
    }

    /// Configured cadence of the hitch report timer.
    pub fn hitch_report_interval(&self) -> Duration {
        self.hitch_report_interval
    }

    /// Swap out the file buffer, stamped with the current time, without writing it.
    pub fn take_file_batch(&mut self) -> FileBatch {
        let now = self.clock.now();
        self.file.take_batch(now)
    }

    /// Writer that [`FileBatch`]es from [`Self::take_file_batch`] belong to.
    pub fn file_writer(&self) -> SharedDayFileWriter {
        self.file.writer()
    }

    /// Write the file buffer to today's log file.
    ///
    /// # Errors
    ///
    /// Returns an error if the log file cannot be opened or written; the
    /// buffered text is dropped in that case.
    pub fn flush_file_buffer(&mut self) -> Result<usize, FileSinkError> {
        let now = self.clock.now();
        self.file.flush(&now)
    }

    /// Drain the hitch samples and emit one summary line if there were any.
    ///
    /// Returns whether a summary was emitted.
    pub fn report_suppressed_hitches(&mut self) -> bool {
        let Some(report) = self.hitches.take_report() else {
            return false;
        };
        let prefix = log_date_prefix_at(&self.clock.now());
        let line = report.summary_line(&prefix, self.hitch_report_interval);
        self.process_line(LineType::StdOut, &line, None);
        true
    }

    fn process_line(&mut self, line_type: LineType, data: &str, context: Option<&str>) {
        if self.hitches.try_suppress(line_type, data) {
            return;
        }

        let rendered = self.transformer.process(line_type, data, context);

        self.file.append(&rendered.file);

        if !self.quiet.is_quiet() {
            self.terminal.write_raw(&rendered.terminal);
        }

        self.live.buffer(LIVE_CONSOLE_TOPIC, &rendered.web);
        self.recent.append(&rendered.web);
    }
}
