//! Terminal mirroring and the quiet-mode switch that gates it.

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::debug;

use crate::config::LoggerConfig;

/// Destination for terminal-formatted text.
pub trait TerminalWriter: Send {
    /// Write `text` as-is. Failures are not retried.
    fn write_raw(&mut self, text: &str);
}

/// Writes to the process's standard output.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdoutTerminal;

impl TerminalWriter for StdoutTerminal {
    fn write_raw(&mut self, text: &str) {
        let mut out = std::io::stdout().lock();
        if let Err(e) = out
            .write_all(text.as_bytes())
            .and_then(|()| out.flush())
        {
            debug!(error = %e, "terminal write failed");
        }
    }
}

/// Answers whether terminal mirroring is currently suppressed.
pub trait QuietMode: Send + Sync {
    /// `true` when nothing should be written to the terminal.
    fn is_quiet(&self) -> bool;
}

impl<T: QuietMode + ?Sized> QuietMode for Arc<T> {
    fn is_quiet(&self) -> bool {
        (**self).is_quiet()
    }
}

/// Local quiet flag (toggleable at runtime) plus a host-forced flag.
#[derive(Debug, Default)]
pub struct QuietFlags {
    quiet: AtomicBool,
    force_quiet: bool,
}

impl QuietFlags {
    /// Create flags from explicit values.
    pub fn new(quiet: bool, force_quiet: bool) -> Self {
        Self {
            quiet: AtomicBool::new(quiet),
            force_quiet,
        }
    }

    /// Take both flags from the loaded configuration.
    pub fn from_config(config: &LoggerConfig) -> Self {
        Self::new(config.quiet, config.force_quiet)
    }

    /// Change the local flag. Has no effect while the host forces quiet mode.
    pub fn set_quiet(&self, quiet: bool) {
        self.quiet.store(quiet, Ordering::Relaxed);
    }
}

impl QuietMode for QuietFlags {
    fn is_quiet(&self) -> bool {
        self.force_quiet || self.quiet.load(Ordering::Relaxed)
    }
}
