//! Configuration loading.
//!
//! Loads `fxslog.toml` (or `$FXSLOG_CONFIG_PATH`). Environment variables
//! override file values; file values override defaults.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::file_sink::FILE_FLUSH_INTERVAL;
use crate::hitch::HITCH_REPORT_INTERVAL;

/// Logger configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggerConfig {
    /// Directory receiving one `YYYY-MM-DD.log` file per day.
    pub log_dir: PathBuf,

    /// Suppress terminal mirroring.
    pub quiet: bool,

    /// Host-imposed quiet mode; wins over `quiet`.
    pub force_quiet: bool,

    /// Milliseconds between file buffer flushes.
    pub flush_interval_ms: u64,

    /// Milliseconds between hitch-warning summaries.
    pub hitch_report_interval_ms: u64,

    /// Directory for the logger's own diagnostic logs.
    pub diagnostics_dir: PathBuf,

    /// Default `tracing` filter when `RUST_LOG` is unset.
    pub log_level: String,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            log_dir: PathBuf::from("logs/server"),
            quiet: false,
            force_quiet: false,
            flush_interval_ms: millis(FILE_FLUSH_INTERVAL),
            hitch_report_interval_ms: millis(HITCH_REPORT_INTERVAL),
            diagnostics_dir: PathBuf::from("logs/diagnostics"),
            log_level: "info".to_owned(),
        }
    }
}

impl LoggerConfig {
    /// Load configuration with precedence: env vars > TOML file > defaults.
    ///
    /// If the file does not exist, defaults are used.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load() -> Result<Self> {
        Self::load_with(|key| std::env::var(key).ok())
    }

    /// Load using a custom env resolver (avoids `set_var` in tests).
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_with(env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let path = env("FXSLOG_CONFIG_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("fxslog.toml"));

        let mut config = match std::fs::read_to_string(&path) {
            Ok(contents) => {
                tracing::info!(path = %path.display(), "loading config from file");
                Self::from_toml(&contents)?
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "no config file found, using defaults");
                Self::default()
            }
            Err(e) => {
                return Err(e).with_context(|| format!("failed to read {}", path.display()));
            }
        };
        config.apply_overrides(env);
        Ok(config)
    }

    /// Parse a TOML document.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is not valid TOML for this schema.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str).context("failed to parse config TOML")
    }

    /// Apply environment variable overrides.
    pub fn apply_overrides(&mut self, env: impl Fn(&str) -> Option<String>) {
        if let Some(v) = env("FXSLOG_LOG_DIR") {
            self.log_dir = PathBuf::from(v);
        }
        if let Some(v) = env("FXSLOG_QUIET") {
            apply_bool("FXSLOG_QUIET", &v, &mut self.quiet);
        }
        if let Some(v) = env("FXSLOG_FORCE_QUIET") {
            apply_bool("FXSLOG_FORCE_QUIET", &v, &mut self.force_quiet);
        }
        if let Some(v) = env("FXSLOG_LOG_LEVEL") {
            self.log_level = v;
        }
    }

    /// File flush cadence.
    pub fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.flush_interval_ms)
    }

    /// Hitch summary cadence.
    pub fn hitch_report_interval(&self) -> Duration {
        Duration::from_millis(self.hitch_report_interval_ms)
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

fn apply_bool(var: &str, value: &str, target: &mut bool) {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => *target = true,
        "0" | "false" | "no" | "off" => *target = false,
        _ => tracing::warn!(var, value, "ignoring invalid env override"),
    }
}
