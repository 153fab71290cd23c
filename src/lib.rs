//! fxslog: stdio log pipeline for a supervised game-server process.
//!
//! Raw stdout/stderr chunks become timestamped lines that are appended to a
//! daily log file, mirrored to the terminal and kept in a bounded history
//! broadcast to live viewers. Bursts of server hitch warnings collapse into
//! one periodic summary.
//!
//! See `DESIGN.md` for the architecture notes.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod clock;
pub mod config;
pub mod file_sink;
pub mod hitch;
pub mod line;
pub mod live;
pub mod logger;
pub mod logging;
pub mod recent;
pub mod reconstructor;
pub mod runtime;
pub mod terminal;
pub mod text;
pub mod transformer;

pub use line::{LineType, StdioSource};
pub use logger::{FxsLogger, FxsLoggerBuilder};
pub use runtime::{LoggerTasks, SharedLogger};
