//! Rendering of classified lines into their file, terminal and web forms.
//!
//! [`LineTransformer`] is the seam the dispatcher talks to; [`ConsoleTransformer`]
//! is the built-in renderer. Web output keeps ANSI colours since live viewers
//! render it with a terminal emulator.

use std::sync::Arc;

use crate::clock::Clock;
use crate::line::LineType;
use crate::text::{log_date_prefix_at, prefix_multiline, strip_last_eol};

const RED: &str = "\x1B[31m";
const CYAN: &str = "\x1B[36m";
const YELLOW: &str = "\x1B[33m";
const MAGENTA: &str = "\x1B[35m";
const RESET: &str = "\x1B[0m";

/// One line rendered for each sink.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Rendered {
    /// Text for live viewers and the recent buffer.
    pub web: String,
    /// Text mirrored verbatim to the controlling terminal.
    pub terminal: String,
    /// Text appended to the daily log file.
    pub file: String,
}

/// Turns a classified line into its per-sink renderings.
pub trait LineTransformer: Send {
    /// Render `text` of kind `line_type`. `context` carries e.g. a command author.
    fn process(&mut self, line_type: LineType, text: &str, context: Option<&str>) -> Rendered;

    /// Whether the most recent output ended on a line boundary.
    fn last_eol(&self) -> bool;
}

/// Default renderer: stdio passes through, stderr is red, markers get a
/// timestamp and a coloured tag on every line.
pub struct ConsoleTransformer {
    clock: Arc<dyn Clock>,
    last_eol: bool,
}

impl std::fmt::Debug for ConsoleTransformer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsoleTransformer")
            .field("last_eol", &self.last_eol)
            .finish_non_exhaustive()
    }
}

impl ConsoleTransformer {
    /// Create a transformer stamping marker lines with `clock`.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            last_eol: true,
        }
    }

    fn render_marker(&self, tag: &str, color: &str, text: &str) -> Rendered {
        // Bare line breaks are spacing, not content.
        if text.chars().all(|c| c == '\n' || c == '\r') {
            return Rendered {
                web: text.to_owned(),
                terminal: text.to_owned(),
                file: text.to_owned(),
            };
        }

        let date = log_date_prefix_at(&self.clock.now());
        let colored = prefix_multiline(text, &format!("{date}{color}{tag}{RESET} "));
        Rendered {
            web: colored.clone(),
            terminal: colored,
            file: prefix_multiline(text, &format!("{date}{tag} ")),
        }
    }
}

impl LineTransformer for ConsoleTransformer {
    fn process(&mut self, line_type: LineType, text: &str, context: Option<&str>) -> Rendered {
        let rendered = match line_type {
            LineType::StdOut => Rendered {
                web: text.to_owned(),
                terminal: text.to_owned(),
                file: text.to_owned(),
            },
            LineType::StdErr => {
                let colored = colorize_lines(text, RED);
                Rendered {
                    web: colored.clone(),
                    terminal: colored,
                    file: text.to_owned(),
                }
            }
            LineType::MarkerInfo => self.render_marker("[fxslog]", CYAN, text),
            LineType::MarkerAdminCmd => {
                let tag = format!("[{}]", context.unwrap_or("admin"));
                self.render_marker(&tag, YELLOW, text)
            }
            LineType::MarkerSystemCmd => self.render_marker("[system]", MAGENTA, text),
        };
        self.last_eol = text.ends_with('\n');
        rendered
    }

    fn last_eol(&self) -> bool {
        self.last_eol
    }
}

/// Wrap each line's body in `color`, keeping terminators outside the colour.
fn colorize_lines(text: &str, color: &str) -> String {
    let mut out = String::with_capacity(text.len().saturating_add(16));
    for line in text.split_inclusive('\n') {
        let (body, eol) = strip_last_eol(line);
        out.push_str(color);
        out.push_str(body);
        out.push_str(RESET);
        out.push_str(eol);
    }
    out
}
