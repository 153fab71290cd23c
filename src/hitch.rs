//! Folds bursts of "server thread hitch warning" lines into one periodic summary.
//!
//! Individual warnings with a parsable millisecond magnitude are swallowed and
//! recorded. A report tick drains the samples and, if there were any, yields a
//! single informational summary line. A warning whose magnitude cannot be
//! parsed is passed through unchanged.

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;

use crate::line::LineType;

/// Substring identifying a hitch warning.
pub const HITCH_WARNING_MARKER: &str = "server thread hitch warning";

/// Default cadence of the summary report.
pub const HITCH_REPORT_INTERVAL: Duration = Duration::from_secs(60);

static MAGNITUDE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(\d+) milliseconds").ok());

/// Collects hitch magnitudes between report ticks.
#[derive(Debug, Default)]
pub struct HitchAggregator {
    samples: Vec<u64>,
}

impl HitchAggregator {
    /// Create an aggregator with no samples.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `line` as a hitch sample if it is one.
    ///
    /// Returns `true` when the line was consumed and must not reach any sink.
    pub fn try_suppress(&mut self, line_type: LineType, line: &str) -> bool {
        if !line_type.is_hitch_eligible() || !line.contains(HITCH_WARNING_MARKER) {
            return false;
        }
        match parse_magnitude(line) {
            Some(ms) => {
                self.samples.push(ms);
                true
            }
            None => false,
        }
    }

    /// Number of samples waiting for the next report.
    pub fn pending(&self) -> usize {
        self.samples.len()
    }

    /// Drain all samples. Returns `None` if there were none.
    pub fn take_report(&mut self) -> Option<HitchReport> {
        let samples = std::mem::take(&mut self.samples);
        HitchReport::from_samples(&samples)
    }
}

fn parse_magnitude(line: &str) -> Option<u64> {
    let captures = MAGNITUDE.as_ref()?.captures(line)?;
    captures.get(1)?.as_str().parse().ok()
}

/// Statistics over the hitch warnings seen during one report interval.
#[derive(Debug, Clone, PartialEq)]
pub struct HitchReport {
    /// Number of suppressed warnings.
    pub count: usize,
    /// Smallest magnitude in milliseconds.
    pub min: u64,
    /// Largest magnitude in milliseconds.
    pub max: u64,
    /// Mean magnitude in milliseconds.
    pub avg: f64,
}

impl HitchReport {
    /// Compute statistics over `samples`. Returns `None` for an empty slice.
    pub fn from_samples(samples: &[u64]) -> Option<Self> {
        let min = *samples.iter().min()?;
        let max = *samples.iter().max()?;
        let sum = samples.iter().fold(0u64, |acc, v| acc.saturating_add(*v));
        let count = samples.len();

        #[allow(clippy::cast_precision_loss)]
        let avg = sum as f64 / count as f64;

        Some(Self {
            count,
            min,
            max,
            avg,
        })
    }

    /// Render the summary line, terminated by `\n`. Sub-second intervals keep
    /// their fraction (`1.5 second(s)`).
    pub fn summary_line(&self, prefix: &str, interval: Duration) -> String {
        format!(
            "{prefix}Suppressed x{} server hitch warnings over the last {} second(s) \
             [min: {}ms] [max: {}ms] [avg: {}ms]\n",
            self.count,
            interval.as_secs_f64(),
            self.min,
            self.max,
            self.avg,
        )
    }
}
