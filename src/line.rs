//! Line classification.

/// How a line is rendered and whether it may be folded into a hitch summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LineType {
    /// Reconstructed from the child's standard output.
    StdOut,
    /// Reconstructed from the child's standard error.
    StdErr,
    /// Informational note emitted by the supervisor itself.
    MarkerInfo,
    /// Command typed by an administrator.
    MarkerAdminCmd,
    /// Command issued by the supervisor's own control loop.
    MarkerSystemCmd,
}

impl LineType {
    /// Only standard-output lines are eligible for hitch-warning suppression.
    pub fn is_hitch_eligible(self) -> bool {
        matches!(self, Self::StdOut)
    }
}

/// Physical stream of the child process a chunk was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StdioSource {
    /// Standard output.
    StdOut,
    /// Standard error.
    StdErr,
}

impl From<StdioSource> for LineType {
    fn from(source: StdioSource) -> Self {
        match source {
            StdioSource::StdOut => Self::StdOut,
            StdioSource::StdErr => Self::StdErr,
        }
    }
}
