//! Error types for grid construction and solving.

use thiserror::Error;

use crate::grid::Position;

/// Errors raised by the grid and the walker.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MazeError {
    /// The grid cannot satisfy the border invariant.
    #[error("malformed grid: {reason}")]
    MalformedGrid {
        /// What went wrong.
        reason: String,
    },

    /// The perimeter scan did not find both an entry and an exit.
    #[error("perimeter scan found {found} of the 2 required openings")]
    NoOpeningFound {
        /// Number of openings discovered before the scan ran out.
        found: usize,
    },

    /// A dead end was reached with no open branch left to retry.
    #[error("dead end at {position} with no branch left to retry")]
    BacktrackExhausted {
        /// The dead end that could not be escaped.
        position: Position,
    },

    /// The walk took more steps than it was allowed to.
    #[error("solve exceeded the step limit of {limit}")]
    StepLimitExceeded {
        /// The configured budget.
        limit: usize,
    },
}

/// Result type for grid and walker operations.
pub type MazeResult<T> = std::result::Result<T, MazeError>;
