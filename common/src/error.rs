//! Errors raised while reconciling the approval queue into the leaderboard.

use crate::grid::{StoreError, cell_label};

/// Result type for reconciliation operations.
pub type Result<T> = std::result::Result<T, ReconcileError>;

/// Everything that can abort a reconciliation run.
/// Rows and columns are absolute, 0-based sheet positions; messages print them in A1 notation.
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error("Store failure: {0}")]
    Store(#[from] StoreError),

    #[error("Leaderboard cell {} is not a number (found {found:?})", cell_label(*.row, *.column))]
    NonNumericCell {
        row: usize,
        column: usize,
        found: String,
    },

    #[error("Malformed row {}: {reason}", .row + 1)]
    MalformedRow { row: usize, reason: String },

    #[error("Leaderboard is not sorted by name: '{name}' on row {} follows '{previous}'", .row + 1)]
    LeaderboardNotSorted {
        row: usize,
        name: String,
        previous: String,
    },

    #[error("Member '{name}' appears on the leaderboard more than once")]
    DuplicateMember { name: String },

    #[error("Approval queue is not grouped: reviewed row {} follows a pending row", .row + 1)]
    QueueNotGrouped { row: usize },

    #[error("A reconciliation run is already in progress")]
    AlreadyRunning,
}
