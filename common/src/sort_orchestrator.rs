//! The three sorts a run depends on.
//!
//! `sort_for_lookup` has to run before any member is looked up, and `sort_for_batch`
//! before the queue is scanned and compacted. `sort_for_display` runs last and is purely
//! cosmetic. The scanner and [`crate::leaderboard_updater::SortedBoard`] both re-check
//! the order they rely on, so skipping a sort fails the run instead of crediting the
//! wrong member or deleting the wrong rows.

use crate::grid::{GridStore, StoreError};
use crate::sheet_util::{LeaderboardLayout, QueueLayout};

/// Group the queue by approval: Approved, then Disapproved, then pending (blank) rows.
/// The sort is stable, so pending rows keep their submission order.
pub fn sort_for_batch<S: GridStore + ?Sized>(
    queue: &mut S,
    layout: &QueueLayout,
) -> Result<(), StoreError> {
    let range = layout.data_range(queue.row_count());
    queue.sort_range(range, layout.approval, true)
}

/// Sort members by name, ascending and case-sensitive, so they can be binary searched.
pub fn sort_for_lookup<S: GridStore + ?Sized>(
    board: &mut S,
    layout: &LeaderboardLayout,
) -> Result<(), StoreError> {
    let range = layout.data_range(board.row_count());
    board.sort_range(range, layout.name, true)
}

/// Sort members by total points, highest first. Ties keep their alphabetical order.
pub fn sort_for_display<S: GridStore + ?Sized>(
    board: &mut S,
    layout: &LeaderboardLayout,
) -> Result<(), StoreError> {
    let range = layout.data_range(board.row_count());
    board.sort_range(range, layout.grand_total, false)
}
