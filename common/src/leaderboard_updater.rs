//! Credit approved submissions to the members' running totals.

use crate::accumulator::accumulate_into;
use crate::binary_lookup::binary_lookup_by_key;
use crate::error::{ReconcileError, Result};
use crate::queue_scanner::ApprovedRow;
use crate::{LeaderboardEntry, PendingEntry, UnmatchedMember, UnmatchedPolicy};
use itertools::Itertools;
use log::{debug, warn};

/// Leaderboard rows known to be in strictly ascending name order.
/// This is the only way to look a member up, so an unsorted board can never be credited.
#[derive(Debug, Clone, PartialEq)]
pub struct SortedBoard {
    entries: Vec<LeaderboardEntry>,
}

impl SortedBoard {
    /// Check the order of a leaderboard snapshot.
    /// `first_row` is the absolute sheet row of `entries[0]`, used for error messages.
    ///
    /// # Errors
    /// `DuplicateMember` if a name repeats, `LeaderboardNotSorted` if the names are out of order.
    pub fn new(entries: Vec<LeaderboardEntry>, first_row: usize) -> Result<Self> {
        for (i, (previous, next)) in entries.iter().tuple_windows().enumerate() {
            if previous.member_name == next.member_name {
                return Err(ReconcileError::DuplicateMember {
                    name: next.member_name.clone(),
                });
            }
            if previous.member_name > next.member_name {
                return Err(ReconcileError::LeaderboardNotSorted {
                    row: first_row + i + 1,
                    name: next.member_name.clone(),
                    previous: previous.member_name.clone(),
                });
            }
        }
        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[LeaderboardEntry] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<LeaderboardEntry> {
        self.entries
    }

    pub fn position(&self, member_name: &str) -> Option<usize> {
        binary_lookup_by_key(&self.entries, member_name, |e| e.member_name.as_str())
    }

    /// Add a submission's points to the member's grand, period and tier totals.
    /// Returns the member's index, or `None` if nobody by that name is on the board.
    pub fn credit(&mut self, submission: &PendingEntry) -> Option<usize> {
        let index = self.position(&submission.member_name)?;
        let entry = &mut self.entries[index];
        accumulate_into(&mut entry.grand_total, submission.points);
        accumulate_into(&mut entry.period_total, submission.points);
        accumulate_into(entry.tier_total_mut(submission.tier), submission.points);
        Some(index)
    }
}

/// What crediting a batch did.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BoardUpdate {
    pub credited: usize,
    pub points_credited: f64,
    pub unmatched: Vec<UnmatchedMember>,
    /// Queue offsets of unmatched rows that must stay in the queue.
    pub retained: Vec<usize>,
}

/// Credit every approved row in queue order.
pub fn apply_approved(
    board: &mut SortedBoard,
    approved: &[ApprovedRow],
    policy: UnmatchedPolicy,
) -> BoardUpdate {
    let mut update = BoardUpdate::default();

    for approved_row in approved {
        let submission = &approved_row.entry;
        if board.credit(submission).is_some() {
            debug!(
                "Credited {} {} points to '{}'",
                submission.points, submission.tier, submission.member_name
            );
            update.credited += 1;
            update.points_credited += submission.points;
            continue;
        }

        match policy {
            UnmatchedPolicy::Drop => warn!(
                "Row {}: '{}' is not on the leaderboard, dropping {} points",
                approved_row.row + 1,
                submission.member_name,
                submission.points
            ),
            UnmatchedPolicy::Retain => {
                warn!(
                    "Row {}: '{}' is not on the leaderboard, keeping the submission for a later run",
                    approved_row.row + 1,
                    submission.member_name
                );
                update.retained.push(approved_row.offset);
            }
        }
        update.unmatched.push(UnmatchedMember {
            row: approved_row.row,
            member_name: submission.member_name.clone(),
            points: submission.points,
            tier: submission.tier,
        });
    }

    update
}
