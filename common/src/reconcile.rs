//! Fold reviewed submissions into the leaderboard.
//!
//! One run sorts both sheets into the order the scan and the lookup need, reads each
//! sheet once, credits every approved submission in memory, writes the totals back in a
//! single bulk write, deletes the reviewed submissions and re-sorts the leaderboard for
//! display. Nothing is written until every row has been validated, so a run that fails
//! leaves the totals and the queue as they were.

use crate::compactor::compact_queue;
use crate::error::{ReconcileError, Result};
use crate::grid::{Cell, GridRange, GridStore};
use crate::leaderboard_updater::{SortedBoard, apply_approved};
use crate::queue_scanner::scan_queue;
use crate::sheet_util::{SheetLayout, leaderboard};
use crate::sort_orchestrator::{sort_for_batch, sort_for_display, sort_for_lookup};
use crate::timestamp::stamp_last_updated;
use crate::{UnmatchedMember, UnmatchedPolicy};
use chrono::DateTime;
use chrono_tz::Tz;
use log::info;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};

/// Knobs for a single run.
#[derive(Debug, Clone, Default)]
pub struct ReconcileOptions {
    pub unmatched: UnmatchedPolicy,
    /// Write the "Last Updated" stamp with this time. `None` leaves the stamp alone.
    pub stamp_at: Option<DateTime<Tz>>,
}

/// Summary of a finished run.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ReconcileReport {
    pub rows_deleted: usize,
    pub rows_credited: usize,
    pub rows_disapproved: usize,
    pub rows_pending: usize,
    pub points_credited: f64,
    pub unmatched: Vec<UnmatchedMember>,
}

/// Run one reconciliation batch against the two sheets.
///
/// # Errors
/// Any store failure, a non-numeric leaderboard total, a malformed approved row, or a
/// sheet that is not in the order the run needs after sorting.
pub fn run_reconciliation<Q, B>(
    queue: &mut Q,
    board: &mut B,
    layout: &SheetLayout,
    options: &ReconcileOptions,
) -> Result<ReconcileReport>
where
    Q: GridStore + ?Sized,
    B: GridStore + ?Sized,
{
    let queue_layout = &layout.queue;
    let board_layout = &layout.leaderboard;

    // nothing submitted since the last run
    let first_row = queue.read_range(GridRange::new(
        queue_layout.header_rows,
        0,
        1,
        queue_layout.width(),
    ))?;
    if first_row.iter().flatten().all(Cell::is_blank) {
        info!("Approval queue is empty, nothing to reconcile.");
        return Ok(ReconcileReport::default());
    }

    sort_for_lookup(board, board_layout)?;
    sort_for_batch(queue, queue_layout)?;

    let queue_rows = queue.read_range(queue_layout.data_range(queue.row_count()))?;
    let board_rows = board.read_range(board_layout.data_range(board.row_count()))?;

    let scan = scan_queue(&queue_rows, queue_layout)?;
    let entries =
        leaderboard::rows_to_entries(&board_rows, board_layout, board_layout.header_rows)?;
    let mut sorted_board = SortedBoard::new(entries, board_layout.header_rows)?;
    let update = apply_approved(&mut sorted_board, &scan.approved, options.unmatched);

    // validated, start writing
    if update.credited > 0 {
        let rows = leaderboard::entries_to_rows(sorted_board.entries(), board_layout);
        board.write_range(board_layout.header_rows, 0, &rows)?;
    }

    let to_delete: Vec<usize> = scan
        .consumed_offsets()
        .into_iter()
        .filter(|offset| !update.retained.contains(offset))
        .collect();
    let rows_deleted = compact_queue(queue, queue_layout.header_rows, &to_delete)?;

    sort_for_display(board, board_layout)?;
    if let Some(at) = &options.stamp_at {
        stamp_last_updated(board, board_layout, at)?;
    }

    let report = ReconcileReport {
        rows_deleted,
        rows_credited: update.credited,
        rows_disapproved: scan.disapproved,
        rows_pending: scan.pending + update.retained.len(),
        points_credited: update.points_credited,
        unmatched: update.unmatched,
    };
    info!(
        "Reconciled {} submissions: {} credited ({} points), {} disapproved, {} unmatched, {} still pending",
        report.rows_deleted,
        report.rows_credited,
        report.points_credited,
        report.rows_disapproved,
        report.unmatched.len(),
        report.rows_pending
    );
    Ok(report)
}

/// Runs reconciliation batches, refusing to start one while another is in flight.
#[derive(Debug, Default)]
pub struct Reconciler {
    processing: AtomicBool,
}

impl Reconciler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_processing(&self) -> bool {
        self.processing.load(Ordering::Acquire)
    }

    /// Same as [`run_reconciliation`], guarded by the processing flag.
    ///
    /// # Errors
    /// `AlreadyRunning` if a run is in progress, otherwise whatever the run returns.
    pub fn run<Q, B>(
        &self,
        queue: &mut Q,
        board: &mut B,
        layout: &SheetLayout,
        options: &ReconcileOptions,
    ) -> Result<ReconcileReport>
    where
        Q: GridStore + ?Sized,
        B: GridStore + ?Sized,
    {
        let _guard = ProcessingGuard::acquire(&self.processing)?;
        run_reconciliation(queue, board, layout, options)
    }
}

/// Holds the processing flag; clears it when dropped, including on error.
struct ProcessingGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> ProcessingGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| ReconcileError::AlreadyRunning)?;
        Ok(Self { flag })
    }
}

impl Drop for ProcessingGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::MemoryGrid;
    use crate::sheet_util::pending;
    use crate::{Approval, LeaderboardEntry, PendingEntry, Tier};
    use chrono::TimeZone;

    fn submission(name: &str, points: f64, tier: Tier, approval: Approval) -> PendingEntry {
        PendingEntry {
            timestamp: None,
            member_name: name.to_string(),
            points,
            activity: "event".to_string(),
            tier,
            approval,
        }
    }

    fn queue_sheet(layout: &SheetLayout, submissions: &[PendingEntry]) -> MemoryGrid {
        let mut rows = vec![vec![Cell::text("Approval Status")], layout.queue.header_row()];
        rows.extend(submissions.iter().map(|s| pending::entry_to_row(s, &layout.queue)));
        MemoryGrid::from_rows(rows)
    }

    fn board_sheet(layout: &SheetLayout, entries: &[LeaderboardEntry]) -> MemoryGrid {
        let mut rows = vec![
            vec![Cell::text("Star & Lamp Leaderboard")],
            layout.leaderboard.header_row(),
        ];
        rows.extend(leaderboard::entries_to_rows(entries, &layout.leaderboard));
        MemoryGrid::from_rows(rows)
    }

    fn board_entries(layout: &SheetLayout, grid: &MemoryGrid) -> Vec<LeaderboardEntry> {
        leaderboard::rows_to_entries(&grid.rows()[2..], &layout.leaderboard, 2).unwrap()
    }

    fn queue_entries(layout: &SheetLayout, grid: &MemoryGrid) -> Vec<PendingEntry> {
        grid.rows()[2..]
            .iter()
            .enumerate()
            .map(|(i, r)| pending::row_to_entry(r, &layout.queue, i + 2).unwrap())
            .collect()
    }

    fn find<'a>(entries: &'a [LeaderboardEntry], name: &str) -> &'a LeaderboardEntry {
        entries.iter().find(|e| e.member_name == name).unwrap()
    }

    fn total_points(entries: &[LeaderboardEntry]) -> f64 {
        entries.iter().map(|e| e.grand_total).sum()
    }

    #[test_log::test]
    fn test_approved_and_disapproved_example() {
        let layout = SheetLayout::default();
        let mut queue = queue_sheet(
            &layout,
            &[
                submission("A", 10.0, Tier::Tier1, Approval::Approved),
                submission("B", 5.0, Tier::Tier2, Approval::Disapproved),
            ],
        );
        let mut board = board_sheet(&layout, &[LeaderboardEntry::new("A"), LeaderboardEntry::new("B")]);

        let report =
            run_reconciliation(&mut queue, &mut board, &layout, &ReconcileOptions::default()).unwrap();

        assert_eq!(report.rows_deleted, 2);
        assert_eq!(report.rows_credited, 1);
        assert_eq!(report.rows_disapproved, 1);
        assert_eq!(queue.row_count(), 2);

        let entries = board_entries(&layout, &board);
        let a = find(&entries, "A");
        assert_eq!(a.tier1_total, 10.0);
        assert_eq!(a.grand_total, 10.0);
        assert_eq!(a.period_total, 10.0);
        assert_eq!(find(&entries, "B"), &LeaderboardEntry::new("B"));
    }

    #[test_log::test]
    fn test_unmatched_member_is_dropped_and_reported() {
        let layout = SheetLayout::default();
        let mut queue = queue_sheet(&layout, &[submission("Z", 4.0, Tier::Tier3, Approval::Approved)]);
        let before = vec![LeaderboardEntry::new("A")];
        let mut board = board_sheet(&layout, &before);

        let report =
            run_reconciliation(&mut queue, &mut board, &layout, &ReconcileOptions::default()).unwrap();

        assert_eq!(report.rows_deleted, 1);
        assert_eq!(report.unmatched.len(), 1);
        assert_eq!(report.unmatched[0].member_name, "Z");
        assert_eq!(report.unmatched[0].row, 2);
        assert_eq!(queue.row_count(), 2);
        assert_eq!(board_entries(&layout, &board), before);
    }

    #[test_log::test]
    fn test_unmatched_member_is_retained_for_retry() {
        let layout = SheetLayout::default();
        let mut queue = queue_sheet(
            &layout,
            &[
                submission("A", 1.0, Tier::Tier1, Approval::Approved),
                submission("Z", 4.0, Tier::Tier3, Approval::Approved),
                submission("A", 2.0, Tier::Tier1, Approval::Disapproved),
                submission("A", 3.0, Tier::Tier1, Approval::Pending),
            ],
        );
        let mut board = board_sheet(&layout, &[LeaderboardEntry::new("A")]);
        let options = ReconcileOptions {
            unmatched: UnmatchedPolicy::Retain,
            stamp_at: None,
        };

        let report = run_reconciliation(&mut queue, &mut board, &layout, &options).unwrap();
        assert_eq!(report.rows_deleted, 2);
        assert_eq!(report.rows_pending, 2);

        let remaining = queue_entries(&layout, &queue);
        let names: Vec<(&str, Approval)> = remaining
            .iter()
            .map(|e| (e.member_name.as_str(), e.approval))
            .collect();
        assert_eq!(names, vec![("Z", Approval::Approved), ("A", Approval::Pending)]);

        // once Z registers, the retained row is credited
        let mut entries = board_entries(&layout, &board);
        entries.push(LeaderboardEntry::new("Z"));
        let mut board = board_sheet(&layout, &entries);
        let report = run_reconciliation(&mut queue, &mut board, &layout, &options).unwrap();
        assert_eq!(report.rows_credited, 1);
        assert_eq!(find(&board_entries(&layout, &board), "Z").tier3_total, 4.0);
    }

    #[test_log::test]
    fn test_pending_rows_survive_in_order() {
        let layout = SheetLayout::default();
        let mut queue = queue_sheet(
            &layout,
            &[
                submission("p1", 1.0, Tier::Tier1, Approval::Pending),
                submission("A", 1.0, Tier::Tier1, Approval::Approved),
                submission("p2", 2.0, Tier::Tier2, Approval::Pending),
                submission("B", 1.0, Tier::Tier1, Approval::Disapproved),
                submission("p3", 3.0, Tier::Tier3, Approval::Pending),
            ],
        );
        let mut board = board_sheet(&layout, &[LeaderboardEntry::new("A"), LeaderboardEntry::new("B")]);

        run_reconciliation(&mut queue, &mut board, &layout, &ReconcileOptions::default()).unwrap();

        let names: Vec<String> = queue_entries(&layout, &queue)
            .into_iter()
            .map(|e| e.member_name)
            .collect();
        assert_eq!(names, vec!["p1", "p2", "p3"]);
    }

    #[test_log::test]
    fn test_conservation_and_display_order() {
        let layout = SheetLayout::default();
        let mut queue = queue_sheet(
            &layout,
            &[
                submission("Cat", 3.0, Tier::Tier1, Approval::Approved),
                submission("Ann", 2.0, Tier::Tier2, Approval::Approved),
                submission("Bo", 8.0, Tier::Tier3, Approval::Approved),
                submission("Cat", 4.0, Tier::Tier2, Approval::Approved),
                submission("Ann", 50.0, Tier::Tier2, Approval::Disapproved),
            ],
        );
        let mut board = board_sheet(
            &layout,
            &[
                LeaderboardEntry::new("Cat"),
                LeaderboardEntry::new("Ann"),
                LeaderboardEntry::new("Bo"),
                LeaderboardEntry::new("Dee"),
            ],
        );
        let before = total_points(&board_entries(&layout, &board));

        let report =
            run_reconciliation(&mut queue, &mut board, &layout, &ReconcileOptions::default()).unwrap();

        let entries = board_entries(&layout, &board);
        assert_eq!(report.points_credited, 17.0);
        assert_eq!(total_points(&entries) - before, 17.0);
        let order: Vec<&str> = entries.iter().map(|e| e.member_name.as_str()).collect();
        assert_eq!(order, vec!["Bo", "Cat", "Ann", "Dee"]);
        assert_eq!(find(&entries, "Cat").tier2_total, 4.0);
        assert_eq!(find(&entries, "Cat").tier1_total, 3.0);
    }

    #[test_log::test]
    fn test_conservation_counts_matched_members_only() {
        let layout = SheetLayout::default();
        let mut queue = queue_sheet(
            &layout,
            &[
                submission("A", 3.0, Tier::Tier1, Approval::Approved),
                submission("Z", 9.0, Tier::Tier2, Approval::Approved),
                submission("B", 4.0, Tier::Tier3, Approval::Approved),
                submission("Y", 1.0, Tier::Tier1, Approval::Approved),
            ],
        );
        let mut board = board_sheet(&layout, &[LeaderboardEntry::new("A"), LeaderboardEntry::new("B")]);
        let before = total_points(&board_entries(&layout, &board));

        let report =
            run_reconciliation(&mut queue, &mut board, &layout, &ReconcileOptions::default()).unwrap();

        let entries = board_entries(&layout, &board);
        assert_eq!(total_points(&entries) - before, 7.0);
        assert_eq!(report.points_credited, 7.0);
        assert_eq!(report.rows_credited, 2);
        assert_eq!(report.rows_deleted, 4);
        let unmatched: Vec<(&str, f64)> = report
            .unmatched
            .iter()
            .map(|u| (u.member_name.as_str(), u.points))
            .collect();
        assert_eq!(unmatched, vec![("Z", 9.0), ("Y", 1.0)]);
        assert_eq!(find(&entries, "B").tier3_total, 4.0);
        assert_eq!(queue.row_count(), 2);
    }

    #[test_log::test]
    fn test_negative_points_abort_without_writing() {
        let layout = SheetLayout::default();
        let mut queue = queue_sheet(&layout, &[submission("A", -7.0, Tier::Tier1, Approval::Approved)]);
        let mut member = LeaderboardEntry::new("A");
        member.grand_total = 5.0;
        member.tier1_total = 5.0;
        let mut board = board_sheet(&layout, &[member.clone()]);
        let queue_before = queue.clone();

        let err = run_reconciliation(&mut queue, &mut board, &layout, &ReconcileOptions::default())
            .unwrap_err();

        assert!(matches!(err, ReconcileError::MalformedRow { row: 2, .. }));
        assert_eq!(board_entries(&layout, &board), vec![member]);
        assert_eq!(queue, queue_before);
    }

    #[test_log::test]
    fn test_whitespace_approval_counts_as_pending() {
        let layout = SheetLayout::default();
        let mut queue = queue_sheet(
            &layout,
            &[
                submission("p1", 2.0, Tier::Tier2, Approval::Pending),
                submission("A", 1.0, Tier::Tier1, Approval::Approved),
            ],
        );
        queue
            .write_range(2, layout.queue.approval, &[vec![Cell::text(" ")]])
            .unwrap();
        let mut board = board_sheet(&layout, &[LeaderboardEntry::new("A")]);

        let report =
            run_reconciliation(&mut queue, &mut board, &layout, &ReconcileOptions::default()).unwrap();

        assert_eq!(report.rows_credited, 1);
        assert_eq!(report.rows_pending, 1);
        let remaining = queue_entries(&layout, &queue);
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].member_name, "p1");
        assert_eq!(remaining[0].approval, Approval::Pending);
    }

    #[test_log::test]
    fn test_second_run_is_idempotent() {
        let layout = SheetLayout::default();
        let mut queue = queue_sheet(
            &layout,
            &[
                submission("A", 10.0, Tier::Tier1, Approval::Approved),
                submission("B", 5.0, Tier::Tier2, Approval::Approved),
            ],
        );
        let mut board = board_sheet(&layout, &[LeaderboardEntry::new("A"), LeaderboardEntry::new("B")]);
        let options = ReconcileOptions::default();

        run_reconciliation(&mut queue, &mut board, &layout, &options).unwrap();
        let after_first = board.clone();
        let report = run_reconciliation(&mut queue, &mut board, &layout, &options).unwrap();

        assert_eq!(report, ReconcileReport::default());
        assert_eq!(board, after_first);
    }

    #[test_log::test]
    fn test_non_numeric_total_aborts_without_writing() {
        let layout = SheetLayout::default();
        let mut queue = queue_sheet(&layout, &[submission("A", 10.0, Tier::Tier1, Approval::Approved)]);
        let mut board = board_sheet(&layout, &[LeaderboardEntry::new("A"), LeaderboardEntry::new("B")]);
        board
            .write_range(3, layout.leaderboard.tier2_total, &[vec![Cell::text("n/a")]])
            .unwrap();
        let board_before = board.clone();
        let queue_before = queue.clone();

        let err = run_reconciliation(&mut queue, &mut board, &layout, &ReconcileOptions::default())
            .unwrap_err();

        assert!(matches!(err, ReconcileError::NonNumericCell { row: 3, column: 3, .. }));
        assert_eq!(board, board_before);
        assert_eq!(queue, queue_before);
    }

    #[test_log::test]
    fn test_duplicate_member_aborts() {
        let layout = SheetLayout::default();
        let mut queue = queue_sheet(&layout, &[submission("A", 1.0, Tier::Tier1, Approval::Approved)]);
        let mut board = board_sheet(&layout, &[LeaderboardEntry::new("A"), LeaderboardEntry::new("A")]);
        let err = run_reconciliation(&mut queue, &mut board, &layout, &ReconcileOptions::default())
            .unwrap_err();
        assert!(matches!(err, ReconcileError::DuplicateMember { .. }));
        assert_eq!(queue.row_count(), 3);
    }

    #[test_log::test]
    fn test_empty_queue_touches_nothing() {
        let layout = SheetLayout::default();
        let mut queue = queue_sheet(&layout, &[]);
        let mut board = board_sheet(&layout, &[LeaderboardEntry::new("B"), LeaderboardEntry::new("A")]);
        let board_before = board.clone();
        let options = ReconcileOptions {
            unmatched: UnmatchedPolicy::Drop,
            stamp_at: Some(Tz::UTC.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()),
        };
        let report = run_reconciliation(&mut queue, &mut board, &layout, &options).unwrap();
        assert_eq!(report, ReconcileReport::default());
        assert_eq!(board, board_before);
    }

    #[test_log::test]
    fn test_stamp_written_after_run() {
        let layout = SheetLayout::default();
        let mut queue = queue_sheet(&layout, &[submission("A", 1.0, Tier::Tier1, Approval::Approved)]);
        let mut board = board_sheet(&layout, &[LeaderboardEntry::new("A")]);
        let options = ReconcileOptions {
            unmatched: UnmatchedPolicy::Drop,
            stamp_at: Some(
                crate::DEFAULT_TIME_ZONE
                    .with_ymd_and_hms(2024, 2, 29, 23, 59, 0)
                    .unwrap(),
            ),
        };
        run_reconciliation(&mut queue, &mut board, &layout, &options).unwrap();
        assert_eq!(
            board.cell(0, layout.leaderboard.stamp_col),
            &Cell::text("Last Updated: \n02/29/2024 23:59")
        );
    }

    #[test_log::test]
    fn test_reconciler_refuses_overlapping_run() {
        let layout = SheetLayout::default();
        let mut queue = queue_sheet(&layout, &[submission("A", 1.0, Tier::Tier1, Approval::Approved)]);
        let mut board = board_sheet(&layout, &[LeaderboardEntry::new("A")]);
        let reconciler = Reconciler::new();

        {
            let _in_flight = ProcessingGuard::acquire(&reconciler.processing).unwrap();
            assert!(reconciler.is_processing());
            let err = reconciler
                .run(&mut queue, &mut board, &layout, &ReconcileOptions::default())
                .unwrap_err();
            assert!(matches!(err, ReconcileError::AlreadyRunning));
            assert_eq!(queue.row_count(), 3);
        }

        assert!(!reconciler.is_processing());
        let report = reconciler
            .run(&mut queue, &mut board, &layout, &ReconcileOptions::default())
            .unwrap();
        assert_eq!(report.rows_credited, 1);
        assert!(!reconciler.is_processing());
    }

    #[test_log::test]
    fn test_reconciler_clears_flag_after_error() {
        let layout = SheetLayout::default();
        let mut queue = queue_sheet(&layout, &[submission("A", 1.0, Tier::Tier1, Approval::Approved)]);
        let mut board = board_sheet(&layout, &[LeaderboardEntry::new("A"), LeaderboardEntry::new("A")]);
        let reconciler = Reconciler::new();
        assert!(reconciler
            .run(&mut queue, &mut board, &layout, &ReconcileOptions::default())
            .is_err());
        assert!(!reconciler.is_processing());
    }
}
