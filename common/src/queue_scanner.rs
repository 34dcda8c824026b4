//! Walk the approval queue and decide what happens to each submission.

use crate::error::{ReconcileError, Result};
use crate::grid::Cell;
use crate::sheet_util::{QueueLayout, pending};
use crate::{Approval, PendingEntry};

/// What a run does with one queue row.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RowAction {
    /// Still waiting on a reviewer. Never consumed.
    Skip,
    /// Disapproved: deleted without touching the leaderboard.
    ConsumeOnly,
    /// Approved: credited to the leaderboard, then deleted.
    ConsumeAndAggregate,
}

impl From<Approval> for RowAction {
    fn from(approval: Approval) -> Self {
        match approval {
            Approval::Pending => RowAction::Skip,
            Approval::Disapproved => RowAction::ConsumeOnly,
            Approval::Approved => RowAction::ConsumeAndAggregate,
        }
    }
}

/// An approved submission and where it sits in the queue.
#[derive(Debug, Clone, PartialEq)]
pub struct ApprovedRow {
    /// Offset from the first data row.
    pub offset: usize,
    /// Absolute sheet row.
    pub row: usize,
    pub entry: PendingEntry,
}

/// Result of scanning the queue once.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QueueScan {
    /// Reviewed rows at the top of the queue. They are always the first `consumed` data rows.
    pub consumed: usize,
    pub approved: Vec<ApprovedRow>,
    pub disapproved: usize,
    pub pending: usize,
}

impl QueueScan {
    /// Offsets of every reviewed row, ascending.
    pub fn consumed_offsets(&self) -> Vec<usize> {
        (0..self.consumed).collect()
    }
}

/// Scan the data rows of a queue that has been grouped by `sort_for_batch`.
/// Stops at the first entirely blank row. Approved rows are parsed in full; disapproved
/// rows only need a valid approval cell.
///
/// # Errors
/// Returns `QueueNotGrouped` if a reviewed row follows a pending one, since the
/// reviewed rows could then not be deleted as one block, and `MalformedRow` if an
/// approved row cannot be parsed.
pub fn scan_queue(rows: &[Vec<Cell>], layout: &QueueLayout) -> Result<QueueScan> {
    let mut scan = QueueScan::default();

    for (offset, cells) in rows.iter().enumerate() {
        if cells.iter().all(Cell::is_blank) {
            break;
        }
        let row = layout.header_rows + offset;
        let approval = pending::row_approval(cells, layout, row)?;

        match RowAction::from(approval) {
            RowAction::Skip => {
                scan.pending += 1;
                continue;
            }
            _ if scan.pending > 0 => return Err(ReconcileError::QueueNotGrouped { row }),
            RowAction::ConsumeOnly => scan.disapproved += 1,
            RowAction::ConsumeAndAggregate => {
                let entry = pending::row_to_entry(cells, layout, row)?;
                scan.approved.push(ApprovedRow { offset, row, entry });
            }
        }
        scan.consumed += 1;
    }

    log::debug!(
        "Scanned queue: {} approved, {} disapproved, {} pending",
        scan.approved.len(),
        scan.disapproved,
        scan.pending
    );
    Ok(scan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Tier;

    fn row(name: &str, points: f64, tier: &str, approval: &str) -> Vec<Cell> {
        vec![
            Cell::Empty,
            Cell::text(name),
            Cell::Number(points),
            Cell::text("activity"),
            Cell::text(tier),
            Cell::text(approval),
        ]
    }

    #[test_log::test]
    fn test_scan_classifies_rows() {
        let layout = QueueLayout::default();
        let rows = vec![
            row("A", 10.0, "Tier 1", "Approved"),
            row("B", 5.0, "Tier 2", "Disapproved"),
            row("C", 1.0, "Tier 3", ""),
        ];
        let scan = scan_queue(&rows, &layout).unwrap();
        assert_eq!(scan.consumed, 2);
        assert_eq!(scan.disapproved, 1);
        assert_eq!(scan.pending, 1);
        assert_eq!(scan.approved.len(), 1);
        assert_eq!(scan.approved[0].offset, 0);
        assert_eq!(scan.approved[0].row, 2);
        assert_eq!(scan.approved[0].entry.tier, Tier::Tier1);
        assert_eq!(scan.consumed_offsets(), vec![0, 1]);
    }

    #[test_log::test]
    fn test_scan_stops_at_blank_row() {
        let layout = QueueLayout::default();
        let rows = vec![
            row("A", 10.0, "Tier 1", "Approved"),
            vec![Cell::Empty; 6],
            row("stale", 99.0, "Tier 1", "Approved"),
        ];
        let scan = scan_queue(&rows, &layout).unwrap();
        assert_eq!(scan.consumed, 1);
        assert_eq!(scan.approved.len(), 1);
    }

    #[test_log::test]
    fn test_scan_rejects_ungrouped_queue() {
        let layout = QueueLayout::default();
        let rows = vec![
            row("A", 10.0, "Tier 1", ""),
            row("B", 5.0, "Tier 2", "Approved"),
        ];
        let err = scan_queue(&rows, &layout).unwrap_err();
        assert!(matches!(err, ReconcileError::QueueNotGrouped { row: 3 }));
    }

    #[test_log::test]
    fn test_scan_disapproved_row_needs_no_valid_fields() {
        let layout = QueueLayout::default();
        let rows = vec![row("", 0.0, "not a tier", "Disapproved")];
        let scan = scan_queue(&rows, &layout).unwrap();
        assert_eq!(scan.consumed, 1);
        assert_eq!(scan.disapproved, 1);
    }

    #[test_log::test]
    fn test_scan_approved_row_must_parse() {
        let layout = QueueLayout::default();
        let rows = vec![row("A", 10.0, "Tier 9", "Approved")];
        assert!(matches!(
            scan_queue(&rows, &layout).unwrap_err(),
            ReconcileError::MalformedRow { row: 2, .. }
        ));
    }

    #[test_log::test]
    fn test_scan_rejects_unknown_approval() {
        let layout = QueueLayout::default();
        let rows = vec![row("A", 10.0, "Tier 1", "Yes")];
        assert!(scan_queue(&rows, &layout).is_err());
    }

    #[test_log::test]
    fn test_scan_empty_queue() {
        let scan = scan_queue(&[], &QueueLayout::default()).unwrap();
        assert_eq!(scan, QueueScan::default());
    }
}
