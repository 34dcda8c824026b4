//! Put new submissions into the approval queue and record reviewer decisions.

use crate::error::{ReconcileError, Result};
use crate::grid::{Cell, GridRange, GridStore, StoreError};
use crate::sheet_util::{QueueLayout, conversions, pending};
use crate::{Approval, PendingEntry, Tier};
use chrono::{DateTime, Utc};
use log::info;

/// The answers from one form response.
#[derive(Debug, Clone, PartialEq)]
pub struct FormResponse {
    pub timestamp: DateTime<Utc>,
    pub member_name: String,
    pub points: f64,
    pub activity: String,
    pub tier: Tier,
}

/// Append a response to the end of the queue with a blank (pending) approval.
/// Returns the absolute sheet row it landed on.
///
/// # Errors
/// `MalformedRow` for a blank name or negative or non-finite points, or a store failure.
pub fn append_submission<S: GridStore + ?Sized>(
    queue: &mut S,
    layout: &QueueLayout,
    response: FormResponse,
) -> Result<usize> {
    let row = queue.row_count().max(layout.header_rows);
    if response.member_name.trim().is_empty() {
        return Err(ReconcileError::MalformedRow {
            row,
            reason: "member name is blank".to_string(),
        });
    }
    if let Err(reason) = conversions::validate_points(response.points) {
        return Err(ReconcileError::MalformedRow { row, reason });
    }

    let entry = PendingEntry {
        timestamp: Some(response.timestamp),
        member_name: response.member_name,
        points: response.points,
        activity: response.activity,
        tier: response.tier,
        approval: Approval::Pending,
    };
    if queue.row_count() < layout.header_rows {
        queue.write_range(0, 0, &layout.header_block())?;
    }
    queue.append_row(pending::entry_to_row(&entry, layout))?;
    info!(
        "Queued {} {} points for '{}' on row {}",
        entry.points,
        entry.tier,
        entry.member_name,
        row + 1
    );
    Ok(row)
}

/// Record a reviewer's decision on the submission at absolute sheet row `row`.
///
/// # Errors
/// `RowsOutOfBounds` if `row` is not a submission row.
pub fn set_approval<S: GridStore + ?Sized>(
    queue: &mut S,
    layout: &QueueLayout,
    row: usize,
    approval: Approval,
) -> Result<()> {
    let rows = queue.row_count();
    if row < layout.header_rows || row >= rows {
        return Err(StoreError::RowsOutOfBounds {
            start: row,
            end: row + 1,
            rows,
        }
        .into());
    }
    let current = queue.read_range(GridRange::new(row, 0, 1, layout.width()))?;
    if current.iter().flatten().all(Cell::is_blank) {
        return Err(ReconcileError::MalformedRow {
            row,
            reason: "row is blank".to_string(),
        });
    }
    queue.write_range(
        row,
        layout.approval,
        &[vec![conversions::approval_to_cell(approval)]],
    )?;
    Ok(())
}
