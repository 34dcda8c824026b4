//! Rows of the approval queue.

use super::*;
use crate::error::{ReconcileError, Result};

fn malformed(row: usize, column: usize, reason: String) -> ReconcileError {
    ReconcileError::MalformedRow {
        row,
        reason: format!(
            "{} in cell {}",
            reason,
            crate::grid::cell_label(row, column)
        ),
    }
}

/// Read only the approval decision of a queue row.
/// `row` is the absolute sheet row, used for error messages.
pub fn row_approval(cells: &[Cell], layout: &QueueLayout, row: usize) -> Result<Approval> {
    let cell = cells.get(layout.approval).cloned().unwrap_or_default();
    conversions::cell_to_approval(&cell).map_err(|e| malformed(row, layout.approval, e))
}

/// Parse a full queue row.
pub fn row_to_entry(cells: &[Cell], layout: &QueueLayout, row: usize) -> Result<PendingEntry> {
    use conversions::*;
    let get = |column: usize| cells.get(column).cloned().unwrap_or_default();
    Ok(PendingEntry {
        timestamp: cell_to_timestamp(&get(layout.timestamp)),
        member_name: cell_to_name(&get(layout.name)).map_err(|e| malformed(row, layout.name, e))?,
        points: cell_to_points(&get(layout.points)).map_err(|e| malformed(row, layout.points, e))?,
        activity: cell_to_text(&get(layout.activity)),
        tier: cell_to_tier(&get(layout.tier)).map_err(|e| malformed(row, layout.tier, e))?,
        approval: row_approval(cells, layout, row)?,
    })
}

/// Lay a submission out as a queue row.
pub fn entry_to_row(entry: &PendingEntry, layout: &QueueLayout) -> Vec<Cell> {
    use conversions::*;
    let mut cells = vec![Cell::Empty; layout.width()];
    cells[layout.timestamp] = timestamp_to_cell(entry.timestamp);
    cells[layout.name] = name_to_cell(&entry.member_name);
    cells[layout.points] = points_to_cell(entry.points);
    cells[layout.activity] = Cell::text(entry.activity.clone());
    cells[layout.tier] = tier_to_cell(entry.tier);
    cells[layout.approval] = approval_to_cell(entry.approval);
    cells
}
