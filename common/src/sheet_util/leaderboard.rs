//! Rows of the leaderboard.

use super::*;
use crate::error::{ReconcileError, Result};

/// Parse member rows until the first entirely blank row.
/// `first_row` is the absolute sheet row of `rows[0]`.
pub fn rows_to_entries(
    rows: &[Vec<Cell>],
    layout: &LeaderboardLayout,
    first_row: usize,
) -> Result<Vec<LeaderboardEntry>> {
    let mut entries = Vec::new();
    for (offset, cells) in rows.iter().enumerate() {
        if cells.iter().all(Cell::is_blank) {
            break;
        }
        entries.push(row_to_entry(cells, layout, first_row + offset)?);
    }
    Ok(entries)
}

pub fn row_to_entry(
    cells: &[Cell],
    layout: &LeaderboardLayout,
    row: usize,
) -> Result<LeaderboardEntry> {
    use conversions::*;
    let get = |column: usize| cells.get(column).cloned().unwrap_or_default();
    let total = |column: usize| {
        cell_to_total(&get(column)).map_err(|found| ReconcileError::NonNumericCell {
            row,
            column,
            found,
        })
    };
    Ok(LeaderboardEntry {
        member_name: cell_to_name(&get(layout.name))
            .map_err(|reason| ReconcileError::MalformedRow { row, reason })?,
        tier1_total: total(layout.tier1_total)?,
        tier2_total: total(layout.tier2_total)?,
        tier3_total: total(layout.tier3_total)?,
        period_total: total(layout.period_total)?,
        grand_total: total(layout.grand_total)?,
    })
}

pub fn entry_to_row(entry: &LeaderboardEntry, layout: &LeaderboardLayout) -> Vec<Cell> {
    use conversions::*;
    let mut cells = vec![Cell::Empty; layout.width()];
    cells[layout.name] = name_to_cell(&entry.member_name);
    cells[layout.grand_total] = total_to_cell(entry.grand_total);
    cells[layout.tier1_total] = total_to_cell(entry.tier1_total);
    cells[layout.tier2_total] = total_to_cell(entry.tier2_total);
    cells[layout.tier3_total] = total_to_cell(entry.tier3_total);
    cells[layout.period_total] = total_to_cell(entry.period_total);
    cells
}

pub fn entries_to_rows(entries: &[LeaderboardEntry], layout: &LeaderboardLayout) -> Vec<Vec<Cell>> {
    entries.iter().map(|e| entry_to_row(e, layout)).collect()
}
