//! Interfaces between the application code and the sheets.
//!
//! The reconciliation never refers to a column by position; every position lives in the
//! layouts below and every cell is turned into a typed field by the submodules.

use super::*;
use crate::grid::{Cell, GridRange};

pub mod conversions;
pub mod leaderboard;
pub mod pending;

/// Where each field of a queue row lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueLayout {
    /// Rows above the first submission (title and column names).
    pub header_rows: usize,
    pub timestamp: usize,
    pub name: usize,
    pub points: usize,
    pub activity: usize,
    pub tier: usize,
    pub approval: usize,
}

impl Default for QueueLayout {
    fn default() -> Self {
        Self {
            header_rows: 2,
            timestamp: 0,
            name: 1,
            points: 2,
            activity: 3,
            tier: 4,
            approval: 5,
        }
    }
}

impl QueueLayout {
    fn columns(&self) -> [(usize, &'static str); 6] {
        [
            (self.timestamp, "Timestamp"),
            (self.name, "Name"),
            (self.points, "Points"),
            (self.activity, "Activity"),
            (self.tier, "Tier"),
            (self.approval, "Approval Status"),
        ]
    }

    /// Number of columns a queue row spans.
    pub fn width(&self) -> usize {
        self.columns().iter().map(|(c, _)| c + 1).max().unwrap_or(0)
    }

    /// Every submission row, given the sheet's current row count.
    pub fn data_range(&self, row_count: usize) -> GridRange {
        GridRange::new(
            self.header_rows,
            0,
            row_count.saturating_sub(self.header_rows),
            self.width(),
        )
    }

    pub fn header_row(&self) -> Vec<Cell> {
        header_row(self.width(), &self.columns())
    }

    /// Title and column names for a fresh sheet.
    pub fn header_block(&self) -> Vec<Vec<Cell>> {
        header_block(self.header_rows, QUEUE_SHEET_NAME, self.header_row())
    }
}

/// Where each total of a leaderboard row lives, plus the last-updated stamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaderboardLayout {
    pub header_rows: usize,
    pub name: usize,
    pub grand_total: usize,
    pub tier1_total: usize,
    pub tier2_total: usize,
    pub tier3_total: usize,
    pub period_total: usize,
    pub stamp_row: usize,
    pub stamp_col: usize,
}

impl Default for LeaderboardLayout {
    fn default() -> Self {
        Self {
            header_rows: 2,
            name: 0,
            grand_total: 1,
            tier1_total: 2,
            tier2_total: 3,
            tier3_total: 4,
            period_total: 5,
            stamp_row: 0,
            stamp_col: 6,
        }
    }
}

impl LeaderboardLayout {
    fn columns(&self) -> [(usize, &'static str); 6] {
        [
            (self.name, "Name"),
            (self.grand_total, "Total Points"),
            (self.tier1_total, "Tier 1"),
            (self.tier2_total, "Tier 2"),
            (self.tier3_total, "Tier 3"),
            (self.period_total, "Monthly Points"),
        ]
    }

    /// Number of columns a member row spans. The stamp cell sits outside it.
    pub fn width(&self) -> usize {
        self.columns().iter().map(|(c, _)| c + 1).max().unwrap_or(0)
    }

    pub fn data_range(&self, row_count: usize) -> GridRange {
        GridRange::new(
            self.header_rows,
            0,
            row_count.saturating_sub(self.header_rows),
            self.width(),
        )
    }

    pub fn tier_column(&self, tier: Tier) -> usize {
        match tier {
            Tier::Tier1 => self.tier1_total,
            Tier::Tier2 => self.tier2_total,
            Tier::Tier3 => self.tier3_total,
        }
    }

    pub fn header_row(&self) -> Vec<Cell> {
        header_row(self.width(), &self.columns())
    }

    pub fn header_block(&self) -> Vec<Vec<Cell>> {
        header_block(self.header_rows, LEADERBOARD_SHEET_NAME, self.header_row())
    }
}

/// Layout of both sheets.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SheetLayout {
    pub queue: QueueLayout,
    pub leaderboard: LeaderboardLayout,
}

fn header_row(width: usize, columns: &[(usize, &'static str)]) -> Vec<Cell> {
    let mut row = vec![Cell::Empty; width];
    for (column, title) in columns {
        row[*column] = Cell::text(*title);
    }
    row
}

/// `rows` header rows: the sheet title on the first, column names on the last.
fn header_block(rows: usize, title: &str, names: Vec<Cell>) -> Vec<Vec<Cell>> {
    let width = names.len();
    let mut block = vec![vec![Cell::Empty; width]; rows];
    if let Some(first) = block.first_mut()
        && rows > 1
    {
        first[0] = Cell::text(title);
    }
    if let Some(last) = block.last_mut() {
        *last = names;
    }
    block
}
