//! The tabular store the reconciliation runs against.
//!
//! Sheets are addressed as a 2-D grid of cells with 0-based row and column indices.
//! Only bulk primitives are exposed so a run costs a fixed number of store calls
//! regardless of how long the queue is.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::path::PathBuf;

/// A single cell value.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum Cell {
    #[default]
    Empty,
    Number(f64),
    Text(String),
    Bool(bool),
    DateTime(DateTime<Utc>),
}

impl Cell {
    pub fn text(s: impl Into<String>) -> Self {
        Cell::Text(s.into())
    }

    /// Empty cells and whitespace-only strings both count as blank.
    pub fn is_blank(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    fn type_rank(&self) -> u8 {
        match self {
            Cell::Number(_) => 0,
            Cell::Text(_) => 1,
            Cell::Bool(_) => 2,
            Cell::DateTime(_) => 3,
            Cell::Empty => 4,
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Empty => Ok(()),
            Cell::Number(n) => write!(f, "{n}"),
            Cell::Text(s) => write!(f, "{s}"),
            Cell::Bool(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            Cell::DateTime(dt) => write!(f, "{}", dt.to_rfc3339()),
        }
    }
}

/// Order two cells the way a sheet sort does.
/// Blank cells go last in either direction; otherwise numbers < text < booleans < timestamps.
/// Text compares case-sensitively by code point.
pub fn compare_cells(a: &Cell, b: &Cell, ascending: bool) -> Ordering {
    match (a.is_blank(), b.is_blank()) {
        (true, true) => return Ordering::Equal,
        (true, false) => return Ordering::Greater,
        (false, true) => return Ordering::Less,
        (false, false) => {}
    }
    let ordering = match (a, b) {
        (Cell::Number(x), Cell::Number(y)) => x.total_cmp(y),
        (Cell::Text(x), Cell::Text(y)) => x.cmp(y),
        (Cell::Bool(x), Cell::Bool(y)) => x.cmp(y),
        (Cell::DateTime(x), Cell::DateTime(y)) => x.cmp(y),
        _ => a.type_rank().cmp(&b.type_rank()),
    };
    if ascending { ordering } else { ordering.reverse() }
}

/// A1-style label for a 0-based cell position, e.g. `(0, 6)` is `G1`.
pub fn cell_label(row: usize, column: usize) -> String {
    let mut letters = Vec::new();
    let mut n = column + 1;
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(char::from(b'A' + rem as u8));
        n = (n - 1) / 26;
    }
    letters.iter().rev().collect::<String>() + &(row + 1).to_string()
}

/// A rectangular block of cells.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct GridRange {
    pub start_row: usize,
    pub start_col: usize,
    pub num_rows: usize,
    pub num_cols: usize,
}

impl GridRange {
    pub fn new(start_row: usize, start_col: usize, num_rows: usize, num_cols: usize) -> Self {
        Self {
            start_row,
            start_col,
            num_rows,
            num_cols,
        }
    }

    pub fn end_row(&self) -> usize {
        self.start_row + self.num_rows
    }

    pub fn end_col(&self) -> usize {
        self.start_col + self.num_cols
    }

    pub fn is_empty(&self) -> bool {
        self.num_rows == 0 || self.num_cols == 0
    }

    pub fn contains_column(&self, column: usize) -> bool {
        column >= self.start_col && column < self.end_col()
    }
}

impl fmt::Display for GridRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "{} (empty)", cell_label(self.start_row, self.start_col));
        }
        write!(
            f,
            "{}:{}",
            cell_label(self.start_row, self.start_col),
            cell_label(self.end_row() - 1, self.end_col() - 1)
        )
    }
}

/// Errors raised by a store primitive.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Rows {start}..{end} are outside the sheet ({rows} rows)")]
    RowsOutOfBounds {
        start: usize,
        end: usize,
        rows: usize,
    },

    #[error("Sort column {column} is outside range {range}")]
    SortColumnOutsideRange { column: usize, range: GridRange },

    #[error("Ragged write: row {row} has {found} cells, expected {expected}")]
    RaggedWrite {
        row: usize,
        found: usize,
        expected: usize,
    },

    #[error("Workbook I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Workbook is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Holds the lock file's path.
    #[error(
        "Workbook is locked by another run; if no run is active, delete {}",
        .0.display()
    )]
    Locked(PathBuf),
}

/// Bulk primitives over one sheet.
pub trait GridStore {
    /// Number of rows up to and including the last non-blank one.
    fn row_count(&self) -> usize;

    /// Number of columns up to and including the last non-blank one in any row.
    fn column_count(&self) -> usize;

    /// Read a block. Cells beyond the populated extent read as `Cell::Empty`.
    fn read_range(&self, range: GridRange) -> Result<Vec<Vec<Cell>>, StoreError>;

    /// Write a rectangular block starting at the given cell, growing the sheet if needed.
    fn write_range(
        &mut self,
        start_row: usize,
        start_col: usize,
        values: &[Vec<Cell>],
    ) -> Result<(), StoreError>;

    /// Remove `count` rows starting at `start_row`; rows below move up.
    fn delete_rows(&mut self, start_row: usize, count: usize) -> Result<(), StoreError>;

    /// Stable sort of the rows in `range` by the cells in absolute column `column`.
    fn sort_range(
        &mut self,
        range: GridRange,
        column: usize,
        ascending: bool,
    ) -> Result<(), StoreError>;

    /// Append a row directly after the last non-blank row.
    fn append_row(&mut self, values: Vec<Cell>) -> Result<(), StoreError>;
}

/// A sheet held entirely in memory.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemoryGrid {
    rows: Vec<Vec<Cell>>,
}

impl MemoryGrid {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_rows(rows: Vec<Vec<Cell>>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn cell(&self, row: usize, column: usize) -> &Cell {
        static EMPTY: Cell = Cell::Empty;
        self.rows
            .get(row)
            .and_then(|r| r.get(column))
            .unwrap_or(&EMPTY)
    }

    /// Grow the sheet so rows `start_row..end_row` are at least `cols` wide.
    /// Rows outside that span keep their length.
    fn ensure_size(&mut self, start_row: usize, end_row: usize, cols: usize) {
        if self.rows.len() < end_row {
            self.rows.resize_with(end_row, Vec::new);
        }
        for row in &mut self.rows[start_row..end_row] {
            if row.len() < cols {
                row.resize(cols, Cell::Empty);
            }
        }
    }
}

impl GridStore for MemoryGrid {
    fn row_count(&self) -> usize {
        self.rows
            .iter()
            .rposition(|row| row.iter().any(|c| !c.is_blank()))
            .map_or(0, |i| i + 1)
    }

    fn column_count(&self) -> usize {
        self.rows
            .iter()
            .filter_map(|row| row.iter().rposition(|c| !c.is_blank()))
            .max()
            .map_or(0, |i| i + 1)
    }

    fn read_range(&self, range: GridRange) -> Result<Vec<Vec<Cell>>, StoreError> {
        Ok((range.start_row..range.end_row())
            .map(|r| {
                (range.start_col..range.end_col())
                    .map(|c| self.cell(r, c).clone())
                    .collect()
            })
            .collect())
    }

    fn write_range(
        &mut self,
        start_row: usize,
        start_col: usize,
        values: &[Vec<Cell>],
    ) -> Result<(), StoreError> {
        let Some(width) = values.first().map(Vec::len) else {
            return Ok(());
        };
        if let Some((row, found)) = values
            .iter()
            .enumerate()
            .find(|(_, r)| r.len() != width)
            .map(|(i, r)| (i, r.len()))
        {
            return Err(StoreError::RaggedWrite {
                row: start_row + row,
                found,
                expected: width,
            });
        }

        self.ensure_size(start_row, start_row + values.len(), start_col + width);
        for (offset, values_row) in values.iter().enumerate() {
            let row = &mut self.rows[start_row + offset];
            row[start_col..start_col + width].clone_from_slice(values_row);
        }
        Ok(())
    }

    fn delete_rows(&mut self, start_row: usize, count: usize) -> Result<(), StoreError> {
        let end = start_row + count;
        if end > self.rows.len() {
            return Err(StoreError::RowsOutOfBounds {
                start: start_row,
                end,
                rows: self.rows.len(),
            });
        }
        self.rows.drain(start_row..end);
        Ok(())
    }

    fn sort_range(
        &mut self,
        range: GridRange,
        column: usize,
        ascending: bool,
    ) -> Result<(), StoreError> {
        if range.is_empty() {
            return Ok(());
        }
        if !range.contains_column(column) {
            return Err(StoreError::SortColumnOutsideRange { column, range });
        }

        let mut block = self.read_range(range)?;
        let key = column - range.start_col;
        // Vec::sort_by is stable
        block.sort_by(|a, b| compare_cells(&a[key], &b[key], ascending));
        self.write_range(range.start_row, range.start_col, &block)
    }

    fn append_row(&mut self, values: Vec<Cell>) -> Result<(), StoreError> {
        let populated = self.row_count();
        self.rows.truncate(populated);
        self.rows.push(values);
        Ok(())
    }
}
