//! A workbook holding both sheets, persisted as one JSON file.

use crate::error::{ReconcileError, Result};
use crate::grid::{GridStore, MemoryGrid, StoreError};
use crate::sheet_util::{SheetLayout, leaderboard};
use crate::{LEADERBOARD_SHEET_NAME, LeaderboardEntry, QUEUE_SHEET_NAME};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

/// The approval queue and the leaderboard, keyed by their sheet names on disk.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Workbook {
    #[serde(rename = "Approval Status")]
    pub queue: MemoryGrid,
    #[serde(rename = "Star & Lamp Leaderboard")]
    pub leaderboard: MemoryGrid,
}

impl Workbook {
    /// Fresh workbook with header rows on both sheets and every member at zero.
    ///
    /// # Errors
    /// `DuplicateMember` if a name is listed twice.
    pub fn new<S: AsRef<str>>(layout: &SheetLayout, members: &[S]) -> Result<Self> {
        let mut workbook = Workbook {
            queue: MemoryGrid::from_rows(layout.queue.header_block()),
            leaderboard: MemoryGrid::from_rows(layout.leaderboard.header_block()),
        };
        for member in members {
            workbook.add_member(layout, member.as_ref())?;
        }
        Ok(workbook)
    }

    pub fn load(path: &Path) -> std::result::Result<Self, StoreError> {
        let reader = BufReader::new(File::open(path)?);
        let workbook: Workbook = serde_json::from_reader(reader)?;
        debug!(
            "Loaded {}: {} rows in '{QUEUE_SHEET_NAME}', {} rows in '{LEADERBOARD_SHEET_NAME}'",
            path.display(),
            workbook.queue.row_count(),
            workbook.leaderboard.row_count()
        );
        Ok(workbook)
    }

    /// Write to a sibling file first and rename it over `path`, so a crash mid-write
    /// never leaves a truncated workbook behind.
    pub fn save(&self, path: &Path) -> std::result::Result<(), StoreError> {
        let staging = sibling(path, "tmp");
        {
            let mut writer = BufWriter::new(File::create(&staging)?);
            serde_json::to_writer_pretty(&mut writer, self)?;
            writer.flush()?;
        }
        fs::rename(&staging, path)?;
        debug!("Saved {}", path.display());
        Ok(())
    }

    /// Add a member with zeroed totals to the bottom of the leaderboard.
    ///
    /// # Errors
    /// `DuplicateMember` if the name is already on the board, `MalformedRow` if it is blank.
    pub fn add_member(&mut self, layout: &SheetLayout, name: &str) -> Result<()> {
        let board_layout = &layout.leaderboard;
        if name.trim().is_empty() {
            return Err(ReconcileError::MalformedRow {
                row: self.leaderboard.row_count(),
                reason: "member name is blank".to_string(),
            });
        }
        let rows = self
            .leaderboard
            .read_range(board_layout.data_range(self.leaderboard.row_count()))?;
        let existing = leaderboard::rows_to_entries(&rows, board_layout, board_layout.header_rows)?;
        if existing.iter().any(|e| e.member_name == name) {
            return Err(ReconcileError::DuplicateMember {
                name: name.to_string(),
            });
        }
        self.leaderboard.append_row(leaderboard::entry_to_row(
            &LeaderboardEntry::new(name),
            board_layout,
        ))?;
        Ok(())
    }
}

/// `<path>.<suffix>`, next to the workbook.
fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".");
    name.push(suffix);
    PathBuf::from(name)
}

/// Exclusive hold on a workbook file across processes. Released on drop.
#[derive(Debug)]
pub struct WorkbookLock {
    path: PathBuf,
}

impl WorkbookLock {
    /// # Errors
    /// `Locked` with the lock file's path if another process holds the lock.
    pub fn acquire(workbook: &Path) -> std::result::Result<Self, StoreError> {
        let path = sibling(workbook, "lock");
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(mut file) => {
                writeln!(file, "{}", std::process::id())?;
                Ok(Self { path })
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Err(StoreError::Locked(path)),
            Err(e) => Err(e.into()),
        }
    }
}

impl Drop for WorkbookLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            warn!("Failed to release {}: {e}", self.path.display());
        }
    }
}
