//! Remove consumed submissions from the approval queue.

use crate::grid::{GridStore, StoreError};
use itertools::Itertools;

/// Collapse ascending, distinct offsets into `(start, count)` runs of consecutive rows.
pub fn contiguous_runs(offsets: &[usize]) -> Vec<(usize, usize)> {
    offsets
        .iter()
        .enumerate()
        .chunk_by(|(i, offset)| *offset - i)
        .into_iter()
        .filter_map(|(_, mut run)| {
            let (_, &start) = run.next()?;
            Some((start, run.count() + 1))
        })
        .collect()
}

/// Delete the consumed rows of the queue. `offsets` are relative to `first_data_row`,
/// ascending and distinct.
/// Normally every consumed row sits in one block at the top of the queue and this is a
/// single bulk delete; retained rows split the block into a few runs, which are deleted
/// bottom-up so earlier offsets stay valid.
/// Returns the number of rows deleted.
pub fn compact_queue<S: GridStore + ?Sized>(
    queue: &mut S,
    first_data_row: usize,
    offsets: &[usize],
) -> Result<usize, StoreError> {
    let runs = contiguous_runs(offsets);
    for &(start, count) in runs.iter().rev() {
        queue.delete_rows(first_data_row + start, count)?;
    }
    let deleted = runs.iter().map(|(_, count)| count).sum();
    if runs.len() > 1 {
        log::debug!("Deleted {deleted} queue rows in {} runs", runs.len());
    }
    Ok(deleted)
}
