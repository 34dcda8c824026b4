//! Add points onto a running total.
//!
//! Totals are read out of the sheet once per run, accumulated here in memory and
//! written back in one bulk write, so this never touches the store itself.

/// New value of a total after adding `delta` to it.
pub fn accumulate(current: f64, delta: f64) -> f64 {
    current + delta
}

/// Add `delta` to a total in place.
pub fn accumulate_into(total: &mut f64, delta: f64) {
    *total = accumulate(*total, delta);
}
