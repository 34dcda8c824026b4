//! The "Last Updated" stamp on the leaderboard.

use crate::grid::{Cell, GridStore, StoreError};
use crate::sheet_util::LeaderboardLayout;
use crate::{LAST_UPDATED_FORMAT, LAST_UPDATED_PREFIX};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;

/// Parse an IANA zone name such as `America/Los_Angeles`.
pub fn parse_time_zone(name: &str) -> Result<Tz, String> {
    name.parse::<Tz>()
        .map_err(|e| format!("'{name}' is not an IANA time zone: {e}"))
}

/// Current wall-clock time in the given zone.
pub fn now_in(zone: Tz) -> DateTime<Tz> {
    Utc::now().with_timezone(&zone)
}

pub fn format_last_updated(at: &DateTime<Tz>) -> String {
    format!("{LAST_UPDATED_PREFIX}{}", at.format(LAST_UPDATED_FORMAT))
}

pub fn stamp_last_updated<S: GridStore + ?Sized>(
    board: &mut S,
    layout: &LeaderboardLayout,
    at: &DateTime<Tz>,
) -> Result<(), StoreError> {
    board.write_range(
        layout.stamp_row,
        layout.stamp_col,
        &[vec![Cell::Text(format_last_updated(at))]],
    )
}
