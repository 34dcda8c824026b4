//! Find a member's leaderboard row by name.
//!
//! The names must already be sorted ascending by the same case-sensitive ordering used
//! for matching. An unsorted slice does not panic, it just returns a wrong answer, which
//! is why [`crate::leaderboard_updater::SortedBoard`] checks the order before anything
//! is looked up.

/// Return the index of `target` in an ascending, case-sensitively sorted slice of names.
/// With duplicate names any one of the matching indices may be returned.
pub fn binary_lookup<T: AsRef<str>>(sorted: &[T], target: &str) -> Option<usize> {
    binary_lookup_by_key(sorted, target, |item| item.as_ref())
}

/// Same as [`binary_lookup`] with the name pulled out of each item by `key`.
pub fn binary_lookup_by_key<T, F>(sorted: &[T], target: &str, key: F) -> Option<usize>
where
    F: Fn(&T) -> &str,
{
    sorted.binary_search_by(|item| key(item).cmp(target)).ok()
}
