//! Name allocation: the next free `<prefix><number>` name for a role.

use super::FleetView;

/// Split a name of the form `<prefix><digits>` into its parts.
///
/// Returns `None` when the name has no digit suffix, no prefix, or a suffix
/// that does not fit a `u32`.
pub fn split_numbered(name: &str) -> Option<(&str, u32)> {
    let digits_at = name.find(|c: char| c.is_ascii_digit())?;
    let (prefix, suffix) = name.split_at(digits_at);
    if prefix.is_empty() || !suffix.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some((prefix, suffix.parse().ok()?))
}

/// The next free numeric suffix for `prefix` given the current fleet view:
/// one past the highest suffix among non-terminated instances named
/// `<prefix><digits>`. Starts at 1 when nothing matches.
pub fn next_index(fleet: &FleetView, prefix: &str) -> u32 {
    fleet
        .iter()
        .filter(|i| !i.is_terminated())
        .filter_map(|i| i.name())
        .filter_map(split_numbered)
        .filter(|(p, _)| *p == prefix)
        .map(|(_, n)| n)
        .max()
        .map_or(1, |max| max + 1)
}

/// The next free name for `prefix`, e.g. `web8`.
///
/// Best-effort under a single operator: two allocations issued before either
/// resulting instance is tagged will collide on the same name. There is no
/// reservation step because nothing persists between runs.
pub fn next_name(fleet: &FleetView, prefix: &str) -> String {
    format!("{}{}", prefix, next_index(fleet, prefix))
}
