//! Sortable scheduler keys.
//!
//! A task key is the due time as a fixed-width UTC timestamp followed by a
//! UUIDv7, so lexicographic key order equals chronological order and two
//! tasks due in the same millisecond never collide.

use time::{OffsetDateTime, UtcOffset};

/// Separates the timestamp from the disambiguator.
pub const KEY_SEPARATOR: &str = "::";

/// `YYYY-MM-DDTHH:MM:SS.mmmZ` in UTC.
pub fn format_timestamp(at: OffsetDateTime) -> String {
    let at = at.to_offset(UtcOffset::UTC);
    format!(
        "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}.{:03}Z",
        at.year(),
        u8::from(at.month()),
        at.day(),
        at.hour(),
        at.minute(),
        at.second(),
        at.millisecond(),
    )
}

/// Builds a fresh key for a task due at `due`.
pub fn task_key(due: OffsetDateTime) -> String {
    format!(
        "{}{KEY_SEPARATOR}{}",
        format_timestamp(due),
        uuid::Uuid::now_v7()
    )
}

/// Upper bound for a due-task scan: every key that sorts below it is due.
pub fn due_bound(now: OffsetDateTime) -> String {
    format_timestamp(now)
}

/// `now + delay`, saturating instead of overflowing.
pub fn due_after(now: OffsetDateTime, delay: std::time::Duration) -> OffsetDateTime {
    let delay = time::Duration::try_from(delay).unwrap_or(time::Duration::MAX);
    now.saturating_add(delay)
}
