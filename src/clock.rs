//! Wall-clock helpers used for record timestamps and poll deadlines.

use chrono::{DateTime, Utc};

/// Human-readable representation of the current date and time,
/// e.g. `Thursday 15 October 2026 14:03:07 UTC`.
pub fn time_now() -> String {
    format_time(Utc::now())
}

/// Seconds since the Unix epoch.
pub fn epoch_seconds() -> i64 {
    Utc::now().timestamp()
}

fn format_time(at: DateTime<Utc>) -> String {
    at.format("%A %-d %B %Y %-H:%M:%S UTC").to_string()
}
