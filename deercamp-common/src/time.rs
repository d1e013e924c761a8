//! Timestamp utilities and clip duration formatting

use chrono::{DateTime, Utc};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Format a clip duration as `m:ss` for button captions.
///
/// Truncates to whole seconds. Returns an empty string for unknown
/// (zero) durations so callers can omit the caption entirely.
///
/// # Examples
///
/// ```
/// use deercamp_common::time::format_clip_duration;
///
/// assert_eq!(format_clip_duration(4200), "0:04");
/// assert_eq!(format_clip_duration(125_000), "2:05");
/// assert_eq!(format_clip_duration(0), "");
/// ```
pub fn format_clip_duration(ms: u64) -> String {
    if ms == 0 {
        return String::new();
    }
    let total_secs = ms / 1000;
    format!("{}:{:02}", total_secs / 60, total_secs % 60)
}

/// Format elapsed/total as `m:ss / m:ss`, or just the elapsed part when the
/// total is unknown.
pub fn format_progress(position_ms: u64, duration_ms: u64) -> String {
    let elapsed = format!("{}:{:02}", position_ms / 1000 / 60, (position_ms / 1000) % 60);
    if duration_ms == 0 {
        elapsed
    } else {
        format!("{} / {}", elapsed, format_clip_duration(duration_ms))
    }
}
