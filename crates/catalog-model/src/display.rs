//! Text shown in table cells.

use chrono::DateTime;

use crate::Record;

/// Placeholder shown when a record has no video count.
pub const MISSING_VALUE: &str = "N/A";

/// Render an epoch-seconds timestamp for the "Last Updated" column.
pub fn format_last_updated(epoch_secs: i64) -> String {
    match DateTime::from_timestamp(epoch_secs, 0) {
        Some(at) => format!("Last Updated: {}", at.format("%Y-%m-%d %H:%M:%S UTC")),
        None => "Last Updated: unknown".to_string(),
    }
}

pub fn video_count_label(record: &Record) -> String {
    record
        .video_count
        .map_or_else(|| MISSING_VALUE.to_string(), |count| count.to_string())
}
