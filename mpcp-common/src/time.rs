//! Timestamp utilities

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};

/// Folder-name timestamp layout written by the MPC console (`2025-09-19-07-41-49`)
pub const FOLDER_TIMESTAMP_FORMAT: &str = "%Y-%m-%d-%H-%M-%S";

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Parse a folder-name timestamp
pub fn parse_folder_timestamp(text: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(text, FOLDER_TIMESTAMP_FORMAT).ok()
}

/// ISO-8601 form of a console-local acquisition time (no offset, the console does not record one)
pub fn naive_to_iso8601(timestamp: &NaiveDateTime) -> String {
    timestamp.format("%Y-%m-%dT%H:%M:%S").to_string()
}

/// ISO-8601 form of a UTC instant, second precision
pub fn utc_to_iso8601(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Secs, true)
}
