//! Label formatting shared by charts and gauges.

use chrono::DateTime;

/// `HH:MM:SS` (24h, UTC) for an epoch-millisecond timestamp.
///
/// Timestamps outside chrono's representable range yield `--:--:--`.
pub fn format_time_label(epoch_ms: i64) -> String {
    DateTime::from_timestamp_millis(epoch_ms)
        .map(|dt| dt.format("%H:%M:%S").to_string())
        .unwrap_or_else(|| "--:--:--".to_string())
}

/// Fixed two-decimal text.
pub fn format_fixed2(value: f64) -> String {
    format!("{:.2}", round2(value))
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
