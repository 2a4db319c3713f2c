//! Human-readable byte counts and durations

use std::time::Duration;

const BYTE_UNITS: [&str; 5] = ["kB", "MB", "GB", "TB", "PB"];

/// Format a byte count using SI (1000-based) units.
///
/// Values below 1000 are printed exactly (`"512B"`), larger values with two
/// decimals (`"1.50kB"`, `"28.57MB"`).
pub fn format_bytes(bytes: u64) -> String {
    if bytes < 1000 {
        return format!("{}B", bytes);
    }

    let mut value = bytes as f64 / 1000.0;
    let mut unit = 0;
    while value >= 1000.0 && unit < BYTE_UNITS.len() - 1 {
        value /= 1000.0;
        unit += 1;
    }
    format!("{:.2}{}", value, BYTE_UNITS[unit])
}

/// Format elapsed seconds: two decimals below ten seconds, one above.
pub fn format_seconds(dt: Duration) -> String {
    let sec = dt.as_secs_f64();
    let precision = if sec < 10.0 { 2 } else { 1 };
    format!("{:.*}", precision, sec)
}

/// Convert a signed chrono delta to a std duration, clamping negatives to zero.
pub fn non_negative(delta: chrono::TimeDelta) -> Duration {
    delta.to_std().unwrap_or(Duration::ZERO)
}
