//! Human-readable conversions for measurement figures.
//!
//! The rate and size converters differ on purpose: rates carry a space
//! before the unit and stop at TB/s, sizes have no separator and stop at PB.

const RATE_UNITS: [&str; 5] = ["B/s", "KB/s", "MB/s", "GB/s", "TB/s"];
const SIZE_UNITS: [&str; 6] = ["B", "KB", "MB", "GB", "TB", "PB"];

/// Round to two decimals. Whole numbers print without a fraction ("1", not "1.0").
fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Format a throughput figure, e.g. `"5.96 MB/s"`.
///
/// When `already_bytes` is false the input is bits per second and is
/// divided by 8 first.
pub fn rate_to_readable(value: f64, already_bytes: bool) -> String {
    let mut size = if already_bytes { value } else { value / 8.0 };
    let mut index = 0;
    while size >= 1024.0 && index < RATE_UNITS.len() - 1 {
        size /= 1024.0;
        index += 1;
    }
    format!("{} {}", round2(size), RATE_UNITS[index])
}

/// Format a byte count, e.g. `"1MB"`. A missing count reads as zero.
pub fn bytes_to_readable(bytes: impl Into<Option<i64>>) -> String {
    let mut size = bytes.into().unwrap_or(0) as f64;
    let mut index = 0;
    while size >= 1024.0 && index < SIZE_UNITS.len() - 1 {
        size /= 1024.0;
        index += 1;
    }
    format!("{}{}", round2(size), SIZE_UNITS[index])
}

/// Format elapsed seconds as `1d1h1m1s`. Zero components are dropped,
/// except seconds which always appear.
pub fn duration_to_readable(total_seconds: u64) -> String {
    let days = total_seconds / 86_400;
    let rem = total_seconds % 86_400;
    let hours = rem / 3_600;
    let rem = rem % 3_600;
    let minutes = rem / 60;
    let seconds = rem % 60;

    let mut out = String::new();
    if days > 0 {
        out.push_str(&format!("{}d", days));
    }
    if hours > 0 {
        out.push_str(&format!("{}h", hours));
    }
    if minutes > 0 {
        out.push_str(&format!("{}m", minutes));
    }
    out.push_str(&format!("{}s", seconds));
    out
}
