//! Human-readable byte sizes for listings.

const UNITS: [&str; 5] = ["Bytes", "KB", "MB", "GB", "TB"];

/// Format a byte count with base-1024 units, e.g. `1536` becomes `"1.5 KB"`.
///
/// Values are rounded to `decimals` places and trailing zeros are dropped, so
/// exactly one mebibyte renders as `"1 MB"`.
pub fn format_bytes(bytes: u64, decimals: usize) -> String {
    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let mut exponent = 0;
    let mut threshold = 1024u64;
    while exponent < UNITS.len() - 1 && bytes >= threshold {
        exponent += 1;
        threshold = threshold.saturating_mul(1024);
    }
    let scaled = bytes as f64 / 1024f64.powi(exponent as i32);

    let mut rendered = format!("{:.*}", decimals, scaled);
    if rendered.contains('.') {
        let trimmed = rendered.trim_end_matches('0').trim_end_matches('.').len();
        rendered.truncate(trimmed);
    }

    format!("{} {}", rendered, UNITS[exponent])
}
