//! Formatting helpers for run summaries.

/// Format a byte count with binary units.
///
/// ```
/// use funnel_cli_common::format_bytes;
///
/// assert_eq!(format_bytes(512), "512 bytes");
/// assert_eq!(format_bytes(1536), "1.50 KB");
/// assert_eq!(format_bytes(3 * 1024 * 1024 * 1024), "3.00 GB");
/// ```
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KB", "MB", "GB", "TB"];

    if bytes < 1024 {
        return format!("{bytes} bytes");
    }

    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit + 1 < UNITS.len() {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.2} {}", UNITS[unit])
}

/// Format an integer with thousands separators.
///
/// ```
/// use funnel_cli_common::format_number;
///
/// assert_eq!(format_number(999), "999");
/// assert_eq!(format_number(1_234_567), "1,234,567");
/// ```
pub fn format_number(n: u64) -> String {
    let digits = n.to_string();
    let lead = digits.len() % 3;
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);

    for (i, c) in digits.chars().enumerate() {
        if i != 0 && (i + 3 - lead) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Format `count` items over `secs` seconds as a per-second rate.
///
/// ```
/// use funnel_cli_common::format_rate;
///
/// assert_eq!(format_rate(300, 2.0), "150.0/s");
/// assert_eq!(format_rate(5, 0.0), "-");
/// ```
pub fn format_rate(count: u64, secs: f64) -> String {
    if secs <= 0.0 {
        return "-".to_string();
    }
    format!("{:.1}/s", count as f64 / secs)
}
