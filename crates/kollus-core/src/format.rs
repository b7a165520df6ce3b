//! Display helpers for upload metadata.

use chrono::DateTime;
use chrono_tz::Asia::Seoul;

const SIZE_UNITS: [&str; 5] = ["Bytes", "KB", "MB", "GB", "TB"];

/// Render a Unix timestamp (seconds) in Korea Standard Time, the zone the
/// service reports expiries in. Returns `None` for out-of-range timestamps.
pub fn format_expire_time(timestamp: i64) -> Option<String> {
    let instant = DateTime::from_timestamp(timestamp, 0)?;
    Some(
        instant
            .with_timezone(&Seoul)
            .format("%Y-%m-%d %H:%M:%S %Z")
            .to_string(),
    )
}

/// Human-readable size with 1024-based units, rounded to two decimals.
pub fn format_file_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let mut unit = 0;
    let mut scale: u64 = 1;
    while unit + 1 < SIZE_UNITS.len() && bytes >= scale * 1024 {
        scale *= 1024;
        unit += 1;
    }

    let value = (bytes as f64 / scale as f64 * 100.0).round() / 100.0;
    format!("{} {}", value, SIZE_UNITS[unit])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_file_size_units() {
        assert_eq!(format_file_size(0), "0 Bytes");
        assert_eq!(format_file_size(1000), "1000 Bytes");
        assert_eq!(format_file_size(1024), "1 KB");
        assert_eq!(format_file_size(1536), "1.5 KB");
        assert_eq!(format_file_size(5 * 1024 * 1024), "5 MB");
        assert_eq!(format_file_size(1_288_490_189), "1.2 GB");
    }

    #[test]
    fn format_file_size_caps_at_terabytes() {
        let two_pb = 2 * 1024u64.pow(5);
        assert_eq!(format_file_size(two_pb), "2048 TB");
    }

    #[test]
    fn format_expire_time_in_kst() {
        assert_eq!(
            format_expire_time(1_700_000_000).as_deref(),
            Some("2023-11-15 07:13:20 KST")
        );
    }

    #[test]
    fn format_expire_time_out_of_range() {
        assert_eq!(format_expire_time(i64::MAX), None);
    }
}
