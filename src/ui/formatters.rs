use chrono::{DateTime, Local};
use humansize::{format_size as human_format_size, DECIMAL};

/// Format a byte count in human-readable form (kB, MB, GB).
pub fn format_size(size: u64) -> String {
    human_format_size(size, DECIMAL)
}

/// Clock time used to prefix status lines (HH:MM:SS)
pub fn format_clock(time: &DateTime<Local>) -> String {
    time.format("%H:%M:%S").to_string()
}

pub fn format_percent(value: f32) -> String {
    format!("{:5.1}%", value)
}

pub fn format_rate(kb_per_sec: f64) -> String {
    if kb_per_sec >= 1024.0 {
        format!("{:.2} MB/s", kb_per_sec / 1024.0)
    } else {
        format!("{:.2} KB/s", kb_per_sec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_format_rate_units() {
        assert_eq!(format_rate(0.68359375), "0.68 KB/s");
        assert_eq!(format_rate(2048.0), "2.00 MB/s");
    }

    #[test]
    fn test_format_percent_padding() {
        assert_eq!(format_percent(5.0), "  5.0%");
        assert_eq!(format_percent(100.0), "100.0%");
    }

    #[test]
    fn test_format_clock() {
        let time = Local.with_ymd_and_hms(2024, 5, 1, 9, 7, 3).unwrap();
        assert_eq!(format_clock(&time), "09:07:03");
    }
}
