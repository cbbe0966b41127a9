use chrono::{DateTime, Local, Utc};
use std::time::Duration;

/// Shown in place of a duration the probe could not report
pub const UNKNOWN_DURATION: &str = "--:--";

/// List-row duration, `m:ss`
pub fn format_duration(duration: Option<Duration>) -> String {
    let Some(duration) = duration else {
        return UNKNOWN_DURATION.to_string();
    };

    let total_seconds = duration.as_secs();
    format!("{}:{:02}", total_seconds / 60, total_seconds % 60)
}

/// Capture timer, `MM:SS:HH` with hundredths
pub fn format_elapsed(elapsed: Duration) -> String {
    let total_seconds = elapsed.as_secs();
    let hundredths = elapsed.subsec_millis() / 10;
    format!(
        "{:02}:{:02}:{:02}",
        total_seconds / 60,
        total_seconds % 60,
        hundredths
    )
}

/// Creation date in the local timezone, `YYYY-MM-DD`
pub fn format_date(created_at: DateTime<Utc>) -> String {
    created_at.with_timezone(&Local).format("%Y-%m-%d").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Some(Duration::from_millis(61_000))), "1:01");
        assert_eq!(format_duration(Some(Duration::from_millis(999))), "0:00");
        assert_eq!(format_duration(Some(Duration::from_secs(600))), "10:00");
    }

    #[test]
    fn test_unknown_duration_is_placeholder_not_zero() {
        assert_eq!(format_duration(None), "--:--");
    }

    #[test]
    fn test_format_elapsed() {
        assert_eq!(format_elapsed(Duration::ZERO), "00:00:00");
        assert_eq!(format_elapsed(Duration::from_millis(65_432)), "01:05:43");
    }

    #[test]
    fn test_format_date_shape() {
        let date = format_date(DateTime::from_timestamp_millis(1_700_000_000_000).unwrap_or_default());

        assert_eq!(date.len(), 10);
        assert!(date.starts_with("2023-11-1"));
    }
}
