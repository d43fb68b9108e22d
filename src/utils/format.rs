use chrono::{DateTime, Duration, Local};

use crate::store::settings::HourFormat;

/// Fixed-width `HH:MM:SS` form, used by the live elapsed display and by CSV
/// export. Hours grow past two digits instead of wrapping.
pub fn format_clock(value: Duration) -> String {
    let seconds = value.num_seconds().max(0);
    format!(
        "{:02}:{:02}:{:02}",
        seconds / 3600,
        seconds % 3600 / 60,
        seconds % 60
    )
}

/// Compact form used in listings: `1h2m3s`, `2m5s`, `42s`.
pub fn format_compact(value: Duration) -> String {
    if value.num_hours() > 0 {
        format!(
            "{}h{}m{}s",
            value.num_hours(),
            value.num_minutes() % 60,
            value.num_seconds() % 60
        )
    } else if value.num_minutes() > 0 {
        format!("{}m{}s", value.num_minutes() % 60, value.num_seconds() % 60)
    } else {
        format!("{}s", value.num_seconds() % 60)
    }
}

/// Wall-clock time of day honoring the configured hour format.
pub fn format_time_of_day(moment: DateTime<Local>, hour_format: HourFormat) -> String {
    match hour_format {
        HourFormat::H24 => moment.format("%H:%M").to_string(),
        HourFormat::H12 => moment.format("%l:%M%P").to_string().trim_start().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::{format_clock, format_compact};

    #[test]
    fn test_format_clock() {
        assert_eq!(format_clock(Duration::seconds(0)), "00:00:00");
        assert_eq!(format_clock(Duration::seconds(125)), "00:02:05");
        assert_eq!(format_clock(Duration::seconds(3600 * 3 + 62)), "03:01:02");
        assert_eq!(format_clock(Duration::seconds(-5)), "00:00:00");
    }

    #[test]
    fn test_format_compact() {
        assert_eq!(format_compact(Duration::seconds(42)), "42s");
        assert_eq!(format_compact(Duration::seconds(125)), "2m5s");
        assert_eq!(format_compact(Duration::seconds(3725)), "1h2m5s");
    }
}
