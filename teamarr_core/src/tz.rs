//! Timezone and display formatting utilities.
//!
//! All datetime display, conversion, and XMLTV formatting goes through
//! here. Times are UTC internally; display settings (zone, 12/24 h clock,
//! timezone abbreviation) come from user configuration and are threaded
//! through as [`DisplaySettings`] rather than read from global state.

use chrono::{DateTime, Datelike, Offset, TimeZone, Timelike, Utc};
use chrono_tz::Tz;

use crate::types::TimeFormat;

/// User display preferences for rendered times.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplaySettings {
    pub tz: Tz,
    pub time_format: TimeFormat,
    pub show_timezone: bool,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            tz: chrono_tz::UTC,
            time_format: TimeFormat::default(),
            show_timezone: false,
        }
    }
}

impl DisplaySettings {
    /// Build from an IANA zone name, falling back to UTC on a bad name.
    pub fn new(tz_name: &str, time_format: TimeFormat, show_timezone: bool) -> Self {
        Self {
            tz: parse_tz(tz_name),
            time_format,
            show_timezone,
        }
    }
}

/// Parse an IANA timezone name; unknown names fall back to UTC (logged).
pub fn parse_tz(name: &str) -> Tz {
    match name.parse::<Tz>() {
        Ok(tz) => tz,
        Err(_) => {
            tracing::warn!("[TZ] Unknown timezone '{}', falling back to UTC", name);
            chrono_tz::UTC
        }
    }
}

/// Convert a UTC instant into the user's zone.
pub fn to_user_tz(dt: DateTime<Utc>, tz: Tz) -> DateTime<Tz> {
    dt.with_timezone(&tz)
}

/// Format a time of day per the user's settings ("7:30 PM EST" / "19:30").
pub fn format_time(dt: DateTime<Utc>, settings: &DisplaySettings) -> String {
    format_time_with_tz(dt, settings, settings.show_timezone)
}

/// Format a time with an explicit timezone-abbreviation override.
pub fn format_time_with_tz(
    dt: DateTime<Utc>,
    settings: &DisplaySettings,
    include_tz: bool,
) -> String {
    let local = dt.with_timezone(&settings.tz);
    let time_str = match settings.time_format {
        TimeFormat::TwentyFourHour => local.format("%H:%M").to_string(),
        TimeFormat::TwelveHour => local.format("%-I:%M %p").to_string(),
    };
    if include_tz {
        let abbrev = timezone_abbrev(&local);
        if !abbrev.is_empty() {
            return format!("{time_str} {abbrev}");
        }
    }
    time_str
}

/// Full date: "December 14, 2025".
pub fn format_date(dt: DateTime<Utc>, tz: Tz) -> String {
    dt.with_timezone(&tz).format("%B %-d, %Y").to_string()
}

/// Short date: "Dec 14".
pub fn format_date_short(dt: DateTime<Utc>, tz: Tz) -> String {
    dt.with_timezone(&tz).format("%b %-d").to_string()
}

/// Full date with weekday: "Tuesday, December 10, 2024".
pub fn format_date_long(dt: DateTime<Utc>, tz: Tz) -> String {
    dt.with_timezone(&tz).format("%A, %B %-d, %Y").to_string()
}

/// Weekday name: "Tuesday".
pub fn format_weekday(dt: DateTime<Utc>, tz: Tz) -> String {
    dt.with_timezone(&tz).format("%A").to_string()
}

/// Short weekday name: "Tue".
pub fn format_weekday_short(dt: DateTime<Utc>, tz: Tz) -> String {
    dt.with_timezone(&tz).format("%a").to_string()
}

/// XMLTV timestamp in the user's zone: "YYYYMMDDHHMMSS +HHMM".
pub fn format_datetime_xmltv(dt: DateTime<Utc>, tz: Tz) -> String {
    let local = dt.with_timezone(&tz);
    let offset_secs = local.offset().fix().local_minus_utc();
    let sign = if offset_secs >= 0 { '+' } else { '-' };
    let abs = offset_secs.unsigned_abs();
    format!(
        "{} {}{:02}{:02}",
        local.format("%Y%m%d%H%M%S"),
        sign,
        abs / 3600,
        (abs % 3600) / 60
    )
}

/// Timezone abbreviation for a zoned instant ("EST", "CET"); empty when the
/// zone only offers a numeric offset.
pub fn timezone_abbrev(dt: &DateTime<Tz>) -> String {
    let abbrev = dt.format("%Z").to_string();
    // chrono renders fixed offsets as "+05:00"; those are not abbreviations.
    if abbrev.starts_with('+') || abbrev.starts_with('-') {
        String::new()
    } else {
        abbrev
    }
}

/// Round down to the start of the hour.
pub fn round_to_last_hour(dt: DateTime<Utc>) -> DateTime<Utc> {
    dt.with_minute(0)
        .and_then(|d| d.with_second(0))
        .and_then(|d| d.with_nanosecond(0))
        .unwrap_or(dt)
}

/// Midnight at the start of `dt`'s calendar day in the given zone, as UTC.
pub fn day_start(dt: DateTime<Utc>, tz: Tz) -> DateTime<Utc> {
    let local = dt.with_timezone(&tz);
    tz.with_ymd_and_hms(local.year(), local.month(), local.day(), 0, 0, 0)
        .single()
        .map(|d| d.with_timezone(&Utc))
        .unwrap_or(dt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn detroit() -> DisplaySettings {
        DisplaySettings::new("America/Detroit", TimeFormat::TwelveHour, true)
    }

    #[test]
    fn test_parse_tz_fallback() {
        assert_eq!(parse_tz("America/Detroit"), chrono_tz::America::Detroit);
        assert_eq!(parse_tz("Not/AZone"), chrono_tz::UTC);
    }

    #[test]
    fn test_format_time_12h_with_abbrev() {
        // 2026-01-15 00:30 UTC = 19:30 EST on the 14th.
        let dt = Utc.with_ymd_and_hms(2026, 1, 15, 0, 30, 0).unwrap();
        assert_eq!(format_time(dt, &detroit()), "7:30 PM EST");
    }

    #[test]
    fn test_format_time_24h_no_abbrev() {
        let settings =
            DisplaySettings::new("America/Detroit", TimeFormat::TwentyFourHour, false);
        let dt = Utc.with_ymd_and_hms(2026, 1, 15, 0, 30, 0).unwrap();
        assert_eq!(format_time(dt, &settings), "19:30");
    }

    #[test]
    fn test_format_datetime_xmltv_offset() {
        let dt = Utc.with_ymd_and_hms(2026, 1, 15, 0, 30, 0).unwrap();
        let s = format_datetime_xmltv(dt, chrono_tz::America::Detroit);
        assert_eq!(s, "20260114193000 -0500");
    }

    #[test]
    fn test_round_to_last_hour() {
        let dt = Utc.with_ymd_and_hms(2026, 1, 15, 14, 47, 31).unwrap();
        let rounded = round_to_last_hour(dt);
        assert_eq!(rounded, Utc.with_ymd_and_hms(2026, 1, 15, 14, 0, 0).unwrap());
    }

    #[test]
    fn test_day_start_crosses_utc_date() {
        // 2026-01-15 02:00 UTC is still Jan 14 in Detroit.
        let dt = Utc.with_ymd_and_hms(2026, 1, 15, 2, 0, 0).unwrap();
        let start = day_start(dt, chrono_tz::America::Detroit);
        assert_eq!(start, Utc.with_ymd_and_hms(2026, 1, 14, 5, 0, 0).unwrap());
    }

    #[test]
    fn test_format_dates() {
        let dt = Utc.with_ymd_and_hms(2025, 12, 14, 18, 0, 0).unwrap();
        assert_eq!(format_date(dt, chrono_tz::UTC), "December 14, 2025");
        assert_eq!(format_date_short(dt, chrono_tz::UTC), "Dec 14");
        assert_eq!(format_weekday(dt, chrono_tz::UTC), "Sunday");
    }
}
