//! Five-field cron schedule evaluation.
//!
//! The channel-reset job is configured as a standard cron expression
//! (minute hour day-of-month month day-of-week). The scheduler loop
//! ticks once a minute and fires when the current minute matches.

use chrono::{DateTime, Datelike, Timelike, Utc};

/// One parsed cron field: either any, or an allowed-value set.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Field {
    Any,
    Values(Vec<u32>),
}

impl Field {
    fn matches(&self, value: u32) -> bool {
        match self {
            Field::Any => true,
            Field::Values(values) => values.contains(&value),
        }
    }
}

/// A parsed five-field cron expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CronSchedule {
    minute: Field,
    hour: Field,
    day_of_month: Field,
    month: Field,
    day_of_week: Field,
}

fn parse_field(raw: &str, min: u32, max: u32) -> Option<Field> {
    if raw == "*" {
        return Some(Field::Any);
    }
    // Supported forms: lists (1,15), ranges (1-5), steps (*/6), values.
    let mut values = Vec::new();
    for part in raw.split(',') {
        if let Some(step) = part.strip_prefix("*/") {
            let step: u32 = step.parse().ok().filter(|s| *s > 0)?;
            values.extend((min..=max).filter(|v| (v - min) % step == 0));
        } else if let Some((lo, hi)) = part.split_once('-') {
            let lo: u32 = lo.parse().ok()?;
            let hi: u32 = hi.parse().ok()?;
            if lo < min || hi > max || lo > hi {
                return None;
            }
            values.extend(lo..=hi);
        } else {
            let value: u32 = part.parse().ok()?;
            if value < min || value > max {
                return None;
            }
            values.push(value);
        }
    }
    values.sort_unstable();
    values.dedup();
    Some(Field::Values(values))
}

impl CronSchedule {
    /// Parse a "m h dom mon dow" expression. `None` for anything
    /// malformed; callers fall back to their default schedule.
    pub fn parse(expression: &str) -> Option<Self> {
        let fields: Vec<&str> = expression.split_whitespace().collect();
        if fields.len() != 5 {
            return None;
        }
        Some(Self {
            minute: parse_field(fields[0], 0, 59)?,
            hour: parse_field(fields[1], 0, 23)?,
            day_of_month: parse_field(fields[2], 1, 31)?,
            month: parse_field(fields[3], 1, 12)?,
            day_of_week: parse_field(fields[4], 0, 6)?,
        })
    }

    /// Whether the schedule fires at this instant (minute resolution).
    pub fn matches(&self, at: DateTime<Utc>) -> bool {
        self.minute.matches(at.minute())
            && self.hour.matches(at.hour())
            && self.day_of_month.matches(at.day())
            && self.month.matches(at.month())
            && self
                .day_of_week
                .matches(at.weekday().num_days_from_sunday())
    }
}
