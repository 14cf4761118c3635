//! Six-hour time-block alignment.
//!
//! Filler chunks snap to the 00/06/12/18 boundaries of the user's zone
//! so guide rows line up across channels.

use chrono::{DateTime, Datelike, TimeZone, Timelike, Utc};
use chrono_tz::Tz;

const BLOCK_HOURS: [u32; 4] = [0, 6, 12, 18];

/// The next block boundary strictly after `dt`, in the user's zone.
pub fn next_time_block(dt: DateTime<Utc>, tz: Tz) -> DateTime<Utc> {
    let local = dt.with_timezone(&tz);
    for block_hour in BLOCK_HOURS {
        if local.hour() < block_hour {
            if let Some(boundary) = tz
                .with_ymd_and_hms(local.year(), local.month(), local.day(), block_hour, 0, 0)
                .single()
            {
                return boundary.with_timezone(&Utc);
            }
        }
    }
    // No boundary left today: first block of the next day.
    let next_day = local.date_naive() + chrono::Days::new(1);
    tz.with_ymd_and_hms(next_day.year(), next_day.month(), next_day.day(), 0, 0, 0)
        .single()
        .map(|d| d.with_timezone(&Utc))
        .unwrap_or_else(|| dt + chrono::Duration::hours(6))
}

/// Split `[start, end)` into block-aligned chunks.
pub fn chunk_range(start: DateTime<Utc>, end: DateTime<Utc>, tz: Tz) -> Vec<(DateTime<Utc>, DateTime<Utc>)> {
    let mut chunks = Vec::new();
    let mut current = start;
    while current < end {
        let boundary = next_time_block(current, tz);
        let chunk_end = boundary.min(end);
        if chunk_end <= current {
            break;
        }
        chunks.push((current, chunk_end));
        current = chunk_end;
    }
    chunks
}
