//! TCPA quiet-hours window.

use chrono::{DateTime, Timelike, Utc};
use chrono_tz::Tz;

/// True when `now` falls inside the allowed sending window `[start, end)` in
/// the campaign's local timezone.
pub fn within_sending_hours(now: DateTime<Utc>, tz: Tz, start_hour: u32, end_hour: u32) -> bool {
    let local_hour = now.with_timezone(&tz).hour();
    local_hour >= start_hour && local_hour < end_hour
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn window_is_half_open() {
        let tz = chrono_tz::UTC;
        let at = |h| Utc.with_ymd_and_hms(2026, 3, 2, h, 30, 0).unwrap();
        assert!(!within_sending_hours(at(7), tz, 8, 21));
        assert!(within_sending_hours(at(8), tz, 8, 21));
        assert!(within_sending_hours(at(20), tz, 8, 21));
        assert!(!within_sending_hours(at(21), tz, 8, 21));
    }

    #[test]
    fn window_uses_campaign_timezone() {
        // 02:00 UTC is 20:00 the previous evening in Chicago: allowed there,
        // not allowed in UTC.
        let tz: Tz = "America/Chicago".parse().unwrap();
        let now = Utc.with_ymd_and_hms(2026, 3, 2, 2, 0, 0).unwrap();
        assert!(within_sending_hours(now, tz, 8, 21));
        assert!(!within_sending_hours(now, chrono_tz::UTC, 8, 21));
    }
}
