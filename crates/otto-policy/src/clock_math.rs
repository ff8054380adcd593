//! Timezone-aware wall-clock arithmetic shared by the gate and the heartbeat.

use chrono::{DateTime, Datelike, TimeZone, Timelike, Utc};
use chrono_tz::Tz;

/// Minutes since local midnight, `0..1440`.
pub fn local_clock_minutes(ts_ms: i64, tz: Tz) -> u32 {
    let dt = epoch_ms_to_local(ts_ms, tz);
    dt.hour() * 60 + dt.minute()
}

/// `YYYY-MM-DD` in the given timezone, used to fingerprint "once per local
/// day" windows (heartbeat, onboarding prompt dedupe keys).
pub fn local_date_key(ts_ms: i64, tz: Tz) -> String {
    let dt = epoch_ms_to_local(ts_ms, tz);
    format!("{:04}-{:02}-{:02}", dt.year(), dt.month(), dt.day())
}

fn epoch_ms_to_local(ts_ms: i64, tz: Tz) -> DateTime<Tz> {
    let utc = Utc.timestamp_millis_opt(ts_ms).single().unwrap_or_else(Utc::now);
    utc.with_timezone(&tz)
}

/// True iff `minutes` falls in the half-open window `[start, end)`, wrapping
/// past midnight when `start >= end` (spec §4.B).
pub fn minutes_in_window(minutes: u32, start: u32, end: u32) -> bool {
    if start < end {
        minutes >= start && minutes < end
    } else {
        minutes >= start || minutes < end
    }
}

/// Scan forward at 1-minute granularity (up to 48h) for the next epoch-ms
/// timestamp at which the local wall clock reads `target_minutes` in `tz`.
/// The 1-minute scan (rather than closed-form arithmetic) is what survives
/// DST transitions without special-casing them.
pub fn next_local_time_at(now_ms: i64, tz: Tz, target_minutes: u32) -> i64 {
    const MAX_SCAN_MINUTES: i64 = 48 * 60;
    let mut candidate = now_ms - (now_ms.rem_euclid(60_000)) + 60_000;
    for _ in 0..MAX_SCAN_MINUTES {
        if local_clock_minutes(candidate, tz) == target_minutes {
            return candidate;
        }
        candidate += 60_000;
    }
    candidate
}

/// Parse an `"HH:MM"` string into minutes since midnight. Returns `None` on
/// any malformed input — callers treat that the same as "unset".
pub fn parse_hhmm(s: &str) -> Option<u32> {
    let (h, m) = s.split_once(':')?;
    let h: u32 = h.parse().ok()?;
    let m: u32 = m.parse().ok()?;
    if h > 23 || m > 59 {
        return None;
    }
    Some(h * 60 + m)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_crossing_midnight_classifies_correctly() {
        // 20:00-08:00 window; 22:30 should be "in".
        let t = 22 * 60 + 30;
        assert!(minutes_in_window(t, 20 * 60, 8 * 60));
        assert!(!minutes_in_window(9 * 60, 20 * 60, 8 * 60));
        assert!(minutes_in_window(7 * 60, 20 * 60, 8 * 60));
    }

    #[test]
    fn window_not_crossing_midnight() {
        assert!(minutes_in_window(10 * 60, 9 * 60, 17 * 60));
        assert!(!minutes_in_window(18 * 60, 9 * 60, 17 * 60));
    }

    #[test]
    fn parse_hhmm_rejects_out_of_range() {
        assert_eq!(parse_hhmm("23:59"), Some(23 * 60 + 59));
        assert_eq!(parse_hhmm("24:00"), None);
        assert_eq!(parse_hhmm("bogus"), None);
    }

    #[test]
    fn next_local_time_finds_upcoming_boundary_within_a_day() {
        let tz: Tz = chrono_tz::Europe::Vienna;
        // now = an arbitrary fixed epoch
        let now = 1_700_000_000_000i64;
        let target = local_clock_minutes(now, tz);
        let next_same_minute = next_local_time_at(now, tz, target);
        // Should land within the next 24h and match the target minute.
        assert_eq!(local_clock_minutes(next_same_minute, tz), target);
        assert!(next_same_minute > now);
        assert!(next_same_minute - now <= 24 * 60 * 60_000);
    }
}
