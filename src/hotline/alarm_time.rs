//! Best-effort parsing of a spoken alarm time

use chrono::{DateTime, Duration, FixedOffset, TimeZone, Utc};
use regex::Regex;
use std::sync::OnceLock;

/// `H[:MM] [am|pm]`, tolerating "a.m." and "7pm"
fn clock_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)\b(\d{1,2})(?::(\d{2}))?\s*([ap])?\.?\s?m?\b")
            .expect("alarm time pattern is valid")
    })
}

/// When an alarm fires, and whether that came from the caller's words
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlarmTime {
    pub fire_at: DateTime<Utc>,
    /// False when nothing usable was heard and the one-hour default applies
    pub parsed: bool,
}

impl AlarmTime {
    /// Wall-clock form for reading back, e.g. "7:30 AM"
    pub fn spoken(&self, offset: FixedOffset) -> String {
        self.fire_at
            .with_timezone(&offset)
            .format("%-I:%M %p")
            .to_string()
    }
}

/// Resolve `text` against `now` in the caller's wall clock.
///
/// A time that has already passed today rolls to tomorrow. Text with no
/// recognizable time falls back to one hour from now.
pub fn resolve_alarm_time(text: &str, now: DateTime<Utc>, offset: FixedOffset) -> AlarmTime {
    if let Some(fire_at) = parse_clock(text).and_then(|(h, m)| next_occurrence(h, m, now, offset)) {
        return AlarmTime {
            fire_at,
            parsed: true,
        };
    }
    tracing::warn!(time_text = %text, "Alarm time not understood, defaulting to one hour");
    AlarmTime {
        fire_at: now + Duration::hours(1),
        parsed: false,
    }
}

/// 24-hour (hour, minute) from the first clock time in `text`
fn parse_clock(text: &str) -> Option<(u32, u32)> {
    let caps = clock_pattern().captures(text)?;
    let hour: u32 = caps.get(1)?.as_str().parse().ok()?;
    let minute: u32 = match caps.get(2) {
        Some(m) => m.as_str().parse().ok()?,
        None => 0,
    };
    if minute > 59 {
        return None;
    }

    let meridiem = caps.get(3).map(|m| m.as_str().to_ascii_lowercase());
    let hour = match (meridiem.as_deref(), hour) {
        (Some("a"), 12) => 0,
        (Some("p"), 12) => 12,
        (Some("a"), 1..=11) => hour,
        (Some(_), 1..=11) => hour + 12,
        (None, 0..=23) => hour,
        _ => return None,
    };
    Some((hour, minute))
}

fn next_occurrence(
    hour: u32,
    minute: u32,
    now: DateTime<Utc>,
    offset: FixedOffset,
) -> Option<DateTime<Utc>> {
    let local_now = now.with_timezone(&offset);
    let candidate = local_now.date_naive().and_hms_opt(hour, minute, 0)?;
    let mut fire_at = offset.from_local_datetime(&candidate).single()?;
    if fire_at <= local_now {
        fire_at += Duration::days(1);
    }
    Some(fire_at.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 14, hour, minute, 0).unwrap()
    }

    #[test]
    fn test_parse_formats() {
        assert_eq!(parse_clock("7"), Some((7, 0)));
        assert_eq!(parse_clock("7:30"), Some((7, 30)));
        assert_eq!(parse_clock("7:30 am"), Some((7, 30)));
        assert_eq!(parse_clock("7:30 a.m."), Some((7, 30)));
        assert_eq!(parse_clock("7pm"), Some((19, 0)));
        assert_eq!(parse_clock("wake me at 6:45 PM please"), Some((18, 45)));
        assert_eq!(parse_clock("12 am"), Some((0, 0)));
        assert_eq!(parse_clock("12 pm"), Some((12, 0)));
        assert_eq!(parse_clock("18:15"), Some((18, 15)));
    }

    #[test]
    fn test_parse_rejects_nonsense() {
        assert_eq!(parse_clock("seven thirty"), None);
        assert_eq!(parse_clock("13 pm"), None);
        assert_eq!(parse_clock("7:75"), None);
        assert_eq!(parse_clock("130"), None);
        assert_eq!(parse_clock(""), None);
    }

    #[test]
    fn test_later_today() {
        let alarm = resolve_alarm_time("9 pm", at(12, 0), utc());
        assert!(alarm.parsed);
        assert_eq!(alarm.fire_at, at(21, 0));
    }

    #[test]
    fn test_passed_time_rolls_to_tomorrow() {
        let alarm = resolve_alarm_time("7:30 am", at(12, 0), utc());
        assert!(alarm.parsed);
        assert_eq!(alarm.fire_at, at(7, 30) + Duration::days(1));
    }

    #[test]
    fn test_exactly_now_rolls_to_tomorrow() {
        let alarm = resolve_alarm_time("12:00", at(12, 0), utc());
        assert_eq!(alarm.fire_at, at(12, 0) + Duration::days(1));
    }

    #[test]
    fn test_unparsed_falls_back_one_hour() {
        let alarm = resolve_alarm_time("whenever the storm clears", at(12, 0), utc());
        assert!(!alarm.parsed);
        assert_eq!(alarm.fire_at, at(13, 0));
    }

    #[test]
    fn test_caller_offset() {
        // 12:00 UTC is 07:00 at UTC-5, so 8 am local is an hour away
        let offset = FixedOffset::west_opt(5 * 3600).unwrap();
        let alarm = resolve_alarm_time("8 am", at(12, 0), offset);
        assert_eq!(alarm.fire_at, at(13, 0));
        assert_eq!(alarm.spoken(offset), "8:00 AM");
    }
}
