// src/programme.rs
use chrono::{DateTime, FixedOffset, TimeZone};
use std::fmt;

/// Iran Standard Time. Fixed +03:30, no daylight saving.
pub const IRAN_OFFSET_SECS: i32 = 3 * 3600 + 30 * 60;

/// `20260219000000 +0330`
pub const XMLTV_TIME_FMT: &str = "%Y%m%d%H%M%S %z";

pub fn iran_tz() -> FixedOffset {
    FixedOffset::east_opt(IRAN_OFFSET_SECS).expect("+03:30 is a valid offset")
}

/// Channel definition referenced by every guide entry through `id`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Channel {
    pub id: String,
    pub display_name: String,
    pub logo: Option<String>,
}

impl Channel {
    pub fn new(id: &str, display_name: &str, logo: &str) -> Self {
        Self {
            id: id.to_string(),
            display_name: display_name.to_string(),
            logo: if logo.is_empty() { None } else { Some(logo.to_string()) },
        }
    }
}

/// A programme whose start is already an absolute instant in Iran time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Programme {
    pub start: DateTime<FixedOffset>,
    pub stop: Option<DateTime<FixedOffset>>,
    pub title: String,
    pub description: String, // "" = none
    pub image: String,       // "" = no icon
}

/// One schedule slot as the radio sources publish it: a time of day plus
/// whatever the source knows about the programme.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Slot {
    pub time: String,   // HH:MM, zero padded
    pub title: String,
    pub description: String,
    pub duration: u32,  // minutes, 0 = unknown
    pub image: String,  // absolute or ""
}

/// Decimal number in ASCII, Arabic-Indic or Persian digits, optionally
/// prefixed with `+`. Empty input is not a number.
pub fn parse_number(s: &str) -> Option<u32> {
    let digits = s.strip_prefix('+').unwrap_or(s);
    if digits.is_empty() {
        return None;
    }
    digits.chars().try_fold(0u32, |acc, c| {
        let d = match c {
            '0'..='9' => c as u32 - '0' as u32,
            '\u{0660}'..='\u{0669}' => c as u32 - 0x0660,
            '\u{06F0}'..='\u{06F9}' => c as u32 - 0x06F0,
            _ => return None,
        };
        acc.checked_mul(10)?.checked_add(d)
    })
}

/// Epoch milliseconds → Iran local instant.
pub fn from_millis(ms: i64) -> Option<DateTime<FixedOffset>> {
    DateTime::from_timestamp_millis(ms).map(|utc| utc.with_timezone(&iran_tz()))
}

pub fn xmltv_time(dt: &DateTime<FixedOffset>) -> String {
    dt.format(XMLTV_TIME_FMT).to_string()
}

/// Local midnight of the day `now` falls on.
pub fn day_start(now: &DateTime<FixedOffset>) -> DateTime<FixedOffset> {
    now.date_naive()
        .and_hms_opt(0, 0, 0)
        .and_then(|midnight| now.timezone().from_local_datetime(&midnight).single())
        .unwrap_or(*now)
}

impl fmt::Display for Programme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stop = self
            .stop
            .map(|s| s.format("%H:%M").to_string())
            .unwrap_or_else(|| "--:--".into());
        write!(f, "{} ~ {} | {}", self.start.format("%H:%M"), stop, self.title)?;
        if !self.description.is_empty() {
            let short: String = self.description.chars().take(40).collect();
            write!(f, " | {}", short.replace('\n', " "))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(h: u32, m: u32, s: u32) -> DateTime<FixedOffset> {
        iran_tz().with_ymd_and_hms(2026, 2, 19, h, m, s).unwrap()
    }

    #[test]
    fn millis_render_in_iran_time() {
        let ms = at(0, 0, 0).timestamp_millis();
        let dt = from_millis(ms).unwrap();
        assert_eq!(xmltv_time(&dt), "20260219000000 +0330");
    }

    #[test]
    fn midday_and_end_of_day() {
        let noonish = from_millis(at(12, 30, 0).timestamp_millis()).unwrap();
        assert_eq!(xmltv_time(&noonish), "20260219123000 +0330");

        let late = from_millis(at(23, 59, 59).timestamp_millis()).unwrap();
        assert_eq!(xmltv_time(&late), "20260219235959 +0330");
    }

    #[test]
    fn utc_evening_is_next_local_day() {
        // 20:30 UTC on the 18th is local midnight on the 19th
        let utc = chrono::Utc.with_ymd_and_hms(2026, 2, 18, 20, 30, 0).unwrap();
        let dt = from_millis(utc.timestamp_millis()).unwrap();
        assert_eq!(xmltv_time(&dt), "20260219000000 +0330");
    }

    #[test]
    fn day_start_truncates_to_midnight() {
        assert_eq!(day_start(&at(17, 42, 13)), at(0, 0, 0));
        assert_eq!(day_start(&at(0, 0, 0)), at(0, 0, 0));
    }

    #[test]
    fn numbers_in_any_digit_script() {
        assert_eq!(parse_number("42"), Some(42));
        assert_eq!(parse_number("+7"), Some(7));
        assert_eq!(parse_number("۰۹"), Some(9));
        assert_eq!(parse_number("٣٠"), Some(30));
        assert_eq!(parse_number("۱2"), Some(12));
        assert_eq!(parse_number(""), None);
        assert_eq!(parse_number("-1"), None);
        assert_eq!(parse_number("5a"), None);
        assert_eq!(parse_number("99999999999"), None);
    }

    #[test]
    fn channel_without_logo() {
        let ch = Channel::new("X", "X Radio", "");
        assert_eq!(ch.logo, None);
    }
}
