//! Permissive date parsing for publication dates.
//!
//! Ingested records carry dates as `2021-03-04`, `2021/03/04`, compact
//! `20210304` (sometimes stored as a number), `2021-03` or a bare `2021`,
//! occasionally with a trailing time part. Formats are tried from the most
//! to the least specific and the first success wins; anything else is `None`.

use chrono::{Datelike, NaiveDate};
use serde_json::Value;

use crate::record::display_value;

/// Parse a date from a JSON value (string or number).
pub fn parse_date_value(value: &Value) -> Option<NaiveDate> {
    display_value(value).and_then(|s| parse_date(&s))
}

/// Parse a date string in any of the tolerated formats.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    // Full dates, ignoring any time suffix. Month and day may be unpadded.
    let head = s.split(['T', ' ']).next().unwrap_or(s);
    for fmt in ["%Y-%m-%d", "%Y/%m/%d"] {
        if let Ok(d) = NaiveDate::parse_from_str(head, fmt) {
            return Some(d);
        }
    }

    // Compact yyyymmdd.
    if s.len() >= 8 && s.as_bytes()[..8].iter().all(u8::is_ascii_digit) {
        if let Ok(d) = NaiveDate::parse_from_str(&s[..8], "%Y%m%d") {
            return Some(d);
        }
    }

    // Year-month.
    for fmt in ["%Y-%m-%d", "%Y/%m/%d"] {
        let sep = &fmt[2..3];
        if let Ok(d) = NaiveDate::parse_from_str(&format!("{head}{sep}1"), fmt) {
            return Some(d);
        }
    }

    // Bare year.
    if s.len() == 4 && s.bytes().all(|b| b.is_ascii_digit()) {
        let year: i32 = s.parse().ok()?;
        return NaiveDate::from_ymd_opt(year, 1, 1);
    }

    None
}

/// Year of a date value, if it parses.
pub fn year_of(value: &Value) -> Option<i32> {
    parse_date_value(value).map(|d| d.year())
}

/// English ordinal for a day of the month (`1st`, `12th`, `22nd`).
pub fn ordinal(n: u32) -> String {
    let suffix = if (10..=20).contains(&(n % 100)) {
        "th"
    } else {
        match n % 10 {
            1 => "st",
            2 => "nd",
            3 => "rd",
            _ => "th",
        }
    };
    format!("{n}{suffix}")
}

/// Render as `March 4th, 2021`.
pub fn long_date(date: NaiveDate) -> String {
    format!("{} {}, {}", date.format("%B"), ordinal(date.day()), date.year())
}
