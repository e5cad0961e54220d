//! Moment-style date patterns backed by `chrono`.
//!
//! Reports declare date formats the way front-end date libraries spell
//! them (`DD/MM/YYYY`, `YYYY-MM-DD HH:mm`). [`DatePattern`] translates such a
//! pattern into `chrono` strftime items once and then parses and formats
//! values with it.
//!
//! Supported tokens:
//!
//! | Token          | Meaning                      | chrono |
//! |----------------|------------------------------|--------|
//! | `YYYY` / `YY`  | year / two-digit year        | `%Y` / `%y` |
//! | `MMMM` / `MMM` | month name / short name      | `%B` / `%b` |
//! | `MM` / `M`     | month number                 | `%m`   |
//! | `DD` / `D`     | day of month                 | `%d`   |
//! | `DDDD`/`DDD`   | day of year                  | `%j`   |
//! | `dddd` / `ddd` | weekday name / short name    | `%A` / `%a` |
//! | `HH` / `H`     | hour, 24h                    | `%H`   |
//! | `hh` / `h`     | hour, 12h                    | `%I`   |
//! | `mm` / `m`     | minute                       | `%M`   |
//! | `ss` / `s`     | second                       | `%S`   |
//! | `S`..`SSSSSSSSS` | fraction of a second       | `%3f` / `%6f` / `%9f` |
//! | `A` / `a`      | am/pm                        | `%p`   |
//! | `X`            | unix seconds                 | `%s`   |
//! | `[text]`       | literal text                 |        |

use std::fmt::Write as _;

use chrono::format::{self, Parsed, StrftimeItems};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

/// Pattern and value used for blank dates.
pub const SENTINEL_PATTERN: &str = "DD/MM/YYYY";
/// Blank dates sort as this date.
pub const SENTINEL_VALUE: &str = "01/01/1999";

/// A compiled moment-style date pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatePattern {
    source: String,
    strftime: String,
}

impl DatePattern {
    /// Translate a moment-style pattern.
    pub fn compile(pattern: &str) -> Self {
        Self {
            source: pattern.to_string(),
            strftime: translate(pattern),
        }
    }

    /// The pattern as written in the report.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The equivalent strftime string.
    pub fn strftime(&self) -> &str {
        &self.strftime
    }

    /// Parse a value, returning `None` when it does not match the pattern or
    /// names an impossible date.
    ///
    /// Missing day or month default to 1 and a missing time to midnight. A
    /// pattern without any date part parses onto 1970-01-01.
    pub fn parse(&self, value: &str) -> Option<NaiveDateTime> {
        let mut parsed = Parsed::new();
        format::parse(&mut parsed, value, StrftimeItems::new(&self.strftime)).ok()?;

        if let Ok(timestamp) = parsed.to_naive_datetime_with_offset(0) {
            return Some(timestamp);
        }

        let time = parsed
            .to_naive_time()
            .unwrap_or(NaiveTime::MIN);

        let date = match parsed.to_naive_date() {
            Ok(date) => Some(date),
            Err(_) => {
                // A failed set means the field was already parsed; keep it.
                let _ = parsed.set_day(1);
                parsed.to_naive_date().ok().or_else(|| {
                    let _ = parsed.set_month(1);
                    parsed.to_naive_date().ok()
                })
            }
        };

        match date {
            Some(date) => Some(date.and_time(time)),
            None if !self.has_date_fields() => {
                NaiveDate::from_ymd_opt(1970, 1, 1).map(|epoch| epoch.and_time(time))
            }
            None => None,
        }
    }

    /// Format a timestamp with this pattern.
    ///
    /// Returns `None` when the pattern cannot be rendered for a naive
    /// timestamp.
    pub fn format(&self, timestamp: &NaiveDateTime) -> Option<String> {
        let mut out = String::new();
        write!(out, "{}", timestamp.format_with_items(StrftimeItems::new(&self.strftime))).ok()?;
        Some(out)
    }

    /// The value blank cells take in this pattern.
    ///
    /// The sentinel date is parsed with [`SENTINEL_PATTERN`] and rendered with
    /// this pattern, then lower-cased the way cell values are.
    pub fn sentinel(&self) -> Option<String> {
        let date = NaiveDate::parse_from_str(SENTINEL_VALUE, "%d/%m/%Y").ok()?;
        self.format(&date.and_time(NaiveTime::MIN))
            .map(|value| value.to_lowercase())
    }

    fn has_date_fields(&self) -> bool {
        ["%Y", "%y", "%m", "%b", "%B", "%d", "%j", "%s"]
            .iter()
            .any(|spec| self.strftime.contains(spec))
    }
}

/// Translate moment tokens into strftime specifiers.
fn translate(pattern: &str) -> String {
    let chars: Vec<char> = pattern.chars().collect();
    let mut out = String::with_capacity(pattern.len() * 2);
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if c == '[' {
            // Escaped literal up to the closing bracket.
            i += 1;
            while i < chars.len() && chars[i] != ']' {
                push_literal(&mut out, chars[i]);
                i += 1;
            }
            i += 1;
            continue;
        }

        let run = chars[i..].iter().take_while(|&&next| next == c).count();
        match token(c, run) {
            Some(spec) => out.push_str(spec),
            None => {
                for _ in 0..run {
                    push_literal(&mut out, c);
                }
            }
        }
        i += run;
    }

    out
}

fn token(c: char, run: usize) -> Option<&'static str> {
    let spec = match (c, run) {
        ('Y', 2) => "%y",
        ('Y', _) => "%Y",
        ('M', 1 | 2) => "%m",
        ('M', 3) => "%b",
        ('M', _) => "%B",
        ('D', 1 | 2) => "%d",
        ('D', _) => "%j",
        ('d', 3) => "%a",
        ('d', 4) => "%A",
        ('H', 1 | 2) => "%H",
        ('h', 1 | 2) => "%I",
        ('m', 1 | 2) => "%M",
        ('s', 1 | 2) => "%S",
        ('S', 1..=3) => "%3f",
        ('S', 4..=6) => "%6f",
        ('S', _) => "%9f",
        ('A' | 'a', 1) => "%p",
        ('X', 1) => "%s",
        _ => return None,
    };
    Some(spec)
}

fn push_literal(out: &mut String, c: char) {
    if c == '%' {
        out.push_str("%%");
    } else {
        out.push(c);
    }
}
