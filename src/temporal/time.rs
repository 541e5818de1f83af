use chrono::{FixedOffset, NaiveTime};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

use super::ParseErrorKind;
use crate::pipeline::utils::StringUtils;

/// Start time with an optional end time, both wall-clock
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: NaiveTime,
    pub end: Option<NaiveTime>,
}

impl TimeRange {
    pub fn at(start: NaiveTime) -> Self {
        Self { start, end: None }
    }

    /// An end numerically before the start lands on the next day
    pub fn crosses_midnight(&self) -> bool {
        self.end.map_or(false, |end| end < self.start)
    }
}

/// How a tier turns its captures into (hour, minute)
#[derive(Clone, Copy)]
enum Shape {
    /// hour in group 1, optional minute in group 2, am/pm letter in group 3
    Meridiem,
    /// hour in group 1, minute in group 2
    HourMinute,
    /// hour in group 1
    HourOnly,
    /// fixed time of day
    Fixed(u32, u32),
}

struct TimeTier {
    re: Regex,
    shape: Shape,
    /// reject matches glued to further digits
    digit_bounded: bool,
}

fn tier(pattern: &str, shape: Shape, digit_bounded: bool) -> TimeTier {
    TimeTier {
        re: Regex::new(pattern).expect("valid time regex"),
        shape,
        digit_bounded,
    }
}

/// Time patterns in precedence order
static TIME_TIERS: Lazy<Vec<TimeTier>> = Lazy::new(|| {
    vec![
        // 8pm, 8:30 PM, 8 p.m.
        tier(r"(\d{1,2})(?::(\d{2}))?\s*([ap])\.?\s?m\b\.?", Shape::Meridiem, true),
        // 14:30, 14:30:00
        tier(r"(\d{1,2}):(\d{2})(?::\d{2})?", Shape::HourMinute, true),
        // 14h30, 14 h 30
        tier(r"(\d{1,2})\s*h\s*(\d{2})", Shape::HourMinute, true),
        // 14 horas e 30 minutos, 2 hours and 30 minutes
        tier(
            r"(\d{1,2})\s*(?:horas?|hours?|hrs?)\s+(?:e|and|y|con)\s+(\d{1,2})(?:\s*(?:minutos?|minutes?|mins?))?",
            Shape::HourMinute,
            true,
        ),
        // 14h, 14hs, 14 horas
        tier(r"(\d{1,2})\s*(?:hs|hrs|hr|h|horas|hora|hours|hour)\b", Shape::HourOnly, true),
        // at 14, às 14, a partir das 14
        tier(
            r"\b(?:a partir das|a partir de|starting at|at|as|das|from|a las|a la|ate)\s+(\d{1,2})\b",
            Shape::HourOnly,
            false,
        ),
        tier(r"\b(?:meio[\s-]dia|noon|midday|mediodia)\b", Shape::Fixed(12, 0), false),
        tier(r"\b(?:meia[\s-]noite|midnight|medianoche)\b", Shape::Fixed(0, 0), false),
        // bare hour
        tier(r"^\s*(\d{1,2})\s*$", Shape::HourOnly, false),
    ]
});

static RANGE_SEP_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\s*(?:-|–|—|~|\bto\b|\buntil\b|\btill\b)\s*").expect("valid range separator regex")
});

/// `a`, `as`, `ate` only separate a range when a digit follows, so the `a`
/// of `8 a.m.` is left alone. Group 1 is the digit starting the end time.
static WORD_SEP_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\s*\b(?:ate|as|a)\s+(\d)").expect("valid word separator regex")
});

/// Clock time with seconds followed by `Z` or a `±HH:MM` offset, as in
/// `14:00:00-03:00`. Group 1 is the offset suffix.
static UTC_OFFSET_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\d{1,2}:\d{2}:\d{2}(?:[.,]\d+)?\s*(z|([+-])(\d{2}):?(\d{2}))")
        .expect("valid utc offset regex")
});

fn capture_num(caps: &Captures, idx: usize) -> Option<u32> {
    caps.get(idx).and_then(|m| m.as_str().parse().ok())
}

/// `None` when the components are out of range
fn build_time(shape: Shape, caps: &Captures) -> Option<NaiveTime> {
    let (hour, minute) = match shape {
        Shape::Fixed(h, m) => (h, m),
        Shape::HourOnly => (capture_num(caps, 1)?, 0),
        Shape::HourMinute => (capture_num(caps, 1)?, capture_num(caps, 2)?),
        Shape::Meridiem => {
            let hour = capture_num(caps, 1)?;
            let minute = capture_num(caps, 2).unwrap_or(0);
            if !(1..=12).contains(&hour) {
                return None;
            }
            let pm = caps.get(3).map_or(false, |m| m.as_str() == "p");
            let hour = match (hour, pm) {
                (12, false) => 0,
                (12, true) => 12,
                (h, true) => h + 12,
                (h, false) => h,
            };
            (hour, minute)
        }
    };
    NaiveTime::from_hms_opt(hour, minute, 0)
}

/// Split an explicit UTC offset off a machine-style time.
///
/// Returns the text with the offset suffix removed and the offset itself.
/// Text without one comes back unchanged with `None`.
pub fn split_utc_offset(text: &str) -> (String, Option<FixedOffset>) {
    for caps in UTC_OFFSET_RE.captures_iter(text) {
        let (Some(whole), Some(suffix)) = (caps.get(0), caps.get(1)) else { continue };
        if text[whole.end()..].starts_with(|c: char| c.is_alphanumeric() || c == ':') {
            continue;
        }
        let offset = match (caps.get(2), capture_num(&caps, 3), capture_num(&caps, 4)) {
            (Some(sign), Some(hours), Some(minutes)) if hours <= 14 && minutes < 60 => {
                let seconds = (hours * 3600 + minutes * 60) as i32;
                FixedOffset::east_opt(if sign.as_str() == "-" { -seconds } else { seconds })
            }
            // -15:00 and beyond is a range end, not an offset
            (Some(_), _, _) => None,
            _ => FixedOffset::east_opt(0),
        };
        let Some(offset) = offset else { continue };
        let stripped = format!("{}{}", &text[..suffix.start()], &text[suffix.end()..]);
        return (stripped, Some(offset));
    }
    (text.to_string(), None)
}

/// Positions where a range may be split into start and end text
fn range_splits(text: &str) -> Vec<(usize, usize)> {
    let mut splits: Vec<(usize, usize)> = RANGE_SEP_RE.find_iter(text).map(|m| (m.start(), m.end())).collect();
    splits.extend(
        WORD_SEP_RE
            .captures_iter(text)
            .filter_map(|caps| Some((caps.get(0)?.start(), caps.get(1)?.start()))),
    );
    splits.sort_unstable();
    splits
}

fn is_digit_bounded(text: &str, start: usize, end: usize) -> bool {
    let before = text[..start].chars().next_back();
    let after = text[end..].chars().next();
    !before.map_or(false, |c| c.is_ascii_digit()) && !after.map_or(false, |c| c.is_ascii_digit())
}

/// Extract a single time of day from free text.
///
/// Accepts `HH:MM`, `HHhMM`, `HH h MM`, `HHh`, bare `HH`, AM/PM forms and
/// textual connectors (`às 14`, `14 horas e 30`). Missing minutes become
/// `:00`. A trailing UTC offset is ignored; see [`split_utc_offset`].
pub fn parse_time(text: &str) -> Result<NaiveTime, ParseErrorKind> {
    let (normalized, _) = split_utc_offset(&StringUtils::strip_accents(text));
    if normalized.trim().is_empty() {
        return Err(ParseErrorKind::NoMatch);
    }

    for tier in TIME_TIERS.iter() {
        let mut times: Vec<NaiveTime> = Vec::new();
        let mut out_of_range = false;

        for caps in tier.re.captures_iter(&normalized) {
            let Some(whole) = caps.get(0) else { continue };
            if tier.digit_bounded && !is_digit_bounded(&normalized, whole.start(), whole.end()) {
                continue;
            }
            match build_time(tier.shape, &caps) {
                Some(time) => times.push(time),
                None => out_of_range = true,
            }
        }

        times.sort();
        times.dedup();
        match times.len() {
            0 if out_of_range => return Err(ParseErrorKind::OutOfRange),
            0 => continue,
            1 => return Ok(times[0]),
            _ => return Err(ParseErrorKind::AmbiguousMatch),
        }
    }

    Err(ParseErrorKind::NoMatch)
}

/// Extract a start time and an optional end time (`23:50 - 00:10`,
/// `das 10h às 12h`, `2pm to 4pm`).
///
/// An end equal to the start is dropped. An end earlier than the start is
/// kept; [`TimeRange::crosses_midnight`] tells the caller to roll it to the
/// next day.
pub fn parse_time_range(text: &str) -> Result<TimeRange, ParseErrorKind> {
    let (normalized, _) = split_utc_offset(&StringUtils::strip_accents(text));

    for (sep_start, sep_end) in range_splits(&normalized) {
        let left = &normalized[..sep_start];
        let right = &normalized[sep_end..];
        if let (Ok(start), Ok(end)) = (parse_time(left), parse_time(right)) {
            let end = if end == start { None } else { Some(end) };
            return Ok(TimeRange { start, end });
        }
    }

    parse_time(&normalized).map(TimeRange::at)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hm(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn test_clock_formats() {
        assert_eq!(parse_time("14:30"), Ok(hm(14, 30)));
        assert_eq!(parse_time("14:30:00"), Ok(hm(14, 30)));
        assert_eq!(parse_time("14h30"), Ok(hm(14, 30)));
        assert_eq!(parse_time("14 h 30"), Ok(hm(14, 30)));
        assert_eq!(parse_time("9h05"), Ok(hm(9, 5)));
    }

    #[test]
    fn test_missing_minutes_default_to_zero() {
        assert_eq!(parse_time("14h"), Ok(hm(14, 0)));
        assert_eq!(parse_time("14"), Ok(hm(14, 0)));
        assert_eq!(parse_time("às 9"), Ok(hm(9, 0)));
        assert_eq!(parse_time("at 16"), Ok(hm(16, 0)));
        assert_eq!(parse_time("10 horas"), Ok(hm(10, 0)));
    }

    #[test]
    fn test_textual_connectors() {
        assert_eq!(parse_time("14 horas e 30 minutos"), Ok(hm(14, 30)));
        assert_eq!(parse_time("2 hours and 15"), Ok(hm(2, 15)));
        assert_eq!(parse_time("meio-dia"), Ok(hm(12, 0)));
    }

    #[test]
    fn test_am_pm() {
        assert_eq!(parse_time("8pm"), Ok(hm(20, 0)));
        assert_eq!(parse_time("8:30 PM"), Ok(hm(20, 30)));
        assert_eq!(parse_time("8 a.m."), Ok(hm(8, 0)));
        assert_eq!(parse_time("12am"), Ok(hm(0, 0)));
        assert_eq!(parse_time("12pm"), Ok(hm(12, 0)));
        assert_eq!(parse_time("13pm"), Err(ParseErrorKind::OutOfRange));
    }

    #[test]
    fn test_errors() {
        assert_eq!(parse_time(""), Err(ParseErrorKind::NoMatch));
        assert_eq!(parse_time("ao vivo"), Err(ParseErrorKind::NoMatch));
        assert_eq!(parse_time("25:00"), Err(ParseErrorKind::OutOfRange));
        assert_eq!(parse_time("10:75"), Err(ParseErrorKind::OutOfRange));
        assert_eq!(parse_time("10:00 e 14:00"), Err(ParseErrorKind::AmbiguousMatch));
    }

    #[test]
    fn test_ranges() {
        let range = parse_time_range("10h às 12h").unwrap();
        assert_eq!(range, TimeRange { start: hm(10, 0), end: Some(hm(12, 0)) });

        let range = parse_time_range("14:00 to 15:30").unwrap();
        assert_eq!(range.end, Some(hm(15, 30)));

        let range = parse_time_range("das 9h30 até 11h").unwrap();
        assert_eq!(range, TimeRange { start: hm(9, 30), end: Some(hm(11, 0)) });

        let single = parse_time_range("às 10h").unwrap();
        assert_eq!(single, TimeRange::at(hm(10, 0)));
    }

    #[test]
    fn test_am_pm_on_both_ends() {
        let range = parse_time_range("8 a.m. - 10 a.m.").unwrap();
        assert_eq!(range, TimeRange { start: hm(8, 0), end: Some(hm(10, 0)) });

        let range = parse_time_range("2pm to 4:30pm").unwrap();
        assert_eq!(range, TimeRange { start: hm(14, 0), end: Some(hm(16, 30)) });

        let range = parse_time_range("9 a.m. a 11 a.m.").unwrap();
        assert_eq!(range, TimeRange { start: hm(9, 0), end: Some(hm(11, 0)) });
    }

    #[test]
    fn test_connector_words_need_a_following_number() {
        assert_eq!(range_splits("8 a.m."), vec![]);
        assert_eq!(range_splits("10h as 12h").len(), 1);
        assert_eq!(parse_time_range("a las 15"), Ok(TimeRange::at(hm(15, 0))));
    }

    #[test]
    fn test_utc_offset_suffix_is_not_a_range() {
        let range = parse_time_range("14:00:00-03:00").unwrap();
        assert_eq!(range, TimeRange::at(hm(14, 0)));
        assert_eq!(parse_time("14:00:00-03:00"), Ok(hm(14, 0)));

        let range = parse_time_range("2025-08-02T14:00:00-03:00").unwrap();
        assert_eq!(range, TimeRange::at(hm(14, 0)));

        let (clock, offset) = split_utc_offset("14:00:00-03:00");
        assert_eq!(clock, "14:00:00");
        assert_eq!(offset, FixedOffset::west_opt(3 * 3600));

        let (_, offset) = split_utc_offset("09:30:00Z");
        assert_eq!(offset, FixedOffset::east_opt(0));
        let (_, offset) = split_utc_offset("18:00:00+0530");
        assert_eq!(offset, FixedOffset::east_opt(5 * 3600 + 30 * 60));
    }

    #[test]
    fn test_ranges_with_seconds_still_split() {
        let (text, offset) = split_utc_offset("23:50:00-00:10:00");
        assert_eq!(offset, None);
        assert_eq!(text, "23:50:00-00:10:00");
        let range = parse_time_range("23:50:00-00:10:00").unwrap();
        assert_eq!(range, TimeRange { start: hm(23, 50), end: Some(hm(0, 10)) });
        assert_eq!(parse_time_range("14:00 - 15:00").unwrap().end, Some(hm(15, 0)));
        assert_eq!(parse_time_range("14:00:00-16:00").unwrap().end, Some(hm(16, 0)));
    }

    #[test]
    fn test_overnight_range() {
        let range = parse_time_range("23:50 - 00:10").unwrap();
        assert_eq!(range.start, hm(23, 50));
        assert_eq!(range.end, Some(hm(0, 10)));
        assert!(range.crosses_midnight());
    }
}
