//! Free-text date and time extraction.
//!
//! Listings mix ISO dates, day-first locale dates, textual months, bare
//! weekday names and a dozen ways of writing a clock time. Everything here is
//! a pure function over its input: no clock reads, no shared state.
//!
//! Numeric dates are matched in a fixed precedence order (ISO, then
//! day/month/4-digit-year, then day/month/2-digit-year) and every span consumed
//! by a higher tier is masked before lower tiers run, so `2025-03-04` can never
//! be re-read as a two-digit-year date.

pub mod date;
pub mod time;

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use date::{parse_date, weekday_in, DateFormat, DateMatch};
pub use time::{parse_time, parse_time_range, split_utc_offset, TimeRange};

/// Why a fragment could not be turned into a date or time
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseErrorKind {
    #[error("no date or time found")]
    NoMatch,
    #[error("more than one distinct date or time found")]
    AmbiguousMatch,
    #[error("date or time component out of range")]
    OutOfRange,
}

impl ParseErrorKind {
    pub fn label(&self) -> &'static str {
        match self {
            ParseErrorKind::NoMatch => "no_match",
            ParseErrorKind::AmbiguousMatch => "ambiguous_match",
            ParseErrorKind::OutOfRange => "out_of_range",
        }
    }
}

/// Extra knowledge used to complete partial dates
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContextHints {
    /// Date used to pick the year of `DD/MM` style dates
    pub reference_date: Option<NaiveDate>,
    /// Inclusive local date range a bare weekday name is resolved into
    pub window: Option<(NaiveDate, NaiveDate)>,
}

impl ContextHints {
    pub fn with_reference(reference_date: NaiveDate) -> Self {
        Self { reference_date: Some(reference_date), window: None }
    }

    pub fn for_window(start: NaiveDate, end: NaiveDate) -> Self {
        Self { reference_date: Some(start), window: Some((start, end)) }
    }
}

/// Start and optional end of an event as offset-carrying instants
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedTime {
    pub start: DateTime<FixedOffset>,
    pub end: Option<DateTime<FixedOffset>>,
}

impl ResolvedTime {
    pub fn duration(&self) -> Option<Duration> {
        self.end.map(|end| end - self.start)
    }
}

/// Attach a timezone to a local wall-clock time.
///
/// Ambiguous local times (DST fall-back) take the earlier instant; times that
/// fall in a DST gap are moved forward past the gap.
pub fn localize(tz: Tz, naive: NaiveDateTime) -> DateTime<FixedOffset> {
    if let Some(dt) = tz.from_local_datetime(&naive).earliest() {
        return dt.fixed_offset();
    }
    for shift in 1..=3 {
        let shifted = naive + Duration::minutes(30 * shift);
        if let Some(dt) = tz.from_local_datetime(&shifted).earliest() {
            return dt.fixed_offset();
        }
    }
    tz.from_utc_datetime(&naive).fixed_offset()
}

/// Combine a local date and a parsed time range into instants.
///
/// An end time numerically before the start time is taken to fall on the
/// following day.
pub fn resolve_range(date: NaiveDate, range: &TimeRange, tz: Tz) -> ResolvedTime {
    resolve_with(date, range, |naive| localize(tz, naive))
}

/// Like [`resolve_range`] for times that carry their own UTC offset, which
/// wins over any zone configured for the source
pub fn resolve_range_at(date: NaiveDate, range: &TimeRange, offset: FixedOffset) -> ResolvedTime {
    resolve_with(date, range, |naive| {
        offset
            .from_local_datetime(&naive)
            .single()
            .unwrap_or_else(|| offset.from_utc_datetime(&naive))
    })
}

fn resolve_with(
    date: NaiveDate,
    range: &TimeRange,
    at: impl Fn(NaiveDateTime) -> DateTime<FixedOffset>,
) -> ResolvedTime {
    let start = at(date.and_time(range.start));
    let end = range.end.map(|end_time| {
        let end_date = if range.crosses_midnight() { date + Duration::days(1) } else { date };
        at(end_date.and_time(end_time))
    });
    ResolvedTime { start, end }
}

/// Local midnight of `date` as an instant
pub fn start_of_day(date: NaiveDate, tz: Tz) -> DateTime<FixedOffset> {
    localize(tz, date.and_time(NaiveTime::MIN))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;
    use chrono_tz::America::Sao_Paulo;
    use chrono_tz::Europe::London;

    #[test]
    fn test_localize_carries_offset() {
        let naive = NaiveDate::from_ymd_opt(2025, 8, 2).unwrap().and_hms_opt(10, 0, 0).unwrap();
        let dt = localize(Sao_Paulo, naive);
        assert_eq!(dt.offset().local_minus_utc(), -3 * 3600);
        assert_eq!(dt.hour(), 10);
    }

    #[test]
    fn test_localize_moves_out_of_dst_gap() {
        // 2025-03-30 01:30 does not exist in London
        let naive = NaiveDate::from_ymd_opt(2025, 3, 30).unwrap().and_hms_opt(1, 30, 0).unwrap();
        let dt = localize(London, naive);
        assert_eq!(dt.offset().local_minus_utc(), 3600);
        assert_eq!(dt.hour(), 2);
    }

    #[test]
    fn test_resolve_range_at_keeps_explicit_offset() {
        let date = NaiveDate::from_ymd_opt(2025, 8, 2).unwrap();
        let offset = FixedOffset::west_opt(3 * 3600).unwrap();
        let resolved = resolve_range_at(date, &TimeRange::at(NaiveTime::from_hms_opt(14, 0, 0).unwrap()), offset);
        assert_eq!(resolved.start.offset().local_minus_utc(), -3 * 3600);
        assert_eq!(resolved.start.hour(), 14);
        assert_eq!(resolved.end, None);
    }

    #[test]
    fn test_resolve_range_overnight() {
        let date = NaiveDate::from_ymd_opt(2025, 8, 2).unwrap();
        let range = TimeRange {
            start: NaiveTime::from_hms_opt(23, 50, 0).unwrap(),
            end: Some(NaiveTime::from_hms_opt(0, 10, 0).unwrap()),
        };
        let resolved = resolve_range(date, &range, Sao_Paulo);
        let end = resolved.end.unwrap();
        assert_eq!(end.date_naive(), NaiveDate::from_ymd_opt(2025, 8, 3).unwrap());
        assert_eq!(resolved.duration().unwrap(), Duration::minutes(20));
    }
}
