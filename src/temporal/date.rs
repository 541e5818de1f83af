use chrono::{Datelike, Duration, NaiveDate, Weekday};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::ops::Range;

use super::{ContextHints, ParseErrorKind};
use crate::pipeline::utils::StringUtils;

/// Which pattern produced a date
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateFormat {
    /// `YYYY-MM-DD`, `YYYY/MM/DD`, `YYYY.MM.DD`
    Iso,
    /// `DD/MM/YYYY` and the `-` / `.` variants
    DayMonthYear,
    /// `DD/MM/YY`
    DayMonthShortYear,
    /// `2 de agosto de 2025`, `August 2, 2025`
    Textual,
    /// `02/08` or `2 de agosto`, year taken from the hints
    DayMonth,
    /// `Sábado`, resolved inside the hinted window
    Weekday,
}

impl DateFormat {
    pub fn confidence(&self) -> f32 {
        match self {
            DateFormat::Iso => 1.0,
            DateFormat::DayMonthYear => 0.9,
            DateFormat::Textual => 0.85,
            DateFormat::DayMonthShortYear => 0.6,
            DateFormat::DayMonth => 0.5,
            DateFormat::Weekday => 0.4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DateMatch {
    pub date: NaiveDate,
    pub confidence: f32,
    pub format: DateFormat,
}

impl DateMatch {
    fn new(date: NaiveDate, format: DateFormat) -> Self {
        Self { date, confidence: format.confidence(), format }
    }
}

static ISO_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{4})([-/.])(\d{1,2})([-/.])(\d{1,2})").expect("valid ISO date regex"));

static DMY4_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{1,2})([-/.])(\d{1,2})([-/.])(\d{4})").expect("valid D/M/YYYY regex"));

static DMY2_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{1,2})([-/.])(\d{1,2})([-/.])(\d{2})").expect("valid D/M/YY regex"));

static DM_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d{1,2})/(\d{1,2})").expect("valid D/M regex"));

/// Folded month spellings (pt, es, en) with their month number
const MONTHS: &[(&str, u32)] = &[
    ("janeiro", 1), ("january", 1), ("enero", 1), ("jan", 1), ("ene", 1),
    ("fevereiro", 2), ("february", 2), ("febrero", 2), ("fev", 2), ("feb", 2),
    ("marco", 3), ("march", 3), ("marzo", 3), ("mar", 3),
    ("abril", 4), ("april", 4), ("abr", 4), ("apr", 4),
    ("maio", 5), ("mayo", 5), ("may", 5), ("mai", 5),
    ("junho", 6), ("june", 6), ("junio", 6), ("jun", 6),
    ("julho", 7), ("july", 7), ("julio", 7), ("jul", 7),
    ("agosto", 8), ("august", 8), ("ago", 8), ("aug", 8),
    ("setembro", 9), ("september", 9), ("septiembre", 9), ("sept", 9), ("set", 9), ("sep", 9),
    ("outubro", 10), ("october", 10), ("octubre", 10), ("out", 10), ("oct", 10),
    ("novembro", 11), ("november", 11), ("noviembre", 11), ("nov", 11),
    ("dezembro", 12), ("december", 12), ("diciembre", 12), ("dez", 12), ("dec", 12), ("dic", 12),
];

/// Folded weekday spellings (pt, es, en)
const WEEKDAYS: &[(&str, Weekday)] = &[
    ("segunda", Weekday::Mon), ("monday", Weekday::Mon), ("lunes", Weekday::Mon),
    ("terca", Weekday::Tue), ("tuesday", Weekday::Tue), ("martes", Weekday::Tue),
    ("quarta", Weekday::Wed), ("wednesday", Weekday::Wed), ("miercoles", Weekday::Wed),
    ("quinta", Weekday::Thu), ("thursday", Weekday::Thu), ("jueves", Weekday::Thu),
    ("sexta", Weekday::Fri), ("friday", Weekday::Fri), ("viernes", Weekday::Fri),
    ("sabado", Weekday::Sat), ("saturday", Weekday::Sat),
    ("domingo", Weekday::Sun), ("sunday", Weekday::Sun),
];

fn month_alternation() -> String {
    let mut names: Vec<&str> = MONTHS.iter().map(|(name, _)| *name).collect();
    names.sort_by_key(|name| std::cmp::Reverse(name.len()));
    names.join("|")
}

static DAY_MONTH_TEXT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"\b(\d{{1,2}})(?:º|o|st|nd|rd|th)?\s+(?:de\s+)?({})\b(?:\s+(?:de\s+)?(\d{{4}})\b)?",
        month_alternation()
    ))
    .expect("valid textual day-month regex")
});

static MONTH_DAY_TEXT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"\b({})\s+(\d{{1,2}})(?:st|nd|rd|th)?\b(?:\s+(\d{{4}})\b)?",
        month_alternation()
    ))
    .expect("valid textual month-day regex")
});

fn month_number(folded_name: &str) -> Option<u32> {
    MONTHS.iter().find(|(name, _)| *name == folded_name).map(|(_, m)| *m)
}

/// Outcome of running one precedence tier over the text
#[derive(Default)]
struct TierScan {
    dates: Vec<NaiveDate>,
    out_of_range: bool,
    spans: Vec<Range<usize>>,
}

impl TierScan {
    fn resolve(mut self, format: DateFormat) -> Option<Result<DateMatch, ParseErrorKind>> {
        self.dates.sort();
        self.dates.dedup();
        match self.dates.len() {
            0 if self.out_of_range => Some(Err(ParseErrorKind::OutOfRange)),
            0 => None,
            1 => Some(Ok(DateMatch::new(self.dates[0], format))),
            _ => Some(Err(ParseErrorKind::AmbiguousMatch)),
        }
    }
}

/// A numeric match only counts when it is not glued to further digits
fn digit_bounded(text: &str, span: &Range<usize>) -> bool {
    let before = text[..span.start].chars().next_back();
    let after = text[span.end..].chars().next();
    !before.map_or(false, |c| c.is_ascii_digit()) && !after.map_or(false, |c| c.is_ascii_digit())
}

fn num(caps: &Captures, idx: usize) -> Option<u32> {
    caps.get(idx).and_then(|m| m.as_str().parse().ok())
}

/// Scan a three-part numeric pattern; `order` maps capture groups to (year, month, day)
fn scan_three_part(
    work: &str,
    re: &Regex,
    order: (usize, usize, usize),
    year_base: i32,
) -> TierScan {
    let mut scan = TierScan::default();
    for caps in re.captures_iter(work) {
        let Some(whole) = caps.get(0) else { continue };
        let span = whole.range();
        if !digit_bounded(work, &span) {
            continue;
        }
        let sep1 = caps.get(2).map(|m| m.as_str());
        let sep2 = caps.get(4).map(|m| m.as_str());
        if sep1 != sep2 {
            continue;
        }
        let (Some(y), Some(m), Some(d)) = (num(&caps, order.0), num(&caps, order.1), num(&caps, order.2)) else {
            continue;
        };
        scan.spans.push(span);
        match NaiveDate::from_ymd_opt(year_base + y as i32, m, d) {
            Some(date) => scan.dates.push(date),
            None => scan.out_of_range = true,
        }
    }
    scan
}

fn mask(work: &mut String, spans: &[Range<usize>]) {
    for span in spans {
        let blank = " ".repeat(span.len());
        work.replace_range(span.clone(), &blank);
    }
}

/// Pick the year that puts `month/day` closest to the reference date
fn infer_year(month: u32, day: u32, reference: NaiveDate) -> Option<NaiveDate> {
    let year = reference.year();
    [year - 1, year, year + 1]
        .into_iter()
        .filter_map(|y| NaiveDate::from_ymd_opt(y, month, day))
        .min_by_key(|date| (*date - reference).num_days().abs())
}

fn scan_textual(folded: &str, hints: &ContextHints) -> (TierScan, TierScan) {
    let mut with_year = TierScan::default();
    let mut without_year = TierScan::default();

    let mut record = |day: Option<u32>, month: Option<u32>, year: Option<i32>| {
        let (Some(day), Some(month)) = (day, month) else { return };
        match year {
            Some(y) => match NaiveDate::from_ymd_opt(y, month, day) {
                Some(date) => with_year.dates.push(date),
                None => with_year.out_of_range = true,
            },
            None => {
                let Some(reference) = hints.reference_date else { return };
                match infer_year(month, day, reference) {
                    Some(date) => without_year.dates.push(date),
                    None => without_year.out_of_range = true,
                }
            }
        }
    };

    for caps in DAY_MONTH_TEXT_RE.captures_iter(folded) {
        let month = caps.get(2).and_then(|m| month_number(m.as_str()));
        let year = caps.get(3).and_then(|m| m.as_str().parse::<i32>().ok());
        record(num(&caps, 1), month, year);
    }
    for caps in MONTH_DAY_TEXT_RE.captures_iter(folded) {
        let month = caps.get(1).and_then(|m| month_number(m.as_str()));
        let year = caps.get(3).and_then(|m| m.as_str().parse::<i32>().ok());
        record(num(&caps, 2), month, year);
    }
    (with_year, without_year)
}

fn scan_day_month(work: &str, hints: &ContextHints) -> TierScan {
    let mut scan = TierScan::default();
    let Some(reference) = hints.reference_date else { return scan };
    for caps in DM_RE.captures_iter(work) {
        let Some(whole) = caps.get(0) else { continue };
        let span = whole.range();
        let before = work[..span.start].chars().next_back();
        let after = work[span.end..].chars().next();
        let glued = |c: Option<char>| c.map_or(false, |c| c.is_ascii_digit() || c == '/');
        if glued(before) || glued(after) {
            continue;
        }
        let (Some(d), Some(m)) = (num(&caps, 1), num(&caps, 2)) else { continue };
        match infer_year(m, d, reference) {
            Some(date) => scan.dates.push(date),
            None => scan.out_of_range = true,
        }
    }
    scan
}

fn scan_weekday(folded: &str, hints: &ContextHints) -> Option<Result<DateMatch, ParseErrorKind>> {
    let mut found: Vec<Weekday> = folded
        .split_whitespace()
        .filter_map(|token| WEEKDAYS.iter().find(|(name, _)| *name == token).map(|(_, wd)| *wd))
        .collect();
    found.sort_by_key(|wd| wd.num_days_from_monday());
    found.dedup();

    match found.as_slice() {
        [] => None,
        [weekday] => {
            let (start, end) = hints.window?;
            let mut day = start;
            while day <= end {
                if day.weekday() == *weekday {
                    return Some(Ok(DateMatch::new(day, DateFormat::Weekday)));
                }
                day += Duration::days(1);
            }
            Some(Err(ParseErrorKind::OutOfRange))
        }
        _ => Some(Err(ParseErrorKind::AmbiguousMatch)),
    }
}

/// The weekday named in `text`, when exactly one is named
pub fn weekday_in(text: &str) -> Option<Weekday> {
    let folded = StringUtils::fold(text);
    let mut found: Vec<Weekday> = folded
        .split_whitespace()
        .filter_map(|token| WEEKDAYS.iter().find(|(name, _)| *name == token).map(|(_, wd)| *wd))
        .collect();
    found.dedup();
    match found.as_slice() {
        [weekday] => Some(*weekday),
        _ => None,
    }
}

/// Extract a single calendar date from free text.
///
/// Tiers are tried in a fixed order and the first tier that matches decides
/// the outcome: one distinct date is returned, several distinct dates are
/// `AmbiguousMatch`, and a tier that only matched impossible dates is
/// `OutOfRange` rather than falling through to a looser tier.
pub fn parse_date(text: &str, hints: &ContextHints) -> Result<DateMatch, ParseErrorKind> {
    if text.trim().is_empty() {
        return Err(ParseErrorKind::NoMatch);
    }
    let mut work = text.to_string();

    let numeric_tiers: [(&Lazy<Regex>, (usize, usize, usize), i32, DateFormat); 3] = [
        (&ISO_RE, (1, 3, 5), 0, DateFormat::Iso),
        (&DMY4_RE, (5, 3, 1), 0, DateFormat::DayMonthYear),
        (&DMY2_RE, (5, 3, 1), 2000, DateFormat::DayMonthShortYear),
    ];
    for (re, order, year_base, format) in numeric_tiers {
        let scan = scan_three_part(&work, re, order, year_base);
        mask(&mut work, &scan.spans);
        if let Some(outcome) = scan.resolve(format) {
            return outcome;
        }
    }

    let folded = StringUtils::fold(&work);
    let (with_year, without_year) = scan_textual(&folded, hints);
    if let Some(outcome) = with_year.resolve(DateFormat::Textual) {
        return outcome;
    }
    if let Some(outcome) = without_year.resolve(DateFormat::DayMonth) {
        return outcome;
    }
    if let Some(outcome) = scan_day_month(&work, hints).resolve(DateFormat::DayMonth) {
        return outcome;
    }
    if let Some(outcome) = scan_weekday(&folded, hints) {
        return outcome;
    }

    Err(ParseErrorKind::NoMatch)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_iso_date_is_never_reinterpreted() {
        let parsed = parse_date("2025-03-04", &ContextHints::default()).unwrap();
        assert_eq!(parsed.date, ymd(2025, 3, 4));
        assert_eq!(parsed.format, DateFormat::Iso);
        assert_eq!(parsed.confidence, 1.0);
    }

    #[test]
    fn test_iso_inside_timestamp() {
        let parsed = parse_date("2025-08-02T14:00:00-03:00", &ContextHints::default()).unwrap();
        assert_eq!(parsed.date, ymd(2025, 8, 2));
    }

    #[test]
    fn test_day_first_locale_dates() {
        let parsed = parse_date("SÁBADO – 02/08/2025", &ContextHints::default()).unwrap();
        assert_eq!(parsed.date, ymd(2025, 8, 2));
        assert_eq!(parsed.format, DateFormat::DayMonthYear);

        let parsed = parse_date("02.08.2025", &ContextHints::default()).unwrap();
        assert_eq!(parsed.date, ymd(2025, 8, 2));
    }

    #[test]
    fn test_two_digit_year_is_lowest_numeric_tier() {
        let parsed = parse_date("02/08/25", &ContextHints::default()).unwrap();
        assert_eq!(parsed.date, ymd(2025, 8, 2));
        assert_eq!(parsed.format, DateFormat::DayMonthShortYear);
    }

    #[test]
    fn test_mixed_separators_do_not_match() {
        assert_eq!(parse_date("02/08-2025", &ContextHints::default()), Err(ParseErrorKind::NoMatch));
    }

    #[test]
    fn test_out_of_range() {
        assert_eq!(parse_date("31/02/2025", &ContextHints::default()), Err(ParseErrorKind::OutOfRange));
        assert_eq!(parse_date("2025-13-01", &ContextHints::default()), Err(ParseErrorKind::OutOfRange));
    }

    #[test]
    fn test_ambiguous_when_two_dates_in_same_tier() {
        assert_eq!(
            parse_date("01/08/2025 ou 02/08/2025", &ContextHints::default()),
            Err(ParseErrorKind::AmbiguousMatch)
        );
        // The same date twice is not ambiguous
        assert!(parse_date("02/08/2025 (02/08/2025)", &ContextHints::default()).is_ok());
    }

    #[test]
    fn test_higher_tier_wins_over_lower() {
        let parsed = parse_date("2025-08-03 atualizado 01/08/25", &ContextHints::default()).unwrap();
        assert_eq!(parsed.date, ymd(2025, 8, 3));
    }

    #[test]
    fn test_textual_months() {
        let hints = ContextHints::default();
        assert_eq!(parse_date("2 de agosto de 2025", &hints).unwrap().date, ymd(2025, 8, 2));
        assert_eq!(parse_date("August 3, 2025", &hints).unwrap().date, ymd(2025, 8, 3));
        assert_eq!(parse_date("1º de março de 2026", &hints).unwrap().date, ymd(2026, 3, 1));
    }

    #[test]
    fn test_year_inferred_from_reference() {
        let hints = ContextHints::with_reference(ymd(2025, 12, 28));
        assert_eq!(parse_date("02/01", &hints).unwrap().date, ymd(2026, 1, 2));
        assert_eq!(parse_date("30 de dezembro", &hints).unwrap().date, ymd(2025, 12, 30));
        assert_eq!(parse_date("02/01", &ContextHints::default()), Err(ParseErrorKind::NoMatch));
    }

    #[test]
    fn test_weekday_resolves_inside_window() {
        let hints = ContextHints::for_window(ymd(2025, 8, 1), ymd(2025, 8, 3));
        let parsed = parse_date("Sábado", &hints).unwrap();
        assert_eq!(parsed.date, ymd(2025, 8, 2));
        assert_eq!(parsed.format, DateFormat::Weekday);

        assert_eq!(parse_date("Quarta-feira", &hints), Err(ParseErrorKind::OutOfRange));
        assert_eq!(parse_date("Sábado", &ContextHints::default()), Err(ParseErrorKind::NoMatch));
    }

    #[test]
    fn test_empty_and_garbage() {
        assert_eq!(parse_date("", &ContextHints::default()), Err(ParseErrorKind::NoMatch));
        assert_eq!(parse_date("Grande Prêmio", &ContextHints::default()), Err(ParseErrorKind::NoMatch));
    }
}
