//! Target window detection: which weekend (or other weekday span) the run
//! reconciles events for.

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, NaiveTime, Utc, Weekday};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::temporal::{localize, ContextHints};

/// Weekday boundaries of the window, both inclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowConfig {
    pub start: Weekday,
    pub end: Weekday,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self { start: Weekday::Fri, end: Weekday::Sun }
    }
}

impl WindowConfig {
    /// Days from the first to the last day of the window
    fn span_days(&self) -> i64 {
        let start = self.start.num_days_from_monday() as i64;
        let end = self.end.num_days_from_monday() as i64;
        (end - start).rem_euclid(7)
    }
}

/// Resolved reconciliation window.
///
/// `start` is local midnight of the first day and `end` is local midnight
/// after the last day, exclusive. Both carry the zone's offset at that
/// instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetWindow {
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
    pub timezone: String,
}

impl TargetWindow {
    pub fn contains(&self, instant: &DateTime<FixedOffset>) -> bool {
        self.start <= *instant && *instant < self.end
    }

    pub fn start_date(&self) -> NaiveDate {
        self.start.date_naive()
    }

    /// Last local day inside the window
    pub fn end_date(&self) -> NaiveDate {
        self.end.date_naive() - Duration::days(1)
    }

    /// Hints that let the date parser complete year-less dates and bare
    /// weekday names against this window
    pub fn hints(&self) -> ContextHints {
        ContextHints::for_window(self.start_date(), self.end_date())
    }
}

fn window_for_week(monday: NaiveDate, tz: Tz, cfg: &WindowConfig) -> TargetWindow {
    let first = monday + Duration::days(cfg.start.num_days_from_monday() as i64);
    let after_last = first + Duration::days(cfg.span_days() + 1);
    TargetWindow {
        start: localize(tz, first.and_time(NaiveTime::MIN)),
        end: localize(tz, after_last.and_time(NaiveTime::MIN)),
        timezone: tz.name().to_string(),
    }
}

/// Compute the window that applies at `now`.
///
/// Weeks start on Monday in `tz`. The window of the current week is used
/// unless `now` is already past its end, in which case the following week's
/// window is returned. A window that wraps into the next week (for example
/// Saturday to Monday) is still running on its last day, so the previous
/// week's window is checked first.
pub fn target_window(now: DateTime<Utc>, tz: Tz, cfg: &WindowConfig) -> TargetWindow {
    let local_date = now.with_timezone(&tz).date_naive();
    let monday = local_date - Duration::days(local_date.weekday().num_days_from_monday() as i64);
    let now_fixed = now.fixed_offset();

    let previous = window_for_week(monday - Duration::weeks(1), tz, cfg);
    if previous.contains(&now_fixed) {
        return previous;
    }
    let current = window_for_week(monday, tz, cfg);
    if current.end > now_fixed {
        return current;
    }
    window_for_week(monday + Duration::weeks(1), tz, cfg)
}
