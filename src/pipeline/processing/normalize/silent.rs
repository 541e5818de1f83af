use chrono::{Datelike, Duration, NaiveDateTime, NaiveTime, Weekday};

/// Local time-of-day range during which events should not raise alarms.
///
/// A range whose end is before its start crosses midnight; the weekday
/// filter then applies to the day the range started on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SilentPeriod {
    pub start: NaiveTime,
    pub end: NaiveTime,
    /// Empty means every day
    pub weekdays: Vec<Weekday>,
}

impl SilentPeriod {
    fn applies_on(&self, day: Weekday) -> bool {
        self.weekdays.is_empty() || self.weekdays.contains(&day)
    }

    pub fn contains(&self, local: NaiveDateTime) -> bool {
        let time = local.time();
        let day = local.date().weekday();
        if self.start <= self.end {
            return time >= self.start && time < self.end && self.applies_on(day);
        }
        if time >= self.start {
            return self.applies_on(day);
        }
        if time < self.end {
            let previous = (local.date() - Duration::days(1)).weekday();
            return self.applies_on(previous);
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(d: u32, h: u32, m: u32) -> NaiveDateTime {
        // August 2025: the 2nd is a Saturday
        NaiveDate::from_ymd_opt(2025, 8, d).unwrap().and_hms_opt(h, m, 0).unwrap()
    }

    fn hm(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn test_same_day_period() {
        let period = SilentPeriod { start: hm(0, 0), end: hm(6, 0), weekdays: vec![] };
        assert!(period.contains(at(2, 3, 0)));
        assert!(!period.contains(at(2, 6, 0)));
    }

    #[test]
    fn test_overnight_period_uses_start_day() {
        let period = SilentPeriod { start: hm(23, 0), end: hm(6, 0), weekdays: vec![Weekday::Sat] };
        assert!(period.contains(at(2, 23, 30)));
        // Sunday 02:00 belongs to the period that started Saturday night
        assert!(period.contains(at(3, 2, 0)));
        // Saturday 02:00 belongs to Friday's period
        assert!(!period.contains(at(2, 2, 0)));
        assert!(!period.contains(at(2, 12, 0)));
    }
}
