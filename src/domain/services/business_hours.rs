use crate::domain::errors::{DomainError, DomainResult};
use chrono::{
    DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Timelike, Utc,
    Weekday,
};
use chrono_tz::Tz;

/// First business hour of the day (inclusive).
pub const BUSINESS_DAY_START_HOUR: u32 = 9;
/// End of the business day (exclusive).
pub const BUSINESS_DAY_END_HOUR: u32 = 18;

/// Largest business duration accepted, the widest value SLA storage round-trips.
pub const MAX_BUSINESS_MINUTES: i64 = i32::MAX as i64;

const BUSINESS_MINUTES_PER_DAY: i64 = ((BUSINESS_DAY_END_HOUR - BUSINESS_DAY_START_HOUR) * 60) as i64;

/// Fixed Monday-Friday 09:00-18:00 calendar read in one timezone. No holidays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusinessCalendar {
    tz: Tz,
}

impl Default for BusinessCalendar {
    fn default() -> Self {
        Self { tz: Tz::UTC }
    }
}

impl BusinessCalendar {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    /// Whether `instant` falls inside the business window.
    pub fn is_business_time(&self, instant: DateTime<Utc>) -> bool {
        let local = instant.with_timezone(&self.tz).naive_local();
        is_business_day(local.date())
            && local.hour() >= BUSINESS_DAY_START_HOUR
            && local.hour() < BUSINESS_DAY_END_HOUR
    }

    /// Returns the instant reached after counting `minutes` of business time from
    /// `start`.
    ///
    /// `start` outside business hours is first moved to the next business-day opening,
    /// so `minutes == 0` yields `start` itself when it is already in the window and
    /// the next opening otherwise. A duration that exactly fills the rest of a day
    /// lands on the next opening rather than on 18:00, so every result is inside
    /// `[09:00, 18:00)` on a weekday.
    pub fn advance(&self, start: DateTime<Utc>, minutes: i64) -> DomainResult<DateTime<Utc>> {
        if minutes < 0 {
            return Err(DomainError::ValidationError(format!(
                "Business duration must not be negative: {} minutes",
                minutes
            )));
        }
        if minutes > MAX_BUSINESS_MINUTES {
            return Err(DomainError::ValidationError(format!(
                "Business duration exceeds {} minutes: {} minutes",
                MAX_BUSINESS_MINUTES, minutes
            )));
        }

        let mut current = align_to_business_time(start.with_timezone(&self.tz).naive_local());
        let mut remaining = Duration::try_minutes(minutes).ok_or_else(|| {
            DomainError::ValidationError(format!("Business duration out of range: {} minutes", minutes))
        })?;

        // One partial day, then at most one iteration per whole business day.
        let max_days = minutes / BUSINESS_MINUTES_PER_DAY + 3;

        for _ in 0..max_days {
            let day_end = at_hour(current.date(), BUSINESS_DAY_END_HOUR);
            let left_today = day_end - current;

            if remaining < left_today {
                return self.to_utc(current + remaining);
            }

            remaining -= left_today;
            current = at_hour(next_business_day(current.date()), BUSINESS_DAY_START_HOUR);
        }

        Err(DomainError::Internal(format!(
            "Business-hours advance did not converge within {} days (start: {}, minutes: {})",
            max_days, start, minutes
        )))
    }

    fn to_utc(&self, local: NaiveDateTime) -> DomainResult<DateTime<Utc>> {
        // A wall-clock time inside a DST gap does not exist; move past the gap.
        self.tz
            .from_local_datetime(&local)
            .earliest()
            .or_else(|| {
                self.tz
                    .from_local_datetime(&(local + Duration::hours(1)))
                    .earliest()
            })
            .map(|dt| dt.with_timezone(&Utc))
            .ok_or_else(|| {
                DomainError::Internal(format!(
                    "Local time {} does not exist in timezone {}",
                    local, self.tz
                ))
            })
    }
}

fn is_business_day(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

fn next_business_day(date: NaiveDate) -> NaiveDate {
    let mut next = date + Duration::days(1);
    while !is_business_day(next) {
        next += Duration::days(1);
    }
    next
}

fn at_hour(date: NaiveDate, hour: u32) -> NaiveDateTime {
    date.and_time(NaiveTime::default()) + Duration::hours(hour as i64)
}

fn align_to_business_time(local: NaiveDateTime) -> NaiveDateTime {
    let date = local.date();
    if !is_business_day(date) || local.hour() >= BUSINESS_DAY_END_HOUR {
        at_hour(next_business_day(date), BUSINESS_DAY_START_HOUR)
    } else if local.hour() < BUSINESS_DAY_START_HOUR {
        at_hour(date, BUSINESS_DAY_START_HOUR)
    } else {
        local
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // 2026-03-02 is a Monday, 2026-03-06 a Friday.
    fn utc(day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, day, hour, minute, 0).unwrap()
    }

    #[test]
    fn test_friday_late_afternoon_carries_into_monday() {
        let calendar = BusinessCalendar::default();
        // 30 minutes on Friday, the remaining 90 from Monday 09:00.
        let due = calendar.advance(utc(6, 17, 30), 120).unwrap();
        assert_eq!(due, utc(9, 10, 30));
    }

    #[test]
    fn test_zero_minutes_inside_window_is_identity() {
        let calendar = BusinessCalendar::default();
        let start = Utc.with_ymd_and_hms(2026, 3, 3, 11, 17, 42).unwrap();
        assert_eq!(calendar.advance(start, 0).unwrap(), start);
    }

    #[test]
    fn test_zero_minutes_outside_window_moves_to_next_opening() {
        let calendar = BusinessCalendar::default();
        assert_eq!(calendar.advance(utc(3, 7, 15), 0).unwrap(), utc(3, 9, 0));
        assert_eq!(calendar.advance(utc(3, 18, 0), 0).unwrap(), utc(4, 9, 0));
        assert_eq!(calendar.advance(utc(6, 19, 0), 0).unwrap(), utc(9, 9, 0));
        assert_eq!(calendar.advance(utc(7, 12, 0), 0).unwrap(), utc(9, 9, 0));
        assert_eq!(calendar.advance(utc(8, 23, 59), 0).unwrap(), utc(9, 9, 0));
    }

    #[test]
    fn test_same_day_advance() {
        let calendar = BusinessCalendar::default();
        assert_eq!(calendar.advance(utc(2, 10, 0), 90).unwrap(), utc(2, 11, 30));
    }

    #[test]
    fn test_exactly_filling_a_day_lands_on_next_opening() {
        let calendar = BusinessCalendar::default();
        assert_eq!(calendar.advance(utc(2, 9, 0), 540).unwrap(), utc(3, 9, 0));
        assert_eq!(calendar.advance(utc(6, 17, 0), 60).unwrap(), utc(9, 9, 0));
    }

    #[test]
    fn test_multi_day_skips_weekend() {
        let calendar = BusinessCalendar::default();
        // Thursday 16:00 + 3 business days (1620 min): 2h Thu, 9h Fri, 9h Mon, 7h Tue.
        assert_eq!(calendar.advance(utc(5, 16, 0), 1620).unwrap(), utc(10, 16, 0));
    }

    #[test]
    fn test_multi_day_results_always_inside_window() {
        let calendar = BusinessCalendar::default();
        let starts = [
            utc(2, 0, 0),
            utc(2, 8, 59),
            utc(3, 13, 13),
            utc(5, 17, 59),
            utc(6, 18, 30),
            utc(7, 10, 0),
            utc(8, 20, 0),
        ];
        for start in starts {
            for minutes in [541, 600, 1079, 1080, 1081, 2700, 10_000] {
                let due = calendar.advance(start, minutes).unwrap();
                assert!(
                    calendar.is_business_time(due),
                    "advance({}, {}) = {} is outside business hours",
                    start,
                    minutes,
                    due
                );
                assert!(due > start);
            }
        }
    }

    #[test]
    fn test_negative_minutes_rejected() {
        let calendar = BusinessCalendar::default();
        assert!(matches!(
            calendar.advance(utc(2, 10, 0), -1),
            Err(DomainError::ValidationError(_))
        ));
    }

    #[test]
    fn test_oversized_minutes_rejected() {
        let calendar = BusinessCalendar::default();
        for minutes in [MAX_BUSINESS_MINUTES + 1, i64::MAX / 1000, i64::MAX] {
            assert!(matches!(
                calendar.advance(utc(2, 10, 0), minutes),
                Err(DomainError::ValidationError(_))
            ));
        }
    }

    #[test]
    fn test_year_of_business_minutes() {
        let calendar = BusinessCalendar::default();
        // 52 weeks of business days from Monday 2026-03-02 09:00.
        let minutes = 260 * BUSINESS_MINUTES_PER_DAY;
        assert_eq!(
            calendar.advance(utc(2, 9, 0), minutes).unwrap(),
            Utc.with_ymd_and_hms(2027, 3, 1, 9, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_window_is_read_in_calendar_timezone() {
        let calendar = BusinessCalendar::new(chrono_tz::Europe::Berlin);
        // 07:30 UTC is 08:30 in Berlin (CET) -> opens 09:00 local = 08:00 UTC.
        assert_eq!(calendar.advance(utc(2, 7, 30), 60).unwrap(), utc(2, 9, 0));
        // 17:30 UTC is 18:30 local, already closed.
        assert!(!calendar.is_business_time(utc(2, 17, 30)));
    }
}
