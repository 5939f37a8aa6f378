//! Time-of-day and day-of-week report triggers
//!
//! Fire times are computed in the local timezone. On a DST gap the skipped
//! day is passed over; on an overlap the earlier instant is used.

use chrono::{DateTime, Datelike, Days, Local, NaiveTime, TimeZone, Weekday};
use std::fmt;

use super::error::{SchedulerError, SchedulerResult};

/// Parse a `HH:MM` time of day
pub fn parse_time_of_day(value: &str) -> SchedulerResult<NaiveTime> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M")
        .map_err(|_| SchedulerError::invalid_time(value))
}

/// Parse a day name such as `Monday` or `mon`
pub fn parse_weekday(value: &str) -> SchedulerResult<Weekday> {
    value
        .trim()
        .parse::<Weekday>()
        .map_err(|_| SchedulerError::invalid_weekday(value))
}

/// When a report is due
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportSchedule {
    Daily { at: NaiveTime },
    Weekly { day: Weekday, at: NaiveTime },
}

impl ReportSchedule {
    pub fn daily(time: &str) -> SchedulerResult<Self> {
        Ok(Self::Daily {
            at: parse_time_of_day(time)?,
        })
    }

    pub fn weekly(day: &str, time: &str) -> SchedulerResult<Self> {
        Ok(Self::Weekly {
            day: parse_weekday(day)?,
            at: parse_time_of_day(time)?,
        })
    }

    fn at(&self) -> NaiveTime {
        match self {
            Self::Daily { at } | Self::Weekly { at, .. } => *at,
        }
    }

    fn matches_day(&self, day: Weekday) -> bool {
        match self {
            Self::Daily { .. } => true,
            Self::Weekly { day: wanted, .. } => *wanted == day,
        }
    }

    /// First fire time strictly after `now`, in `now`'s timezone
    pub fn next_after<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> DateTime<Tz> {
        let tz = now.timezone();
        let today = now.date_naive();

        for offset in 0..=8u64 {
            let Some(date) = today.checked_add_days(Days::new(offset)) else {
                break;
            };
            if !self.matches_day(date.weekday()) {
                continue;
            }
            let candidate = tz.from_local_datetime(&date.and_time(self.at())).earliest();
            if let Some(candidate) = candidate {
                if candidate > *now {
                    return candidate;
                }
            }
        }

        // Only reachable at the edge of the representable calendar
        now.clone() + chrono::Duration::days(1)
    }

    /// Time to wait from `now` until the next fire
    pub fn until_next(&self, now: &DateTime<Local>) -> std::time::Duration {
        (self.next_after(now) - now.clone())
            .to_std()
            .unwrap_or(std::time::Duration::from_secs(60))
    }
}

impl fmt::Display for ReportSchedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Daily { at } => write!(f, "daily at {}", at.format("%H:%M")),
            Self::Weekly { day, at } => write!(f, "every {} at {}", day, at.format("%H:%M")),
        }
    }
}
