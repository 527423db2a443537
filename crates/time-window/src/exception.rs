//! Date Exceptions
//!
//! An exception replaces the weekly ranges for every date it covers.

use crate::TimeRange;
use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

/// Which dates an exception covers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DateSpec {
    /// Absolute dates, inclusive, optionally every `skip_interval` days from `start`
    CalendarDate {
        start: NaiveDate,
        end: NaiveDate,
        #[serde(default)]
        skip_interval: u32,
    },
    /// The same month/day span every year; may wrap over new year
    MonthDate {
        start_month: u32,
        start_day: u32,
        end_month: u32,
        end_day: u32,
    },
    /// A day span every month; negative days count back from the last day
    MonthDay { start_day: i32, end_day: i32 },
    /// The nth weekday of a month (negative counts from the end)
    WeekdayOfMonth {
        weekday: Weekday,
        nth: i32,
        #[serde(default)]
        month: Option<u32>,
    },
}

impl DateSpec {
    /// Precedence rank; the lowest rank wins when several kinds cover a date
    pub fn precedence(&self) -> u8 {
        match self {
            DateSpec::CalendarDate { .. } => 0,
            DateSpec::MonthDate { .. } => 1,
            DateSpec::MonthDay { .. } => 2,
            DateSpec::WeekdayOfMonth { .. } => 3,
        }
    }

    /// Whether this spec covers the given local date
    pub fn covers(&self, date: NaiveDate) -> bool {
        match *self {
            DateSpec::CalendarDate {
                start,
                end,
                skip_interval,
            } => {
                if date < start || date > end {
                    return false;
                }
                skip_interval <= 1 || (date - start).num_days() % i64::from(skip_interval) == 0
            }
            DateSpec::MonthDate {
                start_month,
                start_day,
                end_month,
                end_day,
            } => {
                let key = (date.month(), date.day());
                let from = (start_month, start_day);
                let to = (end_month, end_day);
                if from <= to {
                    key >= from && key <= to
                } else {
                    key >= from || key <= to
                }
            }
            DateSpec::MonthDay { start_day, end_day } => {
                let length = days_in_month(date.year(), date.month());
                match (resolve_day(start_day, length), resolve_day(end_day, length)) {
                    (Some(first), Some(last)) => date.day() >= first && date.day() <= last,
                    _ => false,
                }
            }
            DateSpec::WeekdayOfMonth {
                weekday,
                nth,
                month,
            } => {
                if month.is_some_and(|m| m != date.month()) || date.weekday() != weekday {
                    return false;
                }
                let length = days_in_month(date.year(), date.month());
                if nth > 0 {
                    i64::from((date.day() - 1) / 7 + 1) == i64::from(nth)
                } else if nth < 0 {
                    i64::from((length - date.day()) / 7 + 1) == -i64::from(nth)
                } else {
                    false
                }
            }
        }
    }
}

/// Ranges that apply on the dates covered by `spec`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateException {
    #[serde(flatten)]
    pub spec: DateSpec,
    /// Empty ranges make the covered dates entirely invalid
    #[serde(default)]
    pub ranges: Vec<TimeRange>,
}

impl DateException {
    /// Create an exception
    pub fn new(spec: DateSpec, ranges: Vec<TimeRange>) -> Self {
        Self { spec, ranges }
    }
}

fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|first| first.pred_opt())
        .map(|last| last.day())
        .unwrap_or(28)
}

fn resolve_day(day: i32, length: u32) -> Option<u32> {
    if day > 0 {
        u32::try_from(day).ok().map(|d| d.min(length))
    } else if day < 0 {
        let back = day.unsigned_abs();
        (back <= length).then(|| length + 1 - back)
    } else {
        None
    }
}
