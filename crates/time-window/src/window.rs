//! Weekly Time Windows

use crate::{DateException, TimeRange};
use chrono::{DateTime, Datelike, Days, FixedOffset, NaiveDate, NaiveTime, Offset, TimeZone, Timelike, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// Forward scan bound for `next_valid`, in days
pub const MAX_SCAN_DAYS: u64 = 366;

/// Ordered ranges for each day of the week
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeeklySchedule {
    pub monday: Vec<TimeRange>,
    pub tuesday: Vec<TimeRange>,
    pub wednesday: Vec<TimeRange>,
    pub thursday: Vec<TimeRange>,
    pub friday: Vec<TimeRange>,
    pub saturday: Vec<TimeRange>,
    pub sunday: Vec<TimeRange>,
}

impl WeeklySchedule {
    /// Every day, all day
    pub fn always() -> Self {
        let day = vec![TimeRange::all_day()];
        Self {
            monday: day.clone(),
            tuesday: day.clone(),
            wednesday: day.clone(),
            thursday: day.clone(),
            friday: day.clone(),
            saturday: day.clone(),
            sunday: day,
        }
    }

    pub fn ranges(&self, weekday: Weekday) -> &[TimeRange] {
        match weekday {
            Weekday::Mon => &self.monday,
            Weekday::Tue => &self.tuesday,
            Weekday::Wed => &self.wednesday,
            Weekday::Thu => &self.thursday,
            Weekday::Fri => &self.friday,
            Weekday::Sat => &self.saturday,
            Weekday::Sun => &self.sunday,
        }
    }

    /// Replace the ranges of one day, keeping them sorted by start
    pub fn set(&mut self, weekday: Weekday, mut ranges: Vec<TimeRange>) {
        ranges.sort();
        let slot = match weekday {
            Weekday::Mon => &mut self.monday,
            Weekday::Tue => &mut self.tuesday,
            Weekday::Wed => &mut self.wednesday,
            Weekday::Thu => &mut self.thursday,
            Weekday::Fri => &mut self.friday,
            Weekday::Sat => &mut self.saturday,
            Weekday::Sun => &mut self.sunday,
        };
        *slot = ranges;
    }
}

/// A named time window.
///
/// Date exceptions replace the weekday ranges on the dates they cover;
/// when several exceptions cover a date only the highest-precedence kind
/// counts and its ranges are merged. Instants inside any exclusion are
/// never valid. Local dates are computed with a fixed UTC offset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub name: String,
    #[serde(default)]
    pub weekly: WeeklySchedule,
    #[serde(default)]
    pub exceptions: Vec<DateException>,
    #[serde(default)]
    pub exclusions: Vec<TimeWindow>,
    #[serde(default)]
    pub utc_offset_seconds: i32,
}

impl TimeWindow {
    /// Empty window (never valid until ranges are added)
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            weekly: WeeklySchedule::default(),
            exceptions: Vec::new(),
            exclusions: Vec::new(),
            utc_offset_seconds: 0,
        }
    }

    /// 24x7 window
    pub fn always(name: impl Into<String>) -> Self {
        Self {
            weekly: WeeklySchedule::always(),
            ..Self::new(name)
        }
    }

    pub fn with_day(mut self, weekday: Weekday, ranges: Vec<TimeRange>) -> Self {
        self.weekly.set(weekday, ranges);
        self
    }

    pub fn with_exception(mut self, exception: DateException) -> Self {
        self.exceptions.push(exception);
        self
    }

    pub fn with_exclusion(mut self, excluded: TimeWindow) -> Self {
        self.exclusions.push(excluded);
        self
    }

    pub fn with_utc_offset(mut self, seconds: i32) -> Self {
        self.utc_offset_seconds = seconds;
        self
    }

    /// Offset used to compute local dates; invalid offsets fall back to UTC
    pub fn offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_seconds).unwrap_or_else(|| Utc.fix())
    }

    /// Ranges in force on a local date
    pub fn ranges_on(&self, date: NaiveDate) -> Vec<TimeRange> {
        let best = self
            .exceptions
            .iter()
            .filter(|e| e.spec.covers(date))
            .map(|e| e.spec.precedence())
            .min();

        match best {
            Some(rank) => {
                let mut ranges: Vec<TimeRange> = self
                    .exceptions
                    .iter()
                    .filter(|e| e.spec.precedence() == rank && e.spec.covers(date))
                    .flat_map(|e| e.ranges.iter().copied())
                    .collect();
                ranges.sort();
                ranges.dedup();
                ranges
            }
            None => self.weekly.ranges(date.weekday()).to_vec(),
        }
    }

    /// Whether `ts` (unix seconds) falls inside the window
    pub fn contains(&self, ts: i64) -> bool {
        self.in_ranges(ts) && !self.exclusions.iter().any(|x| x.contains(ts))
    }

    /// First instant at or after `ts` inside the window.
    ///
    /// Scans at most `MAX_SCAN_DAYS` days forward and returns `ts`
    /// unchanged when no valid instant exists in that span.
    pub fn next_valid(&self, ts: i64) -> i64 {
        let offset = self.offset();
        let Some(local) = to_local(ts, offset) else {
            return ts;
        };
        let first_day = local.date_naive();
        let first_second = local.num_seconds_from_midnight();

        for day in 0..=MAX_SCAN_DAYS {
            let Some(date) = first_day.checked_add_days(Days::new(day)) else {
                break;
            };
            let Some(day_start) = local_midnight(date, offset) else {
                break;
            };
            let floor = if day == 0 { first_second } else { 0 };

            for range in self.ranges_on(date) {
                if range.is_empty() || range.end() <= floor {
                    continue;
                }
                let end = day_start + i64::from(range.end());
                let mut candidate = day_start + i64::from(range.start().max(floor));
                while candidate < end {
                    match self.exclusions.iter().find(|x| x.contains(candidate)) {
                        None => return candidate,
                        Some(excluded) => candidate = excluded.range_end(candidate),
                    }
                }
            }
        }

        debug!(
            "No valid instant in window '{}' within {} days of {}",
            self.name, MAX_SCAN_DAYS, ts
        );
        ts
    }

    fn in_ranges(&self, ts: i64) -> bool {
        let Some(local) = to_local(ts, self.offset()) else {
            return false;
        };
        let second = local.num_seconds_from_midnight();
        self.ranges_on(local.date_naive())
            .iter()
            .any(|r| r.contains(second))
    }

    /// End of the raw range containing `ts`, or the next second when none does
    fn range_end(&self, ts: i64) -> i64 {
        let offset = self.offset();
        let Some(local) = to_local(ts, offset) else {
            return ts + 1;
        };
        let date = local.date_naive();
        let second = local.num_seconds_from_midnight();
        let end = self
            .ranges_on(date)
            .iter()
            .filter(|r| r.contains(second))
            .map(|r| r.end())
            .max();

        match (end, local_midnight(date, offset)) {
            (Some(end), Some(day_start)) => day_start + i64::from(end),
            _ => ts + 1,
        }
    }
}

fn to_local(ts: i64, offset: FixedOffset) -> Option<DateTime<FixedOffset>> {
    DateTime::from_timestamp(ts, 0).map(|utc| utc.with_timezone(&offset))
}

fn local_midnight(date: NaiveDate, offset: FixedOffset) -> Option<i64> {
    offset
        .from_local_datetime(&date.and_time(NaiveTime::MIN))
        .single()
        .map(|dt| dt.timestamp())
}

/// Null windows are always valid
pub fn is_valid(window: Option<&TimeWindow>, ts: i64) -> bool {
    window.map_or(true, |w| w.contains(ts))
}

/// Next valid instant; a null window returns `ts`
pub fn next_valid(window: Option<&TimeWindow>, ts: i64) -> i64 {
    window.map_or(ts, |w| w.next_valid(ts))
}

/// Lookup of windows by name
pub trait WindowCatalog {
    fn window(&self, name: &str) -> Option<&TimeWindow>;
}

impl WindowCatalog for HashMap<String, TimeWindow> {
    fn window(&self, name: &str) -> Option<&TimeWindow> {
        self.get(name)
    }
}
