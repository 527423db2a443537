//! Daily Time Ranges

use crate::TimeWindowError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Seconds in a civil day (no leap seconds)
pub const SECONDS_PER_DAY: u32 = 86_400;

/// Half-open range of seconds since local midnight.
///
/// The end is exclusive, so `00:00-24:00` covers the whole day and
/// `09:00-17:00` stops being valid at 17:00 sharp. The text form is
/// used for configuration files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TimeRange {
    start: u32,
    end: u32,
}

impl TimeRange {
    /// Create a range from seconds since midnight
    pub fn new(start: u32, end: u32) -> Result<Self, TimeWindowError> {
        if end > SECONDS_PER_DAY {
            return Err(TimeWindowError::OutOfBounds(format_clock(end)));
        }
        if start > end {
            return Err(TimeWindowError::Inverted { start, end });
        }
        Ok(Self { start, end })
    }

    /// The whole day
    pub fn all_day() -> Self {
        Self {
            start: 0,
            end: SECONDS_PER_DAY,
        }
    }

    /// First valid second of the range
    pub fn start(&self) -> u32 {
        self.start
    }

    /// First second after the range
    pub fn end(&self) -> u32 {
        self.end
    }

    /// Whether the given second of the day is inside the range
    pub fn contains(&self, second_of_day: u32) -> bool {
        second_of_day >= self.start && second_of_day < self.end
    }

    /// A zero-length range never matches
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

fn parse_clock(text: &str) -> Result<u32, TimeWindowError> {
    let trimmed = text.trim();
    let (hours, minutes) = trimmed
        .split_once(':')
        .ok_or_else(|| TimeWindowError::InvalidFormat(trimmed.to_string()))?;
    let hours: u32 = hours
        .parse()
        .map_err(|_| TimeWindowError::InvalidFormat(trimmed.to_string()))?;
    let minutes: u32 = minutes
        .parse()
        .map_err(|_| TimeWindowError::InvalidFormat(trimmed.to_string()))?;

    if minutes >= 60 || hours > 24 || (hours == 24 && minutes > 0) {
        return Err(TimeWindowError::OutOfBounds(trimmed.to_string()));
    }
    Ok(hours * 3600 + minutes * 60)
}

fn format_clock(seconds: u32) -> String {
    format!("{:02}:{:02}", seconds / 3600, (seconds % 3600) / 60)
}

impl FromStr for TimeRange {
    type Err = TimeWindowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (start, end) = s
            .split_once('-')
            .ok_or_else(|| TimeWindowError::InvalidFormat(s.to_string()))?;
        Self::new(parse_clock(start)?, parse_clock(end)?)
    }
}

impl TryFrom<String> for TimeRange {
    type Error = TimeWindowError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TimeRange> for String {
    fn from(range: TimeRange) -> Self {
        range.to_string()
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", format_clock(self.start), format_clock(self.end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_business_hours() {
        let range: TimeRange = "09:00-17:30".parse().unwrap();
        assert_eq!(range.start(), 9 * 3600);
        assert_eq!(range.end(), 17 * 3600 + 30 * 60);
        assert_eq!(range.to_string(), "09:00-17:30");
    }

    #[test]
    fn test_end_is_exclusive() {
        let range: TimeRange = "09:00-17:00".parse().unwrap();
        assert!(range.contains(9 * 3600));
        assert!(range.contains(17 * 3600 - 1));
        assert!(!range.contains(17 * 3600));
    }

    #[test]
    fn test_midnight_end() {
        let range: TimeRange = "00:00-24:00".parse().unwrap();
        assert_eq!(range, TimeRange::all_day());
        assert!(range.contains(SECONDS_PER_DAY - 1));
    }

    #[test]
    fn test_rejects_bad_ranges() {
        assert!(matches!(
            "0900-1700".parse::<TimeRange>(),
            Err(TimeWindowError::InvalidFormat(_))
        ));
        assert!(matches!(
            "09:00-24:30".parse::<TimeRange>(),
            Err(TimeWindowError::OutOfBounds(_))
        ));
        assert!(matches!(
            "18:00-09:00".parse::<TimeRange>(),
            Err(TimeWindowError::Inverted { .. })
        ));
        assert!(matches!(
            "09:75-10:00".parse::<TimeRange>(),
            Err(TimeWindowError::OutOfBounds(_))
        ));
    }

    #[test]
    fn test_serde_uses_text_form() {
        let range: TimeRange = serde_json::from_str("\"08:15-12:00\"").unwrap();
        assert_eq!(range.start(), 8 * 3600 + 15 * 60);
        assert_eq!(serde_json::to_string(&range).unwrap(), "\"08:15-12:00\"");
        assert!(serde_json::from_str::<TimeRange>("\"noon\"").is_err());
    }
}
