use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use time::format_description::BorrowedFormatItem;
use time::macros::{date, format_description};
use time::{Date, OffsetDateTime};

use crate::ValidationError;

/// First date loaded when the caller does not pick a start.
pub const HISTORY_EPOCH: Date = date!(2015 - 01 - 01);

const ISO_DATE: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");

/// Parse a `YYYY-MM-DD` calendar date.
pub fn parse_date(input: &str) -> Result<Date, ValidationError> {
    Date::parse(input.trim(), ISO_DATE).map_err(|_| ValidationError::InvalidDate {
        value: input.to_owned(),
    })
}

/// Format a calendar date as `YYYY-MM-DD`.
pub fn format_date(value: Date) -> String {
    value
        .format(ISO_DATE)
        .unwrap_or_else(|_| value.to_string())
}

/// Inclusive range of calendar dates with `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DateRange {
    start: Date,
    end: Date,
}

impl DateRange {
    pub fn new(start: Date, end: Date) -> Result<Self, ValidationError> {
        if start > end {
            return Err(ValidationError::InvertedRange {
                start: format_date(start),
                end: format_date(end),
            });
        }
        Ok(Self { start, end })
    }

    /// Resolve optional bounds, defaulting to [`HISTORY_EPOCH`] and today (UTC).
    pub fn resolve(start: Option<Date>, end: Option<Date>) -> Result<Self, ValidationError> {
        Self::new(
            start.unwrap_or(HISTORY_EPOCH),
            end.unwrap_or_else(|| OffsetDateTime::now_utc().date()),
        )
    }

    /// Same as [`DateRange::resolve`] but from raw `YYYY-MM-DD` text.
    pub fn parse(start: Option<&str>, end: Option<&str>) -> Result<Self, ValidationError> {
        let start = start.map(parse_date).transpose()?;
        let end = end.map(parse_date).transpose()?;
        Self::resolve(start, end)
    }

    pub const fn start(&self) -> Date {
        self.start
    }

    pub const fn end(&self) -> Date {
        self.end
    }

    pub fn contains(&self, value: Date) -> bool {
        self.start <= value && value <= self.end
    }
}

impl Default for DateRange {
    fn default() -> Self {
        let today = OffsetDateTime::now_utc().date();
        Self {
            start: HISTORY_EPOCH.min(today),
            end: today,
        }
    }
}

impl Display for DateRange {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}..={}", format_date(self.start), format_date(self.end))
    }
}

#[derive(Serialize, Deserialize)]
struct DateRangeRepr {
    start: String,
    end: String,
}

impl Serialize for DateRange {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        DateRangeRepr {
            start: format_date(self.start),
            end: format_date(self.end),
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for DateRange {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let repr = DateRangeRepr::deserialize(deserializer)?;
        Self::parse(Some(&repr.start), Some(&repr.end)).map_err(serde::de::Error::custom)
    }
}

/// Serde adapter for `YYYY-MM-DD` dates on row types.
pub(crate) mod iso_date {
    use serde::{Deserialize, Deserializer, Serializer};
    use time::Date;

    pub fn serialize<S>(value: &Date, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&super::format_date(*value))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Date, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        super::parse_date(&raw).map_err(serde::de::Error::custom)
    }
}
