//! Calendar-date arithmetic for stay windows.
//!
//! Dates are whole calendar days with no time-of-day component. They order
//! exactly like the eight-digit integer `YYYYMMDD`, which is how they are
//! stored.

use std::{fmt, str::FromStr};

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// A calendar day, written `YYYY-MM-DD`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CalendarDate(u32);

/// Error returned when a date string is not a valid `YYYY-MM-DD` day.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("malformed date '{0}': expected YYYY-MM-DD")]
pub struct MalformedDate(String);

impl CalendarDate {
    /// The first representable day, `0001-01-01`.
    pub const EARLIEST: Self = Self(1_01_01);

    /// The last representable day, `9999-12-31`.
    pub const LATEST: Self = Self(9999_12_31);

    /// Parses a `YYYY-MM-DD` string.
    ///
    /// A trailing time component separated by `T` or a space is ignored, so
    /// `2025-11-05T18:30:00Z` reads as `2025-11-05`.
    ///
    /// # Errors
    ///
    /// Returns [`MalformedDate`] if the day part is not a real calendar date.
    pub fn parse(input: &str) -> Result<Self, MalformedDate> {
        let trimmed = input.trim();
        let day = trimmed
            .split_once(['T', ' '])
            .map_or(trimmed, |(day, _)| day);

        if day.len() != 10 {
            return Err(MalformedDate(input.to_string()));
        }

        NaiveDate::parse_from_str(day, "%Y-%m-%d")
            .ok()
            .and_then(Self::from_naive)
            .ok_or_else(|| MalformedDate(input.to_string()))
    }

    /// Converts a chrono date. Returns `None` for years before 1 or after 9999.
    #[must_use]
    pub fn from_naive(date: NaiveDate) -> Option<Self> {
        let year = u32::try_from(date.year()).ok().filter(|y| (1..=9999).contains(y))?;
        Some(Self(year * 10_000 + date.month() * 100 + date.day()))
    }

    /// Converts back to a chrono date.
    #[must_use]
    pub fn to_naive(self) -> NaiveDate {
        let (year, month, day) = self.parts();
        // Only valid dates are ever constructed.
        i32::try_from(year)
            .ok()
            .and_then(|year| NaiveDate::from_ymd_opt(year, month, day))
            .unwrap_or_default()
    }

    /// The date as the integer `YYYYMMDD`.
    #[must_use]
    pub const fn as_number(self) -> u32 {
        self.0
    }

    /// Whether `self` is exactly one calendar day after `other`.
    #[must_use]
    pub fn is_day_after(self, other: Self) -> bool {
        other.to_naive().succ_opt() == Some(self.to_naive())
    }

    /// The following calendar day, if representable.
    #[must_use]
    pub fn next_day(self) -> Option<Self> {
        self.to_naive().succ_opt().and_then(Self::from_naive)
    }

    const fn parts(self) -> (u32, u32, u32) {
        (self.0 / 10_000, self.0 / 100 % 100, self.0 % 100)
    }
}

impl fmt::Display for CalendarDate {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let (year, month, day) = self.parts();
        write!(f, "{year:04}-{month:02}-{day:02}")
    }
}

impl FromStr for CalendarDate {
    type Err = MalformedDate;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for CalendarDate {
    type Error = MalformedDate;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<CalendarDate> for String {
    fn from(date: CalendarDate) -> Self {
        date.to_string()
    }
}

/// Where "today" falls relative to a stay window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WindowPosition {
    /// Today is before the first day.
    Before,
    /// Today is on or between the first and last days.
    Within,
    /// Today is after the last day.
    After,
}

/// An inclusive range of calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DateWindow {
    start: CalendarDate,
    end: CalendarDate,
}

impl DateWindow {
    /// Creates a window. `start` is expected to be on or before `end`; an
    /// inverted window never contains any day.
    #[must_use]
    pub const fn new(start: CalendarDate, end: CalendarDate) -> Self {
        Self { start, end }
    }

    /// Creates a window if both ends are known.
    #[must_use]
    pub fn from_parts(start: Option<CalendarDate>, end: Option<CalendarDate>) -> Option<Self> {
        Some(Self::new(start?, end?))
    }

    /// First day of the window.
    #[must_use]
    pub const fn start(&self) -> CalendarDate {
        self.start
    }

    /// Last day of the window.
    #[must_use]
    pub const fn end(&self) -> CalendarDate {
        self.end
    }

    /// Whether the window runs backwards.
    #[must_use]
    pub fn is_inverted(&self) -> bool {
        self.start > self.end
    }

    /// Where `today` falls relative to the window.
    #[must_use]
    pub fn position(&self, today: CalendarDate) -> WindowPosition {
        if self.start <= today && today <= self.end {
            WindowPosition::Within
        } else if today < self.start {
            WindowPosition::Before
        } else {
            WindowPosition::After
        }
    }

    /// Whether `day` falls inside the window.
    #[must_use]
    pub fn contains(&self, day: CalendarDate) -> bool {
        self.position(day) == WindowPosition::Within
    }

    /// Whether the two windows share at least one day.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        !self.is_inverted()
            && !other.is_inverted()
            && self.start <= other.end
            && other.start <= self.end
    }
}

/// Classifies `today` against a window whose ends may be missing.
///
/// Returns `None` ("cannot classify") if either end is missing.
#[must_use]
pub fn classify(
    today: CalendarDate,
    start: Option<CalendarDate>,
    end: Option<CalendarDate>,
) -> Option<WindowPosition> {
    DateWindow::from_parts(start, end).map(|window| window.position(today))
}

/// Classifies `today` against a window given as raw strings.
///
/// Malformed strings are treated as missing.
#[must_use]
pub fn classify_str(today: CalendarDate, start: &str, end: &str) -> Option<WindowPosition> {
    classify(
        today,
        CalendarDate::parse(start).ok(),
        CalendarDate::parse(end).ok(),
    )
}
