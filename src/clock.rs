//! Injected time.
//!
//! Nothing in this crate reads the wall clock on its own. Callers capture a
//! [`Moment`] from a [`Clock`] once per render cycle and pass it to every
//! resolver call, so a whole snapshot is judged against the same instant.

use chrono::{DateTime, Datelike, FixedOffset, Utc};

use crate::window::CalendarDate;

/// A source of the current instant.
pub trait Clock {
    /// The current instant.
    fn now(&self) -> DateTime<Utc>;
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }
}

/// The system wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock frozen at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

const DEFAULT_OFFSET_SECONDS: i32 = 5 * 3600 + 30 * 60;

/// The reference offset used when none is configured: UTC+05:30.
///
/// # Panics
///
/// Never; the offset is a constant well within a day.
#[must_use]
pub fn default_zone() -> FixedOffset {
    FixedOffset::east_opt(DEFAULT_OFFSET_SECONDS).expect("offset is within a day")
}

/// An instant together with the calendar day it falls on in the reference
/// zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Moment {
    now: DateTime<Utc>,
    today: CalendarDate,
}

impl Moment {
    /// Reads `clock` once and derives today's date in `zone`.
    #[must_use]
    pub fn capture(clock: &impl Clock, zone: FixedOffset) -> Self {
        Self::at(clock.now(), zone)
    }

    /// Derives today's date for a given instant in `zone`.
    #[must_use]
    pub fn at(now: DateTime<Utc>, zone: FixedOffset) -> Self {
        let local = now.with_timezone(&zone).date_naive();
        let today = CalendarDate::from_naive(local).unwrap_or(if local.year() < 1 {
            CalendarDate::EARLIEST
        } else {
            CalendarDate::LATEST
        });
        Self { now, today }
    }

    /// Builds a moment from explicit parts. Useful when "today" is decided
    /// elsewhere.
    #[must_use]
    pub const fn from_parts(now: DateTime<Utc>, today: CalendarDate) -> Self {
        Self { now, today }
    }

    /// The captured instant.
    #[must_use]
    pub const fn now(&self) -> DateTime<Utc> {
        self.now
    }

    /// The calendar day of the captured instant in the reference zone.
    #[must_use]
    pub const fn today(&self) -> CalendarDate {
        self.today
    }
}
