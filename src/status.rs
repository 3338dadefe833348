//! Bed state resolution.
//!
//! A bed's state is a function of its allocation (if any) and the current
//! [`Moment`]. The rules apply in order:
//!
//! 1. No allocation: [`BedStatus::Available`].
//! 2. A reservation is held while its expiry lies in the future, or forever
//!    if it has no expiry. Once the expiry passes the bed is available again,
//!    whatever the stay window says.
//! 3. Anything else is placed by its stay window: inside it is
//!    [`BedStatus::Current`], before it is [`BedStatus::Future`], after it (or
//!    with unreadable dates) is [`BedStatus::Available`].
//!
//! Resolution never fails. Unreadable data resolves to available so that a
//! bad record never blocks a bed that looks free.

use std::{fmt, iter::Sum, ops::Add};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{
    clock::Moment,
    domain::{Allocation, ReservationExpiry},
    window::WindowPosition,
};

/// The state of one bed at one moment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BedStatus {
    /// Free to allocate.
    Available,
    /// Held by an unconfirmed reservation.
    Reserved,
    /// Occupied today.
    Current,
    /// Booked for a stay that has not started.
    Future,
}

impl BedStatus {
    /// Every status, in display order.
    pub const ALL: [Self; 4] = [Self::Available, Self::Reserved, Self::Current, Self::Future];

    /// Whether the bed can be allocated.
    #[must_use]
    pub const fn is_available(self) -> bool {
        matches!(self, Self::Available)
    }

    /// How strongly this status claims a bed when several allocations name
    /// the same one. Higher wins.
    #[must_use]
    pub const fn precedence(self) -> u8 {
        match self {
            Self::Available => 0,
            Self::Future => 1,
            Self::Reserved => 2,
            Self::Current => 3,
        }
    }
}

impl fmt::Display for BedStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            Self::Available => "available",
            Self::Reserved => "reserved",
            Self::Current => "current",
            Self::Future => "future",
        })
    }
}

/// Which rule decided a bed's status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// The bed has no allocation.
    NoAllocation,
    /// A reservation with no expiry. Held indefinitely.
    ReservationOpen,
    /// A reservation that has not yet expired.
    ReservationHeld {
        /// When the reservation lapses.
        expires_at: DateTime<Utc>,
    },
    /// A reservation whose expiry has passed.
    ReservationExpired {
        /// When the reservation lapsed.
        expired_at: DateTime<Utc>,
    },
    /// A reservation whose expiry could not be read.
    ExpiryUnreadable,
    /// Today falls inside the stay window.
    InWindow,
    /// Today is before the stay window.
    BeforeWindow,
    /// Today is after the stay window.
    AfterWindow,
    /// The stay window is missing or unreadable.
    WindowUnreadable,
}

impl Resolution {
    /// The status this rule yields.
    #[must_use]
    pub const fn status(self) -> BedStatus {
        match self {
            Self::ReservationOpen | Self::ReservationHeld { .. } => BedStatus::Reserved,
            Self::InWindow => BedStatus::Current,
            Self::BeforeWindow => BedStatus::Future,
            Self::NoAllocation
            | Self::ReservationExpired { .. }
            | Self::ExpiryUnreadable
            | Self::AfterWindow
            | Self::WindowUnreadable => BedStatus::Available,
        }
    }
}

/// Works out which rule applies to `allocation` at `moment`.
#[must_use]
pub fn explain(allocation: Option<&Allocation>, moment: &Moment) -> Resolution {
    let Some(allocation) = allocation else {
        return Resolution::NoAllocation;
    };

    if allocation.is_reserved() {
        return match allocation.reserved_expires_at {
            ReservationExpiry::Never => Resolution::ReservationOpen,
            ReservationExpiry::At(expires_at) if moment.now() < expires_at => {
                Resolution::ReservationHeld { expires_at }
            }
            ReservationExpiry::At(expired_at) => Resolution::ReservationExpired { expired_at },
            ReservationExpiry::Malformed => {
                tracing::trace!(id = %allocation.id, "unreadable reservation expiry");
                Resolution::ExpiryUnreadable
            }
        };
    }

    match allocation.window().map(|window| window.position(moment.today())) {
        Some(WindowPosition::Within) => Resolution::InWindow,
        Some(WindowPosition::Before) => Resolution::BeforeWindow,
        Some(WindowPosition::After) => Resolution::AfterWindow,
        None => {
            tracing::trace!(id = %allocation.id, "missing or unreadable stay window");
            Resolution::WindowUnreadable
        }
    }
}

/// Resolves the status of a bed holding `allocation` at `moment`.
#[must_use]
pub fn resolve(allocation: Option<&Allocation>, moment: &Moment) -> BedStatus {
    explain(allocation, moment).status()
}

/// Per-status tallies for a group of beds or allocations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct StatusCounts {
    /// Beds free to allocate.
    pub available: usize,
    /// Beds held by live reservations.
    pub reserved: usize,
    /// Beds occupied today.
    pub current: usize,
    /// Beds booked for later.
    pub future: usize,
}

impl StatusCounts {
    /// Tallies the statuses of `allocations` at `moment`.
    #[must_use]
    pub fn of<'a>(allocations: impl IntoIterator<Item = &'a Allocation>, moment: &Moment) -> Self {
        allocations
            .into_iter()
            .map(|allocation| resolve(Some(allocation), moment))
            .collect()
    }

    /// Adds one bed with the given status.
    pub const fn record(&mut self, status: BedStatus) {
        match status {
            BedStatus::Available => self.available += 1,
            BedStatus::Reserved => self.reserved += 1,
            BedStatus::Current => self.current += 1,
            BedStatus::Future => self.future += 1,
        }
    }

    /// The tally for one status.
    #[must_use]
    pub const fn get(&self, status: BedStatus) -> usize {
        match status {
            BedStatus::Available => self.available,
            BedStatus::Reserved => self.reserved,
            BedStatus::Current => self.current,
            BedStatus::Future => self.future,
        }
    }

    /// Beds that are not available.
    #[must_use]
    pub const fn occupied(&self) -> usize {
        self.reserved + self.current + self.future
    }

    /// All beds counted.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.available + self.occupied()
    }
}

impl FromIterator<BedStatus> for StatusCounts {
    fn from_iter<I: IntoIterator<Item = BedStatus>>(iter: I) -> Self {
        let mut counts = Self::default();
        for status in iter {
            counts.record(status);
        }
        counts
    }
}

impl Add for StatusCounts {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            available: self.available + rhs.available,
            reserved: self.reserved + rhs.reserved,
            current: self.current + rhs.current,
            future: self.future + rhs.future,
        }
    }
}

impl Sum for StatusCounts {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};
    use test_case::test_case;

    use super::*;
    use crate::{
        domain::AllocationStatus,
        fixtures::{confirmed, moment_on, reserved},
    };

    #[test]
    fn empty_bed_is_available() {
        let moment = moment_on("2025-11-07");
        assert_eq!(explain(None, &moment), Resolution::NoAllocation);
        assert_eq!(resolve(None, &moment), BedStatus::Available);
    }

    #[test_case("2025-11-07", BedStatus::Current; "inside the stay")]
    #[test_case("2025-11-05", BedStatus::Current; "check-in day")]
    #[test_case("2025-11-10", BedStatus::Current; "check-out day")]
    #[test_case("2025-11-01", BedStatus::Future; "before the stay")]
    #[test_case("2025-11-12", BedStatus::Available; "after the stay")]
    fn confirmed_stays_follow_their_window(today: &str, expected: BedStatus) {
        let allocation = confirmed("a1", "2025-11-05", "2025-11-10");
        assert_eq!(resolve(Some(&allocation), &moment_on(today)), expected);
    }

    #[test_case("2025-11-07"; "today inside the window")]
    #[test_case("2025-11-01"; "today before the window")]
    #[test_case("2025-11-12"; "today after the window")]
    fn expired_reservation_is_available_whatever_the_window(today: &str) {
        let moment = moment_on(today);
        let mut allocation = reserved("a1", "2025-11-05", "2025-11-10");
        allocation.reserved_expires_at =
            ReservationExpiry::At(moment.now() - Duration::seconds(1));

        assert!(matches!(
            explain(Some(&allocation), &moment),
            Resolution::ReservationExpired { .. }
        ));
        assert_eq!(resolve(Some(&allocation), &moment), BedStatus::Available);
    }

    #[test]
    fn reservation_expiring_exactly_now_is_available() {
        let moment = moment_on("2025-11-07");
        let mut allocation = reserved("a1", "2025-11-05", "2025-11-10");
        allocation.reserved_expires_at = ReservationExpiry::At(moment.now());

        assert_eq!(resolve(Some(&allocation), &moment), BedStatus::Available);
    }

    #[test]
    fn live_reservation_is_reserved() {
        let moment = moment_on("2025-11-07");
        let expires_at = moment.now() + Duration::minutes(30);
        let mut allocation = reserved("a1", "2025-11-05", "2025-11-10");
        allocation.reserved_expires_at = ReservationExpiry::At(expires_at);

        assert_eq!(
            explain(Some(&allocation), &moment),
            Resolution::ReservationHeld { expires_at }
        );
    }

    #[test]
    fn reservation_without_expiry_is_held_even_after_its_window() {
        let allocation = reserved("a1", "2025-11-05", "2025-11-10");
        assert_eq!(allocation.reserved_expires_at, ReservationExpiry::Never);

        let moment = moment_on("2025-12-25");
        assert_eq!(explain(Some(&allocation), &moment), Resolution::ReservationOpen);
        assert_eq!(resolve(Some(&allocation), &moment), BedStatus::Reserved);
    }

    #[test]
    fn unreadable_data_fails_open() {
        let moment = moment_on("2025-11-07");

        let mut bad_expiry = reserved("a1", "2025-11-05", "2025-11-10");
        bad_expiry.reserved_expires_at = ReservationExpiry::Malformed;
        assert_eq!(explain(Some(&bad_expiry), &moment), Resolution::ExpiryUnreadable);

        let mut no_dates = confirmed("a2", "2025-11-05", "2025-11-10");
        no_dates.end_date = None;
        assert_eq!(explain(Some(&no_dates), &moment), Resolution::WindowUnreadable);

        assert_eq!(resolve(Some(&bad_expiry), &moment), BedStatus::Available);
        assert_eq!(resolve(Some(&no_dates), &moment), BedStatus::Available);
    }

    #[test]
    fn non_reserved_states_use_the_window() {
        let moment = moment_on("2025-11-07");
        let mut allocation = confirmed("a1", "2025-11-05", "2025-11-10");

        allocation.status = AllocationStatus::Unrecognised;
        assert_eq!(resolve(Some(&allocation), &moment), BedStatus::Current);

        // Expiry is ignored once the allocation is no longer a reservation.
        allocation.status = AllocationStatus::Confirmed;
        allocation.reserved_expires_at =
            ReservationExpiry::At(Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap());
        assert_eq!(resolve(Some(&allocation), &moment), BedStatus::Current);
    }

    #[test]
    fn every_non_available_status_traces_to_an_allocation() {
        let moment = moment_on("2025-11-07");
        for resolution in [
            Resolution::ReservationOpen,
            Resolution::ReservationHeld {
                expires_at: moment.now(),
            },
            Resolution::InWindow,
            Resolution::BeforeWindow,
        ] {
            assert!(!resolution.status().is_available());
            assert_ne!(resolution, Resolution::NoAllocation);
        }
        assert!(Resolution::NoAllocation.status().is_available());
    }

    #[test]
    fn counts_tally_and_sum() {
        let moment = moment_on("2025-11-07");
        let allocations = [
            confirmed("a1", "2025-11-05", "2025-11-10"),
            confirmed("a2", "2025-11-08", "2025-11-10"),
            confirmed("a3", "2025-11-01", "2025-11-02"),
            reserved("a4", "2025-11-05", "2025-11-10"),
        ];

        let counts = StatusCounts::of(&allocations, &moment);
        assert_eq!(
            counts,
            StatusCounts {
                available: 1,
                reserved: 1,
                current: 1,
                future: 1,
            }
        );
        assert_eq!(counts.occupied(), 3);
        assert_eq!(counts.total(), 4);
        assert_eq!(counts.get(BedStatus::Future), 1);

        let doubled: StatusCounts = [counts, counts].into_iter().sum();
        assert_eq!(doubled.total(), 8);
    }
}
