use std::{fmt, str::FromStr, sync::LazyLock};

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{
    domain::BlockPath,
    hierarchy::UnknownHierarchyKey,
    window::{CalendarDate, DateWindow},
};

/// Opaque, stable identifier of an allocation.
///
/// The backend decides the format. Selection and bulk actions key on this
/// value, so it must never be derived from mutable fields.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AllocationId(String);

impl AllocationId {
    /// Wraps a backend identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AllocationId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AllocationId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for AllocationId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Gender recorded for a guest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gender {
    /// Male guest.
    Male,
    /// Female guest.
    Female,
    /// Any other gender.
    Other,
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            Self::Male => "Male",
            Self::Female => "Female",
            Self::Other => "Other",
        })
    }
}

/// Error returned when a gender label is not recognised.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("unknown gender '{0}': expected Male, Female or Other")]
pub struct UnknownGender(String);

impl FromStr for Gender {
    type Err = UnknownGender;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "male" | "m" => Ok(Self::Male),
            "female" | "f" => Ok(Self::Female),
            "other" | "o" => Ok(Self::Other),
            _ => Err(UnknownGender(s.to_string())),
        }
    }
}

/// Lifecycle state of an allocation as reported by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AllocationStatus {
    /// Held for a guest until confirmed or until the reservation lapses.
    Reserved,
    /// Confirmed by an administrator.
    Confirmed,
    /// Cancelled by the backend.
    Cancelled,
    /// A status string this crate does not know. Resolved through the date
    /// window like any other non-reserved state.
    Unrecognised,
}

impl AllocationStatus {
    /// Parses a backend status label. Unknown labels map to
    /// [`AllocationStatus::Unrecognised`].
    #[must_use]
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "reserved" => Self::Reserved,
            "confirmed" => Self::Confirmed,
            "cancelled" | "canceled" => Self::Cancelled,
            _ => Self::Unrecognised,
        }
    }
}

impl fmt::Display for AllocationStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            Self::Reserved => "reserved",
            Self::Confirmed => "confirmed",
            Self::Cancelled => "cancelled",
            Self::Unrecognised => "unrecognised",
        })
    }
}

/// The `reservedExpiresAt` attribute of an allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReservationExpiry {
    /// No expiry was recorded. The reservation is held indefinitely.
    ///
    /// This mirrors the backend's null convention and awaits product
    /// confirmation; it is preserved as-is.
    #[default]
    Never,
    /// The reservation lapses at this instant.
    At(DateTime<Utc>),
    /// An expiry was sent but could not be parsed.
    Malformed,
}

impl ReservationExpiry {
    /// Returns the expiry instant, if one was recorded and readable.
    #[must_use]
    pub const fn instant(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::At(instant) => Some(*instant),
            Self::Never | Self::Malformed => None,
        }
    }
}

impl From<Option<DateTime<Utc>>> for ReservationExpiry {
    fn from(value: Option<DateTime<Utc>>) -> Self {
        value.map_or(Self::Never, Self::At)
    }
}

static PHONE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{10}$").expect("phone pattern is valid"));

/// A contact phone number.
///
/// Numbers are stored as received (trimmed). Use [`Phone::is_well_formed`]
/// to check the ten-digit rule before submitting a request.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Phone(String);

impl Phone {
    /// Wraps a phone number, trimming surrounding whitespace.
    #[must_use]
    pub fn new(number: impl AsRef<str>) -> Self {
        Self(number.as_ref().trim().to_string())
    }

    /// Returns the number as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether no number was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether the number is exactly ten ASCII digits.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        PHONE_PATTERN.is_match(&self.0)
    }
}

impl fmt::Display for Phone {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where an allocation sits in the Location → Tent → Block → Bed hierarchy.
///
/// Every coordinate is optional because backend records are not guaranteed
/// to carry all of them. Missing values are kept as `None` rather than being
/// defaulted, so that incomplete records can be reported instead of being
/// merged into the wrong node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Placement {
    /// Identifier of the location.
    pub location_id: Option<String>,
    /// Index of the tent within its location.
    pub tent_index: Option<u32>,
    /// Index of the block within its tent.
    pub block_index: Option<u32>,
    /// Bed number within the block, starting at 1.
    pub bed_number: Option<u32>,
}

impl Placement {
    /// A fully specified placement.
    #[must_use]
    pub fn new(
        location_id: impl Into<String>,
        tent_index: u32,
        block_index: u32,
        bed_number: u32,
    ) -> Self {
        Self {
            location_id: Some(location_id.into()),
            tent_index: Some(tent_index),
            block_index: Some(block_index),
            bed_number: Some(bed_number),
        }
    }

    /// Returns the path of the block this placement belongs to.
    ///
    /// # Errors
    ///
    /// Returns [`UnknownHierarchyKey`] naming the first missing coordinate.
    pub fn path(&self) -> Result<BlockPath, UnknownHierarchyKey> {
        let location_id = self
            .location_id
            .clone()
            .ok_or(UnknownHierarchyKey::Location)?;
        let tent_index = self.tent_index.ok_or(UnknownHierarchyKey::Tent)?;
        let block_index = self.block_index.ok_or(UnknownHierarchyKey::Block)?;

        Ok(BlockPath {
            location_id,
            tent_index,
            block_index,
        })
    }
}

/// A guest's claim on a bed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Allocation {
    /// Stable identifier used for selection.
    pub id: AllocationId,
    /// Guest name.
    pub name: String,
    /// Guest phone number.
    pub phone: Phone,
    /// Optional emergency contact number.
    pub emergency_phone: Option<Phone>,
    /// Guest gender, if recorded.
    pub gender: Option<Gender>,
    /// First night of the stay, if readable.
    pub start_date: Option<CalendarDate>,
    /// Last night of the stay, if readable.
    pub end_date: Option<CalendarDate>,
    /// Lifecycle state.
    pub status: AllocationStatus,
    /// When an unconfirmed reservation lapses.
    pub reserved_expires_at: ReservationExpiry,
    /// Grouping key shared by allocations made in one reservation.
    pub batch_id: Option<String>,
    /// Name of the person who made the reservation.
    pub contact_name: Option<String>,
    /// Position in the bed hierarchy.
    pub placement: Placement,
}

impl Allocation {
    /// Creates a confirmed allocation with no dates or contact details.
    ///
    /// Callers fill in the remaining fields directly.
    #[must_use]
    pub fn new(id: impl Into<AllocationId>, placement: Placement) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            phone: Phone::default(),
            emergency_phone: None,
            gender: None,
            start_date: None,
            end_date: None,
            status: AllocationStatus::Confirmed,
            reserved_expires_at: ReservationExpiry::Never,
            batch_id: None,
            contact_name: None,
            placement,
        }
    }

    /// The stay window, if both ends are readable.
    #[must_use]
    pub fn window(&self) -> Option<DateWindow> {
        DateWindow::from_parts(self.start_date, self.end_date)
    }

    /// The bed number, if known.
    #[must_use]
    pub const fn bed_number(&self) -> Option<u32> {
        self.placement.bed_number
    }

    /// Whether the backend reports this allocation as a reservation.
    #[must_use]
    pub fn is_reserved(&self) -> bool {
        self.status == AllocationStatus::Reserved
    }
}
