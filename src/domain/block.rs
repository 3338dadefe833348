use std::{fmt, ops::RangeInclusive};

use serde::{Deserialize, Serialize};

use crate::domain::Gender;

/// Identifies a block: the location, tent, and block coordinates of a bed
/// without the bed number.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BlockPath {
    /// Identifier of the location.
    pub location_id: String,
    /// Index of the tent within the location.
    pub tent_index: u32,
    /// Index of the block within the tent.
    pub block_index: u32,
}

impl BlockPath {
    /// Creates a block path.
    #[must_use]
    pub fn new(location_id: impl Into<String>, tent_index: u32, block_index: u32) -> Self {
        Self {
            location_id: location_id.into(),
            tent_index,
            block_index,
        }
    }
}

impl fmt::Display for BlockPath {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}/tent-{}/block-{}",
            self.location_id, self.tent_index, self.block_index
        )
    }
}

/// Which guests a block may hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenderRestriction {
    /// Any guest.
    #[default]
    Both,
    /// Male guests only.
    MaleOnly,
    /// Female guests only.
    FemaleOnly,
}

impl GenderRestriction {
    /// Parses a backend restriction label. Unknown labels are treated as
    /// unrestricted, leaving the final say to the backend.
    #[must_use]
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "male_only" | "male" => Self::MaleOnly,
            "female_only" | "female" => Self::FemaleOnly,
            _ => Self::Both,
        }
    }

    /// Whether a guest of the given gender may be placed under this
    /// restriction.
    #[must_use]
    pub const fn permits(self, gender: Gender) -> bool {
        match self {
            Self::Both => true,
            Self::MaleOnly => matches!(gender, Gender::Male),
            Self::FemaleOnly => matches!(gender, Gender::Female),
        }
    }
}

impl fmt::Display for GenderRestriction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            Self::Both => "both",
            Self::MaleOnly => "male_only",
            Self::FemaleOnly => "female_only",
        })
    }
}

/// Block metadata as published by the backend. Read-only here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// Where the block sits.
    pub path: BlockPath,
    /// Number of beds. Beds are numbered `1..=size`.
    pub size: u32,
    /// Which guests the block may hold.
    pub gender_restriction: GenderRestriction,
}

impl Block {
    /// Creates an unrestricted block.
    #[must_use]
    pub const fn new(path: BlockPath, size: u32) -> Self {
        Self {
            path,
            size,
            gender_restriction: GenderRestriction::Both,
        }
    }

    /// Returns the block with the given gender restriction.
    #[must_use]
    pub const fn with_restriction(mut self, restriction: GenderRestriction) -> Self {
        self.gender_restriction = restriction;
        self
    }

    /// Whether `bed_number` names a bed in this block.
    #[must_use]
    pub const fn contains_bed(&self, bed_number: u32) -> bool {
        bed_number >= 1 && bed_number <= self.size
    }

    /// Iterates over every bed number in the block.
    #[must_use]
    pub const fn bed_numbers(&self) -> RangeInclusive<u32> {
        1..=self.size
    }
}
