use std::path::Path;

use chrono::FixedOffset;
use serde::{Deserialize, Serialize};

/// Configuration for bed state resolution and presentation.
///
/// Loaded from a TOML file. Every field has a default, so an empty file
/// (apart from the version tag) is a valid configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Versions", into = "Versions")]
pub struct Config {
    /// Offset from UTC, in minutes, of the calendar that decides "today".
    ///
    /// Defaults to 330 (UTC+05:30). The offset is fixed; no daylight saving
    /// rules are applied.
    utc_offset_minutes: i32,

    /// Whether batch listings put the largest reservations first.
    ///
    /// When `false`, batches are listed in the order their first member
    /// appears in the snapshot.
    pub largest_batches_first: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            utc_offset_minutes: default_utc_offset_minutes(),
            largest_batches_first: true,
        }
    }
}

impl Config {
    /// Loads the configuration from a TOML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or if the TOML content is
    /// invalid.
    pub fn load(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file: {e}"))?;
        toml::from_str(&content).map_err(|e| format!("Failed to parse config file: {e}"))
    }

    /// Saves the configuration to a TOML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be serialized to TOML or if
    /// the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<(), String> {
        let content =
            toml::to_string_pretty(self).map_err(|e| format!("Failed to serialize config: {e}"))?;
        std::fs::write(path, content).map_err(|e| format!("Failed to write config file: {e}"))
    }

    /// Returns the configured offset from UTC in minutes.
    #[must_use]
    pub const fn utc_offset_minutes(&self) -> i32 {
        self.utc_offset_minutes
    }

    /// Sets the offset from UTC in minutes.
    pub const fn set_utc_offset_minutes(&mut self, minutes: i32) {
        self.utc_offset_minutes = minutes;
    }

    /// Returns the fixed offset used to decide "today".
    ///
    /// Returns `None` if the configured offset is a day or more away from UTC.
    #[must_use]
    pub fn zone(&self) -> Option<FixedOffset> {
        self.utc_offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
    }
}

const fn default_utc_offset_minutes() -> i32 {
    5 * 60 + 30
}

const fn default_largest_batches_first() -> bool {
    true
}

/// The serialized versions of the configuration.
/// This allows for future changes to the configuration format and to the domain
/// type without breaking compatibility.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "_version")]
enum Versions {
    #[serde(rename = "1")]
    V1 {
        /// Offset from UTC, in minutes, of the reference calendar.
        #[serde(default = "default_utc_offset_minutes")]
        utc_offset_minutes: i32,

        #[serde(default = "default_largest_batches_first")]
        largest_batches_first: bool,
    },
}

impl From<Versions> for super::Config {
    fn from(versions: Versions) -> Self {
        match versions {
            Versions::V1 {
                utc_offset_minutes,
                largest_batches_first,
            } => Self {
                utc_offset_minutes,
                largest_batches_first,
            },
        }
    }
}

impl From<super::Config> for Versions {
    fn from(config: super::Config) -> Self {
        Self::V1 {
            utc_offset_minutes: config.utc_offset_minutes,
            largest_batches_first: config.largest_batches_first,
        }
    }
}
