//! Normalization of backend payloads into canonical records.
//!
//! Different backend endpoints spell the same field differently
//! (`tentIndex` or `tent_index`) and send numbers either as numbers or as
//! strings. This module is the only place that knows about that. Everything
//! past it works with [`Allocation`] and [`Block`].
//!
//! Normalization is lenient. A value that cannot be read becomes `None`
//! (or [`ReservationExpiry::Malformed`]) and the record is kept; only a
//! record with no id is dropped, since nothing could select it.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::instrument;

use crate::{
    domain::{
        Allocation, AllocationStatus, Block, BlockPath, Gender, GenderRestriction, Phone,
        Placement, ReservationExpiry,
    },
    snapshot::Snapshot,
    window::CalendarDate,
};

/// A payload could not be read at all.
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    /// The payload is not JSON of a recognised shape.
    #[error("malformed allocation payload: {0}")]
    Json(#[from] serde_json::Error),
}

/// A JSON value sent as either a number or a string.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
enum Scalar {
    Int(i64),
    Float(f64),
    Text(String),
}

impl Scalar {
    fn into_text(self) -> Option<String> {
        let text = match self {
            Self::Int(n) => n.to_string(),
            Self::Float(n) if n.fract() == 0.0 && n.abs() < 1e15 => format!("{n:.0}"),
            Self::Float(n) => n.to_string(),
            Self::Text(text) => text.trim().to_string(),
        };
        (!text.is_empty()).then_some(text)
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn to_index(&self) -> Option<u32> {
        match self {
            Self::Int(n) => u32::try_from(*n).ok(),
            Self::Float(n) if n.fract() == 0.0 && (0.0..=f64::from(u32::MAX)).contains(n) => {
                Some(*n as u32)
            }
            Self::Float(_) => None,
            Self::Text(text) => text.trim().parse().ok(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WireAllocation {
    #[serde(alias = "_id", alias = "allocationId", alias = "allocation_id")]
    id: Option<Scalar>,
    #[serde(alias = "guestName", alias = "guest_name")]
    name: Option<String>,
    phone: Option<Scalar>,
    #[serde(rename = "emergencyPhone", alias = "emergency_phone")]
    emergency_phone: Option<Scalar>,
    gender: Option<String>,
    #[serde(rename = "startDate", alias = "start_date")]
    start_date: Option<String>,
    #[serde(rename = "endDate", alias = "end_date")]
    end_date: Option<String>,
    status: Option<String>,
    #[serde(rename = "reservedExpiresAt", alias = "reserved_expires_at")]
    reserved_expires_at: Option<Scalar>,
    #[serde(rename = "batchId", alias = "batch_id")]
    batch_id: Option<Scalar>,
    #[serde(rename = "contactName", alias = "contact_name")]
    contact_name: Option<String>,
    #[serde(rename = "locationId", alias = "location_id")]
    location_id: Option<Scalar>,
    #[serde(rename = "tentIndex", alias = "tent_index")]
    tent_index: Option<Scalar>,
    #[serde(rename = "blockIndex", alias = "block_index")]
    block_index: Option<Scalar>,
    #[serde(rename = "bedNumber", alias = "bed_number")]
    bed_number: Option<Scalar>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WireBlock {
    #[serde(rename = "locationId", alias = "location_id")]
    location_id: Option<Scalar>,
    #[serde(rename = "tentIndex", alias = "tent_index")]
    tent_index: Option<Scalar>,
    #[serde(rename = "blockIndex", alias = "block_index")]
    block_index: Option<Scalar>,
    #[serde(alias = "capacity", alias = "bedCount", alias = "bed_count")]
    size: Option<Scalar>,
    #[serde(rename = "genderRestriction", alias = "gender_restriction")]
    gender_restriction: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Document {
    Bare(Vec<WireAllocation>),
    Full {
        allocations: Vec<WireAllocation>,
        #[serde(default)]
        blocks: Vec<WireBlock>,
    },
}

fn index(field: &'static str, value: Option<&Scalar>) -> Option<u32> {
    let value = value?;
    let index = value.to_index();
    if index.is_none() {
        tracing::debug!(field, ?value, "unreadable index");
    }
    index
}

fn text(value: Option<String>) -> Option<String> {
    value
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}

fn date(field: &'static str, value: Option<&str>) -> Option<CalendarDate> {
    let value = value.map(str::trim).filter(|value| !value.is_empty())?;
    CalendarDate::parse(value)
        .inspect_err(|e| tracing::debug!(field, error = %e, "unreadable date"))
        .ok()
}

fn expiry(value: Option<Scalar>) -> ReservationExpiry {
    let instant = match value {
        None => return ReservationExpiry::Never,
        Some(Scalar::Int(millis)) => DateTime::from_timestamp_millis(millis),
        Some(Scalar::Text(text)) if text.trim().is_empty() => return ReservationExpiry::Never,
        Some(Scalar::Text(text)) => DateTime::parse_from_rfc3339(text.trim())
            .ok()
            .map(|instant| instant.with_timezone(&Utc)),
        Some(Scalar::Float(_)) => None,
    };

    instant.map_or_else(
        || {
            tracing::debug!("unreadable reservation expiry");
            ReservationExpiry::Malformed
        },
        ReservationExpiry::At,
    )
}

impl WireAllocation {
    fn normalize(self) -> Option<Allocation> {
        let Some(id) = self.id.and_then(Scalar::into_text) else {
            tracing::warn!("dropping allocation without an id");
            return None;
        };

        let placement = Placement {
            location_id: self.location_id.and_then(Scalar::into_text),
            tent_index: index("tentIndex", self.tent_index.as_ref()),
            block_index: index("blockIndex", self.block_index.as_ref()),
            bed_number: index("bedNumber", self.bed_number.as_ref()),
        };

        let gender = text(self.gender).and_then(|label| {
            label
                .parse::<Gender>()
                .inspect_err(|e| tracing::debug!(%id, error = %e, "unreadable gender"))
                .ok()
        });

        let mut allocation = Allocation::new(id, placement);
        allocation.name = text(self.name).unwrap_or_default();
        allocation.phone = self
            .phone
            .and_then(Scalar::into_text)
            .map(Phone::new)
            .unwrap_or_default();
        allocation.emergency_phone = self
            .emergency_phone
            .and_then(Scalar::into_text)
            .map(Phone::new);
        allocation.gender = gender;
        allocation.start_date = date("startDate", self.start_date.as_deref());
        allocation.end_date = date("endDate", self.end_date.as_deref());
        allocation.status = AllocationStatus::from_label(self.status.as_deref().unwrap_or_default());
        allocation.reserved_expires_at = expiry(self.reserved_expires_at);
        allocation.batch_id = self.batch_id.and_then(Scalar::into_text);
        allocation.contact_name = text(self.contact_name);
        Some(allocation)
    }
}

impl WireBlock {
    fn normalize(self) -> Option<Block> {
        let location_id = self.location_id.and_then(Scalar::into_text);
        let tent_index = index("tentIndex", self.tent_index.as_ref());
        let block_index = index("blockIndex", self.block_index.as_ref());
        let (Some(location_id), Some(tent_index), Some(block_index)) =
            (location_id, tent_index, block_index)
        else {
            tracing::debug!("dropping block without a full path");
            return None;
        };

        let size = index("size", self.size.as_ref()).unwrap_or_default();
        let restriction = self
            .gender_restriction
            .as_deref()
            .map(GenderRestriction::from_label)
            .unwrap_or_default();

        Some(
            Block::new(BlockPath::new(location_id, tent_index, block_index), size)
                .with_restriction(restriction),
        )
    }
}

/// Reads a JSON array of allocation records.
///
/// # Errors
///
/// Returns an error if the payload is not a JSON array of objects.
#[instrument(level = "debug", skip_all, fields(bytes = json.len()))]
pub fn parse_allocations(json: &str) -> Result<Vec<Allocation>, WireError> {
    let records: Vec<WireAllocation> = serde_json::from_str(json)?;
    Ok(records
        .into_iter()
        .filter_map(WireAllocation::normalize)
        .collect())
}

/// Reads a snapshot document.
///
/// The document is either a bare array of allocation records or an object
/// with `allocations` and optional `blocks` arrays.
///
/// # Errors
///
/// Returns an error if the payload matches neither shape.
#[instrument(level = "debug", skip_all, fields(bytes = json.len()))]
pub fn parse_snapshot(json: &str, fetched_at: DateTime<Utc>) -> Result<Snapshot, WireError> {
    let (allocations, blocks) = match serde_json::from_str(json)? {
        Document::Bare(allocations) => (allocations, Vec::new()),
        Document::Full {
            allocations,
            blocks,
        } => (allocations, blocks),
    };

    let allocations: Vec<_> = allocations
        .into_iter()
        .filter_map(WireAllocation::normalize)
        .collect();
    let blocks: Vec<_> = blocks.into_iter().filter_map(WireBlock::normalize).collect();
    tracing::debug!(
        allocations = allocations.len(),
        blocks = blocks.len(),
        "parsed snapshot"
    );

    Ok(Snapshot::new(allocations, blocks, fetched_at))
}
