//! Domain models for bed allocation.
//!
//! This module contains the canonical record shapes every other component
//! works on: allocations, their placement in the hierarchy, blocks, and the
//! configuration.

/// Allocation records and their attributes.
pub mod allocation;
pub use allocation::{
    Allocation, AllocationId, AllocationStatus, Gender, Phone, Placement, ReservationExpiry,
    UnknownGender,
};

/// Block metadata owned by the backend.
pub mod block;
pub use block::{Block, BlockPath, GenderRestriction};

mod config;
pub use config::Config;
