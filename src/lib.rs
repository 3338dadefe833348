//! Bed allocation state and hierarchy aggregation
//!
//! Guests sleep in beds nested as Location → Tent → Block → Bed. This crate
//! takes the flat allocation records an accommodation backend hands out and
//! answers the questions every admin screen asks of them: what state is each
//! bed in right now, how do the records roll up through the hierarchy, which
//! reservations travel together as a batch, and which beds a bulk action
//! should touch.
//!
//! Everything here is a pure function of its inputs and an injected
//! [`Moment`]. Reads and writes against the backend stay with the caller.

pub mod domain;
pub use domain::{
    Allocation, AllocationId, AllocationStatus, Block, BlockPath, Config, Gender,
    GenderRestriction, Phone, Placement, ReservationExpiry,
};

pub mod clock;
pub use clock::{Clock, FixedClock, Moment, SystemClock};

pub mod window;
pub use window::{CalendarDate, DateWindow, MalformedDate, WindowPosition};

pub mod status;
pub use status::{BedStatus, Resolution, StatusCounts};

pub mod hierarchy;
pub use hierarchy::{Hierarchy, UnknownHierarchyKey};

pub mod batch;
pub use batch::{Batch, BatchKey};

pub mod selection;
pub use selection::{Dismiss, GroupAction, GroupState, SelectionSet};

pub mod gender;
pub use gender::GenderViolation;

pub mod grid;
pub use grid::{BedCell, BedGrid};

pub mod request;
pub use request::{RequestError, ReservationRequest, ValidationErrors};

pub mod bulk;
pub use bulk::{
    AllocationBackend, AllocationEdit, BulkAction, BulkOutcome, BulkPlan, DeallocationReason,
    SkipReason,
};

pub mod snapshot;
pub use snapshot::{LastKnownGood, Snapshot, Views};

pub mod wire;
pub use wire::WireError;

#[cfg(test)]
pub(crate) mod fixtures;
