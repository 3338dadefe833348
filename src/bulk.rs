//! Bulk confirm, edit, and deallocate.
//!
//! A [`BulkPlan`] resolves a selection against the snapshot it was made
//! from, then issues one backend call per allocation. Failures are logged
//! and collected; they never stop the remaining calls.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::{
    batch::Batch,
    domain::{Allocation, AllocationId},
    selection::SelectionSet,
    snapshot::Snapshot,
    window::{CalendarDate, DateWindow},
};

/// Why a guest's allocation is being removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeallocationReason {
    /// The guest left before their stay ended.
    LeftEarly,
    /// The guest never arrived.
    NoShow,
    /// The allocation was made in error.
    BookingError,
    /// No reason was given.
    #[default]
    NotSpecified,
}

impl fmt::Display for DeallocationReason {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            Self::LeftEarly => "left_early",
            Self::NoShow => "no_show",
            Self::BookingError => "booking_error",
            Self::NotSpecified => "not_specified",
        })
    }
}

/// Fields to change on each selected allocation. `None` leaves a field as
/// it is.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AllocationEdit {
    /// New first day.
    pub start_date: Option<CalendarDate>,
    /// New last day.
    pub end_date: Option<CalendarDate>,
    /// New contact name.
    pub contact_name: Option<String>,
}

impl AllocationEdit {
    /// Whether the edit changes nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.start_date.is_none() && self.end_date.is_none() && self.contact_name.is_none()
    }

    /// The stay `allocation` would have after the edit.
    #[must_use]
    pub fn window_for(&self, allocation: &Allocation) -> Option<DateWindow> {
        DateWindow::from_parts(
            self.start_date.or(allocation.start_date),
            self.end_date.or(allocation.end_date),
        )
    }
}

/// An action applied to every selected allocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BulkAction {
    /// Turn reservations into confirmed allocations.
    Confirm,
    /// Change dates or contact details.
    Edit(AllocationEdit),
    /// Remove allocations.
    Deallocate(DeallocationReason),
}

impl fmt::Display for BulkAction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Confirm => f.write_str("confirm"),
            Self::Edit(_) => f.write_str("edit"),
            Self::Deallocate(reason) => write!(f, "deallocate ({reason})"),
        }
    }
}

/// Why a selected id was left out of a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The id is not in the snapshot.
    NotInSnapshot,
    /// Only reservations can be confirmed.
    NotReserved,
    /// The edit would leave the stay ending before it starts.
    InvertedDates,
}

/// The writes a bulk action will make.
#[derive(Debug, Clone)]
pub struct BulkPlan {
    action: BulkAction,
    targets: Vec<AllocationId>,
    skipped: Vec<(AllocationId, SkipReason)>,
}

impl BulkPlan {
    /// Resolves `selection` against `snapshot`.
    #[must_use]
    #[instrument(level = "debug", skip(selection, snapshot), fields(selected = selection.len()))]
    pub fn prepare(action: BulkAction, selection: &SelectionSet, snapshot: &Snapshot) -> Self {
        let mut targets = Vec::new();
        let mut skipped = Vec::new();

        for id in selection.iter() {
            match Self::check(&action, snapshot.find(id)) {
                Ok(()) => targets.push(id.clone()),
                Err(reason) => {
                    tracing::debug!(%id, ?reason, "skipping selected allocation");
                    skipped.push((id.clone(), reason));
                }
            }
        }

        Self {
            action,
            targets,
            skipped,
        }
    }

    fn check(action: &BulkAction, allocation: Option<&Allocation>) -> Result<(), SkipReason> {
        let allocation = allocation.ok_or(SkipReason::NotInSnapshot)?;
        match action {
            BulkAction::Confirm if !allocation.is_reserved() => Err(SkipReason::NotReserved),
            BulkAction::Edit(edit) if edit.window_for(allocation).is_some_and(|w| w.is_inverted()) => {
                Err(SkipReason::InvertedDates)
            }
            _ => Ok(()),
        }
    }

    /// Confirms every allocation in `batch`.
    #[must_use]
    pub fn for_batch(batch: &Batch<'_>) -> Self {
        Self {
            action: BulkAction::Confirm,
            targets: batch.ids().cloned().collect(),
            skipped: Vec::new(),
        }
    }

    /// The action to apply.
    #[must_use]
    pub const fn action(&self) -> &BulkAction {
        &self.action
    }

    /// Ids the action will be applied to.
    #[must_use]
    pub fn targets(&self) -> &[AllocationId] {
        &self.targets
    }

    /// Selected ids left out, and why.
    #[must_use]
    pub fn skipped(&self) -> &[(AllocationId, SkipReason)] {
        &self.skipped
    }

    /// Issues one backend call per target.
    #[instrument(skip_all, fields(action = %self.action, targets = self.targets.len()))]
    pub fn execute<B: AllocationBackend>(&self, backend: &mut B) -> BulkOutcome {
        let mut outcome = BulkOutcome::default();

        for id in &self.targets {
            let result = match &self.action {
                BulkAction::Confirm => backend.confirm(id),
                BulkAction::Edit(edit) => backend.edit(id, edit),
                BulkAction::Deallocate(reason) => backend.deallocate(id, *reason),
            };

            match result {
                Ok(()) => outcome.succeeded.push(id.clone()),
                Err(e) => {
                    tracing::warn!(%id, error = %e, "bulk {} failed", self.action);
                    outcome.failed.push((id.clone(), e.to_string()));
                }
            }
        }

        tracing::info!(
            succeeded = outcome.succeeded.len(),
            failed = outcome.failed.len(),
            "bulk {} finished",
            self.action
        );
        outcome
    }
}

/// The writes a bulk action needs from the allocation backend.
pub trait AllocationBackend {
    /// A failed write.
    type Error: fmt::Display;

    /// Confirms a reservation.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend refuses or cannot be reached.
    fn confirm(&mut self, id: &AllocationId) -> Result<(), Self::Error>;

    /// Applies an edit.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend refuses or cannot be reached.
    fn edit(&mut self, id: &AllocationId, edit: &AllocationEdit) -> Result<(), Self::Error>;

    /// Removes an allocation.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend refuses or cannot be reached.
    fn deallocate(
        &mut self,
        id: &AllocationId,
        reason: DeallocationReason,
    ) -> Result<(), Self::Error>;
}

/// What a bulk action achieved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkOutcome {
    /// Ids the backend accepted.
    pub succeeded: Vec<AllocationId>,
    /// Ids the backend rejected, with its message.
    pub failed: Vec<(AllocationId, String)>,
}

impl BulkOutcome {
    /// Every id a call was made for.
    pub fn attempted(&self) -> impl Iterator<Item = &AllocationId> {
        self.succeeded
            .iter()
            .chain(self.failed.iter().map(|(id, _)| id))
    }

    /// Whether every call succeeded.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}
