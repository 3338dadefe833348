//! Per-bed view of one block.
//!
//! The grid has exactly one cell per bed number in `1..=size`. A cell that
//! is not available always names the allocation that put it in that state;
//! an available cell never does.

use crate::{
    clock::Moment,
    domain::{Allocation, Block},
    status::{self, BedStatus, StatusCounts},
};

/// One bed in a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BedCell<'a> {
    /// The bed number.
    pub bed_number: u32,
    /// The bed's state.
    pub status: BedStatus,
    /// The allocation behind a non-available state.
    pub allocation: Option<&'a Allocation>,
}

/// The beds of one block at one moment.
#[derive(Debug, Clone)]
pub struct BedGrid<'a> {
    cells: Vec<BedCell<'a>>,
    strays: Vec<&'a Allocation>,
}

impl<'a> BedGrid<'a> {
    /// Lays `allocations` out over the beds of `block`.
    ///
    /// When several allocations name the same bed, the one with the most
    /// significant status wins (current, then reserved, then future); ties
    /// keep the earliest. Allocations with no bed number, or one outside the
    /// block, are kept aside as strays.
    pub fn build(
        block: &Block,
        allocations: impl IntoIterator<Item = &'a Allocation>,
        moment: &Moment,
    ) -> Self {
        let mut cells: Vec<BedCell<'a>> = block
            .bed_numbers()
            .map(|bed_number| BedCell {
                bed_number,
                status: BedStatus::Available,
                allocation: None,
            })
            .collect();
        let mut strays = Vec::new();

        for allocation in allocations {
            let Some(bed_number) = allocation.bed_number().filter(|n| block.contains_bed(*n))
            else {
                tracing::debug!(id = %allocation.id, block = %block.path, "allocation outside block");
                strays.push(allocation);
                continue;
            };

            let status = status::resolve(Some(allocation), moment);
            if status.is_available() {
                continue;
            }

            let Some(cell) = cells.iter_mut().find(|cell| cell.bed_number == bed_number) else {
                continue;
            };
            if status.precedence() > cell.status.precedence() {
                cell.status = status;
                cell.allocation = Some(allocation);
            }
        }

        Self { cells, strays }
    }

    /// Cells in bed order.
    #[must_use]
    pub fn cells(&self) -> &[BedCell<'a>] {
        &self.cells
    }

    /// The cell for `bed_number`, if it is in the block.
    #[must_use]
    pub fn cell(&self, bed_number: u32) -> Option<&BedCell<'a>> {
        let index = usize::try_from(bed_number.checked_sub(1)?).ok()?;
        self.cells.get(index)
    }

    /// Allocations that could not be placed on a bed.
    #[must_use]
    pub fn strays(&self) -> &[&'a Allocation] {
        &self.strays
    }

    /// Status tallies across every bed.
    #[must_use]
    pub fn counts(&self) -> StatusCounts {
        self.cells.iter().map(|cell| cell.status).collect()
    }

    /// Bed numbers that are free.
    pub fn available_beds(&self) -> impl Iterator<Item = u32> + '_ {
        self.cells
            .iter()
            .filter(|cell| cell.status.is_available())
            .map(|cell| cell.bed_number)
    }
}
