//! Immutable snapshots of fetched allocations.
//!
//! Views are always rebuilt from a whole snapshot, never patched in place.
//! After a write succeeds the caller refetches and swaps in the new
//! snapshot; after a write fails it keeps rendering the last good one.

use std::{collections::HashMap, sync::Arc};

use chrono::{DateTime, Utc};
use tracing::instrument;

use crate::{
    batch::{self, Batch},
    clock::Moment,
    domain::{Allocation, AllocationId, Block, BlockPath},
    grid::BedGrid,
    hierarchy::Hierarchy,
};

/// One fetch of allocations and block metadata.
#[derive(Debug, Clone)]
pub struct Snapshot {
    allocations: Vec<Allocation>,
    blocks: Vec<Block>,
    fetched_at: DateTime<Utc>,
    index: HashMap<AllocationId, usize>,
}

/// The views derived from one snapshot.
#[derive(Debug)]
pub struct Views<'a> {
    /// The location tree.
    pub hierarchy: Hierarchy<'a, Allocation>,
    /// Reservation batches.
    pub batches: Vec<Batch<'a>>,
}

impl Snapshot {
    /// Wraps a fetch result.
    ///
    /// If two allocations share an id, lookups by id find the first.
    #[must_use]
    pub fn new(allocations: Vec<Allocation>, blocks: Vec<Block>, fetched_at: DateTime<Utc>) -> Self {
        let mut index = HashMap::with_capacity(allocations.len());
        for (position, allocation) in allocations.iter().enumerate() {
            if index.contains_key(&allocation.id) {
                tracing::debug!(id = %allocation.id, "duplicate allocation id in snapshot");
            } else {
                index.insert(allocation.id.clone(), position);
            }
        }

        Self {
            allocations,
            blocks,
            fetched_at,
            index,
        }
    }

    /// Every allocation, in fetch order.
    #[must_use]
    pub fn allocations(&self) -> &[Allocation] {
        &self.allocations
    }

    /// Block metadata, in fetch order.
    #[must_use]
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// When the snapshot was fetched.
    #[must_use]
    pub const fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }

    /// Metadata for the block at `path`.
    #[must_use]
    pub fn block(&self, path: &BlockPath) -> Option<&Block> {
        self.blocks.iter().find(|block| &block.path == path)
    }

    /// The allocation with `id`.
    #[must_use]
    pub fn find(&self, id: &AllocationId) -> Option<&Allocation> {
        self.index.get(id).map(|&position| &self.allocations[position])
    }

    /// Allocations placed in the block at `path`.
    pub fn in_block<'a>(&'a self, path: &BlockPath) -> impl Iterator<Item = &'a Allocation> + use<'a> {
        let path = path.clone();
        self.allocations
            .iter()
            .filter(move |allocation| allocation.placement.path().is_ok_and(|p| p == path))
    }

    /// The location tree.
    #[must_use]
    pub fn hierarchy(&self) -> Hierarchy<'_, Allocation> {
        Hierarchy::build(&self.allocations)
    }

    /// Reservation batches, optionally largest first.
    #[must_use]
    pub fn batches(&self, largest_first: bool) -> Vec<Batch<'_>> {
        let mut batches = batch::group(&self.allocations);
        if largest_first {
            batch::sort_largest_first(&mut batches);
        }
        batches
    }

    /// Builds the tree and the batches side by side.
    #[must_use]
    #[instrument(level = "debug", skip(self), fields(allocations = self.allocations.len()))]
    pub fn views(&self, largest_first: bool) -> Views<'_> {
        let (hierarchy, batches) = rayon::join(|| self.hierarchy(), || self.batches(largest_first));
        Views { hierarchy, batches }
    }

    /// The bed grid for the block at `path`, if the block is known.
    #[must_use]
    pub fn grid(&self, path: &BlockPath, moment: &Moment) -> Option<BedGrid<'_>> {
        let block = self.block(path)?;
        Some(BedGrid::build(block, self.in_block(path), moment))
    }
}

/// The most recent snapshot known to be good.
#[derive(Debug, Clone)]
pub struct LastKnownGood {
    current: Arc<Snapshot>,
}

impl LastKnownGood {
    /// Starts from `snapshot`.
    #[must_use]
    pub fn new(snapshot: Snapshot) -> Self {
        Self {
            current: Arc::new(snapshot),
        }
    }

    /// The snapshot to render from.
    #[must_use]
    pub fn current(&self) -> Arc<Snapshot> {
        Arc::clone(&self.current)
    }

    /// Installs a freshly fetched snapshot, returning the one it replaces.
    pub fn replace(&mut self, snapshot: Snapshot) -> Arc<Snapshot> {
        std::mem::replace(&mut self.current, Arc::new(snapshot))
    }

    /// Runs `refetch` and installs its result.
    ///
    /// On failure the current snapshot stays in place and the caller
    /// rebuilds its views from [`LastKnownGood::current`].
    ///
    /// # Errors
    ///
    /// Returns the error from `refetch`. The stored snapshot is unchanged.
    pub fn refresh<E: std::fmt::Display>(
        &mut self,
        refetch: impl FnOnce() -> Result<Snapshot, E>,
    ) -> Result<Arc<Snapshot>, E> {
        match refetch() {
            Ok(snapshot) => {
                self.replace(snapshot);
                Ok(self.current())
            }
            Err(e) => {
                tracing::warn!(error = %e, "refetch failed, keeping last good snapshot");
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{booking, moment_on, placed};

    fn snapshot() -> Snapshot {
        let allocations = vec![
            placed("a", "north", 1, 1, 2),
            placed("b", "north", 1, 2, 1),
            booking("c", 3, "9000000001", Some("B1")),
            booking("d", 4, "9000000002", Some("B1")),
        ];
        let blocks = vec![
            Block::new(BlockPath::new("north", 1, 1), 4),
            Block::new(BlockPath::new("north", 1, 2), 2),
        ];
        Snapshot::new(allocations, blocks, moment_on("2025-11-07").now())
    }

    #[test]
    fn lookups_by_id_and_path() {
        let snapshot = snapshot();

        assert_eq!(snapshot.find(&"c".into()).unwrap().bed_number(), Some(3));
        assert!(snapshot.find(&"zz".into()).is_none());
        assert_eq!(snapshot.block(&BlockPath::new("north", 1, 2)).unwrap().size, 2);
        assert_eq!(snapshot.in_block(&BlockPath::new("north", 1, 1)).count(), 3);
    }

    #[test]
    fn duplicate_ids_resolve_to_the_first() {
        let mut second = placed("a", "north", 1, 1, 4);
        second.name = "second".to_string();
        let snapshot = Snapshot::new(
            vec![placed("a", "north", 1, 1, 1), second],
            Vec::new(),
            moment_on("2025-11-07").now(),
        );

        assert_eq!(snapshot.find(&"a".into()).unwrap().bed_number(), Some(1));
    }

    #[test]
    fn views_agree_with_their_parts() {
        let snapshot = snapshot();

        let views = snapshot.views(true);

        assert_eq!(views.hierarchy.placed_count(), 4);
        assert_eq!(views.batches.len(), 3);
        assert_eq!(views.batches[0].batch_id(), Some("B1"));
    }

    #[test]
    fn grid_needs_block_metadata() {
        let snapshot = snapshot();
        let moment = moment_on("2025-11-07");

        let grid = snapshot.grid(&BlockPath::new("north", 1, 1), &moment).unwrap();
        assert_eq!(grid.cells().len(), 4);
        assert_eq!(grid.counts().occupied(), 3);

        assert!(snapshot.grid(&BlockPath::new("south", 1, 1), &moment).is_none());
    }

    #[test]
    fn failed_refresh_keeps_the_last_good_snapshot() {
        let mut good = LastKnownGood::new(snapshot());

        let result = good.refresh(|| Err::<Snapshot, _>("backend down"));

        assert_eq!(result.unwrap_err(), "backend down");
        assert_eq!(good.current().allocations().len(), 4);

        let fresh = Snapshot::new(Vec::new(), Vec::new(), moment_on("2025-11-08").now());
        let installed = good.refresh(|| Ok::<_, String>(fresh)).unwrap();
        assert!(installed.allocations().is_empty());
        assert!(Arc::ptr_eq(&installed, &good.current()));
    }
}
