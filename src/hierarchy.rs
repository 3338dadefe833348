//! Location → Tent → Block → Bed trees built from flat record lists.
//!
//! The [`Hierarchy`] borrows the records it is built from. It is a read-only
//! view over one snapshot; when the snapshot changes, build a new one rather
//! than patching the old tree, so rollup counts never go stale.
//!
//! Nodes keep first-seen order. Only the beds inside a block are sorted, by
//! bed number, so display and selection order are stable.

use std::collections::HashMap;

use thiserror::Error;
use tracing::instrument;

use crate::{
    clock::Moment,
    domain::{Allocation, BlockPath, Placement},
    status::StatusCounts,
};

/// A record that knows where it sits in the bed hierarchy.
pub trait Placed {
    /// The record's placement.
    fn placement(&self) -> &Placement;
}

impl Placed for Allocation {
    fn placement(&self) -> &Placement {
        &self.placement
    }
}

impl<T: Placed + ?Sized> Placed for &T {
    fn placement(&self) -> &Placement {
        (**self).placement()
    }
}

/// A coordinate a record needs before it can be placed in the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum UnknownHierarchyKey {
    /// The record has no location id.
    #[error("record has no location id")]
    Location,
    /// The record has no tent index.
    #[error("record has no tent index")]
    Tent,
    /// The record has no block index.
    #[error("record has no block index")]
    Block,
}

/// Access to the records carried by a node.
pub trait Rollup<'a, T: 'a> {
    /// Every record at or below this node.
    fn items(&self) -> &[&'a T];

    /// Number of records at or below this node.
    fn count(&self) -> usize {
        self.items().len()
    }
}

/// A location and everything in it.
#[derive(Debug, Clone)]
pub struct LocationNode<'a, T> {
    id: String,
    items: Vec<&'a T>,
    tents: Vec<TentNode<'a, T>>,
}

impl<'a, T> LocationNode<'a, T> {
    /// The location id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Tents in first-seen order.
    #[must_use]
    pub fn tents(&self) -> &[TentNode<'a, T>] {
        &self.tents
    }

    /// Finds a tent by index.
    #[must_use]
    pub fn tent(&self, index: u32) -> Option<&TentNode<'a, T>> {
        self.tents.iter().find(|tent| tent.index == index)
    }
}

impl<'a, T: 'a> Rollup<'a, T> for LocationNode<'a, T> {
    fn items(&self) -> &[&'a T] {
        &self.items
    }
}

/// A tent and its blocks.
#[derive(Debug, Clone)]
pub struct TentNode<'a, T> {
    index: u32,
    items: Vec<&'a T>,
    blocks: Vec<BlockNode<'a, T>>,
}

impl<'a, T> TentNode<'a, T> {
    /// The tent index within its location.
    #[must_use]
    pub const fn index(&self) -> u32 {
        self.index
    }

    /// Blocks in first-seen order.
    #[must_use]
    pub fn blocks(&self) -> &[BlockNode<'a, T>] {
        &self.blocks
    }

    /// Finds a block by index.
    #[must_use]
    pub fn block(&self, index: u32) -> Option<&BlockNode<'a, T>> {
        self.blocks.iter().find(|block| block.path.block_index == index)
    }
}

impl<'a, T: 'a> Rollup<'a, T> for TentNode<'a, T> {
    fn items(&self) -> &[&'a T] {
        &self.items
    }
}

/// A block and the records on its beds, sorted by bed number.
///
/// Records without a bed number sort after numbered ones.
#[derive(Debug, Clone)]
pub struct BlockNode<'a, T> {
    path: BlockPath,
    beds: Vec<&'a T>,
}

impl<'a, T> BlockNode<'a, T> {
    /// The full path of this block.
    #[must_use]
    pub const fn path(&self) -> &BlockPath {
        &self.path
    }

    /// The block index within its tent.
    #[must_use]
    pub const fn index(&self) -> u32 {
        self.path.block_index
    }

    /// Records on this block's beds, in bed order.
    #[must_use]
    pub fn beds(&self) -> &[&'a T] {
        &self.beds
    }
}

impl<'a, T: Placed> BlockNode<'a, T> {
    /// Bed numbers present in this block, in order, without duplicates.
    #[must_use]
    pub fn bed_numbers(&self) -> Vec<u32> {
        let mut numbers: Vec<u32> = self
            .beds
            .iter()
            .filter_map(|item| item.placement().bed_number)
            .collect();
        numbers.dedup();
        numbers
    }
}

impl<'a, T: 'a> Rollup<'a, T> for BlockNode<'a, T> {
    fn items(&self) -> &[&'a T] {
        &self.beds
    }
}

/// Status tallies for any node holding allocations.
#[must_use]
pub fn status_counts<'a, N>(node: &N, moment: &Moment) -> StatusCounts
where
    N: Rollup<'a, Allocation> + ?Sized,
{
    StatusCounts::of(node.items().iter().copied(), moment)
}

/// A record that could not be placed.
#[derive(Debug, Clone, Copy)]
pub struct Dropped<'a, T> {
    /// The record.
    pub item: &'a T,
    /// The coordinate it was missing.
    pub reason: UnknownHierarchyKey,
}

/// A tree of locations built from a flat list of records.
#[derive(Debug, Clone)]
pub struct Hierarchy<'a, T> {
    locations: Vec<LocationNode<'a, T>>,
    dropped: Vec<Dropped<'a, T>>,
}

impl<T> Default for Hierarchy<'_, T> {
    fn default() -> Self {
        Self {
            locations: Vec::new(),
            dropped: Vec::new(),
        }
    }
}

impl<'a, T: Placed> Hierarchy<'a, T> {
    /// Builds the tree in one pass over `records`.
    ///
    /// Records missing a location, tent, or block coordinate are set aside
    /// and reported through [`Hierarchy::dropped`].
    #[must_use]
    #[instrument(level = "debug", skip_all)]
    pub fn build(records: impl IntoIterator<Item = &'a T>) -> Self {
        let mut builder = HierarchyBuilder::default();
        for record in records {
            builder.push(record);
        }
        builder.finish()
    }
}

impl<'a, T> Hierarchy<'a, T> {
    /// Locations in first-seen order.
    #[must_use]
    pub fn locations(&self) -> &[LocationNode<'a, T>] {
        &self.locations
    }

    /// Finds a location by id.
    #[must_use]
    pub fn location(&self, id: &str) -> Option<&LocationNode<'a, T>> {
        self.locations.iter().find(|location| location.id == id)
    }

    /// Finds a block by path.
    #[must_use]
    pub fn block(&self, path: &BlockPath) -> Option<&BlockNode<'a, T>> {
        self.location(&path.location_id)?
            .tent(path.tent_index)?
            .block(path.block_index)
    }

    /// Iterates over every block in tree order.
    pub fn blocks(&self) -> impl Iterator<Item = &BlockNode<'a, T>> {
        self.locations
            .iter()
            .flat_map(|location| location.tents.iter())
            .flat_map(|tent| tent.blocks.iter())
    }

    /// Records that could not be placed.
    #[must_use]
    pub fn dropped(&self) -> &[Dropped<'a, T>] {
        &self.dropped
    }

    /// Number of records placed in the tree.
    #[must_use]
    pub fn placed_count(&self) -> usize {
        self.locations.iter().map(|location| location.items.len()).sum()
    }
}

/// Incremental form of [`Hierarchy::build`].
#[derive(Debug)]
pub struct HierarchyBuilder<'a, T> {
    locations: Vec<LocationNode<'a, T>>,
    location_slots: HashMap<String, usize>,
    tent_slots: HashMap<(usize, u32), usize>,
    block_slots: HashMap<(usize, usize, u32), usize>,
    dropped: Vec<Dropped<'a, T>>,
}

impl<T> Default for HierarchyBuilder<'_, T> {
    fn default() -> Self {
        Self {
            locations: Vec::new(),
            location_slots: HashMap::new(),
            tent_slots: HashMap::new(),
            block_slots: HashMap::new(),
            dropped: Vec::new(),
        }
    }
}

impl<'a, T: Placed> HierarchyBuilder<'a, T> {
    /// Adds one record to the tree.
    pub fn push(&mut self, record: &'a T) {
        let path = match record.placement().path() {
            Ok(path) => path,
            Err(reason) => {
                tracing::debug!(%reason, "dropping record from hierarchy");
                self.dropped.push(Dropped {
                    item: record,
                    reason,
                });
                return;
            }
        };

        let location_slot = match self.location_slots.get(&path.location_id) {
            Some(&slot) => slot,
            None => {
                let slot = self.locations.len();
                self.location_slots.insert(path.location_id.clone(), slot);
                self.locations.push(LocationNode {
                    id: path.location_id.clone(),
                    items: Vec::new(),
                    tents: Vec::new(),
                });
                slot
            }
        };
        let location = &mut self.locations[location_slot];

        let tent_slot = *self
            .tent_slots
            .entry((location_slot, path.tent_index))
            .or_insert_with(|| {
                location.tents.push(TentNode {
                    index: path.tent_index,
                    items: Vec::new(),
                    blocks: Vec::new(),
                });
                location.tents.len() - 1
            });
        let tent = &mut location.tents[tent_slot];

        let block_slot = *self
            .block_slots
            .entry((location_slot, tent_slot, path.block_index))
            .or_insert_with(|| {
                tent.blocks.push(BlockNode {
                    path: path.clone(),
                    beds: Vec::new(),
                });
                tent.blocks.len() - 1
            });

        location.items.push(record);
        tent.items.push(record);
        tent.blocks[block_slot].beds.push(record);
    }

    /// Sorts every block's beds and returns the finished tree.
    #[must_use]
    pub fn finish(mut self) -> Hierarchy<'a, T> {
        for block in self
            .locations
            .iter_mut()
            .flat_map(|location| location.tents.iter_mut())
            .flat_map(|tent| tent.blocks.iter_mut())
        {
            block
                .beds
                .sort_by_key(|item| item.placement().bed_number.map_or((1, 0), |n| (0, n)));
        }

        tracing::debug!(
            locations = self.locations.len(),
            dropped = self.dropped.len(),
            "built hierarchy"
        );

        Hierarchy {
            locations: self.locations,
            dropped: self.dropped,
        }
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::fixtures::{moment_on, placed, reserved};

    fn ids<'a>(items: &[&'a Allocation]) -> Vec<&'a str> {
        items.iter().map(|item| item.id.as_str()).collect()
    }

    #[test]
    fn groups_records_by_path() {
        let records = vec![
            placed("a", "north", 1, 1, 3),
            placed("b", "north", 1, 1, 1),
            placed("c", "north", 1, 2, 1),
            placed("d", "north", 2, 1, 1),
            placed("e", "south", 1, 1, 1),
        ];

        let tree = Hierarchy::build(&records);

        let ids_by_location: Vec<_> = tree.locations().iter().map(LocationNode::id).collect();
        assert_eq!(ids_by_location, vec!["north", "south"]);

        let north = tree.location("north").unwrap();
        assert_eq!(north.count(), 4);
        assert_eq!(north.tents().len(), 2);
        assert_eq!(north.tent(1).unwrap().count(), 3);
        assert_eq!(north.tent(2).unwrap().count(), 1);

        let block = tree.block(&BlockPath::new("north", 1, 1)).unwrap();
        assert_eq!(ids(block.beds()), vec!["b", "a"]);
        assert_eq!(block.bed_numbers(), vec![1, 3]);

        assert_eq!(tree.placed_count(), 5);
        assert!(tree.dropped().is_empty());
    }

    #[test]
    fn beds_without_numbers_sort_last() {
        let mut unnumbered = placed("x", "north", 1, 1, 1);
        unnumbered.placement.bed_number = None;
        let records = vec![unnumbered, placed("b", "north", 1, 1, 7), placed("a", "north", 1, 1, 2)];

        let tree = Hierarchy::build(&records);
        let block = tree.block(&BlockPath::new("north", 1, 1)).unwrap();

        assert_eq!(ids(block.beds()), vec!["a", "b", "x"]);
    }

    #[test]
    fn records_missing_keys_are_dropped_and_counted() {
        let mut no_location = placed("a", "north", 1, 1, 1);
        no_location.placement.location_id = None;
        let mut no_block = placed("b", "north", 1, 1, 2);
        no_block.placement.block_index = None;
        let records = vec![no_location, no_block, placed("c", "north", 1, 1, 3)];

        let tree = Hierarchy::build(&records);

        assert_eq!(tree.placed_count(), 1);
        let reasons: Vec<_> = tree.dropped().iter().map(|d| d.reason).collect();
        assert_eq!(
            reasons,
            vec![UnknownHierarchyKey::Location, UnknownHierarchyKey::Block]
        );
    }

    #[test]
    fn node_status_counts() {
        let mut held = reserved("r", "2025-11-05", "2025-11-10");
        held.placement = Placement::new("north", 1, 1, 2);
        let records = vec![placed("a", "north", 1, 1, 1), held];

        let tree = Hierarchy::build(&records);
        let counts = status_counts(tree.location("north").unwrap(), &moment_on("2025-11-07"));

        assert_eq!(counts.current, 1);
        assert_eq!(counts.reserved, 1);
        assert_eq!(counts.total(), 2);
    }

    fn rollup_count<'a, N: Rollup<'a, Allocation>>(node: &N) -> usize {
        node.count()
    }

    #[test]
    fn every_node_kind_rolls_up() {
        let records = vec![
            placed("a", "north", 1, 1, 1),
            placed("b", "north", 1, 2, 1),
            placed("c", "north", 2, 1, 1),
        ];

        let tree = Hierarchy::build(&records);
        let north = tree.location("north").unwrap();
        let tent = north.tent(1).unwrap();
        let block = tree.block(&BlockPath::new("north", 1, 2)).unwrap();

        assert_eq!(rollup_count(north), 3);
        assert_eq!(rollup_count(tent), 2);
        assert_eq!(rollup_count(block), 1);
    }

    fn arbitrary_record() -> impl Strategy<Value = Allocation> {
        (
            prop::option::weighted(0.9, prop::sample::select(vec!["north", "south", "east"])),
            prop::option::weighted(0.9, 1u32..4),
            prop::option::weighted(0.9, 1u32..4),
            1u32..20,
        )
            .prop_map(|(location, tent, block, bed)| {
                let mut allocation = placed("id", "north", 1, 1, bed);
                allocation.placement.location_id = location.map(str::to_string);
                allocation.placement.tent_index = tent;
                allocation.placement.block_index = block;
                allocation
            })
    }

    fn rollups(tree: &Hierarchy<'_, Allocation>) -> Vec<(BlockPath, usize, usize, usize)> {
        let mut rows: Vec<_> = tree
            .locations()
            .iter()
            .flat_map(|location| {
                location.tents().iter().flat_map(move |tent| {
                    tent.blocks().iter().map(move |block| {
                        (block.path().clone(), location.count(), tent.count(), block.count())
                    })
                })
            })
            .collect();
        rows.sort();
        rows
    }

    proptest! {
        #[test]
        fn rollups_match_matching_records(records in prop::collection::vec(arbitrary_record(), 0..60)) {
            let tree = Hierarchy::build(&records);

            prop_assert_eq!(tree.placed_count() + tree.dropped().len(), records.len());

            for location in tree.locations() {
                let expected = records
                    .iter()
                    .filter(|r| r.placement.path().is_ok_and(|p| p.location_id == location.id()))
                    .count();
                prop_assert_eq!(location.count(), expected);
            }

            for block in tree.blocks() {
                let expected = records
                    .iter()
                    .filter(|r| r.placement.path().as_ref() == Ok(block.path()))
                    .count();
                prop_assert_eq!(block.count(), expected);
            }
        }

        #[test]
        fn rollups_ignore_input_order(
            (records, shuffled) in prop::collection::vec(arbitrary_record(), 0..40)
                .prop_flat_map(|records| {
                    let shuffled = Just(records.clone()).prop_shuffle();
                    (Just(records), shuffled)
                })
        ) {
            let first = Hierarchy::build(&records);
            let second = Hierarchy::build(&shuffled);

            prop_assert_eq!(rollups(&first), rollups(&second));
            prop_assert_eq!(first.dropped().len(), second.dropped().len());
        }
    }
}
