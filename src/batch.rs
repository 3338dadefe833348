//! Grouping reservations into batches.
//!
//! A batch is every allocation made by one reservation. Allocations that
//! carry a batch id group by it. Allocations without one form singleton
//! batches keyed by their bed and phone, so unrelated singletons never
//! collide.

use std::{collections::HashMap, fmt};

use chrono::{DateTime, Duration, Utc};
use nonempty::NonEmpty;
use tracing::instrument;

use crate::{
    clock::Moment,
    domain::{Allocation, AllocationId, Phone},
};

/// The key a batch is grouped under.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BatchKey {
    /// An explicit batch id from the backend.
    Explicit(String),
    /// A key synthesized for an allocation without a batch id.
    ///
    /// Formatted `single_{location}-{tent}-{block}-{bed}-{phone}`; missing
    /// coordinates are left empty.
    Single(String),
}

impl BatchKey {
    /// The key for `allocation`.
    #[must_use]
    pub fn of(allocation: &Allocation) -> Self {
        match allocation.batch_id.as_deref().filter(|id| !id.is_empty()) {
            Some(id) => Self::Explicit(id.to_string()),
            None => {
                let placement = &allocation.placement;
                Self::Single(format!(
                    "single_{}-{}-{}-{}-{}",
                    placement.location_id.as_deref().unwrap_or_default(),
                    display_or_empty(placement.tent_index),
                    display_or_empty(placement.block_index),
                    display_or_empty(placement.bed_number),
                    allocation.phone,
                ))
            }
        }
    }
}

fn display_or_empty(value: Option<u32>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

impl fmt::Display for BatchKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Explicit(key) | Self::Single(key) => f.write_str(key),
        }
    }
}

/// Allocations made together, with their contact phones and the latest
/// expiry among them.
#[derive(Debug, Clone)]
pub struct Batch<'a> {
    key: BatchKey,
    items: NonEmpty<&'a Allocation>,
    phones: Vec<Phone>,
    expires_at: Option<DateTime<Utc>>,
}

impl<'a> Batch<'a> {
    fn start(key: BatchKey, first: &'a Allocation) -> Self {
        let mut batch = Self {
            key,
            items: NonEmpty::new(first),
            phones: Vec::new(),
            expires_at: None,
        };
        batch.absorb(first);
        batch
    }

    fn push(&mut self, allocation: &'a Allocation) {
        self.items.push(allocation);
        self.absorb(allocation);
    }

    fn absorb(&mut self, allocation: &Allocation) {
        if !allocation.phone.is_empty() && !self.phones.contains(&allocation.phone) {
            self.phones.push(allocation.phone.clone());
        }
        if let Some(instant) = allocation.reserved_expires_at.instant() {
            self.expires_at = Some(self.expires_at.map_or(instant, |current| current.max(instant)));
        }
    }

    /// The grouping key.
    #[must_use]
    pub const fn key(&self) -> &BatchKey {
        &self.key
    }

    /// The backend batch id, if the batch has one.
    #[must_use]
    pub fn batch_id(&self) -> Option<&str> {
        match &self.key {
            BatchKey::Explicit(id) => Some(id),
            BatchKey::Single(_) => None,
        }
    }

    /// Member allocations in input order.
    #[must_use]
    pub const fn items(&self) -> &NonEmpty<&'a Allocation> {
        &self.items
    }

    /// Number of member allocations. Never zero.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Always `false`; present for API symmetry with `len`.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        false
    }

    /// Distinct phone numbers across members, in first-seen order.
    #[must_use]
    pub fn phones(&self) -> &[Phone] {
        &self.phones
    }

    /// The latest expiry among members, if any member has one.
    #[must_use]
    pub const fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    /// Time left before the batch lapses, if it expires and has not yet.
    #[must_use]
    pub fn remaining(&self, moment: &Moment) -> Option<Duration> {
        self.expires_at
            .map(|expires_at| expires_at - moment.now())
            .filter(|left| *left > Duration::zero())
    }

    /// The first non-empty contact name among members.
    #[must_use]
    pub fn contact_name(&self) -> Option<&str> {
        self.items
            .iter()
            .filter_map(|item| item.contact_name.as_deref())
            .find(|name| !name.trim().is_empty())
    }

    /// Ids of every member.
    pub fn ids(&self) -> impl Iterator<Item = &AllocationId> + '_ {
        self.items.iter().map(|item| &item.id)
    }
}

/// Groups `records` into batches, in the order each batch is first seen.
///
/// Every record lands in exactly one batch.
#[must_use]
#[instrument(level = "debug", skip_all)]
pub fn group<'a>(records: impl IntoIterator<Item = &'a Allocation>) -> Vec<Batch<'a>> {
    let mut batches: Vec<Batch<'a>> = Vec::new();
    let mut slots: HashMap<BatchKey, usize> = HashMap::new();

    for record in records {
        let key = BatchKey::of(record);
        if let Some(&slot) = slots.get(&key) {
            batches[slot].push(record);
        } else {
            slots.insert(key.clone(), batches.len());
            batches.push(Batch::start(key, record));
        }
    }

    tracing::debug!(batches = batches.len(), "grouped reservations");
    batches
}

/// Orders batches largest first. Batches of equal size keep their relative
/// order.
pub fn sort_largest_first(batches: &mut [Batch<'_>]) {
    batches.sort_by(|a, b| b.len().cmp(&a.len()));
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use proptest::prelude::*;

    use super::*;
    use crate::{
        domain::{Placement, ReservationExpiry},
        fixtures::{booking, moment_on},
    };

    #[test]
    fn shared_batch_id_groups_across_blocks() {
        let mut first = booking("a", 1, "9000000001", Some("B100"));
        let mut second = booking("b", 4, "9000000002", Some("B100"));
        first.placement = Placement::new("north", 1, 1, 1);
        second.placement = Placement::new("south", 2, 3, 4);
        let records = vec![first, second];

        let batches = group(&records);

        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].batch_id(), Some("B100"));
        assert_eq!(batches[0].len(), 2);
        assert_eq!(
            batches[0].phones(),
            &[Phone::new("9000000001"), Phone::new("9000000002")]
        );
    }

    #[test]
    fn phones_are_deduplicated_in_first_seen_order() {
        let records = vec![
            booking("a", 1, "9000000002", Some("B1")),
            booking("b", 2, "9000000001", Some("B1")),
            booking("c", 3, "9000000002", Some("B1")),
            booking("d", 4, "", Some("B1")),
        ];

        let batches = group(&records);

        assert_eq!(
            batches[0].phones(),
            &[Phone::new("9000000002"), Phone::new("9000000001")]
        );
    }

    #[test]
    fn singletons_are_keyed_by_bed_and_phone() {
        let records = vec![
            booking("a", 1, "9000000001", None),
            booking("b", 2, "9000000001", None),
            booking("c", 1, "9000000002", None),
            booking("d", 1, "9000000001", Some("")),
        ];

        let batches = group(&records);
        let keys: Vec<_> = batches.iter().map(|b| b.key().to_string()).collect();

        assert_eq!(
            keys,
            vec![
                "single_north-1-1-1-9000000001",
                "single_north-1-1-2-9000000001",
                "single_north-1-1-1-9000000002",
            ]
        );
        // An empty batch id is no batch id.
        assert_eq!(batches[0].len(), 2);
        assert!(batches.iter().all(|b| b.batch_id().is_none()));
    }

    #[test]
    fn missing_coordinates_leave_gaps_in_the_key() {
        let mut record = booking("a", 1, "9000000001", None);
        record.placement.tent_index = None;

        assert_eq!(
            BatchKey::of(&record),
            BatchKey::Single("single_north--1-1-9000000001".to_string())
        );
    }

    #[test]
    fn expiry_is_the_latest_among_members() {
        let early = Utc.with_ymd_and_hms(2025, 11, 7, 8, 0, 0).unwrap();
        let late = Utc.with_ymd_and_hms(2025, 11, 7, 9, 0, 0).unwrap();

        let mut a = booking("a", 1, "9000000001", Some("B1"));
        let mut b = booking("b", 2, "9000000001", Some("B1"));
        let c = booking("c", 3, "9000000001", Some("B1"));
        a.reserved_expires_at = ReservationExpiry::At(late);
        b.reserved_expires_at = ReservationExpiry::At(early);
        let records = vec![a, b, c];

        let batches = group(&records);
        assert_eq!(batches[0].expires_at(), Some(late));

        let lone = vec![booking("z", 9, "9000000009", None)];
        assert_eq!(group(&lone)[0].expires_at(), None);
    }

    #[test]
    fn remaining_time_is_positive_or_absent() {
        let moment = moment_on("2025-11-07");
        let mut record = booking("a", 1, "9000000001", None);
        record.reserved_expires_at = ReservationExpiry::At(moment.now() + Duration::minutes(10));
        let records = vec![record];

        let batches = group(&records);
        assert_eq!(batches[0].remaining(&moment), Some(Duration::minutes(10)));

        let later = Moment::from_parts(
            moment.now() + Duration::minutes(11),
            moment.today(),
        );
        assert_eq!(batches[0].remaining(&later), None);
    }

    #[test]
    fn contact_name_skips_blanks() {
        let mut a = booking("a", 1, "9000000001", Some("B1"));
        let mut b = booking("b", 2, "9000000001", Some("B1"));
        a.contact_name = Some("  ".to_string());
        b.contact_name = Some("Asha".to_string());
        let records = vec![a, b];

        assert_eq!(group(&records)[0].contact_name(), Some("Asha"));
    }

    #[test]
    fn largest_batches_first_is_stable() {
        let records = vec![
            booking("a", 1, "9000000001", Some("small")),
            booking("b", 2, "9000000002", Some("big")),
            booking("c", 3, "9000000002", Some("big")),
            booking("d", 4, "9000000003", Some("other")),
        ];

        let mut batches = group(&records);
        sort_largest_first(&mut batches);
        let order: Vec<_> = batches.iter().map(|b| b.key().to_string()).collect();

        assert_eq!(order, vec!["big", "small", "other"]);
    }

    proptest! {
        #[test]
        fn grouping_partitions_the_input(
            specs in prop::collection::vec(
                (1u32..6, prop::sample::select(vec!["9000000001", "9000000002"]),
                 prop::option::of(prop::sample::select(vec!["B1", "B2", "B3"]))),
                0..50,
            )
        ) {
            let records: Vec<_> = specs
                .iter()
                .enumerate()
                .map(|(i, (bed, phone, batch))| booking(&i.to_string(), *bed, phone, *batch))
                .collect();

            let batches = group(&records);

            let total: usize = batches.iter().map(Batch::len).sum();
            prop_assert_eq!(total, records.len());

            let mut seen: Vec<&AllocationId> = batches.iter().flat_map(|b| b.ids()).collect();
            seen.sort();
            seen.dedup();
            prop_assert_eq!(seen.len(), records.len());
        }
    }
}
