//! This bench builds the location tree and the reservation batches for a
//! large, festival-sized snapshot.

#![allow(missing_docs)]

use bedalloc::{
    Allocation, AllocationStatus, Block, BlockPath, CalendarDate, Hierarchy, Moment, Phone,
    Placement, Snapshot, clock::default_zone,
};
use chrono::{TimeZone, Utc};
use criterion::{Criterion, criterion_group, criterion_main};

const LOCATIONS: u32 = 4;
const TENTS: u32 = 10;
const BLOCKS: u32 = 8;
const BEDS: u32 = 30;

/// Generates one allocation per bed, every third one a batched reservation.
fn seed_snapshot() -> Snapshot {
    let start: CalendarDate = "2025-11-05".parse().unwrap();
    let end: CalendarDate = "2025-11-10".parse().unwrap();
    let mut allocations = Vec::new();
    let mut blocks = Vec::new();

    for location in 0..LOCATIONS {
        let location_id = format!("site-{location}");
        for tent in 1..=TENTS {
            for block in 1..=BLOCKS {
                blocks.push(Block::new(BlockPath::new(&location_id, tent, block), BEDS));
                for bed in 1..=BEDS {
                    let id = format!("{location_id}-{tent}-{block}-{bed}");
                    let mut allocation =
                        Allocation::new(id, Placement::new(&location_id, tent, block, bed));
                    allocation.start_date = Some(start);
                    allocation.end_date = Some(end);
                    allocation.phone = Phone::new(format!("90000{:05}", bed * block));
                    if bed % 3 == 0 {
                        allocation.status = AllocationStatus::Reserved;
                        allocation.batch_id = Some(format!("B{tent}-{}", bed % 9));
                    }
                    allocations.push(allocation);
                }
            }
        }
    }

    // Shuffle-free but interleaved, so every node is revisited.
    allocations.sort_by_key(|a| a.placement.bed_number);

    Snapshot::new(allocations, blocks, Utc::now())
}

fn build_hierarchy(c: &mut Criterion) {
    let snapshot = seed_snapshot();
    let moment = Moment::at(
        Utc.with_ymd_and_hms(2025, 11, 7, 6, 30, 0).unwrap(),
        default_zone(),
    );

    c.bench_function("build hierarchy", |b| {
        b.iter(|| Hierarchy::build(snapshot.allocations()));
    });

    c.bench_function("build views", |b| {
        b.iter(|| snapshot.views(true));
    });

    c.bench_function("bed grids", |b| {
        b.iter(|| {
            snapshot
                .blocks()
                .iter()
                .filter_map(|block| snapshot.grid(&block.path, &moment))
                .map(|grid| grid.counts().occupied())
                .sum::<usize>()
        });
    });
}

criterion_group!(benches, build_hierarchy);
criterion_main!(benches);
