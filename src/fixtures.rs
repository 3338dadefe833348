// Shared builders for unit tests.

use chrono::{NaiveTime, TimeZone, Utc};

use crate::{
    clock::{Moment, default_zone},
    domain::{Allocation, AllocationStatus, Phone, Placement},
};

/// Noon in the reference zone on `day`.
pub fn moment_on(day: &str) -> Moment {
    let date = day.parse::<crate::CalendarDate>().unwrap().to_naive();
    let noon = date.and_time(NaiveTime::from_hms_opt(12, 0, 0).unwrap());
    let now = default_zone()
        .from_local_datetime(&noon)
        .unwrap()
        .with_timezone(&Utc);
    Moment::at(now, default_zone())
}

pub fn confirmed(id: &str, start: &str, end: &str) -> Allocation {
    let mut allocation = Allocation::new(id, Placement::new("north", 1, 1, 1));
    allocation.start_date = Some(start.parse().unwrap());
    allocation.end_date = Some(end.parse().unwrap());
    allocation
}

pub fn reserved(id: &str, start: &str, end: &str) -> Allocation {
    let mut allocation = confirmed(id, start, end);
    allocation.status = AllocationStatus::Reserved;
    allocation
}

/// A confirmed allocation at the given coordinates.
pub fn placed(id: &str, location: &str, tent: u32, block: u32, bed: u32) -> Allocation {
    let mut allocation = confirmed(id, "2025-11-05", "2025-11-10");
    allocation.placement = Placement::new(location, tent, block, bed);
    allocation
}

/// A reservation at the given coordinates with a phone and optional batch.
pub fn booking(id: &str, bed: u32, phone: &str, batch: Option<&str>) -> Allocation {
    let mut allocation = placed(id, "north", 1, 1, bed);
    allocation.status = AllocationStatus::Reserved;
    allocation.phone = Phone::new(phone);
    allocation.batch_id = batch.map(str::to_string);
    allocation
}
