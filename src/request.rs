//! Client-side checks on a reservation form.
//!
//! Validation collects every problem at once so a form can show them
//! together. Passing validation does not guarantee the backend will accept
//! the reservation.

use tracing::instrument;

use crate::{
    clock::Moment,
    domain::{Allocation, Block, Gender, Phone},
    gender::{self, GenderViolation},
    status::{self, BedStatus},
    window::{CalendarDate, DateWindow},
};

/// One problem with a reservation request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RequestError {
    /// The guest name is blank.
    #[error("guest name is required")]
    EmptyName,

    /// The guest phone is not ten digits.
    #[error("phone number must be exactly 10 digits: '{0}'")]
    InvalidPhone(Phone),

    /// The emergency phone is not ten digits.
    #[error("emergency phone number must be exactly 10 digits: '{0}'")]
    InvalidEmergencyPhone(Phone),

    /// The emergency phone repeats the guest phone.
    #[error("emergency phone must differ from the guest phone")]
    EmergencySameAsPhone,

    /// The stay ends before it starts.
    #[error("stay ends ({end}) before it starts ({start})")]
    InvertedDates {
        /// Requested first day.
        start: CalendarDate,
        /// Requested last day.
        end: CalendarDate,
    },

    /// The bed number is not in the block.
    #[error("bed {bed} is outside the block (1 to {size})")]
    BedOutOfRange {
        /// Requested bed.
        bed: u32,
        /// Beds in the block.
        size: u32,
    },

    /// The block does not accept the guest's gender.
    #[error(transparent)]
    Gender(#[from] GenderViolation),

    /// Another allocation holds the bed for part of the requested stay.
    #[error("bed {bed} is {status} during the requested stay")]
    BedUnavailable {
        /// Requested bed.
        bed: u32,
        /// The conflicting allocation's state.
        status: BedStatus,
    },
}

/// Every problem found with a request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{}", join(.0))]
pub struct ValidationErrors(pub Vec<RequestError>);

fn join(errors: &[RequestError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl ValidationErrors {
    /// The individual problems.
    #[must_use]
    pub fn errors(&self) -> &[RequestError] {
        &self.0
    }
}

/// A guest's request for one bed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReservationRequest {
    /// Guest name.
    pub name: String,
    /// Guest phone.
    pub phone: Phone,
    /// Emergency contact phone, if one was given.
    pub emergency_phone: Option<Phone>,
    /// Guest gender.
    pub gender: Gender,
    /// First day of the stay.
    pub start_date: CalendarDate,
    /// Last day of the stay.
    pub end_date: CalendarDate,
    /// Requested bed.
    pub bed_number: u32,
}

impl ReservationRequest {
    /// The requested stay.
    #[must_use]
    pub const fn window(&self) -> DateWindow {
        DateWindow::new(self.start_date, self.end_date)
    }

    /// Checks the request against `block` and the allocations already in it.
    ///
    /// `occupants` may include allocations for any bed; only those on the
    /// requested bed are compared.
    ///
    /// # Errors
    ///
    /// Returns every problem found.
    #[instrument(level = "debug", skip_all, fields(block = %block.path, bed = self.bed_number))]
    pub fn validate<'a>(
        &self,
        block: &Block,
        occupants: impl IntoIterator<Item = &'a Allocation>,
        moment: &Moment,
    ) -> Result<(), ValidationErrors> {
        let mut errors = Vec::new();

        if self.name.trim().is_empty() {
            errors.push(RequestError::EmptyName);
        }
        if !self.phone.is_well_formed() {
            errors.push(RequestError::InvalidPhone(self.phone.clone()));
        }
        match &self.emergency_phone {
            Some(emergency) if !emergency.is_well_formed() => {
                errors.push(RequestError::InvalidEmergencyPhone(emergency.clone()));
            }
            Some(emergency) if *emergency == self.phone => {
                errors.push(RequestError::EmergencySameAsPhone);
            }
            _ => {}
        }

        let window = self.window();
        if window.is_inverted() {
            errors.push(RequestError::InvertedDates {
                start: self.start_date,
                end: self.end_date,
            });
        }

        if block.contains_bed(self.bed_number) {
            if let Some(status) = self.conflict(occupants, &window, moment) {
                errors.push(RequestError::BedUnavailable {
                    bed: self.bed_number,
                    status,
                });
            }
        } else {
            errors.push(RequestError::BedOutOfRange {
                bed: self.bed_number,
                size: block.size,
            });
        }

        if let Err(violation) = gender::check_block(block, self.gender) {
            errors.push(violation.into());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            tracing::debug!(problems = errors.len(), "reservation request rejected");
            Err(ValidationErrors(errors))
        }
    }

    /// The most significant state of any live allocation on the requested bed
    /// whose stay overlaps `window`.
    ///
    /// A held reservation with no readable stay counts as overlapping, since
    /// it holds the bed regardless of dates.
    fn conflict<'a>(
        &self,
        occupants: impl IntoIterator<Item = &'a Allocation>,
        window: &DateWindow,
        moment: &Moment,
    ) -> Option<BedStatus> {
        occupants
            .into_iter()
            .filter(|occupant| occupant.bed_number() == Some(self.bed_number))
            .filter_map(|occupant| {
                let status = status::resolve(Some(occupant), moment);
                let overlaps = occupant
                    .window()
                    .is_none_or(|theirs| theirs.overlaps(window));
                (!status.is_available() && overlaps).then_some(status)
            })
            .max_by_key(|status| status.precedence())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::{AllocationStatus, BlockPath, GenderRestriction, Placement, ReservationExpiry},
        fixtures::{confirmed, moment_on, reserved},
        grid::BedGrid,
    };

    fn block() -> Block {
        Block::new(BlockPath::new("north", 1, 1), 4)
    }

    fn request() -> ReservationRequest {
        ReservationRequest {
            name: "Asha".to_string(),
            phone: Phone::new("9000000001"),
            emergency_phone: Some(Phone::new("9000000002")),
            gender: Gender::Female,
            start_date: "2025-11-12".parse().unwrap(),
            end_date: "2025-11-14".parse().unwrap(),
            bed_number: 2,
        }
    }

    fn problems(request: &ReservationRequest, occupants: &[Allocation]) -> Vec<RequestError> {
        request
            .validate(&block(), occupants, &moment_on("2025-11-07"))
            .map_or_else(|errors| errors.0, |()| Vec::new())
    }

    #[test]
    fn a_clean_request_passes() {
        assert!(problems(&request(), &[]).is_empty());
    }

    #[test]
    fn every_problem_is_reported() {
        let mut bad = request();
        bad.name = "  ".to_string();
        bad.phone = Phone::new("12345");
        bad.emergency_phone = Some(Phone::new("abcdefghij"));
        bad.start_date = "2025-11-15".parse().unwrap();
        bad.bed_number = 9;

        let errors = problems(&bad, &[]);

        assert_eq!(
            errors,
            vec![
                RequestError::EmptyName,
                RequestError::InvalidPhone(Phone::new("12345")),
                RequestError::InvalidEmergencyPhone(Phone::new("abcdefghij")),
                RequestError::InvertedDates {
                    start: "2025-11-15".parse().unwrap(),
                    end: "2025-11-14".parse().unwrap(),
                },
                RequestError::BedOutOfRange { bed: 9, size: 4 },
            ]
        );
    }

    #[test]
    fn emergency_phone_must_differ() {
        let mut same = request();
        same.emergency_phone = Some(same.phone.clone());

        assert_eq!(problems(&same, &[]), vec![RequestError::EmergencySameAsPhone]);
    }

    #[test]
    fn emergency_phone_is_optional() {
        let mut alone = request();
        alone.emergency_phone = None;

        assert!(problems(&alone, &[]).is_empty());
    }

    #[test]
    fn gender_restriction_is_checked() {
        let block = block().with_restriction(GenderRestriction::MaleOnly);

        let errors = request()
            .validate(&block, [], &moment_on("2025-11-07"))
            .unwrap_err();

        assert!(matches!(errors.errors(), [RequestError::Gender(_)]));
        assert_eq!(
            errors.to_string(),
            "a male-only block cannot take a Female guest"
        );
    }

    #[test]
    fn overlapping_booking_on_the_same_bed_conflicts() {
        let mut held = reserved("held", "2025-11-13", "2025-11-20");
        held.placement.bed_number = Some(2);
        let mut elsewhere = confirmed("other", "2025-11-12", "2025-11-14");
        elsewhere.placement.bed_number = Some(3);

        let errors = problems(&request(), &[held, elsewhere]);

        assert_eq!(
            errors,
            vec![RequestError::BedUnavailable {
                bed: 2,
                status: BedStatus::Reserved
            }]
        );
    }

    #[test]
    fn finished_or_adjacent_stays_do_not_conflict() {
        let mut before = confirmed("before", "2025-11-08", "2025-11-11");
        before.placement.bed_number = Some(2);
        let mut gone = confirmed("gone", "2025-10-01", "2025-10-02");
        gone.placement.bed_number = Some(2);

        assert!(problems(&request(), &[before, gone]).is_empty());
    }

    #[test]
    fn open_reservation_without_dates_holds_the_bed() {
        let mut held = Allocation::new("held", Placement::new("north", 1, 1, 2));
        held.status = AllocationStatus::Reserved;
        let moment = moment_on("2025-11-07");

        let grid = BedGrid::build(&block(), [&held], &moment);
        assert_eq!(grid.cell(2).unwrap().status, BedStatus::Reserved);

        assert_eq!(
            problems(&request(), &[held]),
            vec![RequestError::BedUnavailable {
                bed: 2,
                status: BedStatus::Reserved
            }]
        );
    }

    #[test]
    fn lapsed_reservation_without_dates_frees_the_bed() {
        let mut lapsed = Allocation::new("lapsed", Placement::new("north", 1, 1, 2));
        lapsed.status = AllocationStatus::Reserved;
        lapsed.reserved_expires_at = ReservationExpiry::At(
            "2025-11-01T00:00:00Z".parse().unwrap(),
        );

        assert!(problems(&request(), &[lapsed]).is_empty());
    }
}
