//! Advisory gender checks against block restrictions.
//!
//! These checks let a form fail fast before it submits. The backend repeats
//! them authoritatively; a pass here is not a guarantee.

use crate::domain::{Block, Gender, GenderRestriction};

/// A guest's gender is not permitted by a block's restriction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("{} block cannot take a {gender} guest", describe(.restriction))]
pub struct GenderViolation {
    /// The block's restriction.
    pub restriction: GenderRestriction,
    /// The rejected gender.
    pub gender: Gender,
}

const fn describe(restriction: &GenderRestriction) -> &'static str {
    match restriction {
        GenderRestriction::Both => "a mixed",
        GenderRestriction::MaleOnly => "a male-only",
        GenderRestriction::FemaleOnly => "a female-only",
    }
}

/// Checks whether `gender` may be placed under `restriction`.
///
/// # Errors
///
/// Returns a [`GenderViolation`] if the restriction does not permit the
/// gender.
pub const fn check(restriction: GenderRestriction, gender: Gender) -> Result<(), GenderViolation> {
    if restriction.permits(gender) {
        Ok(())
    } else {
        Err(GenderViolation {
            restriction,
            gender,
        })
    }
}

/// Checks whether `gender` may be placed in `block`.
///
/// # Errors
///
/// Returns a [`GenderViolation`] if the block's restriction does not permit
/// the gender.
pub const fn check_block(block: &Block, gender: Gender) -> Result<(), GenderViolation> {
    check(block.gender_restriction, gender)
}
