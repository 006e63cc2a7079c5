//! Carryback election rules.
//!
//! Only vintages originating inside a fixed three-year band may be carried
//! back, and each may be carried back at most once, against at most the
//! five years immediately preceding origination.

use std::ops::RangeInclusive;

/// Origination years eligible for a carryback election.
pub const ELIGIBLE_ORIGINATION_YEARS: RangeInclusive<i32> = 2018..=2020;

/// How far back a carryback may reach relative to the origination year.
pub const CARRYBACK_HORIZON_YEARS: i32 = 5;

/// Maximum number of prior years a single election may touch.
pub const MAX_CARRYBACK_YEARS: usize = 5;

pub fn is_eligible_origination_year(origination_year: i32) -> bool {
    ELIGIBLE_ORIGINATION_YEARS.contains(&origination_year)
}

/// Whether `prior_year` falls inside the carryback horizon: strictly before
/// origination and no more than [`CARRYBACK_HORIZON_YEARS`] before it.
pub fn is_within_horizon(
    origination_year: i32,
    prior_year: i32,
) -> bool {
    prior_year < origination_year && prior_year >= origination_year - CARRYBACK_HORIZON_YEARS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eligibility_band_is_inclusive() {
        assert!(is_eligible_origination_year(2018));
        assert!(is_eligible_origination_year(2019));
        assert!(is_eligible_origination_year(2020));
        assert!(!is_eligible_origination_year(2017));
        assert!(!is_eligible_origination_year(2021));
    }

    #[test]
    fn horizon_covers_five_prior_years() {
        assert!(is_within_horizon(2020, 2015));
        assert!(is_within_horizon(2020, 2019));
        assert!(!is_within_horizon(2020, 2014));
    }

    #[test]
    fn origination_year_itself_is_not_a_carryback_target() {
        assert!(!is_within_horizon(2020, 2020));
        assert!(!is_within_horizon(2020, 2021));
    }
}
