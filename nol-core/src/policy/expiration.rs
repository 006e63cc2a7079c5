//! Expiration horizon for NOL vintages, keyed by origination year.
//!
//! Vintages originating at or after the post-reform year carry forward
//! indefinitely.  Earlier vintages expire 20 years after origination, on
//! December 31.  The rule is jurisdiction-independent: state and municipal
//! vintages follow the same cutoff as federal.

use chrono::NaiveDate;

use crate::policy::POST_REFORM_YEAR;

/// Carryforward horizon for pre-reform vintages.
pub const PRE_REFORM_HORIZON_YEARS: i32 = 20;

/// Number of years the vintage may be carried forward, or None for
/// indefinite.
pub fn carryforward_years(origination_year: i32) -> Option<i32> {
    if origination_year >= POST_REFORM_YEAR {
        None
    } else {
        Some(PRE_REFORM_HORIZON_YEARS)
    }
}

/// Expiration date for a vintage, or None for indefinite carryforward.
/// Pre-reform vintages expire on Dec 31 of (origination + 20).
pub fn expiration_date(origination_year: i32) -> Option<NaiveDate> {
    carryforward_years(origination_year)
        .and_then(|horizon| NaiveDate::from_ymd_opt(origination_year + horizon, 12, 31))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn pre_reform_vintage_expires_after_20_years() {
        assert_eq!(carryforward_years(2015), Some(20));
        assert_eq!(
            expiration_date(2015),
            NaiveDate::from_ymd_opt(2035, 12, 31)
        );
    }

    #[test]
    fn last_pre_reform_year_still_expires() {
        assert_eq!(carryforward_years(2017), Some(20));
        assert_eq!(
            expiration_date(2017),
            NaiveDate::from_ymd_opt(2037, 12, 31)
        );
    }

    #[test]
    fn post_reform_vintage_is_indefinite() {
        assert_eq!(carryforward_years(2018), None);
        assert_eq!(expiration_date(2018), None);
    }

    #[test]
    fn later_post_reform_vintage_is_indefinite() {
        assert_eq!(carryforward_years(2020), None);
        assert_eq!(expiration_date(2020), None);
    }
}
