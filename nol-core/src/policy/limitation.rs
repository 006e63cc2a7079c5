//! Percentage-of-income limitation on current-year NOL deductions.
//!
//! Post-reform usage years cap the deduction at 80% of taxable income;
//! pre-reform years allow a full offset.  Modeled as pure lookups over an
//! explicit tax-year input so the rule can be unit-tested independently of
//! the ledger and swapped if the law changes.

use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;

use crate::policy::POST_REFORM_YEAR;
use crate::policy::common::{min, round_half_up};

/// Maximum share of taxable income that NOL may offset in `usage_year`,
/// as a percentage (80 or 100).
pub fn limitation_percentage(usage_year: i32) -> Decimal {
    if usage_year >= POST_REFORM_YEAR {
        Decimal::from_u8(80).unwrap_or_default()
    } else {
        Decimal::ONE_HUNDRED
    }
}

/// Maximum deduction for a usage year: the smaller of the available vintage
/// balance and the income-percentage cap.
///
/// # Examples
///
/// ```
/// use rust_decimal_macros::dec;
/// use nol_core::policy::limitation::maximum_deduction;
///
/// // 80% cap binds
/// assert_eq!(maximum_deduction(dec!(300000), dec!(500000), 2023), dec!(240000.00));
/// // balance binds
/// assert_eq!(maximum_deduction(dec!(300000), dec!(100000), 2023), dec!(100000));
/// // pre-reform year, 100% cap
/// assert_eq!(maximum_deduction(dec!(300000), dec!(500000), 2017), dec!(300000.00));
/// ```
pub fn maximum_deduction(
    taxable_income_before_nol: Decimal,
    available_balance: Decimal,
    usage_year: i32,
) -> Decimal {
    let income_cap = round_half_up(
        taxable_income_before_nol * limitation_percentage(usage_year) / Decimal::ONE_HUNDRED,
    );
    min(available_balance, income_cap)
}
