//! Yearly schedule arithmetic and cross-year reconciliation.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::models::NolVintage;

/// Computed rollup amounts for one schedule year, before persistence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleSummary {
    pub beginning_balance: Decimal,
    pub new_nol: Decimal,
    pub total_available: Decimal,
    pub deduction_taken: Decimal,
    pub expired_amount: Decimal,
    pub ending_balance: Decimal,
}

/// Rolls beginning balance, new NOL, deductions, and expirations into the
/// yearly summary.  `ending = beginning + new − deduction − expired`.
pub fn summarize(
    beginning_balance: Decimal,
    new_nol: Decimal,
    deduction_taken: Decimal,
    expired_amount: Decimal,
) -> ScheduleSummary {
    let total_available = beginning_balance + new_nol;
    ScheduleSummary {
        beginning_balance,
        new_nol,
        total_available,
        deduction_taken,
        expired_amount,
        ending_balance: total_available - deduction_taken - expired_amount,
    }
}

/// Sum of balances on vintages whose expiration date falls inside the tax
/// year and whose balance is still positive.
///
/// This flags the amount expiring; it does not zero anything out.  Zeroing
/// is the explicit expiration sweep's job.
pub fn expiring_within_year(
    vintages: &[NolVintage],
    tax_year: i32,
) -> Decimal {
    vintages
        .iter()
        .filter(|v| v.current_balance > Decimal::ZERO)
        .filter(|v| {
            v.expiration_date
                .is_some_and(|d| in_tax_year(d, tax_year))
        })
        .map(|v| v.current_balance)
        .sum()
}

fn in_tax_year(
    date: NaiveDate,
    tax_year: i32,
) -> bool {
    use chrono::Datelike;
    date.year() == tax_year
}

/// Cross-year check: this year's beginning balance must equal the prior
/// year's ending balance.  Mismatches are reported, never repaired.
pub fn reconciles(
    prior_ending: Decimal,
    beginning: Decimal,
) -> bool {
    if prior_ending != beginning {
        warn!(
            %prior_ending,
            %beginning,
            "schedule beginning balance does not match prior year ending balance"
        );
        return false;
    }
    true
}
