//! Carryback planning: oldest eligible prior year absorbs NOL first.
//!
//! The carryback analogue of FIFO.  Pure planning over caller-supplied
//! prior-year return data; skip conditions (outside the horizon,
//! non-positive prior income) are logged and skipped, never escalated.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::models::PriorYearReturn;
use crate::policy::carryback::is_within_horizon;
use crate::policy::common::{min, round_half_up};

/// One planned prior-year application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CarrybackDraw {
    pub carryback_year: i32,
    pub prior_return_id: i64,
    pub prior_taxable_income: Decimal,
    pub amount_applied: Decimal,
    pub prior_tax_rate: Decimal,
    /// `applied × rate / 100`, capped at the tax actually paid that year.
    pub refund_amount: Decimal,
}

/// Result of planning a carryback election.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CarrybackPlan {
    pub draws: Vec<CarrybackDraw>,
    pub total_applied: Decimal,
    pub total_refund: Decimal,
    /// Vintage balance left after the election.
    pub remaining_balance: Decimal,
}

/// Plans a carryback of `balance` for a vintage originating in
/// `origination_year` against the supplied prior years.
///
/// Prior years are consumed in ascending order (the `BTreeMap` ordering).
/// Years outside the five-year horizon and years with non-positive taxable
/// income are skipped with a warning.  Planning stops once the balance is
/// exhausted.
pub fn plan_carryback(
    origination_year: i32,
    balance: Decimal,
    prior_years: &BTreeMap<i32, PriorYearReturn>,
) -> CarrybackPlan {
    let mut remaining = balance;
    let mut total_refund = Decimal::ZERO;
    let mut draws = Vec::new();

    for (&year, prior) in prior_years {
        if remaining <= Decimal::ZERO {
            break;
        }

        if !is_within_horizon(origination_year, year) {
            warn!(
                origination_year,
                carryback_year = year,
                "prior year outside carryback horizon, skipping"
            );
            continue;
        }

        if prior.taxable_income <= Decimal::ZERO {
            warn!(
                carryback_year = year,
                taxable_income = %prior.taxable_income,
                "prior year has no taxable income to absorb NOL, skipping"
            );
            continue;
        }

        let applied = min(remaining, prior.taxable_income);
        let computed_refund =
            round_half_up(applied * prior.tax_rate / Decimal::ONE_HUNDRED);
        let refund = min(computed_refund, prior.tax_paid);

        remaining -= applied;
        total_refund += refund;

        draws.push(CarrybackDraw {
            carryback_year: year,
            prior_return_id: prior.return_id,
            prior_taxable_income: prior.taxable_income,
            amount_applied: applied,
            prior_tax_rate: prior.tax_rate,
            refund_amount: refund,
        });
    }

    CarrybackPlan {
        total_applied: balance - remaining,
        total_refund,
        remaining_balance: remaining,
        draws,
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;

    fn prior(
        return_id: i64,
        income: Decimal,
        rate: Decimal,
        paid: Decimal,
    ) -> PriorYearReturn {
        PriorYearReturn {
            return_id,
            taxable_income: income,
            tax_rate: rate,
            tax_paid: paid,
        }
    }

    #[test]
    fn oldest_prior_year_absorbs_first() {
        let mut years = BTreeMap::new();
        years.insert(2018, prior(18, dec!(120000), dec!(21), dec!(25200)));
        years.insert(2016, prior(16, dec!(80000), dec!(35), dec!(28000)));
        years.insert(2017, prior(17, dec!(90000), dec!(35), dec!(31500)));

        let plan = plan_carryback(2020, dec!(150000), &years);

        assert_eq!(plan.draws.len(), 2);
        assert_eq!(plan.draws[0].carryback_year, 2016);
        assert_eq!(plan.draws[0].amount_applied, dec!(80000));
        assert_eq!(plan.draws[1].carryback_year, 2017);
        assert_eq!(plan.draws[1].amount_applied, dec!(70000));
        assert_eq!(plan.remaining_balance, dec!(0));
    }

    #[test]
    fn stops_once_balance_is_exhausted() {
        let mut years = BTreeMap::new();
        years.insert(2016, prior(16, dec!(50000), dec!(35), dec!(17500)));
        years.insert(2017, prior(17, dec!(50000), dec!(35), dec!(17500)));
        years.insert(2018, prior(18, dec!(50000), dec!(21), dec!(10500)));

        let plan = plan_carryback(2020, dec!(50000), &years);

        assert_eq!(plan.draws.len(), 1);
        assert_eq!(plan.draws[0].carryback_year, 2016);
        assert_eq!(plan.total_applied, dec!(50000));
    }

    #[test]
    fn refund_never_exceeds_tax_paid() {
        // 100000 * 35% = 35000 computed, but only 12000 was paid.
        let mut years = BTreeMap::new();
        years.insert(2017, prior(17, dec!(100000), dec!(35), dec!(12000)));

        let plan = plan_carryback(2020, dec!(100000), &years);

        assert_eq!(plan.draws[0].refund_amount, dec!(12000));
        assert_eq!(plan.total_refund, dec!(12000));
    }

    #[test]
    fn refund_uses_rate_when_below_tax_paid() {
        let mut years = BTreeMap::new();
        years.insert(2017, prior(17, dec!(100000), dec!(21), dec!(50000)));

        let plan = plan_carryback(2020, dec!(60000), &years);

        // 60000 * 21% = 12600
        assert_eq!(plan.draws[0].refund_amount, dec!(12600.00));
    }

    #[test]
    fn applies_at_most_prior_year_income() {
        let mut years = BTreeMap::new();
        years.insert(2017, prior(17, dec!(40000), dec!(35), dec!(14000)));

        let plan = plan_carryback(2020, dec!(100000), &years);

        assert_eq!(plan.draws[0].amount_applied, dec!(40000));
        assert_eq!(plan.remaining_balance, dec!(60000));
    }

    #[test]
    fn skips_years_outside_the_horizon() {
        let mut years = BTreeMap::new();
        years.insert(2014, prior(14, dec!(100000), dec!(35), dec!(35000)));
        years.insert(2016, prior(16, dec!(100000), dec!(35), dec!(35000)));

        let plan = plan_carryback(2020, dec!(50000), &years);

        assert_eq!(plan.draws.len(), 1);
        assert_eq!(plan.draws[0].carryback_year, 2016);
    }

    #[test]
    fn skips_years_with_non_positive_income() {
        let mut years = BTreeMap::new();
        years.insert(2016, prior(16, dec!(-20000), dec!(35), dec!(0)));
        years.insert(2017, prior(17, dec!(0), dec!(35), dec!(0)));
        years.insert(2018, prior(18, dec!(90000), dec!(21), dec!(18900)));

        let plan = plan_carryback(2020, dec!(50000), &years);

        assert_eq!(plan.draws.len(), 1);
        assert_eq!(plan.draws[0].carryback_year, 2018);
    }

    #[test]
    fn all_skipped_years_leave_balance_untouched() {
        let mut years = BTreeMap::new();
        years.insert(2013, prior(13, dec!(100000), dec!(35), dec!(35000)));

        let plan = plan_carryback(2020, dec!(50000), &years);

        assert!(plan.draws.is_empty());
        assert_eq!(plan.total_applied, dec!(0));
        assert_eq!(plan.remaining_balance, dec!(50000));
    }

    #[test]
    fn accumulates_refund_across_years() {
        let mut years = BTreeMap::new();
        years.insert(2016, prior(16, dec!(40000), dec!(35), dec!(14000)));
        years.insert(2017, prior(17, dec!(40000), dec!(35), dec!(5000)));

        let plan = plan_carryback(2020, dec!(80000), &years);

        // 2016: 40000 * 35% = 14000 (paid covers it)
        // 2017: 40000 * 35% = 14000 computed, capped at 5000 paid
        assert_eq!(plan.total_refund, dec!(19000.00));
    }
}
