//! FIFO deduction planning over a set of NOL vintages.
//!
//! Pure planning: given the vintages eligible for a usage year and a
//! requested deduction, produce per-vintage draws without touching storage.
//! Vintages are consumed oldest origination year first, ties broken by
//! vintage id.  A vintage with nothing drawn produces no record.
//!
//! # Example
//!
//! ```
//! use rust_decimal_macros::dec;
//! use nol_core::engine::DeductionPlanner;
//! # use chrono::Utc;
//! # use nol_core::models::{EntityType, Jurisdiction, NolVintage};
//! # fn vintage(id: i64, year: i32, balance: rust_decimal::Decimal) -> NolVintage {
//! #     NolVintage {
//! #         id, business_id: 1, tax_year: year,
//! #         jurisdiction: Jurisdiction::Federal, municipality_code: None,
//! #         entity_type: EntityType::CCorporation,
//! #         original_amount: balance, current_balance: balance,
//! #         used_amount: dec!(0), expired_amount: dec!(0),
//! #         expiration_date: None, carryforward_years: None,
//! #         carried_back: false, carryback_amount: dec!(0),
//! #         carryback_refund: dec!(0), version: 1,
//! #         created_at: Utc::now(), updated_at: Utc::now(),
//! #     }
//! # }
//!
//! let vintages = vec![
//!     vintage(1, 2016, dec!(100000)),
//!     vintage(2, 2018, dec!(150000)),
//!     vintage(3, 2020, dec!(200000)),
//! ];
//!
//! let plan = DeductionPlanner::new(&vintages).plan(dec!(175000));
//!
//! assert_eq!(plan.draws.len(), 2);
//! assert_eq!(plan.draws[0].amount, dec!(100000));
//! assert_eq!(plan.draws[1].amount, dec!(75000));
//! assert_eq!(plan.total_drawn, dec!(175000));
//! ```

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::NolVintage;
use crate::policy::common::min;

/// One planned draw against a single vintage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VintageDraw {
    pub vintage_id: i64,
    pub origination_year: i32,
    /// Amount drawn from this vintage; always positive, never more than the
    /// vintage's current balance.
    pub amount: Decimal,
    /// Balance remaining on the vintage after this draw.
    pub balance_after: Decimal,
    /// Vintage version the draw was planned against, for the optimistic
    /// concurrency check at commit time.
    pub expected_version: i64,
}

/// Result of planning a deduction across vintages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeductionPlan {
    pub draws: Vec<VintageDraw>,
    pub total_drawn: Decimal,
    /// Requested amount that could not be allocated (zero when the vintages
    /// cover the full request).
    pub unallocated: Decimal,
}

/// FIFO planner over a slice of vintages.
#[derive(Debug, Clone)]
pub struct DeductionPlanner<'a> {
    vintages: &'a [NolVintage],
}

impl<'a> DeductionPlanner<'a> {
    pub fn new(vintages: &'a [NolVintage]) -> Self {
        Self { vintages }
    }

    /// Sum of positive current balances across the planner's vintages.
    pub fn available_balance(&self) -> Decimal {
        self.vintages
            .iter()
            .filter(|v| v.current_balance > Decimal::ZERO)
            .map(|v| v.current_balance)
            .sum()
    }

    /// Walk vintages oldest-first, drawing `min(remaining, balance)` from
    /// each until the requested amount is fully allocated.
    ///
    /// The plan never draws more than `requested` in total and never takes a
    /// vintage below zero.  Callers are responsible for validating the
    /// request against the limitation policy before planning.
    pub fn plan(
        &self,
        requested: Decimal,
    ) -> DeductionPlan {
        let mut ordered: Vec<&NolVintage> = self
            .vintages
            .iter()
            .filter(|v| v.current_balance > Decimal::ZERO)
            .collect();
        ordered.sort_by_key(|v| (v.tax_year, v.id));

        let mut remaining = requested;
        let mut draws = Vec::new();

        for vintage in ordered {
            if remaining <= Decimal::ZERO {
                break;
            }

            let amount = min(remaining, vintage.current_balance);
            remaining -= amount;

            draws.push(VintageDraw {
                vintage_id: vintage.id,
                origination_year: vintage.tax_year,
                amount,
                balance_after: vintage.current_balance - amount,
                expected_version: vintage.version,
            });
        }

        DeductionPlan {
            total_drawn: requested - remaining,
            unallocated: remaining,
            draws,
        }
    }
}
