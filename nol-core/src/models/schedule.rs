use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::jurisdiction::Jurisdiction;

/// Yearly NOL rollup for a business.
///
/// Invariant: `ending = beginning + new_nol − deduction − expired`.  The
/// cross-year invariant (this year's beginning equals last year's ending)
/// is validated by the reconcile operation, never enforced destructively.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NolSchedule {
    pub id: i64,
    pub business_id: i64,
    pub return_id: i64,
    pub tax_year: i32,
    pub jurisdiction: Jurisdiction,

    pub beginning_balance: Decimal,
    pub new_nol: Decimal,
    pub total_available: Decimal,
    pub deduction_taken: Decimal,
    pub expired_amount: Decimal,
    pub ending_balance: Decimal,

    pub created_at: DateTime<Utc>,
}

impl NolSchedule {
    pub fn is_balanced(&self) -> bool {
        self.ending_balance
            == self.beginning_balance + self.new_nol - self.deduction_taken - self.expired_amount
    }
}

/// For creating new schedules (no id or timestamp).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewNolSchedule {
    pub business_id: i64,
    pub return_id: i64,
    pub tax_year: i32,
    pub jurisdiction: Jurisdiction,
    pub beginning_balance: Decimal,
    pub new_nol: Decimal,
    pub total_available: Decimal,
    pub deduction_taken: Decimal,
    pub expired_amount: Decimal,
    pub ending_balance: Decimal,
}
