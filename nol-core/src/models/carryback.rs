use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RefundStatus {
    Claimed,
    Paid,
}

impl RefundStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Claimed => "CLAIMED",
            Self::Paid => "PAID",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "CLAIMED" => Some(Self::Claimed),
            "PAID" => Some(Self::Paid),
            _ => None,
        }
    }
}

/// One prior-year application of a vintage via carryback election.
///
/// Immutable once written except the claimed → paid status transition and
/// the refund date that accompanies it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NolCarryback {
    pub id: i64,
    pub vintage_id: i64,
    /// The prior tax year the NOL was applied against.
    pub carryback_year: i32,
    pub prior_return_id: i64,

    pub prior_taxable_income: Decimal,
    pub amount_applied: Decimal,
    pub prior_tax_rate: Decimal,
    /// Capped at the tax actually paid in the prior year.
    pub refund_amount: Decimal,

    pub refund_status: RefundStatus,
    pub filed_date: NaiveDate,
    pub refund_date: Option<NaiveDate>,

    pub created_at: DateTime<Utc>,
}

/// For creating new carryback records (no id or timestamp).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewNolCarryback {
    pub vintage_id: i64,
    pub carryback_year: i32,
    pub prior_return_id: i64,
    pub prior_taxable_income: Decimal,
    pub amount_applied: Decimal,
    pub prior_tax_rate: Decimal,
    pub refund_amount: Decimal,
    pub refund_status: RefundStatus,
    pub filed_date: NaiveDate,
}

/// Caller-supplied prior-year return data for a carryback election.
/// The ledger never fetches this itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorYearReturn {
    pub return_id: i64,
    pub taxable_income: Decimal,
    /// Percentage, e.g. `21` for a 21% rate.
    pub tax_rate: Decimal,
    pub tax_paid: Decimal,
}
