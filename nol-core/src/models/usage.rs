use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// How a vintage was chosen for a deduction draw.
///
/// Only FIFO (oldest origination year first) is implemented; the tag is
/// stored on every usage record so the ordering policy is auditable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SelectionMethod {
    Fifo,
}

impl SelectionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fifo => "FIFO",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "FIFO" => Some(Self::Fifo),
            _ => None,
        }
    }
}

/// One application of a vintage's balance against a specific year's return.
/// Append-only: never updated or deleted once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NolUsage {
    pub id: i64,
    pub vintage_id: i64,
    pub return_id: i64,
    pub usage_year: i32,

    pub taxable_income_before_nol: Decimal,
    /// Income after the *total* requested deduction, not after this
    /// vintage's draw alone; identical on every record in a batch.
    pub taxable_income_after_nol: Decimal,
    pub limitation_percentage: Decimal,
    pub maximum_deduction: Decimal,
    pub amount_used: Decimal,
    pub tax_savings: Decimal,

    pub selection_method: SelectionMethod,

    pub created_at: DateTime<Utc>,
}

/// For creating new usage records (no id or timestamp).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewNolUsage {
    pub vintage_id: i64,
    pub return_id: i64,
    pub usage_year: i32,
    pub taxable_income_before_nol: Decimal,
    pub taxable_income_after_nol: Decimal,
    pub limitation_percentage: Decimal,
    pub maximum_deduction: Decimal,
    pub amount_used: Decimal,
    pub tax_savings: Decimal,
    pub selection_method: SelectionMethod,
}
