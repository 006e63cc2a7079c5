use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::jurisdiction::{EntityType, Jurisdiction};

/// One loss-generating tax year, tracked as its own balance for life.
///
/// A vintage is an audit-grade ledger entry: it is never deleted, only
/// zeroed.  The balance moves in exactly three ways — deduction draws
/// (`current_balance` down, `used_amount` up), carryback draws
/// (`current_balance` down, carryback fields set), and expiration sweeps
/// (`current_balance` down, `expired_amount` up).  At every point
/// `original_amount = current_balance + used_amount + expired_amount`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NolVintage {
    pub id: i64,
    pub business_id: i64,
    pub tax_year: i32,
    pub jurisdiction: Jurisdiction,
    pub municipality_code: Option<String>,
    pub entity_type: EntityType,

    /// Loss amount after jurisdictional apportionment.  Immutable once set.
    pub original_amount: Decimal,
    pub current_balance: Decimal,
    pub used_amount: Decimal,
    pub expired_amount: Decimal,

    /// None = indefinite carryforward (post-reform vintages).
    pub expiration_date: Option<NaiveDate>,
    pub carryforward_years: Option<i32>,

    pub carried_back: bool,
    pub carryback_amount: Decimal,
    pub carryback_refund: Decimal,

    /// Optimistic concurrency counter; bumped on every balance mutation.
    pub version: i64,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl NolVintage {
    /// Ledger invariant: the original amount is fully accounted for by the
    /// remaining balance plus everything used and expired.
    pub fn is_balanced(&self) -> bool {
        self.original_amount == self.current_balance + self.used_amount + self.expired_amount
    }

    /// Whether the vintage's expiration date has passed as of `as_of`.
    /// An expired vintage keeps its balance until an explicit sweep.
    pub fn is_expired(&self, as_of: NaiveDate) -> bool {
        self.expiration_date.is_some_and(|d| d < as_of)
    }

    /// Whether this vintage contributes to the available balance:
    /// positive balance and not past its expiration date.
    pub fn is_available(&self, as_of: NaiveDate) -> bool {
        self.current_balance > Decimal::ZERO && !self.is_expired(as_of)
    }
}

/// For creating new vintages (no id, version, or timestamps).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewNolVintage {
    pub business_id: i64,
    pub tax_year: i32,
    pub jurisdiction: Jurisdiction,
    pub municipality_code: Option<String>,
    pub entity_type: EntityType,
    pub original_amount: Decimal,
    pub expiration_date: Option<NaiveDate>,
    pub carryforward_years: Option<i32>,
}

/// Read-only per-vintage projection for UI breakdowns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VintageDetail {
    pub vintage_id: i64,
    pub tax_year: i32,
    pub jurisdiction: Jurisdiction,
    pub original_amount: Decimal,
    pub current_balance: Decimal,
    pub used_amount: Decimal,
    pub expired_amount: Decimal,
    pub expiration_date: Option<NaiveDate>,
    pub carried_back: bool,
    /// Amount drawn from this vintage during the requested year, if any.
    pub used_this_year: Decimal,
}
