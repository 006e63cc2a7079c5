use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Severity tier for an expiration alert; closer to expiration = more severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AlertSeverity {
    Warning,
    High,
    Critical,
}

impl AlertSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Warning => "WARNING",
            Self::High => "HIGH",
            Self::Critical => "CRITICAL",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "WARNING" => Some(Self::Warning),
            "HIGH" => Some(Self::High),
            "CRITICAL" => Some(Self::Critical),
            _ => None,
        }
    }
}

/// Derived, non-authoritative notice that a vintage is nearing expiration.
///
/// Recalculated whenever the vintage balance changes.  Dismissal is a user
/// action that sticks: later balance updates refresh the stored balance and
/// severity but never resurrect a dismissed alert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NolExpirationAlert {
    pub id: i64,
    pub vintage_id: i64,
    pub business_id: i64,
    pub expiration_date: NaiveDate,
    /// Snapshot of the vintage balance at the last recalculation.
    pub remaining_balance: Decimal,
    pub severity: AlertSeverity,
    pub dismissed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// For creating or refreshing alerts (one per vintage, upserted).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewExpirationAlert {
    pub vintage_id: i64,
    pub business_id: i64,
    pub expiration_date: NaiveDate,
    pub remaining_balance: Decimal,
    pub severity: AlertSeverity,
}
