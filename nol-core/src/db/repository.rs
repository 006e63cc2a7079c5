use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::models::{
    Jurisdiction, NewExpirationAlert, NewNolCarryback, NewNolSchedule, NewNolUsage, NewNolVintage,
    NolCarryback, NolExpirationAlert, NolSchedule, NolUsage, NolVintage,
};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("Record not found")]
    NotFound,

    #[error("Concurrent modification: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// A planned balance draw against one vintage: `current_balance` down,
/// `used_amount` up.  `expected_version` guards against lost updates; a
/// stale version fails the whole batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VintageBalanceUpdate {
    pub vintage_id: i64,
    pub draw_amount: Decimal,
    pub expected_version: i64,
}

/// A sweep update: `current_balance` down, `expired_amount` up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VintageExpirationUpdate {
    pub vintage_id: i64,
    pub expired_amount: Decimal,
    pub expected_version: i64,
}

/// Vintage-side effects of a carryback election, applied atomically with
/// the carryback records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VintageCarrybackUpdate {
    pub vintage_id: i64,
    pub carryback_amount: Decimal,
    pub carryback_refund: Decimal,
    pub remaining_balance: Decimal,
    pub expected_version: i64,
}

/// Durable store for the NOL ledger.
///
/// Every mutating batch method executes as a single transaction: either all
/// vintage updates and record inserts in the call commit, or none do.
/// Version checks that fail surface as [`RepositoryError::Conflict`] and
/// roll the batch back.
#[async_trait]
pub trait NolRepository: Send + Sync {
    // Vintages (never deleted, only zeroed)

    /// Insert a vintage and, optionally, its initial expiration alert in
    /// the same transaction.  The alert's `vintage_id` is replaced with the
    /// id of the newly created vintage.
    async fn create_vintage(
        &self,
        vintage: NewNolVintage,
        alert: Option<NewExpirationAlert>,
    ) -> Result<NolVintage, RepositoryError>;

    async fn get_vintage(&self, id: i64) -> Result<NolVintage, RepositoryError>;

    async fn list_vintages(
        &self,
        business_id: i64,
        jurisdiction: Option<Jurisdiction>,
    ) -> Result<Vec<NolVintage>, RepositoryError>;

    /// Apply a batch of deduction draws and insert the matching usage
    /// records in one transaction.  Alert refreshes ride along so a draw
    /// and its alert snapshot can never diverge.
    async fn record_application(
        &self,
        updates: &[VintageBalanceUpdate],
        usages: &[NewNolUsage],
        alerts: &[NewExpirationAlert],
    ) -> Result<Vec<NolUsage>, RepositoryError>;

    /// Apply a carryback election: vintage carryback fields plus one record
    /// per prior year touched, in one transaction.
    async fn record_carryback(
        &self,
        update: &VintageCarrybackUpdate,
        records: &[NewNolCarryback],
        alert: Option<NewExpirationAlert>,
    ) -> Result<Vec<NolCarryback>, RepositoryError>;

    /// Zero expired balances into `expired_amount` in one transaction,
    /// returning the vintages as updated.
    async fn record_expiration(
        &self,
        updates: &[VintageExpirationUpdate],
    ) -> Result<Vec<NolVintage>, RepositoryError>;

    // Usage history (append-only)
    async fn list_usages_for_return(
        &self,
        return_id: i64,
    ) -> Result<Vec<NolUsage>, RepositoryError>;

    async fn list_usages_for_year(
        &self,
        business_id: i64,
        usage_year: i32,
    ) -> Result<Vec<NolUsage>, RepositoryError>;

    // Carrybacks
    async fn get_carryback(&self, id: i64) -> Result<NolCarryback, RepositoryError>;

    async fn list_carrybacks_for_vintage(
        &self,
        vintage_id: i64,
    ) -> Result<Vec<NolCarryback>, RepositoryError>;

    /// Claimed → paid transition; the only permitted carryback mutation.
    async fn mark_refund_paid(
        &self,
        carryback_id: i64,
        refund_date: NaiveDate,
    ) -> Result<(), RepositoryError>;

    // Schedules
    async fn create_schedule(
        &self,
        schedule: NewNolSchedule,
    ) -> Result<NolSchedule, RepositoryError>;

    async fn get_schedule(
        &self,
        business_id: i64,
        tax_year: i32,
        jurisdiction: Jurisdiction,
    ) -> Result<NolSchedule, RepositoryError>;

    // Alerts (derived; upsert preserves dismissal)
    async fn upsert_alert(
        &self,
        alert: NewExpirationAlert,
    ) -> Result<NolExpirationAlert, RepositoryError>;

    async fn list_alerts(
        &self,
        business_id: i64,
    ) -> Result<Vec<NolExpirationAlert>, RepositoryError>;

    async fn dismiss_alert(&self, alert_id: i64) -> Result<(), RepositoryError>;
}
