use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use nol_core::{
    AlertSeverity, EntityType, Jurisdiction, NewExpirationAlert, NewNolCarryback, NewNolSchedule,
    NewNolUsage, NewNolVintage, NolCarryback, NolExpirationAlert, NolRepository, NolSchedule,
    NolUsage, NolVintage, RefundStatus, RepositoryError, SelectionMethod,
    db::{VintageBalanceUpdate, VintageCarrybackUpdate, VintageExpirationUpdate},
};
use sqlx::{Row, sqlite::SqlitePool};

use crate::decimal::{decimal_to_f64, get_decimal};

pub struct SqliteRepository {
    pool: SqlitePool,
}

impl SqliteRepository {
    pub async fn new(database_url: &str) -> Result<Self> {
        let pool = SqlitePool::connect(database_url)
            .await
            .with_context(|| format!("Failed to connect to database: {}", database_url))?;
        Ok(Self { pool })
    }

    pub async fn new_with_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("Failed to run database migrations")?;
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn db_err(e: sqlx::Error) -> RepositoryError {
    RepositoryError::Database(e.to_string())
}

fn parse_jurisdiction(code: &str) -> Result<Jurisdiction, RepositoryError> {
    Jurisdiction::parse(code)
        .ok_or_else(|| RepositoryError::Database(format!("Invalid jurisdiction code: {}", code)))
}

fn row_to_vintage(row: &sqlx::sqlite::SqliteRow) -> Result<NolVintage, RepositoryError> {
    let jurisdiction_str: String = row.try_get("jurisdiction").map_err(db_err)?;
    let entity_type_str: String = row.try_get("entity_type").map_err(db_err)?;
    let entity_type = EntityType::parse(&entity_type_str).ok_or_else(|| {
        RepositoryError::Database(format!("Invalid entity type: {}", entity_type_str))
    })?;

    Ok(NolVintage {
        id: row.try_get("id").map_err(db_err)?,
        business_id: row.try_get("business_id").map_err(db_err)?,
        tax_year: row.try_get("tax_year").map_err(db_err)?,
        jurisdiction: parse_jurisdiction(&jurisdiction_str)?,
        municipality_code: row.try_get("municipality_code").map_err(db_err)?,
        entity_type,
        original_amount: get_decimal(row, "original_amount")?,
        current_balance: get_decimal(row, "current_balance")?,
        used_amount: get_decimal(row, "used_amount")?,
        expired_amount: get_decimal(row, "expired_amount")?,
        expiration_date: row
            .try_get::<Option<NaiveDate>, _>("expiration_date")
            .map_err(db_err)?,
        carryforward_years: row.try_get("carryforward_years").map_err(db_err)?,
        carried_back: row.try_get("carried_back").map_err(db_err)?,
        carryback_amount: get_decimal(row, "carryback_amount")?,
        carryback_refund: get_decimal(row, "carryback_refund")?,
        version: row.try_get("version").map_err(db_err)?,
        created_at: row
            .try_get::<DateTime<Utc>, _>("created_at")
            .map_err(db_err)?,
        updated_at: row
            .try_get::<DateTime<Utc>, _>("updated_at")
            .map_err(db_err)?,
    })
}

fn row_to_usage(row: &sqlx::sqlite::SqliteRow) -> Result<NolUsage, RepositoryError> {
    let method_str: String = row.try_get("selection_method").map_err(db_err)?;
    let selection_method = SelectionMethod::parse(&method_str).ok_or_else(|| {
        RepositoryError::Database(format!("Invalid selection method: {}", method_str))
    })?;

    Ok(NolUsage {
        id: row.try_get("id").map_err(db_err)?,
        vintage_id: row.try_get("vintage_id").map_err(db_err)?,
        return_id: row.try_get("return_id").map_err(db_err)?,
        usage_year: row.try_get("usage_year").map_err(db_err)?,
        taxable_income_before_nol: get_decimal(row, "taxable_income_before_nol")?,
        taxable_income_after_nol: get_decimal(row, "taxable_income_after_nol")?,
        limitation_percentage: get_decimal(row, "limitation_percentage")?,
        maximum_deduction: get_decimal(row, "maximum_deduction")?,
        amount_used: get_decimal(row, "amount_used")?,
        tax_savings: get_decimal(row, "tax_savings")?,
        selection_method,
        created_at: row
            .try_get::<DateTime<Utc>, _>("created_at")
            .map_err(db_err)?,
    })
}

fn row_to_carryback(row: &sqlx::sqlite::SqliteRow) -> Result<NolCarryback, RepositoryError> {
    let status_str: String = row.try_get("refund_status").map_err(db_err)?;
    let refund_status = RefundStatus::parse(&status_str).ok_or_else(|| {
        RepositoryError::Database(format!("Invalid refund status: {}", status_str))
    })?;

    Ok(NolCarryback {
        id: row.try_get("id").map_err(db_err)?,
        vintage_id: row.try_get("vintage_id").map_err(db_err)?,
        carryback_year: row.try_get("carryback_year").map_err(db_err)?,
        prior_return_id: row.try_get("prior_return_id").map_err(db_err)?,
        prior_taxable_income: get_decimal(row, "prior_taxable_income")?,
        amount_applied: get_decimal(row, "amount_applied")?,
        prior_tax_rate: get_decimal(row, "prior_tax_rate")?,
        refund_amount: get_decimal(row, "refund_amount")?,
        refund_status,
        filed_date: row.try_get::<NaiveDate, _>("filed_date").map_err(db_err)?,
        refund_date: row
            .try_get::<Option<NaiveDate>, _>("refund_date")
            .map_err(db_err)?,
        created_at: row
            .try_get::<DateTime<Utc>, _>("created_at")
            .map_err(db_err)?,
    })
}

fn row_to_schedule(row: &sqlx::sqlite::SqliteRow) -> Result<NolSchedule, RepositoryError> {
    let jurisdiction_str: String = row.try_get("jurisdiction").map_err(db_err)?;

    Ok(NolSchedule {
        id: row.try_get("id").map_err(db_err)?,
        business_id: row.try_get("business_id").map_err(db_err)?,
        return_id: row.try_get("return_id").map_err(db_err)?,
        tax_year: row.try_get("tax_year").map_err(db_err)?,
        jurisdiction: parse_jurisdiction(&jurisdiction_str)?,
        beginning_balance: get_decimal(row, "beginning_balance")?,
        new_nol: get_decimal(row, "new_nol")?,
        total_available: get_decimal(row, "total_available")?,
        deduction_taken: get_decimal(row, "deduction_taken")?,
        expired_amount: get_decimal(row, "expired_amount")?,
        ending_balance: get_decimal(row, "ending_balance")?,
        created_at: row
            .try_get::<DateTime<Utc>, _>("created_at")
            .map_err(db_err)?,
    })
}

fn row_to_alert(row: &sqlx::sqlite::SqliteRow) -> Result<NolExpirationAlert, RepositoryError> {
    let severity_str: String = row.try_get("severity").map_err(db_err)?;
    let severity = AlertSeverity::parse(&severity_str).ok_or_else(|| {
        RepositoryError::Database(format!("Invalid alert severity: {}", severity_str))
    })?;

    Ok(NolExpirationAlert {
        id: row.try_get("id").map_err(db_err)?,
        vintage_id: row.try_get("vintage_id").map_err(db_err)?,
        business_id: row.try_get("business_id").map_err(db_err)?,
        expiration_date: row
            .try_get::<NaiveDate, _>("expiration_date")
            .map_err(db_err)?,
        remaining_balance: get_decimal(row, "remaining_balance")?,
        severity,
        dismissed: row.try_get("dismissed").map_err(db_err)?,
        created_at: row
            .try_get::<DateTime<Utc>, _>("created_at")
            .map_err(db_err)?,
        updated_at: row
            .try_get::<DateTime<Utc>, _>("updated_at")
            .map_err(db_err)?,
    })
}

const VINTAGE_COLUMNS: &str = "id, business_id, tax_year, jurisdiction, municipality_code,
        entity_type, original_amount, current_balance, used_amount, expired_amount,
        expiration_date, carryforward_years, carried_back, carryback_amount, carryback_refund,
        version, created_at, updated_at";

const USAGE_COLUMNS: &str = "id, vintage_id, return_id, usage_year, taxable_income_before_nol,
        taxable_income_after_nol, limitation_percentage, maximum_deduction, amount_used,
        tax_savings, selection_method, created_at";

const CARRYBACK_COLUMNS: &str = "id, vintage_id, carryback_year, prior_return_id,
        prior_taxable_income, amount_applied, prior_tax_rate, refund_amount, refund_status,
        filed_date, refund_date, created_at";

const SCHEDULE_COLUMNS: &str = "id, business_id, return_id, tax_year, jurisdiction,
        beginning_balance, new_nol, total_available, deduction_taken, expired_amount,
        ending_balance, created_at";

const ALERT_COLUMNS: &str = "id, vintage_id, business_id, expiration_date, remaining_balance,
        severity, dismissed, created_at, updated_at";

impl SqliteRepository {
    /// Decrement `current_balance` into `used_amount` with an optimistic
    /// version check.  Zero rows affected means the row changed under us (or
    /// does not exist) and fails the enclosing transaction.
    async fn apply_balance_update(
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        update: &VintageBalanceUpdate,
        now: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE nol_vintages SET
                current_balance = current_balance - ?,
                used_amount = used_amount + ?,
                version = version + 1,
                updated_at = ?
             WHERE id = ? AND version = ?",
        )
        .bind(decimal_to_f64(update.draw_amount))
        .bind(decimal_to_f64(update.draw_amount))
        .bind(now)
        .bind(update.vintage_id)
        .bind(update.expected_version)
        .execute(&mut **tx)
        .await
        .map_err(db_err)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::Conflict(format!(
                "vintage {} was modified concurrently",
                update.vintage_id
            )));
        }
        Ok(())
    }

    async fn upsert_alert_in_tx(
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        alert: &NewExpirationAlert,
        now: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO nol_expiration_alerts (
                vintage_id, business_id, expiration_date, remaining_balance,
                severity, dismissed, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, 0, ?, ?)
            ON CONFLICT(vintage_id) DO UPDATE SET
                remaining_balance = excluded.remaining_balance,
                severity = excluded.severity,
                updated_at = excluded.updated_at",
        )
        .bind(alert.vintage_id)
        .bind(alert.business_id)
        .bind(alert.expiration_date)
        .bind(decimal_to_f64(alert.remaining_balance))
        .bind(alert.severity.as_str())
        .bind(now)
        .bind(now)
        .execute(&mut **tx)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn insert_usage_in_tx(
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        usage: &NewNolUsage,
        now: DateTime<Utc>,
    ) -> Result<i64, RepositoryError> {
        let result = sqlx::query(
            "INSERT INTO nol_usages (
                vintage_id, return_id, usage_year, taxable_income_before_nol,
                taxable_income_after_nol, limitation_percentage, maximum_deduction,
                amount_used, tax_savings, selection_method, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(usage.vintage_id)
        .bind(usage.return_id)
        .bind(usage.usage_year)
        .bind(decimal_to_f64(usage.taxable_income_before_nol))
        .bind(decimal_to_f64(usage.taxable_income_after_nol))
        .bind(decimal_to_f64(usage.limitation_percentage))
        .bind(decimal_to_f64(usage.maximum_deduction))
        .bind(decimal_to_f64(usage.amount_used))
        .bind(decimal_to_f64(usage.tax_savings))
        .bind(usage.selection_method.as_str())
        .bind(now)
        .execute(&mut **tx)
        .await
        .map_err(db_err)?;
        Ok(result.last_insert_rowid())
    }

    async fn get_usage(&self, id: i64) -> Result<NolUsage, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM nol_usages WHERE id = ?",
            USAGE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?
        .ok_or(RepositoryError::NotFound)?;

        row_to_usage(&row)
    }
}

#[async_trait]
impl NolRepository for SqliteRepository {
    async fn create_vintage(
        &self,
        vintage: NewNolVintage,
        alert: Option<NewExpirationAlert>,
    ) -> Result<NolVintage, RepositoryError> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let result = sqlx::query(
            "INSERT INTO nol_vintages (
                business_id, tax_year, jurisdiction, municipality_code, entity_type,
                original_amount, current_balance, used_amount, expired_amount,
                expiration_date, carryforward_years, carried_back, carryback_amount,
                carryback_refund, version, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, 0, 0, ?, ?, 0, 0, 0, 1, ?, ?)",
        )
        .bind(vintage.business_id)
        .bind(vintage.tax_year)
        .bind(vintage.jurisdiction.as_str())
        .bind(&vintage.municipality_code)
        .bind(vintage.entity_type.as_str())
        .bind(decimal_to_f64(vintage.original_amount))
        .bind(decimal_to_f64(vintage.original_amount))
        .bind(vintage.expiration_date)
        .bind(vintage.carryforward_years)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;

        let id = result.last_insert_rowid();
        if let Some(mut alert) = alert {
            alert.vintage_id = id;
            Self::upsert_alert_in_tx(&mut tx, &alert, now).await?;
        }
        tx.commit().await.map_err(db_err)?;

        self.get_vintage(id).await
    }

    async fn get_vintage(&self, id: i64) -> Result<NolVintage, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM nol_vintages WHERE id = ?",
            VINTAGE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?
        .ok_or(RepositoryError::NotFound)?;

        row_to_vintage(&row)
    }

    async fn list_vintages(
        &self,
        business_id: i64,
        jurisdiction: Option<Jurisdiction>,
    ) -> Result<Vec<NolVintage>, RepositoryError> {
        let rows = match jurisdiction {
            Some(j) => {
                sqlx::query(&format!(
                    "SELECT {} FROM nol_vintages
                     WHERE business_id = ? AND jurisdiction = ?
                     ORDER BY tax_year, id",
                    VINTAGE_COLUMNS
                ))
                .bind(business_id)
                .bind(j.as_str())
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query(&format!(
                    "SELECT {} FROM nol_vintages WHERE business_id = ? ORDER BY tax_year, id",
                    VINTAGE_COLUMNS
                ))
                .bind(business_id)
                .fetch_all(&self.pool)
                .await
            }
        }
        .map_err(db_err)?;

        rows.iter().map(row_to_vintage).collect()
    }

    async fn record_application(
        &self,
        updates: &[VintageBalanceUpdate],
        usages: &[NewNolUsage],
        alerts: &[NewExpirationAlert],
    ) -> Result<Vec<NolUsage>, RepositoryError> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        for update in updates {
            Self::apply_balance_update(&mut tx, update, now).await?;
        }
        let mut usage_ids = Vec::with_capacity(usages.len());
        for usage in usages {
            usage_ids.push(Self::insert_usage_in_tx(&mut tx, usage, now).await?);
        }
        for alert in alerts {
            Self::upsert_alert_in_tx(&mut tx, alert, now).await?;
        }
        tx.commit().await.map_err(db_err)?;

        let mut written = Vec::with_capacity(usage_ids.len());
        for id in usage_ids {
            written.push(self.get_usage(id).await?);
        }
        Ok(written)
    }

    async fn record_carryback(
        &self,
        update: &VintageCarrybackUpdate,
        records: &[NewNolCarryback],
        alert: Option<NewExpirationAlert>,
    ) -> Result<Vec<NolCarryback>, RepositoryError> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let result = sqlx::query(
            "UPDATE nol_vintages SET
                carried_back = 1,
                carryback_amount = ?,
                carryback_refund = ?,
                used_amount = used_amount + ?,
                current_balance = ?,
                version = version + 1,
                updated_at = ?
             WHERE id = ? AND version = ? AND carried_back = 0",
        )
        .bind(decimal_to_f64(update.carryback_amount))
        .bind(decimal_to_f64(update.carryback_refund))
        .bind(decimal_to_f64(update.carryback_amount))
        .bind(decimal_to_f64(update.remaining_balance))
        .bind(now)
        .bind(update.vintage_id)
        .bind(update.expected_version)
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::Conflict(format!(
                "vintage {} was modified concurrently",
                update.vintage_id
            )));
        }

        let mut record_ids = Vec::with_capacity(records.len());
        for record in records {
            let result = sqlx::query(
                "INSERT INTO nol_carrybacks (
                    vintage_id, carryback_year, prior_return_id, prior_taxable_income,
                    amount_applied, prior_tax_rate, refund_amount, refund_status,
                    filed_date, refund_date, created_at
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, NULL, ?)",
            )
            .bind(record.vintage_id)
            .bind(record.carryback_year)
            .bind(record.prior_return_id)
            .bind(decimal_to_f64(record.prior_taxable_income))
            .bind(decimal_to_f64(record.amount_applied))
            .bind(decimal_to_f64(record.prior_tax_rate))
            .bind(decimal_to_f64(record.refund_amount))
            .bind(record.refund_status.as_str())
            .bind(record.filed_date)
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
            record_ids.push(result.last_insert_rowid());
        }

        if let Some(alert) = alert {
            Self::upsert_alert_in_tx(&mut tx, &alert, now).await?;
        }
        tx.commit().await.map_err(db_err)?;

        let mut written = Vec::with_capacity(record_ids.len());
        for id in record_ids {
            written.push(self.get_carryback(id).await?);
        }
        Ok(written)
    }

    async fn record_expiration(
        &self,
        updates: &[VintageExpirationUpdate],
    ) -> Result<Vec<NolVintage>, RepositoryError> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        for update in updates {
            let result = sqlx::query(
                "UPDATE nol_vintages SET
                    current_balance = current_balance - ?,
                    expired_amount = expired_amount + ?,
                    version = version + 1,
                    updated_at = ?
                 WHERE id = ? AND version = ?",
            )
            .bind(decimal_to_f64(update.expired_amount))
            .bind(decimal_to_f64(update.expired_amount))
            .bind(now)
            .bind(update.vintage_id)
            .bind(update.expected_version)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;

            if result.rows_affected() == 0 {
                return Err(RepositoryError::Conflict(format!(
                    "vintage {} was modified concurrently",
                    update.vintage_id
                )));
            }
        }
        tx.commit().await.map_err(db_err)?;

        let mut swept = Vec::with_capacity(updates.len());
        for update in updates {
            swept.push(self.get_vintage(update.vintage_id).await?);
        }
        Ok(swept)
    }

    async fn list_usages_for_return(
        &self,
        return_id: i64,
    ) -> Result<Vec<NolUsage>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM nol_usages WHERE return_id = ? ORDER BY id",
            USAGE_COLUMNS
        ))
        .bind(return_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.iter().map(row_to_usage).collect()
    }

    async fn list_usages_for_year(
        &self,
        business_id: i64,
        usage_year: i32,
    ) -> Result<Vec<NolUsage>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT u.id, u.vintage_id, u.return_id, u.usage_year,
                    u.taxable_income_before_nol, u.taxable_income_after_nol,
                    u.limitation_percentage, u.maximum_deduction, u.amount_used,
                    u.tax_savings, u.selection_method, u.created_at
             FROM nol_usages u
             JOIN nol_vintages v ON v.id = u.vintage_id
             WHERE v.business_id = ? AND u.usage_year = ?
             ORDER BY u.id",
        )
        .bind(business_id)
        .bind(usage_year)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.iter().map(row_to_usage).collect()
    }

    async fn get_carryback(&self, id: i64) -> Result<NolCarryback, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM nol_carrybacks WHERE id = ?",
            CARRYBACK_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?
        .ok_or(RepositoryError::NotFound)?;

        row_to_carryback(&row)
    }

    async fn list_carrybacks_for_vintage(
        &self,
        vintage_id: i64,
    ) -> Result<Vec<NolCarryback>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM nol_carrybacks WHERE vintage_id = ? ORDER BY carryback_year",
            CARRYBACK_COLUMNS
        ))
        .bind(vintage_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.iter().map(row_to_carryback).collect()
    }

    async fn mark_refund_paid(
        &self,
        carryback_id: i64,
        refund_date: NaiveDate,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE nol_carrybacks SET refund_status = ?, refund_date = ?
             WHERE id = ? AND refund_status = ?",
        )
        .bind(RefundStatus::Paid.as_str())
        .bind(refund_date)
        .bind(carryback_id)
        .bind(RefundStatus::Claimed.as_str())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        if result.rows_affected() == 0 {
            // Distinguish a missing record from one already paid.
            self.get_carryback(carryback_id).await?;
            return Err(RepositoryError::Conflict(format!(
                "carryback {} refund is already paid",
                carryback_id
            )));
        }
        Ok(())
    }

    async fn create_schedule(
        &self,
        schedule: NewNolSchedule,
    ) -> Result<NolSchedule, RepositoryError> {
        let now = Utc::now();

        let result = sqlx::query(
            "INSERT INTO nol_schedules (
                business_id, return_id, tax_year, jurisdiction, beginning_balance,
                new_nol, total_available, deduction_taken, expired_amount,
                ending_balance, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(schedule.business_id)
        .bind(schedule.return_id)
        .bind(schedule.tax_year)
        .bind(schedule.jurisdiction.as_str())
        .bind(decimal_to_f64(schedule.beginning_balance))
        .bind(decimal_to_f64(schedule.new_nol))
        .bind(decimal_to_f64(schedule.total_available))
        .bind(decimal_to_f64(schedule.deduction_taken))
        .bind(decimal_to_f64(schedule.expired_amount))
        .bind(decimal_to_f64(schedule.ending_balance))
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        let id = result.last_insert_rowid();
        let row = sqlx::query(&format!(
            "SELECT {} FROM nol_schedules WHERE id = ?",
            SCHEDULE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?
        .ok_or(RepositoryError::NotFound)?;

        row_to_schedule(&row)
    }

    async fn get_schedule(
        &self,
        business_id: i64,
        tax_year: i32,
        jurisdiction: Jurisdiction,
    ) -> Result<NolSchedule, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM nol_schedules
             WHERE business_id = ? AND tax_year = ? AND jurisdiction = ?",
            SCHEDULE_COLUMNS
        ))
        .bind(business_id)
        .bind(tax_year)
        .bind(jurisdiction.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?
        .ok_or(RepositoryError::NotFound)?;

        row_to_schedule(&row)
    }

    async fn upsert_alert(
        &self,
        alert: NewExpirationAlert,
    ) -> Result<NolExpirationAlert, RepositoryError> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await.map_err(db_err)?;
        Self::upsert_alert_in_tx(&mut tx, &alert, now).await?;
        tx.commit().await.map_err(db_err)?;

        let row = sqlx::query(&format!(
            "SELECT {} FROM nol_expiration_alerts WHERE vintage_id = ?",
            ALERT_COLUMNS
        ))
        .bind(alert.vintage_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?
        .ok_or(RepositoryError::NotFound)?;

        row_to_alert(&row)
    }

    async fn list_alerts(
        &self,
        business_id: i64,
    ) -> Result<Vec<NolExpirationAlert>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM nol_expiration_alerts
             WHERE business_id = ?
             ORDER BY expiration_date, id",
            ALERT_COLUMNS
        ))
        .bind(business_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.iter().map(row_to_alert).collect()
    }

    async fn dismiss_alert(&self, alert_id: i64) -> Result<(), RepositoryError> {
        let result =
            sqlx::query("UPDATE nol_expiration_alerts SET dismissed = 1, updated_at = ? WHERE id = ?")
                .bind(Utc::now())
                .bind(alert_id)
                .execute(&self.pool)
                .await
                .map_err(db_err)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
