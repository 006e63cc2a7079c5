//! The NOL ledger service: validation, policy application, and transactional
//! batch assembly over a [`NolRepository`].
//!
//! Every operation takes explicit business identifiers — there is no ambient
//! tenant or user state.  "Today" comes from a [`Clock`] so date-sensitive
//! behavior (expiration checks, alert tiers, filed dates) is deterministic
//! under test.

use std::collections::BTreeMap;
use std::collections::HashMap;

use chrono::{Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{debug, info};

use crate::db::{
    NolRepository, RepositoryError, VintageBalanceUpdate, VintageCarrybackUpdate,
    VintageExpirationUpdate,
};
use crate::engine::{self, AlertPolicy, DeductionPlanner};
use crate::models::{
    EntityType, Jurisdiction, NewExpirationAlert, NewNolCarryback, NewNolSchedule, NewNolUsage,
    NewNolVintage, NolCarryback, NolExpirationAlert, NolSchedule, NolUsage, NolVintage,
    PriorYearReturn, RefundStatus, SelectionMethod, VintageDetail,
};
use crate::policy::{self, carryback as carryback_policy, common::round_half_up};

/// Errors surfaced by ledger operations.  Validation failures never leave
/// partial state behind; repository failures roll back the whole batch.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LedgerError {
    #[error("loss amount must be positive, got {0}")]
    NonPositiveLoss(Decimal),

    #[error("deduction amount must be positive, got {0}")]
    NonPositiveDeduction(Decimal),

    #[error("requested deduction {requested} exceeds maximum allowed {maximum}")]
    DeductionExceedsMaximum {
        requested: Decimal,
        maximum: Decimal,
    },

    #[error("vintage {vintage_id} (year {tax_year}) is outside the carryback election window")]
    CarrybackIneligible { vintage_id: i64, tax_year: i32 },

    #[error("vintage {0} has already been carried back")]
    AlreadyCarriedBack(i64),

    #[error("vintage {0} has no remaining balance to carry back")]
    NoRemainingBalance(i64),

    #[error("carryback requires between 1 and {max} prior years, got {got}")]
    InvalidPriorYearCount { got: usize, max: usize },

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Source of "today" for date-sensitive rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Clock {
    #[default]
    System,
    Fixed(NaiveDate),
}

impl Clock {
    pub fn today(&self) -> NaiveDate {
        match self {
            Self::System => Utc::now().date_naive(),
            Self::Fixed(date) => *date,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateVintageRequest {
    pub business_id: i64,
    pub tax_year: i32,
    pub loss_amount: Decimal,
    pub jurisdiction: Jurisdiction,
    pub entity_type: EntityType,
    pub apportionment_pct: Option<Decimal>,
    pub municipality_code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyDeductionRequest {
    pub business_id: i64,
    pub return_id: i64,
    pub usage_year: i32,
    pub taxable_income_before_nol: Decimal,
    pub requested_amount: Decimal,
    /// Percentage rate used only for tax-savings reporting on usage records.
    pub tax_rate: Decimal,
    pub jurisdiction: Option<Jurisdiction>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildScheduleRequest {
    pub business_id: i64,
    pub return_id: i64,
    pub tax_year: i32,
    pub taxable_income_before_nol: Decimal,
    pub new_nol: Decimal,
    pub jurisdiction: Jurisdiction,
}

/// NOL lifecycle and multi-year balance ledger.
pub struct NolLedger<R> {
    repo: R,
    clock: Clock,
    alert_policy: AlertPolicy,
}

impl<R: NolRepository> NolLedger<R> {
    pub fn new(repo: R) -> Self {
        Self {
            repo,
            clock: Clock::System,
            alert_policy: AlertPolicy::default(),
        }
    }

    /// Fixes "today" for deterministic tests and backdated batch runs.
    pub fn with_clock(
        repo: R,
        clock: Clock,
    ) -> Self {
        Self {
            repo,
            clock,
            alert_policy: AlertPolicy::default(),
        }
    }

    pub fn repo(&self) -> &R {
        &self.repo
    }

    /// Validates and records a new loss-year vintage.
    ///
    /// Sub-federal jurisdictions with a supplied apportionment percentage
    /// store the apportioned share; the expiration policy decides the
    /// horizon.  Pre-reform vintages get an initial expiration alert in the
    /// same transaction when they land inside the alert window.
    pub async fn create_vintage(
        &self,
        request: CreateVintageRequest,
    ) -> Result<NolVintage, LedgerError> {
        if request.loss_amount <= Decimal::ZERO {
            return Err(LedgerError::NonPositiveLoss(request.loss_amount));
        }

        let amount = policy::apportioned_amount(
            request.loss_amount,
            request.jurisdiction,
            request.apportionment_pct,
        );
        let expiration_date = policy::expiration_date(request.tax_year);
        let carryforward_years = policy::carryforward_years(request.tax_year);

        let vintage = NewNolVintage {
            business_id: request.business_id,
            tax_year: request.tax_year,
            jurisdiction: request.jurisdiction,
            municipality_code: request.municipality_code,
            entity_type: request.entity_type,
            original_amount: amount,
            expiration_date,
            carryforward_years,
        };

        // vintage_id is assigned by the store inside the same transaction.
        let alert = expiration_date.and_then(|date| {
            self.alert_for(request.business_id, 0, date, amount)
        });

        let created = self.repo.create_vintage(vintage, alert).await?;
        info!(
            vintage_id = created.id,
            business_id = created.business_id,
            tax_year = created.tax_year,
            amount = %created.original_amount,
            "created NOL vintage"
        );
        Ok(created)
    }

    /// Sum of positive balances over the business's vintages, excluding
    /// vintages whose expiration date has passed.  Expired-but-unswept
    /// vintages keep their stored balance until an explicit sweep; they
    /// simply stop counting as available.
    pub async fn available_balance(
        &self,
        business_id: i64,
        jurisdiction: Option<Jurisdiction>,
    ) -> Result<Decimal, LedgerError> {
        let today = self.clock.today();
        let vintages = self.repo.list_vintages(business_id, jurisdiction).await?;
        Ok(vintages
            .iter()
            .filter(|v| v.is_available(today))
            .map(|v| v.current_balance)
            .sum())
    }

    /// Maximum deduction for a usage year; pure policy, exposed here for
    /// callers that already hold the available balance.
    pub fn maximum_deduction(
        taxable_income_before_nol: Decimal,
        available_balance: Decimal,
        usage_year: i32,
    ) -> Decimal {
        policy::maximum_deduction(taxable_income_before_nol, available_balance, usage_year)
    }

    /// Applies a requested deduction against the business's vintages in
    /// FIFO order and returns the usage records written.
    ///
    /// The whole batch — every balance decrement, every usage insert, every
    /// alert refresh — commits in one transaction or not at all.
    pub async fn apply_deduction(
        &self,
        request: ApplyDeductionRequest,
    ) -> Result<Vec<NolUsage>, LedgerError> {
        if request.requested_amount <= Decimal::ZERO {
            return Err(LedgerError::NonPositiveDeduction(request.requested_amount));
        }

        let today = self.clock.today();
        let vintages = self
            .repo
            .list_vintages(request.business_id, request.jurisdiction)
            .await?;
        let eligible: Vec<NolVintage> = vintages
            .into_iter()
            .filter(|v| v.is_available(today))
            .collect();

        let planner = DeductionPlanner::new(&eligible);
        let available = planner.available_balance();
        let maximum = policy::maximum_deduction(
            request.taxable_income_before_nol,
            available,
            request.usage_year,
        );
        if request.requested_amount > maximum {
            return Err(LedgerError::DeductionExceedsMaximum {
                requested: request.requested_amount,
                maximum,
            });
        }

        let plan = planner.plan(request.requested_amount);
        let limitation_percentage = policy::limitation_percentage(request.usage_year);
        let taxable_income_after_nol =
            request.taxable_income_before_nol - request.requested_amount;

        let mut updates = Vec::with_capacity(plan.draws.len());
        let mut usages = Vec::with_capacity(plan.draws.len());
        let mut alerts = Vec::new();
        for draw in &plan.draws {
            updates.push(VintageBalanceUpdate {
                vintage_id: draw.vintage_id,
                draw_amount: draw.amount,
                expected_version: draw.expected_version,
            });
            usages.push(NewNolUsage {
                vintage_id: draw.vintage_id,
                return_id: request.return_id,
                usage_year: request.usage_year,
                taxable_income_before_nol: request.taxable_income_before_nol,
                taxable_income_after_nol,
                limitation_percentage,
                maximum_deduction: maximum,
                amount_used: draw.amount,
                tax_savings: round_half_up(
                    draw.amount * request.tax_rate / Decimal::ONE_HUNDRED,
                ),
                selection_method: SelectionMethod::Fifo,
            });

            let vintage = eligible
                .iter()
                .find(|v| v.id == draw.vintage_id)
                .ok_or(RepositoryError::NotFound)?;
            if let Some(date) = vintage.expiration_date {
                if let Some(alert) = self.alert_for(
                    request.business_id,
                    draw.vintage_id,
                    date,
                    draw.balance_after,
                ) {
                    alerts.push(alert);
                }
            }
        }

        debug!(
            business_id = request.business_id,
            return_id = request.return_id,
            requested = %request.requested_amount,
            vintages_drawn = updates.len(),
            "applying NOL deduction"
        );
        let written = self
            .repo
            .record_application(&updates, &usages, &alerts)
            .await?;
        Ok(written)
    }

    /// Elects a carryback for a vintage against 1–5 caller-supplied prior
    /// years, oldest first, and returns the carryback records written.
    ///
    /// A vintage may be carried back at most once; the election is consumed
    /// even when every candidate year is skipped.
    pub async fn elect_carryback(
        &self,
        vintage_id: i64,
        prior_years: &BTreeMap<i32, PriorYearReturn>,
    ) -> Result<Vec<NolCarryback>, LedgerError> {
        if prior_years.is_empty() || prior_years.len() > carryback_policy::MAX_CARRYBACK_YEARS {
            return Err(LedgerError::InvalidPriorYearCount {
                got: prior_years.len(),
                max: carryback_policy::MAX_CARRYBACK_YEARS,
            });
        }

        let vintage = self.repo.get_vintage(vintage_id).await?;
        if !carryback_policy::is_eligible_origination_year(vintage.tax_year) {
            return Err(LedgerError::CarrybackIneligible {
                vintage_id,
                tax_year: vintage.tax_year,
            });
        }
        if vintage.carried_back {
            return Err(LedgerError::AlreadyCarriedBack(vintage_id));
        }
        if vintage.current_balance <= Decimal::ZERO {
            return Err(LedgerError::NoRemainingBalance(vintage_id));
        }

        let plan =
            engine::plan_carryback(vintage.tax_year, vintage.current_balance, prior_years);

        let filed_date = self.clock.today();
        let records: Vec<NewNolCarryback> = plan
            .draws
            .iter()
            .map(|draw| NewNolCarryback {
                vintage_id,
                carryback_year: draw.carryback_year,
                prior_return_id: draw.prior_return_id,
                prior_taxable_income: draw.prior_taxable_income,
                amount_applied: draw.amount_applied,
                prior_tax_rate: draw.prior_tax_rate,
                refund_amount: draw.refund_amount,
                refund_status: RefundStatus::Claimed,
                filed_date,
            })
            .collect();

        let update = VintageCarrybackUpdate {
            vintage_id,
            carryback_amount: plan.total_applied,
            carryback_refund: plan.total_refund,
            remaining_balance: plan.remaining_balance,
            expected_version: vintage.version,
        };

        let alert = vintage.expiration_date.and_then(|date| {
            self.alert_for(vintage.business_id, vintage_id, date, plan.remaining_balance)
        });

        info!(
            vintage_id,
            years_touched = records.len(),
            applied = %plan.total_applied,
            refund = %plan.total_refund,
            "electing NOL carryback"
        );
        let written = self.repo.record_carryback(&update, &records, alert).await?;
        Ok(written)
    }

    /// Builds and persists the yearly schedule rollup.
    ///
    /// The beginning balance comes from the prior year's stored ending
    /// balance.  The first tracked year reconstructs it from the stored
    /// balances of pre-existing vintages still alive at the start of the
    /// year plus the deductions already drawn for this return, so the
    /// rollup identity holds even when tracking starts late.
    /// Expired amounts are flagged here, not zeroed — that is
    /// [`Self::sweep_expired_vintages`]'s job.
    pub async fn build_schedule(
        &self,
        request: BuildScheduleRequest,
    ) -> Result<NolSchedule, LedgerError> {
        let deduction_taken: Decimal = self
            .repo
            .list_usages_for_return(request.return_id)
            .await?
            .iter()
            .map(|u| u.amount_used)
            .sum();

        let vintages = self
            .repo
            .list_vintages(request.business_id, Some(request.jurisdiction))
            .await?;
        let expired_amount = engine::expiring_within_year(&vintages, request.tax_year);

        let beginning_balance = match self
            .repo
            .get_schedule(request.business_id, request.tax_year - 1, request.jurisdiction)
            .await
        {
            Ok(prior) => prior.ending_balance,
            Err(RepositoryError::NotFound) => {
                // Vintages that expired in an earlier year are already out
                // of the pool, swept or not; only vintages still alive at
                // the start of the year count toward the beginning balance.
                let pre_existing: Decimal = vintages
                    .iter()
                    .filter(|v| v.tax_year < request.tax_year)
                    .filter(|v| {
                        v.expiration_date
                            .is_none_or(|d| d.year() >= request.tax_year)
                    })
                    .map(|v| v.current_balance)
                    .sum();
                pre_existing + deduction_taken
            }
            Err(e) => return Err(e.into()),
        };

        let summary = engine::summarize(
            beginning_balance,
            request.new_nol,
            deduction_taken,
            expired_amount,
        );

        let schedule = self
            .repo
            .create_schedule(NewNolSchedule {
                business_id: request.business_id,
                return_id: request.return_id,
                tax_year: request.tax_year,
                jurisdiction: request.jurisdiction,
                beginning_balance: summary.beginning_balance,
                new_nol: summary.new_nol,
                total_available: summary.total_available,
                deduction_taken: summary.deduction_taken,
                expired_amount: summary.expired_amount,
                ending_balance: summary.ending_balance,
            })
            .await?;
        Ok(schedule)
    }

    /// Per-vintage projection for a business and year, including how much
    /// each vintage contributed to that year's deductions.
    pub async fn vintage_breakdown(
        &self,
        business_id: i64,
        tax_year: i32,
    ) -> Result<Vec<VintageDetail>, LedgerError> {
        let vintages = self.repo.list_vintages(business_id, None).await?;
        let usages = self
            .repo
            .list_usages_for_year(business_id, tax_year)
            .await?;

        let mut used_this_year: HashMap<i64, Decimal> = HashMap::new();
        for usage in &usages {
            *used_this_year.entry(usage.vintage_id).or_default() += usage.amount_used;
        }

        Ok(vintages
            .into_iter()
            .map(|v| {
                let used = used_this_year
                    .get(&v.id)
                    .copied()
                    .unwrap_or(Decimal::ZERO);
                VintageDetail {
                    vintage_id: v.id,
                    tax_year: v.tax_year,
                    jurisdiction: v.jurisdiction,
                    original_amount: v.original_amount,
                    current_balance: v.current_balance,
                    used_amount: v.used_amount,
                    expired_amount: v.expired_amount,
                    expiration_date: v.expiration_date,
                    carried_back: v.carried_back,
                    used_this_year: used,
                }
            })
            .collect())
    }

    /// Cross-year consistency check: this year's stored beginning balance
    /// against the prior year's stored ending balance.  Mismatches are
    /// logged and reported as `false`, never auto-corrected.  A year with
    /// no predecessor reconciles trivially.
    pub async fn reconcile(
        &self,
        business_id: i64,
        tax_year: i32,
        jurisdiction: Jurisdiction,
    ) -> Result<bool, LedgerError> {
        let current = self
            .repo
            .get_schedule(business_id, tax_year, jurisdiction)
            .await?;
        let prior = match self
            .repo
            .get_schedule(business_id, tax_year - 1, jurisdiction)
            .await
        {
            Ok(prior) => prior,
            Err(RepositoryError::NotFound) => return Ok(true),
            Err(e) => return Err(e.into()),
        };

        Ok(engine::reconciles(
            prior.ending_balance,
            current.beginning_balance,
        ))
    }

    /// Zeroes the balance of every vintage whose expiration date has passed
    /// as of `as_of`, moving it into the expired bucket.  Returns the
    /// vintages as updated.  One transaction for the whole sweep.
    pub async fn sweep_expired_vintages(
        &self,
        business_id: i64,
        as_of: NaiveDate,
    ) -> Result<Vec<NolVintage>, LedgerError> {
        let vintages = self.repo.list_vintages(business_id, None).await?;
        let updates: Vec<VintageExpirationUpdate> = vintages
            .iter()
            .filter(|v| v.is_expired(as_of) && v.current_balance > Decimal::ZERO)
            .map(|v| VintageExpirationUpdate {
                vintage_id: v.id,
                expired_amount: v.current_balance,
                expected_version: v.version,
            })
            .collect();

        if updates.is_empty() {
            return Ok(Vec::new());
        }

        info!(
            business_id,
            %as_of,
            vintages_swept = updates.len(),
            "sweeping expired NOL vintages"
        );
        let swept = self.repo.record_expiration(&updates).await?;
        Ok(swept)
    }

    pub async fn list_alerts(
        &self,
        business_id: i64,
    ) -> Result<Vec<NolExpirationAlert>, LedgerError> {
        Ok(self.repo.list_alerts(business_id).await?)
    }

    /// Dismisses an alert.  Dismissal does not touch ledger state and
    /// survives later balance refreshes.
    pub async fn dismiss_alert(
        &self,
        alert_id: i64,
    ) -> Result<(), LedgerError> {
        Ok(self.repo.dismiss_alert(alert_id).await?)
    }

    /// Marks a claimed carryback refund as paid.
    pub async fn mark_refund_paid(
        &self,
        carryback_id: i64,
        refund_date: NaiveDate,
    ) -> Result<(), LedgerError> {
        Ok(self.repo.mark_refund_paid(carryback_id, refund_date).await?)
    }

    /// Alert payload for a vintage expiring on `date`, or None when the
    /// vintage sits outside the alert window (existing alerts are then left
    /// untouched, not deleted).
    fn alert_for(
        &self,
        business_id: i64,
        vintage_id: i64,
        expiration_date: NaiveDate,
        remaining_balance: Decimal,
    ) -> Option<NewExpirationAlert> {
        let years = engine::years_to_expiration(expiration_date, self.clock.today());
        engine::severity_for(years, &self.alert_policy).map(|severity| NewExpirationAlert {
            vintage_id,
            business_id,
            expiration_date,
            remaining_balance,
            severity,
        })
    }
}
