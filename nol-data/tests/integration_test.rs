//! Integration tests for vintage loading using the actual database backend.

use chrono::NaiveDate;
use nol_core::{Clock, Jurisdiction, LedgerError, NolLedger, NolRepository};
use nol_data::{VintageLoader, VintageLoaderError};
use nol_db_sqlite::SqliteRepository;
use pretty_assertions::assert_eq;
use rust_decimal_macros::dec;
use sqlx::sqlite::SqlitePoolOptions;

const TEST_CSV: &str = include_str!("../test-data/vintages.csv");

async fn setup_test_ledger() -> NolLedger<SqliteRepository> {
    let pool = SqlitePoolOptions::new()
        .connect("sqlite::memory:")
        .await
        .expect("Failed to create in-memory database");

    let repo = SqliteRepository::new_with_pool(pool).await;
    repo.run_migrations()
        .await
        .expect("Failed to run migrations");

    let today = NaiveDate::from_ymd_opt(2022, 6, 15).unwrap();
    NolLedger::with_clock(repo, Clock::Fixed(today))
}

#[tokio::test]
async fn test_load_all_vintages() {
    let ledger = setup_test_ledger().await;

    let records = VintageLoader::parse(TEST_CSV.as_bytes()).expect("Failed to parse CSV");
    let created = VintageLoader::load(&ledger, &records)
        .await
        .expect("Failed to load vintages");

    assert_eq!(created, 4);
    let business_1 = ledger
        .repo()
        .list_vintages(1, None)
        .await
        .expect("Should list vintages");
    assert_eq!(business_1.len(), 3);
}

#[tokio::test]
async fn test_load_applies_expiration_policy() {
    let ledger = setup_test_ledger().await;

    let records = VintageLoader::parse(TEST_CSV.as_bytes()).expect("Failed to parse CSV");
    VintageLoader::load(&ledger, &records)
        .await
        .expect("Failed to load vintages");

    let vintages = ledger
        .repo()
        .list_vintages(1, Some(Jurisdiction::Federal))
        .await
        .expect("Should list vintages");

    // Pre-reform vintage gets the 20-year horizon, post-reform does not.
    assert_eq!(vintages[0].tax_year, 2015);
    assert_eq!(
        vintages[0].expiration_date,
        NaiveDate::from_ymd_opt(2035, 12, 31)
    );
    assert_eq!(vintages[0].carryforward_years, Some(20));
    assert_eq!(vintages[1].tax_year, 2019);
    assert_eq!(vintages[1].expiration_date, None);
    assert_eq!(vintages[1].carryforward_years, None);
}

#[tokio::test]
async fn test_load_applies_apportionment() {
    let ledger = setup_test_ledger().await;

    let records = VintageLoader::parse(TEST_CSV.as_bytes()).expect("Failed to parse CSV");
    VintageLoader::load(&ledger, &records)
        .await
        .expect("Failed to load vintages");

    let state = ledger
        .repo()
        .list_vintages(1, Some(Jurisdiction::State))
        .await
        .expect("Should list vintages");
    assert_eq!(state.len(), 1);
    assert_eq!(state[0].original_amount, dec!(300000.00));

    let municipal = ledger
        .repo()
        .list_vintages(2, Some(Jurisdiction::Municipal))
        .await
        .expect("Should list vintages");
    assert_eq!(municipal.len(), 1);
    assert_eq!(municipal[0].original_amount, dec!(6250.00));
    assert_eq!(municipal[0].municipality_code, Some("NYC".to_string()));
}

#[tokio::test]
async fn test_load_invalid_jurisdiction() {
    let ledger = setup_test_ledger().await;

    let csv = "business_id,tax_year,jurisdiction,entity_type,loss_amount,apportionment_pct,municipality_code\n1,2019,NOPE,C,100000,,";
    let records = VintageLoader::parse(csv.as_bytes()).expect("Failed to parse CSV");

    let result = VintageLoader::load(&ledger, &records).await;

    assert_eq!(
        result,
        Err(VintageLoaderError::InvalidJurisdiction("NOPE".to_string()))
    );
}

#[tokio::test]
async fn test_load_invalid_entity_type() {
    let ledger = setup_test_ledger().await;

    let csv = "business_id,tax_year,jurisdiction,entity_type,loss_amount,apportionment_pct,municipality_code\n1,2019,FED,NOPE,100000,,";
    let records = VintageLoader::parse(csv.as_bytes()).expect("Failed to parse CSV");

    let result = VintageLoader::load(&ledger, &records).await;

    assert_eq!(
        result,
        Err(VintageLoaderError::InvalidEntityType("NOPE".to_string()))
    );
}

#[tokio::test]
async fn test_load_rejects_non_positive_loss() {
    let ledger = setup_test_ledger().await;

    let csv = "business_id,tax_year,jurisdiction,entity_type,loss_amount,apportionment_pct,municipality_code\n1,2019,FED,C,0,,";
    let records = VintageLoader::parse(csv.as_bytes()).expect("Failed to parse CSV");

    let result = VintageLoader::load(&ledger, &records).await;

    assert_eq!(
        result,
        Err(VintageLoaderError::Ledger(LedgerError::NonPositiveLoss(
            dec!(0)
        )))
    );
}

#[tokio::test]
async fn test_load_stops_at_first_bad_record() {
    let ledger = setup_test_ledger().await;

    let csv = "business_id,tax_year,jurisdiction,entity_type,loss_amount,apportionment_pct,municipality_code\n\
               1,2019,FED,C,100000,,\n\
               1,2020,NOPE,C,50000,,\n\
               1,2021,FED,C,25000,,";
    let records = VintageLoader::parse(csv.as_bytes()).expect("Failed to parse CSV");

    let result = VintageLoader::load(&ledger, &records).await;

    assert!(result.is_err());
    // The record before the bad one stays loaded; the one after never runs.
    let vintages = ledger
        .repo()
        .list_vintages(1, None)
        .await
        .expect("Should list vintages");
    assert_eq!(vintages.len(), 1);
    assert_eq!(vintages[0].tax_year, 2019);
}
