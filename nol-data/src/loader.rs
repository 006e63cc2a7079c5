use std::io::Read;

use nol_core::{
    CreateVintageRequest, EntityType, Jurisdiction, LedgerError, NolLedger, NolRepository,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;

/// Errors that can occur when loading vintage data.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum VintageLoaderError {
    #[error("CSV parse error: {0}")]
    CsvParse(String),

    #[error("Invalid jurisdiction code '{0}' (expected FED, ST, or MUN)")]
    InvalidJurisdiction(String),

    #[error("Invalid entity type '{0}' (expected C, S, P, SP, or LLC)")]
    InvalidEntityType(String),

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),
}

impl From<csv::Error> for VintageLoaderError {
    fn from(err: csv::Error) -> Self {
        VintageLoaderError::CsvParse(err.to_string())
    }
}

/// A single record from the vintage CSV file.
///
/// Columns:
/// - `business_id`: The owning business
/// - `tax_year`: The loss origination year
/// - `jurisdiction`: Jurisdiction code (FED, ST, MUN)
/// - `entity_type`: Entity type code (C, S, P, SP, LLC)
/// - `loss_amount`: The loss generated in the origination year
/// - `apportionment_pct`: Sub-federal apportionment percentage (empty for none)
/// - `municipality_code`: Municipality identifier (empty for none)
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct VintageRecord {
    pub business_id: i64,
    pub tax_year: i32,
    pub jurisdiction: String,
    pub entity_type: String,
    pub loss_amount: Decimal,
    #[serde(deserialize_with = "deserialize_optional_decimal")]
    pub apportionment_pct: Option<Decimal>,
    #[serde(deserialize_with = "deserialize_optional_string")]
    pub municipality_code: Option<String>,
}

fn deserialize_optional_decimal<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: Option<String> = Option::deserialize(deserializer)?;
    match s {
        Some(s) if s.trim().is_empty() => Ok(None),
        Some(s) => s
            .trim()
            .parse::<Decimal>()
            .map(Some)
            .map_err(serde::de::Error::custom),
        None => Ok(None),
    }
}

fn deserialize_optional_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: Option<String> = Option::deserialize(deserializer)?;
    Ok(s.filter(|s| !s.trim().is_empty()))
}

/// Loader for NOL vintage data from CSV files.
///
/// Records go through the ledger service rather than straight into the
/// store, so every loaded vintage gets the same validation, apportionment,
/// and expiration policy as one created interactively.
pub struct VintageLoader;

impl VintageLoader {
    /// Parse vintage records from a CSV reader.
    pub fn parse<R: Read>(reader: R) -> Result<Vec<VintageRecord>, VintageLoaderError> {
        let mut csv_reader = csv::Reader::from_reader(reader);
        let mut records = Vec::new();

        for result in csv_reader.deserialize() {
            let record: VintageRecord = result?;
            records.push(record);
        }

        Ok(records)
    }

    /// Load vintage records through the ledger.  Returns the number of
    /// vintages created.  Stops at the first bad record; earlier records
    /// stay loaded.
    pub async fn load<R: NolRepository>(
        ledger: &NolLedger<R>,
        records: &[VintageRecord],
    ) -> Result<usize, VintageLoaderError> {
        let mut created = 0;

        for record in records {
            let jurisdiction = Jurisdiction::parse(&record.jurisdiction).ok_or_else(|| {
                VintageLoaderError::InvalidJurisdiction(record.jurisdiction.clone())
            })?;
            let entity_type = EntityType::parse(&record.entity_type).ok_or_else(|| {
                VintageLoaderError::InvalidEntityType(record.entity_type.clone())
            })?;

            ledger
                .create_vintage(CreateVintageRequest {
                    business_id: record.business_id,
                    tax_year: record.tax_year,
                    loss_amount: record.loss_amount,
                    jurisdiction,
                    entity_type,
                    apportionment_pct: record.apportionment_pct,
                    municipality_code: record.municipality_code.clone(),
                })
                .await?;
            created += 1;
        }

        Ok(created)
    }
}
