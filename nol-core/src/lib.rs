pub mod db;
pub mod engine;
pub mod ledger;
pub mod models;
pub mod policy;

pub use db::repository::{NolRepository, RepositoryError};
pub use ledger::{
    ApplyDeductionRequest, BuildScheduleRequest, Clock, CreateVintageRequest, LedgerError,
    NolLedger,
};
pub use models::*;
