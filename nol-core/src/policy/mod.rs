//! Temporal rule tables for the NOL ledger.
//!
//! Each policy is a small pure lookup over an explicit tax-year input so it
//! can be unit-tested independently of the ledger and swapped if the law
//! changes.

pub mod apportionment;
pub mod carryback;
pub mod common;
pub mod expiration;
pub mod limitation;

/// First tax year governed by the post-reform rules: indefinite
/// carryforward for new vintages, 80% income limitation on deductions.
pub const POST_REFORM_YEAR: i32 = 2018;

pub use apportionment::apportioned_amount;
pub use expiration::{carryforward_years, expiration_date};
pub use limitation::{limitation_percentage, maximum_deduction};
