//! Pure planning engines over in-memory ledger data.
//!
//! Each engine is a function from (vintages / prior-year data, amounts) to a
//! plan of per-record effects.  The [`crate::ledger::NolLedger`] service
//! turns plans into transactional repository batches; nothing in this module
//! touches storage.

pub mod alerts;
pub mod application;
pub mod carryback;
pub mod schedule;

pub use alerts::{AlertPolicy, severity_for, years_to_expiration};
pub use application::{DeductionPlan, DeductionPlanner, VintageDraw};
pub use carryback::{CarrybackDraw, CarrybackPlan, plan_carryback};
pub use schedule::{ScheduleSummary, expiring_within_year, reconciles, summarize};
