//! Jurisdictional apportionment of a federal loss.

use rust_decimal::Decimal;

use crate::models::Jurisdiction;
use crate::policy::common::round_half_up;

/// Amount stored on a vintage after apportionment.
///
/// A sub-federal vintage with a supplied percentage stores
/// `loss × pct / 100`, rounded to 2 decimal places half-up.  A federal
/// vintage, or a sub-federal one with no percentage supplied, stores the
/// federal loss unchanged.
pub fn apportioned_amount(
    loss_amount: Decimal,
    jurisdiction: Jurisdiction,
    apportionment_pct: Option<Decimal>,
) -> Decimal {
    match apportionment_pct {
        Some(pct) if jurisdiction.is_sub_federal() => {
            round_half_up(loss_amount * pct / Decimal::ONE_HUNDRED)
        }
        _ => loss_amount,
    }
}
