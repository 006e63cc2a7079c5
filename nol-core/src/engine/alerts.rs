//! Severity tiering for expiration alerts.
//!
//! Years-to-expiration is fractional (`days / 365.25`).  Severity is a
//! monotonic step function over a caller-configurable threshold table; the
//! defaults follow the three-year alert window.  Vintages further out than
//! the outermost threshold produce no alert at all.

use chrono::NaiveDate;

use crate::models::AlertSeverity;

/// Average year length used for fractional years-to-expiration.
const DAYS_PER_YEAR: f64 = 365.25;

/// Threshold table mapping years-to-expiration to severity tiers.
/// Invariant: `critical_within <= high_within <= warning_within`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlertPolicy {
    pub critical_within: f64,
    pub high_within: f64,
    pub warning_within: f64,
}

impl Default for AlertPolicy {
    fn default() -> Self {
        Self {
            critical_within: 1.0,
            high_within: 2.0,
            warning_within: 3.0,
        }
    }
}

/// Fractional years between `as_of` and `expiration`.  Negative once the
/// date has passed.
pub fn years_to_expiration(
    expiration: NaiveDate,
    as_of: NaiveDate,
) -> f64 {
    (expiration - as_of).num_days() as f64 / DAYS_PER_YEAR
}

/// Severity for a vintage expiring `years` from now, or None when the
/// vintage is outside the alert window (no alert is produced and any
/// existing alert is left untouched).
pub fn severity_for(
    years: f64,
    policy: &AlertPolicy,
) -> Option<AlertSeverity> {
    if years <= policy.critical_within {
        Some(AlertSeverity::Critical)
    } else if years <= policy.high_within {
        Some(AlertSeverity::High)
    } else if years <= policy.warning_within {
        Some(AlertSeverity::Warning)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn date(
        y: i32,
        m: u32,
        d: u32,
    ) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn years_to_expiration_is_fractional() {
        let years = years_to_expiration(date(2026, 6, 30), date(2025, 12, 31));

        assert!(years > 0.49 && years < 0.51, "got {years}");
    }

    #[test]
    fn years_to_expiration_is_negative_after_the_date() {
        let years = years_to_expiration(date(2024, 12, 31), date(2025, 6, 30));

        assert!(years < 0.0);
    }

    #[test]
    fn severity_is_critical_within_one_year() {
        let severity = severity_for(0.5, &AlertPolicy::default());

        assert_eq!(severity, Some(AlertSeverity::Critical));
    }

    #[test]
    fn severity_is_high_within_two_years() {
        let severity = severity_for(1.5, &AlertPolicy::default());

        assert_eq!(severity, Some(AlertSeverity::High));
    }

    #[test]
    fn severity_is_warning_within_three_years() {
        let severity = severity_for(2.9, &AlertPolicy::default());

        assert_eq!(severity, Some(AlertSeverity::Warning));
    }

    #[test]
    fn no_alert_beyond_the_window() {
        let severity = severity_for(3.1, &AlertPolicy::default());

        assert_eq!(severity, None);
    }

    #[test]
    fn already_expired_vintage_is_critical() {
        let severity = severity_for(-0.2, &AlertPolicy::default());

        assert_eq!(severity, Some(AlertSeverity::Critical));
    }

    #[test]
    fn severity_is_monotonic_in_years() {
        let policy = AlertPolicy::default();
        let mut last = severity_for(0.0, &policy);
        for tenths in 1..40 {
            let current = severity_for(tenths as f64 / 10.0, &policy);
            assert!(
                current <= last,
                "severity increased from {last:?} to {current:?}"
            );
            last = current;
        }
    }
}
