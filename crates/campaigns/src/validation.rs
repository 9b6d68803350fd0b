//! Funnel validation applied at metrics-submission time.
//!
//! The funnel must be monotonically non-increasing:
//! Reach ≥ Clicks ≥ Leads ≥ Registered drivers ≥ First-trip drivers.
//! These checks run when a form is submitted, not as stored invariants —
//! imported history may legitimately violate them.

use siscoca_core::error::{SiscocaError, SiscocaResult};

/// Trafficker funnel: clicks cannot exceed reach, leads cannot exceed
/// clicks. The error message names the inequality that failed.
pub fn validate_trafficker_funnel(reach: u64, clicks: u64, leads: u64) -> SiscocaResult<()> {
    if clicks > reach {
        return Err(SiscocaError::Validation(format!(
            "clicks ({}) cannot exceed reach ({})",
            clicks, reach
        )));
    }
    if leads > clicks {
        return Err(SiscocaError::Validation(format!(
            "leads ({}) cannot exceed clicks ({})",
            leads, clicks
        )));
    }
    Ok(())
}

/// Owner funnel: first-trip drivers cannot exceed registered drivers.
pub fn validate_owner_funnel(registered: u64, first_trip: u64) -> SiscocaResult<()> {
    if first_trip > registered {
        return Err(SiscocaError::Validation(format!(
            "first-trip drivers ({}) cannot exceed registered drivers ({})",
            first_trip, registered
        )));
    }
    Ok(())
}

/// Costs enter as floats and can be negative on bad input; reject early.
pub fn validate_non_negative_cost(label: &str, value: f64) -> SiscocaResult<()> {
    if value < 0.0 {
        return Err(SiscocaError::Validation(format!(
            "{} cannot be negative",
            label
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_monotone_trafficker_funnel() {
        assert!(validate_trafficker_funnel(10_000, 500, 50).is_ok());
        // Equal stages are fine
        assert!(validate_trafficker_funnel(100, 100, 100).is_ok());
    }

    #[test]
    fn rejects_clicks_over_reach() {
        let err = validate_trafficker_funnel(100, 200, 10).unwrap_err();
        assert!(err.to_string().contains("clicks"));
        assert!(err.to_string().contains("reach"));
    }

    #[test]
    fn rejects_leads_over_clicks() {
        let err = validate_trafficker_funnel(1000, 50, 60).unwrap_err();
        assert!(err.to_string().contains("leads"));
        assert!(err.to_string().contains("clicks"));
    }

    #[test]
    fn owner_funnel_checks_first_trips() {
        assert!(validate_owner_funnel(30, 20).is_ok());
        assert!(validate_owner_funnel(0, 0).is_ok());
        let err = validate_owner_funnel(10, 15).unwrap_err();
        assert!(err.to_string().contains("first-trip"));
    }

    #[test]
    fn negative_cost_is_rejected() {
        assert!(validate_non_negative_cost("weekly cost", 0.0).is_ok());
        assert!(validate_non_negative_cost("weekly cost", -1.0).is_err());
    }
}
