//! Funnel analysis — stage-to-stage conversion through the acquisition
//! path: Reach → Clicks → Leads → Registered drivers → First-trip drivers.

use serde::Serialize;
use siscoca_core::types::{round2, Campaign};

/// One bar of the funnel: the stage value and its conversion from the
/// previous stage.
#[derive(Debug, Clone, Serialize)]
pub struct FunnelStage {
    pub name: &'static str,
    pub value: u64,
    pub pct_of_previous: f64,
}

/// Conversion percentage between two funnel stages, rounded to two
/// decimals and guarded against an empty previous stage.
pub fn conversion_pct(stage: u64, previous: u64) -> f64 {
    if previous == 0 {
        0.0
    } else {
        round2(100.0 * stage as f64 / previous as f64)
    }
}

/// Full funnel breakdown for a campaign's current metrics. Unsubmitted
/// stages read as zero.
pub fn campaign_funnel(campaign: &Campaign) -> Vec<FunnelStage> {
    let reach = campaign.reach.unwrap_or(0);
    let clicks = campaign.clicks.unwrap_or(0);
    let leads = campaign.leads.unwrap_or(0);
    let registered = campaign.registered_drivers.unwrap_or(0);
    let first_trips = campaign.first_trip_drivers.unwrap_or(0);

    vec![
        FunnelStage {
            name: "reach",
            value: reach,
            pct_of_previous: 100.0,
        },
        FunnelStage {
            name: "clicks",
            value: clicks,
            pct_of_previous: conversion_pct(clicks, reach),
        },
        FunnelStage {
            name: "leads",
            value: leads,
            pct_of_previous: conversion_pct(leads, clicks),
        },
        FunnelStage {
            name: "registered_drivers",
            value: registered,
            pct_of_previous: conversion_pct(registered, leads),
        },
        FunnelStage {
            name: "first_trip_drivers",
            value: first_trips,
            pct_of_previous: conversion_pct(first_trips, registered),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversion_rounds_to_two_decimals() {
        assert_eq!(conversion_pct(500, 10_000), 5.0);
        assert_eq!(conversion_pct(1, 3), 33.33);
        assert_eq!(conversion_pct(2, 3), 66.67);
    }

    #[test]
    fn zero_previous_stage_yields_zero() {
        assert_eq!(conversion_pct(10, 0), 0.0);
        assert_eq!(conversion_pct(0, 0), 0.0);
    }
}
