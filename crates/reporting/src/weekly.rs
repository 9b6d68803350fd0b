//! Trailing-window weekly aggregation for charting.
//!
//! Builds an N-week window ending at the current week. Each slot sums the
//! campaign's weekly history records for that ISO week; the most recent
//! slot additionally folds in the campaign's live metrics, which sit on
//! the campaign record itself until the campaign is archived.

use crate::funnel::conversion_pct;
use chrono::{DateTime, Utc};
use serde::Serialize;
use siscoca_core::types::{round2, Campaign, CampaignState, WeeklyRecord};
use siscoca_core::week;

/// One aggregated week of campaign metrics, oldest slot first.
#[derive(Debug, Clone, Serialize)]
pub struct WeeklySlot {
    pub iso_week: u32,
    pub week_start: DateTime<Utc>,
    pub week_end: DateTime<Utc>,
    pub reach: u64,
    pub clicks: u64,
    pub leads: u64,
    pub cost: f64,
    pub registered_drivers: u64,
    pub first_trip_drivers: u64,
    /// Conversion between consecutive funnel stages for this week's bar.
    pub click_rate_pct: f64,
    pub lead_rate_pct: f64,
    pub registration_rate_pct: f64,
    pub first_trip_rate_pct: f64,
}

/// Aggregate the trailing `window` weeks for one campaign.
pub fn weekly_summary(
    campaign: &Campaign,
    records: &[WeeklyRecord],
    window: usize,
    now: DateTime<Utc>,
) -> Vec<WeeklySlot> {
    (0..window)
        .map(|i| {
            let weeks_back = (window - 1 - i) as i64;
            let (start, end) = week::week_bounds(now, weeks_back);
            let iso_week = week::iso_week_of(start);

            let mut reach = 0u64;
            let mut clicks = 0u64;
            let mut leads = 0u64;
            let mut cost = 0f64;
            let mut registered = 0u64;
            let mut first_trips = 0u64;

            for record in records
                .iter()
                .filter(|r| r.campaign_id == campaign.id && r.iso_week == iso_week)
            {
                reach += record.reach.unwrap_or(0);
                clicks += record.clicks.unwrap_or(0);
                leads += record.leads.unwrap_or(0);
                cost += record.weekly_cost.unwrap_or(0.0);
                registered += record.registered_drivers.unwrap_or(0);
                first_trips += record.first_trip_drivers.unwrap_or(0);
            }

            // This week's numbers live on the campaign record until the
            // campaign is archived into history.
            let is_current_week = i == window - 1;
            if is_current_week && campaign.state != CampaignState::Archived {
                reach += campaign.reach.unwrap_or(0);
                clicks += campaign.clicks.unwrap_or(0);
                leads += campaign.leads.unwrap_or(0);
                cost += campaign.weekly_cost.unwrap_or(0.0);
                registered += campaign.registered_drivers.unwrap_or(0);
                first_trips += campaign.first_trip_drivers.unwrap_or(0);
            }

            WeeklySlot {
                iso_week,
                week_start: start,
                week_end: end,
                reach,
                clicks,
                leads,
                cost: round2(cost),
                registered_drivers: registered,
                first_trip_drivers: first_trips,
                click_rate_pct: conversion_pct(clicks, reach),
                lead_rate_pct: conversion_pct(leads, clicks),
                registration_rate_pct: conversion_pct(registered, leads),
                first_trip_rate_pct: conversion_pct(first_trips, registered),
            }
        })
        .collect()
}
