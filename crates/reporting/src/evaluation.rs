//! Actual-vs-ideal metric evaluation and per-campaign rollups.
//!
//! Ideal metrics are configured per category, optionally scoped by
//! classification; a campaign's actuals are graded as a percentage of the
//! ideal value.

use serde::Serialize;
use siscoca_core::types::{round2, Campaign, IdealMetric, MetricCategory};

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MetricGrade {
    Excellent,
    Good,
    Fair,
    Poor,
    Critical,
}

impl MetricGrade {
    /// Grade thresholds as a percentage of the ideal value.
    pub fn from_pct(pct: f64) -> Self {
        if pct >= 90.0 {
            MetricGrade::Excellent
        } else if pct >= 70.0 {
            MetricGrade::Good
        } else if pct >= 50.0 {
            MetricGrade::Fair
        } else if pct >= 30.0 {
            MetricGrade::Poor
        } else {
            MetricGrade::Critical
        }
    }

    pub fn recommendation(&self) -> &'static str {
        match self {
            MetricGrade::Excellent => "On target, keep the current setup",
            MetricGrade::Good => "Close to target, minor tuning possible",
            MetricGrade::Fair => "Below target, review audience and creative",
            MetricGrade::Poor => "Well below target, needs attention this week",
            MetricGrade::Critical => "Far from target, consider pausing and rebuilding",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricEvaluation {
    pub metric: &'static str,
    pub category: MetricCategory,
    pub actual: f64,
    pub ideal: f64,
    pub pct_of_ideal: f64,
    pub grade: MetricGrade,
    pub recommendation: &'static str,
}

/// Grade every submitted metric that has a matching active ideal. Metrics
/// without a submission or without a configured ideal are skipped, so the
/// list is often partial (or empty) early in a campaign's life.
pub fn evaluate_campaign(campaign: &Campaign, ideals: &[IdealMetric]) -> Vec<MetricEvaluation> {
    let scoped: Vec<&IdealMetric> = ideals.iter().filter(|i| i.applies_to(campaign)).collect();

    let candidates: [(&'static str, MetricCategory, Option<f64>); 5] = [
        ("reach", MetricCategory::Reach, campaign.reach.map(|v| v as f64)),
        ("leads", MetricCategory::Leads, campaign.leads.map(|v| v as f64)),
        ("weekly_cost", MetricCategory::Cost, campaign.weekly_cost),
        (
            "registered_drivers",
            MetricCategory::Drivers,
            campaign.registered_drivers.map(|v| v as f64),
        ),
        (
            "cost_per_driver",
            MetricCategory::Conversion,
            campaign.cost_per_driver(),
        ),
    ];

    candidates
        .into_iter()
        .filter_map(|(name, category, actual)| {
            let actual = actual?;
            let ideal = scoped.iter().find(|i| i.category == category)?;
            if ideal.ideal_value <= 0.0 {
                return None;
            }
            let pct = round2(100.0 * actual / ideal.ideal_value);
            let grade = MetricGrade::from_pct(pct);
            Some(MetricEvaluation {
                metric: name,
                category,
                actual,
                ideal: ideal.ideal_value,
                pct_of_ideal: pct,
                grade,
                recommendation: grade.recommendation(),
            })
        })
        .collect()
}

/// Global per-campaign rollup for the metrics panel.
#[derive(Debug, Clone, Serialize)]
pub struct CampaignRollup {
    pub total_cost: f64,
    pub total_reach: u64,
    pub total_leads: u64,
    pub total_drivers: u64,
    pub avg_cost_per_lead: f64,
    pub avg_cost_per_driver: f64,
    /// Simplified: registered drivers per 100 currency units spent.
    pub roi: f64,
    pub evaluations: Vec<MetricEvaluation>,
}

pub fn campaign_rollup(campaign: &Campaign, ideals: &[IdealMetric]) -> CampaignRollup {
    let total_cost = campaign.weekly_cost.unwrap_or(0.0);
    let total_reach = campaign.reach.unwrap_or(0);
    let total_leads = campaign.leads.unwrap_or(0);
    let total_drivers = campaign.registered_drivers.unwrap_or(0);

    let avg_cost_per_lead = if total_leads > 0 {
        round2(total_cost / total_leads as f64)
    } else {
        0.0
    };
    let avg_cost_per_driver = if total_drivers > 0 {
        round2(total_cost / total_drivers as f64)
    } else {
        0.0
    };
    let roi = if total_cost > 0.0 {
        round2(total_drivers as f64 * 100.0 / total_cost)
    } else {
        0.0
    };

    CampaignRollup {
        total_cost,
        total_reach,
        total_leads,
        total_drivers,
        avg_cost_per_lead,
        avg_cost_per_driver,
        roi,
        evaluations: evaluate_campaign(campaign, ideals),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use siscoca_core::types::{CampaignState, Country, Platform, Segment, Vertical};
    use uuid::Uuid;

    fn campaign() -> Campaign {
        let now = Utc::now();
        Campaign {
            id: Uuid::new_v4(),
            name: "PE-MOTOPER-FB-ADQ-001-GF-Verano2025".into(),
            country: Country::Pe,
            vertical: Vertical::Motoper,
            platform: Platform::Fb,
            segment: Segment::Acquisition,
            external_platform_id: None,
            owner_name: "Gabriela Flores".into(),
            owner_initials: "GF".into(),
            short_description: "Verano2025".into(),
            objective: "Acquisition".into(),
            benefit: "Bonus".into(),
            description: "Summer push".into(),
            landing_type: None,
            landing_url: None,
            report_url: None,
            state: CampaignState::Active,
            creative_file: None,
            creative_file_name: None,
            external_creative_url: None,
            reach: Some(9_000),
            clicks: Some(450),
            leads: Some(45),
            weekly_cost: Some(2500.0),
            cost_per_lead: Some(55.56),
            registered_drivers: Some(30),
            first_trip_drivers: Some(20),
            cost_per_registered_driver: None,
            cost_per_first_trip_driver: None,
            iso_week: 22,
            created_at: now,
            updated_at: now,
        }
    }

    fn ideal(category: MetricCategory, value: f64, vertical: Option<Vertical>) -> IdealMetric {
        let now = Utc::now();
        IdealMetric {
            id: Uuid::new_v4(),
            name: format!("{:?} target", category),
            category,
            ideal_value: value,
            min_value: None,
            max_value: None,
            unit: None,
            country: None,
            vertical,
            platform: None,
            segment: None,
            active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn grade_thresholds() {
        assert_eq!(MetricGrade::from_pct(95.0), MetricGrade::Excellent);
        assert_eq!(MetricGrade::from_pct(90.0), MetricGrade::Excellent);
        assert_eq!(MetricGrade::from_pct(89.99), MetricGrade::Good);
        assert_eq!(MetricGrade::from_pct(50.0), MetricGrade::Fair);
        assert_eq!(MetricGrade::from_pct(30.0), MetricGrade::Poor);
        assert_eq!(MetricGrade::from_pct(10.0), MetricGrade::Critical);
    }

    #[test]
    fn evaluation_matches_scope_and_category() {
        let c = campaign();
        let ideals = vec![
            ideal(MetricCategory::Reach, 10_000.0, None),
            // Scoped to a different vertical: must not apply.
            ideal(MetricCategory::Leads, 50.0, Some(Vertical::Cargo)),
        ];
        let evals = evaluate_campaign(&c, &ideals);
        assert_eq!(evals.len(), 1);
        assert_eq!(evals[0].metric, "reach");
        assert_eq!(evals[0].pct_of_ideal, 90.0);
        assert_eq!(evals[0].grade, MetricGrade::Excellent);
    }

    #[test]
    fn evaluation_is_empty_without_ideals() {
        let evals = evaluate_campaign(&campaign(), &[]);
        assert!(evals.is_empty());
    }

    #[test]
    fn rollup_totals_and_averages() {
        let rollup = campaign_rollup(&campaign(), &[]);
        assert_eq!(rollup.total_cost, 2500.0);
        assert_eq!(rollup.avg_cost_per_lead, 55.56);
        assert_eq!(rollup.avg_cost_per_driver, 83.33);
        assert_eq!(rollup.roi, 1.2);
    }
}
