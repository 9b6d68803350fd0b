use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// ─── Classification enums ──────────────────────────────────────────────────

/// Country a campaign runs in. Serialized as the two-letter market code.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum Country {
    Pe,
    Co,
}

impl Country {
    pub fn code(&self) -> &'static str {
        match self {
            Country::Pe => "PE",
            Country::Co => "CO",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Country::Pe => "Perú",
            Country::Co => "Colombia",
        }
    }
}

/// Business vertical. Codes follow the ad-account naming convention.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum Vertical {
    Motoper,
    Motodel,
    Cargo,
    Autoper,
    B2b,
    Premier,
    Confort,
}

impl Vertical {
    pub fn code(&self) -> &'static str {
        match self {
            Vertical::Motoper => "MOTOPER",
            Vertical::Motodel => "MOTODEL",
            Vertical::Cargo => "CARGO",
            Vertical::Autoper => "AUTOPER",
            Vertical::B2b => "B2B",
            Vertical::Premier => "PREMIER",
            Vertical::Confort => "CONFORT",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Vertical::Motoper => "Moto Persona",
            Vertical::Motodel => "Moto Delivery",
            Vertical::Cargo => "Cargo",
            Vertical::Autoper => "Auto Persona",
            Vertical::B2b => "B2B",
            Vertical::Premier => "Premier",
            Vertical::Confort => "Confort",
        }
    }
}

/// Advertising platform the campaign is bought on.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum Platform {
    Fb,
    Tt,
    Ig,
    Gg,
    Li,
}

impl Platform {
    pub fn code(&self) -> &'static str {
        match self {
            Platform::Fb => "FB",
            Platform::Tt => "TT",
            Platform::Ig => "IG",
            Platform::Gg => "GG",
            Platform::Li => "LI",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Platform::Fb => "Facebook Ads",
            Platform::Tt => "TikTok Ads",
            Platform::Ig => "Instagram Ads",
            Platform::Gg => "Google Ads",
            Platform::Li => "LinkedIn Ads",
        }
    }
}

/// Audience segment. The first three carry the short codes used when
/// generating campaign names; the social-media segments fall back to "XXX".
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Segment {
    Acquisition,
    Retention,
    Return,
    MoreViews,
    MoreFollowers,
    MoreProfileViews,
}

impl Segment {
    pub fn abbrev(&self) -> &'static str {
        match self {
            Segment::Acquisition => "ADQ",
            Segment::Retention => "RET",
            Segment::Return => "RTO",
            _ => "XXX",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Segment::Acquisition => "Adquisición",
            Segment::Retention => "Retención",
            Segment::Return => "Retorno",
            Segment::MoreViews => "Más Vistas",
            Segment::MoreFollowers => "Más Seguidores",
            Segment::MoreProfileViews => "Más Vistas del Perfil",
        }
    }
}

/// Where a campaign lands its traffic.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LandingType {
    Forms,
    Whatsapp,
    Url,
    Landing,
    App,
    CallCenter,
    Email,
    Other,
}

// ─── Lifecycle ─────────────────────────────────────────────────────────────

/// Campaign lifecycle state. Legal transitions are enforced by the
/// lifecycle state machine, not by this enum.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CampaignState {
    Pending,
    CreativeSent,
    Active,
    Archived,
}

impl CampaignState {
    pub fn display_name(&self) -> &'static str {
        match self {
            CampaignState::Pending => "Pending",
            CampaignState::CreativeSent => "Creative Sent",
            CampaignState::Active => "Active",
            CampaignState::Archived => "Archived",
        }
    }
}

impl fmt::Display for CampaignState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for CampaignState {
    type Err = String;

    /// Accepts the wire form ("creative_sent"), the display form
    /// ("Creative Sent"), or any casing of either.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace([' ', '-'], "_");
        match normalized.as_str() {
            "pending" => Ok(CampaignState::Pending),
            "creative_sent" => Ok(CampaignState::CreativeSent),
            "active" => Ok(CampaignState::Active),
            "archived" => Ok(CampaignState::Archived),
            _ => Err(format!("unknown campaign state: {}", s)),
        }
    }
}

// ─── Campaign ──────────────────────────────────────────────────────────────

/// The central entity: one advertising campaign with its classification,
/// lifecycle state, creative reference, and the latest submitted metrics.
/// Metric fields stay `None` until the corresponding role submits them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Campaign {
    pub id: Uuid,
    pub name: String,
    pub country: Country,
    pub vertical: Vertical,
    pub platform: Platform,
    pub segment: Segment,
    #[serde(default)]
    pub external_platform_id: Option<String>,
    pub owner_name: String,
    pub owner_initials: String,
    pub short_description: String,
    pub objective: String,
    pub benefit: String,
    pub description: String,
    #[serde(default)]
    pub landing_type: Option<LandingType>,
    #[serde(default)]
    pub landing_url: Option<String>,
    #[serde(default)]
    pub report_url: Option<String>,
    pub state: CampaignState,
    // Creative reference — at most one of file / external URL in practice.
    #[serde(default)]
    pub creative_file: Option<String>,
    #[serde(default)]
    pub creative_file_name: Option<String>,
    #[serde(default)]
    pub external_creative_url: Option<String>,
    // Trafficker metrics
    #[serde(default)]
    pub reach: Option<u64>,
    #[serde(default)]
    pub clicks: Option<u64>,
    #[serde(default)]
    pub leads: Option<u64>,
    #[serde(default)]
    pub weekly_cost: Option<f64>,
    #[serde(default)]
    pub cost_per_lead: Option<f64>,
    // Owner metrics
    #[serde(default)]
    pub registered_drivers: Option<u64>,
    #[serde(default)]
    pub first_trip_drivers: Option<u64>,
    #[serde(default)]
    pub cost_per_registered_driver: Option<f64>,
    #[serde(default)]
    pub cost_per_first_trip_driver: Option<f64>,
    /// ISO week the campaign reports against (the week before creation).
    pub iso_week: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Campaign {
    /// Weekly cost divided by first-trip drivers, rounded to cents.
    /// Computed on demand, never stored.
    pub fn cost_per_driver(&self) -> Option<f64> {
        match (self.weekly_cost, self.first_trip_drivers) {
            (Some(cost), Some(drivers)) if drivers > 0 => {
                Some(round2(cost / drivers as f64))
            }
            _ => None,
        }
    }

    /// Trafficker metrics count as present once reach has been submitted.
    pub fn has_trafficker_metrics(&self) -> bool {
        self.reach.is_some()
    }

    /// Owner metrics count as present once registered drivers has been
    /// submitted — zero is a valid submission.
    pub fn has_owner_metrics(&self) -> bool {
        self.registered_drivers.is_some()
    }
}

// ─── Weekly history ────────────────────────────────────────────────────────

/// One campaign-week snapshot of metrics. At most one record exists per
/// `(campaign_id, iso_week)`; re-submissions merge onto the existing record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeeklyRecord {
    pub id: Uuid,
    pub campaign_id: Uuid,
    pub iso_week: u32,
    pub week_date: DateTime<Utc>,
    #[serde(default)]
    pub reach: Option<u64>,
    #[serde(default)]
    pub clicks: Option<u64>,
    #[serde(default)]
    pub leads: Option<u64>,
    #[serde(default)]
    pub weekly_cost: Option<f64>,
    #[serde(default)]
    pub cost_per_lead: Option<f64>,
    #[serde(default)]
    pub registered_drivers: Option<u64>,
    #[serde(default)]
    pub first_trip_drivers: Option<u64>,
    #[serde(default)]
    pub cost_per_registered_driver: Option<f64>,
    #[serde(default)]
    pub cost_per_first_trip_driver: Option<f64>,
    pub recorded_at: DateTime<Utc>,
    pub recorded_by: String,
}

// ─── Ideal metrics ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum MetricCategory {
    Reach,
    Leads,
    Cost,
    Drivers,
    Conversion,
}

/// Target value for a metric category, optionally scoped to a
/// country/vertical/platform/segment combination. Used to grade actual
/// campaign performance against expectations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdealMetric {
    pub id: Uuid,
    pub name: String,
    pub category: MetricCategory,
    pub ideal_value: f64,
    #[serde(default)]
    pub min_value: Option<f64>,
    #[serde(default)]
    pub max_value: Option<f64>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub country: Option<Country>,
    #[serde(default)]
    pub vertical: Option<Vertical>,
    #[serde(default)]
    pub platform: Option<Platform>,
    #[serde(default)]
    pub segment: Option<Segment>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl IdealMetric {
    /// An ideal applies to a campaign when every scope field it pins
    /// matches; unset scope fields match anything.
    pub fn applies_to(&self, campaign: &Campaign) -> bool {
        self.active
            && self.country.map_or(true, |c| c == campaign.country)
            && self.vertical.map_or(true, |v| v == campaign.vertical)
            && self.platform.map_or(true, |p| p == campaign.platform)
            && self.segment.map_or(true, |s| s == campaign.segment)
    }
}

// ─── Derived-metric helpers ────────────────────────────────────────────────

/// Round to two decimals: multiply by 100, round half away from zero,
/// divide by 100.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Cost divided by a count, rounded to cents; zero when the count is zero.
pub fn cost_per_unit(cost: f64, units: u64) -> f64 {
    if units > 0 {
        round2(cost / units as f64)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_parses_wire_and_display_forms() {
        assert_eq!(
            "creative_sent".parse::<CampaignState>().unwrap(),
            CampaignState::CreativeSent
        );
        assert_eq!(
            "Creative Sent".parse::<CampaignState>().unwrap(),
            CampaignState::CreativeSent
        );
        assert_eq!(
            "ARCHIVED".parse::<CampaignState>().unwrap(),
            CampaignState::Archived
        );
        assert!("launched".parse::<CampaignState>().is_err());
    }

    #[test]
    fn segment_abbreviations() {
        assert_eq!(Segment::Acquisition.abbrev(), "ADQ");
        assert_eq!(Segment::Retention.abbrev(), "RET");
        assert_eq!(Segment::Return.abbrev(), "RTO");
        assert_eq!(Segment::MoreViews.abbrev(), "XXX");
    }

    #[test]
    fn cost_per_unit_guards_zero_divisor() {
        assert_eq!(cost_per_unit(2500.0, 50), 50.0);
        assert_eq!(cost_per_unit(2500.0, 0), 0.0);
        assert_eq!(cost_per_unit(100.0, 3), 33.33);
    }

    #[test]
    fn round2_rounds_half_up() {
        assert_eq!(round2(33.333_333), 33.33);
        assert_eq!(round2(33.335), 33.34);
        assert_eq!(round2(0.0), 0.0);
    }
}
