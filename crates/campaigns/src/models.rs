//! Campaign-domain models and API request/response types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use siscoca_core::types::{
    CampaignState, Country, LandingType, MetricCategory, Platform, Segment, Vertical,
};
use uuid::Uuid;

// ─── Creative ──────────────────────────────────────────────────────────────

/// An ad asset attached to a campaign. Carries either an inline base64
/// payload or a URL on the external media host, never both.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Creative {
    pub id: Uuid,
    pub campaign_id: Uuid,
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub external_url: Option<String>,
    pub active: bool,
    pub order: u32,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

// ─── Pending tasks ─────────────────────────────────────────────────────────

/// Reminder that a metric submission is still due for a campaign-week.
/// Generated when a campaign is missing metrics for its reporting week and
/// completed automatically when the submission arrives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingTask {
    pub id: Uuid,
    pub campaign_id: Uuid,
    pub iso_week: u32,
    pub kind: TaskKind,
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    SubmitTraffickerMetrics,
    SubmitOwnerMetrics,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Completed,
}

// ─── Campaign chat ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: Uuid,
    pub campaign_id: Uuid,
    pub author: String,
    pub body: String,
    pub sent_at: DateTime<Utc>,
    pub read: bool,
}

// ─── Audit log ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: Uuid,
    pub user: String,
    pub action: AuditAction,
    pub resource_type: String,
    pub resource_id: String,
    pub details: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Create,
    Update,
    Delete,
    StateChange,
    MetricsSubmit,
    Archive,
    Reactivate,
    Import,
    Login,
}

// ─── Users ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Trafficker,
    Owner,
}

/// Dashboard user. Development: plaintext credentials in memory.
/// Production: replace with an identity provider + hashed storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub username: String,
    pub display_name: String,
    pub initials: String,
    pub role: Role,
    #[serde(skip_serializing)]
    pub password: String,
}

// ─── API request types ─────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateCampaignRequest {
    /// Explicit manual name. When absent the name is generated from the
    /// classification fields.
    #[serde(default)]
    pub name: Option<String>,
    /// Pre-generated name supplied by the UI; lower priority than `name`.
    #[serde(default)]
    pub generated_name: Option<String>,
    pub country: Country,
    pub vertical: Vertical,
    pub platform: Platform,
    pub segment: Segment,
    #[serde(default)]
    pub external_platform_id: Option<String>,
    pub owner_name: String,
    #[serde(default)]
    pub owner_initials: Option<String>,
    pub short_description: String,
    pub objective: String,
    pub benefit: String,
    pub description: String,
    #[serde(default)]
    pub landing_type: Option<LandingType>,
    #[serde(default)]
    pub landing_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateCampaignRequest {
    pub name: Option<String>,
    pub external_platform_id: Option<String>,
    pub owner_name: Option<String>,
    pub owner_initials: Option<String>,
    pub short_description: Option<String>,
    pub objective: Option<String>,
    pub benefit: Option<String>,
    pub description: Option<String>,
    pub landing_type: Option<LandingType>,
    pub landing_url: Option<String>,
    pub report_url: Option<String>,
    pub state: Option<CampaignState>,
    pub creative_file: Option<String>,
    pub creative_file_name: Option<String>,
    pub external_creative_url: Option<String>,
    pub reach: Option<u64>,
    pub clicks: Option<u64>,
    pub leads: Option<u64>,
    pub weekly_cost: Option<f64>,
    pub cost_per_lead: Option<f64>,
    pub registered_drivers: Option<u64>,
    pub first_trip_drivers: Option<u64>,
}

impl UpdateCampaignRequest {
    /// True when any trafficker-side field is present (zero counts).
    pub fn touches_trafficker_metrics(&self) -> bool {
        self.reach.is_some()
            || self.clicks.is_some()
            || self.leads.is_some()
            || self.weekly_cost.is_some()
            || self.report_url.is_some()
    }

    /// True when any owner-side field is present (zero counts).
    pub fn touches_owner_metrics(&self) -> bool {
        self.registered_drivers.is_some() || self.first_trip_drivers.is_some()
    }
}

#[derive(Debug, Deserialize)]
pub struct TraffickerMetricsRequest {
    pub reach: u64,
    pub clicks: u64,
    pub leads: u64,
    pub weekly_cost: f64,
    /// Supplied by the form when the trafficker overrides the derived
    /// value; computed from cost and leads otherwise.
    #[serde(default)]
    pub cost_per_lead: Option<f64>,
    #[serde(default)]
    pub report_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct OwnerMetricsRequest {
    pub registered_drivers: u64,
    pub first_trip_drivers: u64,
}

#[derive(Debug, Deserialize)]
pub struct ChangeStateRequest {
    pub state: CampaignState,
}

#[derive(Debug, Deserialize)]
pub struct SaveWeeklyRecordRequest {
    pub campaign_id: Uuid,
    /// Defaults to the previous ISO week when absent.
    #[serde(default)]
    pub iso_week: Option<u32>,
    #[serde(default)]
    pub week_date: Option<DateTime<Utc>>,
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
}

#[derive(Debug, Deserialize)]
pub struct CreateCreativeRequest {
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub external_url: Option<String>,
    #[serde(default = "default_true")]
    pub active: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateCreativeRequest {
    pub file: Option<String>,
    pub file_name: Option<String>,
    pub external_url: Option<String>,
    pub active: Option<bool>,
    pub order: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct IdealMetricRequest {
    #[serde(default)]
    pub id: Option<Uuid>,
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
    #[serde(default = "default_true")]
    pub active: bool,
}

#[derive(Debug, Deserialize)]
pub struct PostMessageRequest {
    #[serde(default)]
    pub author: Option<String>,
    pub body: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub username: String,
    pub current_password: String,
    pub new_password: String,
}

fn default_true() -> bool {
    true
}

// ─── API response types ────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: String,
    pub role: Role,
    pub expires_at: DateTime<Utc>,
}

/// Uniform result shape for lifecycle actions: the caller always gets a
/// success flag and a human-readable message.
#[derive(Debug, Serialize)]
pub struct ActionResponse {
    pub success: bool,
    pub message: String,
}

impl ActionResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

/// Outcome of a bulk history import. The batch completes even when some
/// rows fail; per-row errors are collected here.
#[derive(Debug, Default, Serialize)]
pub struct ImportReport {
    pub processed: usize,
    pub created: usize,
    pub updated: usize,
    pub errors: Vec<String>,
}

/// Dashboard-wide counters for the monitoring header.
#[derive(Debug, Serialize)]
pub struct MonitoringOverview {
    pub total_campaigns: u64,
    pub pending_campaigns: u64,
    pub creative_sent_campaigns: u64,
    pub active_campaigns: u64,
    pub archived_campaigns: u64,
    pub total_reach: u64,
    pub total_leads: u64,
    pub total_weekly_cost: f64,
    pub total_registered_drivers: u64,
    pub weekly_records: u64,
    pub pending_tasks: u64,
    pub unread_messages: u64,
}
