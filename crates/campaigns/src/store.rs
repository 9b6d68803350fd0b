//! In-memory campaign store backed by DashMap, mirrored to a snapshot
//! fallback after every successful mutation.
//!
//! Single source of truth for campaigns, weekly history, creatives, ideal
//! metrics, pending tasks, chat, and the audit log. All mutations funnel
//! through here; handlers hold an `Arc<CampaignStore>` and stay thin.
//! Production: replace with PostgreSQL (sqlx) behind the same API surface.

use crate::import::{self, CampaignRef, ParsedHistoryRow};
use crate::lifecycle::CampaignStateMachine;
use crate::models::*;
use crate::persistence::{self, SnapshotRepository, StoreSnapshot};
use crate::validation;
use crate::{naming, NullSnapshot};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde_json::Value;
use siscoca_core::error::{SiscocaError, SiscocaResult};
use siscoca_core::types::{
    cost_per_unit, round2, Campaign, CampaignState, IdealMetric, WeeklyRecord,
};
use siscoca_core::week;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// Thread-safe in-memory store for the campaign dashboard.
pub struct CampaignStore {
    pub(crate) campaigns: DashMap<Uuid, Campaign>,
    pub(crate) weekly_records: DashMap<Uuid, WeeklyRecord>,
    pub(crate) creatives: DashMap<Uuid, Creative>,
    pub(crate) ideal_metrics: DashMap<Uuid, IdealMetric>,
    pub(crate) tasks: DashMap<Uuid, PendingTask>,
    pub(crate) messages: DashMap<Uuid, ChatMessage>,
    pub(crate) audit_log: DashMap<Uuid, AuditEntry>,
    pub(crate) state_machine: CampaignStateMachine,
    pub(crate) snapshots: Arc<dyn SnapshotRepository>,
    pub(crate) max_active_creatives: usize,
}

/// Present-field patch merged onto a campaign-week history record.
#[derive(Debug, Default, Clone)]
pub(crate) struct WeekMetricsPatch {
    pub reach: Option<u64>,
    pub clicks: Option<u64>,
    pub leads: Option<u64>,
    pub weekly_cost: Option<f64>,
    pub cost_per_lead: Option<f64>,
    pub registered_drivers: Option<u64>,
    pub first_trip_drivers: Option<u64>,
    pub cost_per_registered_driver: Option<f64>,
    pub cost_per_first_trip_driver: Option<f64>,
}

impl WeekMetricsPatch {
    fn from_campaign(campaign: &Campaign) -> Self {
        Self {
            reach: campaign.reach,
            clicks: campaign.clicks,
            leads: campaign.leads,
            weekly_cost: campaign.weekly_cost,
            cost_per_lead: campaign.cost_per_lead,
            registered_drivers: campaign.registered_drivers,
            first_trip_drivers: campaign.first_trip_drivers,
            cost_per_registered_driver: campaign.cost_per_registered_driver,
            cost_per_first_trip_driver: campaign.cost_per_first_trip_driver,
        }
    }

    /// Merge present fields onto the record, leaving absent ones alone.
    fn apply(&self, record: &mut WeeklyRecord) {
        if let Some(v) = self.reach {
            record.reach = Some(v);
        }
        if let Some(v) = self.clicks {
            record.clicks = Some(v);
        }
        if let Some(v) = self.leads {
            record.leads = Some(v);
        }
        if let Some(v) = self.weekly_cost {
            record.weekly_cost = Some(v);
        }
        if let Some(v) = self.cost_per_lead {
            record.cost_per_lead = Some(v);
        }
        if let Some(v) = self.registered_drivers {
            record.registered_drivers = Some(v);
        }
        if let Some(v) = self.first_trip_drivers {
            record.first_trip_drivers = Some(v);
        }
        if let Some(v) = self.cost_per_registered_driver {
            record.cost_per_registered_driver = Some(v);
        }
        if let Some(v) = self.cost_per_first_trip_driver {
            record.cost_per_first_trip_driver = Some(v);
        }
    }

    fn is_empty(&self) -> bool {
        self.reach.is_none()
            && self.clicks.is_none()
            && self.leads.is_none()
            && self.weekly_cost.is_none()
            && self.cost_per_lead.is_none()
            && self.registered_drivers.is_none()
            && self.first_trip_drivers.is_none()
            && self.cost_per_registered_driver.is_none()
            && self.cost_per_first_trip_driver.is_none()
    }
}

impl CampaignStore {
    /// Create a store mirrored to the given snapshot repository, reloading
    /// the last-known-good snapshot when one exists.
    pub fn new(snapshots: Arc<dyn SnapshotRepository>, max_active_creatives: usize) -> Self {
        let store = Self {
            campaigns: DashMap::new(),
            weekly_records: DashMap::new(),
            creatives: DashMap::new(),
            ideal_metrics: DashMap::new(),
            tasks: DashMap::new(),
            messages: DashMap::new(),
            audit_log: DashMap::new(),
            state_machine: CampaignStateMachine::new(),
            snapshots,
            max_active_creatives,
        };
        match store.snapshots.load_fallback() {
            Ok(Some(snapshot)) => store.restore(snapshot),
            Ok(None) => info!("Campaign store initialized empty (no snapshot found)"),
            Err(e) => {
                tracing::warn!(error = %e, "Snapshot load failed, starting empty");
            }
        }
        store
    }

    /// Store without durable fallback, for tests.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(NullSnapshot), 5)
    }

    fn restore(&self, snapshot: StoreSnapshot) {
        for campaign in snapshot.campaigns {
            self.campaigns.insert(campaign.id, campaign);
        }
        for record in snapshot.weekly_records {
            self.weekly_records.insert(record.id, record);
        }
        for creative in snapshot.creatives {
            self.creatives.insert(creative.id, creative);
        }
        for metric in snapshot.ideal_metrics {
            self.ideal_metrics.insert(metric.id, metric);
        }
        info!(
            campaigns = self.campaigns.len(),
            weekly_records = self.weekly_records.len(),
            "Campaign store restored from snapshot"
        );
    }

    /// Mirror the full store state to the fallback. Best-effort: a failed
    /// mirror is logged and never fails the action that triggered it.
    pub(crate) fn persist(&self) {
        let snapshot = StoreSnapshot {
            campaigns: self.campaigns.iter().map(|r| r.value().clone()).collect(),
            weekly_records: self
                .weekly_records
                .iter()
                .map(|r| r.value().clone())
                .collect(),
            creatives: self.creatives.iter().map(|r| r.value().clone()).collect(),
            ideal_metrics: self
                .ideal_metrics
                .iter()
                .map(|r| r.value().clone())
                .collect(),
        };
        persistence::save_best_effort(self.snapshots.as_ref(), &snapshot);
    }

    // ─── Campaigns ─────────────────────────────────────────────────────────

    pub fn list_campaigns(&self) -> Vec<Campaign> {
        let mut campaigns: Vec<Campaign> =
            self.campaigns.iter().map(|r| r.value().clone()).collect();
        campaigns.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        campaigns
    }

    pub fn get_campaign(&self, id: Uuid) -> Option<Campaign> {
        self.campaigns.get(&id).map(|r| r.value().clone())
    }

    pub fn campaigns_by_state(&self, state: CampaignState) -> Vec<Campaign> {
        let mut campaigns: Vec<Campaign> = self
            .campaigns
            .iter()
            .filter(|r| r.value().state == state)
            .map(|r| r.value().clone())
            .collect();
        campaigns.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        campaigns
    }

    pub fn campaigns_by_owner(&self, owner: &str) -> Vec<Campaign> {
        let mut campaigns: Vec<Campaign> = self
            .campaigns
            .iter()
            .filter(|r| r.value().owner_name.eq_ignore_ascii_case(owner))
            .map(|r| r.value().clone())
            .collect();
        campaigns.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        campaigns
    }

    pub fn create_campaign(&self, req: CreateCampaignRequest, user: &str) -> Campaign {
        let now = Utc::now();
        let sequence = self.campaigns.len() + 1;
        let owner_initials = req
            .owner_initials
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_uppercase)
            .unwrap_or_else(|| naming::initials_from_name(&req.owner_name));
        let name = naming::resolve_name(req.name.as_deref(), req.generated_name.as_deref(), || {
            naming::generate_name(
                req.country,
                req.vertical,
                req.platform,
                req.segment,
                sequence,
                &owner_initials,
                &req.short_description,
            )
        });

        let campaign = Campaign {
            id: Uuid::new_v4(),
            name,
            country: req.country,
            vertical: req.vertical,
            platform: req.platform,
            segment: req.segment,
            external_platform_id: req.external_platform_id,
            owner_name: req.owner_name,
            owner_initials,
            short_description: req.short_description,
            objective: req.objective,
            benefit: req.benefit,
            description: req.description,
            landing_type: req.landing_type,
            landing_url: req.landing_url,
            report_url: None,
            state: CampaignState::Pending,
            creative_file: None,
            creative_file_name: None,
            external_creative_url: None,
            reach: None,
            clicks: None,
            leads: None,
            weekly_cost: None,
            cost_per_lead: None,
            registered_drivers: None,
            first_trip_drivers: None,
            cost_per_registered_driver: None,
            cost_per_first_trip_driver: None,
            // Campaigns report against the week before creation.
            iso_week: week::previous_iso_week(now),
            created_at: now,
            updated_at: now,
        };
        let id = campaign.id;
        self.campaigns.insert(id, campaign.clone());
        self.log_audit(
            user,
            AuditAction::Create,
            "campaign",
            &id.to_string(),
            serde_json::json!({"name": &campaign.name}),
        );
        self.ensure_tasks_for(&campaign);
        self.persist();
        info!(campaign_id = %id, name = %campaign.name, "Campaign created");
        campaign
    }

    pub fn update_campaign(
        &self,
        id: Uuid,
        req: UpdateCampaignRequest,
        user: &str,
    ) -> SiscocaResult<Campaign> {
        let touches_trafficker = req.touches_trafficker_metrics();
        let touches_owner = req.touches_owner_metrics();

        let (updated, state_change) = {
            let mut entry = self
                .campaigns
                .get_mut(&id)
                .ok_or_else(|| SiscocaError::NotFound(format!("campaign {}", id)))?;
            let c = entry.value_mut();

            let mut state_change = None;
            if let Some(new_state) = req.state {
                if new_state != c.state {
                    self.state_machine.ensure_transition(c.state, new_state)?;
                    state_change = Some((c.state, new_state));
                    c.state = new_state;
                }
            }

            if let Some(name) = req.name {
                c.name = name;
            }
            if let Some(v) = req.external_platform_id {
                c.external_platform_id = Some(v);
            }
            if let Some(v) = req.owner_name {
                c.owner_name = v;
            }
            if let Some(v) = req.owner_initials {
                c.owner_initials = v.to_uppercase();
            }
            if let Some(v) = req.short_description {
                c.short_description = v;
            }
            if let Some(v) = req.objective {
                c.objective = v;
            }
            if let Some(v) = req.benefit {
                c.benefit = v;
            }
            if let Some(v) = req.description {
                c.description = v;
            }
            if let Some(v) = req.landing_type {
                c.landing_type = Some(v);
            }
            if let Some(v) = req.landing_url {
                c.landing_url = Some(v);
            }
            if let Some(v) = req.report_url {
                c.report_url = Some(v);
            }
            if let Some(v) = req.creative_file {
                c.creative_file = Some(v);
            }
            if let Some(v) = req.creative_file_name {
                c.creative_file_name = Some(v);
            }
            if let Some(v) = req.external_creative_url {
                c.external_creative_url = Some(v);
            }
            if let Some(v) = req.reach {
                c.reach = Some(v);
            }
            if let Some(v) = req.clicks {
                c.clicks = Some(v);
            }
            if let Some(v) = req.leads {
                c.leads = Some(v);
            }
            if let Some(v) = req.weekly_cost {
                c.weekly_cost = Some(v);
            }
            if let Some(v) = req.cost_per_lead {
                c.cost_per_lead = Some(v);
            }
            if let Some(v) = req.registered_drivers {
                c.registered_drivers = Some(v);
            }
            if let Some(v) = req.first_trip_drivers {
                c.first_trip_drivers = Some(v);
            }

            // Cost per lead follows cost and leads whenever either moves.
            if (req.weekly_cost.is_some() || req.leads.is_some()) && req.cost_per_lead.is_none() {
                if let (Some(cost), Some(leads)) = (c.weekly_cost, c.leads) {
                    c.cost_per_lead = Some(cost_per_unit(cost, leads));
                }
            }

            c.updated_at = Utc::now();
            (c.clone(), state_change)
        };

        if let Some((from, to)) = state_change {
            self.log_audit(
                user,
                AuditAction::StateChange,
                "campaign",
                &id.to_string(),
                serde_json::json!({
                    "from": from.display_name(),
                    "to": to.display_name(),
                }),
            );
        }

        // A metrics-bearing update also lands in the reporting week's
        // history record, so the weekly table never lags the campaign.
        if touches_trafficker || touches_owner {
            let mut patch = WeekMetricsPatch {
                reach: req.reach,
                clicks: req.clicks,
                leads: req.leads,
                weekly_cost: req.weekly_cost,
                cost_per_lead: updated.cost_per_lead,
                registered_drivers: req.registered_drivers,
                first_trip_drivers: req.first_trip_drivers,
                ..Default::default()
            };
            if touches_owner {
                if let Some(cost) = updated.weekly_cost {
                    patch.cost_per_registered_driver = updated
                        .registered_drivers
                        .filter(|d| *d > 0)
                        .map(|d| cost_per_unit(cost, d));
                    patch.cost_per_first_trip_driver = updated
                        .first_trip_drivers
                        .filter(|d| *d > 0)
                        .map(|d| cost_per_unit(cost, d));
                }
            }
            self.upsert_week_metrics(id, updated.iso_week, None, patch, user);
            self.check_tasks_for(&updated);
        }

        self.log_audit(
            user,
            AuditAction::Update,
            "campaign",
            &id.to_string(),
            serde_json::json!({"metrics_updated": touches_trafficker || touches_owner}),
        );
        self.persist();
        Ok(updated)
    }

    pub fn delete_campaign(&self, id: Uuid, user: &str) -> bool {
        let removed = self.campaigns.remove(&id).is_some();
        if removed {
            // Cascade: creatives, history, tasks, and chat all hang off
            // the campaign.
            self.remove_where(&self.creatives, |c: &Creative| c.campaign_id == id);
            self.remove_where(&self.weekly_records, |r: &WeeklyRecord| r.campaign_id == id);
            self.remove_where(&self.tasks, |t: &PendingTask| t.campaign_id == id);
            self.remove_where(&self.messages, |m: &ChatMessage| m.campaign_id == id);
            self.log_audit(
                user,
                AuditAction::Delete,
                "campaign",
                &id.to_string(),
                serde_json::json!({}),
            );
            self.persist();
        }
        removed
    }

    fn remove_where<V: Clone>(&self, map: &DashMap<Uuid, V>, pred: impl Fn(&V) -> bool) {
        let ids: Vec<Uuid> = map
            .iter()
            .filter(|r| pred(r.value()))
            .map(|r| *r.key())
            .collect();
        for id in ids {
            map.remove(&id);
        }
    }

    // ─── Metrics submission ────────────────────────────────────────────────

    /// Trafficker (ad-ops) weekly metrics. The campaign must be live, and
    /// the funnel must be monotone: reach ≥ clicks ≥ leads.
    pub fn submit_trafficker_metrics(
        &self,
        id: Uuid,
        req: TraffickerMetricsRequest,
        user: &str,
    ) -> SiscocaResult<Campaign> {
        validation::validate_trafficker_funnel(req.reach, req.clicks, req.leads)?;
        validation::validate_non_negative_cost("weekly cost", req.weekly_cost)?;

        let updated = {
            let mut entry = self
                .campaigns
                .get_mut(&id)
                .ok_or_else(|| SiscocaError::NotFound(format!("campaign {}", id)))?;
            let c = entry.value_mut();
            if c.state != CampaignState::Active {
                return Err(SiscocaError::Precondition(
                    "campaign must be in Active state to submit metrics".to_string(),
                ));
            }

            let cost_per_lead = req
                .cost_per_lead
                .unwrap_or_else(|| cost_per_unit(req.weekly_cost, req.leads));

            c.reach = Some(req.reach);
            c.clicks = Some(req.clicks);
            c.leads = Some(req.leads);
            c.weekly_cost = Some(req.weekly_cost);
            c.cost_per_lead = Some(cost_per_lead);
            if let Some(url) = req.report_url {
                c.report_url = Some(url);
            }
            c.updated_at = Utc::now();
            c.clone()
        };

        self.upsert_week_metrics(
            id,
            updated.iso_week,
            None,
            WeekMetricsPatch {
                reach: updated.reach,
                clicks: updated.clicks,
                leads: updated.leads,
                weekly_cost: updated.weekly_cost,
                cost_per_lead: updated.cost_per_lead,
                ..Default::default()
            },
            user,
        );
        self.complete_task(id, updated.iso_week, TaskKind::SubmitTraffickerMetrics);
        self.log_audit(
            user,
            AuditAction::MetricsSubmit,
            "campaign",
            &id.to_string(),
            serde_json::json!({"role": "trafficker", "reach": updated.reach, "leads": updated.leads}),
        );
        self.persist();
        Ok(updated)
    }

    /// Owner (conversion) weekly metrics. Fails fast — before any side
    /// effect — when trafficker metrics have not landed yet.
    pub fn complete_owner_metrics(
        &self,
        id: Uuid,
        req: OwnerMetricsRequest,
        user: &str,
    ) -> SiscocaResult<Campaign> {
        validation::validate_owner_funnel(req.registered_drivers, req.first_trip_drivers)?;

        let updated = {
            let mut entry = self
                .campaigns
                .get_mut(&id)
                .ok_or_else(|| SiscocaError::NotFound(format!("campaign {}", id)))?;
            let c = entry.value_mut();

            let weekly_cost = match c.weekly_cost {
                Some(cost) if cost > 0.0 => cost,
                _ => {
                    return Err(SiscocaError::Precondition(
                        "trafficker metrics must be submitted first".to_string(),
                    ))
                }
            };

            c.registered_drivers = Some(req.registered_drivers);
            c.first_trip_drivers = Some(req.first_trip_drivers);
            c.cost_per_registered_driver =
                Some(cost_per_unit(weekly_cost, req.registered_drivers));
            c.cost_per_first_trip_driver =
                Some(cost_per_unit(weekly_cost, req.first_trip_drivers));
            c.updated_at = Utc::now();
            c.clone()
        };

        self.upsert_week_metrics(
            id,
            updated.iso_week,
            None,
            WeekMetricsPatch {
                registered_drivers: updated.registered_drivers,
                first_trip_drivers: updated.first_trip_drivers,
                cost_per_registered_driver: updated.cost_per_registered_driver,
                cost_per_first_trip_driver: updated.cost_per_first_trip_driver,
                ..Default::default()
            },
            user,
        );
        self.complete_task(id, updated.iso_week, TaskKind::SubmitOwnerMetrics);
        self.log_audit(
            user,
            AuditAction::MetricsSubmit,
            "campaign",
            &id.to_string(),
            serde_json::json!({
                "role": "owner",
                "registered_drivers": updated.registered_drivers,
            }),
        );
        self.persist();
        Ok(updated)
    }

    // ─── Lifecycle ─────────────────────────────────────────────────────────

    pub fn change_state(
        &self,
        id: Uuid,
        new_state: CampaignState,
        user: &str,
    ) -> SiscocaResult<Campaign> {
        let (updated, previous) = {
            let mut entry = self
                .campaigns
                .get_mut(&id)
                .ok_or_else(|| SiscocaError::NotFound(format!("campaign {}", id)))?;
            let c = entry.value_mut();
            self.state_machine.ensure_transition(c.state, new_state)?;
            let previous = c.state;
            c.state = new_state;
            c.updated_at = Utc::now();
            (c.clone(), previous)
        };
        self.log_audit(
            user,
            AuditAction::StateChange,
            "campaign",
            &id.to_string(),
            serde_json::json!({
                "from": previous.display_name(),
                "to": new_state.display_name(),
            }),
        );
        self.persist();
        Ok(updated)
    }

    /// Archive a campaign: snapshot its metrics into the reporting week's
    /// history record, then move it to Archived.
    ///
    /// Gated: both metric sets must exist at least once — reach for the
    /// trafficker side, registered drivers for the owner side (zero is a
    /// valid value for either).
    pub fn archive_campaign(&self, id: Uuid, user: &str) -> SiscocaResult<Campaign> {
        let snapshot = {
            let entry = self
                .campaigns
                .get(&id)
                .ok_or_else(|| SiscocaError::NotFound(format!("campaign {}", id)))?;
            let c = entry.value();

            if !c.has_trafficker_metrics() || !c.has_owner_metrics() {
                return Err(SiscocaError::Precondition(
                    "cannot archive: trafficker or owner metrics are missing".to_string(),
                ));
            }
            if let Some(cost) = c.weekly_cost {
                validation::validate_non_negative_cost("weekly cost", cost)?;
            }
            // Only a live campaign can be archived; the same-state no-op
            // the machine allows elsewhere does not apply here.
            if c.state != CampaignState::Active {
                return Err(SiscocaError::InvalidTransition {
                    from: c.state.display_name().to_string(),
                    to: CampaignState::Archived.display_name().to_string(),
                });
            }
            c.clone()
        };

        self.upsert_week_metrics(
            id,
            snapshot.iso_week,
            None,
            WeekMetricsPatch::from_campaign(&snapshot),
            user,
        );

        let updated = {
            // Re-acquired after the history write; the gate above already
            // validated the transition.
            let mut entry = self
                .campaigns
                .get_mut(&id)
                .ok_or_else(|| SiscocaError::NotFound(format!("campaign {}", id)))?;
            let c = entry.value_mut();
            c.state = CampaignState::Archived;
            c.updated_at = Utc::now();
            c.clone()
        };

        self.log_audit(
            user,
            AuditAction::Archive,
            "campaign",
            &id.to_string(),
            serde_json::json!({"iso_week": updated.iso_week}),
        );
        self.persist();
        info!(campaign_id = %id, iso_week = updated.iso_week, "Campaign archived");
        Ok(updated)
    }

    pub fn reactivate_campaign(&self, id: Uuid, user: &str) -> SiscocaResult<Campaign> {
        let updated = {
            let mut entry = self
                .campaigns
                .get_mut(&id)
                .ok_or_else(|| SiscocaError::NotFound(format!("campaign {}", id)))?;
            let c = entry.value_mut();
            // Only archived campaigns can be reactivated.
            if c.state != CampaignState::Archived {
                return Err(SiscocaError::InvalidTransition {
                    from: c.state.display_name().to_string(),
                    to: CampaignState::Active.display_name().to_string(),
                });
            }
            c.state = CampaignState::Active;
            c.updated_at = Utc::now();
            c.clone()
        };
        self.log_audit(
            user,
            AuditAction::Reactivate,
            "campaign",
            &id.to_string(),
            serde_json::json!({}),
        );
        self.persist();
        Ok(updated)
    }

    // ─── Weekly history ────────────────────────────────────────────────────

    pub fn list_history(&self) -> Vec<WeeklyRecord> {
        let mut records: Vec<WeeklyRecord> = self
            .weekly_records
            .iter()
            .map(|r| r.value().clone())
            .collect();
        records.sort_by(|a, b| b.iso_week.cmp(&a.iso_week).then(b.recorded_at.cmp(&a.recorded_at)));
        records
    }

    pub fn history_for_campaign(&self, campaign_id: Uuid) -> Vec<WeeklyRecord> {
        let mut records: Vec<WeeklyRecord> = self
            .weekly_records
            .iter()
            .filter(|r| r.value().campaign_id == campaign_id)
            .map(|r| r.value().clone())
            .collect();
        records.sort_by(|a, b| b.iso_week.cmp(&a.iso_week));
        records
    }

    pub fn history_for_week(&self, iso_week: u32) -> Vec<WeeklyRecord> {
        self.weekly_records
            .iter()
            .filter(|r| r.value().iso_week == iso_week)
            .map(|r| r.value().clone())
            .collect()
    }

    /// Explicit weekly upsert from the history form. The campaign must
    /// exist; the week defaults to the previous ISO week.
    pub fn save_weekly_record(
        &self,
        req: SaveWeeklyRecordRequest,
        user: &str,
    ) -> SiscocaResult<WeeklyRecord> {
        if !self.campaigns.contains_key(&req.campaign_id) {
            return Err(SiscocaError::NotFound(format!(
                "campaign {}",
                req.campaign_id
            )));
        }
        let iso_week = req
            .iso_week
            .unwrap_or_else(|| week::previous_iso_week(Utc::now()));
        let record = self.upsert_week_metrics(
            req.campaign_id,
            iso_week,
            req.week_date,
            WeekMetricsPatch {
                reach: req.reach,
                clicks: req.clicks,
                leads: req.leads,
                weekly_cost: req.weekly_cost,
                cost_per_lead: req.cost_per_lead,
                registered_drivers: req.registered_drivers,
                first_trip_drivers: req.first_trip_drivers,
                ..Default::default()
            },
            user,
        );
        self.persist();
        Ok(record)
    }

    pub fn delete_weekly_record(&self, id: Uuid, user: &str) -> bool {
        let removed = self.weekly_records.remove(&id).is_some();
        if removed {
            self.log_audit(
                user,
                AuditAction::Delete,
                "weekly_record",
                &id.to_string(),
                serde_json::json!({}),
            );
            self.persist();
        }
        removed
    }

    /// Upsert keyed by `(campaign_id, iso_week)`: merge the patch onto any
    /// existing record — preserving its `recorded_at`/`recorded_by` — or
    /// create a fresh one.
    pub(crate) fn upsert_week_metrics(
        &self,
        campaign_id: Uuid,
        iso_week: u32,
        week_date: Option<DateTime<Utc>>,
        patch: WeekMetricsPatch,
        recorded_by: &str,
    ) -> WeeklyRecord {
        let existing_id = self
            .weekly_records
            .iter()
            .find(|r| r.value().campaign_id == campaign_id && r.value().iso_week == iso_week)
            .map(|r| *r.key());

        match existing_id.and_then(|id| self.weekly_records.get_mut(&id)) {
            Some(mut entry) => {
                let record = entry.value_mut();
                patch.apply(record);
                if let Some(date) = week_date {
                    record.week_date = date;
                }
                record.clone()
            }
            None => {
                let now = Utc::now();
                let record = WeeklyRecord {
                    id: Uuid::new_v4(),
                    campaign_id,
                    iso_week,
                    week_date: week_date.unwrap_or(now),
                    reach: patch.reach,
                    clicks: patch.clicks,
                    leads: patch.leads,
                    weekly_cost: patch.weekly_cost,
                    cost_per_lead: patch.cost_per_lead,
                    registered_drivers: patch.registered_drivers,
                    first_trip_drivers: patch.first_trip_drivers,
                    cost_per_registered_driver: patch.cost_per_registered_driver,
                    cost_per_first_trip_driver: patch.cost_per_first_trip_driver,
                    recorded_at: now,
                    recorded_by: recorded_by.to_string(),
                };
                self.weekly_records.insert(record.id, record.clone());
                record
            }
        }
    }

    // ─── Bulk import ───────────────────────────────────────────────────────

    /// Import loosely-typed history rows. Rows pass the parsing boundary
    /// one at a time; a bad row lands in `errors` without aborting the
    /// batch.
    pub fn import_history(&self, rows: &[Value], user: &str) -> ImportReport {
        let mut report = ImportReport {
            processed: rows.len(),
            ..Default::default()
        };

        for (index, raw) in rows.iter().enumerate() {
            match import::parse_row(raw).and_then(|row| self.apply_import_row(row, user)) {
                Ok(true) => report.created += 1,
                Ok(false) => report.updated += 1,
                Err(e) => report.errors.push(format!("row {}: {}", index + 1, e)),
            }
        }

        self.log_audit(
            user,
            AuditAction::Import,
            "weekly_record",
            "batch",
            serde_json::json!({
                "processed": report.processed,
                "created": report.created,
                "updated": report.updated,
                "errors": report.errors.len(),
            }),
        );
        self.persist();
        info!(
            processed = report.processed,
            created = report.created,
            updated = report.updated,
            errors = report.errors.len(),
            "History import completed"
        );
        report
    }

    /// Returns `Ok(true)` when a new record was created, `Ok(false)` when
    /// an existing one was updated.
    fn apply_import_row(&self, row: ParsedHistoryRow, user: &str) -> SiscocaResult<bool> {
        let campaign_id = self.resolve_campaign_ref(&row.campaign)?;
        let iso_week = row
            .iso_week
            .unwrap_or_else(|| week::previous_iso_week(Utc::now()));

        let mut patch = WeekMetricsPatch {
            reach: row.reach,
            clicks: row.clicks,
            leads: row.leads,
            weekly_cost: row.weekly_cost,
            cost_per_lead: row.cost_per_lead,
            registered_drivers: row.registered_drivers,
            first_trip_drivers: row.first_trip_drivers,
            ..Default::default()
        };
        // Derive per-driver costs the sheet usually omits.
        if let Some(cost) = row.weekly_cost {
            patch.cost_per_registered_driver = row
                .registered_drivers
                .filter(|d| *d > 0)
                .map(|d| cost_per_unit(cost, d));
            patch.cost_per_first_trip_driver = row
                .first_trip_drivers
                .filter(|d| *d > 0)
                .map(|d| cost_per_unit(cost, d));
        }
        if patch.is_empty() {
            return Err(SiscocaError::Import(
                "row carries no metric values".to_string(),
            ));
        }

        let existed = self
            .weekly_records
            .iter()
            .any(|r| r.value().campaign_id == campaign_id && r.value().iso_week == iso_week);
        let recorded_by = row.recorded_by.as_deref().unwrap_or(user);
        self.upsert_week_metrics(campaign_id, iso_week, row.week_date, patch, recorded_by);
        Ok(!existed)
    }

    fn resolve_campaign_ref(&self, campaign_ref: &CampaignRef) -> SiscocaResult<Uuid> {
        match campaign_ref {
            CampaignRef::Id(id) => {
                if self.campaigns.contains_key(id) {
                    Ok(*id)
                } else {
                    Err(SiscocaError::Import(format!("unknown campaign id {}", id)))
                }
            }
            CampaignRef::ExternalPlatformId(ext) => self
                .campaigns
                .iter()
                .find(|r| r.value().external_platform_id.as_deref() == Some(ext.as_str()))
                .map(|r| *r.key())
                .ok_or_else(|| {
                    SiscocaError::Import(format!("no campaign with external platform id {}", ext))
                }),
            CampaignRef::Name(name) => self
                .campaigns
                .iter()
                .find(|r| r.value().name == *name)
                .map(|r| *r.key())
                .ok_or_else(|| SiscocaError::Import(format!("no campaign named {}", name))),
        }
    }

    // ─── Ideal metrics ─────────────────────────────────────────────────────

    pub fn list_ideal_metrics(&self) -> Vec<IdealMetric> {
        let mut metrics: Vec<IdealMetric> = self
            .ideal_metrics
            .iter()
            .map(|r| r.value().clone())
            .collect();
        metrics.sort_by(|a, b| format!("{:?}", a.category).cmp(&format!("{:?}", b.category)));
        metrics
    }

    pub fn ideal_metrics_for(&self, campaign: &Campaign) -> Vec<IdealMetric> {
        self.ideal_metrics
            .iter()
            .filter(|r| r.value().applies_to(campaign))
            .map(|r| r.value().clone())
            .collect()
    }

    /// Create or update an ideal metric depending on whether the request
    /// carries an id.
    pub fn save_ideal_metric(
        &self,
        req: IdealMetricRequest,
        user: &str,
    ) -> SiscocaResult<IdealMetric> {
        let now = Utc::now();
        let metric = match req.id {
            Some(id) => {
                let mut entry = self
                    .ideal_metrics
                    .get_mut(&id)
                    .ok_or_else(|| SiscocaError::NotFound(format!("ideal metric {}", id)))?;
                let m = entry.value_mut();
                m.name = req.name;
                m.category = req.category;
                m.ideal_value = req.ideal_value;
                m.min_value = req.min_value;
                m.max_value = req.max_value;
                m.unit = req.unit;
                m.country = req.country;
                m.vertical = req.vertical;
                m.platform = req.platform;
                m.segment = req.segment;
                m.active = req.active;
                m.updated_at = now;
                m.clone()
            }
            None => {
                let metric = IdealMetric {
                    id: Uuid::new_v4(),
                    name: req.name,
                    category: req.category,
                    ideal_value: req.ideal_value,
                    min_value: req.min_value,
                    max_value: req.max_value,
                    unit: req.unit,
                    country: req.country,
                    vertical: req.vertical,
                    platform: req.platform,
                    segment: req.segment,
                    active: req.active,
                    created_at: now,
                    updated_at: now,
                };
                self.ideal_metrics.insert(metric.id, metric.clone());
                metric
            }
        };
        self.log_audit(
            user,
            AuditAction::Update,
            "ideal_metric",
            &metric.id.to_string(),
            serde_json::json!({"name": &metric.name}),
        );
        self.persist();
        Ok(metric)
    }

    pub fn delete_ideal_metric(&self, id: Uuid, user: &str) -> bool {
        let removed = self.ideal_metrics.remove(&id).is_some();
        if removed {
            self.log_audit(
                user,
                AuditAction::Delete,
                "ideal_metric",
                &id.to_string(),
                serde_json::json!({}),
            );
            self.persist();
        }
        removed
    }

    // ─── Monitoring ────────────────────────────────────────────────────────

    pub fn monitoring_overview(&self) -> MonitoringOverview {
        let count_state = |state: CampaignState| {
            self.campaigns
                .iter()
                .filter(|r| r.value().state == state)
                .count() as u64
        };
        MonitoringOverview {
            total_campaigns: self.campaigns.len() as u64,
            pending_campaigns: count_state(CampaignState::Pending),
            creative_sent_campaigns: count_state(CampaignState::CreativeSent),
            active_campaigns: count_state(CampaignState::Active),
            archived_campaigns: count_state(CampaignState::Archived),
            total_reach: self
                .campaigns
                .iter()
                .filter_map(|r| r.value().reach)
                .sum(),
            total_leads: self
                .campaigns
                .iter()
                .filter_map(|r| r.value().leads)
                .sum(),
            total_weekly_cost: round2(
                self.campaigns
                    .iter()
                    .filter_map(|r| r.value().weekly_cost)
                    .sum(),
            ),
            total_registered_drivers: self
                .campaigns
                .iter()
                .filter_map(|r| r.value().registered_drivers)
                .sum(),
            weekly_records: self.weekly_records.len() as u64,
            pending_tasks: self
                .tasks
                .iter()
                .filter(|r| r.value().status == TaskStatus::Pending)
                .count() as u64,
            unread_messages: self.unread_count(),
        }
    }

    // ─── Audit log ─────────────────────────────────────────────────────────

    pub fn get_audit_log(&self) -> Vec<AuditEntry> {
        let mut entries: Vec<AuditEntry> =
            self.audit_log.iter().map(|r| r.value().clone()).collect();
        entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        entries
    }

    pub(crate) fn log_audit(
        &self,
        user: &str,
        action: AuditAction,
        resource_type: &str,
        resource_id: &str,
        details: Value,
    ) {
        let entry = AuditEntry {
            id: Uuid::new_v4(),
            user: user.to_string(),
            action,
            resource_type: resource_type.to_string(),
            resource_id: resource_id.to_string(),
            details,
            timestamp: Utc::now(),
        };
        self.audit_log.insert(entry.id, entry);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use siscoca_core::types::{Country, Platform, Segment, Vertical};

    fn create_request() -> CreateCampaignRequest {
        CreateCampaignRequest {
            name: None,
            generated_name: None,
            country: Country::Pe,
            vertical: Vertical::Motoper,
            platform: Platform::Fb,
            segment: Segment::Acquisition,
            external_platform_id: Some("fb-ext-1".into()),
            owner_name: "Gabriela Flores".into(),
            owner_initials: Some("GF".into()),
            short_description: "Verano2025".into(),
            objective: "Acquisition push".into(),
            benefit: "Bonus week".into(),
            description: "Summer acquisition campaign".into(),
            landing_type: None,
            landing_url: None,
        }
    }

    fn active_campaign(store: &CampaignStore) -> Campaign {
        let campaign = store.create_campaign(create_request(), "admin");
        store
            .change_state(campaign.id, CampaignState::CreativeSent, "admin")
            .unwrap();
        store
            .change_state(campaign.id, CampaignState::Active, "admin")
            .unwrap()
    }

    fn trafficker_metrics() -> TraffickerMetricsRequest {
        TraffickerMetricsRequest {
            reach: 10_000,
            clicks: 500,
            leads: 50,
            weekly_cost: 2500.0,
            cost_per_lead: None,
            report_url: None,
        }
    }

    // 1. Naming --------------------------------------------------------------

    #[test]
    fn first_campaign_gets_sequence_001() {
        let store = CampaignStore::in_memory();
        let campaign = store.create_campaign(create_request(), "admin");
        assert_eq!(campaign.name, "PE-MOTOPER-FB-ADQ-001-GF-Verano2025");
        assert_eq!(campaign.state, CampaignState::Pending);

        let second = store.create_campaign(
            CreateCampaignRequest {
                name: Some("Manual Name".into()),
                ..create_request()
            },
            "admin",
        );
        assert_eq!(second.name, "Manual Name");
    }

    // 2. Cost derivation -----------------------------------------------------

    #[test]
    fn cost_per_lead_is_derived_when_absent() {
        let store = CampaignStore::in_memory();
        let campaign = active_campaign(&store);
        let updated = store
            .submit_trafficker_metrics(campaign.id, trafficker_metrics(), "trafficker")
            .unwrap();
        assert_eq!(updated.cost_per_lead, Some(50.0));
    }

    #[test]
    fn cost_per_lead_is_zero_without_leads() {
        let store = CampaignStore::in_memory();
        let campaign = active_campaign(&store);
        let updated = store
            .submit_trafficker_metrics(
                campaign.id,
                TraffickerMetricsRequest {
                    reach: 1000,
                    clicks: 10,
                    leads: 0,
                    weekly_cost: 300.0,
                    cost_per_lead: None,
                    report_url: None,
                },
                "trafficker",
            )
            .unwrap();
        assert_eq!(updated.cost_per_lead, Some(0.0));
    }

    #[test]
    fn funnel_violation_blocks_submission() {
        let store = CampaignStore::in_memory();
        let campaign = active_campaign(&store);
        let err = store
            .submit_trafficker_metrics(
                campaign.id,
                TraffickerMetricsRequest {
                    reach: 100,
                    clicks: 500,
                    leads: 50,
                    weekly_cost: 2500.0,
                    cost_per_lead: None,
                    report_url: None,
                },
                "trafficker",
            )
            .unwrap_err();
        assert!(matches!(err, SiscocaError::Validation(_)));
        // Nothing landed on the campaign.
        assert!(store.get_campaign(campaign.id).unwrap().reach.is_none());
    }

    #[test]
    fn metrics_require_an_active_campaign() {
        let store = CampaignStore::in_memory();
        let campaign = store.create_campaign(create_request(), "admin");
        let err = store
            .submit_trafficker_metrics(campaign.id, trafficker_metrics(), "trafficker")
            .unwrap_err();
        assert!(matches!(err, SiscocaError::Precondition(_)));
    }

    // 3. Owner-metrics precondition ------------------------------------------

    #[test]
    fn owner_metrics_fail_fast_without_trafficker_cost() {
        let store = CampaignStore::in_memory();
        let campaign = active_campaign(&store);
        let err = store
            .complete_owner_metrics(
                campaign.id,
                OwnerMetricsRequest {
                    registered_drivers: 30,
                    first_trip_drivers: 20,
                },
                "owner",
            )
            .unwrap_err();
        assert!(err.to_string().contains("trafficker metrics"));
        // No weekly record was written on the failed path.
        assert!(store.history_for_campaign(campaign.id).is_empty());
    }

    #[test]
    fn owner_metrics_derive_per_driver_costs() {
        let store = CampaignStore::in_memory();
        let campaign = active_campaign(&store);
        store
            .submit_trafficker_metrics(campaign.id, trafficker_metrics(), "trafficker")
            .unwrap();
        let updated = store
            .complete_owner_metrics(
                campaign.id,
                OwnerMetricsRequest {
                    registered_drivers: 30,
                    first_trip_drivers: 20,
                },
                "owner",
            )
            .unwrap();
        assert_eq!(updated.cost_per_registered_driver, Some(83.33));
        assert_eq!(updated.cost_per_first_trip_driver, Some(125.0));
        assert_eq!(updated.cost_per_driver(), Some(125.0));
    }

    // 4. Archive gating ------------------------------------------------------

    #[test]
    fn archive_requires_both_metric_sets() {
        let store = CampaignStore::in_memory();
        let campaign = active_campaign(&store);

        let err = store.archive_campaign(campaign.id, "admin").unwrap_err();
        assert!(matches!(err, SiscocaError::Precondition(_)));

        store
            .submit_trafficker_metrics(campaign.id, trafficker_metrics(), "trafficker")
            .unwrap();
        let err = store.archive_campaign(campaign.id, "admin").unwrap_err();
        assert!(matches!(err, SiscocaError::Precondition(_)));

        // Zero registered drivers still counts as a submission.
        store
            .complete_owner_metrics(
                campaign.id,
                OwnerMetricsRequest {
                    registered_drivers: 0,
                    first_trip_drivers: 0,
                },
                "owner",
            )
            .unwrap();
        let archived = store.archive_campaign(campaign.id, "admin").unwrap();
        assert_eq!(archived.state, CampaignState::Archived);
    }

    #[test]
    fn reactivation_reverses_archive_only() {
        let store = CampaignStore::in_memory();
        let campaign = active_campaign(&store);
        let err = store.reactivate_campaign(campaign.id, "admin").unwrap_err();
        assert!(matches!(err, SiscocaError::InvalidTransition { .. }));

        store
            .submit_trafficker_metrics(campaign.id, trafficker_metrics(), "trafficker")
            .unwrap();
        store
            .complete_owner_metrics(
                campaign.id,
                OwnerMetricsRequest {
                    registered_drivers: 30,
                    first_trip_drivers: 20,
                },
                "owner",
            )
            .unwrap();
        store.archive_campaign(campaign.id, "admin").unwrap();

        let reactivated = store.reactivate_campaign(campaign.id, "admin").unwrap();
        assert_eq!(reactivated.state, CampaignState::Active);
    }

    // 5. Weekly upsert -------------------------------------------------------

    #[test]
    fn weekly_upsert_is_keyed_by_campaign_and_week() {
        let store = CampaignStore::in_memory();
        let campaign = store.create_campaign(create_request(), "admin");

        let first = store
            .save_weekly_record(
                SaveWeeklyRecordRequest {
                    campaign_id: campaign.id,
                    iso_week: Some(22),
                    week_date: None,
                    reach: Some(1000),
                    clicks: Some(100),
                    leads: Some(10),
                    weekly_cost: Some(500.0),
                    cost_per_lead: None,
                    registered_drivers: None,
                    first_trip_drivers: None,
                },
                "trafficker",
            )
            .unwrap();

        let second = store
            .save_weekly_record(
                SaveWeeklyRecordRequest {
                    campaign_id: campaign.id,
                    iso_week: Some(22),
                    week_date: None,
                    reach: Some(2000),
                    clicks: None,
                    leads: None,
                    weekly_cost: None,
                    cost_per_lead: None,
                    registered_drivers: Some(8),
                    first_trip_drivers: Some(5),
                },
                "owner",
            )
            .unwrap();

        // Exactly one record for the (campaign, week) pair.
        let records = store.history_for_campaign(campaign.id);
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.id, first.id);
        // Latest values merged over the originals.
        assert_eq!(record.reach, Some(2000));
        assert_eq!(record.clicks, Some(100));
        assert_eq!(record.registered_drivers, Some(8));
        // Original bookkeeping preserved.
        assert_eq!(record.recorded_at, first.recorded_at);
        assert_eq!(record.recorded_by, "trafficker");
        assert_eq!(second.recorded_by, "trafficker");
    }

    #[test]
    fn weekly_record_requires_existing_campaign() {
        let store = CampaignStore::in_memory();
        let err = store
            .save_weekly_record(
                SaveWeeklyRecordRequest {
                    campaign_id: Uuid::new_v4(),
                    iso_week: Some(22),
                    week_date: None,
                    reach: Some(1),
                    clicks: None,
                    leads: None,
                    weekly_cost: None,
                    cost_per_lead: None,
                    registered_drivers: None,
                    first_trip_drivers: None,
                },
                "admin",
            )
            .unwrap_err();
        assert!(matches!(err, SiscocaError::NotFound(_)));
    }

    // 6. Import --------------------------------------------------------------

    #[test]
    fn import_collects_per_row_errors_without_aborting() {
        let store = CampaignStore::in_memory();
        let campaign = store.create_campaign(create_request(), "admin");

        let rows = vec![
            serde_json::json!({
                "campaign_id": campaign.id.to_string(),
                "iso_week": 20,
                "reach": "10,000",
                "weekly_cost": "$1,250.50",
            }),
            // Unknown campaign
            serde_json::json!({
                "campaign_name": "does-not-exist",
                "iso_week": 20,
                "reach": 5,
            }),
            // Resolved by external platform id, updates the week-20 record
            serde_json::json!({
                "external_platform_id": "fb-ext-1",
                "iso_week": 20,
                "leads": "25",
                "weekly_cost": 1000,
                "registered_drivers": 4,
            }),
        ];

        let report = store.import_history(&rows, "admin");
        assert_eq!(report.processed, 3);
        assert_eq!(report.created, 1);
        assert_eq!(report.updated, 1);
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].starts_with("row 2:"));

        let records = store.history_for_campaign(campaign.id);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].reach, Some(10_000));
        assert_eq!(records[0].leads, Some(25));
        assert_eq!(records[0].weekly_cost, Some(1000.0));
        // Per-driver cost derived during import.
        assert_eq!(records[0].cost_per_registered_driver, Some(250.0));
    }

    // 7. Deletion cascade ----------------------------------------------------

    #[test]
    fn delete_cascades_to_dependents() {
        let store = CampaignStore::in_memory();
        let campaign = store.create_campaign(create_request(), "admin");
        store
            .save_weekly_record(
                SaveWeeklyRecordRequest {
                    campaign_id: campaign.id,
                    iso_week: Some(21),
                    week_date: None,
                    reach: Some(10),
                    clicks: None,
                    leads: None,
                    weekly_cost: None,
                    cost_per_lead: None,
                    registered_drivers: None,
                    first_trip_drivers: None,
                },
                "admin",
            )
            .unwrap();

        assert!(store.delete_campaign(campaign.id, "admin"));
        assert!(store.get_campaign(campaign.id).is_none());
        assert!(store.history_for_campaign(campaign.id).is_empty());
        assert!(store.pending_tasks().is_empty());
        // Idempotent: a second delete reports nothing removed.
        assert!(!store.delete_campaign(campaign.id, "admin"));
    }

    #[test]
    fn update_recomputes_cost_per_lead() {
        let store = CampaignStore::in_memory();
        let campaign = active_campaign(&store);
        store
            .submit_trafficker_metrics(campaign.id, trafficker_metrics(), "trafficker")
            .unwrap();
        let updated = store
            .update_campaign(
                campaign.id,
                UpdateCampaignRequest {
                    leads: Some(100),
                    ..Default::default()
                },
                "trafficker",
            )
            .unwrap();
        assert_eq!(updated.cost_per_lead, Some(25.0));
    }
}
