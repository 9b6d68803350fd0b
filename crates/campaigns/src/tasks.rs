//! Pending-task bookkeeping: one reminder per campaign-week per missing
//! metric set, completed automatically when the submission arrives.

use crate::models::*;
use crate::store::CampaignStore;
use chrono::Utc;
use siscoca_core::types::{Campaign, CampaignState};
use uuid::Uuid;

impl CampaignStore {
    pub fn list_tasks(&self) -> Vec<PendingTask> {
        let mut tasks: Vec<PendingTask> = self.tasks.iter().map(|r| r.value().clone()).collect();
        tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        tasks
    }

    pub fn pending_tasks(&self) -> Vec<PendingTask> {
        self.list_tasks()
            .into_iter()
            .filter(|t| t.status == TaskStatus::Pending)
            .collect()
    }

    /// Regenerate reminders for every non-archived campaign.
    pub fn generate_pending_tasks(&self) {
        let campaigns: Vec<Campaign> = self
            .campaigns
            .iter()
            .map(|r| r.value().clone())
            .collect();
        for campaign in campaigns {
            self.ensure_tasks_for(&campaign);
        }
    }

    /// Open the reminders a campaign still needs for its reporting week.
    pub(crate) fn ensure_tasks_for(&self, campaign: &Campaign) {
        if campaign.state == CampaignState::Archived {
            return;
        }
        if !campaign.has_trafficker_metrics() {
            self.ensure_task(campaign.id, campaign.iso_week, TaskKind::SubmitTraffickerMetrics);
        }
        if !campaign.has_owner_metrics() {
            self.ensure_task(campaign.id, campaign.iso_week, TaskKind::SubmitOwnerMetrics);
        }
    }

    /// Close reminders whose metrics have since landed.
    pub(crate) fn check_tasks_for(&self, campaign: &Campaign) {
        if campaign.has_trafficker_metrics() {
            self.complete_task(campaign.id, campaign.iso_week, TaskKind::SubmitTraffickerMetrics);
        }
        if campaign.has_owner_metrics() {
            self.complete_task(campaign.id, campaign.iso_week, TaskKind::SubmitOwnerMetrics);
        }
    }

    fn ensure_task(&self, campaign_id: Uuid, iso_week: u32, kind: TaskKind) {
        let exists = self.tasks.iter().any(|r| {
            let t = r.value();
            t.campaign_id == campaign_id && t.iso_week == iso_week && t.kind == kind
        });
        if exists {
            return;
        }
        let task = PendingTask {
            id: Uuid::new_v4(),
            campaign_id,
            iso_week,
            kind,
            status: TaskStatus::Pending,
            created_at: Utc::now(),
            completed_at: None,
        };
        self.tasks.insert(task.id, task);
    }

    pub(crate) fn complete_task(&self, campaign_id: Uuid, iso_week: u32, kind: TaskKind) {
        let ids: Vec<Uuid> = self
            .tasks
            .iter()
            .filter(|r| {
                let t = r.value();
                t.campaign_id == campaign_id
                    && t.iso_week == iso_week
                    && t.kind == kind
                    && t.status == TaskStatus::Pending
            })
            .map(|r| *r.key())
            .collect();
        for id in ids {
            if let Some(mut entry) = self.tasks.get_mut(&id) {
                let t = entry.value_mut();
                t.status = TaskStatus::Completed;
                t.completed_at = Some(Utc::now());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CreateCampaignRequest, OwnerMetricsRequest, TraffickerMetricsRequest};
    use siscoca_core::types::{Country, Platform, Segment, Vertical};

    fn new_campaign(store: &CampaignStore) -> Campaign {
        store.create_campaign(
            CreateCampaignRequest {
                name: None,
                generated_name: None,
                country: Country::Pe,
                vertical: Vertical::Motoper,
                platform: Platform::Fb,
                segment: Segment::Acquisition,
                external_platform_id: None,
                owner_name: "Gabriela Flores".into(),
                owner_initials: Some("GF".into()),
                short_description: "Verano2025".into(),
                objective: "Acquisition".into(),
                benefit: "Bonus".into(),
                description: "Summer push".into(),
                landing_type: None,
                landing_url: None,
            },
            "admin",
        )
    }

    #[test]
    fn creation_opens_both_metric_reminders() {
        let store = CampaignStore::in_memory();
        let campaign = new_campaign(&store);
        let pending = store.pending_tasks();
        assert_eq!(pending.len(), 2);
        assert!(pending.iter().all(|t| t.campaign_id == campaign.id));
        assert!(pending
            .iter()
            .any(|t| t.kind == TaskKind::SubmitTraffickerMetrics));
        assert!(pending.iter().any(|t| t.kind == TaskKind::SubmitOwnerMetrics));
    }

    #[test]
    fn reminders_close_as_metrics_arrive() {
        let store = CampaignStore::in_memory();
        let campaign = new_campaign(&store);
        store
            .change_state(campaign.id, CampaignState::CreativeSent, "admin")
            .unwrap();
        store
            .change_state(campaign.id, CampaignState::Active, "admin")
            .unwrap();

        store
            .submit_trafficker_metrics(
                campaign.id,
                TraffickerMetricsRequest {
                    reach: 10_000,
                    clicks: 500,
                    leads: 50,
                    weekly_cost: 2500.0,
                    cost_per_lead: None,
                    report_url: None,
                },
                "trafficker",
            )
            .unwrap();
        assert_eq!(store.pending_tasks().len(), 1);

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
        assert!(store.pending_tasks().is_empty());
    }

    #[test]
    fn regeneration_is_idempotent() {
        let store = CampaignStore::in_memory();
        new_campaign(&store);
        store.generate_pending_tasks();
        store.generate_pending_tasks();
        assert_eq!(store.pending_tasks().len(), 2);
    }
}
