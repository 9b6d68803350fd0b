//! Creative management: upload, activate/discard, download, and the
//! best-effort campaign-state sync that moves a Pending campaign to
//! Creative Sent once an asset lands.

use crate::models::*;
use crate::store::CampaignStore;
use base64::Engine;
use chrono::Utc;
use siscoca_core::error::{SiscocaError, SiscocaResult};
use siscoca_core::types::CampaignState;
use tracing::warn;
use uuid::Uuid;

impl CampaignStore {
    pub fn creatives_for(&self, campaign_id: Uuid) -> Vec<Creative> {
        let mut creatives: Vec<Creative> = self
            .creatives
            .iter()
            .filter(|r| r.value().campaign_id == campaign_id)
            .map(|r| r.value().clone())
            .collect();
        creatives.sort_by_key(|c| c.order);
        creatives
    }

    pub fn active_creatives_for(&self, campaign_id: Uuid) -> Vec<Creative> {
        self.creatives_for(campaign_id)
            .into_iter()
            .filter(|c| c.active)
            .collect()
    }

    pub fn discarded_creatives_for(&self, campaign_id: Uuid) -> Vec<Creative> {
        self.creatives_for(campaign_id)
            .into_iter()
            .filter(|c| !c.active)
            .collect()
    }

    pub fn get_creative(&self, id: Uuid) -> Option<Creative> {
        self.creatives.get(&id).map(|r| r.value().clone())
    }

    pub fn create_creative(
        &self,
        campaign_id: Uuid,
        req: CreateCreativeRequest,
        user: &str,
    ) -> SiscocaResult<Creative> {
        if !self.campaigns.contains_key(&campaign_id) {
            return Err(SiscocaError::NotFound(format!("campaign {}", campaign_id)));
        }
        match (&req.file, &req.external_url) {
            (None, None) => {
                return Err(SiscocaError::Validation(
                    "creative needs either a file payload or an external URL".to_string(),
                ))
            }
            (Some(_), Some(_)) => {
                return Err(SiscocaError::Validation(
                    "creative cannot carry both a file payload and an external URL".to_string(),
                ))
            }
            _ => {}
        }
        if let Some(external) = &req.external_url {
            url::Url::parse(external)
                .map_err(|e| SiscocaError::Validation(format!("invalid creative URL: {}", e)))?;
        }
        if req.active {
            self.ensure_active_capacity(campaign_id)?;
        }

        let order = self.creatives_for(campaign_id).len() as u32 + 1;
        let creative = Creative {
            id: Uuid::new_v4(),
            campaign_id,
            file: req.file,
            file_name: req.file_name,
            external_url: req.external_url,
            active: req.active,
            order,
            created_at: Utc::now(),
            updated_at: None,
        };
        self.creatives.insert(creative.id, creative.clone());
        self.log_audit(
            user,
            AuditAction::Create,
            "creative",
            &creative.id.to_string(),
            serde_json::json!({"campaign_id": campaign_id, "active": creative.active}),
        );

        // Attaching a creative is what moves a fresh campaign forward; the
        // sync is best-effort and never fails the upload.
        self.sync_campaign_creative_state(campaign_id, user);
        self.persist();
        Ok(creative)
    }

    pub fn update_creative(
        &self,
        id: Uuid,
        req: UpdateCreativeRequest,
        user: &str,
    ) -> SiscocaResult<Creative> {
        if req.active == Some(true) {
            let (campaign_id, was_active) = self
                .creatives
                .get(&id)
                .map(|r| (r.value().campaign_id, r.value().active))
                .ok_or_else(|| SiscocaError::NotFound(format!("creative {}", id)))?;
            if !was_active {
                self.ensure_active_capacity(campaign_id)?;
            }
        }
        let updated = {
            let mut entry = self
                .creatives
                .get_mut(&id)
                .ok_or_else(|| SiscocaError::NotFound(format!("creative {}", id)))?;
            let c = entry.value_mut();
            if let Some(file) = req.file {
                c.file = Some(file);
                c.external_url = None;
            }
            if let Some(name) = req.file_name {
                c.file_name = Some(name);
            }
            if let Some(external) = req.external_url {
                c.external_url = Some(external);
                c.file = None;
            }
            if let Some(active) = req.active {
                c.active = active;
            }
            if let Some(order) = req.order {
                c.order = order;
            }
            c.updated_at = Some(Utc::now());
            c.clone()
        };
        self.log_audit(
            user,
            AuditAction::Update,
            "creative",
            &id.to_string(),
            serde_json::json!({}),
        );
        self.persist();
        Ok(updated)
    }

    pub fn delete_creative(&self, id: Uuid, user: &str) -> bool {
        let removed = self.creatives.remove(&id).is_some();
        if removed {
            self.log_audit(
                user,
                AuditAction::Delete,
                "creative",
                &id.to_string(),
                serde_json::json!({}),
            );
            self.persist();
        }
        removed
    }

    pub fn activate_creative(&self, id: Uuid, user: &str) -> SiscocaResult<Creative> {
        self.update_creative(
            id,
            UpdateCreativeRequest {
                active: Some(true),
                ..Default::default()
            },
            user,
        )
    }

    pub fn discard_creative(&self, id: Uuid, user: &str) -> SiscocaResult<Creative> {
        self.update_creative(
            id,
            UpdateCreativeRequest {
                active: Some(false),
                ..Default::default()
            },
            user,
        )
    }

    /// Decode an inline creative payload for download. Data-URL prefixes
    /// (`data:image/png;base64,...`) are stripped before decoding.
    pub fn download_creative(&self, id: Uuid) -> SiscocaResult<(String, Vec<u8>)> {
        let creative = self
            .get_creative(id)
            .ok_or_else(|| SiscocaError::NotFound(format!("creative {}", id)))?;
        let payload = creative.file.as_deref().ok_or_else(|| {
            SiscocaError::Precondition(
                "creative is hosted externally and has no inline payload".to_string(),
            )
        })?;
        let encoded = payload.rsplit(',').next().unwrap_or(payload);
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(encoded.trim())
            .map_err(|e| SiscocaError::Validation(format!("creative payload is not base64: {}", e)))?;
        let file_name = creative
            .file_name
            .unwrap_or_else(|| format!("creative-{}", id));
        Ok((file_name, bytes))
    }

    /// Best-effort: a Pending campaign with at least one creative moves to
    /// Creative Sent. Failures log a warning and never interrupt the flow.
    pub fn sync_campaign_creative_state(&self, campaign_id: Uuid, user: &str) {
        let needs_transition = self
            .campaigns
            .get(&campaign_id)
            .map(|r| r.value().state == CampaignState::Pending)
            .unwrap_or(false);
        if !needs_transition || self.creatives_for(campaign_id).is_empty() {
            return;
        }
        if let Err(e) = self.change_state(campaign_id, CampaignState::CreativeSent, user) {
            warn!(campaign_id = %campaign_id, error = %e, "Creative state sync failed");
        }
    }

    fn ensure_active_capacity(&self, campaign_id: Uuid) -> SiscocaResult<()> {
        let active = self.active_creatives_for(campaign_id).len();
        if active >= self.max_active_creatives {
            return Err(SiscocaError::CreativeLimit(format!(
                "a campaign cannot have more than {} active creatives",
                self.max_active_creatives
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CreateCampaignRequest;
    use siscoca_core::types::{Country, Platform, Segment, Vertical};

    fn store_with_campaign() -> (CampaignStore, Uuid) {
        let store = CampaignStore::in_memory();
        let campaign = store.create_campaign(
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
        );
        (store, campaign.id)
    }

    fn file_creative() -> CreateCreativeRequest {
        CreateCreativeRequest {
            file: Some("data:image/png;base64,aGVsbG8=".into()),
            file_name: Some("banner.png".into()),
            external_url: None,
            active: true,
        }
    }

    #[test]
    fn upload_moves_pending_campaign_to_creative_sent() {
        let (store, campaign_id) = store_with_campaign();
        store
            .create_creative(campaign_id, file_creative(), "admin")
            .unwrap();
        assert_eq!(
            store.get_campaign(campaign_id).unwrap().state,
            CampaignState::CreativeSent
        );
    }

    #[test]
    fn sixth_active_creative_is_rejected() {
        let (store, campaign_id) = store_with_campaign();
        for _ in 0..5 {
            store
                .create_creative(campaign_id, file_creative(), "admin")
                .unwrap();
        }
        let err = store
            .create_creative(campaign_id, file_creative(), "admin")
            .unwrap_err();
        assert!(matches!(err, SiscocaError::CreativeLimit(_)));

        // Discarding one frees a slot.
        let first = store.creatives_for(campaign_id)[0].id;
        store.discard_creative(first, "admin").unwrap();
        assert!(store
            .create_creative(campaign_id, file_creative(), "admin")
            .is_ok());
    }

    #[test]
    fn creative_requires_exactly_one_payload() {
        let (store, campaign_id) = store_with_campaign();
        let err = store
            .create_creative(
                campaign_id,
                CreateCreativeRequest {
                    file: None,
                    file_name: None,
                    external_url: None,
                    active: true,
                },
                "admin",
            )
            .unwrap_err();
        assert!(matches!(err, SiscocaError::Validation(_)));

        let err = store
            .create_creative(
                campaign_id,
                CreateCreativeRequest {
                    file: Some("aGVsbG8=".into()),
                    file_name: None,
                    external_url: Some("https://media.example.com/a.png".into()),
                    active: true,
                },
                "admin",
            )
            .unwrap_err();
        assert!(matches!(err, SiscocaError::Validation(_)));
    }

    #[test]
    fn download_decodes_data_url_payload() {
        let (store, campaign_id) = store_with_campaign();
        let creative = store
            .create_creative(campaign_id, file_creative(), "admin")
            .unwrap();
        let (name, bytes) = store.download_creative(creative.id).unwrap();
        assert_eq!(name, "banner.png");
        assert_eq!(bytes, b"hello");
    }

    #[test]
    fn download_of_external_creative_is_refused() {
        let (store, campaign_id) = store_with_campaign();
        let creative = store
            .create_creative(
                campaign_id,
                CreateCreativeRequest {
                    file: None,
                    file_name: None,
                    external_url: Some("https://media.example.com/a.png".into()),
                    active: true,
                },
                "admin",
            )
            .unwrap();
        let err = store.download_creative(creative.id).unwrap_err();
        assert!(matches!(err, SiscocaError::Precondition(_)));
    }
}
