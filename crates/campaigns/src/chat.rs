//! Per-campaign chat. The unread counter backs the single endpoint the
//! dashboard header polls; marking a message read is idempotent.

use crate::models::*;
use crate::store::CampaignStore;
use chrono::Utc;
use siscoca_core::error::{SiscocaError, SiscocaResult};
use uuid::Uuid;

impl CampaignStore {
    pub fn messages_for(&self, campaign_id: Uuid) -> Vec<ChatMessage> {
        let mut messages: Vec<ChatMessage> = self
            .messages
            .iter()
            .filter(|r| r.value().campaign_id == campaign_id)
            .map(|r| r.value().clone())
            .collect();
        messages.sort_by(|a, b| a.sent_at.cmp(&b.sent_at));
        messages
    }

    pub fn post_message(
        &self,
        campaign_id: Uuid,
        req: PostMessageRequest,
        user: &str,
    ) -> SiscocaResult<ChatMessage> {
        if !self.campaigns.contains_key(&campaign_id) {
            return Err(SiscocaError::NotFound(format!("campaign {}", campaign_id)));
        }
        let body = req.body.trim();
        if body.is_empty() {
            return Err(SiscocaError::Validation(
                "message body cannot be empty".to_string(),
            ));
        }
        let message = ChatMessage {
            id: Uuid::new_v4(),
            campaign_id,
            author: req.author.unwrap_or_else(|| user.to_string()),
            body: body.to_string(),
            sent_at: Utc::now(),
            read: false,
        };
        self.messages.insert(message.id, message.clone());
        Ok(message)
    }

    pub fn unread_count(&self) -> u64 {
        self.messages.iter().filter(|r| !r.value().read).count() as u64
    }

    pub fn mark_message_read(&self, id: Uuid) -> SiscocaResult<ChatMessage> {
        let mut entry = self
            .messages
            .get_mut(&id)
            .ok_or_else(|| SiscocaError::NotFound(format!("message {}", id)))?;
        let m = entry.value_mut();
        m.read = true;
        Ok(m.clone())
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
                country: Country::Co,
                vertical: Vertical::Cargo,
                platform: Platform::Gg,
                segment: Segment::Retention,
                external_platform_id: None,
                owner_name: "Marco Ruiz".into(),
                owner_initials: None,
                short_description: "CargoQ3".into(),
                objective: "Retention".into(),
                benefit: "Discount".into(),
                description: "Cargo retention push".into(),
                landing_type: None,
                landing_url: None,
            },
            "admin",
        );
        (store, campaign.id)
    }

    #[test]
    fn unread_count_tracks_reads() {
        let (store, campaign_id) = store_with_campaign();
        let m1 = store
            .post_message(
                campaign_id,
                PostMessageRequest {
                    author: None,
                    body: "CPL is trending up this week".into(),
                },
                "trafficker",
            )
            .unwrap();
        store
            .post_message(
                campaign_id,
                PostMessageRequest {
                    author: Some("Marco".into()),
                    body: "Swapping the creative tomorrow".into(),
                },
                "owner",
            )
            .unwrap();
        assert_eq!(store.unread_count(), 2);

        store.mark_message_read(m1.id).unwrap();
        assert_eq!(store.unread_count(), 1);
        // Idempotent
        store.mark_message_read(m1.id).unwrap();
        assert_eq!(store.unread_count(), 1);
    }

    #[test]
    fn empty_body_is_rejected() {
        let (store, campaign_id) = store_with_campaign();
        let err = store
            .post_message(
                campaign_id,
                PostMessageRequest {
                    author: None,
                    body: "   ".into(),
                },
                "admin",
            )
            .unwrap_err();
        assert!(matches!(err, SiscocaError::Validation(_)));
    }
}
