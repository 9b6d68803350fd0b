//! Snapshot fallback persistence.
//!
//! The store keeps everything in memory; after each successful mutation it
//! mirrors its full state through this boundary, and on startup it reloads
//! the last-known-good snapshot. This is a named degraded-mode strategy,
//! not a cache — no TTL, no invalidation.

use crate::models::Creative;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use siscoca_core::error::{SiscocaError, SiscocaResult};
use siscoca_core::types::{Campaign, IdealMetric, WeeklyRecord};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Full store state as persisted to the fallback.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct StoreSnapshot {
    #[serde(default)]
    pub campaigns: Vec<Campaign>,
    #[serde(default)]
    pub weekly_records: Vec<WeeklyRecord>,
    #[serde(default)]
    pub creatives: Vec<Creative>,
    #[serde(default)]
    pub ideal_metrics: Vec<IdealMetric>,
}

/// Boundary between the in-memory store and durable fallback storage.
pub trait SnapshotRepository: Send + Sync {
    /// Last-known-good state, or `None` when nothing has been saved yet.
    fn load_fallback(&self) -> SiscocaResult<Option<StoreSnapshot>>;

    fn save_fallback(&self, snapshot: &StoreSnapshot) -> SiscocaResult<()>;
}

/// JSON file implementation. Writes go through a temp file + rename so a
/// crash mid-write never corrupts the last good snapshot.
pub struct JsonFileSnapshot {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileSnapshot {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            write_lock: Mutex::new(()),
        }
    }
}

impl SnapshotRepository for JsonFileSnapshot {
    fn load_fallback(&self) -> SiscocaResult<Option<StoreSnapshot>> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(SiscocaError::Persistence(e.to_string())),
        };
        let snapshot: StoreSnapshot = serde_json::from_str(&raw)?;
        info!(
            path = %self.path.display(),
            campaigns = snapshot.campaigns.len(),
            weekly_records = snapshot.weekly_records.len(),
            "Loaded fallback snapshot"
        );
        Ok(Some(snapshot))
    }

    fn save_fallback(&self, snapshot: &StoreSnapshot) -> SiscocaResult<()> {
        let _guard = self.write_lock.lock();
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .map_err(|e| SiscocaError::Persistence(e.to_string()))?;
            }
        }
        let tmp = self.path.with_extension("json.tmp");
        let raw = serde_json::to_string(snapshot)?;
        fs::write(&tmp, raw).map_err(|e| SiscocaError::Persistence(e.to_string()))?;
        fs::rename(&tmp, &self.path).map_err(|e| SiscocaError::Persistence(e.to_string()))?;
        Ok(())
    }
}

/// No-op repository for tests and snapshot-disabled deployments.
pub struct NullSnapshot;

impl SnapshotRepository for NullSnapshot {
    fn load_fallback(&self) -> SiscocaResult<Option<StoreSnapshot>> {
        Ok(None)
    }

    fn save_fallback(&self, _snapshot: &StoreSnapshot) -> SiscocaResult<()> {
        Ok(())
    }
}

/// Log-and-continue helper: mirroring must never fail a user action.
pub fn save_best_effort(repo: &dyn SnapshotRepository, snapshot: &StoreSnapshot) {
    if let Err(e) = repo.save_fallback(snapshot) {
        warn!(error = %e, "Failed to mirror store snapshot");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use siscoca_core::types::{CampaignState, Country, Platform, Segment, Vertical};
    use uuid::Uuid;

    fn sample_campaign() -> Campaign {
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
            objective: "Acquisition push".into(),
            benefit: "Bonus week".into(),
            description: "Summer acquisition campaign".into(),
            landing_type: None,
            landing_url: None,
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
            iso_week: 22,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn missing_file_loads_as_none() {
        let repo = JsonFileSnapshot::new(
            std::env::temp_dir().join(format!("siscoca-{}.json", Uuid::new_v4())),
        );
        assert!(repo.load_fallback().unwrap().is_none());
    }

    #[test]
    fn snapshot_round_trips_through_file() {
        let path = std::env::temp_dir().join(format!("siscoca-{}.json", Uuid::new_v4()));
        let repo = JsonFileSnapshot::new(&path);

        let snapshot = StoreSnapshot {
            campaigns: vec![sample_campaign()],
            ..Default::default()
        };
        repo.save_fallback(&snapshot).unwrap();

        let loaded = repo.load_fallback().unwrap().unwrap();
        assert_eq!(loaded.campaigns.len(), 1);
        assert_eq!(loaded.campaigns[0].name, snapshot.campaigns[0].name);
        assert!(loaded.weekly_records.is_empty());

        std::fs::remove_file(&path).unwrap();
    }
}
