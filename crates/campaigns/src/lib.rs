//! Campaign tracking backend — campaigns, weekly history, creatives,
//! ideal metrics, pending tasks, and campaign chat.
//!
//! Provides REST API endpoints for the campaign dashboard UI.
//! Data stored in DashMap with a JSON snapshot fallback; swap the
//! snapshot repository for PostgreSQL in production.

pub mod auth;
pub mod chat;
pub mod creatives;
pub mod handlers;
pub mod import;
pub mod lifecycle;
pub mod models;
pub mod naming;
pub mod persistence;
pub mod router;
pub mod store;
pub mod tasks;
pub mod validation;

pub use auth::AuthService;
pub use handlers::CampaignsState;
pub use persistence::{JsonFileSnapshot, NullSnapshot, SnapshotRepository, StoreSnapshot};
pub use router::campaigns_router;
pub use store::CampaignStore;
