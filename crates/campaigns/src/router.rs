//! Campaign API router — mounts all campaign endpoints under /api/v1.

use crate::auth;
use crate::handlers::{self, CampaignsState};
use axum::middleware;
use axum::routing::{get, patch, post};
use axum::Router;

/// Build the campaign router with all endpoints and the bearer-token
/// middleware. Returns a Router to merge into the main app.
pub fn campaigns_router(state: CampaignsState) -> Router {
    let auth_service = state.auth.clone();

    Router::new()
        // Auth
        .route("/api/v1/auth/login", post(handlers::handle_login))
        .route("/api/v1/auth/change-password", post(handlers::handle_change_password))
        // Campaigns
        .route(
            "/api/v1/campaigns",
            get(handlers::list_campaigns).post(handlers::create_campaign),
        )
        .route(
            "/api/v1/campaigns/{id}",
            get(handlers::get_campaign)
                .put(handlers::update_campaign)
                .delete(handlers::delete_campaign),
        )
        .route("/api/v1/campaigns/state/{state}", get(handlers::campaigns_by_state))
        .route("/api/v1/campaigns/owner/{name}", get(handlers::campaigns_by_owner))
        // Metrics submission & lifecycle
        .route(
            "/api/v1/campaigns/{id}/trafficker-metrics",
            post(handlers::submit_trafficker_metrics),
        )
        .route(
            "/api/v1/campaigns/{id}/owner-metrics",
            post(handlers::complete_owner_metrics),
        )
        .route("/api/v1/campaigns/{id}/state", post(handlers::change_state))
        .route("/api/v1/campaigns/{id}/archive", post(handlers::archive_campaign))
        .route("/api/v1/campaigns/{id}/reactivate", post(handlers::reactivate_campaign))
        // Weekly history
        .route(
            "/api/v1/history",
            get(handlers::list_history).post(handlers::save_weekly_record),
        )
        .route("/api/v1/history/week/{week}", get(handlers::history_for_week))
        .route("/api/v1/history/campaign/{id}", get(handlers::history_for_campaign))
        .route("/api/v1/history/{id}", axum::routing::delete(handlers::delete_weekly_record))
        .route("/api/v1/history/import", post(handlers::import_history))
        // Creatives
        .route(
            "/api/v1/campaigns/{id}/creatives",
            get(handlers::list_creatives).post(handlers::create_creative),
        )
        .route("/api/v1/campaigns/{id}/creatives/active", get(handlers::active_creatives))
        .route(
            "/api/v1/campaigns/{id}/creatives/discarded",
            get(handlers::discarded_creatives),
        )
        .route(
            "/api/v1/campaigns/{id}/creatives/sync-state",
            post(handlers::sync_creative_state),
        )
        .route(
            "/api/v1/creatives/{id}",
            get(handlers::get_creative)
                .put(handlers::update_creative)
                .delete(handlers::delete_creative),
        )
        .route("/api/v1/creatives/{id}/activate", patch(handlers::activate_creative))
        .route("/api/v1/creatives/{id}/discard", patch(handlers::discard_creative))
        .route("/api/v1/creatives/{id}/download", get(handlers::download_creative))
        // Reporting
        .route(
            "/api/v1/campaigns/{id}/weekly-summary",
            get(handlers::campaign_weekly_summary),
        )
        .route("/api/v1/campaigns/{id}/metrics", get(handlers::campaign_metrics))
        .route("/api/v1/campaigns/{id}/funnel", get(handlers::campaign_funnel))
        .route("/api/v1/monitoring/overview", get(handlers::monitoring_overview))
        // Ideal metrics
        .route(
            "/api/v1/ideal-metrics",
            get(handlers::list_ideal_metrics).post(handlers::save_ideal_metric),
        )
        .route(
            "/api/v1/ideal-metrics/{id}",
            axum::routing::put(handlers::update_ideal_metric)
                .delete(handlers::delete_ideal_metric),
        )
        .route("/api/v1/ideal-metrics/batch", post(handlers::save_ideal_metrics_batch))
        // Tasks
        .route("/api/v1/tasks", get(handlers::list_tasks))
        .route("/api/v1/tasks/pending", get(handlers::pending_tasks))
        // Chat
        .route(
            "/api/v1/campaigns/{id}/messages",
            get(handlers::campaign_messages).post(handlers::post_campaign_message),
        )
        .route("/api/v1/messages/unread-count", get(handlers::unread_count))
        .route("/api/v1/messages/{id}/read", post(handlers::mark_message_read))
        // Audit log
        .route("/api/v1/audit-log", get(handlers::audit_log))
        .layer(middleware::from_fn_with_state(
            auth_service,
            auth::auth_middleware,
        ))
        .with_state(state)
}
