//! Axum REST handlers for the campaign API.
//!
//! Handlers stay thin: decode the request, call the store, map the typed
//! error onto a status code + uniform `ErrorResponse` body.

use crate::auth::AuthService;
use crate::models::*;
use crate::store::CampaignStore;
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use siscoca_core::config::ReportingConfig;
use siscoca_core::error::SiscocaError;
use siscoca_core::types::{Campaign, CampaignState, IdealMetric, WeeklyRecord};
use siscoca_reporting as reporting;
use std::sync::Arc;
use uuid::Uuid;

/// Shared campaign API state.
#[derive(Clone)]
pub struct CampaignsState {
    pub store: Arc<CampaignStore>,
    pub auth: Arc<AuthService>,
    pub reporting: ReportingConfig,
}

impl CampaignsState {
    /// Resolve the acting user from the bearer token; mutations are
    /// attributed to this name in the audit log and weekly history.
    fn actor(&self, headers: &HeaderMap) -> String {
        headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .and_then(|token| self.auth.validate(token))
            .unwrap_or_else(|| "system".to_string())
    }
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn error_response(err: SiscocaError) -> ApiError {
    let (status, code) = match &err {
        SiscocaError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
        SiscocaError::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "validation_failed"),
        SiscocaError::InvalidTransition { .. } => (StatusCode::CONFLICT, "invalid_transition"),
        SiscocaError::Precondition(_) => (StatusCode::CONFLICT, "precondition_failed"),
        SiscocaError::CreativeLimit(_) => (StatusCode::CONFLICT, "creative_limit"),
        SiscocaError::Auth(_) => (StatusCode::UNAUTHORIZED, "auth_failed"),
        SiscocaError::Import(_) => (StatusCode::BAD_REQUEST, "import_failed"),
        _ => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
    };
    (
        status,
        Json(ErrorResponse {
            error: code.to_string(),
            message: err.to_string(),
        }),
    )
}

// ─── Auth ──────────────────────────────────────────────────────────────────

pub async fn handle_login(
    State(state): State<CampaignsState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let resp = state.auth.login(&req).map_err(error_response)?;
    state.store.log_audit(
        &req.username,
        AuditAction::Login,
        "user",
        &req.username,
        serde_json::json!({}),
    );
    Ok(Json(resp))
}

pub async fn handle_change_password(
    State(state): State<CampaignsState>,
    Json(req): Json<ChangePasswordRequest>,
) -> Result<Json<ActionResponse>, ApiError> {
    state.auth.change_password(&req).map_err(error_response)?;
    Ok(Json(ActionResponse::ok("Password changed")))
}

// ─── Campaigns ─────────────────────────────────────────────────────────────

pub async fn list_campaigns(State(state): State<CampaignsState>) -> Json<Vec<Campaign>> {
    Json(state.store.list_campaigns())
}

pub async fn get_campaign(
    State(state): State<CampaignsState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Campaign>, StatusCode> {
    state
        .store
        .get_campaign(id)
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

pub async fn campaigns_by_state(
    State(state): State<CampaignsState>,
    Path(raw): Path<String>,
) -> Result<Json<Vec<Campaign>>, ApiError> {
    let parsed: CampaignState = raw
        .parse()
        .map_err(|e: String| error_response(SiscocaError::Validation(e)))?;
    Ok(Json(state.store.campaigns_by_state(parsed)))
}

pub async fn campaigns_by_owner(
    State(state): State<CampaignsState>,
    Path(owner): Path<String>,
) -> Json<Vec<Campaign>> {
    Json(state.store.campaigns_by_owner(&owner))
}

pub async fn create_campaign(
    State(state): State<CampaignsState>,
    headers: HeaderMap,
    Json(req): Json<CreateCampaignRequest>,
) -> (StatusCode, Json<Campaign>) {
    let campaign = state.store.create_campaign(req, &state.actor(&headers));
    metrics::counter!("siscoca.campaigns.created").increment(1);
    (StatusCode::CREATED, Json(campaign))
}

pub async fn update_campaign(
    State(state): State<CampaignsState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    Json(req): Json<UpdateCampaignRequest>,
) -> Result<Json<Campaign>, ApiError> {
    state
        .store
        .update_campaign(id, req, &state.actor(&headers))
        .map(Json)
        .map_err(error_response)
}

pub async fn delete_campaign(
    State(state): State<CampaignsState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
) -> StatusCode {
    if state.store.delete_campaign(id, &state.actor(&headers)) {
        metrics::counter!("siscoca.campaigns.deleted").increment(1);
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

// ─── Metrics submission & lifecycle ────────────────────────────────────────

pub async fn submit_trafficker_metrics(
    State(state): State<CampaignsState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    Json(req): Json<TraffickerMetricsRequest>,
) -> Result<Json<Campaign>, ApiError> {
    let campaign = state
        .store
        .submit_trafficker_metrics(id, req, &state.actor(&headers))
        .map_err(error_response)?;
    metrics::counter!("siscoca.metrics.trafficker_submitted").increment(1);
    Ok(Json(campaign))
}

pub async fn complete_owner_metrics(
    State(state): State<CampaignsState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    Json(req): Json<OwnerMetricsRequest>,
) -> Result<Json<Campaign>, ApiError> {
    let campaign = state
        .store
        .complete_owner_metrics(id, req, &state.actor(&headers))
        .map_err(error_response)?;
    metrics::counter!("siscoca.metrics.owner_submitted").increment(1);
    Ok(Json(campaign))
}

pub async fn change_state(
    State(state): State<CampaignsState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    Json(req): Json<ChangeStateRequest>,
) -> Result<Json<ActionResponse>, ApiError> {
    let campaign = state
        .store
        .change_state(id, req.state, &state.actor(&headers))
        .map_err(error_response)?;
    Ok(Json(ActionResponse::ok(format!(
        "Campaign {} is now {}",
        campaign.name, campaign.state
    ))))
}

pub async fn archive_campaign(
    State(state): State<CampaignsState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<Json<ActionResponse>, ApiError> {
    let campaign = state
        .store
        .archive_campaign(id, &state.actor(&headers))
        .map_err(error_response)?;
    metrics::counter!("siscoca.campaigns.archived").increment(1);
    Ok(Json(ActionResponse::ok(format!(
        "Campaign {} archived into week {}",
        campaign.name, campaign.iso_week
    ))))
}

pub async fn reactivate_campaign(
    State(state): State<CampaignsState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<Json<ActionResponse>, ApiError> {
    let campaign = state
        .store
        .reactivate_campaign(id, &state.actor(&headers))
        .map_err(error_response)?;
    metrics::counter!("siscoca.campaigns.reactivated").increment(1);
    Ok(Json(ActionResponse::ok(format!(
        "Campaign {} reactivated",
        campaign.name
    ))))
}

// ─── Weekly history ────────────────────────────────────────────────────────

pub async fn list_history(State(state): State<CampaignsState>) -> Json<Vec<WeeklyRecord>> {
    Json(state.store.list_history())
}

pub async fn history_for_week(
    State(state): State<CampaignsState>,
    Path(week): Path<u32>,
) -> Json<Vec<WeeklyRecord>> {
    Json(state.store.history_for_week(week))
}

pub async fn history_for_campaign(
    State(state): State<CampaignsState>,
    Path(id): Path<Uuid>,
) -> Json<Vec<WeeklyRecord>> {
    Json(state.store.history_for_campaign(id))
}

pub async fn save_weekly_record(
    State(state): State<CampaignsState>,
    headers: HeaderMap,
    Json(req): Json<SaveWeeklyRecordRequest>,
) -> Result<Json<WeeklyRecord>, ApiError> {
    state
        .store
        .save_weekly_record(req, &state.actor(&headers))
        .map(Json)
        .map_err(error_response)
}

pub async fn delete_weekly_record(
    State(state): State<CampaignsState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
) -> StatusCode {
    if state.store.delete_weekly_record(id, &state.actor(&headers)) {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

pub async fn import_history(
    State(state): State<CampaignsState>,
    headers: HeaderMap,
    Json(rows): Json<Vec<serde_json::Value>>,
) -> Json<ImportReport> {
    let report = state.store.import_history(&rows, &state.actor(&headers));
    metrics::counter!("siscoca.history.imported").increment(report.processed as u64);
    Json(report)
}

// ─── Creatives ─────────────────────────────────────────────────────────────

pub async fn list_creatives(
    State(state): State<CampaignsState>,
    Path(id): Path<Uuid>,
) -> Json<Vec<Creative>> {
    Json(state.store.creatives_for(id))
}

pub async fn active_creatives(
    State(state): State<CampaignsState>,
    Path(id): Path<Uuid>,
) -> Json<Vec<Creative>> {
    Json(state.store.active_creatives_for(id))
}

pub async fn discarded_creatives(
    State(state): State<CampaignsState>,
    Path(id): Path<Uuid>,
) -> Json<Vec<Creative>> {
    Json(state.store.discarded_creatives_for(id))
}

pub async fn create_creative(
    State(state): State<CampaignsState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    Json(req): Json<CreateCreativeRequest>,
) -> Result<(StatusCode, Json<Creative>), ApiError> {
    let creative = state
        .store
        .create_creative(id, req, &state.actor(&headers))
        .map_err(error_response)?;
    metrics::counter!("siscoca.creatives.created").increment(1);
    Ok((StatusCode::CREATED, Json(creative)))
}

pub async fn get_creative(
    State(state): State<CampaignsState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Creative>, StatusCode> {
    state
        .store
        .get_creative(id)
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

pub async fn update_creative(
    State(state): State<CampaignsState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    Json(req): Json<UpdateCreativeRequest>,
) -> Result<Json<Creative>, ApiError> {
    state
        .store
        .update_creative(id, req, &state.actor(&headers))
        .map(Json)
        .map_err(error_response)
}

pub async fn delete_creative(
    State(state): State<CampaignsState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
) -> StatusCode {
    if state.store.delete_creative(id, &state.actor(&headers)) {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

pub async fn activate_creative(
    State(state): State<CampaignsState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<Json<Creative>, ApiError> {
    state
        .store
        .activate_creative(id, &state.actor(&headers))
        .map(Json)
        .map_err(error_response)
}

pub async fn discard_creative(
    State(state): State<CampaignsState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<Json<Creative>, ApiError> {
    state
        .store
        .discard_creative(id, &state.actor(&headers))
        .map(Json)
        .map_err(error_response)
}

pub async fn download_creative(
    State(state): State<CampaignsState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let (file_name, bytes) = state.store.download_creative(id).map_err(error_response)?;
    Ok((
        [(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", file_name),
        )],
        bytes,
    ))
}

pub async fn sync_creative_state(
    State(state): State<CampaignsState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
) -> Json<ActionResponse> {
    state
        .store
        .sync_campaign_creative_state(id, &state.actor(&headers));
    Json(ActionResponse::ok("Creative state synchronized"))
}

// ─── Reporting ─────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct WindowParams {
    pub window: Option<usize>,
}

pub async fn campaign_weekly_summary(
    State(state): State<CampaignsState>,
    Path(id): Path<Uuid>,
    Query(params): Query<WindowParams>,
) -> Result<Json<Vec<reporting::WeeklySlot>>, StatusCode> {
    let campaign = state.store.get_campaign(id).ok_or(StatusCode::NOT_FOUND)?;
    let records = state.store.history_for_campaign(id);
    let window = params
        .window
        .unwrap_or(state.reporting.window_weeks)
        .clamp(1, 52);
    Ok(Json(reporting::weekly_summary(
        &campaign,
        &records,
        window,
        chrono::Utc::now(),
    )))
}

pub async fn campaign_metrics(
    State(state): State<CampaignsState>,
    Path(id): Path<Uuid>,
) -> Result<Json<reporting::CampaignRollup>, StatusCode> {
    let campaign = state.store.get_campaign(id).ok_or(StatusCode::NOT_FOUND)?;
    let ideals = state.store.ideal_metrics_for(&campaign);
    Ok(Json(reporting::campaign_rollup(&campaign, &ideals)))
}

pub async fn campaign_funnel(
    State(state): State<CampaignsState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<reporting::FunnelStage>>, StatusCode> {
    let campaign = state.store.get_campaign(id).ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(reporting::campaign_funnel(&campaign)))
}

pub async fn monitoring_overview(State(state): State<CampaignsState>) -> Json<MonitoringOverview> {
    Json(state.store.monitoring_overview())
}

// ─── Ideal metrics ─────────────────────────────────────────────────────────

pub async fn list_ideal_metrics(State(state): State<CampaignsState>) -> Json<Vec<IdealMetric>> {
    Json(state.store.list_ideal_metrics())
}

pub async fn save_ideal_metric(
    State(state): State<CampaignsState>,
    headers: HeaderMap,
    Json(req): Json<IdealMetricRequest>,
) -> Result<Json<IdealMetric>, ApiError> {
    state
        .store
        .save_ideal_metric(req, &state.actor(&headers))
        .map(Json)
        .map_err(error_response)
}

pub async fn update_ideal_metric(
    State(state): State<CampaignsState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    Json(mut req): Json<IdealMetricRequest>,
) -> Result<Json<IdealMetric>, ApiError> {
    // The path wins over whatever id the body carries.
    req.id = Some(id);
    state
        .store
        .save_ideal_metric(req, &state.actor(&headers))
        .map(Json)
        .map_err(error_response)
}

pub async fn save_ideal_metrics_batch(
    State(state): State<CampaignsState>,
    headers: HeaderMap,
    Json(reqs): Json<Vec<IdealMetricRequest>>,
) -> Result<Json<Vec<IdealMetric>>, ApiError> {
    let user = state.actor(&headers);
    let mut saved = Vec::with_capacity(reqs.len());
    for req in reqs {
        saved.push(
            state
                .store
                .save_ideal_metric(req, &user)
                .map_err(error_response)?,
        );
    }
    Ok(Json(saved))
}

pub async fn delete_ideal_metric(
    State(state): State<CampaignsState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
) -> StatusCode {
    if state.store.delete_ideal_metric(id, &state.actor(&headers)) {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

// ─── Tasks ─────────────────────────────────────────────────────────────────

pub async fn list_tasks(State(state): State<CampaignsState>) -> Json<Vec<PendingTask>> {
    Json(state.store.list_tasks())
}

pub async fn pending_tasks(State(state): State<CampaignsState>) -> Json<Vec<PendingTask>> {
    state.store.generate_pending_tasks();
    Json(state.store.pending_tasks())
}

// ─── Chat ──────────────────────────────────────────────────────────────────

pub async fn campaign_messages(
    State(state): State<CampaignsState>,
    Path(id): Path<Uuid>,
) -> Json<Vec<ChatMessage>> {
    Json(state.store.messages_for(id))
}

pub async fn post_campaign_message(
    State(state): State<CampaignsState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    Json(req): Json<PostMessageRequest>,
) -> Result<(StatusCode, Json<ChatMessage>), ApiError> {
    let message = state
        .store
        .post_message(id, req, &state.actor(&headers))
        .map_err(error_response)?;
    Ok((StatusCode::CREATED, Json(message)))
}

pub async fn unread_count(State(state): State<CampaignsState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({ "unread": state.store.unread_count() }))
}

pub async fn mark_message_read(
    State(state): State<CampaignsState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ChatMessage>, ApiError> {
    state
        .store
        .mark_message_read(id)
        .map(Json)
        .map_err(error_response)
}

// ─── Audit log ─────────────────────────────────────────────────────────────

pub async fn audit_log(State(state): State<CampaignsState>) -> Json<Vec<AuditEntry>> {
    Json(state.store.get_audit_log())
}
