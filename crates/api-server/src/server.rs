//! API server — assembles the campaign router, operational probes, and
//! the Prometheus metrics exporter.

use crate::rest::{self, OpsState};
use axum::routing::get;
use axum::Router;
use siscoca_campaigns::{campaigns_router, AuthService, CampaignStore, CampaignsState};
use siscoca_core::config::AppConfig;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Main HTTP API server.
pub struct ApiServer {
    config: AppConfig,
    store: Arc<CampaignStore>,
    auth: Arc<AuthService>,
}

impl ApiServer {
    pub fn new(config: AppConfig, store: Arc<CampaignStore>, auth: Arc<AuthService>) -> Self {
        Self {
            config,
            store,
            auth,
        }
    }

    /// Start the HTTP REST server (blocks until shutdown).
    pub async fn start_http(&self) -> anyhow::Result<()> {
        let ops_state = OpsState {
            node_id: self.config.node_id.clone(),
            start_time: Instant::now(),
        };
        let campaigns_state = CampaignsState {
            store: self.store.clone(),
            auth: self.auth.clone(),
            reporting: self.config.reporting.clone(),
        };

        let app = Router::new()
            // Operational endpoints
            .route("/health", get(rest::health_check))
            .route("/ready", get(rest::readiness))
            .route("/live", get(rest::liveness))
            .with_state(ops_state)
            // Campaign API
            .merge(campaigns_router(campaigns_state))
            // Middleware
            .layer(CompressionLayer::new())
            .layer(CorsLayer::permissive())
            .layer(TraceLayer::new_for_http());

        let addr = SocketAddr::new(self.config.api.host.parse()?, self.config.api.http_port);

        info!(addr = %addr, "Starting HTTP server");

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app).await?;

        Ok(())
    }

    /// Start the metrics exporter on a separate port.
    pub async fn start_metrics(&self) -> anyhow::Result<()> {
        let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
        let handle = builder
            .with_http_listener(SocketAddr::new(
                self.config.api.host.parse()?,
                self.config.metrics.port,
            ))
            .install_recorder()?;

        info!(port = self.config.metrics.port, "Metrics exporter started");

        // Keep the handle alive
        std::mem::forget(handle);
        Ok(())
    }
}
