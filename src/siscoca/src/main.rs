//! SISCOCA — campaign tracking dashboard backend.
//!
//! Main entry point that initializes the store, auth, and HTTP server.

use clap::Parser;
use siscoca_api::ApiServer;
use siscoca_campaigns::{AuthService, CampaignStore, JsonFileSnapshot, NullSnapshot, SnapshotRepository};
use siscoca_core::config::AppConfig;
use std::sync::Arc;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "siscoca")]
#[command(about = "Campaign tracking dashboard backend")]
#[command(version)]
struct Cli {
    /// Node identifier (overrides config)
    #[arg(long, env = "SISCOCA__NODE_ID")]
    node_id: Option<String>,

    /// HTTP port (overrides config)
    #[arg(long, env = "SISCOCA__API__HTTP_PORT")]
    http_port: Option<u16>,

    /// Snapshot file path (overrides config)
    #[arg(long, env = "SISCOCA__SNAPSHOT__PATH")]
    snapshot_path: Option<String>,

    /// Disable the snapshot fallback (in-memory only)
    #[arg(long, default_value_t = false)]
    no_snapshot: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "siscoca=info,tower_http=info".into()),
        )
        .json()
        .init();

    let cli = Cli::parse();

    info!("SISCOCA starting up");

    // Load configuration
    let mut config = AppConfig::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Failed to load config, using defaults");
        AppConfig::default()
    });

    // Apply CLI overrides
    if let Some(node_id) = cli.node_id {
        config.node_id = node_id;
    }
    if let Some(port) = cli.http_port {
        config.api.http_port = port;
    }
    if let Some(path) = cli.snapshot_path {
        config.snapshot.path = path;
    }
    if cli.no_snapshot {
        config.snapshot.enabled = false;
    }

    info!(
        node_id = %config.node_id,
        http_port = config.api.http_port,
        snapshot = config.snapshot.enabled,
        "Configuration loaded"
    );

    // Initialize the store with its snapshot fallback
    let snapshots: Arc<dyn SnapshotRepository> = if config.snapshot.enabled {
        Arc::new(JsonFileSnapshot::new(&config.snapshot.path))
    } else {
        Arc::new(NullSnapshot)
    };
    let store = Arc::new(CampaignStore::new(snapshots, config.creatives.max_active));

    // Open metric-submission reminders for anything restored from snapshot
    store.generate_pending_tasks();

    let auth = Arc::new(AuthService::new());

    // Start API server
    let api_server = ApiServer::new(config.clone(), store, auth);

    // Start metrics exporter
    if let Err(e) = api_server.start_metrics().await {
        error!(error = %e, "Failed to start metrics exporter");
    }

    info!("SISCOCA is ready to serve traffic");

    // Start HTTP server (blocks until shutdown)
    api_server.start_http().await?;

    Ok(())
}
