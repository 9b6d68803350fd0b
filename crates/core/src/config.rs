use serde::Deserialize;

/// Root application configuration. Loaded from environment variables
/// with the prefix `SISCOCA__`.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_node_id")]
    pub node_id: String,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub snapshot: SnapshotConfig,
    #[serde(default)]
    pub media: MediaConfig,
    #[serde(default)]
    pub reporting: ReportingConfig,
    #[serde(default)]
    pub creatives: CreativesConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_http_port")]
    pub http_port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

/// Snapshot fallback persistence. The store mirrors its full state to a
/// JSON file after every successful mutation and reloads it on startup —
/// last-known-good, no TTL, no invalidation.
#[derive(Debug, Clone, Deserialize)]
pub struct SnapshotConfig {
    #[serde(default = "default_snapshot_enabled")]
    pub enabled: bool,
    #[serde(default = "default_snapshot_path")]
    pub path: String,
}

/// External media host serving creative files too large to inline.
#[derive(Debug, Clone, Deserialize)]
pub struct MediaConfig {
    #[serde(default = "default_media_base_url")]
    pub base_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReportingConfig {
    /// Trailing window for the campaign detail view.
    #[serde(default = "default_window_weeks")]
    pub window_weeks: usize,
    /// Shorter trailing window used by the dashboard.
    #[serde(default = "default_dashboard_window_weeks")]
    pub dashboard_window_weeks: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreativesConfig {
    #[serde(default = "default_max_active_creatives")]
    pub max_active: usize,
}

// Default functions
fn default_node_id() -> String {
    "siscoca-01".to_string()
}
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_http_port() -> u16 {
    8080
}
fn default_metrics_port() -> u16 {
    9091
}
fn default_snapshot_enabled() -> bool {
    true
}
fn default_snapshot_path() -> String {
    "data/siscoca-snapshot.json".to_string()
}
fn default_media_base_url() -> String {
    "http://localhost:3000/media".to_string()
}
fn default_window_weeks() -> usize {
    5
}
fn default_dashboard_window_weeks() -> usize {
    4
}
fn default_max_active_creatives() -> usize {
    5
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            http_port: default_http_port(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            port: default_metrics_port(),
        }
    }
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            enabled: default_snapshot_enabled(),
            path: default_snapshot_path(),
        }
    }
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            base_url: default_media_base_url(),
        }
    }
}

impl Default for ReportingConfig {
    fn default() -> Self {
        Self {
            window_weeks: default_window_weeks(),
            dashboard_window_weeks: default_dashboard_window_weeks(),
        }
    }
}

impl Default for CreativesConfig {
    fn default() -> Self {
        Self {
            max_active: default_max_active_creatives(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            node_id: default_node_id(),
            api: ApiConfig::default(),
            metrics: MetricsConfig::default(),
            snapshot: SnapshotConfig::default(),
            media: MediaConfig::default(),
            reporting: ReportingConfig::default(),
            creatives: CreativesConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder().add_source(
            config::Environment::with_prefix("SISCOCA")
                .separator("__")
                .try_parsing(true)
                .list_separator(","),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }
}
