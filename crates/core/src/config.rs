use serde::Deserialize;

/// Root application configuration. Loaded from environment variables with
/// the prefix `JOURNEYPULSE__`.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_node_id")]
    pub node_id: String,
    #[serde(default)]
    pub tracking: TrackingConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TrackingConfig {
    /// A journey is active for stitching while `now − endDate` stays under
    /// this window.
    #[serde(default = "default_session_window_minutes")]
    pub session_window_minutes: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default = "default_dropoff_interval_secs")]
    pub dropoff_interval_secs: u64,
    #[serde(default = "default_path_mining_interval_secs")]
    pub path_mining_interval_secs: u64,
    #[serde(default = "default_optimization_interval_secs")]
    pub optimization_interval_secs: u64,
    /// Drop-off signatures are materialized only above this rate.
    #[serde(default = "default_dropoff_rate_threshold")]
    pub dropoff_rate_threshold: f64,
    /// Optimizations are generated for the top-N paths by frequency.
    #[serde(default = "default_optimization_top_paths")]
    pub optimization_top_paths: usize,
    /// Health check reports degraded when the latest completed analysis
    /// cycle is older than this.
    #[serde(default = "default_staleness_threshold_secs")]
    pub staleness_threshold_secs: u64,
}

fn default_node_id() -> String {
    "journeypulse-01".to_string()
}
fn default_session_window_minutes() -> u64 {
    30
}
fn default_dropoff_interval_secs() -> u64 {
    600
}
fn default_path_mining_interval_secs() -> u64 {
    3_600
}
fn default_optimization_interval_secs() -> u64 {
    14_400
}
fn default_dropoff_rate_threshold() -> f64 {
    0.3
}
fn default_optimization_top_paths() -> usize {
    5
}
fn default_staleness_threshold_secs() -> u64 {
    1_800
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            session_window_minutes: default_session_window_minutes(),
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            dropoff_interval_secs: default_dropoff_interval_secs(),
            path_mining_interval_secs: default_path_mining_interval_secs(),
            optimization_interval_secs: default_optimization_interval_secs(),
            dropoff_rate_threshold: default_dropoff_rate_threshold(),
            optimization_top_paths: default_optimization_top_paths(),
            staleness_threshold_secs: default_staleness_threshold_secs(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            node_id: default_node_id(),
            tracking: TrackingConfig::default(),
            analysis: AnalysisConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the environment.
    pub fn load() -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder().add_source(
            config::Environment::with_prefix("JOURNEYPULSE")
                .separator("__")
                .try_parsing(true)
                .list_separator(","),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }
}
