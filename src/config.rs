use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// SQLite connection string. The database file is created on demand.
    #[serde(default = "Config::default_database_url")]
    pub database_url: String,
    /// Address the HTTP server listens on.
    #[serde(default = "Config::default_bind_addr")]
    pub bind_addr: String,
    /// CORS origin allowlist. Ignored when cors_permissive is set.
    #[serde(default)]
    pub cors_origins: Vec<String>,
    /// Allow every origin. Development convenience, off by default.
    #[serde(default)]
    pub cors_permissive: bool,
    /// Include underlying error details in 500 responses. Defaults to false.
    #[serde(default)]
    pub debug_errors: bool,
    /// Location tracker configuration
    #[serde(default)]
    pub tracker: TrackerConfig,
}

/// Configuration for the periodic bus location tracker
#[derive(Debug, Clone, Deserialize)]
pub struct TrackerConfig {
    /// Interval in seconds between location update cycles (default: 30)
    #[serde(default = "TrackerConfig::default_interval_secs")]
    pub interval_secs: u64,
    /// Assumed average bus speed in km/h for ETA estimates (default: 30)
    #[serde(default = "TrackerConfig::default_speed_kmh")]
    pub speed_kmh: f64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            interval_secs: Self::default_interval_secs(),
            speed_kmh: Self::default_speed_kmh(),
        }
    }
}

impl TrackerConfig {
    fn default_interval_secs() -> u64 {
        30
    }
    fn default_speed_kmh() -> f64 {
        30.0
    }

    pub fn validate(&self) {
        if self.interval_secs == 0 {
            panic!("tracker.interval_secs must be greater than zero");
        }
        if self.speed_kmh <= 0.0 {
            panic!("tracker.speed_kmh must be greater than zero");
        }
    }
}

impl Config {
    fn default_database_url() -> String {
        "sqlite:database/campus_bus.db?mode=rwc".to_string()
    }
    fn default_bind_addr() -> String {
        "0.0.0.0:4000".to_string()
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::Read(e.to_string()))?;
        serde_yaml::from_str(&raw).map_err(|e| ConfigError::Parse(e.to_string()))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Cannot read config file: {0}")]
    Read(String),
    #[error("Cannot parse config: {0}")]
    Parse(String),
}
