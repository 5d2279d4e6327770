use serde::{Deserialize, Serialize};
use std::time::Duration;

pub mod defaults;
pub mod parser;
pub mod substitution;
pub mod validator;

pub use defaults::*;
pub use parser::*;
pub use substitution::*;
pub use validator::*;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SleetConfig {
    pub api: ApiConfig,
    #[serde(default)]
    pub http: HttpSettings,
    #[serde(default)]
    pub scanner: ScannerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Upstream market-data API
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ApiConfig {
    /// Chains endpoint; the public default is used when omitted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Bearer token supplied by an external token service
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
}

impl ApiConfig {
    pub fn base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL)
    }
}

/// Connection pool and timeout settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HttpSettings {
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Bound on joining all legs of one chain request
    #[serde(default = "default_aggregation_timeout_ms")]
    pub aggregation_timeout_ms: u64,
    #[serde(default = "default_max_in_flight")]
    pub max_in_flight: usize,
    #[serde(default = "default_pool_idle_timeout_secs")]
    pub pool_idle_timeout_secs: u64,
    #[serde(default = "default_pool_max_idle_per_host")]
    pub pool_max_idle_per_host: usize,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            connect_timeout_ms: default_connect_timeout_ms(),
            request_timeout_ms: default_request_timeout_ms(),
            aggregation_timeout_ms: default_aggregation_timeout_ms(),
            max_in_flight: default_max_in_flight(),
            pool_idle_timeout_secs: default_pool_idle_timeout_secs(),
            pool_max_idle_per_host: default_pool_max_idle_per_host(),
        }
    }
}

impl HttpSettings {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn aggregation_timeout(&self) -> Duration {
        Duration::from_millis(self.aggregation_timeout_ms)
    }

    pub fn pool_idle_timeout(&self) -> Duration {
        Duration::from_secs(self.pool_idle_timeout_secs)
    }
}

/// Scheduled spread scan
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScannerConfig {
    #[serde(default)]
    pub watchlist: Vec<String>,
    #[serde(default = "default_initial_delay_secs")]
    pub initial_delay_secs: u64,
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// Furthest expiration, in days from today
    #[serde(default = "default_days_to_expiration")]
    pub days_to_expiration: u32,
    #[serde(default = "default_enabled")]
    pub otm_only: bool,
    #[serde(default)]
    pub skip_same_day: bool,
    #[serde(default = "default_max_buying_power")]
    pub max_buying_power: f64,
    #[serde(default = "default_min_roi")]
    pub min_roi: f64,
    /// Spreads reported per ticker and side
    #[serde(default = "default_top")]
    pub top: usize,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            watchlist: Vec::new(),
            initial_delay_secs: default_initial_delay_secs(),
            interval_secs: default_interval_secs(),
            days_to_expiration: default_days_to_expiration(),
            otm_only: default_enabled(),
            skip_same_day: false,
            max_buying_power: default_max_buying_power(),
            min_roi: default_min_roi(),
            top: default_top(),
        }
    }
}

impl ScannerConfig {
    pub fn initial_delay(&self) -> Duration {
        Duration::from_secs(self.initial_delay_secs)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// pretty, json or compact
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MetricsConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port: default_metrics_port(),
        }
    }
}
