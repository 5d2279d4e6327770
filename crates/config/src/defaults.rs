pub const DEFAULT_BASE_URL: &str = "https://api.schwabapi.com/marketdata/v1/chains";

pub fn default_enabled() -> bool {
    true
}

pub fn default_connect_timeout_ms() -> u64 {
    5000
}

pub fn default_request_timeout_ms() -> u64 {
    5000
}

pub fn default_aggregation_timeout_ms() -> u64 {
    5000
}

pub fn default_max_in_flight() -> usize {
    16
}

pub fn default_pool_idle_timeout_secs() -> u64 {
    90
}

pub fn default_pool_max_idle_per_host() -> usize {
    8
}

pub fn default_initial_delay_secs() -> u64 {
    2
}

pub fn default_interval_secs() -> u64 {
    20
}

pub fn default_days_to_expiration() -> u32 {
    40
}

pub fn default_max_buying_power() -> f64 {
    5000.0
}

pub fn default_min_roi() -> f64 {
    0.25
}

pub fn default_top() -> usize {
    10
}

pub fn default_log_level() -> String {
    "info".to_string()
}

pub fn default_log_format() -> String {
    "pretty".to_string()
}

pub fn default_metrics_port() -> u16 {
    9090
}
