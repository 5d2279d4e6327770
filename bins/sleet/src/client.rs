//! Builds the shared fetch client and chain aggregator from configuration

use anyhow::{Context, Result};
use config::SleetConfig;
use market_data::{AggregatorConfig, ChainAggregator, Credentials, FetchClient, FetchConfig, HttpConfig};
use tracing::info;

pub fn fetch_config(config: &SleetConfig) -> FetchConfig {
    FetchConfig {
        request_timeout: config.http.request_timeout(),
        max_in_flight: config.http.max_in_flight,
    }
}

pub fn http_config(config: &SleetConfig) -> HttpConfig {
    HttpConfig {
        connect_timeout: config.http.connect_timeout(),
        pool_idle_timeout: config.http.pool_idle_timeout(),
        pool_max_idle_per_host: config.http.pool_max_idle_per_host,
        ..HttpConfig::default()
    }
}

pub fn credentials(config: &SleetConfig) -> Credentials {
    let mut credentials = Credentials::none();
    if let Some(key) = config.api.api_key.as_deref() {
        credentials = credentials.with_api_key(key);
    }
    if let Some(token) = config.api.access_token.as_deref().filter(|t| !t.trim().is_empty()) {
        credentials = credentials.with_bearer(token);
    }
    credentials
}

pub fn aggregator_config(config: &SleetConfig) -> Result<AggregatorConfig> {
    AggregatorConfig::new(config.api.base_url(), config.http.aggregation_timeout())
        .with_context(|| format!("Invalid api.base_url: {}", config.api.base_url()))
}

/// One pooled HTTP client shared by every scanner task
pub fn build_aggregator(config: &SleetConfig) -> Result<ChainAggregator> {
    let client = FetchClient::http(fetch_config(config), &http_config(config))
        .context("Failed to build HTTP client")?;
    let aggregator = ChainAggregator::new(client, credentials(config), aggregator_config(config)?);

    info!(
        base_url = config.api.base_url(),
        max_in_flight = config.http.max_in_flight,
        aggregation_timeout_ms = config.http.aggregation_timeout_ms,
        "Chain aggregator ready"
    );
    Ok(aggregator)
}
