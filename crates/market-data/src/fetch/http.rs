//! reqwest-backed transport

use super::transport::{FetchRequest, FetchResponse, HttpMethod, Transport};
use crate::error::{MarketDataError, Result};
use async_trait::async_trait;
use parking_lot::RwLock;
use reqwest::Client;
use std::time::Duration;

/// Connection pool settings for [`HttpTransport`]
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub connect_timeout: Duration,
    pub pool_idle_timeout: Duration,
    pub pool_max_idle_per_host: usize,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_millis(5000),
            pool_idle_timeout: Duration::from_secs(90),
            pool_max_idle_per_host: 8,
            user_agent: concat!("sleet/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// HTTP transport over one pooled reqwest client
pub struct HttpTransport {
    client: RwLock<Option<Client>>,
}

impl HttpTransport {
    /// Build the connection pool
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .pool_idle_timeout(config.pool_idle_timeout)
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| MarketDataError::Network(format!("failed to build http client: {}", e)))?;

        Ok(Self {
            client: RwLock::new(Some(client)),
        })
    }

    fn client(&self) -> Result<Client> {
        self.client
            .read()
            .clone()
            .ok_or_else(|| MarketDataError::Network("client closed".to_string()))
    }
}

fn map_send_error(url: &str, timeout: Duration, err: reqwest::Error) -> MarketDataError {
    if err.is_timeout() {
        MarketDataError::Timeout {
            url: url.to_string(),
            timeout_ms: timeout.as_millis() as u64,
        }
    } else {
        MarketDataError::Network(err.to_string())
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, request: FetchRequest) -> Result<FetchResponse> {
        let client = self.client()?;

        let mut builder = match request.method {
            HttpMethod::Get => client.get(&request.url),
            HttpMethod::Post => client.post(&request.url),
        }
        .timeout(request.timeout);

        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| map_send_error(&request.url, request.timeout, e))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| map_send_error(&request.url, request.timeout, e))?;

        Ok(FetchResponse { status, body })
    }

    async fn close(&self) {
        // Dropping our handle releases idle connections once in-flight clones finish
        self.client.write().take();
    }
}
