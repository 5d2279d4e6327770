//! Market data error types

use thiserror::Error;

/// Errors that can occur during market data operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MarketDataError {
    /// Connection or transport failure
    #[error("Network error: {0}")]
    Network(String),

    /// A single request exceeded its timeout
    #[error("Request timed out after {timeout_ms} ms: {url}")]
    Timeout { url: String, timeout_ms: u64 },

    /// Upstream rejected the credential. Fatal for the issuing client.
    #[error("Upstream rejected credential: {0}")]
    UpstreamAuth(String),

    /// Non-success status or malformed payload
    #[error("Upstream data error: {0}")]
    UpstreamData(String),

    /// Leg join exceeded the aggregation bound
    #[error("Aggregation timed out after {timeout_ms} ms ({completed} of {legs} legs completed)")]
    AggregationTimeout {
        timeout_ms: u64,
        completed: usize,
        legs: usize,
    },

    /// Request parameters rejected before dispatch
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

/// Result type for market data operations
pub type Result<T> = std::result::Result<T, MarketDataError>;

impl MarketDataError {
    /// Fatal errors mean the caller must stop issuing requests with this client
    pub fn is_fatal(&self) -> bool {
        matches!(self, MarketDataError::UpstreamAuth(_))
    }

    /// True for per-request and aggregation timeouts
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            MarketDataError::Timeout { .. } | MarketDataError::AggregationTimeout { .. }
        )
    }

    /// Short label used for metrics and structured logs
    pub fn kind(&self) -> &'static str {
        match self {
            MarketDataError::Network(_) => "network",
            MarketDataError::Timeout { .. } => "timeout",
            MarketDataError::UpstreamAuth(_) => "upstream_auth",
            MarketDataError::UpstreamData(_) => "upstream_data",
            MarketDataError::AggregationTimeout { .. } => "aggregation_timeout",
            MarketDataError::InvalidRequest(_) => "invalid_request",
        }
    }
}
