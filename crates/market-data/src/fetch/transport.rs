//! Transport seam for the fetch client

use crate::error::{MarketDataError, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Request headers as ordered name/value pairs
pub type Headers = Vec<(String, String)>;

/// HTTP verb
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
        }
    }
}

/// A fully built request, owned by the call that issues it
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Headers,
    pub body: Option<String>,
    pub timeout: Duration,
}

/// Raw upstream response
#[derive(Debug, Clone, PartialEq)]
pub struct FetchResponse {
    pub status: u16,
    pub body: String,
}

impl FetchResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// 2xx status
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Decode the body as JSON
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_str(&self.body)
            .map_err(|e| MarketDataError::UpstreamData(format!("malformed response body: {}", e)))
    }
}

/// Executes requests against some backend - protocol agnostic
///
/// Implementations must not retry. Timeouts are enforced by the caller as
/// well, so a transport that ignores `request.timeout` is still bounded.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Execute one request
    async fn execute(&self, request: FetchRequest) -> Result<FetchResponse>;

    /// Release pooled resources. Requests already running are unaffected.
    async fn close(&self) {}
}
