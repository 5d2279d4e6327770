//! Scripted in-memory transport

use super::transport::{FetchRequest, FetchResponse, Transport};
use crate::error::{MarketDataError, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::time::Duration;

/// Canned reply for a mock route
#[derive(Debug, Clone)]
pub struct MockReply {
    status: u16,
    body: String,
    delay: Duration,
    error: Option<MarketDataError>,
}

impl MockReply {
    /// 200 with the given body
    pub fn ok(body: impl Into<String>) -> Self {
        Self::status(200, body)
    }

    /// Arbitrary status and body
    pub fn status(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
            delay: Duration::ZERO,
            error: None,
        }
    }

    /// Fail at the transport level
    pub fn error(error: MarketDataError) -> Self {
        Self {
            status: 0,
            body: String::new(),
            delay: Duration::ZERO,
            error: Some(error),
        }
    }

    /// Delay the reply (uses tokio time, so paused clocks apply)
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// Mock transport for testing
///
/// Routes match when the request URL contains the route pattern; the first
/// match wins. Unmatched requests get a 404.
#[derive(Default)]
pub struct MockTransport {
    routes: Mutex<Vec<(String, MockReply)>>,
    requests: Mutex<Vec<FetchRequest>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a route
    pub fn with_route(self, pattern: impl Into<String>, reply: MockReply) -> Self {
        self.route(pattern, reply);
        self
    }

    /// Add a route through a shared reference
    pub fn route(&self, pattern: impl Into<String>, reply: MockReply) {
        self.routes.lock().push((pattern.into(), reply));
    }

    /// Requests seen so far, in arrival order
    pub fn requests(&self) -> Vec<FetchRequest> {
        self.requests.lock().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn execute(&self, request: FetchRequest) -> Result<FetchResponse> {
        let reply = self
            .routes
            .lock()
            .iter()
            .find(|(pattern, _)| request.url.contains(pattern.as_str()))
            .map(|(_, reply)| reply.clone());
        self.requests.lock().push(request);

        let Some(reply) = reply else {
            return Ok(FetchResponse::new(404, "no route"));
        };

        if !reply.delay.is_zero() {
            tokio::time::sleep(reply.delay).await;
        }

        match reply.error {
            Some(err) => Err(err),
            None => Ok(FetchResponse::new(reply.status, reply.body)),
        }
    }
}
