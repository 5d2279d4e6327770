//! Shared async HTTP executor
//!
//! [`FetchClient`] is cheap to clone; every clone shares one transport (and
//! so one connection pool) and one in-flight permit pool. Each call comes in
//! three shapes:
//!
//! * `get` / `post` - await the response, bounded by a per-call timeout
//! * `get_async` / `post_async` - return a [`FetchHandle`] immediately
//! * `get_with` / `post_with` - invoke a completion callback exactly once
//!
//! There are no retries; retry policy belongs to the caller.

pub mod http;
pub mod mock;
pub mod transport;

pub use http::{HttpConfig, HttpTransport};
pub use mock::{MockReply, MockTransport};
pub use transport::{FetchRequest, FetchResponse, Headers, HttpMethod, Transport};

use crate::error::{MarketDataError, Result};
use crate::metrics::FetchMetrics;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Fetch client settings
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Timeout for the async and callback variants
    pub request_timeout: Duration,
    /// Maximum concurrent requests across all clones
    pub max_in_flight: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_millis(5000),
            max_in_flight: 16,
        }
    }
}

struct Inner {
    transport: Arc<dyn Transport>,
    permits: Semaphore,
    config: FetchConfig,
    closed: AtomicBool,
    metrics: FetchMetrics,
}

/// Pooled request executor shared by all aggregations
#[derive(Clone)]
pub struct FetchClient {
    inner: Arc<Inner>,
}

impl FetchClient {
    /// Create a client over any transport
    pub fn new(transport: Arc<dyn Transport>, config: FetchConfig) -> Self {
        let permits = Semaphore::new(config.max_in_flight.max(1));
        Self {
            inner: Arc::new(Inner {
                transport,
                permits,
                config,
                closed: AtomicBool::new(false),
                metrics: FetchMetrics::new(),
            }),
        }
    }

    /// Create a client backed by a reqwest connection pool
    pub fn http(config: FetchConfig, http: &HttpConfig) -> Result<Self> {
        Ok(Self::new(Arc::new(HttpTransport::new(http)?), config))
    }

    pub fn config(&self) -> &FetchConfig {
        &self.inner.config
    }

    /// GET, waiting up to `timeout`
    pub async fn get(&self, url: &str, headers: &[(String, String)], timeout: Duration) -> Result<FetchResponse> {
        self.execute(FetchRequest {
            method: HttpMethod::Get,
            url: url.to_string(),
            headers: headers.to_vec(),
            body: None,
            timeout,
        })
        .await
    }

    /// GET on a runtime worker; the handle resolves once
    pub fn get_async(&self, url: impl Into<String>, headers: Headers) -> FetchHandle {
        self.spawn(self.request(HttpMethod::Get, url.into(), headers, None))
    }

    /// GET, reporting the outcome to `on_complete` exactly once
    pub fn get_with<F>(&self, url: impl Into<String>, headers: Headers, on_complete: F)
    where
        F: FnOnce(Result<FetchResponse>) + Send + 'static,
    {
        self.spawn_with(self.request(HttpMethod::Get, url.into(), headers, None), on_complete);
    }

    /// POST a body, waiting up to `timeout`
    pub async fn post(
        &self,
        url: &str,
        body: impl Into<String>,
        headers: &[(String, String)],
        timeout: Duration,
    ) -> Result<FetchResponse> {
        self.execute(FetchRequest {
            method: HttpMethod::Post,
            url: url.to_string(),
            headers: headers.to_vec(),
            body: Some(body.into()),
            timeout,
        })
        .await
    }

    pub fn post_async(&self, url: impl Into<String>, body: impl Into<String>, headers: Headers) -> FetchHandle {
        self.spawn(self.request(HttpMethod::Post, url.into(), headers, Some(body.into())))
    }

    pub fn post_with<F>(&self, url: impl Into<String>, body: impl Into<String>, headers: Headers, on_complete: F)
    where
        F: FnOnce(Result<FetchResponse>) + Send + 'static,
    {
        self.spawn_with(
            self.request(HttpMethod::Post, url.into(), headers, Some(body.into())),
            on_complete,
        );
    }

    /// Close the client. Later calls fail with a network error; requests
    /// already holding a permit run to completion.
    pub async fn close(&self) {
        if self.inner.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.inner.permits.close();
        self.inner.transport.close().await;
        debug!("Fetch client closed");
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    fn request(&self, method: HttpMethod, url: String, headers: Headers, body: Option<String>) -> FetchRequest {
        FetchRequest {
            method,
            url,
            headers,
            body,
            timeout: self.inner.config.request_timeout,
        }
    }

    fn spawn(&self, request: FetchRequest) -> FetchHandle {
        let client = self.clone();
        FetchHandle {
            task: tokio::spawn(async move { client.execute(request).await }),
        }
    }

    fn spawn_with<F>(&self, request: FetchRequest, on_complete: F)
    where
        F: FnOnce(Result<FetchResponse>) + Send + 'static,
    {
        let client = self.clone();
        tokio::spawn(async move {
            let result = client.execute(request).await;
            on_complete(result);
        });
    }

    async fn execute(&self, request: FetchRequest) -> Result<FetchResponse> {
        if self.is_closed() {
            return Err(closed());
        }

        let start = Instant::now();
        let url = request.url.clone();
        let timeout = request.timeout;

        // The deadline covers the wait for a permit as well as the exchange
        let result = match tokio::time::timeout(timeout, self.run(request)).await {
            Ok(result) => result,
            Err(_) => Err(MarketDataError::Timeout {
                url: url.clone(),
                timeout_ms: timeout.as_millis() as u64,
            }),
        };

        self.inner
            .metrics
            .record_request(start.elapsed(), result.as_ref().err().map(MarketDataError::kind));

        if let Err(err) = &result {
            warn!(url = %redact(&url), error = %err, "Fetch failed");
        }
        result
    }

    async fn run(&self, request: FetchRequest) -> Result<FetchResponse> {
        let _permit = self.inner.permits.acquire().await.map_err(|_| closed())?;
        let _in_flight = InFlight::enter(&self.inner.metrics);
        self.inner.transport.execute(request).await
    }
}

/// Holds the in-flight gauge up until dropped, including on timeout
struct InFlight<'a>(&'a FetchMetrics);

impl<'a> InFlight<'a> {
    fn enter(metrics: &'a FetchMetrics) -> Self {
        metrics.request_started();
        Self(metrics)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.request_finished();
    }
}

fn closed() -> MarketDataError {
    MarketDataError::Network("client closed".to_string())
}

/// Strip the query string so credentials never reach the logs
fn redact(url: &str) -> &str {
    url.split_once('?').map(|(base, _)| base).unwrap_or(url)
}

/// Handle to a request running on a runtime worker
pub struct FetchHandle {
    task: JoinHandle<Result<FetchResponse>>,
}

impl Future for FetchHandle {
    type Output = Result<FetchResponse>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.task).poll(cx).map(|joined| match joined {
            Ok(result) => result,
            Err(e) => Err(MarketDataError::Network(format!("request task failed: {}", e))),
        })
    }
}
