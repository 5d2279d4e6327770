//! Fetch and aggregation metrics
//!
//! Handles are registered against whatever recorder is installed; with no
//! recorder they are no-ops, so tests need no setup.

use metrics::{counter, gauge, histogram, Counter, Gauge, Histogram};
use std::time::Duration;

/// Metrics for the shared fetch client
///
/// # Metrics
///
/// * `sleet_fetch_requests_total` - Requests dispatched
/// * `sleet_fetch_failures_total` - Failed requests, labelled by error kind
/// * `sleet_fetch_duration_seconds` - Request latency
/// * `sleet_fetch_in_flight` - Requests currently holding a permit
#[derive(Clone)]
pub struct FetchMetrics {
    requests_total: Counter,
    failures_by_kind: fn(&'static str) -> Counter,
    request_duration: Histogram,
    in_flight: Gauge,
}

impl FetchMetrics {
    pub fn new() -> Self {
        Self {
            requests_total: counter!("sleet_fetch_requests_total"),
            failures_by_kind: |kind| counter!("sleet_fetch_failures_total", "kind" => kind),
            request_duration: histogram!("sleet_fetch_duration_seconds"),
            in_flight: gauge!("sleet_fetch_in_flight"),
        }
    }

    /// Record a finished request
    pub fn record_request(&self, duration: Duration, failure: Option<&'static str>) {
        self.requests_total.increment(1);
        self.request_duration.record(duration.as_secs_f64());
        if let Some(kind) = failure {
            (self.failures_by_kind)(kind).increment(1);
        }
    }

    pub fn request_started(&self) {
        self.in_flight.increment(1.0);
    }

    pub fn request_finished(&self) {
        self.in_flight.decrement(1.0);
    }
}

impl Default for FetchMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Metrics for chain aggregation
#[derive(Clone)]
pub struct AggregationMetrics {
    chains_total: Counter,
    failures_by_kind: fn(&'static str) -> Counter,
    duration: Histogram,
    legs: Histogram,
}

impl AggregationMetrics {
    pub fn new() -> Self {
        Self {
            chains_total: counter!("sleet_chain_aggregations_total"),
            failures_by_kind: |kind| counter!("sleet_chain_aggregation_failures_total", "kind" => kind),
            duration: histogram!("sleet_chain_aggregation_duration_seconds"),
            legs: histogram!("sleet_chain_aggregation_legs"),
        }
    }

    /// Record one aggregation and its outcome
    pub fn record(&self, duration: Duration, legs: usize, failure: Option<&'static str>) {
        self.chains_total.increment(1);
        self.duration.record(duration.as_secs_f64());
        self.legs.record(legs as f64);
        if let Some(kind) = failure {
            (self.failures_by_kind)(kind).increment(1);
        }
    }
}

impl Default for AggregationMetrics {
    fn default() -> Self {
        Self::new()
    }
}
