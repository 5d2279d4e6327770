//! Prometheus metrics infrastructure
//!
//! This module provides utilities for initializing Prometheus metrics
//! and the scanner's metric set.

use metrics::{counter, gauge, histogram, Counter, Gauge, Histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Duration;

/// Initialize the Prometheus metrics exporter
///
/// This starts an HTTP server on the specified port that exposes metrics
/// at the `/metrics` endpoint.
///
/// # Example
///
/// ```ignore
/// observability::metrics::init_metrics(9090)?;
/// // Metrics available at http://localhost:9090/metrics
/// ```
pub fn init_metrics(port: u16) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("0.0.0.0:{}", port).parse()?;

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;

    tracing::info!(%addr, "Metrics server listening");
    Ok(())
}

/// Per-ticker scan metrics
///
/// # Metrics
///
/// * `sleet_scans_total` - Scan passes, labelled by ticker
/// * `sleet_scan_failures_total` - Failed passes, labelled by ticker and error kind
/// * `sleet_scan_duration_seconds` - Time from fetch to report
/// * `sleet_spreads_found` - Spreads enumerated in the last pass
/// * `sleet_spreads_reported_total` - Spreads that passed the filter
/// * `sleet_active_scanners` - Running ticker tasks
///
/// # Example
///
/// ```ignore
/// let metrics = ScanMetrics::new("SPY");
/// {
///     let _timer = ScanTimer::new(&metrics);
///     // ... fetch chain, enumerate spreads ...
/// } // Duration recorded when the timer is dropped
/// ```
#[derive(Clone)]
pub struct ScanMetrics {
    scans_total: Counter,
    failures_by_kind: fn(String, &'static str) -> Counter,
    scan_duration: Histogram,
    spreads_found: Gauge,
    spreads_reported: Counter,
    active_scanners: Gauge,
    ticker: String,
}

impl ScanMetrics {
    /// Create metrics for one ticker
    pub fn new(ticker: &str) -> Self {
        let ticker = ticker.to_string();

        Self {
            scans_total: counter!("sleet_scans_total", "ticker" => ticker.clone()),
            failures_by_kind: |ticker, kind| {
                counter!("sleet_scan_failures_total", "ticker" => ticker, "kind" => kind)
            },
            scan_duration: histogram!("sleet_scan_duration_seconds", "ticker" => ticker.clone()),
            spreads_found: gauge!("sleet_spreads_found", "ticker" => ticker.clone()),
            spreads_reported: counter!("sleet_spreads_reported_total", "ticker" => ticker.clone()),
            active_scanners: gauge!("sleet_active_scanners"),
            ticker,
        }
    }

    /// Record a finished scan pass
    pub fn record_scan(&self, found: usize, reported: usize) {
        self.scans_total.increment(1);
        self.spreads_found.set(found as f64);
        self.spreads_reported.increment(reported as u64);
    }

    /// Record a failed scan pass
    pub fn record_failure(&self, kind: &'static str) {
        self.scans_total.increment(1);
        (self.failures_by_kind)(self.ticker.clone(), kind).increment(1);
    }

    /// Call when a ticker task starts
    pub fn scanner_started(&self) {
        self.active_scanners.increment(1.0);
    }

    /// Call when a ticker task exits
    pub fn scanner_stopped(&self) {
        self.active_scanners.decrement(1.0);
    }

    pub fn ticker(&self) -> &str {
        &self.ticker
    }
}

/// Records scan duration on drop
pub struct ScanTimer<'a> {
    metrics: &'a ScanMetrics,
    start: std::time::Instant,
}

impl<'a> ScanTimer<'a> {
    pub fn new(metrics: &'a ScanMetrics) -> Self {
        Self {
            metrics,
            start: std::time::Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Drop for ScanTimer<'_> {
    fn drop(&mut self) {
        self.metrics.scan_duration.record(self.start.elapsed().as_secs_f64());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_metrics_creation() {
        // No recorder installed; handles are no-ops
        let metrics = ScanMetrics::new("SPY");
        assert_eq!(metrics.ticker(), "SPY");
        metrics.record_scan(12, 3);
        metrics.record_failure("timeout");

        let timer = ScanTimer::new(&metrics);
        assert!(timer.elapsed() < Duration::from_secs(5));
    }
}
