//! Scheduled spread scanner
//!
//! One tokio task per watchlist ticker. Each task waits the initial delay,
//! then on every interval fetches the chain out to the configured horizon,
//! enumerates CALL and PUT spreads, ranks and filters them and reports the
//! best through `tracing`.

use crate::shutdown::{run_until_shutdown, ShutdownController};
use common::{OptionSide, Ticker};
use config::ScannerConfig;
use market_data::{ChainAggregator, ChainRequest, OptionChain};
use observability::{ScanMetrics, ScanTimer};
use spread_engine::{Spread, SpreadConfig, SpreadEngine, SpreadFilter};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// Scanner cadence and selection settings
#[derive(Debug, Clone)]
pub struct ScanSettings {
    pub initial_delay: Duration,
    pub interval: Duration,
    pub days_to_expiration: u32,
    pub engine: SpreadConfig,
    pub filter: SpreadFilter,
    /// Spreads reported per side
    pub top: usize,
    /// Stop each ticker after its first pass
    pub once: bool,
}

impl ScanSettings {
    pub fn from_config(config: &ScannerConfig, once: bool) -> Self {
        Self {
            initial_delay: config.initial_delay(),
            interval: config.interval().max(Duration::from_secs(1)),
            days_to_expiration: config.days_to_expiration,
            engine: SpreadConfig {
                otm_only: config.otm_only,
                skip_same_day: config.skip_same_day,
            },
            filter: SpreadFilter {
                max_buying_power: config.max_buying_power,
                min_roi: config.min_roi,
            },
            top: config.top,
            once,
        }
    }
}

/// Result of one scan pass over one ticker
#[derive(Debug, Clone)]
pub struct ScanReport {
    pub ticker: Ticker,
    pub underlying_price: f64,
    /// Spreads enumerated before filtering
    pub found: usize,
    /// Strike pairs that could not be priced
    pub skipped: usize,
    pub calls: Vec<Spread>,
    pub puts: Vec<Spread>,
}

impl ScanReport {
    pub fn reported(&self) -> usize {
        self.calls.len() + self.puts.len()
    }

    pub fn spreads(&self) -> impl Iterator<Item = &Spread> {
        self.calls.iter().chain(self.puts.iter())
    }
}

pub struct Scanner {
    aggregator: Arc<ChainAggregator>,
    engine: SpreadEngine,
    settings: ScanSettings,
}

impl Scanner {
    pub fn new(aggregator: Arc<ChainAggregator>, settings: ScanSettings) -> Self {
        Self {
            engine: SpreadEngine::new(settings.engine),
            aggregator,
            settings,
        }
    }

    /// Fetch and evaluate one ticker
    pub async fn scan_once(&self, ticker: &Ticker) -> market_data::Result<ScanReport> {
        let request = ChainRequest::close_expiration(
            ticker.clone(),
            self.settings.days_to_expiration,
            self.settings.engine.otm_only,
        );
        let chain = self.aggregator.get_chain(&request).await?;
        Ok(self.evaluate(ticker, &chain))
    }

    /// Enumerate, rank, filter and cap both sides of a chain
    pub fn evaluate(&self, ticker: &Ticker, chain: &OptionChain) -> ScanReport {
        let mut report = ScanReport {
            ticker: ticker.clone(),
            underlying_price: chain.underlying_price,
            found: 0,
            skipped: 0,
            calls: Vec::new(),
            puts: Vec::new(),
        };

        for side in OptionSide::BOTH {
            let scan = self.engine.spreads(chain, side);
            report.found += scan.spreads.len();
            report.skipped += scan.skipped.len();

            let best: Vec<Spread> = self
                .settings
                .filter
                .apply(scan.ranked())
                .into_iter()
                .take(self.settings.top)
                .collect();

            match side {
                OptionSide::Call => report.calls = best,
                OptionSide::Put => report.puts = best,
            }
        }

        report
    }

    /// Start one task per ticker
    pub fn spawn(self: &Arc<Self>, tickers: Vec<Ticker>, shutdown: &ShutdownController) -> Vec<JoinHandle<()>> {
        tickers
            .into_iter()
            .map(|ticker| {
                let scanner = Arc::clone(self);
                let shutdown = shutdown.clone();
                tokio::spawn(async move { scanner.run_ticker(ticker, shutdown).await })
            })
            .collect()
    }

    async fn run_ticker(&self, ticker: Ticker, shutdown: ShutdownController) {
        let metrics = ScanMetrics::new(ticker.as_str());
        metrics.scanner_started();
        let token = shutdown.child_token();

        let mut ticks = interval_at(Instant::now() + self.settings.initial_delay, self.settings.interval);
        ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(%ticker, interval_secs = self.settings.interval.as_secs(), "Scanner started");

        loop {
            if run_until_shutdown(token.clone(), ticks.tick()).await.is_none() {
                break;
            }

            let outcome = {
                let _timer = ScanTimer::new(&metrics);
                run_until_shutdown(token.clone(), self.scan_once(&ticker)).await
            };

            match outcome {
                None => break,
                Some(Ok(report)) => {
                    metrics.record_scan(report.found, report.reported());
                    log_report(&report);
                }
                Some(Err(e)) if e.is_fatal() => {
                    metrics.record_failure(e.kind());
                    error!(%ticker, error = %e, "Upstream rejected credentials, stopping all scanners");
                    shutdown.shutdown("credential rejected");
                    break;
                }
                Some(Err(e)) => {
                    metrics.record_failure(e.kind());
                    warn!(%ticker, error = %e, kind = e.kind(), "Scan failed, retrying next interval");
                }
            }

            if self.settings.once {
                break;
            }
        }

        metrics.scanner_stopped();
        info!(%ticker, "Scanner stopped");
    }
}

/// Report a pass through the log
pub fn log_report(report: &ScanReport) {
    info!(
        ticker = %report.ticker,
        underlying_price = report.underlying_price,
        found = report.found,
        skipped = report.skipped,
        reported = report.reported(),
        "Scan complete"
    );

    for spread in report.spreads() {
        info!(
            ticker = %spread.ticker,
            side = %spread.side,
            expiration = %spread.expiration,
            strikes = %spread.strikes,
            price = spread.price,
            buying_power = spread.buying_power,
            roi = spread.roi,
            delta = spread.delta,
            theta = spread.theta,
            "Spread"
        );
    }

    if report.reported() == 0 {
        debug!(ticker = %report.ticker, "No spreads passed the filter");
    }
}
