//! Sleet CLI and scanner binary
//!
//! Commands for initializing and validating configuration, fetching a
//! single option chain, and running the scheduled spread scanner.

mod client;
mod scanner;
mod shutdown;

use anyhow::{Context, Result};
use cli::{Cli, Commands, LogFormatArg, SideArg};
use common::Ticker;
use config::{generate_default_config, load_config, save_config, validate_config, SleetConfig};
use market_data::ChainRequest;
use observability::{init_logging, init_metrics, LogFormat};
use scanner::{ScanSettings, Scanner};
use shutdown::ShutdownController;
use spread_engine::{SpreadConfig, SpreadEngine};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();

    match cli.command {
        Commands::Scan {
            config,
            tickers,
            once,
            log_format,
        } => scan_command(config, tickers, once, log_format).await,
        Commands::Chain {
            ticker,
            config,
            side,
            days,
            combined,
            json,
        } => chain_command(config, ticker, side, days, combined, json).await,
        Commands::Validate { config } => {
            init_logging("sleet", LogFormat::Pretty, "warn")?;
            validate_command(config).await
        }
        Commands::Init { output, force } => {
            init_logging("sleet", LogFormat::Pretty, "warn")?;
            init_command(output, force).await
        }
    }
}

/// Load, validate and set up logging from a config file
fn load_validated<P: AsRef<Path>>(path: P, log_format: Option<LogFormatArg>) -> Result<SleetConfig> {
    // Logging is configured by the file, so load before initializing it
    let config = load_config(&path)?;

    let format_name = log_format
        .map(|f| f.as_str().to_string())
        .unwrap_or_else(|| config.logging.format.clone());
    let format = LogFormat::parse(&format_name).unwrap_or_default();
    init_logging("sleet", format, &config.logging.level)?;
    debug!(path = ?path.as_ref(), "Configuration loaded");

    let report = validate_config(&config);
    for warning in &report.warnings {
        warn!(field = %warning.field, message = %warning.message, "Configuration warning");
    }
    if !report.is_valid() {
        error!(error_count = report.errors.len(), "Configuration validation failed");
        for err in &report.errors {
            error!("{}", err);
        }
        anyhow::bail!("Cannot start due to configuration errors");
    }

    Ok(config)
}

fn parse_tickers(raw: &[String]) -> Result<Vec<Ticker>> {
    let mut tickers: Vec<Ticker> = Vec::with_capacity(raw.len());
    for value in raw {
        let ticker = Ticker::parse(value).with_context(|| format!("Invalid ticker: {:?}", value))?;
        if !tickers.contains(&ticker) {
            tickers.push(ticker);
        }
    }
    Ok(tickers)
}

async fn scan_command<P: AsRef<Path>>(
    config_path: P,
    ticker_overrides: Vec<String>,
    once: bool,
    log_format: Option<LogFormatArg>,
) -> Result<()> {
    let config = load_validated(config_path, log_format)?;

    if config.metrics.enabled {
        init_metrics(config.metrics.port)?;
    }

    let raw = if ticker_overrides.is_empty() {
        &config.scanner.watchlist
    } else {
        &ticker_overrides
    };
    let tickers = parse_tickers(raw)?;
    if tickers.is_empty() {
        anyhow::bail!("Nothing to scan: the watchlist is empty");
    }

    let aggregator = Arc::new(client::build_aggregator(&config)?);
    let scanner = Arc::new(Scanner::new(
        Arc::clone(&aggregator),
        ScanSettings::from_config(&config.scanner, once),
    ));

    info!(
        tickers = ?tickers.iter().map(Ticker::as_str).collect::<Vec<_>>(),
        interval_secs = config.scanner.interval_secs,
        days = config.scanner.days_to_expiration,
        once,
        "Starting spread scanner"
    );

    let shutdown = ShutdownController::with_ctrl_c();
    let handles = scanner.spawn(tickers, &shutdown);
    for handle in handles {
        if let Err(e) = handle.await {
            error!(error = %e, "Scanner task panicked");
        }
    }

    aggregator.client().close().await;
    info!(reason = shutdown.reason().unwrap_or("completed"), "Sleet stopped");

    if aggregator.is_halted() {
        anyhow::bail!("Upstream rejected the configured credentials");
    }
    Ok(())
}

async fn chain_command<P: AsRef<Path>>(
    config_path: P,
    ticker: String,
    side: SideArg,
    days: Option<u32>,
    combined: bool,
    json: bool,
) -> Result<()> {
    let config = load_validated(config_path, None)?;
    let ticker = Ticker::parse(&ticker).with_context(|| format!("Invalid ticker: {:?}", ticker))?;
    let days = days.unwrap_or(config.scanner.days_to_expiration);

    let aggregator = client::build_aggregator(&config)?;
    let request = ChainRequest::close_expiration(ticker.clone(), days, config.scanner.otm_only);
    let result = if combined {
        aggregator.get_chain_combined(&request).await
    } else {
        aggregator.get_chain(&request).await
    };
    aggregator.client().close().await;
    let chain = result.with_context(|| format!("Failed to fetch chain for {}", ticker))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&chain)?);
        return Ok(());
    }

    let engine = SpreadEngine::new(SpreadConfig {
        otm_only: config.scanner.otm_only,
        skip_same_day: config.scanner.skip_same_day,
    });

    println!("{} underlying={:.2}", chain.symbol, chain.underlying_price);
    for &side in side.sides() {
        let scan = engine.spreads(&chain, side);
        let skipped = scan.skipped.len();
        let ranked = scan.ranked();
        println!();
        println!(
            "{} expirations={} contracts={} spreads={} skipped={}",
            side,
            chain.expiration_keys(side).count(),
            chain.contract_count(side),
            ranked.len(),
            skipped
        );
        for spread in ranked.iter().take(config.scanner.top) {
            println!("  {}", spread);
        }
    }

    Ok(())
}

async fn validate_command<P: AsRef<Path>>(config_path: P) -> Result<()> {
    info!(path = ?config_path.as_ref(), "Validating configuration");

    let config = match load_config(&config_path) {
        Ok(c) => c,
        Err(e) => {
            error!(%e, "Failed to load configuration");
            anyhow::bail!(e);
        }
    };

    let report = validate_config(&config);

    println!("\n=== Configuration Validation Report ===\n");

    if !report.defaults_applied.is_empty() {
        println!("Defaults Applied ({}):", report.defaults_applied.len());
        for default in &report.defaults_applied {
            println!("  [info] {} = {}", default.field, default.value);
        }
        println!();
    }

    if !report.warnings.is_empty() {
        println!("Warnings ({}):", report.warnings.len());
        for warning in &report.warnings {
            println!("  [warn] [{}] {}", warning.field, warning.message);
        }
        println!();
    }

    if !report.errors.is_empty() {
        println!("Errors ({}):", report.errors.len());
        for err in &report.errors {
            println!("  [error] {}", err);
        }
        println!();
        anyhow::bail!("Configuration validation failed");
    }

    println!("[ok] Configuration is valid!");
    println!();
    println!("Endpoint: {}", config.api.base_url());
    println!("Watchlist: {}", config.scanner.watchlist.join(", "));
    println!(
        "Cadence: first scan after {}s, then every {}s",
        config.scanner.initial_delay_secs, config.scanner.interval_secs
    );
    println!(
        "Filter: buying power <= {:.2}, ROI >= {:.3}",
        config.scanner.max_buying_power, config.scanner.min_roi
    );

    Ok(())
}

async fn init_command<P: AsRef<Path>>(output_path: P, force: bool) -> Result<()> {
    let output_path = output_path.as_ref();
    info!(?output_path, "Initializing new configuration file");

    if output_path.exists() && !force {
        anyhow::bail!("{:?} already exists; pass --force to overwrite", output_path);
    }

    let config = generate_default_config();

    if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {:?}", parent))?;
    }

    save_config(&config, output_path)?;

    println!("[ok] Configuration file created successfully!");
    println!();
    println!("Location: {:?}", output_path);
    println!();
    println!("Next steps:");
    println!("  1. Export SLEET_API_KEY and/or SLEET_ACCESS_TOKEN");
    println!("  2. Edit the watchlist and filter thresholds");
    println!(
        "  3. Run 'sleet validate --config {:?}' to check configuration",
        output_path
    );
    println!(
        "  4. Run 'sleet scan --config {:?}' to start scanning",
        output_path
    );

    Ok(())
}
