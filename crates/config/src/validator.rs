use crate::*;
use common::Ticker;
use std::collections::HashSet;
use thiserror::Error;
use url::Url;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Invalid base url '{url}': {message}")]
    InvalidBaseUrl { url: String, message: String },

    #[error("Either api.api_key or api.access_token must be set")]
    MissingCredential,

    #[error("Environment variable '{var}' is missing or invalid: {message}")]
    InvalidEnvVar { var: String, message: String },

    #[error("{field} must be a positive integer")]
    InvalidPositiveInteger { field: String },

    #[error("{field} must be a positive float")]
    InvalidPositiveFloat { field: String },

    #[error("Watchlist is empty")]
    EmptyWatchlist,

    #[error("Invalid ticker '{ticker}': {message}")]
    InvalidTicker { ticker: String, message: String },

    #[error("Invalid log format: {0}. Must be one of: pretty, json, compact")]
    InvalidLogFormat(String),

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("metrics.port must be non-zero when metrics are enabled")]
    InvalidMetricsPort,
}

#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub field: String,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct DefaultApplied {
    pub field: String,
    pub value: String,
}

#[derive(Debug, Clone)]
pub struct ValidationReport {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
    pub defaults_applied: Vec<DefaultApplied>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self {
            errors: Vec::new(),
            warnings: Vec::new(),
            defaults_applied: Vec::new(),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, field: &str, message: &str) {
        self.warnings.push(ValidationWarning {
            field: field.to_string(),
            message: message.to_string(),
        });
    }

    pub fn add_default(&mut self, field: &str, value: &str) {
        self.defaults_applied.push(DefaultApplied {
            field: field.to_string(),
            value: value.to_string(),
        });
    }
}

impl Default for ValidationReport {
    fn default() -> Self {
        Self::new()
    }
}

pub fn validate_config(config: &SleetConfig) -> ValidationReport {
    let mut report = ValidationReport::new();

    validate_api(&config.api, &mut report);
    validate_http(&config.http, &mut report);
    validate_scanner(&config.scanner, &mut report);
    validate_logging(&config.logging, &mut report);
    validate_metrics(&config.metrics, &mut report);

    report
}

fn validate_api(api: &ApiConfig, report: &mut ValidationReport) {
    if api.base_url.is_none() {
        report.add_default("api.base_url", DEFAULT_BASE_URL);
    }

    let base_url = api.base_url();
    match Url::parse(base_url) {
        Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {
            if url.scheme() == "http" {
                report.add_warning("api.base_url", "Credentials will be sent over plain http");
            }
        }
        Ok(url) => report.add_error(ValidationError::InvalidBaseUrl {
            url: base_url.to_string(),
            message: format!("unsupported scheme '{}'", url.scheme()),
        }),
        Err(e) => report.add_error(ValidationError::InvalidBaseUrl {
            url: base_url.to_string(),
            message: e.to_string(),
        }),
    }

    let mut present = 0;
    let mut unresolved = 0;
    for value in [&api.api_key, &api.access_token].into_iter().flatten() {
        if let Some(var) = unresolved_env_var(value) {
            unresolved += 1;
            report.add_error(ValidationError::InvalidEnvVar {
                var,
                message: "credential placeholder was not substituted".to_string(),
            });
        } else if !value.trim().is_empty() {
            present += 1;
        }
    }
    if present == 0 && unresolved == 0 {
        report.add_error(ValidationError::MissingCredential);
    }
}

fn validate_http(http: &HttpSettings, report: &mut ValidationReport) {
    let positives = [
        ("http.connect_timeout_ms", http.connect_timeout_ms),
        ("http.request_timeout_ms", http.request_timeout_ms),
        ("http.aggregation_timeout_ms", http.aggregation_timeout_ms),
        ("http.max_in_flight", http.max_in_flight as u64),
    ];
    for (field, value) in positives {
        if value == 0 {
            report.add_error(ValidationError::InvalidPositiveInteger {
                field: field.to_string(),
            });
        }
    }

    if http.request_timeout_ms > http.aggregation_timeout_ms {
        report.add_warning(
            "http.request_timeout_ms",
            "Longer than aggregation_timeout_ms; slow legs will surface as aggregation timeouts",
        );
    }

    if http.max_in_flight == 1 {
        report.add_warning("http.max_in_flight", "Chain legs will run one at a time");
    }
}

fn validate_scanner(scanner: &ScannerConfig, report: &mut ValidationReport) {
    if scanner.watchlist.is_empty() {
        report.add_error(ValidationError::EmptyWatchlist);
    }

    let mut seen = HashSet::new();
    for raw in &scanner.watchlist {
        match Ticker::parse(raw) {
            Ok(ticker) => {
                if !seen.insert(ticker.clone()) {
                    report.add_warning(
                        "scanner.watchlist",
                        &format!("Duplicate ticker '{}' will be scanned once", ticker),
                    );
                }
            }
            Err(e) => report.add_error(ValidationError::InvalidTicker {
                ticker: raw.clone(),
                message: e.to_string(),
            }),
        }
    }

    if scanner.interval_secs == 0 {
        report.add_error(ValidationError::InvalidPositiveInteger {
            field: "scanner.interval_secs".to_string(),
        });
    }

    if scanner.days_to_expiration == 0 {
        report.add_warning(
            "scanner.days_to_expiration",
            "Only same-day expirations will be fetched",
        );
    }

    if scanner.max_buying_power.is_nan() || scanner.max_buying_power <= 0.0 {
        report.add_error(ValidationError::InvalidPositiveFloat {
            field: "scanner.max_buying_power".to_string(),
        });
    }

    if scanner.min_roi < 0.0 {
        report.add_warning("scanner.min_roi", "Negative threshold admits debit spreads");
    }

    if scanner.top == 0 {
        report.add_error(ValidationError::InvalidPositiveInteger {
            field: "scanner.top".to_string(),
        });
    }
}

fn validate_logging(logging: &LoggingConfig, report: &mut ValidationReport) {
    let valid_formats = ["pretty", "json", "compact"];
    if !valid_formats.contains(&logging.format.to_lowercase().as_str()) {
        report.add_error(ValidationError::InvalidLogFormat(logging.format.clone()));
    }

    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if !valid_levels.contains(&logging.level.to_lowercase().as_str()) {
        report.add_error(ValidationError::InvalidLogLevel(logging.level.clone()));
    }
}

fn validate_metrics(metrics: &MetricsConfig, report: &mut ValidationReport) {
    if metrics.enabled && metrics.port == 0 {
        report.add_error(ValidationError::InvalidMetricsPort);
    }
}
