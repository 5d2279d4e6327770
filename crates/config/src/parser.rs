use crate::*;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing::{debug, info, instrument};

#[instrument(skip(path))]
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<SleetConfig> {
    let path = path.as_ref();
    info!("Loading configuration from: {:?}", path);

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    debug!("Config file content length: {} bytes", content.len());
    parse_config(&content)
}

/// Parse YAML text after environment variable substitution
pub fn parse_config(content: &str) -> Result<SleetConfig> {
    let substituted = substitution::substitute_env_vars(content)?;
    debug!("Environment variable substitution completed");

    let config: SleetConfig = serde_yaml::from_str(&substituted)
        .with_context(|| "Failed to parse YAML configuration")?;

    info!("Configuration loaded successfully");
    Ok(config)
}

#[instrument]
pub fn generate_default_config() -> SleetConfig {
    SleetConfig {
        api: ApiConfig {
            base_url: Some(DEFAULT_BASE_URL.to_string()),
            api_key: Some("${SLEET_API_KEY}".to_string()),
            access_token: Some("${SLEET_ACCESS_TOKEN}".to_string()),
        },
        http: HttpSettings::default(),
        scanner: ScannerConfig {
            watchlist: vec!["SPY".to_string(), "QQQ".to_string(), "IWM".to_string()],
            ..ScannerConfig::default()
        },
        logging: LoggingConfig::default(),
        metrics: MetricsConfig::default(),
    }
}

#[instrument]
pub fn save_config<P: AsRef<Path> + std::fmt::Debug>(config: &SleetConfig, path: P) -> Result<()> {
    let path = path.as_ref();
    info!("Saving configuration to: {:?}", path);

    let yaml = serde_yaml::to_string(config)
        .with_context(|| "Failed to serialize configuration to YAML")?;

    fs::write(path, yaml)
        .with_context(|| format!("Failed to write config file: {:?}", path))?;

    info!("Configuration saved successfully");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_applies_defaults() {
        let config = parse_config("api:\n  api_key: KEY\nscanner:\n  watchlist: [SPY]\n").unwrap();

        assert_eq!(config.api.base_url(), DEFAULT_BASE_URL);
        assert_eq!(config.http.aggregation_timeout_ms, 5000);
        assert_eq!(config.scanner.interval_secs, 20);
        assert_eq!(config.scanner.initial_delay_secs, 2);
        assert_eq!(config.scanner.days_to_expiration, 40);
        assert!(config.scanner.otm_only);
        assert_eq!(config.scanner.max_buying_power, 5000.0);
        assert_eq!(config.scanner.min_roi, 0.25);
        assert_eq!(config.logging.format, "pretty");
        assert!(!config.metrics.enabled);
    }

    #[test]
    fn test_parse_substitutes_env() {
        std::env::set_var("SLEET_TEST_PARSER_TOKEN", "tok-42");
        let config = parse_config("api:\n  access_token: ${SLEET_TEST_PARSER_TOKEN}\n").unwrap();
        assert_eq!(config.api.access_token.as_deref(), Some("tok-42"));
    }

    #[test]
    fn test_parse_rejects_bad_yaml() {
        assert!(parse_config("api: [unterminated").is_err());
        assert!(parse_config("scanner:\n  interval_secs: 5\n").is_err());
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let path = std::env::temp_dir().join(format!("sleet-config-test-{}.yaml", std::process::id()));
        let config = generate_default_config();
        save_config(&config, &path).unwrap();

        let loaded = load_config(&path).unwrap();
        assert_eq!(loaded.scanner.watchlist, config.scanner.watchlist);
        assert_eq!(loaded.http.max_in_flight, config.http.max_in_flight);
        let _ = fs::remove_file(&path);
    }
}
