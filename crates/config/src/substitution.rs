use anyhow::Result;
use regex::{Captures, Regex};
use std::env;
use tracing::{debug, warn};

/// Only the braced form is recognised; a bare `$SPX` is an index ticker.
const ENV_VAR_PATTERN: &str = r"\$\{(\w+)\}";

/// Substitute environment variables in the format ${VAR_NAME}
///
/// Unset variables keep their placeholder so the validator can report them.
pub fn substitute_env_vars(content: &str) -> Result<String> {
    let re = Regex::new(ENV_VAR_PATTERN)?;
    let mut missing_vars = Vec::new();

    let result = re.replace_all(content, |caps: &Captures| {
        let placeholder = &caps[0];
        let var_name = &caps[1];
        match env::var(var_name) {
            Ok(value) => {
                debug!("Substituting environment variable: {}", var_name);
                value
            }
            Err(_) => {
                warn!("Environment variable '{}' not set", var_name);
                missing_vars.push(var_name.to_string());
                placeholder.to_string()
            }
        }
    });

    if !missing_vars.is_empty() {
        debug!(
            "Environment variables not set (may use defaults or fail validation): {:?}",
            missing_vars
        );
    }

    Ok(result.into_owned())
}

/// Name of the first unresolved ${VAR} placeholder, if any
pub fn unresolved_env_var(content: &str) -> Option<String> {
    Regex::new(ENV_VAR_PATTERN)
        .ok()?
        .captures(content)
        .map(|caps| caps[1].to_string())
}
