//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::{BreakerScope, GatewayConfig};
use crate::config::validation::{validate_config, ValidationError};

/// Prefix for environment overrides.
pub const ENV_PREFIX: &str = "GATEWAY_";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {var}: '{value}'")]
    Env { var: String, value: String },

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file, then apply
/// `GATEWAY_*` environment overrides.
pub fn load_config(path: &Path) -> Result<GatewayConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let mut config: GatewayConfig = toml::from_str(&content)?;

    apply_env_overrides(&mut config, std::env::vars())?;
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Build a configuration from defaults plus environment overrides only.
pub fn load_from_env() -> Result<GatewayConfig, ConfigError> {
    let mut config = GatewayConfig::default();
    apply_env_overrides(&mut config, std::env::vars())?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Apply overrides from `GATEWAY_*` variables. Unknown variables are ignored.
pub fn apply_env_overrides<I>(config: &mut GatewayConfig, vars: I) -> Result<(), ConfigError>
where
    I: IntoIterator<Item = (String, String)>,
{
    for (var, value) in vars {
        let Some(key) = var.strip_prefix(ENV_PREFIX) else {
            continue;
        };
        match key {
            "BIND_ADDRESS" => config.listener.bind_address = value,
            "DELIMITER" => config.routing.delimiter = value,
            "LOG_LEVEL" => config.observability.log_level = value,
            "FAILURE_THRESHOLD" => config.breaker.failure_threshold = parse_env(&var, &value)?,
            "ROLLING_WINDOW_MS" => config.breaker.rolling_window_ms = parse_env(&var, &value)?,
            "RESET_TIMEOUT_MS" => config.breaker.reset_timeout_ms = parse_env(&var, &value)?,
            "CALL_TIMEOUT_MS" => config.timeouts.call_ms = parse_env(&var, &value)?,
            "DISCOVERY_CACHE_TTL_MS" => config.discovery.cache_ttl_ms = parse_env(&var, &value)?,
            "BREAKER_SCOPE" => config.breaker.scope = parse_scope(&var, &value)?,
            _ => {}
        }
    }
    Ok(())
}

fn parse_scope(var: &str, value: &str) -> Result<BreakerScope, ConfigError> {
    match value.trim() {
        "shared" => Ok(BreakerScope::Shared),
        "per_endpoint" => Ok(BreakerScope::PerEndpoint),
        _ => Err(ConfigError::Env {
            var: var.to_string(),
            value: value.to_string(),
        }),
    }
}

fn parse_env<T: std::str::FromStr>(var: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Env {
        var: var.to_string(),
        value: value.to_string(),
    })
}
