use std::path::Path;

use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use thiserror::Error;

use crate::domain::models::config::Config;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("Invalid initial_backoff_ms: {0}. Must be positive")]
    InvalidInitialBackoff(u64),

    #[error(
        "Invalid backoff configuration: initial_backoff_ms ({0}) must not exceed max_backoff_ms ({1})"
    )]
    InvalidBackoff(u64, u64),

    #[error("Invalid attempt_timeout_ms: {0}. Must be positive")]
    InvalidAttemptTimeout(u64),
}

const PROJECT_CONFIG: &str = ".cloudscan/config.yaml";
const LOCAL_CONFIG: &str = ".cloudscan/local.yaml";
const ENV_PREFIX: &str = "CLOUDSCAN_";

/// Loads [`Config`] by layering figment providers over the built-in defaults.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Layers, lowest to highest: defaults, `.cloudscan/config.yaml`,
    /// `.cloudscan/local.yaml`, then `CLOUDSCAN_*` env vars with `__` as the
    /// section separator. Missing files are skipped.
    pub fn load() -> Result<Config> {
        let figment = Self::defaults()
            .merge(Yaml::file(PROJECT_CONFIG))
            .merge(Yaml::file(LOCAL_CONFIG))
            .merge(Env::prefixed(ENV_PREFIX).split("__"));
        Self::extract(&figment, "project configuration")
    }

    /// Defaults overlaid with a single YAML file. Env vars are not consulted.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Config> {
        let path = path.as_ref();
        let figment = Self::defaults().merge(Yaml::file(path));
        Self::extract(&figment, &path.display().to_string())
    }

    fn defaults() -> Figment {
        Figment::from(Serialized::defaults(Config::default()))
    }

    fn extract(figment: &Figment, source: &str) -> Result<Config> {
        let config: Config = figment
            .extract()
            .with_context(|| format!("Failed to load {source}"))?;
        Self::validate(&config).with_context(|| format!("Invalid {source}"))?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        if config.retry.initial_backoff_ms == 0 {
            return Err(ConfigError::InvalidInitialBackoff(0));
        }

        if config.retry.initial_backoff_ms > config.retry.max_backoff_ms {
            return Err(ConfigError::InvalidBackoff(
                config.retry.initial_backoff_ms,
                config.retry.max_backoff_ms,
            ));
        }

        if config.retry.attempt_timeout_ms == 0 {
            return Err(ConfigError::InvalidAttemptTimeout(0));
        }

        Ok(())
    }
}
