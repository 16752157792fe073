use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use thiserror::Error;

use crate::domain::models::config::{Config, RetrievalBackend};

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("Invalid log rotation: {0}. Must be one of: daily, hourly, never")]
    InvalidRotation(String),

    #[error("Database path cannot be empty")]
    EmptyDatabasePath,

    #[error("Invalid max_connections: {0}. Must be at least 1")]
    InvalidMaxConnections(u32),

    #[error("Invalid temperature: {0}. Must be between 0.0 and 1.0")]
    InvalidTemperature(f32),

    #[error("Invalid max_tokens: {0}. Must be at least 1")]
    InvalidMaxTokens(u32),

    #[error("Invalid {0} timeout: must be greater than 0 seconds")]
    InvalidTimeout(&'static str),

    #[error(
        "Invalid backoff configuration: initial_backoff_ms ({0}) must not exceed max_backoff_ms ({1})"
    )]
    InvalidBackoff(u64, u64),

    #[error("Invalid embedding dimension: {0}. Must be at least 1")]
    InvalidDimension(usize),

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .smartspec/config.yaml (project config)
    /// 3. .smartspec/local.yaml (project local overrides, optional)
    /// 4. Environment variables (SMARTSPEC_* prefix, highest priority)
    pub fn load() -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(".smartspec/config.yaml"))
            .merge(Yaml::file(".smartspec/local.yaml"))
            .merge(Env::prefixed("SMARTSPEC_").split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file, still honouring env overrides
    pub fn load_from_file(path: impl AsRef<std::path::Path>) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path.as_ref()))
            .merge(Env::prefixed("SMARTSPEC_").split("__"))
            .extract()
            .context(format!(
                "Failed to load config from {}",
                path.as_ref().display()
            ))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        if config.database.path.trim().is_empty() {
            return Err(ConfigError::EmptyDatabasePath);
        }
        if config.database.max_connections == 0 {
            return Err(ConfigError::InvalidMaxConnections(
                config.database.max_connections,
            ));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.to_lowercase().as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }
        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }
        let valid_rotations = ["daily", "hourly", "never"];
        if !valid_rotations.contains(&config.logging.rotation.as_str()) {
            return Err(ConfigError::InvalidRotation(config.logging.rotation.clone()));
        }

        let generation = &config.generation;
        if !(0.0..=1.0).contains(&generation.temperature) {
            return Err(ConfigError::InvalidTemperature(generation.temperature));
        }
        if generation.max_tokens == 0 {
            return Err(ConfigError::InvalidMaxTokens(generation.max_tokens));
        }
        if generation.timeout_secs == 0 {
            return Err(ConfigError::InvalidTimeout("generation"));
        }
        if generation.initial_backoff_ms > generation.max_backoff_ms {
            return Err(ConfigError::InvalidBackoff(
                generation.initial_backoff_ms,
                generation.max_backoff_ms,
            ));
        }
        if generation.model.trim().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "generation.model cannot be empty".to_string(),
            ));
        }

        let retrieval = &config.retrieval;
        if retrieval.timeout_secs == 0 {
            return Err(ConfigError::InvalidTimeout("retrieval"));
        }
        if retrieval.backend == RetrievalBackend::Qdrant {
            if retrieval.url.trim().is_empty() {
                return Err(ConfigError::ValidationFailed(
                    "retrieval.url cannot be empty when backend is qdrant".to_string(),
                ));
            }
            if retrieval.collection.trim().is_empty() {
                return Err(ConfigError::ValidationFailed(
                    "retrieval.collection cannot be empty when backend is qdrant".to_string(),
                ));
            }
            if retrieval.embedding.dimension == 0 {
                return Err(ConfigError::InvalidDimension(retrieval.embedding.dimension));
            }
        }

        Ok(())
    }
}
