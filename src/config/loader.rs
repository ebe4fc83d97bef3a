use anyhow::{Context, Result};
use ::config::{Config, Environment, File, FileFormat};
use std::path::Path;
use tracing::{debug, info};

use super::ExperimentConfig;
use crate::error::ExperimentError;

/// Prefix for environment overrides, e.g. `HIT_BENCH__FOREST__N_TREES=200`
pub const ENV_PREFIX: &str = "HIT_BENCH";

/// Layer defaults, the optional TOML file and `HIT_BENCH__*` environment variables
pub fn load_config(path: &Path) -> Result<ExperimentConfig> {
    if path.exists() {
        info!("Loading configuration from {}", path.display());
    } else {
        debug!("No config file at {}, using defaults", path.display());
    }

    let settings = Config::builder()
        .add_source(Config::try_from(&ExperimentConfig::default())?)
        .add_source(File::from(path).format(FileFormat::Toml).required(false))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .with_context(|| format!("failed to build configuration from {}", path.display()))?;

    let config: ExperimentConfig = settings
        .try_deserialize()
        .context("configuration has unexpected shape")?;

    Ok(config)
}

/// Effective configuration rendered as TOML
pub fn to_toml(config: &ExperimentConfig) -> Result<String> {
    Ok(toml::to_string_pretty(config)?)
}

pub fn ensure_valid(config: &ExperimentConfig) -> Result<(), ExperimentError> {
    config.validate().map_err(ExperimentError::InvalidConfig)
}
