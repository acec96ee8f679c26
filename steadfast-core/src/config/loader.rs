use std::path::{Path, PathBuf};

use crate::config::schema::Config;
use crate::config::validation::validate_config;
use crate::error::{Error, Result};

const ENV_INACTIVITY_TIMEOUT: &str = "STEADFAST_INACTIVITY_TIMEOUT_SECS";
const ENV_DRAIN_TIMEOUT: &str = "STEADFAST_DRAIN_TIMEOUT_SECS";
const ENV_RETRY_BUDGET: &str = "STEADFAST_RETRY_BUDGET";
const ENV_BASE_URL: &str = "STEADFAST_BASE_URL";
const ENV_LOG_LEVEL: &str = "STEADFAST_LOG_LEVEL";

pub fn load_from_file(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path).map_err(|err| {
        Error::Config(format!("failed to read config '{}': {err}", path.display()))
    })?;

    toml::from_str(&content).map_err(|err| {
        Error::Config(format!(
            "failed to parse config '{}': {err}",
            path.display()
        ))
    })
}

/// Where the base of a loaded configuration came from. Loading happens
/// before logging is set up, so callers report it once tracing is live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    File(PathBuf),
    Defaults,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::File(path) => write!(f, "{}", path.display()),
            Self::Defaults => f.write_str("built-in defaults"),
        }
    }
}

/// Reads `path` when it exists, layers environment overrides on top and
/// validates the result. A missing file yields the defaults.
pub fn load_with_source(path: Option<&Path>) -> Result<(Config, ConfigSource)> {
    let (mut config, source) = match path {
        Some(path) if path.exists() => (
            load_from_file(path)?,
            ConfigSource::File(path.to_path_buf()),
        ),
        _ => (Config::default(), ConfigSource::Defaults),
    };

    load_from_env(&mut config, |key| std::env::var(key).ok())?;
    validate_config(&config)?;
    Ok((config, source))
}

/// Applies overrides from `lookup`, normally `std::env::var`.
pub fn load_from_env<F>(config: &mut Config, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(value) = lookup(ENV_INACTIVITY_TIMEOUT) {
        config.resilience.inactivity_timeout_secs = parse_number(ENV_INACTIVITY_TIMEOUT, &value)?;
    }
    if let Some(value) = lookup(ENV_DRAIN_TIMEOUT) {
        config.resilience.drain_timeout_secs = parse_number(ENV_DRAIN_TIMEOUT, &value)?;
    }
    if let Some(value) = lookup(ENV_RETRY_BUDGET) {
        config.resilience.retry_budget = parse_number(ENV_RETRY_BUDGET, &value)?;
    }
    if let Some(value) = lookup(ENV_BASE_URL) {
        config.service.base_url = value.trim().to_owned();
    }
    if let Some(value) = lookup(ENV_LOG_LEVEL) {
        config.logging.level = value.trim().to_owned();
    }

    Ok(())
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|err| Error::Config(format!("invalid value '{value}' for {key}: {err}")))
}
