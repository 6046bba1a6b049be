//! Process-level configuration.
//!
//! Resolved once from the environment at start-up, validated, then passed into
//! constructors. Nothing below this module reads environment variables.

use std::ffi::OsString;
use std::fmt::{Debug, Formatter};
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

pub const ENV_HOME: &str = "VOLCAST_HOME";
pub const ENV_DB_PATH: &str = "VOLCAST_DB_PATH";
pub const ENV_MODEL_DIR: &str = "VOLCAST_MODEL_DIR";
pub const ENV_ALPHAVANTAGE_API_KEY: &str = "VOLCAST_ALPHAVANTAGE_API_KEY";
pub const ENV_PROVIDER_TIMEOUT_MS: &str = "VOLCAST_PROVIDER_TIMEOUT_MS";
pub const ENV_STORAGE_TIMEOUT_MS: &str = "VOLCAST_STORAGE_TIMEOUT_MS";
pub const ENV_MIN_OBSERVATIONS: &str = "VOLCAST_MIN_OBSERVATIONS";

const DEFAULT_PROVIDER_TIMEOUT_MS: u64 = 10_000;
const DEFAULT_STORAGE_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_MIN_OBSERVATIONS: usize = 30;
const DEFAULT_MAX_POOL_SIZE: usize = 4;

/// Configuration errors, reported before any component is constructed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} must be a non-negative integer, got '{value}'")]
    NotAnInteger { name: &'static str, value: String },

    #[error("{name} must be greater than zero")]
    ZeroValue { name: &'static str },

    #[error("{name} must not be empty")]
    EmptyPath { name: &'static str },

    #[error("min_observations must be at least 2, got {value}")]
    MinObservationsTooSmall { value: usize },
}

/// Explicit runtime configuration for the lifecycle and its collaborators.
#[derive(Clone, PartialEq, Eq)]
pub struct VolcastConfig {
    pub home: PathBuf,
    pub db_path: PathBuf,
    pub model_dir: PathBuf,
    pub alphavantage_api_key: Option<String>,
    pub provider_timeout: Duration,
    pub storage_timeout: Duration,
    /// Lower bound on the return-series length accepted by `fit`.
    pub min_observations: usize,
    pub max_pool_size: usize,
}

impl VolcastConfig {
    /// Defaults rooted at `home`: `<home>/data/prices.duckdb` and `<home>/models`.
    pub fn with_home(home: impl Into<PathBuf>) -> Self {
        let home = home.into();
        Self {
            db_path: home.join("data").join("prices.duckdb"),
            model_dir: home.join("models"),
            home,
            alphavantage_api_key: None,
            provider_timeout: Duration::from_millis(DEFAULT_PROVIDER_TIMEOUT_MS),
            storage_timeout: Duration::from_millis(DEFAULT_STORAGE_TIMEOUT_MS),
            min_observations: DEFAULT_MIN_OBSERVATIONS,
            max_pool_size: DEFAULT_MAX_POOL_SIZE,
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var_os(name))
    }

    /// Resolve configuration through `lookup` instead of the process
    /// environment, then validate it.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<OsString>,
    {
        let non_empty = |name: &str| lookup(name).filter(|value| !value.is_empty());

        let home = non_empty(ENV_HOME)
            .map(PathBuf::from)
            .or_else(|| non_empty("HOME").map(|home| PathBuf::from(home).join(".volcast")))
            .unwrap_or_else(|| PathBuf::from(".volcast"));

        let mut config = Self::with_home(home);

        if let Some(path) = non_empty(ENV_DB_PATH) {
            config.db_path = PathBuf::from(path);
        }
        if let Some(path) = non_empty(ENV_MODEL_DIR) {
            config.model_dir = PathBuf::from(path);
        }

        config.alphavantage_api_key = non_empty(ENV_ALPHAVANTAGE_API_KEY)
            .map(|value| value.to_string_lossy().trim().to_owned())
            .filter(|value| !value.is_empty());

        if let Some(value) = non_empty(ENV_PROVIDER_TIMEOUT_MS) {
            config.provider_timeout =
                Duration::from_millis(parse_integer(ENV_PROVIDER_TIMEOUT_MS, &value)?);
        }
        if let Some(value) = non_empty(ENV_STORAGE_TIMEOUT_MS) {
            config.storage_timeout =
                Duration::from_millis(parse_integer(ENV_STORAGE_TIMEOUT_MS, &value)?);
        }
        if let Some(value) = non_empty(ENV_MIN_OBSERVATIONS) {
            let parsed = parse_integer(ENV_MIN_OBSERVATIONS, &value)?;
            config.min_observations =
                usize::try_from(parsed).map_err(|_| ConfigError::NotAnInteger {
                    name: ENV_MIN_OBSERVATIONS,
                    value: value.to_string_lossy().into_owned(),
                })?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.db_path.as_os_str().is_empty() {
            return Err(ConfigError::EmptyPath { name: "db_path" });
        }
        if self.model_dir.as_os_str().is_empty() {
            return Err(ConfigError::EmptyPath { name: "model_dir" });
        }
        if self.provider_timeout.is_zero() {
            return Err(ConfigError::ZeroValue {
                name: "provider_timeout",
            });
        }
        if self.storage_timeout.is_zero() {
            return Err(ConfigError::ZeroValue {
                name: "storage_timeout",
            });
        }
        if self.max_pool_size == 0 {
            return Err(ConfigError::ZeroValue {
                name: "max_pool_size",
            });
        }
        if self.min_observations < 2 {
            return Err(ConfigError::MinObservationsTooSmall {
                value: self.min_observations,
            });
        }
        Ok(())
    }

    pub fn warehouse_config(&self) -> volcast_warehouse::WarehouseConfig {
        volcast_warehouse::WarehouseConfig {
            db_path: self.db_path.clone(),
            max_pool_size: self.max_pool_size,
        }
    }
}

// Hand-written so the API key never reaches logs.
impl Debug for VolcastConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VolcastConfig")
            .field("home", &self.home)
            .field("db_path", &self.db_path)
            .field("model_dir", &self.model_dir)
            .field(
                "alphavantage_api_key",
                &self.alphavantage_api_key.as_ref().map(|_| "<redacted>"),
            )
            .field("provider_timeout", &self.provider_timeout)
            .field("storage_timeout", &self.storage_timeout)
            .field("min_observations", &self.min_observations)
            .field("max_pool_size", &self.max_pool_size)
            .finish()
    }
}

fn parse_integer(name: &'static str, value: &OsString) -> Result<u64, ConfigError> {
    let text = value.to_string_lossy();
    text.trim()
        .parse::<u64>()
        .map_err(|_| ConfigError::NotAnInteger {
            name,
            value: text.into_owned(),
        })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<OsString> {
        let map: HashMap<String, OsString> = pairs
            .iter()
            .map(|(key, value)| ((*key).to_owned(), OsString::from(*value)))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_are_rooted_under_home() {
        let config = VolcastConfig::from_lookup(lookup(&[("HOME", "/home/trader")]))
            .expect("config should resolve");

        assert_eq!(config.home, PathBuf::from("/home/trader/.volcast"));
        assert_eq!(
            config.db_path,
            PathBuf::from("/home/trader/.volcast/data/prices.duckdb")
        );
        assert_eq!(config.model_dir, PathBuf::from("/home/trader/.volcast/models"));
        assert_eq!(config.provider_timeout, Duration::from_secs(10));
        assert_eq!(config.storage_timeout, Duration::from_secs(5));
        assert_eq!(config.min_observations, 30);
        assert!(config.alphavantage_api_key.is_none());
    }

    #[test]
    fn explicit_variables_override_defaults() {
        let config = VolcastConfig::from_lookup(lookup(&[
            (ENV_HOME, "/srv/volcast"),
            (ENV_MODEL_DIR, "/var/models"),
            (ENV_ALPHAVANTAGE_API_KEY, " secret "),
            (ENV_PROVIDER_TIMEOUT_MS, "2500"),
            (ENV_MIN_OBSERVATIONS, "100"),
        ]))
        .expect("config should resolve");

        assert_eq!(config.db_path, PathBuf::from("/srv/volcast/data/prices.duckdb"));
        assert_eq!(config.model_dir, PathBuf::from("/var/models"));
        assert_eq!(config.alphavantage_api_key.as_deref(), Some("secret"));
        assert_eq!(config.provider_timeout, Duration::from_millis(2_500));
        assert_eq!(config.min_observations, 100);
    }

    #[test]
    fn rejects_zero_timeout_and_tiny_minimum() {
        let err = VolcastConfig::from_lookup(lookup(&[(ENV_STORAGE_TIMEOUT_MS, "0")]))
            .expect_err("must fail");
        assert_eq!(
            err,
            ConfigError::ZeroValue {
                name: "storage_timeout"
            }
        );

        let err = VolcastConfig::from_lookup(lookup(&[(ENV_MIN_OBSERVATIONS, "1")]))
            .expect_err("must fail");
        assert_eq!(err, ConfigError::MinObservationsTooSmall { value: 1 });
    }

    #[test]
    fn rejects_non_numeric_timeout() {
        let err = VolcastConfig::from_lookup(lookup(&[(ENV_PROVIDER_TIMEOUT_MS, "soon")]))
            .expect_err("must fail");
        assert!(matches!(err, ConfigError::NotAnInteger { .. }));
    }

    #[test]
    fn debug_output_redacts_api_key() {
        let mut config = VolcastConfig::with_home("/tmp/volcast");
        config.alphavantage_api_key = Some(String::from("super-secret"));
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("<redacted>"));
    }
}
