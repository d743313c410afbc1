//! Tracker configuration.
//!
//! Values come from (lowest to highest priority): built-in defaults, an
//! optional config file, then `QUERYWATCH__*` environment variables
//! (e.g. `QUERYWATCH__MAX_LIST_LEN=500`).

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::domain::Stage;

pub const ENV_PREFIX: &str = "QUERYWATCH";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Prefix for every key the tracker and snapshot touch.
    pub key_prefix: String,

    /// TTL of task record keys. Expired records become holes.
    pub record_ttl_secs: u64,

    /// Hard cap on each stage list. Tasks pushed past it are evicted.
    pub max_list_len: usize,

    /// Upper bound for a single store round trip.
    pub store_timeout_ms: u64,

    /// Interval of the retention sweep.
    pub sweep_interval_secs: u64,

    /// Bounded retry around reads.
    pub read_retry: ReadRetryConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadRetryConfig {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub multiplier: f64,
    /// Upper bound for a single backoff delay.
    pub max_delay_ms: u64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            key_prefix: "querywatch".to_string(),
            record_ttl_secs: 30 * 60,
            max_list_len: 1000,
            store_timeout_ms: 500,
            sweep_interval_secs: 60,
            read_retry: ReadRetryConfig::default(),
        }
    }
}

impl Default for ReadRetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 50,
            multiplier: 2.0,
            max_delay_ms: 2_000,
        }
    }
}

impl TrackerConfig {
    /// Load defaults + optional file + environment overrides.
    pub fn load(file: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder();
        if let Some(path) = file {
            debug!(path = %path.display(), "Loading tracker configuration file");
            builder = builder.add_source(config::File::from(path));
        }
        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config: TrackerConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.key_prefix.trim().is_empty() {
            return Err(ConfigError::Invalid("key_prefix must not be empty".into()));
        }
        if self.max_list_len == 0 {
            return Err(ConfigError::Invalid("max_list_len must be positive".into()));
        }
        if self.store_timeout_ms == 0 {
            return Err(ConfigError::Invalid("store_timeout_ms must be positive".into()));
        }
        if self.read_retry.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "read_retry.max_attempts must be at least 1".into(),
            ));
        }
        if !self.read_retry.multiplier.is_finite() || self.read_retry.multiplier < 1.0 {
            return Err(ConfigError::Invalid(
                "read_retry.multiplier must be a finite number >= 1.0".into(),
            ));
        }
        Ok(())
    }

    pub fn record_ttl(&self) -> Option<Duration> {
        (self.record_ttl_secs > 0).then(|| Duration::from_secs(self.record_ttl_secs))
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }

    pub fn record_key(&self, task_id: &str) -> String {
        format!("{}:task:{}", self.key_prefix, task_id)
    }

    pub fn stage_key(&self, stage: Stage) -> String {
        format!("{}:stage:{}", self.key_prefix, stage.list_name())
    }

    pub fn snapshot_key(&self) -> String {
        format!("{}:status", self.key_prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::io::Write;

    #[test]
    fn defaults_are_valid() {
        let config = TrackerConfig::default();
        config.validate().unwrap();
        assert_eq!(config.record_ttl(), Some(Duration::from_secs(1800)));
        assert_eq!(config.store_timeout(), Duration::from_millis(500));
    }

    #[test]
    fn key_layout() {
        let config = TrackerConfig::default();
        assert_eq!(config.record_key("t1"), "querywatch:task:t1");
        assert_eq!(
            config.stage_key(Stage::InProgress),
            "querywatch:stage:in_progress"
        );
        assert_eq!(config.snapshot_key(), "querywatch:status");
    }

    #[test]
    fn zero_ttl_disables_expiry() {
        let config = TrackerConfig {
            record_ttl_secs: 0,
            ..TrackerConfig::default()
        };
        assert_eq!(config.record_ttl(), None);
    }

    #[test]
    fn rejects_zero_list_len() {
        let config = TrackerConfig {
            max_list_len: 0,
            ..TrackerConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[rstest]
    #[case::nan(f64::NAN)]
    #[case::infinite(f64::INFINITY)]
    #[case::shrinking(0.5)]
    fn rejects_unusable_retry_multiplier(#[case] multiplier: f64) {
        let mut config = TrackerConfig::default();
        config.read_retry.multiplier = multiplier;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn loads_partial_file_over_defaults() {
        let path = std::env::temp_dir().join(format!(
            "querywatch-config-{}.toml",
            std::process::id()
        ));
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "key_prefix = \"redash\"").unwrap();
        writeln!(file, "max_list_len = 25").unwrap();
        drop(file);

        let config = TrackerConfig::load(Some(&path)).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(config.key_prefix, "redash");
        assert_eq!(config.max_list_len, 25);
        assert_eq!(config.store_timeout_ms, 500);
    }
}
