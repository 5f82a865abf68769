//! Aggregator configuration.
//!
//! Values come from a TOML file and/or the command line; the CLI applies its
//! flags on top of whatever the file provided, then calls
//! [`AggregatorConfig::validate`].
//!
//! ```toml
//! allowed_latency_ms = 10000
//! flush_interval_ms = 5000     # optional, defaults to allowed_latency_ms
//! data_num = 100000000
//! skip_malformed_keys = false
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Event count used by the benchmark harness when none is given.
pub const DEFAULT_DATA_NUM: u64 = 100_000_000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AggregatorConfig {
    /// Upper bound on how long a count may stay buffered; 0 disables buffering.
    pub allowed_latency_ms: u64,

    /// Period of the flush trigger. Defaults to `allowed_latency_ms` and may
    /// not exceed it.
    pub flush_interval_ms: Option<u64>,

    /// Total events for a benchmark run. Informational for the operator.
    pub data_num: u64,

    /// Skip records whose key cannot be selected instead of failing the task.
    pub skip_malformed_keys: bool,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            allowed_latency_ms: 0,
            flush_interval_ms: None,
            data_num: DEFAULT_DATA_NUM,
            skip_malformed_keys: false,
        }
    }
}

impl AggregatorConfig {
    /// Immediate mode.
    pub fn immediate() -> Self {
        Self::default()
    }

    /// Buffered mode with the given allowed latency.
    pub fn buffered(allowed_latency_ms: u64) -> Self {
        Self {
            allowed_latency_ms,
            ..Self::default()
        }
    }

    pub fn with_flush_interval_ms(mut self, flush_interval_ms: u64) -> Self {
        self.flush_interval_ms = Some(flush_interval_ms);
        self
    }

    pub fn with_skip_malformed_keys(mut self, skip: bool) -> Self {
        self.skip_malformed_keys = skip;
        self
    }

    pub fn allowed_latency(&self) -> Duration {
        Duration::from_millis(self.allowed_latency_ms)
    }

    /// Zero when buffering is disabled.
    ///
    /// An override outside `1..=allowed_latency_ms` falls back to the
    /// allowed latency, whether or not `validate` was called.
    pub fn flush_interval(&self) -> Duration {
        if self.allowed_latency_ms == 0 {
            return Duration::ZERO;
        }
        let interval_ms = self
            .flush_interval_ms
            .filter(|ms| (1..=self.allowed_latency_ms).contains(ms))
            .unwrap_or(self.allowed_latency_ms);
        Duration::from_millis(interval_ms)
    }

    pub fn is_buffered(&self) -> bool {
        self.allowed_latency_ms > 0
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        match (self.allowed_latency_ms, self.flush_interval_ms) {
            (0, Some(interval)) if interval > 0 => Err(ConfigError::Invalid(format!(
                "flush_interval_ms = {interval} has no effect with allowed_latency_ms = 0"
            ))),
            (latency, Some(0)) if latency > 0 => Err(ConfigError::Invalid(
                "flush_interval_ms must be positive when buffering is enabled".to_string(),
            )),
            (latency, Some(interval)) if interval > latency => Err(ConfigError::Invalid(format!(
                "flush_interval_ms = {interval} exceeds allowed_latency_ms = {latency}"
            ))),
            _ => Ok(()),
        }
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: AggregatorConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
