use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use latencycrab_core::config::AggregatorConfig;
use latencycrab_core::runtime::DEFAULT_CHANNEL_CAPACITY;

/// Allowed latency used by `run` when neither a config file nor a flag sets one.
pub const DEFAULT_ALLOWED_LATENCY_MS: u64 = 10_000;

#[derive(Parser, Debug)]
#[command(name = "latencycrab")]
#[command(about = "Latency-bounded keyed count aggregation benchmark", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Log level (trace, debug, info, warn, error). RUST_LOG takes precedence.
    #[arg(long, global = true, default_value = "info", env = "LATENCYCRAB_LOG_LEVEL")]
    pub log_level: String,

    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text, env = "LATENCYCRAB_LOG_FORMAT")]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Stream synthetic keys through the aggregator and report timing.
    Run(RunArgs),
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// TOML file with aggregator settings; flags override its values.
    #[arg(long, env = "LATENCYCRAB_CONFIG")]
    pub config: Option<PathBuf>,

    /// Number of events the source emits.
    #[arg(long, env = "LATENCYCRAB_DATA_NUM")]
    pub data_num: Option<u64>,

    /// How long a count may stay buffered; 0 updates the store on every event.
    #[arg(long, env = "LATENCYCRAB_ALLOWED_LATENCY_MS")]
    pub allowed_latency_ms: Option<u64>,

    /// Period of the flush trigger, at most the allowed latency.
    #[arg(long, env = "LATENCYCRAB_FLUSH_INTERVAL_MS")]
    pub flush_interval_ms: Option<u64>,

    /// Number of distinct keys the source cycles through.
    #[arg(long, default_value_t = 1000, value_parser = clap::value_parser!(u64).range(1..))]
    pub key_cardinality: u64,

    /// Skip records whose key cannot be selected.
    #[arg(long)]
    pub skip_malformed_keys: bool,

    #[arg(long, value_enum, default_value_t = StoreKind::Memory, env = "LATENCYCRAB_STORE")]
    pub store: StoreKind,

    /// RocksDB directory (only with `--store rocksdb`).
    #[arg(long, default_value = "latencycrab-db", env = "LATENCYCRAB_DB_PATH")]
    pub db_path: PathBuf,

    #[arg(long, default_value_t = DEFAULT_CHANNEL_CAPACITY)]
    pub channel_capacity: usize,

    /// Log a metrics snapshot after every flush.
    #[arg(long)]
    pub report_metrics: bool,
}

impl RunArgs {
    /// Config file (if any), then flags, then validation.
    pub fn resolve_config(&self) -> Result<AggregatorConfig> {
        let mut config = match &self.config {
            Some(path) => AggregatorConfig::from_toml_file(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => AggregatorConfig::buffered(DEFAULT_ALLOWED_LATENCY_MS),
        };

        if let Some(data_num) = self.data_num {
            config.data_num = data_num;
        }
        if let Some(allowed_latency_ms) = self.allowed_latency_ms {
            config.allowed_latency_ms = allowed_latency_ms;
        }
        if let Some(flush_interval_ms) = self.flush_interval_ms {
            config.flush_interval_ms = Some(flush_interval_ms);
        }
        if self.skip_malformed_keys {
            config.skip_malformed_keys = true;
        }

        config.validate()?;
        Ok(config)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StoreKind {
    /// In-memory store.
    Memory,
    /// Embedded RocksDB (requires the `rocksdb` feature).
    Rocksdb,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
    Compact,
}
