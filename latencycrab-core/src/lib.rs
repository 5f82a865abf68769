//! # LatencyCrab Core
//!
//! Latency-bounded keyed count aggregation over a persistent keyed store.
//!
//! Every event bumps the running count of its key. With an allowed latency of
//! zero each event is a read-modify-write against the store; otherwise deltas
//! are buffered in memory and applied once per flush, trading result latency
//! for fewer store visits.
//!
//! - [`types`]: [`StreamElement`](types::StreamElement),
//!   [`StreamRecord`](types::StreamRecord) and the data/key trait bounds.
//! - [`aggregate`]: the [`KeyedCountAggregator`](aggregate::KeyedCountAggregator)
//!   operator, its bundle, strategy, flush trigger and metrics.
//! - [`state`]: the [`KeyedStore`](state::KeyedStore) trait and backends.
//! - [`runtime`]: channels, gates and the
//!   [`AggregationTask`](runtime::AggregationTask) event loop.
//! - [`config`]: [`AggregatorConfig`](config::AggregatorConfig), TOML loading.
//! - [`error`]: domain error types.

pub mod aggregate;
pub mod config;
pub mod error;
pub mod runtime;
pub mod state;
pub mod types;
