//! Latency-bounded keyed count aggregation.
//!
//! - [`KeyedCountAggregator`]: per-event logic, flush and finish
//! - [`Strategy`] / [`AggregationMode`]: immediate vs. buffered, fixed at construction
//! - [`Bundle`]: pending per-key deltas in buffered mode
//! - [`FlushTrigger`]: processing-time deadline for periodic flushes
//! - [`MetricsSnapshot`] / [`VisitCounter`]: bundle size and store visits

mod bundle;
mod key;
mod metrics;
mod operator;
mod strategy;
mod trigger;

pub use bundle::*;
pub use key::*;
pub use metrics::*;
pub use operator::*;
pub use strategy::*;
pub use trigger::*;
