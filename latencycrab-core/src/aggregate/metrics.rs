//! Metrics surface for the aggregator.
//!
//! The operator does not register gauges that capture its own state.
//! Collectors call [`KeyedCountAggregator::metrics`](super::KeyedCountAggregator::metrics)
//! (or the individual accessors) on the thread that owns the operator, and
//! get back a plain [`MetricsSnapshot`].

use serde::{Deserialize, Serialize};
use tracing::info;

use super::strategy::AggregationMode;
use crate::error::StoreOp;

/// Monotonic count of store accesses.
///
/// A read-modify-write of one key is two visits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisitCounter {
    reads: u64,
    writes: u64,
}

impl VisitCounter {
    pub fn record(&mut self, op: StoreOp) {
        match op {
            StoreOp::Get => self.reads += 1,
            StoreOp::Put => self.writes += 1,
        }
    }

    pub fn reads(&self) -> u64 {
        self.reads
    }

    pub fn writes(&self) -> u64 {
        self.writes
    }

    /// Reads plus writes.
    pub fn total(&self) -> u64 {
        self.reads + self.writes
    }
}

/// Point-in-time view of the operator's observable counters.
///
/// Fields are read one after another; they are not an atomic snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub mode: AggregationMode,
    /// Distinct keys currently buffered.
    pub bundle_size: usize,
    /// Cumulative store accesses.
    pub visits: u64,
    pub records_in: u64,
    pub records_out: u64,
    /// Flushes that applied at least one key.
    pub flushes: u64,
}

/// Receives snapshots polled by the task loop.
pub trait MetricsReporter: Send {
    fn report(&mut self, snapshot: &MetricsSnapshot);
}

impl<F> MetricsReporter for F
where
    F: FnMut(&MetricsSnapshot) + Send,
{
    fn report(&mut self, snapshot: &MetricsSnapshot) {
        self(snapshot)
    }
}

/// Reporter that emits each snapshot as a structured `tracing` event.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl MetricsReporter for TracingReporter {
    fn report(&mut self, snapshot: &MetricsSnapshot) {
        info!(
            mode = %snapshot.mode,
            bundle_size = snapshot.bundle_size,
            visits = snapshot.visits,
            records_in = snapshot.records_in,
            records_out = snapshot.records_out,
            flushes = snapshot.flushes,
            "aggregator metrics"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_visit_counter_counts_each_access() {
        let mut visits = VisitCounter::default();
        visits.record(StoreOp::Get);
        visits.record(StoreOp::Put);
        visits.record(StoreOp::Get);

        assert_eq!(visits.reads(), 2);
        assert_eq!(visits.writes(), 1);
        assert_eq!(visits.total(), 3);
    }

    #[test]
    fn test_closure_reporter() {
        let mut seen = Vec::new();
        {
            let mut reporter = |s: &MetricsSnapshot| seen.push(s.visits);
            let snapshot = MetricsSnapshot {
                mode: AggregationMode::Immediate,
                bundle_size: 0,
                visits: 4,
                records_in: 2,
                records_out: 2,
                flushes: 0,
            };
            reporter.report(&snapshot);
        }
        assert_eq!(seen, vec![4]);
    }
}
