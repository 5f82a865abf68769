//! The keyed count aggregator.
//!
//! ```text
//! Created --open--> Opened --record--> Processing <--> Flushing
//!                                           |
//!                          finish (forced flush) --> Finished
//!
//! any fatal error --> Failed
//! ```

use std::fmt;
use std::marker::PhantomData;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use super::key::KeySelector;
use super::metrics::{MetricsSnapshot, VisitCounter};
use super::strategy::{AggregationMode, Strategy};
use super::trigger::FlushTrigger;
use crate::config::AggregatorConfig;
use crate::error::{AggregationError, AggregationResult};
use crate::state::KeyedStore;
use crate::types::{Count, ProcessingTime};

/// Every event contributes this much to its key's count.
pub const EVENT_DELTA: Count = 1;

/// Lifecycle state of a [`KeyedCountAggregator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperatorState {
    Created,
    Opened,
    Processing,
    Flushing,
    Finished,
    /// A store or integrity error stopped the operator.
    Failed,
}

impl fmt::Display for OperatorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OperatorState::Created => "created",
            OperatorState::Opened => "opened",
            OperatorState::Processing => "processing",
            OperatorState::Flushing => "flushing",
            OperatorState::Finished => "finished",
            OperatorState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Keeps a running count per key in a [`KeyedStore`], either updating the
/// store on every event or buffering deltas in a bundle until the next flush.
///
/// The mode comes from the allowed latency at construction and never
/// changes. Emissions are `(key, new_cumulative_count)` pairs pushed to the
/// caller's output buffer.
///
/// All methods take `&mut self`: the owner serializes flushes against input
/// processing simply by holding the operator on one thread.
pub struct KeyedCountAggregator<IN, F, S>
where
    F: KeySelector<IN>,
    S: KeyedStore<F::Key>,
{
    key_selector: F,
    store: S,
    strategy: Strategy<F::Key>,
    trigger: FlushTrigger,
    state: OperatorState,
    visits: VisitCounter,
    records_in: u64,
    records_out: u64,
    flushes: u64,
    _phantom: PhantomData<fn(&IN)>,
}

impl<IN, F, S> KeyedCountAggregator<IN, F, S>
where
    F: KeySelector<IN>,
    S: KeyedStore<F::Key>,
{
    /// Build an aggregator; buffering is enabled when `allowed_latency > 0`,
    /// and the flush period is the configured flush interval.
    pub fn new(key_selector: F, store: S, config: &AggregatorConfig) -> Self {
        let mode = AggregationMode::from_allowed_latency(config.allowed_latency());
        let trigger = match mode {
            AggregationMode::Immediate => FlushTrigger::Disabled,
            AggregationMode::Buffered { .. } => FlushTrigger::periodic(config.flush_interval()),
        };
        Self::with_parts(key_selector, store, mode, trigger)
    }

    /// Build an aggregator with an explicit mode and trigger.
    pub fn with_parts(
        key_selector: F,
        store: S,
        mode: AggregationMode,
        trigger: FlushTrigger,
    ) -> Self {
        Self {
            key_selector,
            store,
            strategy: Strategy::new(mode),
            trigger,
            state: OperatorState::Created,
            visits: VisitCounter::default(),
            records_in: 0,
            records_out: 0,
            flushes: 0,
            _phantom: PhantomData,
        }
    }

    /// Prepare for input: empty bundle, zero visits, first flush deadline.
    pub fn open(&mut self, now: ProcessingTime) -> AggregationResult<()> {
        self.expect_state(&[OperatorState::Created], "open")?;
        self.visits = VisitCounter::default();
        self.trigger.reset(now);
        self.state = OperatorState::Opened;
        info!(mode = %self.mode(), flush_due = ?self.trigger.next_due(), "aggregator opened");
        Ok(())
    }

    /// Apply one input record.
    ///
    /// A key selection failure rejects only this record; bundle and store are
    /// untouched and the operator keeps running.
    pub fn process_element(
        &mut self,
        value: &IN,
        output: &mut Vec<(F::Key, Count)>,
    ) -> AggregationResult<()> {
        self.expect_state(
            &[OperatorState::Opened, OperatorState::Processing],
            "process element",
        )?;
        self.state = OperatorState::Processing;

        let key = self.key_selector.get_key(value)?;
        let before = output.len();
        let result = self.strategy.on_element(
            key,
            EVENT_DELTA,
            &mut self.store,
            &mut self.visits,
            output,
        );
        self.records_in += 1;
        self.records_out += (output.len() - before) as u64;
        result.map_err(|err| self.fail(err))
    }

    /// Drain the bundle into the store if the flush deadline has passed.
    ///
    /// Returns whether a flush ran.
    pub fn on_processing_time(
        &mut self,
        now: ProcessingTime,
        output: &mut Vec<(F::Key, Count)>,
    ) -> AggregationResult<bool> {
        if !self.trigger.is_due(now) {
            return Ok(false);
        }
        self.flush(now, output)?;
        Ok(true)
    }

    /// Drain every buffered delta into the store and emit the new counts.
    ///
    /// A flush over an empty bundle touches nothing. Returns the number of
    /// keys applied.
    pub fn flush(
        &mut self,
        now: ProcessingTime,
        output: &mut Vec<(F::Key, Count)>,
    ) -> AggregationResult<usize> {
        self.expect_state(&[OperatorState::Opened, OperatorState::Processing], "flush")?;
        let applied = self.drain(output)?;
        self.trigger.reset(now);
        Ok(applied)
    }

    /// Force a final flush, report visits and release the bundle.
    pub fn finish(
        &mut self,
        output: &mut Vec<(F::Key, Count)>,
    ) -> AggregationResult<MetricsSnapshot> {
        self.expect_state(&[OperatorState::Opened, OperatorState::Processing], "finish")?;
        self.drain(output)?;

        let snapshot = self.metrics();
        info!(
            visits = snapshot.visits,
            records_in = snapshot.records_in,
            records_out = snapshot.records_out,
            flushes = snapshot.flushes,
            "aggregator finished"
        );
        self.strategy = Strategy::new(self.strategy.mode());
        self.state = OperatorState::Finished;
        Ok(snapshot)
    }

    fn drain(&mut self, output: &mut Vec<(F::Key, Count)>) -> AggregationResult<usize> {
        let pending = self.strategy.bundle_size();
        if pending == 0 {
            return Ok(0);
        }

        let previous = self.state;
        self.state = OperatorState::Flushing;
        let before = output.len();
        let result = self
            .strategy
            .drain(&mut self.store, &mut self.visits, output);
        self.records_out += (output.len() - before) as u64;

        match result {
            Ok(applied) => {
                self.flushes += 1;
                self.state = match previous {
                    OperatorState::Opened => OperatorState::Opened,
                    _ => OperatorState::Processing,
                };
                debug!(keys = applied, visits = self.visits.total(), "bundle drained");
                Ok(applied)
            }
            Err(err) => Err(self.fail(err)),
        }
    }

    fn fail(&mut self, err: AggregationError) -> AggregationError {
        if err.is_fatal() {
            error!(error = %err, bundle_size = self.bundle_size(), "aggregator failed");
            self.state = OperatorState::Failed;
        }
        err
    }

    fn expect_state(
        &self,
        allowed: &[OperatorState],
        action: &'static str,
    ) -> AggregationResult<()> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(AggregationError::InvalidState {
                state: self.state,
                action,
            })
        }
    }

    // ========== Metrics surface ==========

    /// Distinct keys currently buffered.
    pub fn bundle_size(&self) -> usize {
        self.strategy.bundle_size()
    }

    /// Cumulative store accesses (each get and each put counts once).
    pub fn visits(&self) -> u64 {
        self.visits.total()
    }

    pub fn visit_counter(&self) -> VisitCounter {
        self.visits
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            mode: self.mode(),
            bundle_size: self.bundle_size(),
            visits: self.visits(),
            records_in: self.records_in,
            records_out: self.records_out,
            flushes: self.flushes,
        }
    }

    // ========== Accessors ==========

    pub fn mode(&self) -> AggregationMode {
        self.strategy.mode()
    }

    pub fn state(&self) -> OperatorState {
        self.state
    }

    /// Pending delta for `key`; `None` when nothing is buffered for it.
    pub fn pending(&self, key: &F::Key) -> Option<Count> {
        self.strategy.bundle().and_then(|bundle| bundle.get(key))
    }

    pub fn trigger(&self) -> &FlushTrigger {
        &self.trigger
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Hand the store back, e.g. after `finish`.
    pub fn into_store(self) -> S {
        self.store
    }
}

#[cfg(test)]
#[path = "tests/operator_tests.rs"]
mod tests;
