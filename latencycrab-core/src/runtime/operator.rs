//! Operator interface driven by [`AggregationTask`](super::AggregationTask).
//!
//! Operators are push-based: the task hands in a batch of input values and
//! a reusable output buffer. Time never advances inside an operator; the
//! task passes the current processing time into every call that needs it.

use std::time::Duration;

use anyhow::Result;

use crate::aggregate::{KeyedCountAggregator, KeySelector, MetricsSnapshot};
use crate::state::KeyedStore;
use crate::types::{Count, ProcessingTime};

pub trait Operator<IN>: Send {
    /// Output type of this operator.
    type OUT: Send;

    /// Called once before the first input.
    fn open(&mut self, _now: ProcessingTime) -> Result<()> {
        Ok(())
    }

    /// Process a batch of input records, pushing outputs to the provided buffer.
    ///
    /// The output buffer is reused across batches (caller clears it).
    fn process_batch(&mut self, input: &[IN], output: &mut Vec<Self::OUT>) -> Result<()>;

    /// Processing time advanced to `now`. Returns whether a flush ran.
    fn on_processing_time(
        &mut self,
        _now: ProcessingTime,
        _output: &mut Vec<Self::OUT>,
    ) -> Result<bool> {
        Ok(false)
    }

    /// Explicit flush request. Returns the number of keys applied.
    fn flush(&mut self, _now: ProcessingTime, _output: &mut Vec<Self::OUT>) -> Result<usize> {
        Ok(0)
    }

    /// End of input; emit anything still held back.
    fn finish(&mut self, _output: &mut Vec<Self::OUT>) -> Result<()> {
        Ok(())
    }

    /// Upper bound on how long the task may wait for input before calling
    /// [`on_processing_time`](Self::on_processing_time). `None` disables ticks.
    fn poll_interval(&self) -> Option<Duration> {
        None
    }

    fn metrics(&self) -> Option<MetricsSnapshot> {
        None
    }
}

impl<IN, F, S> Operator<IN> for KeyedCountAggregator<IN, F, S>
where
    F: KeySelector<IN>,
    S: KeyedStore<F::Key>,
{
    type OUT = (F::Key, Count);

    fn open(&mut self, now: ProcessingTime) -> Result<()> {
        KeyedCountAggregator::open(self, now)?;
        Ok(())
    }

    fn process_batch(&mut self, input: &[IN], output: &mut Vec<Self::OUT>) -> Result<()> {
        for value in input {
            self.process_element(value, output)?;
        }
        Ok(())
    }

    fn on_processing_time(
        &mut self,
        now: ProcessingTime,
        output: &mut Vec<Self::OUT>,
    ) -> Result<bool> {
        Ok(KeyedCountAggregator::on_processing_time(self, now, output)?)
    }

    fn flush(&mut self, now: ProcessingTime, output: &mut Vec<Self::OUT>) -> Result<usize> {
        Ok(KeyedCountAggregator::flush(self, now, output)?)
    }

    fn finish(&mut self, output: &mut Vec<Self::OUT>) -> Result<()> {
        KeyedCountAggregator::finish(self, output)?;
        Ok(())
    }

    fn poll_interval(&self) -> Option<Duration> {
        self.trigger().poll_interval()
    }

    fn metrics(&self) -> Option<MetricsSnapshot> {
        Some(KeyedCountAggregator::metrics(self))
    }
}
