//! Single-threaded task that drives an aggregation operator.
//!
//! # Task Execution Loop
//!
//! ```text
//! operator.open(now)
//! loop {
//!     element = input_gate.next_timeout(poll_interval)
//!     match element {
//!         None        => operator.on_processing_time(now)   // idle tick
//!         Record(rec) => operator.process_batch([rec])
//!                        operator.on_processing_time(now)   // busy tick
//!         Flush       => operator.flush(now)
//!         End         => operator.finish() -> broadcast(End) -> break
//!     }
//!     outputs -> output_gate.forward()
//! }
//! ```
//!
//! Everything the operator does happens on this loop, so a flush never runs
//! concurrently with the processing of a record. The deadline is checked
//! after every record as well as on idle timeouts; a saturated input would
//! otherwise never let the timed poll expire.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::clock::{Clock, SystemClock};
use super::input_gate::InputGate;
use super::operator::Operator;
use super::output_gate::OutputGate;
use crate::aggregate::{MetricsReporter, MetricsSnapshot};
use crate::error::AggregationError;
use crate::types::StreamElement;

/// Summary of a completed task run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskReport {
    /// Records received from the input gate.
    pub records_in: u64,
    /// Records forwarded downstream.
    pub records_out: u64,
    /// Records dropped because their key could not be selected.
    pub skipped: u64,
    /// `Flush` elements received.
    pub flush_requests: u64,
    /// Operator metrics after finish.
    pub metrics: Option<MetricsSnapshot>,
}

pub struct AggregationTask<IN, Op, C = SystemClock>
where
    Op: Operator<IN>,
{
    input_gate: InputGate<IN>,
    output_gate: OutputGate<Op::OUT>,
    operator: Op,
    clock: C,
    skip_malformed_keys: bool,
    reporter: Option<Box<dyn MetricsReporter>>,
    report: TaskReport,
}

impl<IN, Op> AggregationTask<IN, Op, SystemClock>
where
    Op: Operator<IN>,
{
    pub fn new(input_gate: InputGate<IN>, output_gate: OutputGate<Op::OUT>, operator: Op) -> Self {
        Self {
            input_gate,
            output_gate,
            operator,
            clock: SystemClock,
            skip_malformed_keys: false,
            reporter: None,
            report: TaskReport::default(),
        }
    }
}

impl<IN, Op, C> AggregationTask<IN, Op, C>
where
    Op: Operator<IN>,
    Op::OUT: Clone,
    C: Clock,
{
    /// Replace the processing-time source.
    pub fn with_clock<C2: Clock>(self, clock: C2) -> AggregationTask<IN, Op, C2> {
        AggregationTask {
            input_gate: self.input_gate,
            output_gate: self.output_gate,
            operator: self.operator,
            clock,
            skip_malformed_keys: self.skip_malformed_keys,
            reporter: self.reporter,
            report: self.report,
        }
    }

    /// Drop records whose key cannot be selected instead of failing the task.
    pub fn with_skip_malformed_keys(mut self, skip: bool) -> Self {
        self.skip_malformed_keys = skip;
        self
    }

    /// Receive a metrics snapshot after every flush and at finish.
    pub fn with_reporter(mut self, reporter: impl MetricsReporter + 'static) -> Self {
        self.reporter = Some(Box::new(reporter));
        self
    }

    pub fn operator(&self) -> &Op {
        &self.operator
    }

    pub fn into_operator(self) -> Op {
        self.operator
    }

    /// Run the task event loop until `End` arrives from every input channel.
    pub fn run(&mut self) -> Result<TaskReport> {
        let mut input_batch = Vec::with_capacity(1);
        let mut output_batch = Vec::new();

        self.operator.open(self.clock.now())?;
        let poll_interval = self.operator.poll_interval();
        info!(
            inputs = self.input_gate.num_channels(),
            poll_interval_ms = poll_interval.map(|d| d.as_millis() as u64),
            skip_malformed_keys = self.skip_malformed_keys,
            "aggregation task started"
        );

        loop {
            let next = match poll_interval {
                Some(interval) => self.input_gate.next_timeout(interval)?,
                None => Some(self.input_gate.next()?),
            };

            let Some((_, element)) = next else {
                self.on_processing_time(&mut output_batch)?;
                continue;
            };

            match element {
                StreamElement::Record(record) => {
                    self.report.records_in += 1;
                    input_batch.clear();
                    input_batch.push(record.value);

                    output_batch.clear();
                    let result = self.operator.process_batch(&input_batch, &mut output_batch);
                    self.emit(&mut output_batch)?;
                    if let Err(err) = result {
                        self.on_record_error(err)?;
                    }

                    if poll_interval.is_some() {
                        self.on_processing_time(&mut output_batch)?;
                    }
                }

                StreamElement::Flush => {
                    self.report.flush_requests += 1;
                    output_batch.clear();
                    let result = self.operator.flush(self.clock.now(), &mut output_batch);
                    self.emit(&mut output_batch)?;
                    let applied = result.context("requested flush failed")?;
                    debug!(keys = applied, "flush request handled");
                    self.report_metrics();
                }

                StreamElement::End => {
                    output_batch.clear();
                    let result = self.operator.finish(&mut output_batch);
                    self.emit(&mut output_batch)?;
                    result.context("final flush failed")?;
                    self.report_metrics();
                    self.output_gate.broadcast(StreamElement::End)?;
                    break;
                }
            }
        }

        self.report.metrics = self.operator.metrics();
        info!(
            records_in = self.report.records_in,
            records_out = self.report.records_out,
            skipped = self.report.skipped,
            flush_requests = self.report.flush_requests,
            "aggregation task finished"
        );
        Ok(self.report.clone())
    }

    fn on_processing_time(&mut self, output_batch: &mut Vec<Op::OUT>) -> Result<()> {
        output_batch.clear();
        let result = self
            .operator
            .on_processing_time(self.clock.now(), output_batch);
        // Keys applied before a failed drain are already in the store.
        self.emit(output_batch)?;
        if result.context("periodic flush failed")? {
            self.report_metrics();
        }
        Ok(())
    }

    fn on_record_error(&mut self, err: anyhow::Error) -> Result<()> {
        let recoverable = err
            .downcast_ref::<AggregationError>()
            .is_some_and(|err| !err.is_fatal());

        if recoverable && self.skip_malformed_keys {
            self.report.skipped += 1;
            warn!(error = %err, skipped = self.report.skipped, "skipping record");
            return Ok(());
        }
        Err(err.context(format!(
            "failed to process record #{}",
            self.report.records_in
        )))
    }

    fn emit(&mut self, output_batch: &mut Vec<Op::OUT>) -> Result<()> {
        for output in output_batch.drain(..) {
            self.output_gate.forward(StreamElement::record(output))?;
            self.report.records_out += 1;
        }
        Ok(())
    }

    fn report_metrics(&mut self) {
        if let (Some(reporter), Some(snapshot)) = (self.reporter.as_mut(), self.operator.metrics())
        {
            reporter.report(&snapshot);
        }
    }
}

#[cfg(test)]
#[path = "tests/task_tests.rs"]
mod tests;
