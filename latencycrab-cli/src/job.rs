//! Benchmark job: synthetic source -> keyed count aggregator -> counting sink.
//!
//! Each stage runs on its own thread, connected by bounded local channels.

use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use latencycrab_core::aggregate::{IdentityKey, KeyedCountAggregator, TracingReporter};
use latencycrab_core::config::AggregatorConfig;
use latencycrab_core::runtime::{
    local_channel, AggregationTask, InputGate, LocalChannelReceiver, LocalChannelSender,
    OutputGate, TaskReport,
};
use latencycrab_core::state::KeyedStore;
use latencycrab_core::types::{Count, StreamElement};
use tracing::{debug, info};

pub type Key = u64;

#[derive(Debug, Clone, Copy)]
pub struct JobOptions {
    pub key_cardinality: u64,
    pub channel_capacity: usize,
    pub report_metrics: bool,
}

#[derive(Debug)]
pub struct RunSummary {
    pub data_num: u64,
    pub duration: Duration,
    /// Records that reached the sink.
    pub sink_count: u64,
    pub task: TaskReport,
}

impl RunSummary {
    /// Events per millisecond.
    pub fn throughput(&self) -> u64 {
        let millis = self.duration.as_millis().max(1) as u64;
        self.data_num / millis
    }

    pub fn visits(&self) -> u64 {
        self.task.metrics.as_ref().map_or(0, |m| m.visits)
    }
}

/// Emits `data_num` keys cycling through `0..key_cardinality`, then `End`.
fn spawn_source(
    output: LocalChannelSender<Key>,
    data_num: u64,
    key_cardinality: u64,
) -> Result<JoinHandle<Result<()>>> {
    let handle = thread::Builder::new()
        .name("source".into())
        .spawn(move || {
            for i in 0..data_num {
                output.send(StreamElement::record(i % key_cardinality))?;
            }
            output.send(StreamElement::End)?;
            debug!(records = data_num, "source finished");
            Ok(())
        })?;
    Ok(handle)
}

/// Counts and discards everything the aggregator emits.
fn spawn_sink(input: LocalChannelReceiver<(Key, Count)>) -> Result<JoinHandle<Result<u64>>> {
    let handle = thread::Builder::new()
        .name("sink".into())
        .spawn(move || {
            let mut num_elements = 0u64;
            loop {
                match input.recv()? {
                    StreamElement::Record(_) => num_elements += 1,
                    StreamElement::Flush => {}
                    StreamElement::End => break,
                }
            }
            Ok(num_elements)
        })?;
    Ok(handle)
}

fn join<T>(handle: JoinHandle<Result<T>>, stage: &str) -> Result<T> {
    handle
        .join()
        .map_err(|_| anyhow!("{stage} thread panicked"))?
}

pub fn run_job<S>(config: &AggregatorConfig, store: S, options: JobOptions) -> Result<RunSummary>
where
    S: KeyedStore<Key> + 'static,
{
    let (source_tx, source_rx) = local_channel(options.channel_capacity);
    let (sink_tx, sink_rx) = local_channel(options.channel_capacity);

    let operator: KeyedCountAggregator<Key, _, _> =
        KeyedCountAggregator::new(IdentityKey, store, config);
    let mut task = AggregationTask::new(
        InputGate::new(vec![source_rx]),
        OutputGate::new(vec![sink_tx]),
        operator,
    )
    .with_skip_malformed_keys(config.skip_malformed_keys);
    if options.report_metrics {
        task = task.with_reporter(TracingReporter);
    }

    info!(
        data_num = config.data_num,
        key_cardinality = options.key_cardinality,
        allowed_latency_ms = config.allowed_latency_ms,
        flush_interval_ms = config.flush_interval().as_millis() as u64,
        "starting job"
    );

    let start = Instant::now();
    let sink = spawn_sink(sink_rx)?;
    let aggregator = thread::Builder::new()
        .name("aggregator".into())
        .spawn(move || task.run())?;
    let source = spawn_source(source_tx, config.data_num, options.key_cardinality)?;

    // The aggregator's error explains any follow-on source/sink failure.
    let task_report = join(aggregator, "aggregator")?;
    join(source, "source")?;
    let sink_count = join(sink, "sink")?;
    let duration = start.elapsed();

    Ok(RunSummary {
        data_num: config.data_num,
        duration,
        sink_count,
        task: task_report,
    })
}
