mod cli;
mod job;
mod logging;

use anyhow::Result;
use clap::Parser;
use latencycrab_core::state::{HashMapStore, KeyedStore};

use crate::cli::{Cli, Commands, RunArgs, StoreKind};
use crate::job::{run_job, JobOptions, Key};

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_logging(&cli.log_level, cli.log_format)?;

    match cli.command {
        Commands::Run(args) => run(args),
    }
}

fn run(args: RunArgs) -> Result<()> {
    let config = args.resolve_config()?;
    let store = open_store(&args)?;

    println!("Number of records: {}", config.data_num);
    let summary = run_job(
        &config,
        store,
        JobOptions {
            key_cardinality: args.key_cardinality,
            channel_capacity: args.channel_capacity,
            report_metrics: args.report_metrics,
        },
    )?;

    println!("Duration: {}", summary.duration.as_millis());
    println!("Throughput: {}", summary.throughput());
    println!("Store visits: {}", summary.visits());
    println!("numElements: {}", summary.sink_count);
    if summary.task.skipped > 0 {
        println!("Skipped records: {}", summary.task.skipped);
    }
    Ok(())
}

fn open_store(args: &RunArgs) -> Result<Box<dyn KeyedStore<Key>>> {
    match args.store {
        StoreKind::Memory => Ok(Box::new(HashMapStore::new())),
        #[cfg(feature = "rocksdb")]
        StoreKind::Rocksdb => Ok(Box::new(latencycrab_core::state::RocksDbStore::open(
            &args.db_path,
        )?)),
        #[cfg(not(feature = "rocksdb"))]
        StoreKind::Rocksdb => anyhow::bail!(
            "--store rocksdb needs a build with the `rocksdb` feature (db path {})",
            args.db_path.display()
        ),
    }
}
