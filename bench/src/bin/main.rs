//! genread Read Benchmark Utility
//!
//! Runs concurrent primary/fallback lookups against a key-value store and
//! reports hit distribution, throughput and latency percentiles.
//!
//! ## Usage
//!
//! ### Canned scenario against a local store
//! ```bash
//! cargo run --bin bench -- run --scenario medium
//! ```
//!
//! ### Custom run with explicit versions and JSON output
//! ```bash
//! cargo run --bin bench -- run --scenario custom --reads 50000 --threads 16 \
//!     --primary v23 --fallback v22 --output results.json
//! ```
//!
//! ### Dry run without a store
//! ```bash
//! cargo run --bin bench -- run --memory
//! ```
//!
//! Press Ctrl-C during a run to stop early; the report covers the lookups
//! completed so far.

use std::{path::Path, sync::Arc};

use bench::{
    cli::{BenchCommand, Cli, RunArgs},
    init_logging, install_interrupt_handler,
    report::print_report,
    utils::save_json_results,
    BenchmarkError, BenchmarkResult, Coordinator, KeyUniverse, RunContext,
};
use clap::Parser;
use log::{error, info};
use store::{AppConfig, MemoryStore, RespStore, StoreClient};

fn main() -> BenchmarkResult<()> {
    // Parse command line arguments
    let cli = Cli::parse();

    let result = match cli.command {
        BenchCommand::Run(args) => run(&args),
        BenchCommand::InitConfig { path } => init_config(&path),
    };

    // Handle any errors that occurred during benchmarking
    if let Err(ref e) = result {
        // No-op when logging is already up
        let _ = init_logging(None);
        error!("Benchmark failed: {e}");

        // Print additional context for common error types
        match e {
            BenchmarkError::Configuration(_) | BenchmarkError::General(_) => {
                error!("Please check your configuration file, GENREAD_* variables and flags");
            }
            BenchmarkError::Store(_) => {
                error!("Please ensure the store is running and reachable, or use --memory");
            }
            BenchmarkError::EmptyUniverse => {
                error!("Please check the configured network blocks and --pool-size");
            }
            _ => {}
        }

        std::process::exit(1);
    }

    Ok(())
}

fn run(args: &RunArgs) -> BenchmarkResult<()> {
    let config = AppConfig::load(args.config.as_deref());
    // Logging honours the configured level, so it waits for the config
    init_logging(config.as_ref().ok().map(|c| c.log_level.as_str()))?;
    let mut config = config?;

    info!("Starting genread read benchmark");

    args.apply_to(&mut config);
    config.validate()?;
    let run_config = args.run_config(&config.reader)?;

    let ids = store::load_universe(
        &config.network.blocks,
        config.reader.pool_size,
        &mut rand::rng(),
    )?;
    info!(
        "Loaded {} identifiers from {} network blocks",
        ids.len(),
        config.network.blocks.len()
    );

    let store: Arc<dyn StoreClient> = if args.memory {
        info!("Using in-memory store (dry run)");
        Arc::new(MemoryStore::seeded(
            &ids,
            &run_config.primary_version,
            &run_config.fallback_version,
        ))
    } else {
        let store = RespStore::connect(&config.store)?;
        info!("Connected to store at {}", store.addr());
        Arc::new(store)
    };
    let universe = KeyUniverse::new(ids)?;

    let ctx = Arc::new(RunContext::new());
    install_interrupt_handler(&ctx)?;

    let report = Coordinator::new(run_config, universe, store)?
        .with_context(ctx)
        .run()?;
    print_report(&report);

    if let Some(output) = &args.output {
        save_json_results(&report, output)?;
    }

    info!("genread read benchmark completed");
    Ok(())
}

fn init_config(path: &Path) -> BenchmarkResult<()> {
    init_logging(None)?;

    AppConfig::default().save_to_file(path)?;
    info!("Default configuration written to {}", path.display());
    Ok(())
}
