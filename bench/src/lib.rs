//! genread Read Benchmark Library
//!
//! Measures how fast a key-value store answers versioned lookups when many
//! threads read at once. Every lookup resolves an identifier under a primary
//! version and falls back to an older version when the primary record is
//! missing; the run reports hit distribution, throughput and latency
//! percentiles.
//!
//! ## Architecture
//!
//! - `types`: run configuration, per-lookup outcomes, statistics and errors
//! - `universe`: the shared, read-only pool of identifiers lookups sample from
//! - `resolver`: the primary/fallback lookup protocol
//! - `context`: cancellation flag and result sink shared by all workers
//! - `worker`: one thread's share of lookups
//! - `coordinator`: work partitioning, progress, cancellation and joining
//! - `stats`: pure reduction of outcomes to statistics
//! - `report`: human-readable summary through the logger
//! - `cli`: command-line definitions and scenario presets
//! - `utils`: statistics helpers, formatting and JSON export

use std::str::FromStr;

pub mod cli;
pub mod context;
pub mod coordinator;
pub mod report;
pub mod resolver;
pub mod stats;
pub mod types;
pub mod universe;
pub mod utils;
pub mod worker;

pub use context::{install_interrupt_handler, RunContext};
pub use coordinator::{partition, run_benchmark, Coordinator};
pub use resolver::VersionedResolver;
pub use types::{
    BenchmarkError, BenchmarkResult, LatencySummary, LookupOutcome, RunConfig, RunReport,
    RunStatistics,
};
pub use universe::KeyUniverse;

/// Initialize logging for the benchmark application
///
/// Info level unless `level` names another one; `RUST_LOG` still takes
/// precedence when set.
pub fn init_logging(level: Option<&str>) -> BenchmarkResult<()> {
    let filter = match level {
        Some(level) => log::LevelFilter::from_str(level).map_err(|_| {
            BenchmarkError::Configuration(format!("Unknown log level: {level}"))
        })?,
        None => log::LevelFilter::Info,
    };

    env_logger::builder()
        .filter_level(filter)
        .parse_default_env()
        .format_timestamp_millis()
        .format_module_path(false)
        .format_target(false)
        .try_init()
        .map_err(|e| {
            BenchmarkError::Initialization(format!("Failed to initialize logging: {}", e))
        })?;

    Ok(())
}
