//! Run coordinator
//!
//! Splits the requested lookups across worker threads, reports progress
//! while they run, honours cancellation, joins them with a bounded wait and
//! hands whatever was collected to the stats aggregator.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use bench::{coordinator::run_benchmark, types::RunConfig, universe::KeyUniverse};
//! use store::MemoryStore;
//!
//! let universe = KeyUniverse::new(vec!["1.1.1.1".to_string()])?;
//! let config = RunConfig::new(10_000, 4, "v23", "v22");
//! let report = run_benchmark(&config, universe, Arc::new(MemoryStore::new()))?;
//! println!("{} reads/sec", report.stats.reads_per_second);
//! # Ok::<(), bench::BenchmarkError>(())
//! ```

use std::{
    sync::Arc,
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use log::{error, info, warn};
use store::StoreClient;

use crate::{
    context::RunContext,
    resolver::VersionedResolver,
    stats::summarize,
    types::{BenchmarkError, BenchmarkResult, RunConfig, RunReport},
    universe::KeyUniverse,
    worker::Worker,
};

/// Granularity of the liveness/progress polling loop
const POLL_TICK: Duration = Duration::from_millis(100);

/// Granularity of the bounded join wait
const JOIN_TICK: Duration = Duration::from_millis(10);

/// Per-worker lookup counts
///
/// The first `total % workers` workers get one extra lookup, so the counts
/// sum to `total_operations` and differ by at most one.
#[must_use]
pub fn partition(total_operations: u64, worker_count: usize) -> Vec<u64> {
    if worker_count == 0 {
        return Vec::new();
    }
    let workers = worker_count as u64;
    let base = total_operations / workers;
    let remainder = total_operations % workers;

    (0..workers)
        .map(|i| base + u64::from(i < remainder))
        .collect()
}

pub struct Coordinator {
    config: RunConfig,
    universe: KeyUniverse,
    store: Arc<dyn StoreClient>,
    ctx: Arc<RunContext>,
}

impl Coordinator {
    /// Validates `config` up front; nothing is started on error
    pub fn new(
        config: RunConfig,
        universe: KeyUniverse,
        store: Arc<dyn StoreClient>,
    ) -> BenchmarkResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            universe,
            store,
            ctx: Arc::new(RunContext::new()),
        })
    }

    /// Uses `ctx` (e.g. one wired to an interrupt handler) instead of a fresh one
    #[must_use]
    pub fn with_context(mut self, ctx: Arc<RunContext>) -> Self {
        self.ctx = ctx;
        self
    }

    #[must_use]
    pub fn context(&self) -> Arc<RunContext> {
        Arc::clone(&self.ctx)
    }

    /// Runs the benchmark to completion or until stopped
    ///
    /// # Errors
    ///
    /// Fails only if a worker thread cannot be spawned or the result sink is
    /// poisoned; an interrupt or a worker missing its join deadline still
    /// yields a report over the partial results.
    pub fn run(self) -> BenchmarkResult<RunReport> {
        let config = &self.config;
        let ctx = &self.ctx;

        info!(
            "Starting read benchmark: {} lookups, {} workers, primary {}, fallback {}, batch size {}",
            config.total_operations,
            config.worker_count,
            config.primary_version,
            config.fallback_version,
            config.batch_size
        );
        info!("Key universe: {} identifiers", self.universe.len());

        let timestamp = chrono::Utc::now().to_rfc3339();
        let resolver = Arc::new(VersionedResolver::from_config(
            Arc::clone(&self.store),
            config,
        ));
        let worker = Worker::new(
            self.universe.clone(),
            resolver,
            Arc::clone(ctx),
            config.batch_size,
        );

        let start = Instant::now();
        let handles = self.spawn_workers(&worker)?;
        self.monitor(&handles, start);
        let abandoned_workers = self.join_workers(handles);

        let total_time = start.elapsed();
        let outcomes = ctx.snapshot()?;
        let stats = summarize(
            &outcomes,
            total_time,
            &config.primary_version,
            &config.fallback_version,
        );

        let completed_fully = stats.total_reads == config.total_operations;
        if !completed_fully {
            warn!(
                "Run stopped early: {} of {} lookups performed",
                stats.total_reads, config.total_operations
            );
        }

        Ok(RunReport {
            timestamp,
            config: self.config.clone(),
            completed_fully,
            abandoned_workers,
            stats,
        })
    }

    fn spawn_workers(&self, worker: &Worker) -> BenchmarkResult<Vec<JoinHandle<()>>> {
        let counts = partition(self.config.total_operations, self.config.worker_count);
        let mut handles = Vec::with_capacity(counts.len());

        for (i, count) in counts.into_iter().enumerate() {
            let worker_id = i + 1;
            let worker = worker.clone();
            let spawned = thread::Builder::new()
                .name(format!("reader-{worker_id}"))
                .spawn(move || worker.run(worker_id, count));

            match spawned {
                Ok(handle) => handles.push(handle),
                Err(e) => {
                    self.ctx.stop();
                    return Err(BenchmarkError::Initialization(format!(
                        "Failed to spawn worker {worker_id}: {e}"
                    )));
                }
            }
        }

        Ok(handles)
    }

    /// Polls until every worker has finished or a stop is requested
    fn monitor(&self, handles: &[JoinHandle<()>], start: Instant) {
        let interval = self.config.progress_interval;
        let total = self.config.total_operations;
        let mut last_report = Instant::now();

        while self.ctx.is_running() && handles.iter().any(|h| !h.is_finished()) {
            thread::sleep(POLL_TICK.min(interval));

            if last_report.elapsed() >= interval {
                let completed = self.ctx.completed() as u64;
                let elapsed = start.elapsed().as_secs_f64();
                let rate = if elapsed > 0.0 {
                    completed as f64 / elapsed
                } else {
                    0.0
                };
                info!(
                    "Progress: {}/{} ({:.1}%) | Rate: {:.0} reads/sec",
                    completed,
                    total,
                    completed as f64 / total as f64 * 100.0,
                    rate
                );
                last_report = Instant::now();
            }
        }

        if !self.ctx.is_running() {
            info!("Stop requested, waiting for workers to finish their current lookup");
        }
    }

    /// Joins each worker within `join_timeout`; returns how many were abandoned
    fn join_workers(&self, handles: Vec<JoinHandle<()>>) -> usize {
        let mut abandoned = 0;

        for (i, handle) in handles.into_iter().enumerate() {
            let worker_id = i + 1;
            let deadline = Instant::now() + self.config.join_timeout;
            while !handle.is_finished() && Instant::now() < deadline {
                thread::sleep(JOIN_TICK);
            }

            if handle.is_finished() {
                if let Err(e) = handle.join() {
                    error!("Worker {worker_id} panicked: {e:?}");
                }
            } else {
                warn!(
                    "Worker {worker_id} did not finish within {:?}, abandoning it",
                    self.config.join_timeout
                );
                abandoned += 1;
            }
        }

        abandoned
    }
}

/// Validates `config`, runs the benchmark and returns its report
pub fn run_benchmark(
    config: &RunConfig,
    universe: KeyUniverse,
    store: Arc<dyn StoreClient>,
) -> BenchmarkResult<RunReport> {
    Coordinator::new(config.clone(), universe, store)?.run()
}

#[cfg(test)]
mod tests {
    use store::MemoryStore;

    use super::*;

    #[test]
    fn test_partition_exact() {
        for total in 1..=200u64 {
            for workers in 1..=17usize {
                let counts = partition(total, workers);
                assert_eq!(counts.len(), workers);
                assert_eq!(counts.iter().sum::<u64>(), total);

                let max = counts.iter().max().unwrap();
                let min = counts.iter().min().unwrap();
                assert!(max - min <= 1, "total={total} workers={workers}");
            }
        }
    }

    #[test]
    fn test_partition_front_loads_remainder() {
        assert_eq!(partition(10, 4), vec![3, 3, 2, 2]);
        assert_eq!(partition(3, 5), vec![1, 1, 1, 0, 0]);
        assert_eq!(partition(8, 2), vec![4, 4]);
    }

    #[test]
    fn test_invalid_config_rejected_before_start() {
        let store = Arc::new(MemoryStore::new());
        let universe = KeyUniverse::new(vec!["1.1.1.1".to_string()]).unwrap();

        let config = RunConfig::new(10, 2, "v22", "v22");
        assert!(matches!(
            Coordinator::new(config, universe.clone(), store.clone()),
            Err(BenchmarkError::Configuration(_))
        ));

        let config = RunConfig::new(10, 0, "v23", "v22");
        assert!(run_benchmark(&config, universe, store.clone()).is_err());
        assert_eq!(store.get_count(), 0);
    }

    #[test]
    fn test_stopped_context_yields_partial_report() {
        let store = Arc::new(MemoryStore::new());
        let universe = KeyUniverse::new(vec!["1.1.1.1".to_string()]).unwrap();
        let ctx = Arc::new(RunContext::new());
        ctx.stop();

        let report = Coordinator::new(RunConfig::new(100, 3, "v23", "v22"), universe, store)
            .unwrap()
            .with_context(ctx)
            .run()
            .unwrap();

        assert!(!report.completed_fully);
        assert_eq!(report.stats.total_reads, 0);
        assert_eq!(report.missing_operations(), 100);
        assert_eq!(report.abandoned_workers, 0);
        assert_eq!(report.stats.latency, None);
    }
}
