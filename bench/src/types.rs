//! Type definitions and data structures for generation-fallback read benchmarking
//!
//! This module contains the core data structures used throughout the benchmark:
//! run configuration, per-lookup outcomes, aggregated statistics, the final
//! report and the error type.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for benchmark operations
pub type BenchmarkResult<T> = Result<T, BenchmarkError>;

/// Error types for benchmark operations
#[derive(Error, Debug)]
pub enum BenchmarkError {
    #[error("Initialization error: {0}")]
    Initialization(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Key universe is empty: nothing to sample lookups from")]
    EmptyUniverse,

    #[error("Store error: {0}")]
    Store(#[from] store::StoreError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("General error: {0}")]
    General(#[from] anyhow::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Outcome of resolving one identifier through the primary/fallback protocol
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupOutcome {
    /// Identifier sampled from the key universe
    pub identifier: String,
    /// Version the value was found under, `None` when neither had it
    pub resolved_version: Option<String>,
    /// Byte length of the value (0 on a miss)
    pub value_size: usize,
    /// Wall-clock time of the whole resolution, fallback included
    pub elapsed: Duration,
    /// 1 for a primary hit, 2 whenever the fallback key was consulted
    pub attempts: u8,
    /// How many of the attempts failed with a transient store error
    pub transient_errors: u8,
    pub succeeded: bool,
}

impl LookupOutcome {
    #[must_use]
    pub fn hit(
        identifier: impl Into<String>,
        version: impl Into<String>,
        value_size: usize,
        elapsed: Duration,
        attempts: u8,
        transient_errors: u8,
    ) -> Self {
        debug_assert!((1..=2).contains(&attempts));
        Self {
            identifier: identifier.into(),
            resolved_version: Some(version.into()),
            value_size,
            elapsed,
            attempts,
            transient_errors,
            succeeded: true,
        }
    }

    #[must_use]
    pub fn miss(identifier: impl Into<String>, elapsed: Duration, transient_errors: u8) -> Self {
        Self {
            identifier: identifier.into(),
            resolved_version: None,
            value_size: 0,
            elapsed,
            attempts: 2,
            transient_errors,
            succeeded: false,
        }
    }
}

/// Immutable parameters of one benchmark run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunConfig {
    pub total_operations: u64,
    pub worker_count: usize,
    pub primary_version: String,
    pub fallback_version: String,
    /// How often the coordinator logs progress
    pub progress_interval: Duration,
    /// How long the coordinator waits for each worker once polling ends
    pub join_timeout: Duration,
    /// Lookups per pipelined store round-trip; 1 resolves one at a time
    pub batch_size: usize,
}

impl RunConfig {
    pub const DEFAULT_PROGRESS_INTERVAL: Duration = Duration::from_secs(5);
    pub const DEFAULT_JOIN_TIMEOUT: Duration = Duration::from_secs(10);

    #[must_use]
    pub fn new(
        total_operations: u64,
        worker_count: usize,
        primary_version: impl Into<String>,
        fallback_version: impl Into<String>,
    ) -> Self {
        Self {
            total_operations,
            worker_count,
            primary_version: primary_version.into(),
            fallback_version: fallback_version.into(),
            progress_interval: Self::DEFAULT_PROGRESS_INTERVAL,
            join_timeout: Self::DEFAULT_JOIN_TIMEOUT,
            batch_size: 1,
        }
    }

    #[must_use]
    pub fn with_progress_interval(mut self, interval: Duration) -> Self {
        self.progress_interval = interval;
        self
    }

    #[must_use]
    pub fn with_join_timeout(mut self, timeout: Duration) -> Self {
        self.join_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Rejects degenerate parameters before any worker is started
    pub fn validate(&self) -> BenchmarkResult<()> {
        if self.total_operations == 0 {
            return Err(BenchmarkError::Configuration(
                "total_operations must be at least 1".to_string(),
            ));
        }
        if self.worker_count == 0 {
            return Err(BenchmarkError::Configuration(
                "worker_count must be at least 1".to_string(),
            ));
        }
        if self.primary_version.is_empty() || self.fallback_version.is_empty() {
            return Err(BenchmarkError::Configuration(
                "primary and fallback versions must be non-empty".to_string(),
            ));
        }
        if self.primary_version == self.fallback_version {
            return Err(BenchmarkError::Configuration(format!(
                "primary and fallback versions must differ (both are {})",
                self.primary_version
            )));
        }
        if self.progress_interval.is_zero() {
            return Err(BenchmarkError::Configuration(
                "progress_interval must be positive".to_string(),
            ));
        }
        if self.batch_size == 0 {
            return Err(BenchmarkError::Configuration(
                "batch_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Latency distribution of successful lookups
///
/// All values are in microseconds (μs)
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Default)]
pub struct LatencySummary {
    pub min_us: f64,
    pub p50_us: f64,
    pub p95_us: f64,
    pub p99_us: f64,
    pub max_us: f64,
    pub sample_count: u64,
}

/// Aggregated statistics of a run, derived once all outcomes are collected
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct RunStatistics {
    pub total_reads: u64,
    pub successful_reads: u64,
    pub primary_hits: u64,
    pub fallback_hits: u64,
    pub misses: u64,
    /// Attempts that failed with a transient store error (counted inside `misses`
    /// only when both attempts of a lookup came up empty)
    pub transient_errors: u64,
    pub total_time_secs: f64,
    pub total_bytes: u64,
    /// Mean latency over every lookup, misses included
    pub mean_latency_us: f64,
    pub reads_per_second: f64,
    pub throughput_bytes_per_second: f64,
    /// Successful reads as a fraction (0.0 to 1.0) of all reads
    pub hit_rate: f64,
    /// Absent when no lookup succeeded
    pub latency: Option<LatencySummary>,
}

/// Complete result of a benchmark run
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RunReport {
    /// ISO 8601 timestamp of when the run started
    pub timestamp: String,
    pub config: RunConfig,
    /// True when every requested lookup was performed
    pub completed_fully: bool,
    /// Workers still running when their join timeout expired
    pub abandoned_workers: usize,
    pub stats: RunStatistics,
}

impl RunReport {
    /// Lookups requested but never performed (interrupt or abandoned workers)
    #[must_use]
    pub fn missing_operations(&self) -> u64 {
        self.config
            .total_operations
            .saturating_sub(self.stats.total_reads)
    }
}
