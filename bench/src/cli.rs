//! Command-line interface definitions for the genread read benchmark

use std::{path::PathBuf, time::Duration};

use clap::{Parser, Subcommand, ValueEnum};
use store::config::{AppConfig, ReaderConfig, DEFAULT_CONFIG_FILE};

use crate::types::{BenchmarkError, BenchmarkResult, RunConfig};

/// genread Read Benchmark
///
/// Concurrent read benchmark for versioned key-value lookups with
/// primary/fallback resolution.
#[derive(Parser, Debug)]
#[command(
    version,
    about = "genread - Concurrent versioned read benchmark",
    long_about = "
Runs many concurrent lookups against a key-value store. Each lookup asks for
an identifier under the primary version and, if that is missing, under the
fallback version. Reports hit distribution, throughput and latency
percentiles.

The store is expected to be populated already; use --memory for a dry run
against an in-process store.
"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: BenchCommand,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum BenchCommand {
    /// Run a read benchmark
    ///
    /// Picks a canned scenario (or custom parameters), samples identifiers
    /// from the configured network blocks and resolves them concurrently.
    Run(RunArgs),

    /// Write the default configuration to a file
    InitConfig {
        /// Destination of the JSON configuration
        #[arg(long, default_value = DEFAULT_CONFIG_FILE, value_name = "FILE")]
        path: PathBuf,
    },
}

/// Canned run sizes
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Scenario {
    /// 1,000 reads on 2 threads
    #[default]
    Quick,
    /// 10,000 reads on 4 threads
    Medium,
    /// 100,000 reads on 8 threads
    Large,
    /// `--reads` reads on `--threads` threads (defaults to the CPU count)
    Custom,
}

impl Scenario {
    /// Preset `(reads, threads)`; `None` for `Custom`
    #[must_use]
    pub const fn preset(self) -> Option<(u64, usize)> {
        match self {
            Self::Quick => Some((1_000, 2)),
            Self::Medium => Some((10_000, 4)),
            Self::Large => Some((100_000, 8)),
            Self::Custom => None,
        }
    }

    /// Builds the run configuration for this scenario
    ///
    /// `reads`/`threads` override the preset when given. Versions, interval,
    /// join timeout and batch size come from `reader`.
    ///
    /// # Errors
    ///
    /// `Custom` without `reads`, or any combination that fails
    /// [`RunConfig::validate`].
    pub fn run_config(
        self,
        reads: Option<u64>,
        threads: Option<usize>,
        reader: &ReaderConfig,
    ) -> BenchmarkResult<RunConfig> {
        let preset = self.preset();
        let total_operations = reads.or(preset.map(|(r, _)| r)).ok_or_else(|| {
            BenchmarkError::Configuration("--reads is required for the custom scenario".to_string())
        })?;
        let worker_count = threads
            .or(preset.map(|(_, t)| t))
            .unwrap_or_else(num_cpus::get);

        let config = RunConfig::new(
            total_operations,
            worker_count,
            reader.primary_version.as_str(),
            reader.fallback_version.as_str(),
        )
        .with_progress_interval(Duration::from_secs(reader.progress_interval_secs))
        .with_join_timeout(Duration::from_secs(reader.join_timeout_secs))
        .with_batch_size(reader.batch_size);

        config.validate()?;
        Ok(config)
    }
}

/// Arguments for the run command
#[derive(Parser, Debug, Default)]
pub struct RunArgs {
    /// Canned parameter set
    #[arg(long, value_enum, default_value_t = Scenario::Quick)]
    pub scenario: Scenario,

    /// Total lookups (required for the custom scenario)
    #[arg(long, value_name = "COUNT")]
    pub reads: Option<u64>,

    /// Worker threads
    #[arg(long, value_name = "COUNT")]
    pub threads: Option<usize>,

    /// Version tried first
    #[arg(long, value_name = "VERSION")]
    pub primary: Option<String>,

    /// Version tried when the primary is missing
    #[arg(long, value_name = "VERSION")]
    pub fallback: Option<String>,

    /// Path to configuration file (JSON format)
    ///
    /// Defaults to genread.json in the working directory when it exists.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Output file for the run report (JSON format)
    #[arg(long, value_name = "FILE")]
    pub output: Option<String>,

    /// Number of identifiers sampled into the key universe
    #[arg(long, value_name = "COUNT")]
    pub pool_size: Option<usize>,

    /// Seconds between progress lines
    #[arg(long, value_name = "SECONDS")]
    pub progress_interval: Option<u64>,

    /// Seconds to wait for each worker once the run ends or is interrupted
    #[arg(long, value_name = "SECONDS")]
    pub join_timeout: Option<u64>,

    /// Lookups per pipelined store round-trip
    #[arg(long, value_name = "COUNT")]
    pub batch_size: Option<usize>,

    /// Run against an in-memory store seeded with sample values
    #[arg(long)]
    pub memory: bool,
}

impl RunArgs {
    /// Folds the command-line overrides into `config`
    pub fn apply_to(&self, config: &mut AppConfig) {
        let reader = &mut config.reader;
        if let Some(v) = &self.primary {
            reader.primary_version.clone_from(v);
        }
        if let Some(v) = &self.fallback {
            reader.fallback_version.clone_from(v);
        }
        if let Some(v) = self.pool_size {
            reader.pool_size = v;
        }
        if let Some(v) = self.progress_interval {
            reader.progress_interval_secs = v;
        }
        if let Some(v) = self.join_timeout {
            reader.join_timeout_secs = v;
        }
        if let Some(v) = self.batch_size {
            reader.batch_size = v;
        }
    }

    pub fn run_config(&self, reader: &ReaderConfig) -> BenchmarkResult<RunConfig> {
        self.scenario.run_config(self.reads, self.threads, reader)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets() {
        let reader = ReaderConfig::default();

        let quick = Scenario::Quick.run_config(None, None, &reader).unwrap();
        assert_eq!((quick.total_operations, quick.worker_count), (1_000, 2));

        let medium = Scenario::Medium.run_config(None, None, &reader).unwrap();
        assert_eq!((medium.total_operations, medium.worker_count), (10_000, 4));

        let large = Scenario::Large.run_config(None, None, &reader).unwrap();
        assert_eq!((large.total_operations, large.worker_count), (100_000, 8));
        assert_eq!(large.primary_version, "v23");
        assert_eq!(large.fallback_version, "v22");
        assert_eq!(large.join_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_custom_scenario() {
        let reader = ReaderConfig::default();

        assert!(matches!(
            Scenario::Custom.run_config(None, Some(4), &reader),
            Err(BenchmarkError::Configuration(_))
        ));

        let custom = Scenario::Custom.run_config(Some(500), Some(3), &reader).unwrap();
        assert_eq!((custom.total_operations, custom.worker_count), (500, 3));

        let custom = Scenario::Custom.run_config(Some(500), None, &reader).unwrap();
        assert_eq!(custom.worker_count, num_cpus::get());
    }

    #[test]
    fn test_overrides_and_validation() {
        let reader = ReaderConfig::default();

        let config = Scenario::Medium.run_config(None, Some(16), &reader).unwrap();
        assert_eq!((config.total_operations, config.worker_count), (10_000, 16));

        assert!(Scenario::Quick.run_config(Some(0), None, &reader).is_err());
        assert!(Scenario::Quick.run_config(None, Some(0), &reader).is_err());
    }

    #[test]
    fn test_args_apply_to_config() {
        let args = RunArgs {
            primary: Some("v30".to_string()),
            fallback: Some("v29".to_string()),
            batch_size: Some(32),
            join_timeout: Some(2),
            ..RunArgs::default()
        };
        let mut config = AppConfig::default();
        args.apply_to(&mut config);

        let run = args.run_config(&config.reader).unwrap();
        assert_eq!(run.primary_version, "v30");
        assert_eq!(run.fallback_version, "v29");
        assert_eq!(run.batch_size, 32);
        assert_eq!(run.join_timeout, Duration::from_secs(2));
        assert_eq!(run.total_operations, 1_000);
    }

    #[test]
    fn test_cli_parses_run() {
        let cli = Cli::parse_from([
            "bench",
            "run",
            "--scenario",
            "custom",
            "--reads",
            "42",
            "--threads",
            "3",
            "--memory",
        ]);
        let BenchCommand::Run(args) = cli.command else {
            panic!("expected run command");
        };
        assert_eq!(args.scenario, Scenario::Custom);
        assert_eq!(args.reads, Some(42));
        assert_eq!(args.threads, Some(3));
        assert!(args.memory);
    }
}
