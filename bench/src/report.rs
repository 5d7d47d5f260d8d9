//! Human-readable run report, printed through the logger

use log::{info, warn};

use crate::{
    types::{RunReport, RunStatistics},
    utils::{format_bytes, format_duration},
};

fn percent(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

/// Prints the summary of a finished (or stopped) run
pub fn print_report(report: &RunReport) {
    let config = &report.config;
    let stats = &report.stats;

    info!("=== Read Benchmark Results ===");
    if !report.completed_fully {
        warn!(
            "Run stopped early: {} of {} requested lookups were not performed",
            report.missing_operations(),
            config.total_operations
        );
    }
    if report.abandoned_workers > 0 {
        warn!(
            "{} worker(s) were still running at the join deadline; their last lookups are not included",
            report.abandoned_workers
        );
    }

    info!("Reads:");
    info!("  Requested:  {}", config.total_operations);
    info!("  Performed:  {}", stats.total_reads);
    info!(
        "  Successful: {} ({:.2}%)",
        stats.successful_reads,
        stats.hit_rate * 100.0
    );
    info!(
        "  Misses:     {} ({:.2}%)",
        stats.misses,
        percent(stats.misses, stats.total_reads)
    );
    if stats.transient_errors > 0 {
        warn!("  Store errors: {} (counted as misses when both versions failed)", stats.transient_errors);
    }

    print_version_distribution(stats, &config.primary_version, &config.fallback_version);

    info!("Throughput:");
    info!("  Total time: {:.2}s", stats.total_time_secs);
    info!("  Reads/sec:  {:.2}", stats.reads_per_second);
    info!(
        "  Data:       {} ({}/s)",
        format_bytes(stats.total_bytes as f64),
        format_bytes(stats.throughput_bytes_per_second)
    );
    info!(
        "  MB/s:       {:.2}",
        stats.throughput_bytes_per_second / (1024.0 * 1024.0)
    );

    info!("Latency:");
    info!("  Mean (all reads): {}", format_duration(stats.mean_latency_us));
    match &stats.latency {
        Some(latency) => {
            info!("  Min:  {}", format_duration(latency.min_us));
            info!("  P50:  {}", format_duration(latency.p50_us));
            info!("  P95:  {}", format_duration(latency.p95_us));
            info!("  P99:  {}", format_duration(latency.p99_us));
            info!("  Max:  {}", format_duration(latency.max_us));
        }
        None => info!("  No successful reads, percentiles unavailable"),
    }
}

fn print_version_distribution(stats: &RunStatistics, primary: &str, fallback: &str) {
    info!("Version distribution:");
    info!(
        "  {primary} (primary):  {} ({:.2}%)",
        stats.primary_hits,
        percent(stats.primary_hits, stats.successful_reads)
    );
    info!(
        "  {fallback} (fallback): {} ({:.2}%)",
        stats.fallback_hits,
        percent(stats.fallback_hits, stats.successful_reads)
    );
}
