//! Stats aggregator
//!
//! Reduces the collected outcomes to a `RunStatistics` value. Outcomes
//! arrive in interleaved append order from many workers, so every figure is
//! an order-independent reduction (counts, sums, sorted percentiles).

use std::time::Duration;

use crate::{
    types::{LatencySummary, LookupOutcome, RunStatistics},
    utils::{calculate_average, percentile_of_sorted},
};

fn micros(d: Duration) -> f64 {
    d.as_secs_f64() * 1_000_000.0
}

/// Summarizes a run; pure and deterministic for a given collection of outcomes
///
/// A lookup counts as successful only if it resolved under `primary_version`
/// or `fallback_version`. Latency percentiles cover successful lookups and
/// are `None` when there are none; rates are 0 when nothing was read or no
/// time elapsed.
pub fn summarize(
    outcomes: &[LookupOutcome],
    elapsed: Duration,
    primary_version: &str,
    fallback_version: &str,
) -> RunStatistics {
    let total_time_secs = elapsed.as_secs_f64();
    let mut stats = RunStatistics {
        total_reads: outcomes.len() as u64,
        total_time_secs,
        ..RunStatistics::default()
    };

    if outcomes.is_empty() {
        return stats;
    }

    let mut hit_latencies = Vec::new();
    for outcome in outcomes {
        stats.transient_errors += u64::from(outcome.transient_errors);

        if !outcome.succeeded {
            continue;
        }
        match outcome.resolved_version.as_deref() {
            Some(v) if v == primary_version => stats.primary_hits += 1,
            Some(v) if v == fallback_version => stats.fallback_hits += 1,
            _ => continue,
        }
        stats.total_bytes += outcome.value_size as u64;
        hit_latencies.push(micros(outcome.elapsed));
    }

    stats.successful_reads = stats.primary_hits + stats.fallback_hits;
    stats.misses = stats.total_reads - stats.successful_reads;
    stats.hit_rate = stats.successful_reads as f64 / stats.total_reads as f64;

    let all_latencies: Vec<f64> = outcomes.iter().map(|o| micros(o.elapsed)).collect();
    stats.mean_latency_us = calculate_average(&all_latencies);

    if total_time_secs > 0.0 {
        stats.reads_per_second = stats.total_reads as f64 / total_time_secs;
        stats.throughput_bytes_per_second = stats.total_bytes as f64 / total_time_secs;
    }

    stats.latency = latency_summary(hit_latencies);
    stats
}

fn latency_summary(mut latencies: Vec<f64>) -> Option<LatencySummary> {
    latencies.sort_by(f64::total_cmp);

    Some(LatencySummary {
        min_us: *latencies.first()?,
        p50_us: percentile_of_sorted(&latencies, 50.0)?,
        p95_us: percentile_of_sorted(&latencies, 95.0)?,
        p99_us: percentile_of_sorted(&latencies, 99.0)?,
        max_us: *latencies.last()?,
        sample_count: latencies.len() as u64,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_empty_input() {
        let stats = summarize(&[], ms(1500), "v23", "v22");
        assert_eq!(stats.total_reads, 0);
        assert_eq!(stats.successful_reads, 0);
        assert_eq!(stats.misses, 0);
        assert_eq!(stats.reads_per_second, 0.0);
        assert_eq!(stats.throughput_bytes_per_second, 0.0);
        assert_eq!(stats.mean_latency_us, 0.0);
        assert_eq!(stats.hit_rate, 0.0);
        assert_eq!(stats.latency, None);
        assert_eq!(stats.total_time_secs, 1.5);
    }

    #[test]
    fn test_counts_and_bytes() {
        let outcomes = vec![
            LookupOutcome::hit("a", "v23", 10, ms(1), 1, 0),
            LookupOutcome::hit("b", "v22", 20, ms(3), 2, 1),
            LookupOutcome::hit("c", "v23", 30, ms(2), 1, 0),
            LookupOutcome::miss("d", ms(4), 2),
        ];
        let stats = summarize(&outcomes, Duration::from_secs(2), "v23", "v22");

        assert_eq!(stats.total_reads, 4);
        assert_eq!(stats.primary_hits, 2);
        assert_eq!(stats.fallback_hits, 1);
        assert_eq!(stats.successful_reads, 3);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.transient_errors, 3);
        assert_eq!(stats.total_bytes, 60);
        assert_eq!(stats.reads_per_second, 2.0);
        assert_eq!(stats.throughput_bytes_per_second, 30.0);
        assert_eq!(stats.hit_rate, 0.75);
        assert!((stats.mean_latency_us - 2500.0).abs() < 1e-6);

        let latency = stats.latency.unwrap();
        assert_eq!(latency.sample_count, 3);
        assert!((latency.min_us - 1000.0).abs() < 1e-6);
        assert!((latency.p50_us - 2000.0).abs() < 1e-6);
        assert!((latency.max_us - 3000.0).abs() < 1e-6);
    }

    #[test]
    fn test_all_misses_have_no_percentiles() {
        let outcomes = vec![LookupOutcome::miss("x", ms(1), 0); 5];
        let stats = summarize(&outcomes, Duration::from_secs(1), "v23", "v22");
        assert_eq!(stats.misses, 5);
        assert_eq!(stats.successful_reads, 0);
        assert_eq!(stats.latency, None);
        assert_eq!(stats.reads_per_second, 5.0);
    }

    #[test]
    fn test_order_independent() {
        let mut outcomes: Vec<_> = (1..=50)
            .map(|i| {
                let elapsed = Duration::from_secs(i);
                if i % 7 == 0 {
                    LookupOutcome::miss(format!("{i}"), elapsed, 0)
                } else {
                    let version = if i % 2 == 0 { "v23" } else { "v22" };
                    LookupOutcome::hit(format!("{i}"), version, 8, elapsed, 1, 0)
                }
            })
            .collect();
        let forward = summarize(&outcomes, Duration::from_secs(3), "v23", "v22");
        outcomes.reverse();
        let backward = summarize(&outcomes, Duration::from_secs(3), "v23", "v22");
        assert_eq!(forward, backward);
        assert_eq!(forward.successful_reads, forward.primary_hits + forward.fallback_hits);
        assert_eq!(forward.misses + forward.successful_reads, forward.total_reads);
    }

    #[test]
    fn test_foreign_versions_count_as_misses() {
        let outcomes = vec![LookupOutcome::hit("a", "v01", 10, ms(1), 1, 0)];
        let stats = summarize(&outcomes, Duration::from_secs(1), "v23", "v22");
        assert_eq!(stats.successful_reads, 0);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.total_bytes, 0);
    }
}
