//! Utility Functions Module
//!
//! Statistics helpers, unit formatting and JSON result export shared by the
//! aggregator and the report printer.
//!
//! ## Percentile rule
//!
//! Values are sorted ascending and the `p`-th percentile is the element at
//! rank `floor(p / 100 * n)`, clamped to `[0, n - 1]`. The rule is
//! deterministic for a given multiset of samples regardless of input order.

use std::{fs::File, io::Write};

use serde::Serialize;

use crate::types::{BenchmarkError, BenchmarkResult};

/// Calculates the arithmetic mean of a slice of values
///
/// # Returns
///
/// Returns the average value, or 0.0 if the slice is empty
pub fn calculate_average(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Percentile of an already ascending-sorted slice
///
/// # Arguments
///
/// * `sorted` - Samples sorted ascending
/// * `percentile` - The percentile to calculate (0.0 to 100.0)
///
/// # Returns
///
/// `None` for an empty slice; otherwise the element at rank
/// `floor(percentile / 100 * n)` clamped to the last index
///
/// # Example
///
/// ```rust
/// use bench::utils::percentile_of_sorted;
///
/// let data = vec![1.0, 2.0, 3.0, 4.0, 5.0];
/// assert_eq!(percentile_of_sorted(&data, 50.0), Some(3.0));
/// assert_eq!(percentile_of_sorted(&[], 50.0), None);
/// ```
pub fn percentile_of_sorted(sorted: &[f64], percentile: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }

    let len = sorted.len();
    let rank = (percentile / 100.0 * len as f64).floor();
    let index = if rank <= 0.0 { 0 } else { rank as usize };

    Some(sorted[index.min(len - 1)])
}

/// Saves any serializable data structure to a JSON file
///
/// # Errors
///
/// This function will return an error if:
/// - The data cannot be serialized to JSON
/// - The file cannot be created or written to
pub fn save_json_results<T: Serialize>(data: &T, filename: &str) -> BenchmarkResult<()> {
    let json = serde_json::to_string_pretty(data).map_err(BenchmarkError::Json)?;

    let mut file = File::create(filename).map_err(BenchmarkError::Io)?;

    file.write_all(json.as_bytes()).map_err(BenchmarkError::Io)?;

    log::info!("Results saved to {}", filename);
    Ok(())
}

/// Formats a duration in microseconds to a human-readable string
pub fn format_duration(microseconds: f64) -> String {
    if microseconds < 1000.0 {
        format!("{:.2}μs", microseconds)
    } else if microseconds < 1_000_000.0 {
        format!("{:.2}ms", microseconds / 1000.0)
    } else {
        format!("{:.2}s", microseconds / 1_000_000.0)
    }
}

/// Formats a byte count using binary units
pub fn format_bytes(bytes: f64) -> String {
    const KIB: f64 = 1024.0;
    const MIB: f64 = KIB * 1024.0;
    const GIB: f64 = MIB * 1024.0;

    if bytes < KIB {
        format!("{:.0} B", bytes)
    } else if bytes < MIB {
        format!("{:.1} KiB", bytes / KIB)
    } else if bytes < GIB {
        format!("{:.1} MiB", bytes / MIB)
    } else {
        format!("{:.2} GiB", bytes / GIB)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calculate_average() {
        assert_eq!(calculate_average(&[]), 0.0);
        assert_eq!(calculate_average(&[1.0]), 1.0);
        assert_eq!(calculate_average(&[1.0, 2.0, 3.0]), 2.0);
        assert_eq!(calculate_average(&[1.0, 2.0, 3.0, 4.0, 5.0]), 3.0);
    }

    #[test]
    fn test_percentile_of_sorted() {
        assert_eq!(percentile_of_sorted(&[], 50.0), None);
        assert_eq!(percentile_of_sorted(&[1.0], 50.0), Some(1.0));
        assert_eq!(percentile_of_sorted(&[1.0], 99.0), Some(1.0));

        let data = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(percentile_of_sorted(&data, 0.0), Some(1.0));
        assert_eq!(percentile_of_sorted(&data, 50.0), Some(3.0));
        assert_eq!(percentile_of_sorted(&data, 95.0), Some(5.0));
        assert_eq!(percentile_of_sorted(&data, 100.0), Some(5.0));
    }

    #[test]
    fn test_percentile_floor_rank() {
        // n = 10: p50 -> rank 5, p95 -> rank 9 (floor 9.5), p99 -> rank 9
        let sorted: Vec<f64> = (1..=10).map(f64::from).collect();
        assert_eq!(percentile_of_sorted(&sorted, 50.0), Some(6.0));
        assert_eq!(percentile_of_sorted(&sorted, 95.0), Some(10.0));
        assert_eq!(percentile_of_sorted(&sorted, 99.0), Some(10.0));
        assert_eq!(percentile_of_sorted(&sorted, 10.0), Some(2.0));
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(500.0), "500.00μs");
        assert_eq!(format_duration(1500.0), "1.50ms");
        assert_eq!(format_duration(1_500_000.0), "1.50s");
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512.0), "512 B");
        assert_eq!(format_bytes(1536.0), "1.5 KiB");
        assert_eq!(format_bytes(3.0 * 1024.0 * 1024.0), "3.0 MiB");
    }
}
