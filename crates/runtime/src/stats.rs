//! Summary statistics
//!
//! Moments computed from a histogram rather than from retained samples, so
//! arbitrarily long runs stay O(distinct outcomes) in memory.

use serde::{Deserialize, Serialize};

use crate::distribution::Distribution;

/// Summary of one result distribution.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    /// Sample standard deviation (n − 1 denominator).
    pub stdev: f64,
}

impl Stats {
    /// Compute stats from a distribution; `None` when it is empty.
    pub fn from_distribution(dist: &Distribution) -> Option<Stats> {
        if dist.is_empty() {
            return None;
        }
        let count = dist.total_count();
        let n = count as f64;
        let sum: f64 = dist.entries().map(|(v, c)| v as f64 * c as f64).sum();
        let mean = sum / n;
        let sq_dev: f64 = dist
            .entries()
            .map(|(v, c)| (v as f64 - mean).powi(2) * c as f64)
            .sum();
        let stdev = if count > 1 {
            (sq_dev / (n - 1.0)).sqrt()
        } else {
            0.0
        };
        Some(Stats {
            count,
            min: dist.min()? as f64,
            max: dist.max()? as f64,
            mean,
            stdev,
        })
    }

    /// Combine partial stats, count-weighted. The pooled stdev ignores
    /// between-part mean spread, matching how partial batches of the same
    /// simulation are summarized.
    pub fn combine(parts: &[Stats]) -> Option<Stats> {
        if parts.is_empty() {
            return None;
        }
        let count: u64 = parts.iter().map(|s| s.count).sum();
        if count == 0 {
            return None;
        }
        let n = count as f64;
        let mean = parts.iter().map(|s| s.count as f64 * s.mean).sum::<f64>() / n;
        let pooled_var = parts
            .iter()
            .filter(|s| s.count > 1)
            .map(|s| s.count as f64 * s.stdev * s.stdev)
            .sum::<f64>()
            / n;
        Some(Stats {
            count,
            min: parts.iter().map(|s| s.min).fold(f64::INFINITY, f64::min),
            max: parts.iter().map(|s| s.max).fold(f64::NEG_INFINITY, f64::max),
            mean,
            stdev: pooled_var.sqrt(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dist(values: &[i64]) -> Distribution {
        let mut d = Distribution::new();
        for &v in values {
            d.increment(v);
        }
        d
    }

    #[test]
    fn empty_distribution_has_no_stats() {
        assert_eq!(Stats::from_distribution(&Distribution::new()), None);
    }

    #[test]
    fn computes_moments_from_histogram() {
        let stats = Stats::from_distribution(&dist(&[1, 2, 3, 4, 5])).unwrap();
        assert_eq!(stats.count, 5);
        assert_eq!(stats.min, 1.0);
        assert_eq!(stats.max, 5.0);
        assert_eq!(stats.mean, 3.0);
        assert!((stats.stdev - 1.5811).abs() < 1e-4);
    }

    #[test]
    fn single_sample_has_zero_stdev() {
        let stats = Stats::from_distribution(&dist(&[7])).unwrap();
        assert_eq!(stats.stdev, 0.0);
        assert_eq!(stats.mean, 7.0);
    }

    #[test]
    fn combine_weights_by_count() {
        let a = Stats::from_distribution(&dist(&[1, 1, 1, 1])).unwrap();
        let b = Stats::from_distribution(&dist(&[5, 5, 5, 5, 5, 5, 5, 5])).unwrap();
        let combined = Stats::combine(&[a, b]).unwrap();
        assert_eq!(combined.count, 12);
        assert_eq!(combined.min, 1.0);
        assert_eq!(combined.max, 5.0);
        assert!((combined.mean - (4.0 + 40.0) / 12.0).abs() < 1e-12);
    }
}
