//! Estimate containers
//!
//! - `Estimate`: point value, optional variance and a degeneracy flag
//! - `JackknifeEstimator`: collects delete-1 pseudo-replicates and turns
//!   their spread into a jackknife variance

use serde::{Deserialize, Serialize};

/// Point estimate with optional variance
///
/// `variance` stays `None` until something actually computes it.
/// `degenerate` is set when the mean came out of a zero or negative
/// denominator, is not finite, or falls outside its admissible range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Estimate {
    pub mean: f64,
    pub variance: Option<f64>,
    pub degenerate: bool,
}

impl Estimate {
    /// Estimate of a proportion-like quantity, flagged unless finite and in [0, 1]
    pub fn unit_interval(mean: f64) -> Self {
        Self {
            mean,
            variance: None,
            degenerate: !is_unit_interval(mean),
        }
    }

    /// Estimate of a count-like quantity, flagged unless finite and non-negative
    pub fn non_negative(mean: f64, variance: f64) -> Self {
        Self {
            mean,
            variance: Some(variance),
            degenerate: !(mean.is_finite() && mean >= 0.0),
        }
    }

    pub fn with_variance(mut self, variance: Option<f64>) -> Self {
        self.variance = variance;
        self
    }

    /// Standard error, when a variance is available
    pub fn std_error(&self) -> Option<f64> {
        self.variance.map(f64::sqrt)
    }

    pub fn is_stable(&self) -> bool {
        !self.degenerate
    }
}

/// Whether a value is a finite proportion
pub fn is_unit_interval(value: f64) -> bool {
    value.is_finite() && (0.0..=1.0).contains(&value)
}

/// Collector of delete-1 jackknife pseudo-replicates
#[derive(Debug, Clone, Default)]
pub struct JackknifeEstimator {
    realizations: Vec<f64>,
}

impl JackknifeEstimator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_realization(&mut self, value: f64) {
        self.realizations.push(value);
    }

    /// Number of replicates collected so far
    pub fn len(&self) -> usize {
        self.realizations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.realizations.is_empty()
    }

    pub fn realizations(&self) -> &[f64] {
        &self.realizations
    }

    pub fn mean(&self) -> Option<f64> {
        if self.realizations.is_empty() {
            return None;
        }
        Some(self.realizations.iter().sum::<f64>() / self.realizations.len() as f64)
    }

    /// Sample variance of the replicates (n - 1 denominator)
    pub fn empirical_variance(&self) -> Option<f64> {
        let n = self.realizations.len();
        if n < 2 {
            return None;
        }
        let mean = self.mean()?;
        let sum_sq: f64 = self.realizations.iter().map(|x| (x - mean).powi(2)).sum();
        Some(sum_sq / (n - 1) as f64)
    }

    /// Jackknife variance: `(n-1)² / n` times the empirical variance
    pub fn variance(&self) -> Option<f64> {
        let n = self.realizations.len() as f64;
        self.empirical_variance()
            .map(|var| (n - 1.0).powi(2) / n * var)
    }
}

impl FromIterator<f64> for JackknifeEstimator {
    fn from_iter<I: IntoIterator<Item = f64>>(iter: I) -> Self {
        Self {
            realizations: iter.into_iter().collect(),
        }
    }
}
