//! Dissimilarity Estimator - population indices from a sample of sites
//!
//! Estimates the multi-site Simpson and Sorensen dissimilarity of a
//! population of N sites when only n of them were surveyed, and attaches a
//! delete-1 jackknife variance. Includes both sequential and parallel (Rayon)
//! jackknife loops.
//!
//! Algorithm:
//! 1. Aggregate the sample and extrapolate its richness with Chao2
//! 2. Per-pair rates: meanMin = 2·sumMin / (n(n-1)), meanMax likewise,
//!    meanS = sumS_i / n
//! 3. Point estimates for a population of N sites:
//!    Simpson  = (N-1)·meanMin / (N·meanS - S_hat + (N-1)·meanMin)
//!    Sorensen = (N-1)·(meanMin+meanMax) / (N·meanS - S_hat + (N-1)·(meanMin+meanMax))
//! 4. Jackknife: repeat 1-3 with each site left out in turn, then scale the
//!    empirical variance of the n replicates by (n-1)²/n
//!
//! The leave-one-out step calls `point_estimate` directly, which never
//! resamples, so there is no recursion to guard against.

use crate::config::EstimatorConfig;
use crate::error::{DissimilarityError, Result};
use crate::metrics::chao2::{chao2, Chao2Estimate};
use crate::metrics::features::{aggregate, DissimilarityFeatures};
use crate::metrics::indices::IndexPair;
use crate::population::{Population, Species};
use crate::utils::estimate::{Estimate, JackknifeEstimator};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Index estimates for the population a sample was drawn from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleEstimate {
    pub simpson: Estimate,
    pub sorensen: Estimate,
    /// Chao2 richness of the sample, used as the population's gamma
    pub richness: Chao2Estimate,
    pub features: DissimilarityFeatures,
    pub population_size: usize,
    /// Number of jackknife replicates behind the variances (0 if none)
    pub n_replicates: usize,
}

/// Point estimate from one sample, without resampling
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointEstimate {
    pub indices: IndexPair,
    pub richness: Chao2Estimate,
    pub features: DissimilarityFeatures,
    /// N·meanS - S_hat + (N-1)·meanMin
    pub simpson_denominator: f64,
    /// N·meanS - S_hat + (N-1)·(meanMin + meanMax)
    pub sorensen_denominator: f64,
}

impl PointEstimate {
    /// Simpson came out of a finite, positive denominator
    pub fn simpson_defined(&self) -> bool {
        self.simpson_denominator.is_finite() && self.simpson_denominator > 0.0
    }

    /// Sorensen came out of a finite, positive denominator
    pub fn sorensen_defined(&self) -> bool {
        self.sorensen_denominator.is_finite() && self.sorensen_denominator > 0.0
    }
}

/// Main estimator: holds its settings, estimates any number of samples
pub struct DissimilarityEstimator {
    config: EstimatorConfig,
}

impl DissimilarityEstimator {
    pub fn new(config: EstimatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EstimatorConfig {
        &self.config
    }

    /// Estimate population indices (and, if configured, their variance)
    ///
    /// # Errors
    /// - `EmptyPopulation` if the sample has no site
    /// - `InvalidPopulationSize` if N is 0 or smaller than the sample
    pub fn estimate<S: Species>(&self, sample: &Population<S>) -> Result<SampleEstimate> {
        let population_size = self.config.population_size;
        validate_population_size(sample, population_size)?;

        let point = point_estimate(sample, population_size)?;

        let mut simpson = Estimate::unit_interval(point.indices.simpson);
        let mut sorensen = Estimate::unit_interval(point.indices.sorensen);
        // -0.0 from a negative denominator passes the range check
        simpson.degenerate |= !point.simpson_defined();
        sorensen.degenerate |= !point.sorensen_defined();

        if simpson.degenerate || sorensen.degenerate {
            tracing::warn!(
                "Unstable estimate from {} sites (N={}): simpson={}, sorensen={}",
                sample.len(),
                population_size,
                point.indices.simpson,
                point.indices.sorensen
            );
        }

        let mut n_replicates = 0;

        if self.config.jackknife {
            // Leave-one-out replicates of a 2-site sample have no pairs
            if sample.len() < 3 {
                tracing::warn!(
                    "Jackknife needs at least 3 sites, got {}; variance left undefined",
                    sample.len()
                );
            } else {
                let (simpson_jk, sorensen_jk) = if self.config.parallel {
                    jackknife_parallel(sample, population_size)?
                } else {
                    jackknife(sample, population_size)?
                };

                n_replicates = simpson_jk.len();
                simpson = simpson.with_variance(simpson_jk.variance());
                sorensen = sorensen.with_variance(sorensen_jk.variance());
                simpson.degenerate |= !simpson.variance.is_some_and(f64::is_finite);
                sorensen.degenerate |= !sorensen.variance.is_some_and(f64::is_finite);

                tracing::debug!(
                    "Jackknife over {} replicates: var(simpson)={:?}, var(sorensen)={:?}",
                    n_replicates,
                    simpson.variance,
                    sorensen.variance
                );
            }
        }

        Ok(SampleEstimate {
            simpson,
            sorensen,
            richness: point.richness,
            features: point.features,
            population_size,
            n_replicates,
        })
    }
}

/// Estimate population indices from a sample
///
/// Convenience wrapper around `DissimilarityEstimator` with the jackknife
/// loop running in parallel when enabled.
pub fn estimate_from_sample<S: Species>(
    sample: &Population<S>,
    population_size: usize,
    jackknife: bool,
) -> Result<SampleEstimate> {
    let config = EstimatorConfig::new(population_size).with_jackknife(jackknife);
    DissimilarityEstimator::new(config).estimate(sample)
}

fn validate_population_size<S: Species>(sample: &Population<S>, population_size: usize) -> Result<()> {
    sample.ensure_not_empty()?;
    if population_size == 0 || population_size < sample.len() {
        return Err(DissimilarityError::InvalidPopulationSize {
            population_size,
            sample_size: sample.len(),
        });
    }
    Ok(())
}

/// Point estimates of the population indices from one sample
///
/// Never resamples. A sample of one site has no pairs and yields NaN.
pub fn point_estimate<S: Species>(sample: &Population<S>, population_size: usize) -> Result<PointEstimate> {
    let features = aggregate(sample)?;
    let richness = chao2(sample)?;

    let n = features.nb_plots as f64;
    let big_n = population_size as f64;
    let total_s_hat = richness.mean();

    let mean_min = 2.0 * features.sum_min_ij as f64 / (n * (n - 1.0));
    let mean_max = 2.0 * features.sum_max_ij as f64 / (n * (n - 1.0));
    let mean_s = features.mean_alpha();

    let base = big_n * mean_s - total_s_hat;
    let min_term = (big_n - 1.0) * mean_min;
    let min_max_term = (big_n - 1.0) * (mean_min + mean_max);

    let simpson_denominator = base + min_term;
    let sorensen_denominator = base + min_max_term;

    let indices = IndexPair {
        simpson: min_term / simpson_denominator,
        sorensen: min_max_term / sorensen_denominator,
    };

    Ok(PointEstimate {
        indices,
        richness,
        features,
        simpson_denominator,
        sorensen_denominator,
    })
}

/// Leave-one-site-out replicates, sequentially in site order
pub fn jackknife<S: Species>(
    sample: &Population<S>,
    population_size: usize,
) -> Result<(JackknifeEstimator, JackknifeEstimator)> {
    let mut simpson = JackknifeEstimator::new();
    let mut sorensen = JackknifeEstimator::new();

    for site_id in sample.site_ids() {
        let reduced = sample.without_site(site_id);
        let replicate = point_estimate(&reduced, population_size)?;
        simpson.add_realization(replicate.indices.simpson);
        sorensen.add_realization(replicate.indices.sorensen);
    }

    Ok((simpson, sorensen))
}

/// Leave-one-site-out replicates computed on the rayon pool
///
/// Replicates are collected in site order, so the result matches `jackknife`.
pub fn jackknife_parallel<S: Species>(
    sample: &Population<S>,
    population_size: usize,
) -> Result<(JackknifeEstimator, JackknifeEstimator)> {
    let site_ids: Vec<&str> = sample.site_ids().collect();

    let replicates: Vec<IndexPair> = site_ids
        .par_iter()
        .map(|site_id| {
            let reduced = sample.without_site(site_id);
            point_estimate(&reduced, population_size).map(|p| p.indices)
        })
        .collect::<Result<Vec<_>>>()?;

    let simpson = replicates.iter().map(|r| r.simpson).collect();
    let sorensen = replicates.iter().map(|r| r.sorensen).collect();

    Ok((simpson, sorensen))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::population::normalize;
    use approx::assert_relative_eq;

    fn sample() -> Population<u32> {
        normalize(vec![
            ("p1", vec![1, 2, 3, 4]),
            ("p2", vec![2, 3, 5]),
            ("p3", vec![1, 5, 6]),
            ("p4", vec![3, 4, 6, 7]),
            ("p5", vec![1, 2, 7, 8]),
        ])
        .unwrap()
    }

    #[test]
    fn test_point_estimate_matches_formula() {
        let pop = sample();
        let point = point_estimate(&pop, 50).unwrap();
        let f = point.features;

        let n = f.nb_plots as f64;
        let mean_min = 2.0 * f.sum_min_ij as f64 / (n * (n - 1.0));
        let mean_max = 2.0 * f.sum_max_ij as f64 / (n * (n - 1.0));
        let mean_s = f.sum_s_i as f64 / n;
        let s_hat = point.richness.mean();

        let simpson = 49.0 * mean_min / (50.0 * mean_s - s_hat + 49.0 * mean_min);
        let sorensen =
            49.0 * (mean_min + mean_max) / (50.0 * mean_s - s_hat + 49.0 * (mean_min + mean_max));

        assert_relative_eq!(point.indices.simpson, simpson, epsilon = 1e-12);
        assert_relative_eq!(point.indices.sorensen, sorensen, epsilon = 1e-12);
    }

    #[test]
    fn test_jackknife_variance_from_replicates() {
        let pop = sample();
        let est = estimate_from_sample(&pop, 50, true).unwrap();
        assert_eq!(est.n_replicates, 5);

        // Rebuild the replicates by hand
        let replicates: Vec<f64> = pop
            .site_ids()
            .map(|id| point_estimate(&pop.without_site(id), 50).unwrap().indices.simpson)
            .collect();
        let mean = replicates.iter().sum::<f64>() / 5.0;
        let empirical = replicates.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / 4.0;

        assert_relative_eq!(est.simpson.variance.unwrap(), 16.0 / 5.0 * empirical, epsilon = 1e-12);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let pop = sample();
        let (seq_sim, seq_sor) = jackknife(&pop, 80).unwrap();
        let (par_sim, par_sor) = jackknife_parallel(&pop, 80).unwrap();
        assert_eq!(seq_sim.realizations(), par_sim.realizations());
        assert_eq!(seq_sor.realizations(), par_sor.realizations());
    }

    #[test]
    fn test_without_jackknife_variance_absent() {
        let est = estimate_from_sample(&sample(), 50, false).unwrap();
        assert!(est.simpson.variance.is_none());
        assert!(est.sorensen.variance.is_none());
        assert_eq!(est.n_replicates, 0);
    }

    #[test]
    fn test_population_smaller_than_sample_rejected() {
        let err = estimate_from_sample(&sample(), 3, true).unwrap_err();
        assert_eq!(
            err,
            DissimilarityError::InvalidPopulationSize { population_size: 3, sample_size: 5 }
        );
    }

    #[test]
    fn test_two_site_sample_has_no_jackknife_variance() {
        let pop = normalize(vec![("a", vec![1, 2, 3]), ("b", vec![2, 4])]).unwrap();
        let est = estimate_from_sample(&pop, 10, true).unwrap();

        assert!(est.simpson.variance.is_none());
        assert!(est.sorensen.variance.is_none());
        assert_eq!(est.n_replicates, 0);
        // Point estimates themselves are fine
        assert!(est.simpson.is_stable());
        assert!(est.sorensen.is_stable());
    }

    #[test]
    fn test_three_site_sample_gets_variance() {
        let pop = normalize(vec![("a", vec![1, 2, 3]), ("b", vec![2, 4]), ("c", vec![1, 5])]).unwrap();
        let est = estimate_from_sample(&pop, 10, true).unwrap();

        assert_eq!(est.n_replicates, 3);
        assert!(est.simpson.variance.unwrap().is_finite());
        assert!(est.sorensen.variance.unwrap().is_finite());
    }

    #[test]
    fn test_negative_denominator_is_flagged() {
        // Pure nestedness: meanMin = 0. Nine singletons push Chao2 to
        // 10 + 1/2 · 81/2 = 30.25 > N · meanS = 11, so Simpson is 0 / negative.
        let pop = normalize(vec![("big", (1..=10).collect::<Vec<u32>>()), ("small", vec![1])]).unwrap();
        let point = point_estimate(&pop, 2).unwrap();
        assert_relative_eq!(point.richness.mean(), 30.25, epsilon = 1e-12);
        assert!(point.simpson_denominator < 0.0);
        assert_eq!(point.indices.simpson, 0.0);

        let est = estimate_from_sample(&pop, 2, false).unwrap();
        assert!(est.simpson.degenerate);
        assert!(est.sorensen.degenerate);
    }

    #[test]
    fn test_mean_alpha_feeds_point_estimate() {
        let pop = sample();
        let point = point_estimate(&pop, 50).unwrap();
        // 4 + 3 + 3 + 4 + 4 species over 5 sites
        assert_relative_eq!(point.features.mean_alpha(), 18.0 / 5.0, epsilon = 1e-12);
    }

    #[test]
    fn test_single_site_sample_is_flagged() {
        let pop = normalize(vec![("only", vec![1, 2])]).unwrap();
        let est = estimate_from_sample(&pop, 10, true).unwrap();
        assert!(est.simpson.degenerate);
        assert!(est.sorensen.degenerate);
        assert!(est.simpson.variance.is_none());
    }
}
