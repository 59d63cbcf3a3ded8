//! Chao2 richness extrapolator
//!
//! Incidence-based lower-bound estimate of total species richness, used as a
//! stand-in for the gamma diversity of a population when only a sample of its
//! sites was surveyed.
//!
//! With `s` observed species, `n` sites, `k = (n-1)/n`, `f1` species seen in
//! exactly one site and `f2` species seen in exactly two:
//!
//! - `f2 > 0`:  chao2 = s + k·f1²/(2·f2)
//!   var = f2·(k/2·r² + k²·r³ + k²/4·r⁴), r = f1/f2
//! - `f2 == 0`: chao2 = s + k·f1(f1-1)/2
//!   var = k·f1(f1-1)/2 + k²·f1(2f1-1)²/4 - k²·f1⁴/(4·chao2)

use crate::error::Result;
use crate::population::{Population, Species};
use crate::utils::estimate::Estimate;
use crate::utils::species_counter::{count_species_occurrences, species_with_frequency};
use serde::{Deserialize, Serialize};

/// Chao2 estimate with the frequency classes it was built from
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Chao2Estimate {
    /// Extrapolated richness (mean and analytic variance)
    pub richness: Estimate,
    /// Observed distinct species
    pub observed: usize,
    /// Species found in exactly one site
    pub singletons: usize,
    /// Species found in exactly two sites
    pub doubletons: usize,
    pub nb_plots: usize,
}

impl Chao2Estimate {
    pub fn mean(&self) -> f64 {
        self.richness.mean
    }

    pub fn variance(&self) -> f64 {
        self.richness.variance.unwrap_or(f64::NAN)
    }

    /// Whether the bias-corrected (no doubleton) form was used
    pub fn bias_corrected(&self) -> bool {
        self.doubletons == 0
    }
}

/// Chao2 richness estimate of a population
///
/// # Errors
/// `EmptyPopulation` if the population has no site.
pub fn chao2<S: Species>(population: &Population<S>) -> Result<Chao2Estimate> {
    population.ensure_not_empty()?;

    let counts = count_species_occurrences(population);
    let f1 = species_with_frequency(&counts, 1);
    let f2 = species_with_frequency(&counts, 2);

    Ok(chao2_from_frequencies(counts.len(), f1, f2, population.len()))
}

/// Chao2 from observed richness and frequency classes
///
/// `nb_plots` must be at least 1.
pub fn chao2_from_frequencies(observed: usize, f1: usize, f2: usize, nb_plots: usize) -> Chao2Estimate {
    let s = observed as f64;
    let n = nb_plots as f64;
    let k = (n - 1.0) / n;
    let q1 = f1 as f64;
    let q2 = f2 as f64;

    let (mean, variance) = if f2 > 0 {
        let ratio = q1 / q2;
        let mean = s + k * q1 * q1 / (2.0 * q2);
        let variance = q2
            * (0.5 * k * ratio.powi(2)
                + k.powi(2) * ratio.powi(3)
                + 0.25 * k.powi(2) * ratio.powi(4));
        (mean, variance)
    } else {
        let mean = s + k * q1 * (q1 - 1.0) / 2.0;
        let variance = if mean > 0.0 {
            k * q1 * (q1 - 1.0) / 2.0
                + k.powi(2) * q1 * (2.0 * q1 - 1.0).powi(2) / 4.0
                - k.powi(2) * q1.powi(4) / (4.0 * mean)
        } else {
            0.0
        };
        (mean, variance)
    };

    Chao2Estimate {
        richness: Estimate::non_negative(mean, variance),
        observed,
        singletons: f1,
        doubletons: f2,
        nb_plots,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::population::normalize;
    use approx::assert_relative_eq;

    #[test]
    fn test_chao2_with_doubletons() {
        // Frequencies: 1→3 sites, 2→2 sites, 3,4→1 site
        let pop = normalize(vec![
            ("a", vec![1, 2, 3]),
            ("b", vec![1, 2]),
            ("c", vec![1, 4]),
        ])
        .unwrap();

        let est = chao2(&pop).unwrap();
        assert_eq!(est.observed, 4);
        assert_eq!(est.singletons, 2);
        assert_eq!(est.doubletons, 1);
        assert!(!est.bias_corrected());

        let k = 2.0 / 3.0;
        // 4 + k · 4 / 2
        assert_relative_eq!(est.mean(), 4.0 + 2.0 * k, epsilon = 1e-12);
        // r = 2: 1 · (k/2 · 4 + k² · 8 + k²/4 · 16)
        let expected_var = 2.0 * k + 8.0 * k * k + 4.0 * k * k;
        assert_relative_eq!(est.variance(), expected_var, epsilon = 1e-12);
    }

    #[test]
    fn test_chao2_without_doubletons() {
        // Every species in exactly one site
        let pop = normalize(vec![
            ("a", vec!["x", "y"]),
            ("b", vec!["z"]),
            ("c", vec!["w"]),
            ("d", vec!["v"]),
        ])
        .unwrap();

        let est = chao2(&pop).unwrap();
        assert!(est.bias_corrected());
        assert_eq!(est.singletons, 5);

        let k = 0.75;
        let mean = 5.0 + k * 5.0 * 4.0 / 2.0;
        assert_relative_eq!(est.mean(), mean, epsilon = 1e-12);

        let var = k * 10.0 + k * k * 5.0 * 81.0 / 4.0 - k * k * 625.0 / (4.0 * mean);
        assert_relative_eq!(est.variance(), var, epsilon = 1e-12);

        assert!(est.mean().is_finite());
        assert!(est.richness.is_stable());
    }

    #[test]
    fn test_chao2_single_site_returns_observed() {
        // k = 0 with one site: no extrapolation possible
        let pop = normalize(vec![("only", vec![1, 2, 3])]).unwrap();
        let est = chao2(&pop).unwrap();
        assert_relative_eq!(est.mean(), 3.0);
        assert_relative_eq!(est.variance(), 0.0);
    }

    #[test]
    fn test_chao2_no_singletons() {
        // All species shared by both sites: nothing unseen
        let pop = normalize(vec![("a", vec![1, 2]), ("b", vec![1, 2])]).unwrap();
        let est = chao2(&pop).unwrap();
        assert_relative_eq!(est.mean(), 2.0);
        assert_relative_eq!(est.variance(), 0.0);
    }
}
