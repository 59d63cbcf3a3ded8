//! Multi-site Simpson and Sorensen dissimilarity
//!
//! Baselga's multiple-site generalization of the pairwise indices:
//!
//!   Simpson  = sumMin / (sumS_i - gamma + sumMin)
//!   Sorensen = (sumMin + sumMax) / (sumS_i - gamma + sumMin + sumMax)
//!
//! The adapted variant first rescales the pair sums to an average-pair basis
//! (`2 · sum / nbPlots`), which removes the dependence of the raw indices on
//! how many sites were sampled.
//!
//! Denominators are not guarded. A single site, or sites that all share every
//! species, yields NaN or out-of-range values; those come back flagged
//! instead of clamped.

use crate::error::Result;
use crate::metrics::features::{aggregate, DissimilarityFeatures};
use crate::population::{Population, Species};
use crate::utils::estimate::is_unit_interval;
use serde::{Deserialize, Serialize};

/// Simpson (turnover) and Sorensen (turnover + nestedness) values
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndexPair {
    pub simpson: f64,
    pub sorensen: f64,
}

impl IndexPair {
    /// Nestedness-resultant component (Sorensen minus Simpson)
    pub fn nestedness(&self) -> f64 {
        self.sorensen - self.simpson
    }

    /// Both values finite and within [0, 1]
    pub fn is_stable(&self) -> bool {
        is_unit_interval(self.simpson) && is_unit_interval(self.sorensen)
    }
}

/// Dissimilarity between two specific sites
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairwiseDissimilarity {
    pub site_a: String,
    pub site_b: String,
    pub simpson: f64,
    pub sorensen: f64,
}

fn index_pair(sum_s_i: f64, gamma: f64, sum_min: f64, sum_max: f64) -> IndexPair {
    let base = sum_s_i - gamma;
    IndexPair {
        simpson: sum_min / (base + sum_min),
        sorensen: (sum_min + sum_max) / (base + sum_min + sum_max),
    }
}

/// Raw multi-site indices from precomputed aggregates
pub fn raw_indices_from(features: &DissimilarityFeatures) -> IndexPair {
    index_pair(
        features.sum_s_i as f64,
        features.total_nb_species as f64,
        features.sum_min_ij as f64,
        features.sum_max_ij as f64,
    )
}

/// Population-size-independent indices from precomputed aggregates
pub fn adapted_indices_from(features: &DissimilarityFeatures) -> IndexPair {
    let n = features.nb_plots as f64;
    let sum_min_corr = 2.0 * features.sum_min_ij as f64 / n;
    let sum_max_corr = 2.0 * features.sum_max_ij as f64 / n;

    index_pair(
        features.sum_s_i as f64,
        features.total_nb_species as f64,
        sum_min_corr,
        sum_max_corr,
    )
}

/// Raw multi-site Simpson and Sorensen dissimilarity of a population
///
/// # Errors
/// `EmptyPopulation` if the population has no site.
pub fn raw_indices<S: Species>(population: &Population<S>) -> Result<IndexPair> {
    let features = aggregate(population)?;
    let indices = raw_indices_from(&features);
    warn_if_degenerate("raw", &indices, &features);
    Ok(indices)
}

/// Adapted multi-site Simpson and Sorensen dissimilarity of a population
///
/// # Errors
/// `EmptyPopulation` if the population has no site.
pub fn adapted_indices<S: Species>(population: &Population<S>) -> Result<IndexPair> {
    let features = aggregate(population)?;
    let indices = adapted_indices_from(&features);
    warn_if_degenerate("adapted", &indices, &features);
    Ok(indices)
}

fn warn_if_degenerate(kind: &str, indices: &IndexPair, features: &DissimilarityFeatures) {
    if !indices.is_stable() {
        tracing::warn!(
            "Degenerate {} indices over {} sites (simpson={}, sorensen={})",
            kind,
            features.nb_plots,
            indices.simpson,
            indices.sorensen
        );
    }
}

/// Baselga pairwise Simpson and Sorensen for every unordered pair of sites
///
/// With `a` shared species and `b`, `c` species exclusive to each site:
///   simpson  = min(b, c) / (a + min(b, c))
///   sorensen = (b + c) / (2a + b + c)
///
/// Pairs come out in sorted site-id order. Two empty sites give NaN.
pub fn pairwise_dissimilarity<S: Species>(population: &Population<S>) -> Vec<PairwiseDissimilarity> {
    let sites: Vec<_> = population.iter().collect();
    let mut pairs = Vec::with_capacity(sites.len() * sites.len().saturating_sub(1) / 2);

    for (i, (id_a, site_a)) in sites.iter().enumerate() {
        for (id_b, site_b) in &sites[i + 1..] {
            let a = site_a.shared_with(site_b) as f64;
            let b = site_a.richness() as f64 - a;
            let c = site_b.richness() as f64 - a;

            pairs.push(PairwiseDissimilarity {
                site_a: id_a.to_string(),
                site_b: id_b.to_string(),
                simpson: b.min(c) / (a + b.min(c)),
                sorensen: (b + c) / (2.0 * a + b + c),
            });
        }
    }

    pairs
}
