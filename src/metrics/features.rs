//! Dissimilarity Aggregator
//!
//! Reduces a population to the five scalars every multi-site index needs:
//!   1. totalNbSpecies - gamma diversity (size of the species union)
//!   2. nbPlots - number of sites
//!   3. sumS_i - sum of local richness over sites
//!   4. sumMin_ij - over all unordered pairs, sum of min(b_ij, b_ji)
//!   5. sumMax_ij - over all unordered pairs, sum of max(b_ij, b_ji)
//!
//! where `b_ij = S_i - shared(i, j)` counts species of site i absent from j.
//!
//! The min and max sums are accumulated separately; nothing downstream may
//! assume `sum_min <= sum_max` holds for the totals.
//!
//! Cost is O(n² · s) for n sites of mean richness s.

use crate::error::Result;
use crate::population::{Population, Species};
use serde::{Deserialize, Serialize};

/// Aggregates of one population snapshot
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DissimilarityFeatures {
    pub total_nb_species: usize,
    pub nb_plots: usize,
    pub sum_s_i: usize,
    pub sum_min_ij: usize,
    pub sum_max_ij: usize,
}

impl DissimilarityFeatures {
    /// Gamma diversity
    pub fn gamma(&self) -> usize {
        self.total_nb_species
    }

    /// Mean local (alpha) richness
    pub fn mean_alpha(&self) -> f64 {
        self.sum_s_i as f64 / self.nb_plots as f64
    }

    /// Number of unordered site pairs
    pub fn nb_pairs(&self) -> usize {
        self.nb_plots * self.nb_plots.saturating_sub(1) / 2
    }
}

/// Compute the aggregates of a population in one pass over all site pairs
///
/// # Errors
/// `EmptyPopulation` if the population has no site.
pub fn aggregate<S: Species>(population: &Population<S>) -> Result<DissimilarityFeatures> {
    population.ensure_not_empty()?;

    let sites: Vec<_> = population.iter().map(|(_, site)| site).collect();

    let mut sum_s_i = 0;
    let mut sum_min_ij = 0;
    let mut sum_max_ij = 0;

    for (i, site_i) in sites.iter().enumerate() {
        let s_i = site_i.richness();
        sum_s_i += s_i;

        for site_j in &sites[i + 1..] {
            let shared = site_i.shared_with(site_j);
            let b_ij = s_i - shared;
            let b_ji = site_j.richness() - shared;

            sum_min_ij += b_ij.min(b_ji);
            sum_max_ij += b_ij.max(b_ji);
        }
    }

    let features = DissimilarityFeatures {
        total_nb_species: population.species_pool().len(),
        nb_plots: sites.len(),
        sum_s_i,
        sum_min_ij,
        sum_max_ij,
    };

    tracing::debug!(
        "Aggregated {} sites: gamma={}, sumS_i={}, sumMin={}, sumMax={}",
        features.nb_plots,
        features.total_nb_species,
        features.sum_s_i,
        features.sum_min_ij,
        features.sum_max_ij
    );

    Ok(features)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::population::normalize;

    #[test]
    fn test_two_site_garden() {
        let pop = normalize(vec![
            ("1", vec!["carotte", "carotte", "patate"]),
            ("2", vec!["carotte", "navet"]),
        ])
        .unwrap();

        let f = aggregate(&pop).unwrap();
        assert_eq!(f.total_nb_species, 3);
        assert_eq!(f.nb_plots, 2);
        assert_eq!(f.sum_s_i, 4);
        assert_eq!(f.sum_min_ij, 1);
        assert_eq!(f.sum_max_ij, 1);
    }

    #[test]
    fn test_nested_sites() {
        let pop = normalize(vec![
            ("big", vec![1, 2, 3, 4]),
            ("s1", vec![1]),
            ("s2", vec![1]),
            ("s3", vec![1]),
        ])
        .unwrap();

        let f = aggregate(&pop).unwrap();
        assert_eq!(f.total_nb_species, 4);
        assert_eq!(f.sum_s_i, 7);
        assert_eq!(f.sum_min_ij, 0);
        assert_eq!(f.sum_max_ij, 9);
        assert_eq!(f.nb_pairs(), 6);
    }

    #[test]
    fn test_single_site_has_no_pairs() {
        let pop = normalize(vec![("only", vec!["a", "b"])]).unwrap();
        let f = aggregate(&pop).unwrap();
        assert_eq!(f.nb_plots, 1);
        assert_eq!(f.sum_min_ij, 0);
        assert_eq!(f.sum_max_ij, 0);
        assert_eq!(f.nb_pairs(), 0);
    }

    #[test]
    fn test_gamma_never_exceeds_total_richness() {
        let pop = normalize(vec![
            ("a", vec![1, 2, 3]),
            ("b", vec![2, 3, 5, 8]),
            ("c", vec![13]),
        ])
        .unwrap();
        let f = aggregate(&pop).unwrap();
        assert!(f.total_nb_species <= f.sum_s_i);
        assert_eq!(f.gamma(), 6);
    }
}
