//! Shared Species Counter Utility
//!
//! Counts how many sites of a population host each species (incidence
//! frequency). Feeds the Chao2 extrapolator, which only needs the number of
//! species seen in exactly one and exactly two sites.

use crate::population::{Population, Species};
use rustc_hash::FxHashMap;

/// Count, for every species, the number of sites where it occurs
///
/// Species are already distinct within a site, so each site contributes at
/// most 1 to a given species. Every count lies in `1..=population.len()`.
pub fn count_species_occurrences<S: Species>(population: &Population<S>) -> FxHashMap<&S, usize> {
    let mut counts: FxHashMap<&S, usize> = FxHashMap::default();

    for (_site_id, site) in population.iter() {
        for species in site.species() {
            *counts.entry(species).or_insert(0) += 1;
        }
    }

    counts
}

/// Number of species whose occurrence count is exactly `frequency`
pub fn species_with_frequency<S>(counts: &FxHashMap<&S, usize>, frequency: usize) -> usize {
    counts.values().filter(|&&count| count == frequency).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::population::normalize;

    #[test]
    fn test_count_species_occurrences() {
        let pop = normalize(vec![
            ("plot_a", vec!["bee_1", "bee_2", "butterfly_1"]),
            ("plot_b", vec!["bee_1", "fly_1"]),
            ("plot_c", vec!["bee_1", "butterfly_1", "fly_2", "bee_1"]),
        ])
        .unwrap();

        let counts = count_species_occurrences(&pop);

        // bee_1 in all 3 sites, even though plot_c lists it twice
        assert_eq!(counts.get(&"bee_1"), Some(&3));
        // butterfly_1 in 2 sites (a, c)
        assert_eq!(counts.get(&"butterfly_1"), Some(&2));
        assert_eq!(counts.get(&"bee_2"), Some(&1));
        assert_eq!(counts.get(&"fly_1"), Some(&1));
        assert_eq!(counts.get(&"fly_2"), Some(&1));
    }

    #[test]
    fn test_species_with_frequency() {
        let pop = normalize(vec![
            ("a", vec![1, 2, 3]),
            ("b", vec![1, 2]),
            ("c", vec![1, 4]),
        ])
        .unwrap();
        let counts = count_species_occurrences(&pop);

        assert_eq!(species_with_frequency(&counts, 1), 2); // 3, 4
        assert_eq!(species_with_frequency(&counts, 2), 1); // 2
        assert_eq!(species_with_frequency(&counts, 3), 1); // 1
    }
}
