//! Site-Set Normalizer
//!
//! Turns raw species observations (site id → list of species, possibly with
//! repeats) into a `Population` whose sites hold distinct species only.
//!
//! Uniqueness of species within a site is structural: a `Site` is backed by a
//! hash set, so every downstream computation can rely on `len()` being the
//! local richness without re-checking.
//!
//! Sites are kept in a `BTreeMap` so iteration always follows sorted site ids.
//! Index values do not depend on that order, but a fixed order makes the
//! pairwise output and jackknife replicates reproducible.

use crate::error::{DissimilarityError, Result};
use anyhow::Context;
use rustc_hash::FxHashSet;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::fs;
use std::hash::Hash;
use std::path::Path;

/// Species token: anything with identity semantics that can cross threads
pub trait Species: Eq + Hash + Clone + Send + Sync {}

impl<T: Eq + Hash + Clone + Send + Sync> Species for T {}

/// One sampling unit with its distinct species
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Site<S: Species> {
    species: FxHashSet<S>,
}

impl<S: Species> Site<S> {
    /// Build a site, collapsing repeated observations
    pub fn new<I: IntoIterator<Item = S>>(observations: I) -> Self {
        Self {
            species: observations.into_iter().collect(),
        }
    }

    /// Local (alpha) richness
    pub fn richness(&self) -> usize {
        self.species.len()
    }

    pub fn species(&self) -> impl Iterator<Item = &S> {
        self.species.iter()
    }

    /// Number of species found in both sites
    ///
    /// Probes the larger set with the smaller one.
    pub fn shared_with(&self, other: &Site<S>) -> usize {
        let (small, large) = if self.species.len() <= other.species.len() {
            (&self.species, &other.species)
        } else {
            (&other.species, &self.species)
        };
        small.iter().filter(|s| large.contains(*s)).count()
    }
}

/// Mapping from site id to site, sorted by id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Population<S: Species> {
    sites: BTreeMap<String, Site<S>>,
}

impl<S: Species> Population<S> {
    /// Number of sites (nbPlots)
    pub fn len(&self) -> usize {
        self.sites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }

    pub fn get(&self, site_id: &str) -> Option<&Site<S>> {
        self.sites.get(site_id)
    }

    /// Sites in sorted id order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Site<S>)> {
        self.sites.iter().map(|(id, site)| (id.as_str(), site))
    }

    pub fn site_ids(&self) -> impl Iterator<Item = &str> {
        self.sites.keys().map(String::as_str)
    }

    /// Union of all sites' species (its size is gamma diversity)
    pub fn species_pool(&self) -> FxHashSet<&S> {
        self.sites.values().flat_map(|site| site.species()).collect()
    }

    /// Copy of this population without one site
    ///
    /// Removing an unknown id returns an identical copy. The result may be
    /// empty; public operations reject empty populations on entry.
    pub fn without_site(&self, site_id: &str) -> Population<S> {
        let sites = self
            .sites
            .iter()
            .filter(|(id, _)| id.as_str() != site_id)
            .map(|(id, site)| (id.clone(), site.clone()))
            .collect();
        Population { sites }
    }

    /// Copy holding only the listed sites (unknown ids are ignored)
    pub fn subset<'a, I: IntoIterator<Item = &'a str>>(&self, site_ids: I) -> Population<S> {
        let sites = site_ids
            .into_iter()
            .filter_map(|id| self.sites.get_key_value(id))
            .map(|(id, site)| (id.clone(), site.clone()))
            .collect();
        Population { sites }
    }

    /// Fail fast on a population that cannot be aggregated
    pub(crate) fn ensure_not_empty(&self) -> Result<()> {
        if self.sites.is_empty() {
            return Err(DissimilarityError::EmptyPopulation);
        }
        Ok(())
    }
}

impl Population<String> {
    /// Load a population from a JSON object `{"site": ["species", ...] | null}`
    pub fn load_json(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read population file: {:?}", path))?;

        let raw: BTreeMap<String, Option<Vec<String>>> = serde_json::from_str(&contents)
            .with_context(|| "Failed to parse population JSON")?;

        normalize_optional(raw)
            .with_context(|| format!("Invalid population in {:?}", path))
    }
}

/// Normalize raw observations into a `Population`
///
/// Each site's observations are de-duplicated; the set of site ids is kept
/// as given. Running it again on the sites of an already normalized
/// population yields an equal population.
///
/// # Errors
/// - `EmptyPopulation` if no site is supplied
/// - `DuplicateSite` if a site id is supplied twice
pub fn normalize<S, K, I, J>(observations: I) -> Result<Population<S>>
where
    S: Species,
    K: Into<String>,
    I: IntoIterator<Item = (K, J)>,
    J: IntoIterator<Item = S>,
{
    normalize_optional(
        observations
            .into_iter()
            .map(|(site_id, species)| (site_id, Some(species))),
    )
}

/// Same as `normalize`, for inputs where a site's species list may be absent
///
/// # Errors
/// Additionally returns `MissingSpecies` for a site whose list is `None`.
pub fn normalize_optional<S, K, I, J>(observations: I) -> Result<Population<S>>
where
    S: Species,
    K: Into<String>,
    I: IntoIterator<Item = (K, Option<J>)>,
    J: IntoIterator<Item = S>,
{
    let mut sites = BTreeMap::new();

    for (site_id, species) in observations {
        let site_id: String = site_id.into();
        let Some(species) = species else {
            return Err(DissimilarityError::MissingSpecies { site_id });
        };

        match sites.entry(site_id) {
            Entry::Occupied(entry) => {
                return Err(DissimilarityError::DuplicateSite {
                    site_id: entry.key().clone(),
                });
            }
            Entry::Vacant(entry) => {
                entry.insert(Site::new(species));
            }
        }
    }

    let population = Population { sites };
    population.ensure_not_empty()?;
    Ok(population)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn garden() -> Population<&'static str> {
        normalize(vec![
            ("plot_1", vec!["carotte", "carotte", "patate"]),
            ("plot_2", vec!["carotte", "navet"]),
        ])
        .unwrap()
    }

    #[test]
    fn test_duplicates_removed() {
        let pop = garden();
        assert_eq!(pop.len(), 2);
        assert_eq!(pop.get("plot_1").unwrap().richness(), 2);
        assert_eq!(pop.get("plot_2").unwrap().richness(), 2);
        assert_eq!(pop.species_pool().len(), 3);
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let pop = garden();
        let again = normalize(
            pop.iter()
                .map(|(id, site)| (id.to_string(), site.species().cloned().collect::<Vec<_>>())),
        )
        .unwrap();
        assert_eq!(pop, again);
    }

    #[test]
    fn test_empty_site_is_valid() {
        let pop = normalize(vec![("bare", Vec::<u32>::new()), ("rich", vec![1, 2])]).unwrap();
        assert_eq!(pop.get("bare").unwrap().richness(), 0);
    }

    #[test]
    fn test_empty_population_rejected() {
        let err = normalize(Vec::<(String, Vec<u32>)>::new()).unwrap_err();
        assert_eq!(err, DissimilarityError::EmptyPopulation);
    }

    #[test]
    fn test_missing_species_rejected() {
        let err = normalize_optional(vec![("a", Some(vec![1])), ("b", None)]).unwrap_err();
        assert_eq!(
            err,
            DissimilarityError::MissingSpecies { site_id: "b".to_string() }
        );
    }

    #[test]
    fn test_duplicate_site_rejected() {
        let err = normalize(vec![("a", vec![1]), ("a", vec![2])]).unwrap_err();
        assert_eq!(err, DissimilarityError::DuplicateSite { site_id: "a".to_string() });
    }

    #[test]
    fn test_without_site() {
        let pop = garden();
        let reduced = pop.without_site("plot_1");
        assert_eq!(reduced.len(), 1);
        assert!(reduced.get("plot_1").is_none());
        // Source population untouched
        assert_eq!(pop.len(), 2);
    }

    #[test]
    fn test_subset() {
        let pop = garden();
        let sub = pop.subset(["plot_2", "plot_9"]);
        assert_eq!(sub.site_ids().collect::<Vec<_>>(), vec!["plot_2"]);
    }

    #[test]
    fn test_shared_with() {
        let a = Site::new(vec![1, 2, 3]);
        let b = Site::new(vec![2, 3, 4, 5]);
        assert_eq!(a.shared_with(&b), 2);
        assert_eq!(b.shared_with(&a), 2);
    }
}
