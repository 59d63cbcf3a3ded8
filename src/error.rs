//! Error types for the dissimilarity engine
//!
//! Only caller errors are represented here. Numerically degenerate results
//! (single site, zero denominators) are returned as values and flagged through
//! `is_stable()` on the result types.

use thiserror::Error;

/// Errors raised at the boundary of the public operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DissimilarityError {
    /// Population contains no site at all
    #[error("population is empty: at least one site is required")]
    EmptyPopulation,

    /// Site has a null or absent species collection
    #[error("site '{site_id}' has no species collection")]
    MissingSpecies { site_id: String },

    /// Same site identifier supplied twice
    #[error("site '{site_id}' appears more than once in the population")]
    DuplicateSite { site_id: String },

    /// Population size is zero or smaller than the sample drawn from it
    #[error("population size {population_size} is invalid for a sample of {sample_size} sites")]
    InvalidPopulationSize {
        population_size: usize,
        sample_size: usize,
    },
}

pub type Result<T> = std::result::Result<T, DissimilarityError>;
