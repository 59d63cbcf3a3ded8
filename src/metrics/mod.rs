//! Dissimilarity metrics
//!
//! Each computation lives in its own module:
//! - `features`: one pass over all site pairs producing the shared aggregates
//! - `indices`: raw and adapted multi-site indices, pairwise matrix
//! - `chao2`: incidence-based richness extrapolation

pub mod chao2;
pub mod features;
pub mod indices;

// Re-export metric functions
pub use chao2::{chao2, chao2_from_frequencies, Chao2Estimate};
pub use features::{aggregate, DissimilarityFeatures};
pub use indices::{
    adapted_indices, adapted_indices_from, pairwise_dissimilarity, raw_indices,
    raw_indices_from, IndexPair, PairwiseDissimilarity,
};
