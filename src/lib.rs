//! Multi-site Beta Diversity (Rust Implementation)
//!
//! Simpson and Sorensen multiple-site dissimilarity following Baselga's
//! generalization of the pairwise indices, their population-size-independent
//! ("adapted") variants, and a sample-based estimator that extrapolates
//! richness with Chao2 and attaches a delete-1 jackknife variance.
//!
//! Module layout:
//! - `population`: site-set normalizer (distinct species per site)
//! - `metrics/`: aggregator, index calculators, Chao2 extrapolator
//! - `utils/`: species occurrence counting, estimate containers
//! - `estimator`: sample estimator with sequential and parallel jackknife
//! - `config`: estimator settings

pub mod config;
pub mod error;
pub mod estimator;
pub mod metrics;
pub mod population;
pub mod utils;

// Re-export commonly used types
pub use config::EstimatorConfig;
pub use error::{DissimilarityError, Result};
pub use estimator::{estimate_from_sample, DissimilarityEstimator, PointEstimate, SampleEstimate};
pub use metrics::*;
pub use population::{normalize, normalize_optional, Population, Site, Species};
pub use utils::{Estimate, JackknifeEstimator};
