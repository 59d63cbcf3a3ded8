//! Utility modules shared across metrics
//!
//! - Species counting: incidence frequency of each species across sites
//! - Estimates: point estimate container and jackknife replicate collector

pub mod estimate;
pub mod species_counter;

// Re-export commonly used types
pub use estimate::{is_unit_interval, Estimate, JackknifeEstimator};
pub use species_counter::{count_species_occurrences, species_with_frequency};
