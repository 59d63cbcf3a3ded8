//! Estimator settings
//!
//! Loaded once (JSON or built in code) and handed to `DissimilarityEstimator`.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Settings for estimating population indices from a sample of sites
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EstimatorConfig {
    /// Number of sites (N) in the population the sample was drawn from
    pub population_size: usize,
    /// Compute a delete-1 jackknife variance for the indices
    #[serde(default = "default_true")]
    pub jackknife: bool,
    /// Run jackknife replicates on the rayon thread pool
    #[serde(default = "default_true")]
    pub parallel: bool,
}

fn default_true() -> bool {
    true
}

impl EstimatorConfig {
    pub fn new(population_size: usize) -> Self {
        Self {
            population_size,
            jackknife: true,
            parallel: true,
        }
    }

    pub fn with_jackknife(mut self, jackknife: bool) -> Self {
        self.jackknife = jackknife;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Load settings from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read estimator config: {:?}", path))?;

        let config: EstimatorConfig = serde_json::from_str(&contents)
            .with_context(|| "Failed to parse estimator config JSON")?;

        if config.population_size == 0 {
            anyhow::bail!("population_size must be at least 1 in {:?}", path);
        }

        Ok(config)
    }
}
