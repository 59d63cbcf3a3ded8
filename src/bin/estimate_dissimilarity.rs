//! Multi-site dissimilarity report for one population file
//!
//! Usage:
//!   estimate_dissimilarity <population.json> [estimator_config.json] [--json]
//!
//! Paths fall back to the POPULATION_JSON and ESTIMATOR_CONFIG environment
//! variables. Without an estimator config only the census indices are
//! reported; with one, the file is treated as a sample of a larger population.

use anyhow::{Context, Result};
use beta_diversity_rust::{
    adapted_indices, chao2, pairwise_dissimilarity, raw_indices, DissimilarityEstimator,
    EstimatorConfig, IndexPair, Population,
};
use serde::Serialize;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Serialize)]
struct Report {
    n_sites: usize,
    raw: IndexPair,
    adapted: IndexPair,
    chao2: beta_diversity_rust::Chao2Estimate,
    sample_estimate: Option<beta_diversity_rust::SampleEstimate>,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "beta_diversity_rust=info,warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut args: Vec<String> = std::env::args().skip(1).collect();
    let as_json = args.iter().any(|a| a == "--json");
    args.retain(|a| a != "--json");

    let population_path = args
        .first()
        .cloned()
        .or_else(|| std::env::var("POPULATION_JSON").ok())
        .map(PathBuf::from)
        .context("Population file required (argument or POPULATION_JSON)")?;

    let config_path = args
        .get(1)
        .cloned()
        .or_else(|| std::env::var("ESTIMATOR_CONFIG").ok())
        .map(PathBuf::from);

    tracing::info!("Loading population: {:?}", population_path);
    let population = Population::load_json(&population_path)?;

    let config = config_path
        .as_deref()
        .map(EstimatorConfig::load)
        .transpose()?;

    let raw = raw_indices(&population)?;
    let adapted = adapted_indices(&population)?;
    let richness = chao2(&population)?;

    let sample_estimate = match config {
        Some(config) => Some(DissimilarityEstimator::new(config).estimate(&population)?),
        None => None,
    };

    if as_json {
        let report = Report {
            n_sites: population.len(),
            raw,
            adapted,
            chao2: richness,
            sample_estimate,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("\n{}", "=".repeat(80));
    println!("MULTI-SITE DISSIMILARITY");
    println!("{}", "=".repeat(80));
    println!("  Sites: {}", population.len());
    println!("  Observed species: {}", richness.observed);

    println!("\nCensus indices:");
    println!("  {:<10} {:>10} {:>10} {:>12}", "", "Simpson", "Sorensen", "Nestedness");
    for (label, idx) in [("raw", raw), ("adapted", adapted)] {
        println!(
            "  {:<10} {:>10.6} {:>10.6} {:>12.6}{}",
            label,
            idx.simpson,
            idx.sorensen,
            idx.nestedness(),
            if idx.is_stable() { "" } else { "  (unstable)" }
        );
    }

    println!("\nChao2 richness:");
    println!("  Estimate: {:.3} (variance {:.3})", richness.mean(), richness.variance());
    println!(
        "  Singletons: {}, doubletons: {}{}",
        richness.singletons,
        richness.doubletons,
        if richness.bias_corrected() { " (bias-corrected form)" } else { "" }
    );

    if let Some(est) = sample_estimate {
        println!("\nSample estimate (N = {}):", est.population_size);
        for (label, e) in [("Simpson", est.simpson), ("Sorensen", est.sorensen)] {
            match e.std_error() {
                Some(se) => println!("  {:<10} {:.6} ± {:.6}", label, e.mean, se),
                None => println!("  {:<10} {:.6}", label, e.mean),
            }
            if e.degenerate {
                println!("  WARNING: {} estimate outside [0, 1]", label);
            }
        }
        println!("  Jackknife replicates: {}", est.n_replicates);
    }

    let pairs = pairwise_dissimilarity(&population);
    if !pairs.is_empty() {
        let most = pairs
            .iter()
            .filter(|p| p.sorensen.is_finite())
            .max_by(|a, b| a.sorensen.total_cmp(&b.sorensen));
        if let Some(p) = most {
            println!(
                "\nMost dissimilar pair: {} / {} (Sorensen {:.4}, Simpson {:.4})",
                p.site_a, p.site_b, p.sorensen, p.simpson
            );
        }
    }

    println!();
    Ok(())
}
