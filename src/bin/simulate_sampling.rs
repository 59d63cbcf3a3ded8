//! Sampling simulation against a census population
//!
//! Draws repeated random samples of sites from a census population, runs the
//! sample estimator on each, and compares the estimates with the census
//! adapted indices (bias and 95% interval coverage).
//!
//! Usage:
//!   simulate_sampling <census.json> [sample_size] [replicates] [seed]
//!
//! Defaults: sample_size = 10, replicates = 200, seed = 42.

use anyhow::{Context, Result};
use beta_diversity_rust::{adapted_indices, DissimilarityEstimator, EstimatorConfig, Population};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rayon::prelude::*;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn arg_or<T: std::str::FromStr>(args: &[String], idx: usize, default: T) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match args.get(idx) {
        Some(raw) => raw
            .parse()
            .with_context(|| format!("Invalid argument #{}: {}", idx + 1, raw)),
        None => Ok(default),
    }
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "beta_diversity_rust=error,warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let census_path = args
        .first()
        .cloned()
        .or_else(|| std::env::var("POPULATION_JSON").ok())
        .map(PathBuf::from)
        .context("Census population file required (argument or POPULATION_JSON)")?;
    let sample_size: usize = arg_or(&args, 1, 10)?;
    let replicates: usize = arg_or(&args, 2, 200)?;
    let seed: u64 = arg_or(&args, 3, 42)?;

    println!("\n{}", "=".repeat(80));
    println!("SAMPLING SIMULATION");
    println!("{}", "=".repeat(80));

    let total_start = Instant::now();

    // ========================================================================
    // Step 1: Census reference
    // ========================================================================
    println!("\nStep 1: Loading census population...");
    let census = Population::load_json(&census_path)?;
    let population_size = census.len();
    if sample_size < 3 || sample_size > population_size {
        anyhow::bail!(
            "Sample size must lie in 3..={} (census size), got {}",
            population_size,
            sample_size
        );
    }

    let truth = adapted_indices(&census)?;
    println!("  Sites: {}", population_size);
    println!("  Adapted Simpson: {:.6}", truth.simpson);
    println!("  Adapted Sorensen: {:.6}", truth.sorensen);

    // ========================================================================
    // Step 2: Estimate from random samples in parallel
    // ========================================================================
    println!("\nStep 2: Estimating from {} samples of {} sites...", replicates, sample_size);
    let estimator = DissimilarityEstimator::new(
        EstimatorConfig::new(population_size).with_parallel(false),
    );
    let site_ids: Vec<&str> = census.site_ids().collect();
    let progress = AtomicUsize::new(0);

    let estimates = (0..replicates)
        .into_par_iter()
        .map(|r| {
            let mut rng = StdRng::seed_from_u64(seed.wrapping_add(r as u64));
            let chosen: Vec<&str> = site_ids
                .choose_multiple(&mut rng, sample_size)
                .copied()
                .collect();
            let sample = census.subset(chosen);

            let count = progress.fetch_add(1, Ordering::Relaxed) + 1;
            if count % 50 == 0 || count == replicates {
                eprint!("\r  Progress: {}/{}", count, replicates);
            }

            estimator.estimate(&sample)
        })
        .collect::<beta_diversity_rust::Result<Vec<_>>>()?;
    eprintln!();

    // ========================================================================
    // Step 3: Bias and coverage
    // ========================================================================
    println!("\nStep 3: Summary");
    println!("  {:<10} {:>10} {:>10} {:>10} {:>10}", "", "Truth", "Mean", "Bias", "Coverage");

    for (label, true_value, pick) in [
        ("Simpson", truth.simpson, 0usize),
        ("Sorensen", truth.sorensen, 1usize),
    ] {
        let values: Vec<_> = estimates
            .iter()
            .map(|e| if pick == 0 { e.simpson } else { e.sorensen })
            .filter(|e| e.is_stable())
            .collect();

        if values.is_empty() {
            println!("  {:<10} no stable estimate", label);
            continue;
        }

        let mean = values.iter().map(|e| e.mean).sum::<f64>() / values.len() as f64;
        let covered = values
            .iter()
            .filter(|e| match e.std_error() {
                Some(se) => (e.mean - true_value).abs() <= 1.96 * se,
                None => false,
            })
            .count();

        println!(
            "  {:<10} {:>10.6} {:>10.6} {:>10.6} {:>9.1}%",
            label,
            true_value,
            mean,
            mean - true_value,
            covered as f64 / values.len() as f64 * 100.0
        );

        let unstable = replicates - values.len();
        if unstable > 0 {
            println!("  ({} unstable {} estimates excluded)", unstable, label);
        }
    }

    println!("\nTotal time: {:.2}s", total_start.elapsed().as_secs_f64());
    println!();
    Ok(())
}
