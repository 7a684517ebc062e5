//! Shared data generators for the index benchmarks
//!
//! Populations come in two flavours:
//! - **uniform**: every filter sets random bits anywhere in the shape
//! - **clustered**: filters share one of a few base patterns plus noise,
//!   which is where aggregate pruning pays off
//!
//! All generators are seeded so runs are comparable.
#![allow(dead_code)]

use bloomindex::core::{Filter, Shape};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Population sizes exercised by every group.
pub const SIZES: &[usize] = &[1_000, 10_000];

/// Filter width used across benchmarks.
pub const BITS: u32 = 512;

/// Hash count used across benchmarks.
pub const HASHES: u32 = 4;

/// Bits set per stored filter (≈ 8 items at `HASHES` hashes).
pub const FILTER_WEIGHT: usize = 32;

/// Bits set per query filter (one item).
pub const QUERY_WEIGHT: usize = HASHES as usize;

/// Shape shared by all benchmark filters.
pub fn shape() -> Shape {
    Shape::new(BITS, HASHES).expect("valid benchmark shape")
}

fn random_filter(rng: &mut StdRng, weight: usize) -> Filter {
    let indices: Vec<u32> = (0..weight).map(|_| rng.gen_range(0..BITS)).collect();
    Filter::from_indices(shape(), indices).expect("indices below BITS")
}

/// `count` filters with independent random bits.
pub fn uniform_population(count: usize, seed: u64) -> Vec<Filter> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count).map(|_| random_filter(&mut rng, FILTER_WEIGHT)).collect()
}

/// `count` filters drawn around `clusters` base patterns.
pub fn clustered_population(count: usize, clusters: usize, seed: u64) -> Vec<Filter> {
    let mut rng = StdRng::seed_from_u64(seed);
    let bases: Vec<Filter> = (0..clusters)
        .map(|_| random_filter(&mut rng, FILTER_WEIGHT / 2))
        .collect();
    (0..count)
        .map(|i| {
            let mut f = bases[i % clusters].clone();
            f.merge(&random_filter(&mut rng, FILTER_WEIGHT / 2));
            f
        })
        .collect()
}

/// Query filters: half taken as sub-patterns of stored filters, half random.
pub fn queries(population: &[Filter], count: usize, seed: u64) -> Vec<Filter> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|i| {
            if i % 2 == 0 && !population.is_empty() {
                let source = &population[rng.gen_range(0..population.len())];
                let bits: Vec<u32> = source
                    .iter_ones()
                    .take(QUERY_WEIGHT)
                    .map(|b| b as u32)
                    .collect();
                Filter::from_indices(shape(), bits).expect("indices below BITS")
            } else {
                random_filter(&mut rng, QUERY_WEIGHT)
            }
        })
        .collect()
}
