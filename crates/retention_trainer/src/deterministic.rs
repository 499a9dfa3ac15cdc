//! Deterministic utilities for reproducible training
//!
//! Provides an LCG-based RNG for row subsampling and the tie-breaking key
//! used when two splits have the same gain, so identical inputs always
//! yield identical trees.

use std::cmp::Ordering;
use std::num::Wrapping;

/// Linear Congruential Generator for deterministic pseudo-randomness
/// Uses constants from Numerical Recipes (glibc)
#[derive(Clone, Debug)]
pub struct LcgRng {
    state: Wrapping<u64>,
}

impl LcgRng {
    // LCG constants (compatible with glibc)
    const MULTIPLIER: u64 = 1103515245;
    const INCREMENT: u64 = 12345;
    const MODULUS: u64 = 1 << 31;

    pub fn new(seed: u64) -> Self {
        Self {
            state: Wrapping(seed % Self::MODULUS),
        }
    }

    /// Generate next random value in range [0, MODULUS)
    pub fn next_u64(&mut self) -> u64 {
        self.state = self.state * Wrapping(Self::MULTIPLIER) + Wrapping(Self::INCREMENT);
        self.state.0 & (Self::MODULUS - 1)
    }

    /// Generate random value in range [0, max)
    pub fn next_range(&mut self, max: u64) -> u64 {
        if max == 0 {
            return 0;
        }
        self.next_u64() % max
    }

    /// Uniform value in [0.0, 1.0)
    pub fn next_f64(&mut self) -> f64 {
        self.next_u64() as f64 / Self::MODULUS as f64
    }
}

/// Bernoulli row sample keeping each index with probability `fraction`
///
/// Falls back to every row when the draw comes out empty.
pub fn subsample_indices(n: usize, fraction: f64, rng: &mut LcgRng) -> Vec<usize> {
    if fraction >= 1.0 {
        return (0..n).collect();
    }
    let sample: Vec<usize> = (0..n).filter(|_| rng.next_f64() < fraction).collect();
    if sample.is_empty() {
        (0..n).collect()
    } else {
        sample
    }
}

/// Deterministic tie-breaker for split selection
/// Orders by (feature_idx, threshold, node_id)
#[derive(Debug, Clone, Copy)]
pub struct SplitTieBreaker {
    pub feature_idx: usize,
    pub threshold: f64,
    pub node_id: usize,
}

impl SplitTieBreaker {
    pub fn new(feature_idx: usize, threshold: f64, node_id: usize) -> Self {
        Self {
            feature_idx,
            threshold,
            node_id,
        }
    }
}

impl PartialEq for SplitTieBreaker {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for SplitTieBreaker {}

impl PartialOrd for SplitTieBreaker {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SplitTieBreaker {
    fn cmp(&self, other: &Self) -> Ordering {
        self.feature_idx
            .cmp(&other.feature_idx)
            .then(self.threshold.total_cmp(&other.threshold))
            .then(self.node_id.cmp(&other.node_id))
    }
}
