//! CART (Classification and Regression Tree) builder
//!
//! Deterministic exact-greedy construction of one boosting round's tree
//! from per-row gradients and hessians of the logistic loss. Thresholds are
//! midpoints between consecutive distinct feature values. Every node
//! records its cover (summed sample weight), which the attribution engine
//! relies on.

use retention_core::gbdt::{Node, Tree};

use crate::deterministic::SplitTieBreaker;

/// Training parameters for a single tree
#[derive(Clone, Debug)]
pub struct TreeConfig {
    pub max_depth: usize,
    /// L2 regularization on leaf values
    pub lambda: f64,
    /// Minimum hessian sum on each side of a split
    pub min_child_weight: f64,
    /// Shrinkage folded into the leaf values
    pub learning_rate: f64,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            max_depth: 3,
            lambda: 1.0,
            min_child_weight: 1.0,
            learning_rate: 0.01,
        }
    }
}

/// Per-row training signal
#[derive(Clone, Copy, Debug)]
struct Stats {
    gradient: f64,
    hessian: f64,
    weight: f64,
}

impl Stats {
    const ZERO: Stats = Stats {
        gradient: 0.0,
        hessian: 0.0,
        weight: 0.0,
    };

    fn add(&mut self, other: Stats) {
        self.gradient += other.gradient;
        self.hessian += other.hessian;
        self.weight += other.weight;
    }

    fn minus(self, other: Stats) -> Stats {
        Stats {
            gradient: self.gradient - other.gradient,
            hessian: self.hessian - other.hessian,
            weight: self.weight - other.weight,
        }
    }
}

/// Split candidate with gain and tie-breaker
#[derive(Debug, Clone)]
struct SplitCandidate {
    feature_idx: usize,
    threshold: f64,
    gain: f64,
    tie_breaker: SplitTieBreaker,
}

impl SplitCandidate {
    fn new(feature_idx: usize, threshold: f64, gain: f64, node_id: usize) -> Self {
        Self {
            feature_idx,
            threshold,
            gain,
            tie_breaker: SplitTieBreaker::new(feature_idx, threshold, node_id),
        }
    }

    fn beats(&self, other: &SplitCandidate) -> bool {
        self.gain > other.gain || (self.gain == other.gain && self.tie_breaker < other.tie_breaker)
    }
}

/// Build a regression tree using exact-greedy CART algorithm
pub struct CartBuilder<'a> {
    config: TreeConfig,
    features: &'a [Vec<f64>],
    stats: Vec<Stats>,
    feature_count: usize,
}

impl<'a> CartBuilder<'a> {
    /// `gradients`, `hessians` and `weights` are indexed like `features`
    pub fn new(
        features: &'a [Vec<f64>],
        gradients: &[f64],
        hessians: &[f64],
        weights: &[f64],
        config: TreeConfig,
    ) -> Self {
        let stats = gradients
            .iter()
            .zip(hessians)
            .zip(weights)
            .map(|((&gradient, &hessian), &weight)| Stats {
                gradient,
                hessian,
                weight,
            })
            .collect();

        let feature_count = features.first().map(Vec::len).unwrap_or(0);

        Self {
            config,
            features,
            stats,
            feature_count,
        }
    }

    /// Build a tree over the given rows
    pub fn build(&self, indices: &[usize]) -> Tree {
        let mut nodes = Vec::new();
        self.build_node(indices, 0, &mut nodes, 0);
        Tree::new(nodes)
    }

    /// Recursively build tree nodes in pre-order
    fn build_node(&self, indices: &[usize], depth: usize, nodes: &mut Vec<Node>, node_id: usize) -> i32 {
        let current_idx = nodes.len() as i32;
        let total = self.sum_stats(indices);

        let split = if depth < self.config.max_depth {
            self.find_best_split(indices, total, node_id)
        } else {
            None
        };

        let Some(split) = split else {
            nodes.push(Node::leaf(current_idx, self.leaf_value(total), total.weight));
            return current_idx;
        };

        let (left, right) = self.split_samples(indices, split.feature_idx, split.threshold);

        // Reserve space for current node
        nodes.push(Node::internal(
            current_idx,
            split.feature_idx as i32,
            split.threshold,
            -1,
            -1,
            total.weight,
        ));

        let left_idx = self.build_node(&left, depth + 1, nodes, node_id * 2 + 1);
        let right_idx = self.build_node(&right, depth + 1, nodes, node_id * 2 + 2);

        // Children covers were summed separately; keep the parent exactly equal.
        let cover = nodes[left_idx as usize].cover + nodes[right_idx as usize].cover;
        let node = &mut nodes[current_idx as usize];
        node.left = left_idx;
        node.right = right_idx;
        node.cover = cover;

        current_idx
    }

    /// Find best split using exact-greedy algorithm
    fn find_best_split(&self, indices: &[usize], total: Stats, node_id: usize) -> Option<SplitCandidate> {
        let mut best: Option<SplitCandidate> = None;
        let parent_score = self.score(total);

        for feature_idx in 0..self.feature_count {
            let mut sorted = indices.to_vec();
            sorted.sort_by(|&a, &b| {
                self.features[a][feature_idx]
                    .total_cmp(&self.features[b][feature_idx])
                    .then(a.cmp(&b))
            });

            let mut left = Stats::ZERO;
            for pair in sorted.windows(2) {
                left.add(self.stats[pair[0]]);

                let lo = self.features[pair[0]][feature_idx];
                let hi = self.features[pair[1]][feature_idx];
                if lo == hi {
                    continue;
                }

                let right = total.minus(left);
                if left.hessian < self.config.min_child_weight
                    || right.hessian < self.config.min_child_weight
                {
                    continue;
                }

                let gain = self.score(left) + self.score(right) - parent_score;
                if gain <= 1e-12 {
                    continue;
                }

                let candidate = SplitCandidate::new(feature_idx, midpoint(lo, hi), gain, node_id);
                let better = match &best {
                    Some(current) => candidate.beats(current),
                    None => true,
                };
                if better {
                    best = Some(candidate);
                }
            }
        }

        best
    }

    /// Split samples based on threshold
    fn split_samples(&self, indices: &[usize], feature_idx: usize, threshold: f64) -> (Vec<usize>, Vec<usize>) {
        indices
            .iter()
            .copied()
            .partition(|&idx| self.features[idx][feature_idx] <= threshold)
    }

    /// Structure score G² / (H + λ)
    fn score(&self, stats: Stats) -> f64 {
        stats.gradient * stats.gradient / (stats.hessian + self.config.lambda)
    }

    fn sum_stats(&self, indices: &[usize]) -> Stats {
        let mut total = Stats::ZERO;
        for &idx in indices {
            total.add(self.stats[idx]);
        }
        total
    }

    /// Optimal leaf value -G / (H + λ), shrunk by the learning rate
    fn leaf_value(&self, stats: Stats) -> f64 {
        let denom = stats.hessian + self.config.lambda;
        if denom <= 0.0 {
            return 0.0;
        }
        -self.config.learning_rate * stats.gradient / denom
    }
}

/// Threshold between two consecutive distinct values that sends `lo` left
/// and `hi` right
fn midpoint(lo: f64, hi: f64) -> f64 {
    let mid = lo + (hi - lo) / 2.0;
    if mid < hi {
        mid
    } else {
        lo
    }
}
