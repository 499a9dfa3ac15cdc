//! Decision tree structures for the attrition ensemble
//!
//! Nodes are stored flat; node 0 is the root. Every node records its
//! `cover` (summed training weight that reached it), which the attribution
//! engine needs to weigh unobserved branches.

use serde::{Deserialize, Serialize};

/// A decision tree node (internal or leaf)
///
/// For internal nodes:
/// - `feature_idx >= 0`: index into the encoded row
/// - `left` and `right` point to child node indices
/// - `leaf` is `None`
///
/// For leaf nodes:
/// - `feature_idx == -1`
/// - `leaf` contains the margin contribution
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Node {
    /// Node ID (for reference, not used in traversal)
    pub id: i32,

    /// Left child index (-1 for leaf nodes)
    pub left: i32,

    /// Right child index (-1 for leaf nodes)
    pub right: i32,

    /// Feature index to split on (-1 for leaf nodes)
    #[serde(rename = "feature_idx", alias = "feature")]
    pub feature_idx: i32,

    /// Split threshold; rows with `value <= threshold` go left
    pub threshold: f64,

    /// Leaf value in log-odds (Some for leaf nodes, None for internal nodes)
    pub leaf: Option<f64>,

    /// Summed training weight that reached this node
    pub cover: f64,
}

impl Node {
    /// Create a new internal (split) node
    pub fn internal(id: i32, feature_idx: i32, threshold: f64, left: i32, right: i32, cover: f64) -> Self {
        Self {
            id,
            left,
            right,
            feature_idx,
            threshold,
            leaf: None,
            cover,
        }
    }

    /// Create a new leaf node
    pub fn leaf(id: i32, value: f64, cover: f64) -> Self {
        Self {
            id,
            left: -1,
            right: -1,
            feature_idx: -1,
            threshold: 0.0,
            leaf: Some(value),
            cover,
        }
    }

    /// Check if this node is a leaf
    pub fn is_leaf(&self) -> bool {
        self.feature_idx == -1 || self.leaf.is_some()
    }

    /// Get the leaf value if this is a leaf node
    pub fn leaf_value(&self) -> Option<f64> {
        self.leaf
    }

    /// Child taken by a row with `value` for this node's split feature
    pub fn next_child(&self, value: f64) -> i32 {
        if value <= self.threshold {
            self.left
        } else {
            self.right
        }
    }
}

/// A single regression tree contributing to the ensemble margin
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Tree {
    /// Tree nodes (node 0 is the root)
    pub nodes: Vec<Node>,
}

impl Tree {
    pub fn new(nodes: Vec<Node>) -> Self {
        Self { nodes }
    }

    /// Evaluate this tree on an encoded row
    ///
    /// Returns 0.0 for structurally broken trees; `validate` rejects those
    /// at load time so the fallback is never hit for loaded models.
    pub fn evaluate(&self, features: &[f64]) -> f64 {
        let mut idx = 0usize;

        loop {
            let Some(node) = self.nodes.get(idx) else {
                return 0.0;
            };

            if node.is_leaf() {
                return node.leaf_value().unwrap_or(0.0);
            }

            let Some(&value) = features.get(node.feature_idx as usize) else {
                return 0.0;
            };

            let next = node.next_child(value);
            if next < 0 {
                return 0.0;
            }
            idx = next as usize;
        }
    }

    /// Cover-weighted mean of the leaf values (the tree's expected output)
    ///
    /// Expects a tree that passed `validate`.
    pub fn expected_value(&self) -> f64 {
        match self.nodes.first() {
            Some(root) if root.cover > 0.0 => self.subtree_expectation(0),
            _ => 0.0,
        }
    }

    fn subtree_expectation(&self, idx: usize) -> f64 {
        let node = &self.nodes[idx];
        if node.is_leaf() {
            return node.leaf_value().unwrap_or(0.0);
        }
        let left = &self.nodes[node.left as usize];
        let right = &self.nodes[node.right as usize];
        if node.cover <= 0.0 {
            return 0.0;
        }
        (left.cover * self.subtree_expectation(node.left as usize)
            + right.cover * self.subtree_expectation(node.right as usize))
            / node.cover
    }

    /// Validate tree structure against the width of the encoded rows
    pub fn validate(&self, feature_count: usize) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("Tree has no nodes".to_string());
        }

        for (i, node) in self.nodes.iter().enumerate() {
            if !node.cover.is_finite() || node.cover <= 0.0 {
                return Err(format!("Node {} has invalid cover: {}", i, node.cover));
            }

            if node.is_leaf() {
                match node.leaf {
                    Some(value) if value.is_finite() => {}
                    Some(value) => return Err(format!("Leaf node {i} has non-finite value {value}")),
                    None => return Err(format!("Leaf node {i} has no leaf value")),
                }
                continue;
            }

            if node.left == node.right {
                return Err(format!("Node {} has identical children", i));
            }

            // Children must come after their parent, which also rules out cycles.
            for (side, child) in [("left", node.left), ("right", node.right)] {
                if child <= i as i32 || child as usize >= self.nodes.len() {
                    return Err(format!("Node {} has invalid {} child: {}", i, side, child));
                }
            }

            let children_cover =
                self.nodes[node.left as usize].cover + self.nodes[node.right as usize].cover;
            if (children_cover - node.cover).abs() > 1e-6 * node.cover.max(1.0) {
                return Err(format!(
                    "Node {} cover {} does not match its children ({})",
                    i, node.cover, children_cover
                ));
            }

            if node.feature_idx < 0 || node.feature_idx as usize >= feature_count {
                return Err(format!(
                    "Internal node {} has invalid feature index: {}",
                    i, node.feature_idx
                ));
            }

            if !node.threshold.is_finite() {
                return Err(format!("Internal node {i} has non-finite threshold"));
            }
        }

        Ok(())
    }
}
