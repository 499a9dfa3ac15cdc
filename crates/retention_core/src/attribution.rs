//! Per-prediction feature attributions for the tree ensemble
//!
//! `TreeShapExplainer` implements exact path-dependent TreeSHAP
//! (Lundberg, Erion & Lee, "Consistent Individualized Feature Attribution
//! for Tree Ensembles", Algorithm 2). For a single row the values satisfy
//!
//! ```text
//! base_value + Σ φ_i == model.margin(row)
//! ```
//!
//! where `base_value` is the cover-weighted expected margin. Attributions
//! live in log-odds space: positive values push towards attrition.

use crate::encoding::EncodedRow;
use crate::errors::{Result, RetentionError};
use crate::gbdt::{Model, Tree};
use crate::schema::SchemaRegistry;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Produces one signed contribution per feature for a single row
pub trait Attributor {
    fn attribute(&self, row: &EncodedRow, registry: &SchemaRegistry) -> Result<AttributionVector>;
}

/// Signed per-feature contributions for one prediction, in registry order
#[derive(Debug, Clone, PartialEq)]
pub struct AttributionVector {
    values: Vec<f64>,
    base_value: f64,
    fingerprint: String,
}

/// A single named attribution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureAttribution {
    pub feature: String,
    pub value: f64,
}

impl AttributionVector {
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Expected margin the contributions are measured against
    pub fn base_value(&self) -> f64 {
        self.base_value
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// `base_value + Σ φ`, equal to the explained row's margin
    pub fn total(&self) -> f64 {
        self.base_value + self.values.iter().sum::<f64>()
    }

    /// Fail unless this vector was produced against `registry`
    pub fn ensure_aligned(&self, registry: &SchemaRegistry) -> Result<()> {
        if self.values.len() != registry.len() {
            return Err(RetentionError::SchemaMismatch(format!(
                "attribution vector has {} values, schema has {} features",
                self.values.len(),
                registry.len()
            )));
        }
        if self.fingerprint != registry.fingerprint() {
            return Err(RetentionError::SchemaMismatch(
                "attribution vector was computed against a different schema".to_string(),
            ));
        }
        Ok(())
    }

    /// Pair every value with its feature name
    pub fn named(&self, registry: &SchemaRegistry) -> Result<Vec<FeatureAttribution>> {
        self.ensure_aligned(registry)?;
        Ok(registry
            .iter()
            .zip(&self.values)
            .map(|(feature, value)| FeatureAttribution {
                feature: feature.to_string(),
                value: *value,
            })
            .collect())
    }

    /// The `n` largest attributions of any sign, largest first
    pub fn top_drivers(&self, registry: &SchemaRegistry, n: usize) -> Result<Vec<FeatureAttribution>> {
        let mut named = self.named(registry)?;
        sort_descending(&mut named);
        named.truncate(n);
        Ok(named)
    }

    /// The `k` largest strictly positive attributions, largest first
    pub fn risk_drivers(&self, registry: &SchemaRegistry, k: usize) -> Result<Vec<FeatureAttribution>> {
        let mut positive: Vec<FeatureAttribution> = self
            .named(registry)?
            .into_iter()
            .filter(|a| a.value > 0.0)
            .collect();
        sort_descending(&mut positive);
        positive.truncate(k);
        Ok(positive)
    }
}

// Stable, so equal values keep registry order.
fn sort_descending(items: &mut [FeatureAttribution]) {
    items.sort_by(|a, b| b.value.partial_cmp(&a.value).unwrap_or(Ordering::Equal));
}

/// Exact TreeSHAP over a logistic GBDT model
pub struct TreeShapExplainer<'a> {
    model: &'a Model,
}

impl<'a> TreeShapExplainer<'a> {
    pub fn new(model: &'a Model) -> Self {
        Self { model }
    }

    fn explain_tree(&self, tree: &Tree, row: &[f64], phi: &mut [f64]) {
        if tree.nodes.is_empty() {
            return;
        }
        let mut walker = PathWalker { tree, row, phi };
        walker.recurse(0, &[], 0, 1.0, 1.0, ROOT_FEATURE);
    }
}

impl Attributor for TreeShapExplainer<'_> {
    fn attribute(&self, row: &EncodedRow, registry: &SchemaRegistry) -> Result<AttributionVector> {
        row.ensure_aligned(registry)?;

        if self.model.feature_count != registry.len()
            || self.model.schema_fingerprint != registry.fingerprint()
        {
            return Err(RetentionError::SchemaMismatch(format!(
                "model was trained on a {}-feature schema that differs from the registry ({} features)",
                self.model.feature_count,
                registry.len()
            )));
        }

        let mut phi = vec![0.0; registry.len()];
        for tree in &self.model.trees {
            self.explain_tree(tree, row.values(), &mut phi);
        }

        if let Some(idx) = phi.iter().position(|v| !v.is_finite()) {
            return Err(RetentionError::Inference(format!(
                "non-finite attribution for feature {}",
                registry.name(idx).unwrap_or("?")
            )));
        }

        let vector = AttributionVector {
            values: phi,
            base_value: self.model.expected_margin(),
            fingerprint: registry.fingerprint().to_string(),
        };
        vector.ensure_aligned(registry)?;
        Ok(vector)
    }
}

/// Feature id of the sentinel element at the start of every path
const ROOT_FEATURE: i32 = -1;

#[derive(Debug, Clone, Copy)]
struct PathElement {
    feature: i32,
    zero_fraction: f64,
    one_fraction: f64,
    weight: f64,
}

impl Default for PathElement {
    fn default() -> Self {
        Self {
            feature: ROOT_FEATURE,
            zero_fraction: 0.0,
            one_fraction: 0.0,
            weight: 0.0,
        }
    }
}

struct PathWalker<'t, 'p> {
    tree: &'t Tree,
    row: &'t [f64],
    phi: &'p mut [f64],
}

impl PathWalker<'_, '_> {
    fn recurse(
        &mut self,
        node_idx: usize,
        parent_path: &[PathElement],
        depth: usize,
        zero_fraction: f64,
        one_fraction: f64,
        feature: i32,
    ) {
        let mut path = Vec::with_capacity(depth + 1);
        path.extend_from_slice(&parent_path[..depth]);
        path.push(PathElement::default());
        extend_path(&mut path, depth, zero_fraction, one_fraction, feature);

        let node = &self.tree.nodes[node_idx];
        if node.is_leaf() {
            let leaf = node.leaf_value().unwrap_or(0.0);
            for i in 1..=depth {
                let weight = unwound_path_sum(&path, depth, i);
                let element = path[i];
                self.phi[element.feature as usize] +=
                    weight * (element.one_fraction - element.zero_fraction) * leaf;
            }
            return;
        }

        let split = node.feature_idx;
        let hot = node.next_child(self.row[split as usize]);
        let cold = if hot == node.left { node.right } else { node.left };
        let (hot, cold) = (hot as usize, cold as usize);

        let hot_zero_fraction = self.tree.nodes[hot].cover / node.cover;
        let cold_zero_fraction = self.tree.nodes[cold].cover / node.cover;

        // A feature already on the path is unwound so it is counted once.
        let mut depth = depth;
        let mut incoming_zero = 1.0;
        let mut incoming_one = 1.0;
        if let Some(k) = (1..=depth).find(|&k| path[k].feature == split) {
            incoming_zero = path[k].zero_fraction;
            incoming_one = path[k].one_fraction;
            unwind_path(&mut path, depth, k);
            depth -= 1;
        }

        self.recurse(
            hot,
            &path,
            depth + 1,
            hot_zero_fraction * incoming_zero,
            incoming_one,
            split,
        );
        self.recurse(
            cold,
            &path,
            depth + 1,
            cold_zero_fraction * incoming_zero,
            0.0,
            split,
        );
    }
}

fn extend_path(path: &mut [PathElement], depth: usize, zero_fraction: f64, one_fraction: f64, feature: i32) {
    path[depth] = PathElement {
        feature,
        zero_fraction,
        one_fraction,
        weight: if depth == 0 { 1.0 } else { 0.0 },
    };

    let d = depth as f64;
    for i in (0..depth).rev() {
        let fi = i as f64;
        path[i + 1].weight += one_fraction * path[i].weight * (fi + 1.0) / (d + 1.0);
        path[i].weight = zero_fraction * path[i].weight * (d - fi) / (d + 1.0);
    }
}

fn unwind_path(path: &mut [PathElement], depth: usize, index: usize) {
    let one_fraction = path[index].one_fraction;
    let zero_fraction = path[index].zero_fraction;
    let d = depth as f64;
    let mut next_one_portion = path[depth].weight;

    for i in (0..depth).rev() {
        let fi = i as f64;
        if one_fraction != 0.0 {
            let previous = path[i].weight;
            path[i].weight = next_one_portion * (d + 1.0) / ((fi + 1.0) * one_fraction);
            next_one_portion = previous - path[i].weight * zero_fraction * (d - fi) / (d + 1.0);
        } else {
            path[i].weight = path[i].weight * (d + 1.0) / (zero_fraction * (d - fi));
        }
    }

    for i in index..depth {
        path[i].feature = path[i + 1].feature;
        path[i].zero_fraction = path[i + 1].zero_fraction;
        path[i].one_fraction = path[i + 1].one_fraction;
    }
}

fn unwound_path_sum(path: &[PathElement], depth: usize, index: usize) -> f64 {
    let one_fraction = path[index].one_fraction;
    let zero_fraction = path[index].zero_fraction;
    let d = depth as f64;
    let mut next_one_portion = path[depth].weight;
    let mut total = 0.0;

    for i in (0..depth).rev() {
        let fi = i as f64;
        if one_fraction != 0.0 {
            let portion = next_one_portion * (d + 1.0) / ((fi + 1.0) * one_fraction);
            total += portion;
            next_one_portion = path[i].weight - portion * zero_fraction * ((d - fi) / (d + 1.0));
        } else {
            total += (path[i].weight / zero_fraction) / ((d - fi) / (d + 1.0));
        }
    }

    total
}
