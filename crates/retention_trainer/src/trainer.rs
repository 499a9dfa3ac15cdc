//! Gradient Boosted Decision Tree (GBDT) trainer
//!
//! Binary logistic loss with a positive-class weight, deterministic row
//! subsampling and exact-greedy CART splits.

use anyhow::{bail, Result};
use retention_core::config::TrainingConfig;
use retention_core::gbdt::{logit, sigmoid, Model, ModelMetadata};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::cart::{CartBuilder, TreeConfig};
use crate::dataset::Dataset;
use crate::deterministic::{subsample_indices, LcgRng};

/// Lower bound on per-row hessians
const MIN_HESSIAN: f64 = 1e-16;

/// GBDT training configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GbdtConfig {
    pub n_estimators: usize,
    pub max_depth: usize,
    pub learning_rate: f64,
    /// Fraction of rows sampled for each tree
    pub subsample: f64,
    /// Weight of rows with target 1
    pub positive_weight: f64,
    pub seed: u64,
    pub lambda: f64,
    pub min_child_weight: f64,
}

impl Default for GbdtConfig {
    fn default() -> Self {
        Self::from(&TrainingConfig::default())
    }
}

impl From<&TrainingConfig> for GbdtConfig {
    fn from(config: &TrainingConfig) -> Self {
        Self {
            n_estimators: config.n_estimators,
            max_depth: config.max_depth,
            learning_rate: config.learning_rate,
            subsample: config.subsample,
            positive_weight: config.positive_weight,
            seed: config.seed,
            lambda: config.lambda,
            min_child_weight: config.min_child_weight,
        }
    }
}

impl GbdtConfig {
    fn validate(&self) -> Result<()> {
        if !(self.learning_rate > 0.0 && self.learning_rate.is_finite()) {
            bail!("learning_rate must be positive, got {}", self.learning_rate);
        }
        if !(self.subsample > 0.0 && self.subsample <= 1.0) {
            bail!("subsample must be in (0, 1], got {}", self.subsample);
        }
        if !(self.positive_weight > 0.0 && self.positive_weight.is_finite()) {
            bail!("positive_weight must be positive, got {}", self.positive_weight);
        }
        if self.lambda < 0.0 || self.min_child_weight < 0.0 {
            bail!("lambda and min_child_weight must not be negative");
        }
        Ok(())
    }
}

/// Fit quality on the training rows
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
    /// Weighted mean logistic loss
    pub log_loss: f64,
    /// Share of rows classified correctly at the 0.5 threshold
    pub accuracy: f64,
    /// Recall on rows with target 1
    pub recall: f64,
}

/// GBDT trainer
pub struct GbdtTrainer {
    config: GbdtConfig,
}

impl GbdtTrainer {
    pub fn new(config: GbdtConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &GbdtConfig {
        &self.config
    }

    /// Train a GBDT model on the given dataset
    pub fn train(&self, dataset: &Dataset) -> Result<Model> {
        self.config.validate()?;
        if dataset.is_empty() {
            bail!("Cannot train on an empty dataset");
        }

        let n_samples = dataset.len();
        let weights = self.sample_weights(&dataset.targets);
        let base_margin = self.calculate_base_margin(&dataset.targets, &weights);
        let mut margins = vec![base_margin; n_samples];

        let tree_config = TreeConfig {
            max_depth: self.config.max_depth,
            lambda: self.config.lambda,
            min_child_weight: self.config.min_child_weight,
            learning_rate: self.config.learning_rate,
        };

        let mut rng = LcgRng::new(self.config.seed);
        let mut trees = Vec::with_capacity(self.config.n_estimators);

        for tree_idx in 0..self.config.n_estimators {
            let (gradients, hessians) =
                self.calculate_gradients_hessians(&dataset.targets, &margins, &weights);
            let rows = subsample_indices(n_samples, self.config.subsample, &mut rng);

            let builder = CartBuilder::new(
                &dataset.features,
                &gradients,
                &hessians,
                &weights,
                tree_config.clone(),
            );
            let tree = builder.build(&rows);

            for (margin, row) in margins.iter_mut().zip(&dataset.features) {
                *margin += tree.evaluate(row);
            }

            debug!(
                "Tree {}/{}: {} rows, {} nodes",
                tree_idx + 1,
                self.config.n_estimators,
                rows.len(),
                tree.nodes.len()
            );
            trees.push(tree);
        }

        let metadata = ModelMetadata {
            created_at: chrono::Utc::now().timestamp().max(0) as u64,
            training_rows: n_samples,
            learning_rate: self.config.learning_rate,
            max_depth: self.config.max_depth,
            positive_weight: self.config.positive_weight,
        };

        let model = Model::new(
            trees,
            base_margin,
            dataset.feature_count(),
            dataset.registry.fingerprint(),
        )
        .with_metadata(metadata);
        model.validate()?;

        info!(
            "Trained {} trees (base margin {:.4})",
            model.num_trees(),
            model.base_margin
        );
        Ok(model)
    }

    /// Evaluate a model on a dataset
    pub fn evaluate(&self, model: &Model, dataset: &Dataset) -> TrainingReport {
        let weights = self.sample_weights(&dataset.targets);
        let mut loss = 0.0;
        let mut total_weight = 0.0;
        let mut correct = 0usize;
        let mut positives = 0usize;
        let mut caught = 0usize;

        for ((row, &target), &weight) in dataset.features.iter().zip(&dataset.targets).zip(&weights) {
            let p = model.probability(row).clamp(1e-15, 1.0 - 1e-15);
            loss -= weight * (target * p.ln() + (1.0 - target) * (1.0 - p).ln());
            total_weight += weight;

            let predicted = if p > 0.5 { 1.0 } else { 0.0 };
            if predicted == target {
                correct += 1;
            }
            if target == 1.0 {
                positives += 1;
                if predicted == 1.0 {
                    caught += 1;
                }
            }
        }

        let n = dataset.len().max(1) as f64;
        TrainingReport {
            log_loss: if total_weight > 0.0 { loss / total_weight } else { 0.0 },
            accuracy: correct as f64 / n,
            recall: if positives > 0 {
                caught as f64 / positives as f64
            } else {
                0.0
            },
        }
    }

    fn sample_weights(&self, targets: &[f64]) -> Vec<f64> {
        targets
            .iter()
            .map(|&t| if t == 1.0 { self.config.positive_weight } else { 1.0 })
            .collect()
    }

    /// Log-odds of the weighted positive rate
    fn calculate_base_margin(&self, targets: &[f64], weights: &[f64]) -> f64 {
        let total: f64 = weights.iter().sum();
        if total <= 0.0 {
            return 0.0;
        }
        let positive: f64 = targets.iter().zip(weights).map(|(t, w)| t * w).sum();
        logit(positive / total)
    }

    /// Weighted logistic loss derivatives
    /// gradient = w (p - y), hessian = w p (1 - p)
    fn calculate_gradients_hessians(
        &self,
        targets: &[f64],
        margins: &[f64],
        weights: &[f64],
    ) -> (Vec<f64>, Vec<f64>) {
        targets
            .iter()
            .zip(margins)
            .zip(weights)
            .map(|((&y, &margin), &w)| {
                let p = sigmoid(margin);
                (w * (p - y), (w * p * (1.0 - p)).max(MIN_HESSIAN))
            })
            .unzip()
    }
}
