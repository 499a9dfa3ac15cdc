//! Binary logistic GBDT model
//!
//! Implements the attrition classifier with:
//! - Canonical JSON serialization
//! - Blake3 model hashing
//! - Margin (log-odds) and probability inference
//! - A recorded fingerprint of the feature schema it was trained on

use super::tree::Tree;
use crate::serde_canon::{hash_canonical_hex, to_canonical_json, CanonicalError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// GBDT Model errors
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Model validation failed: {0}")]
    ValidationFailed(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Canonical serialization error: {0}")]
    CanonicalError(#[from] CanonicalError),
}

/// Current model format version
pub const MODEL_VERSION: i32 = 1;

/// Training provenance recorded alongside the trees
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ModelMetadata {
    /// Unix timestamp (seconds) of the training run
    pub created_at: u64,
    /// Rows used for training
    pub training_rows: usize,
    /// Shrinkage applied to every tree
    pub learning_rate: f64,
    /// Maximum depth allowed during training
    pub max_depth: usize,
    /// Weight applied to positive ("leaves") samples
    pub positive_weight: f64,
}

/// Logistic GBDT model over encoded employee rows
///
/// `margin(row) = base_margin + Σ tree(row)` and the probability of
/// attrition is `sigmoid(margin)`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Model {
    /// Model format version (always 1 for now)
    pub version: i32,

    /// Width of the encoded rows the trees index into
    pub feature_count: usize,

    /// Blake3 fingerprint of the schema registry used at training time
    pub schema_fingerprint: String,

    /// Initial log-odds before any tree is applied
    pub base_margin: f64,

    /// Decision trees in the ensemble
    pub trees: Vec<Tree>,

    #[serde(default)]
    pub metadata: ModelMetadata,
}

impl Model {
    /// Create a new model bound to a schema fingerprint
    pub fn new(
        trees: Vec<Tree>,
        base_margin: f64,
        feature_count: usize,
        schema_fingerprint: impl Into<String>,
    ) -> Self {
        Self {
            version: MODEL_VERSION,
            feature_count,
            schema_fingerprint: schema_fingerprint.into(),
            base_margin,
            trees,
            metadata: ModelMetadata::default(),
        }
    }

    pub fn with_metadata(mut self, metadata: ModelMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Validate model structure
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.version != MODEL_VERSION {
            return Err(ModelError::ValidationFailed(format!(
                "Unsupported model version: {}",
                self.version
            )));
        }

        if self.feature_count == 0 {
            return Err(ModelError::ValidationFailed(
                "Model declares zero features".to_string(),
            ));
        }

        if !self.base_margin.is_finite() {
            return Err(ModelError::ValidationFailed(format!(
                "Invalid base margin: {}",
                self.base_margin
            )));
        }

        for (i, tree) in self.trees.iter().enumerate() {
            tree.validate(self.feature_count).map_err(|e| {
                ModelError::ValidationFailed(format!("Tree {} validation failed: {}", i, e))
            })?;
        }

        Ok(())
    }

    /// Raw log-odds for one encoded row
    pub fn margin(&self, features: &[f64]) -> f64 {
        self.trees
            .iter()
            .fold(self.base_margin, |sum, tree| sum + tree.evaluate(features))
    }

    /// Probability of the positive class for one encoded row
    pub fn probability(&self, features: &[f64]) -> f64 {
        sigmoid(self.margin(features))
    }

    /// Margin expected over the training distribution (attribution baseline)
    pub fn expected_margin(&self) -> f64 {
        self.trees
            .iter()
            .fold(self.base_margin, |sum, tree| sum + tree.expected_value())
    }

    /// Serialize model to canonical JSON (sorted keys, no whitespace)
    pub fn to_canonical_json(&self) -> Result<String, ModelError> {
        Ok(to_canonical_json(self)?)
    }

    /// Compute model hash as hex string
    pub fn hash_hex(&self) -> Result<String, ModelError> {
        Ok(hash_canonical_hex(self)?)
    }

    /// Save model to JSON file with canonical serialization
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<(), ModelError> {
        let json = self.to_canonical_json()?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Load and validate a model from a JSON file
    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Self, ModelError> {
        let json = fs::read_to_string(path)?;
        let model: Model = serde_json::from_str(&json)?;
        model.validate()?;
        Ok(model)
    }

    /// Get number of trees in the model
    pub fn num_trees(&self) -> usize {
        self.trees.len()
    }
}

/// Logistic link
pub fn sigmoid(margin: f64) -> f64 {
    if margin >= 0.0 {
        1.0 / (1.0 + (-margin).exp())
    } else {
        let e = margin.exp();
        e / (1.0 + e)
    }
}

/// Inverse of the logistic link, clamped away from 0 and 1
pub fn logit(probability: f64) -> f64 {
    let p = probability.clamp(1e-12, 1.0 - 1e-12);
    (p / (1.0 - p)).ln()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gbdt::tree::Node;

    fn create_test_model() -> Model {
        let tree1 = Tree::new(vec![
            Node::internal(0, 0, 50.0, 1, 2, 100.0),
            Node::leaf(1, 0.5, 60.0),
            Node::leaf(2, -0.5, 40.0),
        ]);

        let tree2 = Tree::new(vec![
            Node::internal(0, 1, 0.5, 1, 2, 100.0),
            Node::leaf(1, -0.25, 70.0),
            Node::leaf(2, 0.75, 30.0),
        ]);

        Model::new(vec![tree1, tree2], -0.1, 2, "fingerprint")
    }

    #[test]
    fn test_model_creation() {
        let model = create_test_model();
        assert_eq!(model.version, MODEL_VERSION);
        assert_eq!(model.num_trees(), 2);
        assert!(model.validate().is_ok());
    }

    #[test]
    fn test_margin_sums_trees_and_base() {
        let model = create_test_model();

        // Tree 1 left (0.5), tree 2 right (0.75)
        let margin = model.margin(&[30.0, 1.0]);
        assert!((margin - (-0.1 + 0.5 + 0.75)).abs() < 1e-12);

        let p = model.probability(&[30.0, 1.0]);
        assert!((p - sigmoid(margin)).abs() < 1e-12);
    }

    #[test]
    fn test_expected_margin() {
        let model = create_test_model();
        let t1 = (60.0 * 0.5 + 40.0 * -0.5) / 100.0;
        let t2 = (70.0 * -0.25 + 30.0 * 0.75) / 100.0;
        assert!((model.expected_margin() - (-0.1 + t1 + t2)).abs() < 1e-12);
    }

    #[test]
    fn test_sigmoid_and_logit() {
        assert_eq!(sigmoid(0.0), 0.5);
        assert!(sigmoid(40.0) <= 1.0);
        assert!(sigmoid(-800.0) >= 0.0);
        assert!((sigmoid(logit(0.2)) - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_hash_changes_with_model() {
        let model1 = create_test_model();
        let mut model2 = create_test_model();
        model2.base_margin = 0.3;

        let hash1 = model1.hash_hex().unwrap();
        assert_eq!(hash1, create_test_model().hash_hex().unwrap());
        assert_ne!(hash1, model2.hash_hex().unwrap());
    }

    #[test]
    fn test_save_load_json() {
        use tempfile::NamedTempFile;

        let model = create_test_model();
        let temp_file = NamedTempFile::new().unwrap();

        model.save_json(temp_file.path()).unwrap();
        let loaded = Model::load_json(temp_file.path()).unwrap();

        assert_eq!(model, loaded);
        assert_eq!(model.hash_hex().unwrap(), loaded.hash_hex().unwrap());
    }

    #[test]
    fn test_model_validation() {
        let mut invalid = create_test_model();
        invalid.version = 999;
        assert!(invalid.validate().is_err());

        let mut narrow = create_test_model();
        narrow.feature_count = 1;
        assert!(narrow.validate().is_err());

        let mut nan = create_test_model();
        nan.base_margin = f64::NAN;
        assert!(nan.validate().is_err());
    }
}
