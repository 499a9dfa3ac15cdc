//! Risk scorer: positive-class probability and the binarized decision

use crate::encoding::EncodedRow;
use crate::errors::{Result, RetentionError};
use crate::gbdt::Model;
use crate::schema::SchemaRegistry;
use serde::{Deserialize, Serialize};

/// Probability above which an employee is classified as leaving
pub const DECISION_THRESHOLD: f64 = 0.5;

/// Index of the positive ("leaves") class in a probability pair
pub const POSITIVE_CLASS: usize = 1;

/// A binary classifier returning `[p(stays), p(leaves)]` per row
pub trait Classifier {
    /// Width of the rows the classifier accepts
    fn feature_count(&self) -> usize;

    /// Class probabilities for each row
    fn predict_proba(&self, rows: &[&[f64]]) -> Result<Vec<[f64; 2]>>;
}

impl Classifier for Model {
    fn feature_count(&self) -> usize {
        self.feature_count
    }

    fn predict_proba(&self, rows: &[&[f64]]) -> Result<Vec<[f64; 2]>> {
        rows.iter()
            .map(|row| {
                if row.len() != self.feature_count {
                    return Err(RetentionError::Inference(format!(
                        "row has {} features, model expects {}",
                        row.len(),
                        self.feature_count
                    )));
                }
                let p = self.probability(row);
                Ok([1.0 - p, p])
            })
            .collect()
    }
}

/// Outcome of scoring one row
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskScore {
    /// Probability of attrition, within [0, 1]
    pub probability: f64,
    /// 1 if `probability > DECISION_THRESHOLD`, else 0
    pub class: u8,
}

impl RiskScore {
    /// Binarize a probability at the fixed threshold (0.5 itself maps to 0)
    pub fn from_probability(probability: f64) -> Self {
        Self {
            probability,
            class: u8::from(probability > DECISION_THRESHOLD),
        }
    }

    pub fn predicts_attrition(&self) -> bool {
        self.class == 1
    }
}

/// Score one encoded row
///
/// The row must be aligned to `registry` and the classifier must accept
/// rows of the registry's width; anything else is an error for this
/// request only.
pub fn score_row<C: Classifier + ?Sized>(
    classifier: &C,
    registry: &SchemaRegistry,
    row: &EncodedRow,
) -> Result<RiskScore> {
    row.ensure_aligned(registry)?;

    if classifier.feature_count() != registry.len() {
        return Err(RetentionError::SchemaMismatch(format!(
            "classifier expects {} features, schema has {}",
            classifier.feature_count(),
            registry.len()
        )));
    }

    let probabilities = classifier.predict_proba(&[row.values()])?;
    let [pair] = probabilities.as_slice() else {
        return Err(RetentionError::Inference(format!(
            "classifier returned {} rows for a single input",
            probabilities.len()
        )));
    };

    let probability = pair[POSITIVE_CLASS];
    if !probability.is_finite() || !(0.0..=1.0).contains(&probability) {
        return Err(RetentionError::Inference(format!(
            "classifier returned probability outside [0, 1]: {probability}"
        )));
    }

    Ok(RiskScore::from_probability(probability))
}
