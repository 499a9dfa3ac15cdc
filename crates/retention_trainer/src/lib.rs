//! Deterministic offline trainer for the attrition model
//!
//! Reads the cleaned snapshot produced by `retention-etl`, fits a weighted
//! logistic GBDT and writes the model, its blake3 hash and the column list
//! the analysis side loads.

pub mod artifacts;
pub mod cart;
pub mod dataset;
pub mod deterministic;
pub mod errors;
pub mod trainer;

use retention_core::gbdt::Model;
use std::path::Path;

pub use artifacts::{write_artifacts, ArtifactPaths, TrainingArtifacts, HASH_FILE, MODEL_FILE, SCHEMA_FILE};
pub use dataset::{Dataset, FeatureStats, TARGET_COLUMN};
pub use deterministic::{LcgRng, SplitTieBreaker};
pub use errors::TrainerError;
pub use trainer::{GbdtConfig, GbdtTrainer, TrainingReport};

/// Train a model directly from an ETL snapshot
pub fn train_from_snapshot(path: &Path, config: GbdtConfig) -> Result<(Model, Dataset), TrainerError> {
    let dataset = Dataset::from_snapshot(path).map_err(|err| TrainerError::Dataset {
        path: path.to_path_buf(),
        reason: format!("{err:#}"),
    })?;
    let trainer = GbdtTrainer::new(config);
    let model = trainer
        .train(&dataset)
        .map_err(|err| TrainerError::Training(err.to_string()))?;
    Ok((model, dataset))
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
