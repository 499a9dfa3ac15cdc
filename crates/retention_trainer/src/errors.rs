use std::path::PathBuf;
use thiserror::Error;

/// Errors returned by the attrition model trainer.
#[derive(Debug, Error)]
pub enum TrainerError {
    #[error("cannot build dataset from {}: {reason}", path.display())]
    Dataset { path: PathBuf, reason: String },

    #[error("training failed: {0}")]
    Training(String),

    /// Model and registry disagree on the encoded layout
    #[error("model is bound to schema {model}, registry is {registry}")]
    SchemaBinding { model: String, registry: String },

    #[error("cannot write {}: {reason}", path.display())]
    Artifact { path: PathBuf, reason: String },
}
