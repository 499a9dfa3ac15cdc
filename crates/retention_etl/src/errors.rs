use std::path::PathBuf;
use thiserror::Error;

/// Errors returned by the batch pipeline.
#[derive(Debug, Error)]
pub enum EtlError {
    #[error("dataset source '{source_name}' failed: {reason}")]
    Source { source_name: String, reason: String },

    #[error("no CSV file found in {} after extraction", .0.display())]
    MissingDataset(PathBuf),

    #[error("malformed frame: {0}")]
    Shape(String),

    #[error("unsupported snapshot version {0}")]
    SnapshotVersion(u32),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, EtlError>;
