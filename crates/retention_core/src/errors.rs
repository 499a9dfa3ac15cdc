//! Error types for the retention core

use crate::gbdt::ModelError;
use crate::serde_canon::CanonicalError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while loading artifacts or analysing a record
#[derive(Error, Debug)]
pub enum RetentionError {
    /// A required artifact is not on disk
    #[error("Artifact not found: {}", .0.display())]
    MissingArtifact(PathBuf),

    /// Encoded row, attribution vector or model disagree on the feature layout
    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    /// Classifier or attribution call failed for a single request
    #[error("Inference failed: {0}")]
    Inference(String),

    /// Model artifact failed structural validation
    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    /// Model hash sidecar does not match the model content
    #[error("Model integrity check failed: expected {expected}, got {actual}")]
    IntegrityMismatch { expected: String, actual: String },

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Canonical encoding error
    #[error("Canonical encoding error: {0}")]
    Canonical(#[from] CanonicalError),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Result type for retention core operations
pub type Result<T> = std::result::Result<T, RetentionError>;
