//! Artifact writer: model JSON, blake3 sidecar and column list

use crate::errors::TrainerError;
use retention_core::config::ArtifactsConfig;
use retention_core::gbdt::Model;
use retention_core::SchemaRegistry;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

pub const MODEL_FILE: &str = "model.json";
pub const HASH_FILE: &str = "model.hash";
pub const SCHEMA_FILE: &str = "model_columns.json";

/// Where the model, its hash and the column list go
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub model_path: PathBuf,
    pub hash_path: PathBuf,
    pub schema_path: PathBuf,
}

impl ArtifactPaths {
    /// Default file names inside `dir`
    pub fn in_dir<P: AsRef<Path>>(dir: P) -> Self {
        let dir = dir.as_ref();
        Self {
            model_path: dir.join(MODEL_FILE),
            hash_path: dir.join(HASH_FILE),
            schema_path: dir.join(SCHEMA_FILE),
        }
    }
}

impl From<&ArtifactsConfig> for ArtifactPaths {
    fn from(config: &ArtifactsConfig) -> Self {
        Self {
            model_path: config.model_path.clone(),
            hash_path: config.hash_path.clone(),
            schema_path: config.schema_path.clone(),
        }
    }
}

/// Paths of the files written by [`write_artifacts`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrainingArtifacts {
    pub model_path: PathBuf,
    pub hash_path: PathBuf,
    pub schema_path: PathBuf,
    /// Lowercase hex blake3 of the model file bytes
    pub model_hash: String,
}

/// Write the model, its hash and the schema registry to `paths`
///
/// The model must be bound to `registry`; the hash covers exactly the
/// bytes written to the model file. Missing parent directories are created.
pub fn write_artifacts(
    model: &Model,
    registry: &SchemaRegistry,
    paths: &ArtifactPaths,
) -> Result<TrainingArtifacts, TrainerError> {
    if model.schema_fingerprint != registry.fingerprint() || model.feature_count != registry.len() {
        return Err(TrainerError::SchemaBinding {
            model: format!("{} ({} features)", model.schema_fingerprint, model.feature_count),
            registry: format!("{} ({} features)", registry.fingerprint(), registry.len()),
        });
    }

    let model_path = paths.model_path.clone();
    let canonical_json = model
        .to_canonical_json()
        .map_err(|e| artifact_error(&model_path, e))?;

    info!("Saving model to: {}", model_path.display());
    write_file(&model_path, canonical_json.as_bytes())?;

    let hash = blake3::hash(canonical_json.as_bytes());
    let model_hash = hex::encode(hash.as_bytes());
    let hash_path = paths.hash_path.clone();
    info!("Saving hash to: {}", hash_path.display());
    write_file(&hash_path, model_hash.as_bytes())?;

    let schema_path = paths.schema_path.clone();
    info!("Saving {} columns to: {}", registry.len(), schema_path.display());
    ensure_parent(&schema_path)?;
    registry
        .save(&schema_path)
        .map_err(|e| artifact_error(&schema_path, e))?;

    Ok(TrainingArtifacts {
        model_path,
        hash_path,
        schema_path,
        model_hash,
    })
}

fn ensure_parent(path: &Path) -> Result<(), TrainerError> {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => {
            fs::create_dir_all(dir).map_err(|e| artifact_error(dir, e))
        }
        _ => Ok(()),
    }
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<(), TrainerError> {
    ensure_parent(path)?;
    fs::write(path, bytes).map_err(|e| artifact_error(path, e))
}

fn artifact_error(path: &Path, err: impl std::fmt::Display) -> TrainerError {
    TrainerError::Artifact {
        path: path.to_path_buf(),
        reason: err.to_string(),
    }
}
