//! Analysis context: the loaded artifacts every request reads from
//!
//! The context is built explicitly from config and is immutable afterwards.
//! `reload` constructs a complete new context from disk and only replaces
//! the current one once that succeeded.

use crate::config::{AnalysisConfig, ArtifactsConfig, RetentionConfig};
use crate::errors::{Result, RetentionError};
use crate::gbdt::Model;
use crate::recommendations::KnowledgeBase;
use crate::schema::SchemaRegistry;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

#[derive(Debug)]
struct ContextState {
    registry: SchemaRegistry,
    model: Model,
    model_hash: String,
    knowledge_base: KnowledgeBase,
    policy: AnalysisConfig,
}

/// Registry, model, knowledge base and policy for the analysis pipeline
#[derive(Debug, Clone)]
pub struct AnalysisContext {
    state: Arc<ContextState>,
}

impl AnalysisContext {
    /// Assemble a context from already loaded parts
    ///
    /// Fails with `SchemaMismatch` unless the model was trained against
    /// `registry`.
    pub fn from_parts(
        registry: SchemaRegistry,
        model: Model,
        knowledge_base: KnowledgeBase,
        policy: AnalysisConfig,
    ) -> Result<Self> {
        model.validate()?;
        ensure_model_matches(&model, &registry)?;
        let model_hash = model.hash_hex()?;

        Ok(Self {
            state: Arc::new(ContextState {
                registry,
                model,
                model_hash,
                knowledge_base,
                policy,
            }),
        })
    }

    /// Load artifacts named by the config
    #[instrument(skip(config), fields(model = %config.artifacts.model_path.display()))]
    pub fn load(config: &RetentionConfig) -> Result<Self> {
        let artifacts = &config.artifacts;
        let registry = SchemaRegistry::load(&artifacts.schema_path)?;
        let (model, model_hash) = load_model(artifacts)?;
        ensure_model_matches(&model, &registry)?;
        let knowledge_base = config.knowledge_base()?;

        info!(
            features = registry.len(),
            trees = model.num_trees(),
            rules = knowledge_base.len(),
            "analysis context loaded (model {})",
            &model_hash[..12.min(model_hash.len())]
        );

        Ok(Self {
            state: Arc::new(ContextState {
                registry,
                model,
                model_hash,
                knowledge_base,
                policy: config.analysis.clone(),
            }),
        })
    }

    /// Rebuild from disk; on failure the current context is left untouched
    pub fn reload(&mut self, config: &RetentionConfig) -> Result<()> {
        match Self::load(config) {
            Ok(fresh) => {
                *self = fresh;
                Ok(())
            }
            Err(e) => {
                warn!("Reload failed, keeping current artifacts: {}", e);
                Err(e)
            }
        }
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.state.registry
    }

    pub fn model(&self) -> &Model {
        &self.state.model
    }

    /// Blake3 hex digest of the model's canonical JSON
    ///
    /// The same value whether the context came from disk or from parts; for
    /// trainer-written artifacts it equals the hash sidecar.
    pub fn model_hash(&self) -> &str {
        &self.state.model_hash
    }

    pub fn knowledge_base(&self) -> &KnowledgeBase {
        &self.state.knowledge_base
    }

    pub fn policy(&self) -> &AnalysisConfig {
        &self.state.policy
    }
}

fn ensure_model_matches(model: &Model, registry: &SchemaRegistry) -> Result<()> {
    if model.feature_count != registry.len() {
        return Err(RetentionError::SchemaMismatch(format!(
            "model expects {} features, schema registry has {}",
            model.feature_count,
            registry.len()
        )));
    }
    if model.schema_fingerprint != registry.fingerprint() {
        return Err(RetentionError::SchemaMismatch(
            "model was trained against a different schema registry".to_string(),
        ));
    }
    Ok(())
}

/// Read the model, checking the hash sidecar against the file bytes
///
/// Returns the model with its canonical digest.
fn load_model(artifacts: &ArtifactsConfig) -> Result<(Model, String)> {
    let path = &artifacts.model_path;
    if !path.exists() {
        return Err(RetentionError::MissingArtifact(path.clone()));
    }

    let bytes = fs::read(path)?;
    if artifacts.verify_hash {
        let actual = blake3::hash(&bytes).to_hex().to_string();
        match read_sidecar(&artifacts.hash_path)? {
            Some(expected) if expected != actual => {
                return Err(RetentionError::IntegrityMismatch { expected, actual });
            }
            Some(_) => debug!("model hash verified"),
            None => debug!(
                "no hash sidecar at {}, skipping verification",
                artifacts.hash_path.display()
            ),
        }
    }

    let model: Model = serde_json::from_slice(&bytes)?;
    model.validate()?;
    let model_hash = model.hash_hex()?;
    Ok((model, model_hash))
}

fn read_sidecar(path: &Path) -> Result<Option<String>> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    Ok(Some(content.trim().to_lowercase()))
}
