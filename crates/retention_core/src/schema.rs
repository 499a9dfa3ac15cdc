//! Schema registry: the ordered encoded feature names a model was trained on
//!
//! The registry is captured once at training time and persisted as a JSON
//! array of strings. Every encoded row, model and attribution vector is
//! bound to a registry through its blake3 fingerprint, so a layout mismatch
//! is detected instead of silently misattributing columns.

use crate::errors::{Result, RetentionError};
use crate::serde_canon::hash_canonical_hex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Ordered, immutable list of encoded feature names
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct SchemaRegistry {
    features: Vec<String>,
    fingerprint: String,
    positions: HashMap<String, usize>,
}

impl SchemaRegistry {
    /// Build a registry from feature names in model column order
    pub fn new(features: Vec<String>) -> Result<Self> {
        if features.is_empty() {
            return Err(RetentionError::SchemaMismatch(
                "schema registry must contain at least one feature".to_string(),
            ));
        }

        let mut positions = HashMap::with_capacity(features.len());
        for (idx, name) in features.iter().enumerate() {
            if positions.insert(name.clone(), idx).is_some() {
                return Err(RetentionError::SchemaMismatch(format!(
                    "duplicate feature name in schema registry: {name}"
                )));
            }
        }

        let fingerprint = hash_canonical_hex(&features)?;

        Ok(Self {
            features,
            fingerprint,
            positions,
        })
    }

    /// Load a registry artifact (JSON array of names)
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(RetentionError::MissingArtifact(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        let registry: SchemaRegistry = serde_json::from_str(&content)?;
        debug!(
            features = registry.len(),
            fingerprint = %registry.fingerprint,
            "loaded schema registry from {}",
            path.display()
        );
        Ok(registry)
    }

    /// Persist the registry as a pretty JSON array
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.features)?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn features(&self) -> &[String] {
        &self.features
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Blake3 hex digest of the canonical JSON of the feature list
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Column index of a feature name
    pub fn position(&self, name: &str) -> Option<usize> {
        self.positions.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.positions.contains_key(name)
    }

    /// Name of the feature at a column index
    pub fn name(&self, idx: usize) -> Option<&str> {
        self.features.get(idx).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.features.iter().map(String::as_str)
    }
}

impl TryFrom<Vec<String>> for SchemaRegistry {
    type Error = RetentionError;

    fn try_from(features: Vec<String>) -> Result<Self> {
        Self::new(features)
    }
}

impl From<SchemaRegistry> for Vec<String> {
    fn from(registry: SchemaRegistry) -> Self {
        registry.features
    }
}
