//! Configuration for the retention toolkit
//!
//! Loaded from TOML, then overridden by `RETENTION_*` environment
//! variables. Every section has defaults, so a partial file is valid.

use crate::errors::{Result, RetentionError};
use crate::recommendations::{KnowledgeBase, Rule};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Prefix of every environment override
pub const ENV_PREFIX: &str = "RETENTION_";

/// Toolkit configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RetentionConfig {
    /// Model and schema artifact locations
    pub artifacts: ArtifactsConfig,
    /// Analysis policy
    pub analysis: AnalysisConfig,
    /// Trainer hyperparameters
    pub training: TrainingConfig,
    /// Batch pipeline locations
    pub etl: EtlConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
    /// Custom knowledge base; the built-in rules are used when empty
    pub recommendations: Vec<Rule>,
}

/// Artifact locations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtifactsConfig {
    /// Trained model (canonical JSON)
    pub model_path: PathBuf,
    /// Schema registry (JSON array of feature names)
    pub schema_path: PathBuf,
    /// Blake3 sidecar of the model file
    pub hash_path: PathBuf,
    /// Refuse to load a model whose sidecar does not match
    pub verify_hash: bool,
}

/// Analysis policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Positive drivers handed to the recommendation mapper
    pub top_k: usize,
    /// Drivers shown in the report chart
    pub top_drivers: usize,
    /// Cost of replacing one employee
    pub replacement_cost: f64,
    /// Probability above which the risk is critical
    pub critical_threshold: f64,
    /// Probability above which the risk is moderate
    pub moderate_threshold: f64,
}

/// Trainer hyperparameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub learning_rate: f64,
    pub max_depth: usize,
    pub n_estimators: usize,
    /// Fraction of rows sampled per tree
    pub subsample: f64,
    /// Weight of positive ("leaves") samples
    pub positive_weight: f64,
    pub seed: u64,
    /// L2 regularization on leaf values
    pub lambda: f64,
    /// Minimum hessian sum per child
    pub min_child_weight: f64,
}

/// Batch pipeline locations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EtlConfig {
    pub raw_dir: PathBuf,
    pub processed_dir: PathBuf,
    /// Name the extracted CSV is stored under in `raw_dir`
    pub raw_file_name: String,
    /// Name of the cleaned snapshot in `processed_dir`
    pub snapshot_name: String,
    /// Local CSV used as dataset source
    pub source: Option<PathBuf>,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level
    pub level: String,
}

impl Default for ArtifactsConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("models/model.json"),
            schema_path: PathBuf::from("models/model_columns.json"),
            hash_path: PathBuf::from("models/model.hash"),
            verify_hash: true,
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            top_k: 3,
            top_drivers: 5,
            replacement_cost: 75_000.0,
            critical_threshold: 0.7,
            moderate_threshold: 0.4,
        }
    }
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.01,
            max_depth: 3,
            n_estimators: 100,
            subsample: 0.8,
            positive_weight: 7.78,
            seed: 42,
            lambda: 1.0,
            min_child_weight: 1.0,
        }
    }
}

impl Default for EtlConfig {
    fn default() -> Self {
        Self {
            raw_dir: PathBuf::from("data/raw"),
            processed_dir: PathBuf::from("data/processed"),
            raw_file_name: "hr_raw.csv".to_string(),
            snapshot_name: "hr_cleaned.json".to_string(),
            source: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Environment overrides applied to a configuration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    /// Keys that took effect
    pub applied: Vec<String>,
    /// `KEY=value` pairs whose value did not parse
    pub ignored: Vec<String>,
}

impl RetentionConfig {
    /// Parse a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load configuration from file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(RetentionError::MissingArtifact(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Apply `RETENTION_*` environment overrides
    pub fn apply_env_overrides(&mut self) -> ConfigOverrides {
        let vars = std::env::vars().filter(|(key, _)| key.starts_with(ENV_PREFIX));
        self.apply_overrides(vars)
    }

    /// Apply `RETENTION_*` style overrides from any key/value source
    ///
    /// Nothing is logged; callers report the returned outcome.
    pub fn apply_overrides<I, K, V>(&mut self, vars: I) -> ConfigOverrides
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut outcome = ConfigOverrides::default();

        for (key, value) in vars {
            let (key, value) = (key.as_ref(), value.as_ref());
            let Some(name) = key.strip_prefix(ENV_PREFIX) else {
                continue;
            };

            let ok = match name {
                "MODEL_PATH" => set_path(&mut self.artifacts.model_path, value),
                "SCHEMA_PATH" => set_path(&mut self.artifacts.schema_path, value),
                "HASH_PATH" => set_path(&mut self.artifacts.hash_path, value),
                "VERIFY_HASH" => set_parsed(&mut self.artifacts.verify_hash, value),
                "TOP_K" => set_parsed(&mut self.analysis.top_k, value),
                "TOP_DRIVERS" => set_parsed(&mut self.analysis.top_drivers, value),
                "REPLACEMENT_COST" => set_parsed(&mut self.analysis.replacement_cost, value),
                "RAW_DIR" => set_path(&mut self.etl.raw_dir, value),
                "PROCESSED_DIR" => set_path(&mut self.etl.processed_dir, value),
                "SEED" => set_parsed(&mut self.training.seed, value),
                "LOG_LEVEL" => {
                    self.logging.level = value.to_string();
                    true
                }
                _ => continue,
            };

            if ok {
                outcome.applied.push(key.to_string());
            } else {
                outcome.ignored.push(format!("{key}={value}"));
            }
        }
        outcome
    }

    /// Validate configuration, returning human-readable warnings
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        let analysis = &self.analysis;
        if analysis.top_k == 0 {
            warnings.push("top_k is 0, no recommendations will be produced".to_string());
        }
        if analysis.top_drivers == 0 {
            warnings.push("top_drivers is 0, the driver chart will be empty".to_string());
        }
        if !(0.0..=1.0).contains(&analysis.moderate_threshold)
            || !(0.0..=1.0).contains(&analysis.critical_threshold)
        {
            warnings.push("Risk band thresholds should be between 0 and 1".to_string());
        }
        if analysis.moderate_threshold > analysis.critical_threshold {
            warnings.push("Moderate threshold is above the critical threshold".to_string());
        }
        if analysis.replacement_cost < 0.0 {
            warnings.push("Replacement cost is negative".to_string());
        }

        let training = &self.training;
        if training.learning_rate <= 0.0 || training.learning_rate > 1.0 {
            warnings.push("Learning rate should be in (0, 1]".to_string());
        }
        if training.n_estimators == 0 {
            warnings.push("n_estimators is 0, the model will only predict the base rate".to_string());
        }
        if training.max_depth == 0 {
            warnings.push("max_depth is 0, trees will be single leaves".to_string());
        }
        if training.subsample <= 0.0 || training.subsample > 1.0 {
            warnings.push("Subsample should be in (0, 1]".to_string());
        }
        if training.positive_weight <= 0.0 {
            warnings.push("Positive class weight should be positive".to_string());
        }

        if let Err(e) = self.knowledge_base() {
            warnings.push(format!("Recommendation rules are invalid: {}", e));
        }

        if warnings.is_empty() {
            info!("Configuration validation passed");
        } else {
            warn!("Configuration validation warnings: {:?}", warnings);
        }

        warnings
    }

    /// Knowledge base from the config, or the built-in one
    pub fn knowledge_base(&self) -> Result<KnowledgeBase> {
        if self.recommendations.is_empty() {
            Ok(KnowledgeBase::default())
        } else {
            KnowledgeBase::from_rules(self.recommendations.clone())
        }
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self)
            .map_err(|e| RetentionError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content)?;
        info!("Configuration saved to: {}", path.display());
        Ok(())
    }
}

fn set_path(target: &mut PathBuf, value: &str) -> bool {
    *target = PathBuf::from(value);
    true
}

fn set_parsed<T: std::str::FromStr>(target: &mut T, value: &str) -> bool {
    match value.parse() {
        Ok(parsed) => {
            *target = parsed;
            true
        }
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let config = RetentionConfig::default();
        assert_eq!(config.analysis.top_k, 3);
        assert_eq!(config.analysis.replacement_cost, 75_000.0);
        assert_eq!(config.training.n_estimators, 100);
        assert_eq!(config.training.positive_weight, 7.78);
        assert_eq!(config.etl.raw_file_name, "hr_raw.csv");
        assert!(config.validate().is_empty());
        assert_eq!(config.knowledge_base().unwrap().len(), 8);
    }

    #[test]
    fn test_partial_toml() {
        let config = RetentionConfig::from_toml_str(
            r#"
            [analysis]
            top_k = 5

            [[recommendations]]
            matcher = "Age"
            title = "Career Stage"
            action = "Discuss career goals."
            "#,
        )
        .unwrap();

        assert_eq!(config.analysis.top_k, 5);
        assert_eq!(config.analysis.top_drivers, 5);
        assert_eq!(config.artifacts, ArtifactsConfig::default());

        let kb = config.knowledge_base().unwrap();
        assert_eq!(kb.len(), 1);
        assert_eq!(kb.rules()[0].matcher, "age");
    }

    #[test]
    fn test_overrides() {
        let mut config = RetentionConfig::default();
        let outcome = config.apply_overrides([
            ("RETENTION_TOP_K", "4"),
            ("RETENTION_MODEL_PATH", "/tmp/m.json"),
            ("RETENTION_REPLACEMENT_COST", "not-a-number"),
            ("RETENTION_UNKNOWN", "x"),
            ("OTHER_TOP_K", "9"),
        ]);

        assert_eq!(outcome.applied, vec!["RETENTION_TOP_K", "RETENTION_MODEL_PATH"]);
        assert_eq!(outcome.ignored, vec!["RETENTION_REPLACEMENT_COST=not-a-number"]);
        assert_eq!(config.analysis.top_k, 4);
        assert_eq!(config.artifacts.model_path, PathBuf::from("/tmp/m.json"));
        assert_eq!(config.analysis.replacement_cost, 75_000.0);
    }

    #[test]
    fn test_validation_warnings() {
        let mut config = RetentionConfig::default();
        config.analysis.moderate_threshold = 0.9;
        config.training.subsample = 0.0;
        let warnings = config.validate();
        assert_eq!(warnings.len(), 2);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("retention.toml");

        let mut config = RetentionConfig::default();
        config.etl.source = Some(PathBuf::from("WA_Fn-UseC_-HR-Employee-Attrition.csv"));
        config.save_to_file(&path).unwrap();

        let loaded = RetentionConfig::load_from_file(&path).unwrap();
        assert_eq!(config, loaded);
    }
}
