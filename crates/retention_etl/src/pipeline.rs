//! Extract -> transform -> load

use crate::errors::Result;
use crate::extract::{DatasetSource, Extractor};
use crate::load::load;
use crate::transform::transform;
use retention_core::config::EtlConfig;
use std::path::PathBuf;
use tracing::info;

/// Locations used by one pipeline run
#[derive(Debug, Clone)]
pub struct EtlPipeline {
    pub raw_dir: PathBuf,
    pub processed_dir: PathBuf,
    pub raw_file_name: String,
    pub snapshot_name: String,
}

/// What a run produced
#[derive(Debug, Clone, PartialEq)]
pub struct EtlSummary {
    pub rows: usize,
    pub columns: usize,
    pub snapshot_path: PathBuf,
}

impl EtlPipeline {
    pub fn from_config(config: &EtlConfig) -> Self {
        Self {
            raw_dir: config.raw_dir.clone(),
            processed_dir: config.processed_dir.clone(),
            raw_file_name: config.raw_file_name.clone(),
            snapshot_name: config.snapshot_name.clone(),
        }
    }

    /// Location of the snapshot a run writes
    pub fn snapshot_path(&self) -> PathBuf {
        self.processed_dir.join(&self.snapshot_name)
    }

    pub fn run(&self, source: &dyn DatasetSource) -> Result<EtlSummary> {
        info!("=== Starting ETL pipeline ===");

        let raw = Extractor::new(&self.raw_dir, &self.raw_file_name).extract(source)?;
        let cleaned = transform(raw)?;
        let snapshot_path = load(&cleaned, &self.processed_dir, &self.snapshot_name)?;

        info!("=== ETL pipeline completed ===");
        Ok(EtlSummary {
            rows: cleaned.n_rows(),
            columns: cleaned.n_cols(),
            snapshot_path,
        })
    }
}

impl Default for EtlPipeline {
    fn default() -> Self {
        Self::from_config(&EtlConfig::default())
    }
}
