//! Training dataset built from the cleaned snapshot
//!
//! Rows go through the same encoder the analysis pipeline uses: every row
//! becomes a `RawRecord`, is one-hot encoded and aligned to the registry
//! fitted on the training columns.

use anyhow::{bail, Context, Result};
use retention_core::encoding::{encode_record, fit_schema, ColumnSpec};
use retention_core::{RawRecord, SchemaRegistry};
use retention_etl::{ColumnValues, Frame};
use std::path::Path;

/// Binary target column of the snapshot
pub const TARGET_COLUMN: &str = "attrition";

/// Dense encoded training data
#[derive(Clone, Debug)]
pub struct Dataset {
    pub registry: SchemaRegistry,
    pub features: Vec<Vec<f64>>,
    /// 1.0 for employees who left, 0.0 otherwise
    pub targets: Vec<f64>,
}

/// Per-feature range observed in the training rows
#[derive(Clone, Debug, PartialEq)]
pub struct FeatureStats {
    pub name: String,
    pub min: f64,
    pub max: f64,
}

impl Dataset {
    /// Load the columnar snapshot written by the ETL pipeline
    pub fn from_snapshot<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let frame = Frame::load_snapshot(path)
            .with_context(|| format!("Failed to read snapshot {}", path.display()))?;
        Self::from_frame(&frame)
    }

    /// Split the target from the features and encode every row
    pub fn from_frame(frame: &Frame) -> Result<Self> {
        let targets = read_targets(frame)?;
        if targets.is_empty() {
            bail!("Dataset is empty");
        }

        let mut specs = Vec::new();
        for column in frame.columns().iter().filter(|c| c.name != TARGET_COLUMN) {
            match &column.values {
                ColumnValues::Numeric(values) => {
                    if let Some(row) = values.iter().position(Option::is_none) {
                        bail!("Row {}: missing value in numeric column '{}'", row + 1, column.name);
                    }
                    specs.push(ColumnSpec::numeric(&column.name));
                }
                ColumnValues::Text(values) => {
                    specs.push(ColumnSpec::categorical(&column.name, values.iter().flatten().cloned()));
                }
            }
        }

        let registry = fit_schema(&specs).context("Failed to derive the feature schema")?;

        let features = (0..frame.n_rows())
            .map(|row| encode_record(&raw_record(frame, row), &registry).values().to_vec())
            .collect();

        Ok(Self {
            registry,
            features,
            targets,
        })
    }

    /// Get number of samples
    pub fn len(&self) -> usize {
        self.features.len()
    }

    /// Check if dataset is empty
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn feature_count(&self) -> usize {
        self.registry.len()
    }

    /// Share of rows with target 1
    pub fn positive_rate(&self) -> f64 {
        if self.targets.is_empty() {
            return 0.0;
        }
        self.targets.iter().sum::<f64>() / self.targets.len() as f64
    }

    /// Get feature statistics for validation
    pub fn feature_stats(&self) -> Vec<FeatureStats> {
        self.registry
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let (min, max) = self
                    .features
                    .iter()
                    .map(|row| row[i])
                    .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
                FeatureStats {
                    name: name.to_string(),
                    min,
                    max,
                }
            })
            .collect()
    }
}

fn read_targets(frame: &Frame) -> Result<Vec<f64>> {
    let column = frame
        .column(TARGET_COLUMN)
        .with_context(|| format!("Snapshot has no '{}' column", TARGET_COLUMN))?;

    let ColumnValues::Numeric(values) = &column.values else {
        bail!("Target column '{}' is not numeric", TARGET_COLUMN);
    };

    values
        .iter()
        .enumerate()
        .map(|(row, value)| match value {
            Some(v) if *v == 0.0 || *v == 1.0 => Ok(*v),
            Some(v) => bail!("Row {}: target must be 0 or 1, got {}", row + 1, v),
            None => bail!("Row {}: missing target", row + 1),
        })
        .collect()
}

fn raw_record(frame: &Frame, row: usize) -> RawRecord {
    let mut record = RawRecord::new();
    for column in frame.columns().iter().filter(|c| c.name != TARGET_COLUMN) {
        match &column.values {
            ColumnValues::Numeric(values) => {
                if let Some(value) = values[row] {
                    record.insert(&column.name, value);
                }
            }
            ColumnValues::Text(values) => {
                if let Some(value) = &values[row] {
                    record.insert(&column.name, value.as_str());
                }
            }
        }
    }
    record
}

#[cfg(test)]
mod tests {
    use super::*;
    use retention_etl::Column;

    fn frame() -> Frame {
        Frame::new(vec![
            Column::numeric("age", vec![Some(41.0), Some(49.0), Some(37.0)]),
            Column::numeric("attrition", vec![Some(1.0), Some(0.0), Some(1.0)]),
            Column::text("overtime", vec![Some("Yes"), Some("No"), Some("Yes")]),
            Column::text("department", vec![Some("Sales"), Some("Research & Development"), None]),
            Column::numeric("monthlyincome", vec![Some(5993.0), Some(5130.0), Some(2090.0)]),
        ])
        .unwrap()
    }

    #[test]
    fn test_from_frame_layout() {
        let dataset = Dataset::from_frame(&frame()).unwrap();

        assert_eq!(
            dataset.registry.features(),
            &["age", "monthlyincome", "overtime_Yes", "department_Sales"]
        );
        assert_eq!(dataset.targets, vec![1.0, 0.0, 1.0]);
        assert_eq!(dataset.features[0], vec![41.0, 5993.0, 1.0, 1.0]);
        assert_eq!(dataset.features[1], vec![49.0, 5130.0, 0.0, 0.0]);
        assert_eq!(dataset.features[2], vec![37.0, 2090.0, 1.0, 0.0]);
        assert!((dataset.positive_rate() - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_feature_stats() {
        let dataset = Dataset::from_frame(&frame()).unwrap();
        let stats = dataset.feature_stats();
        assert_eq!(stats[0], FeatureStats { name: "age".to_string(), min: 37.0, max: 49.0 });
    }

    #[test]
    fn test_bad_targets() {
        let no_target = Frame::new(vec![Column::numeric("age", vec![Some(41.0)])]).unwrap();
        assert!(Dataset::from_frame(&no_target).is_err());

        let text_target = Frame::new(vec![
            Column::numeric("age", vec![Some(41.0)]),
            Column::text("attrition", vec![Some("Yes")]),
        ])
        .unwrap();
        assert!(Dataset::from_frame(&text_target).is_err());

        let out_of_range = Frame::new(vec![
            Column::numeric("age", vec![Some(41.0)]),
            Column::numeric("attrition", vec![Some(2.0)]),
        ])
        .unwrap();
        assert!(Dataset::from_frame(&out_of_range).is_err());
    }
}
