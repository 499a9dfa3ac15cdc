//! Record encoding and schema alignment
//!
//! Encoding is two explicit steps:
//! 1. `one_hot`: categorical fields become `field_value` indicator columns,
//!    numeric fields pass through under their own name.
//! 2. `align_to_schema`: the sparse row is reindexed against the registry,
//!    filling absent columns with 0 and dropping columns the registry does
//!    not know.
//!
//! The same encoder is used by the trainer, so training and serving rows
//! are built by identical code.

use crate::errors::{Result, RetentionError};
use crate::record::{FieldValue, RawRecord};
use crate::schema::SchemaRegistry;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Separator between field name and category value in indicator columns
pub const INDICATOR_SEPARATOR: char = '_';

/// Unaligned encoded columns of a single record
pub type OneHotRow = BTreeMap<String, f64>;

/// Name of the indicator column for a categorical value
pub fn indicator_name(field: &str, value: &str) -> String {
    format!("{field}{INDICATOR_SEPARATOR}{value}")
}

/// One-hot encode every categorical field; numeric fields pass through
pub fn one_hot(record: &RawRecord) -> OneHotRow {
    record
        .iter()
        .map(|(field, value)| match value {
            FieldValue::Number(number) => (field.to_string(), *number),
            FieldValue::Category(category) => (indicator_name(field, category), 1.0),
        })
        .collect()
}

/// A row aligned to a schema registry
///
/// Holds exactly `registry.len()` values in registry order, plus the
/// fingerprint of the registry it was aligned to.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedRow {
    values: Vec<f64>,
    fingerprint: String,
}

impl EncodedRow {
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Fingerprint of the registry this row was aligned to
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Value of a named feature, looked up through the registry
    pub fn get(&self, registry: &SchemaRegistry, name: &str) -> Option<f64> {
        registry
            .position(name)
            .and_then(|idx| self.values.get(idx).copied())
    }

    /// Fail unless this row was aligned to `registry`
    pub fn ensure_aligned(&self, registry: &SchemaRegistry) -> Result<()> {
        if self.fingerprint != registry.fingerprint() || self.values.len() != registry.len() {
            return Err(RetentionError::SchemaMismatch(format!(
                "row has {} columns for schema {}, expected {} columns for schema {}",
                self.values.len(),
                short(&self.fingerprint),
                registry.len(),
                short(registry.fingerprint())
            )));
        }
        Ok(())
    }
}

fn short(fingerprint: &str) -> &str {
    fingerprint.get(..12).unwrap_or(fingerprint)
}

/// Reindex a sparse row against the registry (fill 0, drop extras)
pub fn align_to_schema(row: &OneHotRow, registry: &SchemaRegistry) -> EncodedRow {
    let values = registry
        .iter()
        .map(|name| row.get(name).copied().unwrap_or(0.0))
        .collect();

    EncodedRow {
        values,
        fingerprint: registry.fingerprint().to_string(),
    }
}

/// Encode a raw record into a row aligned with `registry`
///
/// Categorical values the registry has no indicator for (unseen or
/// reference categories) end up as all-zero indicator groups.
pub fn encode_record(record: &RawRecord, registry: &SchemaRegistry) -> EncodedRow {
    let sparse = one_hot(record);

    let dropped: Vec<&str> = sparse
        .keys()
        .filter(|name| !registry.contains(name))
        .map(String::as_str)
        .collect();
    if !dropped.is_empty() {
        debug!(?dropped, "encoded columns absent from schema were dropped");
    }

    align_to_schema(&sparse, registry)
}

/// Kind of a training column as seen by the schema fitter
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnKind {
    Numeric,
    /// Categorical with the values observed in the training data
    Categorical(Vec<String>),
}

/// A training column description
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSpec {
    pub name: String,
    pub kind: ColumnKind,
}

impl ColumnSpec {
    pub fn numeric(name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: ColumnKind::Numeric,
        }
    }

    pub fn categorical<I, S>(name: &str, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.to_string(),
            kind: ColumnKind::Categorical(values.into_iter().map(Into::into).collect()),
        }
    }
}

/// Derive the schema registry from training columns
///
/// Numeric columns come first in source order, then for each categorical
/// column (in source order) one indicator per distinct value in sorted
/// order, with the first value dropped as the reference category.
pub fn fit_schema(columns: &[ColumnSpec]) -> Result<SchemaRegistry> {
    let mut features: Vec<String> = columns
        .iter()
        .filter(|c| c.kind == ColumnKind::Numeric)
        .map(|c| c.name.clone())
        .collect();

    for column in columns {
        if let ColumnKind::Categorical(values) = &column.kind {
            let distinct: BTreeSet<&str> = values.iter().map(String::as_str).collect();
            features.extend(
                distinct
                    .into_iter()
                    .skip(1)
                    .map(|value| indicator_name(&column.name, value)),
            );
        }
    }

    SchemaRegistry::new(features)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> SchemaRegistry {
        fit_schema(&[
            ColumnSpec::numeric("age"),
            ColumnSpec::categorical("department", ["Sales", "Human Resources", "Research & Development", "Sales"]),
            ColumnSpec::numeric("monthlyincome"),
            ColumnSpec::categorical("overtime", ["No", "Yes"]),
        ])
        .unwrap()
    }

    #[test]
    fn test_fit_schema_layout() {
        let registry = registry();
        assert_eq!(
            registry.features(),
            &[
                "age",
                "monthlyincome",
                "department_Research & Development",
                "department_Sales",
                "overtime_Yes",
            ]
        );
    }

    #[test]
    fn test_one_hot_names() {
        let record = RawRecord::new()
            .with("overtime", "Yes")
            .with("age", 41_i64);
        let sparse = one_hot(&record);
        assert_eq!(sparse.get("overtime_Yes"), Some(&1.0));
        assert_eq!(sparse.get("age"), Some(&41.0));
        assert_eq!(sparse.len(), 2);
    }

    #[test]
    fn test_align_fills_and_drops() {
        let registry = registry();
        let mut sparse = OneHotRow::new();
        sparse.insert("monthlyincome".to_string(), 4200.0);
        sparse.insert("unexpected".to_string(), 9.0);

        let row = align_to_schema(&sparse, &registry);
        assert_eq!(row.values(), &[0.0, 4200.0, 0.0, 0.0, 0.0]);
        assert_eq!(row.fingerprint(), registry.fingerprint());
        assert!(row.ensure_aligned(&registry).is_ok());
    }

    #[test]
    fn test_unknown_category_zeroes_group() {
        let registry = registry();
        let record = RawRecord::new()
            .with("department", "Legal")
            .with("overtime", "Yes");

        let row = encode_record(&record, &registry);
        assert_eq!(row.get(&registry, "department_Sales"), Some(0.0));
        assert_eq!(row.get(&registry, "department_Research & Development"), Some(0.0));
        assert_eq!(row.get(&registry, "overtime_Yes"), Some(1.0));
    }

    #[test]
    fn test_reference_category_zeroes_group() {
        let registry = registry();
        let record = RawRecord::new().with("department", "Human Resources");
        let row = encode_record(&record, &registry);
        assert!(row.values().iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_ensure_aligned_rejects_foreign_registry() {
        let registry = registry();
        let other = SchemaRegistry::new(vec!["age".to_string()]).unwrap();
        let row = encode_record(&RawRecord::new(), &other);
        assert!(row.ensure_aligned(&registry).is_err());
    }
}
