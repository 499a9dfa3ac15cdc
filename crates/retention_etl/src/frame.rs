//! Minimal columnar table for the HR dataset
//!
//! CSV input is read with the `csv` crate. A column is numeric when every
//! non-empty cell parses as a finite number, otherwise it is text. Empty
//! cells are missing values in either kind.
//!
//! Frames persist as a columnar JSON snapshot:
//!
//! ```json
//! {"version":1,"rows":2,"columns":[
//!   {"name":"age","type":"numeric","values":[41.0,49.0]},
//!   {"name":"overtime","type":"text","values":["Yes","No"]}
//! ]}
//! ```

use crate::errors::{EtlError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::io::Read;
use std::path::Path;

/// Snapshot format version
pub const SNAPSHOT_VERSION: u32 = 1;

/// Cells of one column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "values", rename_all = "lowercase")]
pub enum ColumnValues {
    Numeric(Vec<Option<f64>>),
    Text(Vec<Option<String>>),
}

impl ColumnValues {
    pub fn len(&self) -> usize {
        match self {
            ColumnValues::Numeric(values) => values.len(),
            ColumnValues::Text(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, ColumnValues::Numeric(_))
    }

    fn infer(cells: Vec<Option<String>>) -> Self {
        let parsed: Option<Vec<Option<f64>>> = cells
            .iter()
            .map(|cell| match cell {
                None => Some(None),
                Some(text) => text.parse::<f64>().ok().filter(|v| v.is_finite()).map(Some),
            })
            .collect();

        match parsed {
            Some(numbers) => ColumnValues::Numeric(numbers),
            None => ColumnValues::Text(cells),
        }
    }
}

/// A named column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    #[serde(flatten)]
    pub values: ColumnValues,
}

impl Column {
    pub fn numeric(name: &str, values: Vec<Option<f64>>) -> Self {
        Self {
            name: name.to_string(),
            values: ColumnValues::Numeric(values),
        }
    }

    pub fn text<S: Into<String>>(name: &str, values: Vec<Option<S>>) -> Self {
        Self {
            name: name.to_string(),
            values: ColumnValues::Text(values.into_iter().map(|v| v.map(Into::into)).collect()),
        }
    }
}

/// Ordered set of equally long, uniquely named columns
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    columns: Vec<Column>,
    rows: usize,
}

#[derive(Serialize, Deserialize)]
struct Snapshot {
    version: u32,
    rows: usize,
    columns: Vec<Column>,
}

impl Frame {
    pub fn new(columns: Vec<Column>) -> Result<Self> {
        let rows = columns.first().map(|c| c.values.len()).unwrap_or(0);
        let mut names = HashSet::new();
        for column in &columns {
            if column.values.len() != rows {
                return Err(EtlError::Shape(format!(
                    "column '{}' has {} rows, expected {}",
                    column.name,
                    column.values.len(),
                    rows
                )));
            }
            if !names.insert(column.name.as_str()) {
                return Err(EtlError::Shape(format!("duplicate column '{}'", column.name)));
            }
        }
        Ok(Self { columns, rows })
    }

    /// Read a CSV with a header row
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        let mut cells: Vec<Vec<Option<String>>> = vec![Vec::new(); headers.len()];

        for record in reader.records() {
            let record = record?;
            if record.len() != headers.len() {
                return Err(EtlError::Shape(format!(
                    "line {}: expected {} fields, got {}",
                    record.position().map(|p| p.line()).unwrap_or(0),
                    headers.len(),
                    record.len()
                )));
            }
            for (column, cell) in cells.iter_mut().zip(record.iter()) {
                column.push((!cell.is_empty()).then(|| cell.to_string()));
            }
        }

        let columns = headers
            .into_iter()
            .zip(cells)
            .map(|(name, cells)| Column {
                name,
                values: ColumnValues::infer(cells),
            })
            .collect();
        Self::new(columns)
    }

    pub fn read_csv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = fs::File::open(path)?;
        Self::from_csv_reader(file)
    }

    pub fn n_rows(&self) -> usize {
        self.rows
    }

    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    /// Drop the named columns that exist, returning the names dropped
    pub fn drop_columns(&mut self, names: &[&str]) -> Vec<String> {
        let mut dropped = Vec::new();
        self.columns.retain(|c| {
            if names.contains(&c.name.as_str()) {
                dropped.push(c.name.clone());
                false
            } else {
                true
            }
        });
        dropped
    }

    /// Replace the cells of an existing column
    pub fn replace_values(&mut self, name: &str, values: ColumnValues) -> Result<()> {
        if values.len() != self.rows {
            return Err(EtlError::Shape(format!(
                "replacement for '{}' has {} rows, expected {}",
                name,
                values.len(),
                self.rows
            )));
        }
        let column = self
            .columns
            .iter_mut()
            .find(|c| c.name == name)
            .ok_or_else(|| EtlError::Shape(format!("no column named '{name}'")))?;
        column.values = values;
        Ok(())
    }

    /// Rename every column; fails if two columns end up with the same name
    pub fn rename_columns<F: Fn(&str) -> String>(&mut self, rename: F) -> Result<()> {
        let names: Vec<String> = self.columns.iter().map(|c| rename(&c.name)).collect();
        let mut seen = HashSet::new();
        if let Some(duplicate) = names.iter().find(|n| !seen.insert(n.as_str())) {
            return Err(EtlError::Shape(format!(
                "renaming produces duplicate column '{duplicate}'"
            )));
        }

        for (column, name) in self.columns.iter_mut().zip(names) {
            column.name = name;
        }
        Ok(())
    }

    pub fn save_snapshot<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let snapshot = Snapshot {
            version: SNAPSHOT_VERSION,
            rows: self.rows,
            columns: self.columns.clone(),
        };
        fs::write(path, serde_json::to_string(&snapshot)?)?;
        Ok(())
    }

    pub fn load_snapshot<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let snapshot: Snapshot = serde_json::from_str(&content)?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(EtlError::SnapshotVersion(snapshot.version));
        }
        let frame = Self::new(snapshot.columns)?;
        if frame.n_cols() > 0 && frame.rows != snapshot.rows {
            return Err(EtlError::Shape(format!(
                "snapshot declares {} rows, columns hold {}",
                snapshot.rows, frame.rows
            )));
        }
        Ok(frame)
    }
}
