//! Transform stage: drop constant/identifier columns, encode the target,
//! normalize column names

use crate::errors::Result;
use crate::frame::{ColumnValues, Frame};
use tracing::{info, warn};

/// Columns carrying no signal (constants or row identifiers)
pub const DROPPED_COLUMNS: [&str; 4] = ["EmployeeCount", "Over18", "StandardHours", "EmployeeNumber"];

/// Target column as it appears in the raw dataset
pub const TARGET_COLUMN: &str = "Attrition";

/// Lowercase with spaces replaced by underscores
pub fn normalize_column_name(name: &str) -> String {
    name.to_lowercase().replace(' ', "_")
}

/// Clean a raw frame into the training snapshot layout
pub fn transform(mut frame: Frame) -> Result<Frame> {
    let dropped = frame.drop_columns(&DROPPED_COLUMNS);
    if !dropped.is_empty() {
        info!("Dropped columns: {:?}", dropped);
    }

    if let Some(column) = frame.column(TARGET_COLUMN) {
        if let ColumnValues::Text(values) = &column.values {
            let (encoded, unmapped) = encode_target(values);
            if unmapped > 0 {
                warn!(unmapped, "{} values other than Yes/No left missing", TARGET_COLUMN);
            }
            frame.replace_values(TARGET_COLUMN, ColumnValues::Numeric(encoded))?;
            info!("Encoded '{}' to binary (1/0)", TARGET_COLUMN);
        }
    }

    frame.rename_columns(normalize_column_name)?;
    info!(rows = frame.n_rows(), columns = frame.n_cols(), "data cleaned");
    Ok(frame)
}

fn encode_target(values: &[Option<String>]) -> (Vec<Option<f64>>, usize) {
    let mut unmapped = 0;
    let encoded = values
        .iter()
        .map(|value| match value.as_deref() {
            Some("Yes") => Some(1.0),
            Some("No") => Some(0.0),
            _ => {
                unmapped += 1;
                None
            }
        })
        .collect();
    (encoded, unmapped)
}
