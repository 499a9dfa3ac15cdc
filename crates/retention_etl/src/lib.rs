//! Batch pipeline for the HR attrition dataset
//!
//! Extracts the raw CSV through a `DatasetSource`, drops columns without
//! signal, encodes the target, normalizes column names and stores the result
//! as a columnar JSON snapshot the trainer reads.

pub mod errors;
pub mod extract;
pub mod frame;
pub mod load;
pub mod pipeline;
pub mod transform;

pub use errors::{EtlError, Result};
pub use extract::{DatasetSource, Extractor, LocalFileSource};
pub use frame::{Column, ColumnValues, Frame};
pub use pipeline::{EtlPipeline, EtlSummary};
pub use transform::{normalize_column_name, transform};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
