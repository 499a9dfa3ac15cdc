//! Employee attrition risk core
//!
//! Scores an employee record with a trained GBDT classifier, explains the
//! score with per-feature TreeSHAP attributions and maps the features that
//! push the risk up to HR interventions.
//!
//! Modules:
//! - `schema`: Ordered feature registry captured at training time
//! - `record`: Raw employee records and the typed profile behind them
//! - `encoding`: One-hot encoding and alignment to the registry
//! - `gbdt`: Logistic gradient boosted trees
//! - `scorer`: Probability and binarized decision
//! - `attribution`: Exact path-dependent TreeSHAP
//! - `recommendations`: Ordered knowledge base of interventions
//! - `context`: Loaded artifacts shared by every request
//! - `pipeline`: Per-request analysis
//! - `report`: Text rendering
//! - `config`: TOML configuration with environment overrides

pub mod attribution;
pub mod config;
pub mod context;
pub mod encoding;
pub mod errors;
pub mod gbdt;
pub mod pipeline;
pub mod recommendations;
pub mod record;
pub mod report;
pub mod schema;
pub mod scorer;
pub mod serde_canon;

pub use attribution::{AttributionVector, Attributor, FeatureAttribution, TreeShapExplainer};
pub use config::RetentionConfig;
pub use context::AnalysisContext;
pub use encoding::{align_to_schema, encode_record, fit_schema, ColumnSpec, EncodedRow};
pub use errors::{Result, RetentionError};
pub use gbdt::{Model, Node, Tree};
pub use pipeline::{analyze, analyze_profile, RiskBand, RiskReport};
pub use recommendations::{KnowledgeBase, Recommendation, Rule};
pub use record::{EmployeeProfile, FieldValue, RawRecord, CATEGORICAL_FIELDS};
pub use report::render_text;
pub use schema::SchemaRegistry;
pub use scorer::{score_row, Classifier, RiskScore, DECISION_THRESHOLD};

/// Crate version string
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
