//! Gradient Boosted Decision Tree classifier for attrition risk
//!
//! The ensemble is a binary logistic model: every tree adds a log-odds
//! contribution and the positive-class probability is the sigmoid of the
//! summed margin.
//!
//! # Model Format
//!
//! Models are serialized as canonical JSON (sorted keys, no whitespace):
//!
//! ```json
//! {
//!   "base_margin": -0.12,
//!   "feature_count": 44,
//!   "metadata": {"created_at": 1760000000, "learning_rate": 0.01, "...": "..."},
//!   "schema_fingerprint": "5f0c...",
//!   "trees": [
//!     {"nodes": [
//!       {"cover":1470.0,"feature_idx":12,"id":0,"leaf":null,"left":1,"right":2,"threshold":0.5},
//!       {"cover":1054.0,"feature_idx":-1,"id":1,"leaf":-0.0071,"left":-1,"right":-1,"threshold":0.0},
//!       {"cover":416.0,"feature_idx":-1,"id":2,"leaf":0.0093,"left":-1,"right":-1,"threshold":0.0}
//!     ]}
//!   ],
//!   "version": 1
//! }
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use retention_core::gbdt::{Model, Node, Tree};
//!
//! let tree = Tree::new(vec![
//!     Node::internal(0, 0, 0.5, 1, 2, 100.0),
//!     Node::leaf(1, -0.2, 70.0),
//!     Node::leaf(2, 0.4, 30.0),
//! ]);
//! let model = Model::new(vec![tree], 0.0, 1, "schema-fingerprint");
//!
//! let probability = model.probability(&[1.0]);
//! let hash = model.hash_hex().unwrap();
//! ```

pub mod model;
pub mod tree;

pub use model::{logit, sigmoid, Model, ModelError, ModelMetadata, MODEL_VERSION};
pub use tree::{Node, Tree};
