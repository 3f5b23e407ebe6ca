//! DelayLens core - delivery delay analytics
//!
//! Derives a delay label from delivery times, measures how adverse
//! conditions associate with delay, and trains and compares classifiers
//! that predict delay from the categorical attributes.
//!
//! Modules:
//! - `dataset`: CSV loading and the delivery record model
//! - `labels`: delay threshold and per-record labels
//! - `encoding`: categorical value -> integer encodings
//! - `rules`: support/confidence/lift of condition => delay rules
//! - `split`: deterministic train/test partitioning
//! - `classifier`: neighbor, tree and linear classifier variants
//! - `harness`: evaluation and model selection
//! - `tree`: bounded-depth categorical decision tree
//! - `session`: per-dataset analysis state and single-record prediction
//! - `report`: report assembly and canonical JSON

pub mod classifier;
pub mod config;
pub mod dataset;
pub mod deterministic;
pub mod encoding;
pub mod errors;
pub mod harness;
pub mod labels;
pub mod metrics;
pub mod report;
pub mod rules;
pub mod session;
pub mod split;
pub mod tree;

pub use classifier::{Classifier, ClassifierKind};
pub use config::AnalysisConfig;
pub use dataset::{Attribute, Dataset, DeliveryRecord, LoadReport, MissingPolicy};
pub use encoding::{CategoryEncoding, EncodedTable, FeatureEncoder};
pub use errors::{AnalysisError, Result};
pub use harness::{select_best, Harness, HarnessReport};
pub use labels::{compute_threshold, label_of, DelayLabels, DelayThreshold};
pub use metrics::{ClassificationReport, EvaluationResult};
pub use report::{canonical_json_string, AnalysisReport};
pub use rules::{AdverseConditions, Clause, Condition, RuleEngine, RuleMetrics};
pub use session::{AnalysisSession, DeliveryQuery, QueryPrediction, TreeStudy};
pub use split::{split, Partition};
pub use tree::{DecisionTree, TreeConfig};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
