//! Classifier variants behind one `fit`/`predict` contract
//!
//! The harness walks [`ClassifierKind::ORDER`]; that order is also the
//! tie-break when two variants reach the same accuracy.

mod linear;
mod neighbors;
mod tree_variant;

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::AnalysisConfig;
use crate::encoding::FeatureRow;
use crate::errors::Result;

pub use linear::{LinearClassifier, LinearConfig};
pub use neighbors::NeighborsClassifier;
pub use tree_variant::TreeClassifier;

/// Identifier of a classifier variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassifierKind {
    Neighbors,
    DecisionTree,
    Linear,
}

impl ClassifierKind {
    /// Evaluation order, and the tie-break order for model selection
    pub const ORDER: [ClassifierKind; 3] = [
        ClassifierKind::Neighbors,
        ClassifierKind::DecisionTree,
        ClassifierKind::Linear,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ClassifierKind::Neighbors => "k-nearest neighbors",
            ClassifierKind::DecisionTree => "decision tree",
            ClassifierKind::Linear => "logistic regression",
        }
    }

    /// Unfitted classifier of this kind configured from `config`
    pub fn build(self, config: &AnalysisConfig) -> Box<dyn Classifier> {
        match self {
            ClassifierKind::Neighbors => Box::new(NeighborsClassifier::new(config.neighbors)),
            ClassifierKind::DecisionTree => Box::new(TreeClassifier::new(config.tree.clone())),
            ClassifierKind::Linear => Box::new(LinearClassifier::new(config.linear.clone())),
        }
    }
}

impl fmt::Display for ClassifierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Binary classifier over encoded categorical rows
pub trait Classifier: Send + Sync {
    fn kind(&self) -> ClassifierKind;

    /// Train on `features`/`labels`, replacing any previous state
    fn fit(&mut self, features: &[FeatureRow], labels: &[bool]) -> Result<()>;

    /// Predicted label of one row; fails when called before `fit`
    fn predict(&self, features: &[u32]) -> Result<bool>;

    fn predict_batch(&self, rows: &[FeatureRow]) -> Result<Vec<bool>> {
        rows.iter().map(|row| self.predict(row)).collect()
    }
}
