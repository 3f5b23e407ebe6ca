use crate::encoding::FeatureRow;
use crate::errors::{AnalysisError, Result};
use crate::tree::{DecisionTree, TreeConfig};

use super::{Classifier, ClassifierKind};

/// Harness adapter around [`DecisionTree`]
#[derive(Debug, Clone)]
pub struct TreeClassifier {
    config: TreeConfig,
    model: Option<DecisionTree>,
}

impl TreeClassifier {
    pub fn new(config: TreeConfig) -> Self {
        Self {
            config,
            model: None,
        }
    }
}

impl Classifier for TreeClassifier {
    fn kind(&self) -> ClassifierKind {
        ClassifierKind::DecisionTree
    }

    fn fit(&mut self, features: &[FeatureRow], labels: &[bool]) -> Result<()> {
        self.model = Some(DecisionTree::fit(self.config.clone(), features, labels)?);
        Ok(())
    }

    fn predict(&self, features: &[u32]) -> Result<bool> {
        self.model
            .as_ref()
            .map(|tree| tree.predict(features))
            .ok_or(AnalysisError::NotFitted(ClassifierKind::DecisionTree.name()))
    }
}
