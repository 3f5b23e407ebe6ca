//! Majority vote of the `k` nearest training rows
//!
//! Distance is squared Euclidean over the encoded codes. Equidistant rows are
//! ordered by training index, and a split vote goes to `false`.

use crate::encoding::FeatureRow;
use crate::errors::{AnalysisError, Result};

use super::{Classifier, ClassifierKind};

#[derive(Debug, Clone)]
pub struct NeighborsClassifier {
    k: usize,
    features: Vec<FeatureRow>,
    labels: Vec<bool>,
}

impl NeighborsClassifier {
    pub fn new(k: usize) -> Self {
        Self {
            k: k.max(1),
            features: Vec::new(),
            labels: Vec::new(),
        }
    }
}

fn squared_distance(a: &[u32], b: &[u32]) -> u64 {
    a.iter()
        .zip(b)
        .map(|(&x, &y)| {
            let d = x.abs_diff(y) as u64;
            d * d
        })
        .sum()
}

impl Classifier for NeighborsClassifier {
    fn kind(&self) -> ClassifierKind {
        ClassifierKind::Neighbors
    }

    fn fit(&mut self, features: &[FeatureRow], labels: &[bool]) -> Result<()> {
        if features.is_empty() {
            return Err(AnalysisError::EmptyDataset {
                stage: "neighbors fit",
            });
        }
        if features.len() != labels.len() {
            return Err(AnalysisError::InvalidParameters(format!(
                "{} feature rows but {} labels",
                features.len(),
                labels.len()
            )));
        }
        self.features = features.to_vec();
        self.labels = labels.to_vec();
        Ok(())
    }

    fn predict(&self, features: &[u32]) -> Result<bool> {
        if self.features.is_empty() {
            return Err(AnalysisError::NotFitted(ClassifierKind::Neighbors.name()));
        }

        let mut distances: Vec<(u64, usize)> = self
            .features
            .iter()
            .enumerate()
            .map(|(idx, row)| (squared_distance(row, features), idx))
            .collect();

        let k = self.k.min(distances.len());
        if k < distances.len() {
            distances.select_nth_unstable(k - 1);
        }

        let delayed = distances[..k]
            .iter()
            .filter(|&&(_, idx)| self.labels[idx])
            .count();
        Ok(delayed * 2 > k)
    }
}
