//! Logistic regression trained by full-batch gradient descent
//!
//! Features are standardized with the training mean and standard deviation.
//! Weights start at zero and the L2 penalty is scaled by `1 / n`, so the
//! objective is the mean log-loss plus `l2 / (2n) * |w|^2`.

use serde::{Deserialize, Serialize};

use crate::encoding::FeatureRow;
use crate::errors::{AnalysisError, Result};

use super::{Classifier, ClassifierKind};

/// Optimizer settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinearConfig {
    pub learning_rate: f64,
    pub epochs: usize,
    /// L2 penalty weight (`1 / C`)
    pub l2: f64,
}

impl Default for LinearConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.1,
            epochs: 500,
            l2: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct LinearModel {
    means: Vec<f64>,
    scales: Vec<f64>,
    weights: Vec<f64>,
    bias: f64,
}

impl LinearModel {
    fn margin(&self, features: &[u32]) -> f64 {
        self.weights
            .iter()
            .zip(self.standardize(features))
            .map(|(w, x)| w * x)
            .sum::<f64>()
            + self.bias
    }

    fn standardize<'a>(&'a self, features: &'a [u32]) -> impl Iterator<Item = f64> + 'a {
        features
            .iter()
            .zip(self.means.iter().zip(&self.scales))
            .map(|(&x, (mean, scale))| (x as f64 - mean) / scale)
    }
}

#[derive(Debug, Clone)]
pub struct LinearClassifier {
    config: LinearConfig,
    model: Option<LinearModel>,
}

impl LinearClassifier {
    pub fn new(config: LinearConfig) -> Self {
        Self {
            config,
            model: None,
        }
    }

    /// `P(delayed)` for one row
    pub fn probability(&self, features: &[u32]) -> Result<f64> {
        let model = self
            .model
            .as_ref()
            .ok_or(AnalysisError::NotFitted(ClassifierKind::Linear.name()))?;
        Ok(sigmoid(model.margin(features)))
    }

    /// Fitted `(weights, bias)` in standardized feature space
    pub fn coefficients(&self) -> Option<(&[f64], f64)> {
        self.model.as_ref().map(|m| (m.weights.as_slice(), m.bias))
    }
}

fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

impl Classifier for LinearClassifier {
    fn kind(&self) -> ClassifierKind {
        ClassifierKind::Linear
    }

    fn fit(&mut self, features: &[FeatureRow], labels: &[bool]) -> Result<()> {
        if features.is_empty() {
            return Err(AnalysisError::EmptyDataset {
                stage: "linear fit",
            });
        }
        if features.len() != labels.len() {
            return Err(AnalysisError::InvalidParameters(format!(
                "{} feature rows but {} labels",
                features.len(),
                labels.len()
            )));
        }

        let n = features.len() as f64;
        let dims = features[0].len();

        let mut means = vec![0.0; dims];
        for row in features {
            for (m, &x) in means.iter_mut().zip(row) {
                *m += x as f64;
            }
        }
        means.iter_mut().for_each(|m| *m /= n);

        let mut scales = vec![0.0; dims];
        for row in features {
            for ((s, &x), m) in scales.iter_mut().zip(row).zip(&means) {
                *s += (x as f64 - m).powi(2);
            }
        }
        for s in &mut scales {
            *s = (*s / n).sqrt();
            if *s == 0.0 {
                *s = 1.0;
            }
        }

        let mut model = LinearModel {
            means,
            scales,
            weights: vec![0.0; dims],
            bias: 0.0,
        };

        let standardized: Vec<Vec<f64>> = features
            .iter()
            .map(|row| model.standardize(row).collect())
            .collect();
        let targets: Vec<f64> = labels.iter().map(|&l| if l { 1.0 } else { 0.0 }).collect();
        let penalty = self.config.l2 / n;

        for _ in 0..self.config.epochs {
            let mut grad_w = vec![0.0; dims];
            let mut grad_b = 0.0;

            for (row, &y) in standardized.iter().zip(&targets) {
                let z: f64 = model.weights.iter().zip(row).map(|(w, x)| w * x).sum::<f64>()
                    + model.bias;
                let err = sigmoid(z) - y;
                for (g, x) in grad_w.iter_mut().zip(row) {
                    *g += err * x;
                }
                grad_b += err;
            }

            for (w, g) in model.weights.iter_mut().zip(&grad_w) {
                *w -= self.config.learning_rate * (g / n + penalty * *w);
            }
            model.bias -= self.config.learning_rate * grad_b / n;
        }

        self.model = Some(model);
        Ok(())
    }

    fn predict(&self, features: &[u32]) -> Result<bool> {
        Ok(self.probability(features)? > 0.5)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sigmoid_is_stable_at_extremes() {
        assert_eq!(sigmoid(0.0), 0.5);
        assert!(sigmoid(800.0) <= 1.0);
        assert!(sigmoid(-800.0) >= 0.0);
        assert!(sigmoid(-800.0).is_finite());
    }

    #[test]
    fn test_constant_feature_does_not_divide_by_zero() {
        let features = vec![vec![3, 0], vec![3, 1], vec![3, 0], vec![3, 1]];
        let labels = vec![false, true, false, true];
        let mut clf = LinearClassifier::new(LinearConfig::default());
        clf.fit(&features, &labels).unwrap();

        let (weights, _) = clf.coefficients().unwrap();
        assert_eq!(weights[0], 0.0);
        assert!(weights[1] > 0.0);
        assert!(clf.predict(&[3, 1]).unwrap());
        assert!(!clf.predict(&[3, 0]).unwrap());
    }

    #[test]
    fn test_all_negative_labels_never_predict_delay() {
        let features = vec![vec![0], vec![1], vec![2]];
        let mut clf = LinearClassifier::new(LinearConfig::default());
        clf.fit(&features, &[false, false, false]).unwrap();
        for row in &features {
            assert!(clf.probability(row).unwrap() < 0.5);
        }
    }

    #[test]
    fn test_training_is_deterministic() {
        let features = vec![vec![0, 1], vec![1, 0], vec![2, 2], vec![1, 1]];
        let labels = vec![false, false, true, true];
        let mut a = LinearClassifier::new(LinearConfig::default());
        let mut b = LinearClassifier::new(LinearConfig::default());
        a.fit(&features, &labels).unwrap();
        b.fit(&features, &labels).unwrap();
        assert_eq!(a.coefficients(), b.coefficients());
    }
}
