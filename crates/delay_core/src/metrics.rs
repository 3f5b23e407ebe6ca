//! Binary classification metrics
//!
//! The positive class is `delayed` (`true`). Every ratio with a zero
//! denominator is reported as `0`.

use serde::{Deserialize, Serialize};

use crate::errors::{ratio, AnalysisError, Result};

/// Display names of the two labels, indexed by `label as usize`
pub const LABEL_NAMES: [&str; 2] = ["on time", "delayed"];

/// Counts of predicted vs actual labels
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    pub tp: usize,
    pub fp: usize,
    pub tn: usize,
    pub fn_: usize,
}

impl ConfusionMatrix {
    pub fn from_predictions(actual: &[bool], predicted: &[bool]) -> Result<Self> {
        if actual.len() != predicted.len() {
            return Err(AnalysisError::InvalidParameters(format!(
                "{} actual labels but {} predictions",
                actual.len(),
                predicted.len()
            )));
        }

        let mut matrix = Self::default();
        for (&a, &p) in actual.iter().zip(predicted) {
            match (a, p) {
                (true, true) => matrix.tp += 1,
                (false, true) => matrix.fp += 1,
                (false, false) => matrix.tn += 1,
                (true, false) => matrix.fn_ += 1,
            }
        }
        Ok(matrix)
    }

    pub fn total(&self) -> usize {
        self.tp + self.fp + self.tn + self.fn_
    }

    pub fn accuracy(&self) -> f64 {
        ratio(self.tp + self.tn, self.total())
    }

    /// Scores with `delayed` as the positive class
    pub fn evaluation(&self) -> EvaluationResult {
        let precision = ratio(self.tp, self.tp + self.fp);
        let recall = ratio(self.tp, self.tp + self.fn_);
        EvaluationResult {
            accuracy: self.accuracy(),
            precision,
            recall,
            f1: f1(precision, recall),
        }
    }

    /// Scores with `on time` as the positive class
    fn negative_class_scores(&self) -> (f64, f64) {
        let precision = ratio(self.tn, self.tn + self.fn_);
        let recall = ratio(self.tn, self.tn + self.fp);
        (precision, recall)
    }
}

/// Harmonic mean, `0` when both inputs are `0`
pub fn f1(precision: f64, recall: f64) -> f64 {
    let den = precision + recall;
    if den > 0.0 {
        2.0 * precision * recall / den
    } else {
        0.0
    }
}

/// Accuracy, precision, recall and F1 of one classifier
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
}

impl EvaluationResult {
    pub fn from_predictions(actual: &[bool], predicted: &[bool]) -> Result<Self> {
        Ok(ConfusionMatrix::from_predictions(actual, predicted)?.evaluation())
    }
}

/// Precision/recall/F1 and support of one label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelScores {
    pub label: String,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

/// Per-label report with accuracy, macro and support-weighted averages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationReport {
    /// `on time` first, then `delayed`
    pub labels: Vec<LabelScores>,
    pub accuracy: f64,
    pub macro_avg: LabelScores,
    pub weighted_avg: LabelScores,
    pub confusion: ConfusionMatrix,
}

impl ClassificationReport {
    pub fn from_predictions(actual: &[bool], predicted: &[bool]) -> Result<Self> {
        Ok(Self::from_confusion(ConfusionMatrix::from_predictions(
            actual, predicted,
        )?))
    }

    pub fn from_confusion(confusion: ConfusionMatrix) -> Self {
        let (neg_precision, neg_recall) = confusion.negative_class_scores();
        let positive = confusion.evaluation();

        let labels = vec![
            LabelScores {
                label: LABEL_NAMES[0].to_string(),
                precision: neg_precision,
                recall: neg_recall,
                f1: f1(neg_precision, neg_recall),
                support: confusion.tn + confusion.fp,
            },
            LabelScores {
                label: LABEL_NAMES[1].to_string(),
                precision: positive.precision,
                recall: positive.recall,
                f1: positive.f1,
                support: confusion.tp + confusion.fn_,
            },
        ];

        let total = confusion.total();
        let average = |name: &str, weight: &dyn Fn(&LabelScores) -> f64, norm: f64| {
            let scale = if norm > 0.0 { 1.0 / norm } else { 0.0 };
            LabelScores {
                label: name.to_string(),
                precision: labels.iter().map(|l| weight(l) * l.precision).sum::<f64>() * scale,
                recall: labels.iter().map(|l| weight(l) * l.recall).sum::<f64>() * scale,
                f1: labels.iter().map(|l| weight(l) * l.f1).sum::<f64>() * scale,
                support: total,
            }
        };

        let macro_avg = average("macro avg", &|_| 1.0, labels.len() as f64);
        let weighted_avg = average("weighted avg", &|l| l.support as f64, total as f64);

        Self {
            accuracy: confusion.accuracy(),
            labels,
            macro_avg,
            weighted_avg,
            confusion,
        }
    }

    /// Fixed-width text table
    pub fn render(&self) -> String {
        let mut out = format!(
            "{:>14} {:>10} {:>10} {:>10} {:>10}\n\n",
            "", "precision", "recall", "f1-score", "support"
        );
        for row in &self.labels {
            out.push_str(&format_row(row));
        }
        out.push('\n');
        out.push_str(&format!(
            "{:>14} {:>10} {:>10} {:>10.2} {:>10}\n",
            "accuracy",
            "",
            "",
            self.accuracy,
            self.confusion.total()
        ));
        out.push_str(&format_row(&self.macro_avg));
        out.push_str(&format_row(&self.weighted_avg));
        out
    }
}

fn format_row(row: &LabelScores) -> String {
    format!(
        "{:>14} {:>10.2} {:>10.2} {:>10.2} {:>10}\n",
        row.label, row.precision, row.recall, row.f1, row.support
    )
}
