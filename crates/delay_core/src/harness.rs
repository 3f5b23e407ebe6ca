//! Classifier harness
//!
//! Fits every variant on the train side of a partition, scores it on the test
//! side and picks the most accurate one. Variants are independent; with
//! `parallel` set they run on the rayon pool and results are still collected
//! in variant order.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::classifier::{Classifier, ClassifierKind};
use crate::config::AnalysisConfig;
use crate::errors::{AnalysisError, Result};
use crate::metrics::{ConfusionMatrix, EvaluationResult};
use crate::split::Partition;

/// Test-set scores of one variant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantResult {
    pub kind: ClassifierKind,
    pub evaluation: EvaluationResult,
    pub confusion: ConfusionMatrix,
}

/// Scores of every variant plus the selected one
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HarnessReport {
    /// In evaluation order
    pub results: Vec<VariantResult>,
    pub best: ClassifierKind,
}

impl HarnessReport {
    pub fn result(&self, kind: ClassifierKind) -> Option<&VariantResult> {
        self.results.iter().find(|r| r.kind == kind)
    }

    pub fn best_result(&self) -> Option<&VariantResult> {
        self.result(self.best)
    }
}

/// First variant with the maximum accuracy
pub fn select_best(results: &[VariantResult]) -> Option<ClassifierKind> {
    let mut best: Option<&VariantResult> = None;
    for result in results {
        if best.map_or(true, |b| result.evaluation.accuracy > b.evaluation.accuracy) {
            best = Some(result);
        }
    }
    best.map(|r| r.kind)
}

/// Runs a fixed, ordered list of classifiers
pub struct Harness {
    classifiers: Vec<Box<dyn Classifier>>,
    parallel: bool,
}

impl Harness {
    /// The standard variants in [`ClassifierKind::ORDER`]
    pub fn new(config: &AnalysisConfig) -> Self {
        Self {
            classifiers: ClassifierKind::ORDER
                .iter()
                .map(|kind| kind.build(config))
                .collect(),
            parallel: config.parallel,
        }
    }

    /// Custom classifier list; list order is the tie-break order
    pub fn with_classifiers(classifiers: Vec<Box<dyn Classifier>>, parallel: bool) -> Self {
        Self {
            classifiers,
            parallel,
        }
    }

    pub fn kinds(&self) -> Vec<ClassifierKind> {
        self.classifiers.iter().map(|c| c.kind()).collect()
    }

    /// Fit, predict and score every classifier on `partition`
    pub fn run(&mut self, partition: &Partition) -> Result<HarnessReport> {
        if self.classifiers.is_empty() {
            return Err(AnalysisError::InvalidParameters(
                "harness has no classifiers".to_string(),
            ));
        }

        let evaluate = |classifier: &mut Box<dyn Classifier>| -> Result<VariantResult> {
            classifier.fit(&partition.train.features, &partition.train.labels)?;
            let predicted = classifier.predict_batch(&partition.test.features)?;
            let confusion = ConfusionMatrix::from_predictions(&partition.test.labels, &predicted)?;
            let evaluation = confusion.evaluation();

            info!(
                "{}: accuracy={:.4} precision={:.4} recall={:.4} f1={:.4}",
                classifier.kind(),
                evaluation.accuracy,
                evaluation.precision,
                evaluation.recall,
                evaluation.f1
            );

            Ok(VariantResult {
                kind: classifier.kind(),
                evaluation,
                confusion,
            })
        };

        let results: Vec<VariantResult> = if self.parallel {
            self.classifiers
                .par_iter_mut()
                .map(evaluate)
                .collect::<Result<Vec<_>>>()?
        } else {
            self.classifiers
                .iter_mut()
                .map(evaluate)
                .collect::<Result<Vec<_>>>()?
        };

        let best = select_best(&results).ok_or_else(|| {
            AnalysisError::InvalidParameters("no classifier results".to_string())
        })?;
        info!("Best model: {}", best);

        Ok(HarnessReport { results, best })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::{EncodedTable, FeatureRow};

    fn result(kind: ClassifierKind, accuracy: f64) -> VariantResult {
        VariantResult {
            kind,
            evaluation: EvaluationResult {
                accuracy,
                ..EvaluationResult::default()
            },
            confusion: ConfusionMatrix::default(),
        }
    }

    #[test]
    fn test_equal_accuracy_goes_to_earlier_variant() {
        let results = vec![
            result(ClassifierKind::Neighbors, 0.80),
            result(ClassifierKind::DecisionTree, 0.82),
            result(ClassifierKind::Linear, 0.82),
        ];
        assert_eq!(select_best(&results), Some(ClassifierKind::DecisionTree));
    }

    #[test]
    fn test_strict_maximum_wins() {
        let results = vec![
            result(ClassifierKind::Neighbors, 0.70),
            result(ClassifierKind::DecisionTree, 0.75),
            result(ClassifierKind::Linear, 0.90),
        ];
        assert_eq!(select_best(&results), Some(ClassifierKind::Linear));
        assert_eq!(select_best(&[]), None);
    }

    /// Predicts one fixed label regardless of input
    struct Constant(ClassifierKind, bool);

    impl Classifier for Constant {
        fn kind(&self) -> ClassifierKind {
            self.0
        }

        fn fit(&mut self, _: &[FeatureRow], _: &[bool]) -> Result<()> {
            Ok(())
        }

        fn predict(&self, _: &[u32]) -> Result<bool> {
            Ok(self.1)
        }
    }

    fn partition() -> Partition {
        let table = EncodedTable {
            features: vec![vec![0]; 4],
            labels: vec![false, false, false, true],
        };
        Partition {
            train: table.clone(),
            test: table,
            train_indices: vec![0, 1, 2, 3],
            test_indices: vec![0, 1, 2, 3],
        }
    }

    #[test]
    fn test_run_scores_in_list_order() {
        let classifiers: Vec<Box<dyn Classifier>> = vec![
            Box::new(Constant(ClassifierKind::Neighbors, true)),
            Box::new(Constant(ClassifierKind::DecisionTree, false)),
            Box::new(Constant(ClassifierKind::Linear, false)),
        ];
        let mut harness = Harness::with_classifiers(classifiers, false);
        let report = harness.run(&partition()).unwrap();

        assert_eq!(report.results[0].evaluation.accuracy, 0.25);
        assert_eq!(report.results[1].evaluation.accuracy, 0.75);
        assert_eq!(report.best, ClassifierKind::DecisionTree);
        assert_eq!(report.best_result().unwrap().confusion.tn, 3);
    }

    #[test]
    fn test_parallel_run_matches_sequential() {
        let build = || -> Vec<Box<dyn Classifier>> {
            vec![
                Box::new(Constant(ClassifierKind::Neighbors, false)),
                Box::new(Constant(ClassifierKind::DecisionTree, true)),
                Box::new(Constant(ClassifierKind::Linear, false)),
            ]
        };
        let sequential = Harness::with_classifiers(build(), false)
            .run(&partition())
            .unwrap();
        let parallel = Harness::with_classifiers(build(), true)
            .run(&partition())
            .unwrap();

        assert_eq!(sequential, parallel);
        assert_eq!(parallel.best, ClassifierKind::Neighbors);
    }

    #[test]
    fn test_standard_harness_follows_tie_break_order() {
        let harness = Harness::new(&AnalysisConfig::default());
        assert_eq!(harness.kinds(), ClassifierKind::ORDER);
    }

    #[test]
    fn test_empty_harness_is_rejected() {
        let mut harness = Harness::with_classifiers(Vec::new(), false);
        assert!(harness.run(&partition()).is_err());
    }
}
