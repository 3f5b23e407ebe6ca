//! Analysis session
//!
//! Everything derived from one loaded dataset: threshold, labels, encodings
//! and the encoded table. A session is built when a dataset is loaded and
//! thrown away on reload; nothing is shared between sessions.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

use crate::config::AnalysisConfig;
use crate::dataset::{Attribute, Dataset, LoadReport, FEATURE_COUNT};
use crate::encoding::{EncodedTable, FeatureEncoder};
use crate::errors::Result;
use crate::harness::{Harness, HarnessReport};
use crate::labels::{DelayLabels, DelayThreshold};
use crate::metrics::{ClassificationReport, LABEL_NAMES};
use crate::rules::{RuleEngine, RuleMetrics};
use crate::split::{split, Partition};
use crate::tree::DecisionTree;

/// The four categorical values of one delivery to classify
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryQuery {
    pub weather: String,
    pub traffic: String,
    pub vehicle: String,
    pub area: String,
}

impl DeliveryQuery {
    pub fn new(
        weather: impl Into<String>,
        traffic: impl Into<String>,
        vehicle: impl Into<String>,
        area: impl Into<String>,
    ) -> Self {
        Self {
            weather: weather.into(),
            traffic: traffic.into(),
            vehicle: vehicle.into(),
            area: area.into(),
        }
    }

    /// Values in [`Attribute::ALL`] order
    pub fn values(&self) -> [&str; FEATURE_COUNT] {
        [&self.weather, &self.traffic, &self.vehicle, &self.area]
    }
}

/// One decision on the route to a prediction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathStep {
    pub attribute: Attribute,
    pub value: String,
}

/// Outcome of a single-record prediction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryPrediction {
    pub delayed: bool,
    pub label: String,
    /// Tree node whose majority label was used
    pub node: usize,
    pub path: Vec<PathStep>,
    pub fallback: bool,
}

/// Decision tree fitted on the train side and scored on the test side
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeStudy {
    pub model: DecisionTree,
    pub encoder: FeatureEncoder,
    pub accuracy: f64,
    pub report: ClassificationReport,
}

impl TreeStudy {
    /// Classify one delivery. Values unseen when the encoder was fitted are
    /// rejected with `UnknownCategory`.
    pub fn predict(&self, query: &DeliveryQuery) -> Result<QueryPrediction> {
        let row = self.encoder.encode_values(query.values())?;
        let explained = self.model.predict_explained(&row);

        let path = explained
            .path
            .iter()
            .filter_map(|&(feature, code)| {
                Attribute::from_index(feature).map(|attribute| PathStep {
                    attribute,
                    value: self.encoder.decode(attribute, code).to_string(),
                })
            })
            .collect();

        Ok(QueryPrediction {
            delayed: explained.label,
            label: LABEL_NAMES[explained.label as usize].to_string(),
            node: explained.node,
            path,
            fallback: explained.fallback,
        })
    }

    /// Text view of the fitted tree
    pub fn render(&self) -> String {
        self.model.render(&self.encoder)
    }
}

/// State derived from one dataset snapshot
#[derive(Debug, Clone)]
pub struct AnalysisSession {
    config: AnalysisConfig,
    dataset: Dataset,
    labels: DelayLabels,
    encoder: FeatureEncoder,
    table: EncodedTable,
    fingerprint: String,
}

impl AnalysisSession {
    /// Derive threshold, labels and encodings from `dataset`
    pub fn new(dataset: Dataset, config: AnalysisConfig) -> Result<Self> {
        config.validate()?;

        let labels = DelayLabels::derive(&dataset)?;
        info!(
            "Delay threshold: {:.2} min (mean {:.2} + std {:.2}); {} delayed of {}",
            labels.threshold.value,
            labels.threshold.mean,
            labels.threshold.std_dev,
            labels.delayed_count(),
            labels.len()
        );

        let encoder = FeatureEncoder::fit(&dataset);
        let table = encoder.encode_dataset(&dataset, &labels.labels)?;
        let fingerprint = fingerprint(&dataset);

        Ok(Self {
            config,
            dataset,
            labels,
            encoder,
            table,
            fingerprint,
        })
    }

    /// Load a CSV with the configured missing-value policy and start a session
    pub fn from_csv<P: AsRef<Path>>(path: P, config: AnalysisConfig) -> Result<(Self, LoadReport)> {
        let (dataset, report) = Dataset::from_csv(path, config.missing)?;
        Ok((Self::new(dataset, config)?, report))
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn threshold(&self) -> &DelayThreshold {
        &self.labels.threshold
    }

    pub fn labels(&self) -> &DelayLabels {
        &self.labels
    }

    pub fn encoder(&self) -> &FeatureEncoder {
        &self.encoder
    }

    pub fn table(&self) -> &EncodedTable {
        &self.table
    }

    /// blake3 hex digest of the dataset contents
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn rule_engine(&self) -> Result<RuleEngine<'_>> {
        RuleEngine::new(&self.dataset, &self.labels.labels)
    }

    /// The standard rules over the configured adverse sets
    pub fn association_rules(&self) -> Result<Vec<RuleMetrics>> {
        Ok(self.rule_engine()?.standard_rules(&self.config.adverse))
    }

    /// Train/test partition with the configured fraction and seed
    pub fn partition(&self) -> Result<Partition> {
        split(&self.table, self.config.test_fraction, self.config.seed)
    }

    /// Fit and score every classifier variant
    pub fn evaluate_classifiers(&self) -> Result<HarnessReport> {
        let partition = self.partition()?;
        Harness::new(&self.config).run(&partition)
    }

    /// Fit the decision tree on the train side and report on the test side
    pub fn decision_tree_study(&self) -> Result<TreeStudy> {
        let partition = self.partition()?;
        let model = DecisionTree::fit(
            self.config.tree.clone(),
            &partition.train.features,
            &partition.train.labels,
        )?;

        let predicted: Vec<bool> = partition
            .test
            .features
            .iter()
            .map(|row| model.predict(row))
            .collect();
        let report = ClassificationReport::from_predictions(&partition.test.labels, &predicted)?;
        info!(
            "Decision tree: {} nodes, depth {} (max {}), test accuracy {:.4}",
            model.node_count(),
            model.depth(),
            model.config().max_depth,
            report.accuracy
        );

        Ok(TreeStudy {
            model,
            encoder: self.encoder.clone(),
            accuracy: report.accuracy,
            report,
        })
    }
}

fn fingerprint(dataset: &Dataset) -> String {
    let mut hasher = blake3::Hasher::new();
    for record in dataset.records() {
        for attribute in Attribute::ALL {
            hasher.update(record.value(attribute).as_bytes());
            hasher.update(&[0x1f]);
        }
        hasher.update(&record.delivery_time.to_bits().to_le_bytes());
        hasher.update(&[0x1e]);
    }
    hex::encode(hasher.finalize().as_bytes())
}
