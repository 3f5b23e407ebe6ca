//! Analysis report assembly and canonical JSON output
//!
//! Each stage's output is a [`ReportSection`]: a stage that fails is recorded
//! as skipped with its error message, and the other sections are still built.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use crate::dataset::{DatasetSummary, LoadReport};
use crate::errors::Result;
use crate::harness::HarnessReport;
use crate::labels::DelayThreshold;
use crate::metrics::ClassificationReport;
use crate::rules::RuleMetrics;
use crate::session::AnalysisSession;
use crate::tree::TreeNode;

/// Output of one stage, or the reason it was skipped
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ReportSection<T> {
    Ready { value: T },
    Skipped { reason: String },
}

impl<T> ReportSection<T> {
    fn from_result(stage: &str, result: Result<T>) -> Self {
        match result {
            Ok(value) => Self::Ready { value },
            Err(err) => {
                warn!("Skipping {stage}: {err}");
                Self::Skipped {
                    reason: err.to_string(),
                }
            }
        }
    }

    pub fn ready(&self) -> Option<&T> {
        match self {
            Self::Ready { value } => Some(value),
            Self::Skipped { .. } => None,
        }
    }
}

/// Threshold and label counts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelSummary {
    pub threshold: DelayThreshold,
    pub delayed: usize,
    pub on_time: usize,
}

/// Tree structure and its test-set report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeSummary {
    pub accuracy: f64,
    pub report: ClassificationReport,
    pub depth: usize,
    pub nodes: Vec<TreeNode>,
    pub rendered: String,
}

/// Everything the presentation layer displays for one session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub generated_at: String,
    pub dataset_fingerprint: String,
    pub load: Option<LoadReport>,
    pub summary: ReportSection<DatasetSummary>,
    pub labels: LabelSummary,
    pub association_rules: ReportSection<Vec<RuleMetrics>>,
    pub classifiers: ReportSection<HarnessReport>,
    pub decision_tree: ReportSection<TreeSummary>,
}

impl AnalysisReport {
    /// Run every stage of `session`
    pub fn build(session: &AnalysisSession, load: Option<LoadReport>) -> Self {
        let labels = session.labels();
        let tree = session.decision_tree_study().map(|study| TreeSummary {
            accuracy: study.accuracy,
            depth: study.model.depth(),
            nodes: study.model.nodes().to_vec(),
            rendered: study.render(),
            report: study.report,
        });

        Self {
            generated_at: chrono::Utc::now().to_rfc3339(),
            dataset_fingerprint: session.fingerprint().to_string(),
            load,
            summary: ReportSection::from_result("dataset summary", session.dataset().summary()),
            labels: LabelSummary {
                threshold: labels.threshold,
                delayed: labels.delayed_count(),
                on_time: labels.on_time_count(),
            },
            association_rules: ReportSection::from_result(
                "association rules",
                session.association_rules(),
            ),
            classifiers: ReportSection::from_result("classifiers", session.evaluate_classifiers()),
            decision_tree: ReportSection::from_result("decision tree", tree),
        }
    }
}

/// Pretty JSON with object keys in sorted order at every level, so two
/// reports over the same data differ only in `generated_at`.
pub fn canonical_json_string<T: Serialize>(value: &T) -> Result<String> {
    let tree = sort_keys(serde_json::to_value(value)?);
    Ok(serde_json::to_string_pretty(&tree)?)
}

fn sort_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(key, inner)| (key, sort_keys(inner)))
                    .collect::<Map<String, Value>>(),
            )
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_keys).collect()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnalysisConfig;
    use crate::dataset::{Dataset, DeliveryRecord};

    #[test]
    fn test_canonical_json_sorts_keys() {
        let value = serde_json::json!({"b": 1, "a": {"d": 2, "c": 3}});
        let text = canonical_json_string(&value).unwrap();
        let a = text.find("\"a\"").unwrap();
        let b = text.find("\"b\"").unwrap();
        let c = text.find("\"c\"").unwrap();
        let d = text.find("\"d\"").unwrap();
        assert!(a < b);
        assert!(c < d);
    }

    #[test]
    fn test_failing_stages_are_skipped_not_fatal() {
        // One record: labels work, the partition cannot have two sides.
        let dataset = Dataset::new(vec![DeliveryRecord::new("Sunny", "Low", "van", "Urban", 25.0)]);
        let session = AnalysisSession::new(dataset, AnalysisConfig::default()).unwrap();
        let report = AnalysisReport::build(&session, None);

        assert!(report.summary.ready().is_some());
        assert!(report.association_rules.ready().is_some());
        match &report.classifiers {
            ReportSection::Skipped { reason } => assert!(reason.contains("partition")),
            other => panic!("expected skipped classifiers, got {other:?}"),
        }
        assert!(report.decision_tree.ready().is_none());

        let json = canonical_json_string(&report).unwrap();
        assert!(json.contains("\"status\": \"skipped\""));
    }
}
