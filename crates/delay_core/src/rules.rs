//! Association rules against the delay label
//!
//! Every rule has the form `condition => delayed`. The antecedent is a
//! conjunction of clauses, each clause being membership of one attribute in a
//! set of values. Ratios with a zero denominator evaluate to `0`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::debug;

use crate::dataset::{Attribute, Dataset, DeliveryRecord};
use crate::errors::{ratio, AnalysisError, Result};

/// Adverse value sets for the standard rules
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdverseConditions {
    pub weather: Vec<String>,
    pub traffic: Vec<String>,
    pub vehicle: Vec<String>,
}

impl Default for AdverseConditions {
    fn default() -> Self {
        Self {
            weather: vec!["Stormy".to_string(), "Sandstorms".to_string()],
            traffic: vec!["High".to_string()],
            vehicle: vec!["bicycle".to_string()],
        }
    }
}

/// Membership of one attribute in a value set. Values are trimmed like
/// loaded cells, so `"High "` matches a `High` record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clause {
    pub attribute: Attribute,
    pub values: BTreeSet<String>,
}

impl Clause {
    pub fn new<I, S>(attribute: Attribute, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            attribute,
            values: values
                .into_iter()
                .map(|v| {
                    let v: String = v.into();
                    v.trim().to_string()
                })
                .collect(),
        }
    }

    pub fn matches(&self, record: &DeliveryRecord) -> bool {
        self.values.contains(record.value(self.attribute))
    }
}

/// Named conjunction of clauses
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    pub name: String,
    pub clauses: Vec<Clause>,
}

impl Condition {
    pub fn new(name: impl Into<String>, clauses: Vec<Clause>) -> Self {
        Self {
            name: name.into(),
            clauses,
        }
    }

    /// All clauses hold. An empty conjunction matches every record.
    pub fn matches(&self, record: &DeliveryRecord) -> bool {
        self.clauses.iter().all(|c| c.matches(record))
    }

    pub fn is_compound(&self) -> bool {
        self.clauses.len() > 1
    }
}

/// Computed metrics of one rule, with the counts backing them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleMetrics {
    pub condition: Condition,
    /// All records
    pub total: usize,
    /// Records satisfying the condition
    pub matching: usize,
    /// Delayed records overall
    pub delayed: usize,
    /// Records satisfying the condition that are delayed
    pub matching_delayed: usize,
    pub support: f64,
    pub confidence: f64,
    /// `P(delayed)` over the whole dataset
    pub baseline: f64,
    pub lift: f64,
}

/// Rule evaluation over a labeled dataset
#[derive(Debug, Clone, Copy)]
pub struct RuleEngine<'a> {
    records: &'a [DeliveryRecord],
    labels: &'a [bool],
    delayed: usize,
}

impl<'a> RuleEngine<'a> {
    pub fn new(dataset: &'a Dataset, labels: &'a [bool]) -> Result<Self> {
        if dataset.is_empty() {
            return Err(AnalysisError::EmptyDataset {
                stage: "association rules",
            });
        }
        if dataset.len() != labels.len() {
            return Err(AnalysisError::InvalidParameters(format!(
                "{} records but {} labels",
                dataset.len(),
                labels.len()
            )));
        }

        Ok(Self {
            records: dataset.records(),
            labels,
            delayed: labels.iter().filter(|&&l| l).count(),
        })
    }

    /// `P(delayed)`
    pub fn baseline(&self) -> f64 {
        ratio(self.delayed, self.records.len())
    }

    /// Rule for a single attribute's adverse value set
    pub fn single<I, S>(&self, name: &str, attribute: Attribute, values: I) -> RuleMetrics
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.evaluate(&Condition::new(name, vec![Clause::new(attribute, values)]))
    }

    /// Rule for a conjunction of attribute clauses
    pub fn compound(&self, name: &str, clauses: Vec<Clause>) -> RuleMetrics {
        self.evaluate(&Condition::new(name, clauses))
    }

    /// Count matches and derive support, confidence and lift
    pub fn evaluate(&self, condition: &Condition) -> RuleMetrics {
        let mut matching = 0;
        let mut matching_delayed = 0;
        for (record, &delayed) in self.records.iter().zip(self.labels) {
            if condition.matches(record) {
                matching += 1;
                if delayed {
                    matching_delayed += 1;
                }
            }
        }

        let total = self.records.len();
        let support = ratio(matching_delayed, total);
        let confidence = ratio(matching_delayed, matching);
        let baseline = self.baseline();
        let lift = if baseline > 0.0 {
            confidence / baseline
        } else {
            0.0
        };

        debug!(
            rule = %condition.name,
            matching, matching_delayed, support, confidence, lift,
            "evaluated association rule"
        );

        RuleMetrics {
            condition: condition.clone(),
            total,
            matching,
            delayed: self.delayed,
            matching_delayed,
            support,
            confidence,
            baseline,
            lift,
        }
    }

    /// The four reported rules: adverse weather, high traffic, bicycle, and
    /// adverse weather together with high traffic
    pub fn standard_rules(&self, adverse: &AdverseConditions) -> Vec<RuleMetrics> {
        let weather = Clause::new(Attribute::Weather, adverse.weather.iter().cloned());
        let traffic = Clause::new(Attribute::Traffic, adverse.traffic.iter().cloned());
        let vehicle = Clause::new(Attribute::Vehicle, adverse.vehicle.iter().cloned());

        vec![
            self.compound("Adverse weather => delay", vec![weather.clone()]),
            self.compound("High traffic => delay", vec![traffic.clone()]),
            self.compound("Bicycle => delay", vec![vehicle]),
            self.compound("Adverse weather + high traffic => delay", vec![weather, traffic]),
        ]
    }

    /// Every `attribute = value` rule with at least `min_support`, strongest lift first
    pub fn mine_single_values(&self, min_support: f64) -> Vec<RuleMetrics> {
        let mut candidates: BTreeSet<(Attribute, &str)> = BTreeSet::new();
        for record in self.records {
            for attribute in Attribute::ALL {
                candidates.insert((attribute, record.value(attribute)));
            }
        }

        let mut rules: Vec<RuleMetrics> = candidates
            .into_iter()
            .map(|(attribute, value)| {
                self.single(&format!("{attribute} = {value} => delay"), attribute, [value])
            })
            .filter(|rule| rule.support >= min_support)
            .collect();

        // Stable sort keeps attribute/value order among equal lifts.
        rules.sort_by(|a, b| b.lift.total_cmp(&a.lift));
        rules
    }
}
