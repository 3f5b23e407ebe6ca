//! Delivery dataset loading
//!
//! Reads the delivery CSV (header row required), keeps the four categorical
//! attributes plus the delivery time, and reports how many rows were dropped
//! or repaired along the way.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::io::Read;
use std::path::Path;
use tracing::{info, warn};

use crate::errors::{AnalysisError, Result};
use crate::labels::{delivery_time_stats, TimeStats};

/// Header of the numeric delivery-time column.
pub const DELIVERY_TIME_COLUMN: &str = "Delivery_Time";

/// Categorical attributes used as features, in feature-vector order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Attribute {
    Weather,
    Traffic,
    Vehicle,
    Area,
}

impl Attribute {
    /// Every attribute in feature-vector order
    pub const ALL: [Attribute; 4] = [
        Attribute::Weather,
        Attribute::Traffic,
        Attribute::Vehicle,
        Attribute::Area,
    ];

    /// Position of this attribute in an encoded feature vector
    pub fn index(self) -> usize {
        self as usize
    }

    /// Attribute at a feature-vector position
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// CSV header for this attribute
    pub fn column(self) -> &'static str {
        match self {
            Attribute::Weather => "Weather",
            Attribute::Traffic => "Traffic",
            Attribute::Vehicle => "Vehicle",
            Attribute::Area => "Area",
        }
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

/// Number of categorical features
pub const FEATURE_COUNT: usize = Attribute::ALL.len();

/// One delivery observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryRecord {
    pub weather: String,
    pub traffic: String,
    pub vehicle: String,
    pub area: String,
    /// Delivery time in minutes
    pub delivery_time: f64,
}

impl DeliveryRecord {
    pub fn new(
        weather: impl Into<String>,
        traffic: impl Into<String>,
        vehicle: impl Into<String>,
        area: impl Into<String>,
        delivery_time: f64,
    ) -> Self {
        Self {
            weather: weather.into(),
            traffic: traffic.into(),
            vehicle: vehicle.into(),
            area: area.into(),
            delivery_time,
        }
    }

    /// Value of a categorical attribute
    pub fn value(&self, attribute: Attribute) -> &str {
        match attribute {
            Attribute::Weather => &self.weather,
            Attribute::Traffic => &self.traffic,
            Attribute::Vehicle => &self.vehicle,
            Attribute::Area => &self.area,
        }
    }
}

/// Handling of rows with missing or unparseable fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingPolicy {
    /// Drop any row with a missing field
    #[default]
    Drop,
    /// Fill missing categorical values with the column mode; rows without a
    /// usable delivery time are still dropped
    FillMode,
}

/// Outcome of a CSV load
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadReport {
    pub rows_read: usize,
    pub rows_kept: usize,
    pub rows_dropped: usize,
    pub cells_imputed: usize,
}

/// Distinct values of one attribute in first-seen order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeValues {
    pub attribute: Attribute,
    pub values: Vec<String>,
}

/// Exploratory overview of a dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetSummary {
    pub records: usize,
    pub delivery_time: TimeStats,
    pub distinct: Vec<AttributeValues>,
}

/// Ordered, immutable collection of delivery records
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    records: Vec<DeliveryRecord>,
}

/// Raw row before the missing-value policy is applied
#[derive(Default)]
struct RawRow {
    categories: [Option<String>; FEATURE_COUNT],
    delivery_time: Option<f64>,
}

impl Dataset {
    pub fn new(records: Vec<DeliveryRecord>) -> Self {
        Self { records }
    }

    /// Load a dataset from a CSV file
    pub fn from_csv<P: AsRef<Path>>(path: P, policy: MissingPolicy) -> Result<(Self, LoadReport)> {
        let path = path.as_ref();
        info!("Loading dataset from: {}", path.display());
        let file = std::fs::File::open(path)?;
        Self::from_reader(file, policy)
    }

    /// Load a dataset from any CSV source with a header row
    pub fn from_reader<R: Read>(reader: R, policy: MissingPolicy) -> Result<(Self, LoadReport)> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let headers = reader
            .headers()
            .map_err(|e| AnalysisError::Dataset(format!("failed to read header: {e}")))?
            .clone();

        let locate = |name: &str| -> Result<usize> {
            headers
                .iter()
                .position(|h| h.trim() == name)
                .ok_or_else(|| AnalysisError::Dataset(format!("missing required column '{name}'")))
        };

        let mut category_columns = [0usize; FEATURE_COUNT];
        for attribute in Attribute::ALL {
            category_columns[attribute.index()] = locate(attribute.column())?;
        }
        let time_column = locate(DELIVERY_TIME_COLUMN)?;

        let mut rows = Vec::new();
        for (line, row) in reader.records().enumerate() {
            let row = match row {
                Ok(row) => row,
                Err(e) if matches!(e.kind(), csv::ErrorKind::Utf8 { .. }) => {
                    // No usable delivery time, so every policy drops it.
                    warn!("Row {}: {e}", line + 2);
                    rows.push(RawRow::default());
                    continue;
                }
                Err(e) => {
                    return Err(AnalysisError::Dataset(format!("row {}: {e}", line + 2)));
                }
            };

            let cell = |idx: usize| row.get(idx).and_then(clean_cell);
            let categories = category_columns.map(|idx| cell(idx).map(str::to_string));
            let delivery_time = cell(time_column)
                .and_then(|raw| raw.parse::<f64>().ok())
                .filter(|t| t.is_finite() && *t >= 0.0);

            rows.push(RawRow {
                categories,
                delivery_time,
            });
        }

        let (dataset, report) = Self::apply_policy(rows, policy);
        if report.rows_dropped > 0 {
            warn!(
                "Dropped {} of {} rows with missing or invalid fields",
                report.rows_dropped, report.rows_read
            );
        }
        if report.cells_imputed > 0 {
            info!("Imputed {} missing categorical cells with column modes", report.cells_imputed);
        }
        info!("Loaded {} delivery records", dataset.len());

        Ok((dataset, report))
    }

    fn apply_policy(rows: Vec<RawRow>, policy: MissingPolicy) -> (Self, LoadReport) {
        let mut report = LoadReport {
            rows_read: rows.len(),
            ..LoadReport::default()
        };

        let modes: [Option<String>; FEATURE_COUNT] = match policy {
            MissingPolicy::Drop => Default::default(),
            MissingPolicy::FillMode => {
                std::array::from_fn(|col| column_mode(rows.iter().map(|r| r.categories[col].as_deref())))
            }
        };

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            let Some(delivery_time) = row.delivery_time else {
                report.rows_dropped += 1;
                continue;
            };

            let mut imputed = 0;
            let mut values: [String; FEATURE_COUNT] = Default::default();
            let mut complete = true;
            for (col, value) in row.categories.into_iter().enumerate() {
                match (value, &modes[col]) {
                    (Some(v), _) => values[col] = v,
                    (None, Some(mode)) => {
                        values[col] = mode.clone();
                        imputed += 1;
                    }
                    (None, None) => complete = false,
                }
            }

            if !complete {
                report.rows_dropped += 1;
                continue;
            }

            report.cells_imputed += imputed;
            let [weather, traffic, vehicle, area] = values;
            records.push(DeliveryRecord {
                weather,
                traffic,
                vehicle,
                area,
                delivery_time,
            });
        }

        report.rows_kept = records.len();
        (Self { records }, report)
    }

    pub fn records(&self) -> &[DeliveryRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// All values of one attribute, in record order
    pub fn column(&self, attribute: Attribute) -> Vec<&str> {
        self.records.iter().map(|r| r.value(attribute)).collect()
    }

    /// Distinct values of an attribute in first-seen order
    pub fn distinct_values(&self, attribute: Attribute) -> Vec<String> {
        let mut seen = Vec::new();
        for record in &self.records {
            let value = record.value(attribute);
            if !seen.iter().any(|v: &String| v == value) {
                seen.push(value.to_string());
            }
        }
        seen
    }

    /// Record count, delivery-time statistics and distinct category values
    pub fn summary(&self) -> Result<DatasetSummary> {
        Ok(DatasetSummary {
            records: self.len(),
            delivery_time: delivery_time_stats(&self.records)?,
            distinct: Attribute::ALL
                .iter()
                .map(|&attribute| AttributeValues {
                    attribute,
                    values: self.distinct_values(attribute),
                })
                .collect(),
        })
    }
}

/// Trim a raw cell; empty and `NaN` cells count as missing.
fn clean_cell(raw: &str) -> Option<&str> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("nan") {
        None
    } else {
        Some(trimmed)
    }
}

/// Most frequent present value; ties go to the lexicographically smallest.
fn column_mode<'a>(values: impl Iterator<Item = Option<&'a str>>) -> Option<String> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for value in values.flatten() {
        *counts.entry(value).or_default() += 1;
    }

    let mut best: Option<(&str, usize)> = None;
    for (value, count) in counts {
        if best.map_or(true, |(_, c)| count > c) {
            best = Some((value, count));
        }
    }
    best.map(|(v, _)| v.to_string())
}
