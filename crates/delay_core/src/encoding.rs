//! Categorical encoding
//!
//! Each attribute gets its own value -> integer mapping. Values are numbered
//! in sorted order, so the mapping depends only on the set of values seen,
//! never on record order.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::dataset::{Attribute, Dataset, DeliveryRecord, FEATURE_COUNT};
use crate::errors::{AnalysisError, Result};

/// Encoded feature vector, one code per attribute in [`Attribute::ALL`] order
pub type FeatureRow = Vec<u32>;

/// Value -> code mapping for one attribute
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryEncoding {
    attribute: Attribute,
    /// Distinct values, sorted; position is the code
    values: Vec<String>,
    index: BTreeMap<String, u32>,
}

impl CategoryEncoding {
    /// Build a mapping covering every distinct value in `values`
    pub fn fit<'a, I>(attribute: Attribute, values: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut index: BTreeMap<String, u32> = BTreeMap::new();
        for value in values {
            index.entry(value.to_string()).or_insert(0);
        }

        let values: Vec<String> = index.keys().cloned().collect();
        for (code, value) in values.iter().enumerate() {
            index.insert(value.clone(), code as u32);
        }

        Self {
            attribute,
            values,
            index,
        }
    }

    /// Code of a value seen at fit time
    pub fn apply(&self, value: &str) -> Result<u32> {
        self.index
            .get(value)
            .copied()
            .ok_or_else(|| AnalysisError::UnknownCategory {
                attribute: self.attribute.to_string(),
                value: value.to_string(),
            })
    }

    /// Inverse mapping
    pub fn decode(&self, code: u32) -> Option<&str> {
        self.values.get(code as usize).map(String::as_str)
    }

    pub fn attribute(&self) -> Attribute {
        self.attribute
    }

    /// Fitted values in code order
    pub fn values(&self) -> &[String] {
        &self.values
    }

    /// Number of distinct values (`k`; codes are `0..k`)
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// One fitted encoding per attribute
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureEncoder {
    encodings: Vec<CategoryEncoding>,
}

impl FeatureEncoder {
    /// Fit every attribute's encoding on the full dataset column
    pub fn fit(dataset: &Dataset) -> Self {
        let encodings = Attribute::ALL
            .iter()
            .map(|&attribute| CategoryEncoding::fit(attribute, dataset.column(attribute)))
            .collect();
        Self { encodings }
    }

    pub fn encoding(&self, attribute: Attribute) -> &CategoryEncoding {
        &self.encodings[attribute.index()]
    }

    /// Encode the four categorical values of a record
    pub fn encode_record(&self, record: &DeliveryRecord) -> Result<FeatureRow> {
        self.encode_values(Attribute::ALL.map(|a| record.value(a)))
    }

    /// Encode raw values given in [`Attribute::ALL`] order
    pub fn encode_values(&self, values: [&str; FEATURE_COUNT]) -> Result<FeatureRow> {
        self.encodings
            .iter()
            .zip(values)
            .map(|(encoding, value)| encoding.apply(value))
            .collect()
    }

    /// Encode every record into a new table, leaving the dataset untouched
    pub fn encode_dataset(&self, dataset: &Dataset, labels: &[bool]) -> Result<EncodedTable> {
        if dataset.len() != labels.len() {
            return Err(AnalysisError::InvalidParameters(format!(
                "{} records but {} labels",
                dataset.len(),
                labels.len()
            )));
        }

        let features = dataset
            .records()
            .iter()
            .map(|r| self.encode_record(r))
            .collect::<Result<Vec<_>>>()?;

        Ok(EncodedTable {
            features,
            labels: labels.to_vec(),
        })
    }

    /// Decoded name of a code, or `"?"` for codes outside the mapping
    pub fn decode(&self, attribute: Attribute, code: u32) -> &str {
        self.encoding(attribute).decode(code).unwrap_or("?")
    }
}

/// Immutable encoded feature matrix with aligned labels
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodedTable {
    pub features: Vec<FeatureRow>,
    pub labels: Vec<bool>,
}

impl EncodedTable {
    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Rows at `indices`, in the given order
    pub fn subset(&self, indices: &[usize]) -> Self {
        Self {
            features: indices.iter().map(|&i| self.features[i].clone()).collect(),
            labels: indices.iter().map(|&i| self.labels[i]).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_follow_sorted_order() {
        let encoding = CategoryEncoding::fit(Attribute::Weather, ["Sunny", "Fog", "Stormy", "Fog"]);
        assert_eq!(encoding.len(), 3);
        assert_eq!(encoding.apply("Fog").unwrap(), 0);
        assert_eq!(encoding.apply("Stormy").unwrap(), 1);
        assert_eq!(encoding.apply("Sunny").unwrap(), 2);
    }

    #[test]
    fn test_fit_ignores_input_order() {
        let a = CategoryEncoding::fit(Attribute::Area, ["Urban", "Metropolitian", "Semi-Urban"]);
        let b = CategoryEncoding::fit(Attribute::Area, ["Semi-Urban", "Urban", "Metropolitian"]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_decode_inverts_apply() {
        let encoding = CategoryEncoding::fit(Attribute::Vehicle, ["van", "scooter", "motorcycle"]);
        for value in ["van", "scooter", "motorcycle"] {
            let code = encoding.apply(value).unwrap();
            assert_eq!(encoding.decode(code), Some(value));
        }
        assert_eq!(encoding.decode(3), None);
    }

    #[test]
    fn test_unknown_value_is_rejected() {
        let encoding = CategoryEncoding::fit(Attribute::Traffic, ["Low", "High"]);
        match encoding.apply("Jam") {
            Err(AnalysisError::UnknownCategory { attribute, value }) => {
                assert_eq!(attribute, "Traffic");
                assert_eq!(value, "Jam");
            }
            other => panic!("expected UnknownCategory, got {other:?}"),
        }
    }

    #[test]
    fn test_encoder_builds_table_without_touching_dataset() {
        let dataset = Dataset::new(vec![
            DeliveryRecord::new("Sunny", "Low", "van", "Urban", 10.0),
            DeliveryRecord::new("Fog", "High", "scooter", "Urban", 50.0),
        ]);
        let snapshot = dataset.clone();
        let encoder = FeatureEncoder::fit(&dataset);
        let table = encoder.encode_dataset(&dataset, &[false, true]).unwrap();

        assert_eq!(dataset, snapshot);
        assert_eq!(table.features, vec![vec![1, 1, 1, 0], vec![0, 0, 0, 0]]);
        assert_eq!(table.labels, vec![false, true]);
        assert_eq!(encoder.decode(Attribute::Traffic, 0), "High");

        let err = encoder.encode_values(["Sunny", "Low", "bicycle", "Urban"]).unwrap_err();
        assert!(matches!(err, AnalysisError::UnknownCategory { .. }));
    }

    #[test]
    fn test_mismatched_labels_are_rejected() {
        let dataset = Dataset::new(vec![DeliveryRecord::new("Sunny", "Low", "van", "Urban", 10.0)]);
        let encoder = FeatureEncoder::fit(&dataset);
        assert!(encoder.encode_dataset(&dataset, &[]).is_err());
    }
}
