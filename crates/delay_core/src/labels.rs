//! Delay label derivation
//!
//! A delivery is delayed when its time exceeds `mean + std` of all delivery
//! times in the dataset. The standard deviation is the sample estimate
//! (`n - 1` denominator); a single-record dataset has a deviation of zero.

use serde::{Deserialize, Serialize};

use crate::dataset::{Dataset, DeliveryRecord};
use crate::errors::{AnalysisError, Result};

const STAGE: &str = "label derivation";

/// Descriptive statistics of the delivery-time column
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeStats {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

/// Delay threshold with the statistics it was derived from
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DelayThreshold {
    pub mean: f64,
    pub std_dev: f64,
    /// `mean + std_dev`
    pub value: f64,
}

/// Delivery-time statistics over a set of records
pub fn delivery_time_stats(records: &[DeliveryRecord]) -> Result<TimeStats> {
    if records.is_empty() {
        return Err(AnalysisError::EmptyDataset { stage: STAGE });
    }

    let n = records.len();
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    let mut sum = 0.0;
    for record in records {
        min = min.min(record.delivery_time);
        max = max.max(record.delivery_time);
        sum += record.delivery_time;
    }
    let mean = sum / n as f64;

    let std_dev = if n > 1 {
        let squares: f64 = records
            .iter()
            .map(|r| {
                let d = r.delivery_time - mean;
                d * d
            })
            .sum();
        (squares / (n - 1) as f64).sqrt()
    } else {
        0.0
    };

    Ok(TimeStats {
        count: n,
        min,
        max,
        mean,
        std_dev,
    })
}

/// Compute `mean + std` of the delivery times
pub fn compute_threshold(records: &[DeliveryRecord]) -> Result<DelayThreshold> {
    let stats = delivery_time_stats(records)?;
    Ok(DelayThreshold {
        mean: stats.mean,
        std_dev: stats.std_dev,
        value: stats.mean + stats.std_dev,
    })
}

/// `true` when the record's delivery time is strictly above the threshold
pub fn label_of(record: &DeliveryRecord, threshold: &DelayThreshold) -> bool {
    record.delivery_time > threshold.value
}

/// Delay labels aligned index-for-index with a dataset's records
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DelayLabels {
    pub threshold: DelayThreshold,
    pub labels: Vec<bool>,
}

impl DelayLabels {
    /// Derive the threshold and every record's label
    pub fn derive(dataset: &Dataset) -> Result<Self> {
        let threshold = compute_threshold(dataset.records())?;
        let labels = dataset
            .records()
            .iter()
            .map(|r| label_of(r, &threshold))
            .collect();

        Ok(Self { threshold, labels })
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn delayed_count(&self) -> usize {
        self.labels.iter().filter(|&&l| l).count()
    }

    pub fn on_time_count(&self) -> usize {
        self.labels.len() - self.delayed_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records(times: &[f64]) -> Vec<DeliveryRecord> {
        times
            .iter()
            .map(|&t| DeliveryRecord::new("Sunny", "Low", "van", "Urban", t))
            .collect()
    }

    #[test]
    fn test_threshold_is_mean_plus_sample_std() {
        // mean = 5, sample variance = 32 / 7
        let recs = records(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        let threshold = compute_threshold(&recs).unwrap();

        assert!((threshold.mean - 5.0).abs() < 1e-12);
        assert!((threshold.std_dev - (32.0f64 / 7.0).sqrt()).abs() < 1e-12);
        assert_eq!(threshold.value, threshold.mean + threshold.std_dev);
    }

    #[test]
    fn test_empty_dataset_fails() {
        let err = compute_threshold(&[]).unwrap_err();
        assert!(matches!(err, AnalysisError::EmptyDataset { stage: "label derivation" }));
    }

    #[test]
    fn test_single_record_has_zero_deviation() {
        let threshold = compute_threshold(&records(&[30.0])).unwrap();
        assert_eq!(threshold.std_dev, 0.0);
        assert_eq!(threshold.value, 30.0);
        assert!(!label_of(&records(&[30.0])[0], &threshold));
    }

    #[test]
    fn test_labels_are_strictly_above_threshold() {
        let dataset = Dataset::new(records(&[10.0, 10.0, 10.0, 10.0, 100.0]));
        let labels = DelayLabels::derive(&dataset).unwrap();

        assert_eq!(labels.labels, vec![false, false, false, false, true]);
        assert_eq!(labels.delayed_count(), 1);
        assert_eq!(labels.on_time_count(), 4);
    }

    #[test]
    fn test_derivation_is_idempotent() {
        let dataset = Dataset::new(records(&[12.0, 40.0, 33.0, 18.0, 90.0, 27.0]));
        assert_eq!(
            DelayLabels::derive(&dataset).unwrap(),
            DelayLabels::derive(&dataset).unwrap()
        );
    }
}
