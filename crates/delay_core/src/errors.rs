//! Error types for the delay analytics core

use thiserror::Error;

/// Errors returned by the analysis pipeline.
///
/// Every variant is local to one stage; callers are expected to report it and
/// skip the affected view rather than abort the whole session.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// No records available to derive statistics from
    #[error("{stage}: dataset is empty")]
    EmptyDataset { stage: &'static str },

    /// A categorical value that was never seen when the encoding was fitted
    #[error("unknown category '{value}' for attribute {attribute}")]
    UnknownCategory { attribute: String, value: String },

    /// A partition would leave one side without records
    #[error("{stage}: insufficient data (train={train}, test={test})")]
    InsufficientData {
        stage: &'static str,
        train: usize,
        test: usize,
    },

    /// Invalid configuration or call parameters
    #[error("invalid parameters: {0}")]
    InvalidParameters(String),

    /// Classifier used before `fit`
    #[error("classifier {0} has not been fitted")]
    NotFitted(&'static str),

    /// Malformed dataset input
    #[error("dataset error: {0}")]
    Dataset(String),

    /// Configuration file could not be parsed
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for analysis operations
pub type Result<T> = std::result::Result<T, AnalysisError>;

/// Division with the zero-denominator policy applied: `0.0` when `den == 0`.
pub fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}
