//! Analysis configuration
//!
//! Values come from built-in defaults, an optional TOML file and
//! `DELAYLENS_*` environment overrides, applied in that order.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

use crate::classifier::LinearConfig;
use crate::dataset::MissingPolicy;
use crate::errors::{AnalysisError, Result};
use crate::rules::AdverseConditions;
use crate::tree::TreeConfig;

/// Fraction of records held out for evaluation.
pub const DEFAULT_TEST_FRACTION: f64 = 0.3;
/// Seed used by the partitioner.
pub const DEFAULT_SEED: u64 = 42;
/// Neighbor count for the majority-vote classifier.
pub const DEFAULT_NEIGHBORS: usize = 5;

/// Full configuration for one analysis session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Held-out fraction in (0, 1)
    pub test_fraction: f64,
    /// Partition seed
    pub seed: u64,
    /// Neighbor count for the neighbor classifier
    pub neighbors: usize,
    /// Decision tree parameters (harness variant and report study)
    pub tree: TreeConfig,
    /// Linear classifier optimizer parameters
    pub linear: LinearConfig,
    /// Fit classifier variants on the rayon pool
    pub parallel: bool,
    /// How rows with missing fields are handled at load time
    pub missing: MissingPolicy,
    /// Adverse value sets used by the association rules
    pub adverse: AdverseConditions,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            test_fraction: DEFAULT_TEST_FRACTION,
            seed: DEFAULT_SEED,
            neighbors: DEFAULT_NEIGHBORS,
            tree: TreeConfig::default(),
            linear: LinearConfig::default(),
            parallel: false,
            missing: MissingPolicy::Drop,
            adverse: AdverseConditions::default(),
        }
    }
}

impl AnalysisConfig {
    /// Parse a configuration from TOML text. Missing keys keep their defaults.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: AnalysisConfig = toml::from_str(content)
            .map_err(|e| AnalysisError::Config(format!("failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading configuration from: {}", path.display());

        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Apply `DELAYLENS_*` environment variables on top of the current values
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup (the environment in production).
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        fn parse<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T> {
            raw.trim()
                .parse()
                .map_err(|_| AnalysisError::Config(format!("invalid value for {key}: '{raw}'")))
        }

        if let Some(raw) = lookup("DELAYLENS_TEST_FRACTION") {
            self.test_fraction = parse("DELAYLENS_TEST_FRACTION", &raw)?;
        }
        if let Some(raw) = lookup("DELAYLENS_SEED") {
            self.seed = parse("DELAYLENS_SEED", &raw)?;
        }
        if let Some(raw) = lookup("DELAYLENS_NEIGHBORS") {
            self.neighbors = parse("DELAYLENS_NEIGHBORS", &raw)?;
        }
        if let Some(raw) = lookup("DELAYLENS_MAX_DEPTH") {
            self.tree.max_depth = parse("DELAYLENS_MAX_DEPTH", &raw)?;
        }
        if let Some(raw) = lookup("DELAYLENS_PARALLEL") {
            self.parallel = parse("DELAYLENS_PARALLEL", &raw)?;
        }

        debug!(config = ?self, "configuration after overrides");
        self.validate()
    }

    /// Reject parameter combinations the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        if !(self.test_fraction > 0.0 && self.test_fraction < 1.0) {
            return Err(AnalysisError::InvalidParameters(format!(
                "test_fraction must be in (0, 1), got {}",
                self.test_fraction
            )));
        }
        if self.neighbors == 0 {
            return Err(AnalysisError::InvalidParameters(
                "neighbors must be at least 1".to_string(),
            ));
        }
        if self.linear.epochs == 0 {
            return Err(AnalysisError::InvalidParameters(
                "linear.epochs must be at least 1".to_string(),
            ));
        }
        if !self.linear.learning_rate.is_finite() || self.linear.learning_rate <= 0.0 {
            return Err(AnalysisError::InvalidParameters(format!(
                "linear.learning_rate must be positive, got {}",
                self.linear.learning_rate
            )));
        }
        if !self.linear.l2.is_finite() || self.linear.l2 < 0.0 {
            return Err(AnalysisError::InvalidParameters(format!(
                "linear.l2 must be non-negative, got {}",
                self.linear.l2
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_match_reference_pipeline() {
        let config = AnalysisConfig::default();
        assert_eq!(config.test_fraction, 0.3);
        assert_eq!(config.seed, 42);
        assert_eq!(config.neighbors, 5);
        assert_eq!(config.tree.max_depth, 4);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = AnalysisConfig::from_toml_str(
            r#"
            seed = 7
            missing = "fill_mode"

            [tree]
            max_depth = 2

            [adverse]
            weather = ["Fog"]
            "#,
        )
        .unwrap();

        assert_eq!(config.seed, 7);
        assert_eq!(config.tree.max_depth, 2);
        assert_eq!(config.tree.min_samples_split, 2);
        assert_eq!(config.missing, MissingPolicy::FillMode);
        assert_eq!(config.adverse.weather, vec!["Fog".to_string()]);
        assert_eq!(config.adverse.traffic, vec!["High".to_string()]);
        assert_eq!(config.neighbors, 5);
    }

    #[test]
    fn test_invalid_fraction_is_rejected() {
        let err = AnalysisConfig::from_toml_str("test_fraction = 1.0").unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidParameters(_)));
    }

    #[test]
    fn test_malformed_toml_is_config_error() {
        let err = AnalysisConfig::from_toml_str("seed = [").unwrap_err();
        assert!(matches!(err, AnalysisError::Config(_)));
    }

    #[test]
    fn test_overrides_apply_and_validate() {
        let env: HashMap<&str, &str> = [
            ("DELAYLENS_SEED", "9"),
            ("DELAYLENS_NEIGHBORS", "3"),
            ("DELAYLENS_PARALLEL", "true"),
        ]
        .into_iter()
        .collect();

        let mut config = AnalysisConfig::default();
        config
            .apply_overrides(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.seed, 9);
        assert_eq!(config.neighbors, 3);
        assert!(config.parallel);

        let mut config = AnalysisConfig::default();
        let err = config
            .apply_overrides(|key| (key == "DELAYLENS_NEIGHBORS").then(|| "0".to_string()))
            .unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidParameters(_)));

        let mut config = AnalysisConfig::default();
        let err = config
            .apply_overrides(|key| (key == "DELAYLENS_SEED").then(|| "abc".to_string()))
            .unwrap_err();
        assert!(matches!(err, AnalysisError::Config(_)));
    }
}
