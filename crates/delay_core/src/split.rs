//! Deterministic train/test partitioning

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::deterministic::permutation;
use crate::encoding::EncodedTable;
use crate::errors::{AnalysisError, Result};

/// Disjoint train/test subsets covering the whole table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Partition {
    pub train: EncodedTable,
    pub test: EncodedTable,
    /// Source row of each train row
    pub train_indices: Vec<usize>,
    /// Source row of each test row
    pub test_indices: Vec<usize>,
}

/// Number of held-out rows: `ceil(n * test_fraction)`
pub fn test_size(n: usize, test_fraction: f64) -> usize {
    // Tolerance keeps products like 0.3 * 10 from rounding up past 3.
    ((n as f64 * test_fraction) - 1e-9).ceil().max(0.0) as usize
}

/// Shuffle with `seed` and hold out the first `ceil(n * test_fraction)` rows.
///
/// Same input order and seed always give the same partition.
pub fn split(table: &EncodedTable, test_fraction: f64, seed: u64) -> Result<Partition> {
    if !(test_fraction > 0.0 && test_fraction < 1.0) {
        return Err(AnalysisError::InvalidParameters(format!(
            "test_fraction must be in (0, 1), got {test_fraction}"
        )));
    }

    let n = table.len();
    let n_test = test_size(n, test_fraction).min(n);
    let n_train = n - n_test;
    if n_train == 0 || n_test == 0 {
        return Err(AnalysisError::InsufficientData {
            stage: "partition",
            train: n_train,
            test: n_test,
        });
    }

    let order = permutation(n, seed);
    let (test_indices, train_indices) = order.split_at(n_test);
    debug!(n_train, n_test, seed, "partitioned encoded table");

    Ok(Partition {
        train: table.subset(train_indices),
        test: table.subset(test_indices),
        train_indices: train_indices.to_vec(),
        test_indices: test_indices.to_vec(),
    })
}
