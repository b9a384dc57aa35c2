//! Per-action feature matrix

use ndarray::{Array1, Array2, ArrayView1};
use serde::{Deserialize, Serialize};

use maxent_rl_core::{RLError, Result};

/// Dense feature matrix with one row per action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    values: Array2<f64>,
}

impl Feature {
    /// All-zero features for `num_actions` actions and `dims` dimensions
    #[must_use]
    pub fn zeros(num_actions: usize, dims: usize) -> Self {
        Self {
            values: Array2::zeros((num_actions, dims)),
        }
    }

    /// Wrap an existing `(actions, dims)` matrix
    #[must_use]
    pub fn from_array(values: Array2<f64>) -> Self {
        Self { values }
    }

    /// Build from one row per action; rows must share a length
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self> {
        let dims = rows.first().map_or(0, Vec::len);
        let mut values = Array2::zeros((rows.len(), dims));
        for (i, row) in rows.iter().enumerate() {
            if row.len() != dims {
                return Err(RLError::DimensionMismatch {
                    expected: dims,
                    actual: row.len(),
                });
            }
            values.row_mut(i).assign(&ArrayView1::from(row.as_slice()));
        }
        Ok(Self { values })
    }

    /// Number of rows (actions)
    #[must_use]
    pub fn num_actions(&self) -> usize {
        self.values.nrows()
    }

    /// Number of columns (feature dimensions)
    #[must_use]
    pub fn dims(&self) -> usize {
        self.values.ncols()
    }

    /// Feature vector of one action
    #[must_use]
    pub fn row(&self, action: usize) -> ArrayView1<'_, f64> {
        self.values.row(action)
    }

    /// Single entry
    #[must_use]
    pub fn get(&self, action: usize, dim: usize) -> f64 {
        self.values[[action, dim]]
    }

    /// Overwrite a single entry
    pub fn set(&mut self, action: usize, dim: usize, value: f64) {
        self.values[[action, dim]] = value;
    }

    /// The underlying matrix
    #[must_use]
    pub fn as_array(&self) -> &Array2<f64> {
        &self.values
    }

    /// Expected feature vector `sum_a dist(a) * F(a)` under an action distribution
    pub fn expectation(&self, action_dist: &[f64]) -> Result<Array1<f64>> {
        if action_dist.len() != self.num_actions() {
            return Err(RLError::DimensionMismatch {
                expected: self.num_actions(),
                actual: action_dist.len(),
            });
        }
        Ok(self.values.t().dot(&ArrayView1::from(action_dist)))
    }
}
