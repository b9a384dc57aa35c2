//! Solver configuration

use serde::{Deserialize, Serialize};

use crate::{RLError, Result};

/// Convergence and memory bounds for the prioritized-sweeping solver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Maximum number of live entries in the sweep queue; overflow is dropped
    pub queue_capacity: usize,
    /// Value change below which a state is considered converged (last round)
    pub min_value_error: f64,
    /// Visitation change below which a state is considered converged (last round)
    pub min_state_dist_error: f64,
    /// Queue pops allowed per annealing round
    pub max_iterations_per_round: usize,
    /// Number of sweep-then-drain rounds; the threshold halves each round
    pub annealing_rounds: u32,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 10_000,
            min_value_error: 0.001,
            min_state_dist_error: 0.0001,
            max_iterations_per_round: 1_000_000,
            annealing_rounds: 7,
        }
    }
}

impl SolverConfig {
    /// Threshold of the first value-iteration round
    #[must_use]
    pub fn initial_value_threshold(&self) -> f64 {
        self.min_value_error * self.annealing_scale()
    }

    /// Threshold of the first visitation round
    #[must_use]
    pub fn initial_state_dist_threshold(&self) -> f64 {
        self.min_state_dist_error * self.annealing_scale()
    }

    fn annealing_scale(&self) -> f64 {
        2f64.powi(self.annealing_rounds.saturating_sub(1) as i32)
    }

    /// Reject configurations the solver cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.annealing_rounds == 0 {
            return Err(RLError::InvalidConfig(
                "annealing_rounds must be at least 1".into(),
            ));
        }
        if self.queue_capacity == 0 {
            return Err(RLError::InvalidConfig(
                "queue_capacity must be positive".into(),
            ));
        }
        if !(self.min_value_error > 0.0 && self.min_state_dist_error > 0.0) {
            return Err(RLError::InvalidConfig(
                "convergence thresholds must be positive".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_default_thresholds() {
        let config = SolverConfig::default();
        assert_relative_eq!(config.initial_value_threshold(), 0.064);
        assert_relative_eq!(config.initial_state_dist_threshold(), 0.0064);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: SolverConfig = serde_json::from_str(r#"{"annealing_rounds": 3}"#).unwrap();
        assert_eq!(config.annealing_rounds, 3);
        assert_eq!(config.queue_capacity, 10_000);
        assert_relative_eq!(config.initial_value_threshold(), 0.004);
    }

    #[test]
    fn test_validate_rejects_zero_rounds() {
        let config = SolverConfig {
            annealing_rounds: 0,
            ..SolverConfig::default()
        };
        assert!(matches!(config.validate(), Err(RLError::InvalidConfig(_))));
    }
}
