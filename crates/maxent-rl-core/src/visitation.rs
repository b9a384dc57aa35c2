//! Forward state/action visitation frequencies under the current policy
//!
//! Solves
//!
//! ```text
//! D(s) = D0(s) + sum over a -> s, source(a) not absorbing, of D(a)
//! D(a) = D(source(a)) * Policy(a)
//! ```
//!
//! with the same sweep-then-drain annealing pattern as value iteration, but
//! propagating mass forward from states with initial mass to their successors.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{RLError, Result, StateId, ValueIterator};

/// Visitation frequencies of states and actions.
///
/// Frequencies are not normalized: on cyclic or non-absorbing structure the
/// totals can exceed one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Visitation {
    /// Expected visits per state
    pub states: Vec<f64>,
    /// Expected uses per action
    pub actions: Vec<f64>,
}

impl<'m, K: StateId> ValueIterator<'m, K> {
    /// Propagate `initial_state_dist` through the current policy
    pub fn state_action_visitation(&mut self, initial_state_dist: &[f64]) -> Result<Visitation> {
        let model = self.model;
        if initial_state_dist.len() != model.num_states() {
            return Err(RLError::DimensionMismatch {
                expected: model.num_states(),
                actual: initial_state_dist.len(),
            });
        }

        let mut visits = Visitation {
            states: initial_state_dist.to_vec(),
            actions: vec![0.0; model.num_actions()],
        };
        let mut threshold = self.config.initial_state_dist_threshold();
        self.queue.clear();
        self.dropped = 0;

        for round in 0..self.config.annealing_rounds {
            let mut dropped = 0usize;
            if round == 0 {
                for (s, &mass) in initial_state_dist.iter().enumerate() {
                    if mass > 0.0 {
                        dropped += self.enqueue(s, mass);
                    }
                }
            } else {
                for s in 0..model.num_states() {
                    dropped += self.propagate(s, threshold, initial_state_dist, &mut visits);
                }
            }

            let mut iterations = 0;
            while iterations < self.config.max_iterations_per_round {
                let Ok((s, _)) = self.queue.pop() else {
                    break;
                };
                iterations += 1;
                dropped += self.propagate(s, threshold, initial_state_dist, &mut visits);
            }

            debug!(round, threshold, iterations, dropped, "visitation round");
            self.dropped += dropped;
            threshold *= 0.5;
        }
        self.queue.clear();

        Ok(visits)
    }

    /// Push mass from `s` to its successors; returns the number of dropped
    /// queue entries.
    fn propagate(
        &mut self,
        s: usize,
        threshold: f64,
        initial_state_dist: &[f64],
        visits: &mut Visitation,
    ) -> usize {
        let actions = self.usable_actions(s);
        if actions.is_empty() || visits.states[s] < threshold {
            return 0;
        }

        let model = self.model;
        let mut dropped = 0;
        for &a in actions {
            visits.actions[a] = visits.states[s] * self.policy[a];
            let next = model.next_state(a);
            let previous = visits.states[next];
            visits.states[next] = initial_state_dist[next] + self.inflow(next, &visits.actions);
            let change = (visits.states[next] - previous).abs();
            if change > threshold {
                dropped += self.enqueue(next, change);
            }
        }
        dropped
    }

    /// Action mass flowing into `s` from non-absorbing predecessors
    fn inflow(&self, s: usize, action_dist: &[f64]) -> f64 {
        let model = self.model;
        model
            .state(s)
            .incoming()
            .iter()
            .map(|&tr| model.transition(tr).action())
            .filter(|&a| !self.absorbing[model.action(a).source()])
            .map(|a| action_dist[a])
            .sum()
    }

    fn enqueue(&mut self, s: usize, priority: f64) -> usize {
        if self.queue.len() < self.config.queue_capacity {
            self.queue.push(s, priority);
            0
        } else {
            1
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{Edge, Model, SolverConfig, ValueIterator};
    use approx::assert_relative_eq;

    fn cycle() -> Model<i32> {
        Model::new(
            [0, 1, 2, 3],
            [
                Edge::new(0, 1, -1.0),
                Edge::new(1, 2, -1.0),
                Edge::new(1, 3, 0.0),
                Edge::new(2, 3, -1.0),
                Edge::new(3, 0, -1.0),
            ],
        )
    }

    fn planned(model: &Model<i32>, goal: i32) -> ValueIterator<'_, i32> {
        let mut vi = ValueIterator::new(model);
        vi.set_absorbing_state(&goal).unwrap();
        vi.run_value_iteration();
        vi.update_policy();
        vi
    }

    #[test]
    fn test_visitation_skips_detour() {
        let model = cycle();
        let mut vi = planned(&model, 3);
        let visits = vi.state_action_visitation(&[1.0, 0.0, 0.0, 0.0]).unwrap();

        assert_eq!(visits.states, vec![1.0, 1.0, 0.0, 1.0]);
        assert_eq!(visits.actions, vec![1.0, 0.0, 1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_visitation_wraps_around_cycle() {
        let model = cycle();
        let mut vi = planned(&model, 2);
        let visits = vi.state_action_visitation(&[0.0, 0.0, 0.0, 1.0]).unwrap();

        assert_eq!(visits.states, vec![1.0, 1.0, 1.0, 1.0]);
        assert_eq!(visits.actions, vec![1.0, 1.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_visitation_splits_mass_by_policy() {
        let model = Model::new(
            ["s", "a", "b", "g"],
            [
                Edge::new("s", "a", -1.0),
                Edge::new("s", "b", -1.0),
                Edge::new("a", "g", -1.0),
                Edge::new("b", "g", -1.0),
            ],
        );
        let mut vi = ValueIterator::new(&model);
        vi.set_alpha(1.0);
        vi.set_absorbing_state(&"g").unwrap();
        vi.run_value_iteration();
        vi.update_policy();

        let visits = vi.state_action_visitation(&[1.0, 0.0, 0.0, 0.0]).unwrap();
        assert_relative_eq!(visits.actions[0], 0.5, epsilon = 1e-9);
        assert_relative_eq!(visits.actions[1], 0.5, epsilon = 1e-9);
        assert_relative_eq!(visits.states[3], 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_visitation_dimension_mismatch() {
        let model = cycle();
        let mut vi = planned(&model, 3);
        assert!(vi.state_action_visitation(&[1.0]).is_err());
    }

    #[test]
    fn test_visitation_with_full_queue() {
        let model = cycle();
        let initial = [0.5, 0.5, 0.0, 0.0];

        let mut vi = planned(&model, 3);
        let expected = vi.state_action_visitation(&initial).unwrap();
        assert_eq!(vi.dropped_queue_entries(), 0);

        let config = SolverConfig {
            queue_capacity: 1,
            ..SolverConfig::default()
        };
        let mut vi = ValueIterator::with_config(&model, config);
        vi.set_absorbing_state(&3).unwrap();
        vi.run_value_iteration();
        vi.update_policy();
        let visits = vi.state_action_visitation(&initial).unwrap();

        assert_eq!(vi.dropped_queue_entries(), 1);
        assert_eq!(visits, expected);
        assert_eq!(visits.states, vec![0.5, 1.0, 0.0, 1.0]);
        assert_eq!(visits.actions, vec![0.5, 0.0, 1.0, 0.0, 0.0]);
    }
}
