//! Entropy-regularized value iteration with prioritized sweeping
//!
//! The solver finds the fixed point of the soft Bellman operator
//!
//! ```text
//! Q(s, a) = R(s, a) + V(next(s, a))
//! V(s)    = alpha * log(sum_a exp(Q(s, a) / alpha))   (alpha > 0)
//! V(s)    = max_a Q(s, a)                              (alpha = 0)
//! ```
//!
//! Each annealing round runs a full backup sweep, then drains a priority queue
//! of states whose value moved by more than the round's threshold, backing up
//! their predecessors. The threshold halves every round, so early rounds settle
//! a coarse fixed point that later rounds refine.

use rand::Rng;
use tracing::debug;

use crate::policy::{boltzmann, sample_action, soft_max};
use crate::{Model, PriorityQueue, RLError, Result, Rollout, SolverConfig, StateId};

/// Planner state for one model: values, policy and absorbing flags.
///
/// A `ValueIterator` only reads the model, so many of them can plan over the
/// same model concurrently. Its own arrays are never shared.
#[derive(Debug, Clone)]
pub struct ValueIterator<'m, K> {
    pub(crate) model: &'m Model<K>,
    pub(crate) config: SolverConfig,
    pub(crate) values: Vec<f64>,
    pub(crate) q_values: Vec<f64>,
    pub(crate) policy: Vec<f64>,
    pub(crate) absorbing: Vec<bool>,
    pub(crate) alpha: f64,
    pub(crate) queue: PriorityQueue,
    pub(crate) dropped: usize,
}

impl<'m, K: StateId> ValueIterator<'m, K> {
    /// Create a planner with the default solver configuration
    #[must_use]
    pub fn new(model: &'m Model<K>) -> Self {
        Self::with_config(model, SolverConfig::default())
    }

    /// Create a planner with an explicit solver configuration
    #[must_use]
    pub fn with_config(model: &'m Model<K>, config: SolverConfig) -> Self {
        Self {
            model,
            config,
            values: vec![0.0; model.num_states()],
            q_values: vec![0.0; model.num_actions()],
            policy: vec![0.0; model.num_actions()],
            absorbing: vec![false; model.num_states()],
            alpha: 0.0,
            queue: PriorityQueue::new(model.num_states()),
            dropped: 0,
        }
    }

    /// The model being planned over
    #[must_use]
    pub fn model(&self) -> &'m Model<K> {
        self.model
    }

    /// Solver configuration
    #[must_use]
    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Reset values, policy, absorbing flags and temperature
    pub fn init(&mut self) {
        self.values.fill(0.0);
        self.q_values.fill(0.0);
        self.policy.fill(0.0);
        self.init_absorbing_states();
        self.alpha = 0.0;
        self.dropped = 0;
    }

    /// Clear every absorbing flag
    pub fn init_absorbing_states(&mut self) {
        self.absorbing.fill(false);
    }

    /// Mark a state as terminal; its outgoing actions are no longer planned over
    pub fn set_absorbing_state(&mut self, id: &K) -> Result<()> {
        let index = self.model.index_of(id)?;
        self.absorbing[index] = true;
        Ok(())
    }

    /// Whether the state at `index` is absorbing
    ///
    /// # Panics
    ///
    /// Panics if `index` is not a valid state index.
    #[must_use]
    pub fn is_absorbing(&self, index: usize) -> bool {
        self.absorbing[index]
    }

    /// Soft-max temperature
    #[must_use]
    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Set the soft-max temperature; zero selects the hard max
    pub fn set_alpha(&mut self, alpha: f64) {
        self.alpha = alpha;
    }

    /// State values, indexed by state
    #[must_use]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Action values, indexed by action
    #[must_use]
    pub fn q_values(&self) -> &[f64] {
        &self.q_values
    }

    /// Action probabilities, indexed by action
    #[must_use]
    pub fn policy(&self) -> &[f64] {
        &self.policy
    }

    /// Queue entries discarded because the queue was full during the last
    /// value iteration or visitation pass
    #[must_use]
    pub fn dropped_queue_entries(&self) -> usize {
        self.dropped
    }

    /// Value of a state by identity
    pub fn value_of(&self, id: &K) -> Result<f64> {
        Ok(self.values[self.model.index_of(id)?])
    }

    /// Actions that planning may use from a state; empty for absorbing states
    ///
    /// # Panics
    ///
    /// Panics if `index` is not a valid state index.
    #[must_use]
    pub fn usable_actions(&self, index: usize) -> &'m [usize] {
        if self.absorbing[index] {
            &[]
        } else {
            self.model.state(index).actions()
        }
    }

    /// Solve for the soft Bellman fixed point, updating `V` and `Q`
    pub fn run_value_iteration(&mut self) {
        let model = self.model;
        let capacity = self.config.queue_capacity;
        let mut threshold = self.config.initial_value_threshold();
        self.queue.clear();
        self.dropped = 0;

        for round in 0..self.config.annealing_rounds {
            let mut dropped = 0usize;
            for s in 0..model.num_states() {
                let td = self.bellman_backup(s);
                if td > threshold {
                    if self.queue.len() < capacity {
                        self.queue.push(s, td);
                    } else {
                        dropped += 1;
                    }
                }
            }

            let mut iterations = 0;
            while iterations < self.config.max_iterations_per_round {
                let Ok((index, _)) = self.queue.pop() else {
                    break;
                };
                iterations += 1;
                for &tr in model.state(index).incoming() {
                    let predecessor = model.action(model.transition(tr).action()).source();
                    let td = self.bellman_backup(predecessor);
                    if td > threshold {
                        if self.queue.len() < capacity {
                            self.queue.push(predecessor, td);
                        } else {
                            dropped += 1;
                        }
                    }
                }
            }

            debug!(round, threshold, iterations, dropped, "value iteration round");
            self.dropped += dropped;
            threshold *= 0.5;
        }
        self.queue.clear();
    }

    /// Back up one state and return the absolute change of its value
    fn bellman_backup(&mut self, s: usize) -> f64 {
        let actions = self.usable_actions(s);
        if actions.is_empty() {
            return 0.0;
        }
        let model = self.model;
        for &a in actions {
            self.q_values[a] = model.reward(a) + self.values[model.next_state(a)];
        }
        let v = soft_max(&self.q_values, actions, self.alpha);
        let td = (v - self.values[s]).abs();
        self.values[s] = v;
        td
    }

    /// Recompute the Boltzmann policy of every plannable state from `Q`
    pub fn update_policy(&mut self) {
        for s in 0..self.model.num_states() {
            let actions = self.usable_actions(s);
            if actions.is_empty() {
                continue;
            }
            boltzmann(&self.q_values, actions, self.alpha, &mut self.policy);
        }
    }

    /// Roll out the current policy from `start` until `goal`, a dead end, or
    /// `max_steps` transitions.
    pub fn generate_trajectory<R>(
        &self,
        start: &K,
        goal: &K,
        max_steps: usize,
        rng: &mut R,
    ) -> Result<Rollout<K>>
    where
        R: Rng + ?Sized,
    {
        let model = self.model;
        let start_index = model.index_of(start)?;
        let goal_index = model.index_of(goal)?;

        let mut s = start_index;
        let mut states = vec![start.clone()];
        if s == goal_index {
            return Ok(Rollout {
                states,
                reached_goal: true,
            });
        }

        for _ in 0..max_steps {
            let actions = self.usable_actions(s);
            if actions.is_empty() {
                break;
            }
            let a = sample_action(&self.policy, actions, rng.gen::<f64>());
            s = model.next_state(a);
            states.push(self.id(s)?.clone());
            if s == goal_index {
                return Ok(Rollout {
                    states,
                    reached_goal: true,
                });
            }
        }

        Ok(Rollout {
            states,
            reached_goal: false,
        })
    }

    pub(crate) fn id(&self, index: usize) -> Result<&'m K> {
        self.model
            .id_of(index)
            .ok_or_else(|| RLError::UnknownState(format!("index {index}")))
    }
}
