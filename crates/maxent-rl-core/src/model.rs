//! Deterministic MDP model stored as flat index arenas
//!
//! States, actions and transitions live in three vectors and refer to each
//! other by dense integer index. The topology never changes after
//! construction; only per-transition rewards are rewritten, so a model can be
//! read by any number of planners at once.

use indexmap::IndexSet;
use tracing::warn;

use crate::{Action, Edge, RLError, Result, State, StateId, Transition};

/// Model parameters of a deterministic Markov decision process
#[derive(Debug, Clone)]
pub struct Model<K> {
    ids: IndexSet<K>,
    states: Vec<State>,
    actions: Vec<Action>,
    transitions: Vec<Transition>,
    dropped_edges: usize,
}

impl<K: StateId> Model<K> {
    /// Build a model from state identities and directed edges.
    ///
    /// Edges that mention an unknown identity are dropped; the number dropped
    /// is available through [`Model::dropped_edges`]. Parallel edges stay
    /// distinct actions. Duplicate identities collapse onto the first one.
    pub fn new<I, E>(state_ids: I, edges: E) -> Self
    where
        I: IntoIterator<Item = K>,
        E: IntoIterator<Item = Edge<K>>,
    {
        let ids: IndexSet<K> = state_ids.into_iter().collect();
        let mut states: Vec<State> = (0..ids.len()).map(State::new).collect();
        let mut actions = Vec::new();
        let mut transitions = Vec::new();
        let mut dropped_edges = 0;

        for edge in edges {
            let (Some(source), Some(destination)) =
                (ids.get_index_of(&edge.from), ids.get_index_of(&edge.to))
            else {
                dropped_edges += 1;
                continue;
            };

            let index = actions.len();
            actions.push(Action {
                index,
                source,
                transition: index,
            });
            transitions.push(Transition {
                action: index,
                destination,
                reward: edge.reward,
            });
            states[source].actions.push(index);
            states[destination].incoming.push(index);
        }

        if dropped_edges > 0 {
            warn!(dropped_edges, "edges referencing unknown states were dropped");
        }

        Self {
            ids,
            states,
            actions,
            transitions,
            dropped_edges,
        }
    }

    /// Number of states
    #[must_use]
    pub fn num_states(&self) -> usize {
        self.states.len()
    }

    /// Number of actions
    #[must_use]
    pub fn num_actions(&self) -> usize {
        self.actions.len()
    }

    /// Number of construction edges ignored because an endpoint was unknown
    #[must_use]
    pub fn dropped_edges(&self) -> usize {
        self.dropped_edges
    }

    /// Dense index of a state identity
    pub fn index_of(&self, id: &K) -> Result<usize> {
        self.ids
            .get_index_of(id)
            .ok_or_else(|| RLError::unknown_state(id))
    }

    /// State identity at a dense index
    #[must_use]
    pub fn id_of(&self, index: usize) -> Option<&K> {
        self.ids.get_index(index)
    }

    /// Look up a state by identity
    pub fn state_of(&self, id: &K) -> Result<&State> {
        self.index_of(id).map(|index| &self.states[index])
    }

    /// All states in index order
    #[must_use]
    pub fn states(&self) -> &[State] {
        &self.states
    }

    /// State at a dense index
    ///
    /// # Panics
    ///
    /// Panics if `index` is not a valid state index.
    #[must_use]
    pub fn state(&self, index: usize) -> &State {
        &self.states[index]
    }

    /// All actions in index order
    #[must_use]
    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    /// Action at a dense index
    ///
    /// # Panics
    ///
    /// Panics if `index` is not a valid action index.
    #[must_use]
    pub fn action(&self, index: usize) -> &Action {
        &self.actions[index]
    }

    /// Transition at a dense index
    ///
    /// # Panics
    ///
    /// Panics if `index` is not a valid transition index.
    #[must_use]
    pub fn transition(&self, index: usize) -> &Transition {
        &self.transitions[index]
    }

    /// The transition an action leads through
    ///
    /// # Panics
    ///
    /// Panics if `action` is not a valid action index.
    #[must_use]
    pub fn transition_of(&self, action: usize) -> &Transition {
        &self.transitions[self.actions[action].transition]
    }

    /// Destination state index of an action
    ///
    /// # Panics
    ///
    /// Panics if `action` is not a valid action index.
    #[must_use]
    pub fn next_state(&self, action: usize) -> usize {
        self.transition_of(action).destination
    }

    /// Current reward of an action
    ///
    /// # Panics
    ///
    /// Panics if `action` is not a valid action index.
    #[must_use]
    pub fn reward(&self, action: usize) -> f64 {
        self.transition_of(action).reward
    }

    /// Rewrite the reward of one action; out-of-range indices change nothing
    pub fn set_reward(&mut self, action: usize, value: f64) -> Result<()> {
        let len = self.actions.len();
        let transition = self
            .actions
            .get(action)
            .map(|a| a.transition)
            .ok_or(RLError::ActionOutOfRange { index: action, len })?;
        self.transitions[transition].reward = value;
        Ok(())
    }

    /// Rewrite the rewards of all actions at once
    pub fn update_rewards(&mut self, rewards: &[f64]) -> Result<()> {
        if rewards.len() != self.actions.len() {
            return Err(RLError::DimensionMismatch {
                expected: self.actions.len(),
                actual: rewards.len(),
            });
        }
        for (action, &reward) in self.actions.iter().zip(rewards) {
            self.transitions[action.transition].reward = reward;
        }
        Ok(())
    }

    /// First action leading from `from` to `to`, if any
    #[must_use]
    pub fn action_between(&self, from: &K, to: &K) -> Option<&Action> {
        let source = self.ids.get_index_of(from)?;
        let destination = self.ids.get_index_of(to)?;
        self.states[source]
            .actions
            .iter()
            .map(|&a| &self.actions[a])
            .find(|a| self.transitions[a.transition].destination == destination)
    }
}
