//! Actions and their deterministic transitions

use serde::{Deserialize, Serialize};

/// An action in the model's flat action arena.
///
/// The world is deterministic, so every action owns exactly one transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    /// Dense index of the action
    pub(crate) index: usize,
    /// Index of the state the action leaves
    pub(crate) source: usize,
    /// Index of the owned transition
    pub(crate) transition: usize,
}

impl Action {
    /// Dense index of the action
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Index of the state this action is taken from
    #[must_use]
    pub fn source(&self) -> usize {
        self.source
    }

    /// Index of the transition owned by this action
    #[must_use]
    pub fn transition(&self) -> usize {
        self.transition
    }
}

/// Outcome of taking an action
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    /// Index of the action that owns this transition
    pub(crate) action: usize,
    /// Index of the destination state
    pub(crate) destination: usize,
    /// Immediate reward; the only field mutated after construction
    pub(crate) reward: f64,
}

impl Transition {
    /// Index of the owning action
    #[must_use]
    pub fn action(&self) -> usize {
        self.action
    }

    /// Index of the destination state
    #[must_use]
    pub fn destination(&self) -> usize {
        self.destination
    }

    /// Immediate reward of the transition
    #[must_use]
    pub fn reward(&self) -> f64 {
        self.reward
    }
}

/// A directed edge used to build a model: `from -> to` with a reward
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge<K> {
    /// Source state identity
    pub from: K,
    /// Destination state identity
    pub to: K,
    /// Reward collected when the edge is taken
    pub reward: f64,
}

impl<K> Edge<K> {
    /// Create a new edge
    pub fn new(from: K, to: K, reward: f64) -> Self {
        Self { from, to, reward }
    }
}

impl<K> From<(K, K, f64)> for Edge<K> {
    fn from((from, to, reward): (K, K, f64)) -> Self {
        Self { from, to, reward }
    }
}
