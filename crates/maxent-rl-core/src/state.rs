//! State identities and the state arena entry

use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::hash::Hash;

/// Trait for external state identities.
///
/// Any comparable, hashable key works; the model maps it onto a dense index.
pub trait StateId: Clone + Eq + Hash + Debug + Send + Sync + 'static {}

impl<T> StateId for T where T: Clone + Eq + Hash + Debug + Send + Sync + 'static {}

/// A state in the model's flat state arena
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct State {
    /// Dense index of the state
    pub(crate) index: usize,
    /// Outgoing action indices
    pub(crate) actions: Vec<usize>,
    /// Indices of transitions that lead into this state
    pub(crate) incoming: Vec<usize>,
}

impl State {
    pub(crate) fn new(index: usize) -> Self {
        Self {
            index,
            actions: Vec::new(),
            incoming: Vec::new(),
        }
    }

    /// Dense index of the state
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Outgoing action indices, in construction order
    #[must_use]
    pub fn actions(&self) -> &[usize] {
        &self.actions
    }

    /// Transitions pointing into this state, used for backward sweeps
    #[must_use]
    pub fn incoming(&self) -> &[usize] {
        &self.incoming
    }

    /// Whether the state has no outgoing actions at all
    #[must_use]
    pub fn is_dead_end(&self) -> bool {
        self.actions.is_empty()
    }
}
