//! Rollout results

use serde::{Deserialize, Serialize};

/// States visited by one policy rollout
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rollout<K> {
    /// Visited state identities, starting with the start state
    pub states: Vec<K>,
    /// Whether the rollout ended on the goal
    pub reached_goal: bool,
}

impl<K> Rollout<K> {
    /// Number of transitions taken
    #[must_use]
    pub fn len(&self) -> usize {
        self.states.len().saturating_sub(1)
    }

    /// Whether no transition was taken
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Consecutive `(from, to)` pairs of the rollout
    pub fn transitions(&self) -> impl Iterator<Item = (&K, &K)> {
        self.states.windows(2).map(|pair| (&pair[0], &pair[1]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transitions() {
        let rollout = Rollout {
            states: vec![1, 2, 5],
            reached_goal: true,
        };
        assert_eq!(rollout.len(), 2);
        let pairs: Vec<_> = rollout.transitions().collect();
        assert_eq!(pairs, vec![(&1, &2), (&2, &5)]);
    }

    #[test]
    fn test_single_state_is_empty() {
        let rollout = Rollout {
            states: vec![7],
            reached_goal: true,
        };
        assert!(rollout.is_empty());
        assert_eq!(rollout.transitions().count(), 0);
    }
}
