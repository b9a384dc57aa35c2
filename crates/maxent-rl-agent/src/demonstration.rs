//! Expert demonstrations summarized as visitation distributions

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;

use maxent_rl_core::{Model, RLError, Result, StateId};

/// How often an expert episode started in a state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitialStateCount<K> {
    /// Start state identity
    pub state: K,
    /// Number of episodes starting there
    pub count: usize,
}

/// How often the expert took the transition `from -> to`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionCount<K> {
    /// Source state identity
    pub from: K,
    /// Destination state identity
    pub to: K,
    /// Number of times the transition was taken
    pub count: usize,
}

/// Source of expert demonstration data for a goal
#[async_trait]
pub trait DemonstrationLoader<K: StateId>: Send + Sync {
    /// Start states of the expert episodes for `goal`
    async fn load_initial_states(&self, goal: &K) -> Result<Vec<InitialStateCount<K>>>;

    /// Transition counts of the expert episodes for `goal`
    async fn load_transition_visitation(&self, goal: &K) -> Result<Vec<TransitionCount<K>>>;
}

/// Expert behavior toward one goal.
///
/// Both distributions are divided by the number of sampled episodes, so the
/// initial-state distribution sums to one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Demonstration<K> {
    goal: K,
    initial_state_dist: Vec<f64>,
    action_dist: Vec<f64>,
    num_samples: usize,
}

impl<K: StateId> Demonstration<K> {
    /// Aggregate raw state sequences.
    ///
    /// The first state of each sequence counts as an initial state and every
    /// consecutive pair as one use of the matching action. Sequences starting
    /// in an unknown state and pairs without a matching action are skipped.
    pub fn from_trajectories<T>(model: &Model<K>, goal: K, trajectories: &[T]) -> Result<Self>
    where
        T: AsRef<[K]>,
    {
        let mut initial_state_dist = vec![0.0; model.num_states()];
        let mut action_dist = vec![0.0; model.num_actions()];
        let mut num_samples = 0;
        let mut skipped = 0usize;

        for trajectory in trajectories {
            let states = trajectory.as_ref();
            let Some(start) = states.first() else {
                continue;
            };
            let Ok(start) = model.index_of(start) else {
                skipped += 1;
                continue;
            };
            initial_state_dist[start] += 1.0;
            num_samples += 1;

            for pair in states.windows(2) {
                match model.action_between(&pair[0], &pair[1]) {
                    Some(action) => action_dist[action.index()] += 1.0,
                    None => skipped += 1,
                }
            }
        }

        if skipped > 0 {
            warn!(goal = ?goal, skipped, "demonstration entries referencing unknown states were skipped");
        }
        Self::normalized(goal, initial_state_dist, action_dist, num_samples)
    }

    /// Aggregate counts served by a [`DemonstrationLoader`].
    ///
    /// Loader failures are returned; entries naming unknown states or
    /// transitions are skipped.
    pub async fn from_loader<L>(model: &Model<K>, goal: K, loader: &L) -> Result<Self>
    where
        L: DemonstrationLoader<K> + ?Sized,
    {
        let initial_states = loader.load_initial_states(&goal).await?;
        let transitions = loader.load_transition_visitation(&goal).await?;

        let mut initial_state_dist = vec![0.0; model.num_states()];
        let mut action_dist = vec![0.0; model.num_actions()];
        let mut num_samples = 0;
        let mut skipped = 0usize;

        for entry in &initial_states {
            match model.index_of(&entry.state) {
                Ok(index) => {
                    initial_state_dist[index] += entry.count as f64;
                    num_samples += entry.count;
                }
                Err(_) => skipped += 1,
            }
        }
        for entry in &transitions {
            match model.action_between(&entry.from, &entry.to) {
                Some(action) => action_dist[action.index()] += entry.count as f64,
                None => skipped += 1,
            }
        }

        if skipped > 0 {
            warn!(goal = ?goal, skipped, "demonstration entries referencing unknown states were skipped");
        }
        Self::normalized(goal, initial_state_dist, action_dist, num_samples)
    }

    fn normalized(
        goal: K,
        mut initial_state_dist: Vec<f64>,
        mut action_dist: Vec<f64>,
        num_samples: usize,
    ) -> Result<Self> {
        if num_samples == 0 {
            return Err(RLError::EmptyDemonstration(format!("{goal:?}")));
        }
        let n = num_samples as f64;
        initial_state_dist.iter_mut().for_each(|d| *d /= n);
        action_dist.iter_mut().for_each(|d| *d /= n);

        Ok(Self {
            goal,
            initial_state_dist,
            action_dist,
            num_samples,
        })
    }

    /// Goal state identity
    #[must_use]
    pub fn goal(&self) -> &K {
        &self.goal
    }

    /// Normalized initial-state distribution, indexed by state
    #[must_use]
    pub fn initial_state_dist(&self) -> &[f64] {
        &self.initial_state_dist
    }

    /// Action visitation per episode, indexed by action
    #[must_use]
    pub fn action_dist(&self) -> &[f64] {
        &self.action_dist
    }

    /// Number of episodes behind the demonstration
    #[must_use]
    pub fn num_samples(&self) -> usize {
        self.num_samples
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use maxent_rl_core::Edge;

    fn line() -> Model<u32> {
        Model::new(
            [0, 1, 2],
            [
                Edge::new(0, 1, -1.0),
                Edge::new(1, 2, -1.0),
                Edge::new(0, 2, -3.0),
            ],
        )
    }

    struct FixedLoader;

    #[async_trait]
    impl DemonstrationLoader<u32> for FixedLoader {
        async fn load_initial_states(&self, _goal: &u32) -> Result<Vec<InitialStateCount<u32>>> {
            Ok(vec![
                InitialStateCount { state: 0, count: 3 },
                InitialStateCount { state: 1, count: 1 },
                InitialStateCount { state: 9, count: 5 },
            ])
        }

        async fn load_transition_visitation(&self, _goal: &u32) -> Result<Vec<TransitionCount<u32>>> {
            Ok(vec![
                TransitionCount { from: 0, to: 1, count: 2 },
                TransitionCount { from: 1, to: 2, count: 3 },
                TransitionCount { from: 0, to: 2, count: 1 },
                TransitionCount { from: 2, to: 0, count: 4 },
            ])
        }
    }

    struct FailingLoader;

    #[async_trait]
    impl DemonstrationLoader<u32> for FailingLoader {
        async fn load_initial_states(&self, _goal: &u32) -> Result<Vec<InitialStateCount<u32>>> {
            Err(RLError::Loader("backend unavailable".into()))
        }

        async fn load_transition_visitation(&self, _goal: &u32) -> Result<Vec<TransitionCount<u32>>> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn test_from_trajectories() {
        let model = line();
        let trajectories = vec![vec![0, 1, 2], vec![0, 2], vec![1, 2], vec![7, 2], vec![]];
        let demo = Demonstration::from_trajectories(&model, 2, &trajectories).unwrap();

        assert_eq!(demo.num_samples(), 3);
        assert_eq!(demo.goal(), &2);
        let third = 1.0 / 3.0;
        assert_eq!(demo.initial_state_dist(), &[2.0 * third, third, 0.0]);
        assert_eq!(demo.action_dist(), &[third, 2.0 * third, third]);
    }

    #[tokio::test]
    async fn test_from_loader_skips_unknown_entries() {
        let model = line();
        let demo = Demonstration::from_loader(&model, 2, &FixedLoader).await.unwrap();

        assert_eq!(demo.num_samples(), 4);
        assert_eq!(demo.initial_state_dist(), &[0.75, 0.25, 0.0]);
        assert_eq!(demo.action_dist(), &[0.5, 0.75, 0.25]);
    }

    #[test]
    fn test_loader_failure_propagates() {
        let model = line();
        let result = tokio_test::block_on(Demonstration::from_loader(&model, 2, &FailingLoader));
        assert!(matches!(result, Err(RLError::Loader(_))));
    }

    #[test]
    fn test_empty_demonstration_rejected() {
        let model = line();
        let trajectories: Vec<Vec<u32>> = vec![vec![8, 9]];
        let result = Demonstration::from_trajectories(&model, 2, &trajectories);
        assert!(matches!(result, Err(RLError::EmptyDemonstration(_))));
    }
}
