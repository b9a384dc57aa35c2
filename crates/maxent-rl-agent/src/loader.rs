//! Demonstration loaders: expert-policy rollouts and JSON files

use async_trait::async_trait;
use indexmap::IndexMap;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use tracing::warn;

use maxent_rl_core::{Result, StateId, ValueIterator};

use crate::demonstration::{DemonstrationLoader, InitialStateCount, TransitionCount};

/// Loader that samples expert behavior from an already-solved planner.
///
/// The planner must have its policy updated for the goal that demonstrations
/// are requested for.
pub struct RolloutDemonstrationLoader<'a, 'm, K> {
    planner: &'a ValueIterator<'m, K>,
    initial_states: IndexMap<K, Vec<InitialStateCount<K>>>,
    max_steps: usize,
    rng: Mutex<StdRng>,
}

impl<'a, 'm, K: StateId> RolloutDemonstrationLoader<'a, 'm, K> {
    /// Create a loader with an entropy-seeded RNG
    pub fn new(planner: &'a ValueIterator<'m, K>, max_steps: usize) -> Self {
        Self::with_rng(planner, max_steps, StdRng::from_entropy())
    }

    /// Create a loader with an explicit RNG
    pub fn with_rng(planner: &'a ValueIterator<'m, K>, max_steps: usize, rng: StdRng) -> Self {
        Self {
            planner,
            initial_states: IndexMap::new(),
            max_steps,
            rng: Mutex::new(rng),
        }
    }

    /// Register `count` expert episodes from `start` toward `goal`
    pub fn set_initial_state(&mut self, goal: K, start: K, count: usize) {
        self.initial_states
            .entry(goal)
            .or_default()
            .push(InitialStateCount { state: start, count });
    }
}

#[async_trait]
impl<'a, 'm, K: StateId> DemonstrationLoader<K> for RolloutDemonstrationLoader<'a, 'm, K> {
    async fn load_initial_states(&self, goal: &K) -> Result<Vec<InitialStateCount<K>>> {
        Ok(self.initial_states.get(goal).cloned().unwrap_or_default())
    }

    async fn load_transition_visitation(&self, goal: &K) -> Result<Vec<TransitionCount<K>>> {
        let Some(starts) = self.initial_states.get(goal) else {
            return Ok(Vec::new());
        };

        let mut counts: IndexMap<(K, K), usize> = IndexMap::new();
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        for start in starts {
            for _ in 0..start.count {
                let rollout =
                    self.planner
                        .generate_trajectory(&start.state, goal, self.max_steps, &mut *rng)?;
                if !rollout.reached_goal {
                    warn!(start = ?start.state, goal = ?goal, "rollout did not reach the goal");
                    continue;
                }
                for (from, to) in rollout.transitions() {
                    *counts.entry((from.clone(), to.clone())).or_insert(0) += 1;
                }
            }
        }

        Ok(counts
            .into_iter()
            .map(|((from, to), count)| TransitionCount { from, to, count })
            .collect())
    }
}

/// Demonstration counts for one goal as stored on disk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemonstrationRecord<K> {
    /// Goal state identity
    pub goal: K,
    /// Start states of the expert episodes
    pub initial_states: Vec<InitialStateCount<K>>,
    /// Transition counts of the expert episodes
    pub transitions: Vec<TransitionCount<K>>,
}

/// Loader that reads a JSON array of [`DemonstrationRecord`]s.
///
/// The file is read on every call; a goal missing from the file yields empty
/// lists.
#[derive(Debug, Clone)]
pub struct JsonDemonstrationLoader {
    path: PathBuf,
}

impl JsonDemonstrationLoader {
    /// Create a loader for the file at `path`
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Write records to `path` in the format this loader reads
    pub async fn save<K: Serialize + Sync>(
        path: impl AsRef<Path>,
        records: &[DemonstrationRecord<K>],
    ) -> Result<()> {
        let json = serde_json::to_string_pretty(records)?;
        tokio::fs::write(path, json).await?;
        Ok(())
    }

    async fn record<K>(&self, goal: &K) -> Result<Option<DemonstrationRecord<K>>>
    where
        K: StateId + DeserializeOwned,
    {
        let text = tokio::fs::read_to_string(&self.path).await?;
        let records: Vec<DemonstrationRecord<K>> = serde_json::from_str(&text)?;
        Ok(records.into_iter().find(|r| &r.goal == goal))
    }
}

#[async_trait]
impl<K> DemonstrationLoader<K> for JsonDemonstrationLoader
where
    K: StateId + DeserializeOwned,
{
    async fn load_initial_states(&self, goal: &K) -> Result<Vec<InitialStateCount<K>>> {
        Ok(self
            .record(goal)
            .await?
            .map(|r| r.initial_states)
            .unwrap_or_default())
    }

    async fn load_transition_visitation(&self, goal: &K) -> Result<Vec<TransitionCount<K>>> {
        Ok(self
            .record(goal)
            .await?
            .map(|r| r.transitions)
            .unwrap_or_default())
    }
}
