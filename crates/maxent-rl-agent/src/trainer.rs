//! Maximum-entropy IRL trainer for linear reward functions
//!
//! The reward of an action is `-theta . F(a)`, optionally lowered by a
//! per-action offset. Each epoch fans out planning workers that re-solve the
//! model under the current reward for a randomly drawn demonstration and
//! return the feature-expectation difference between expert and planner. The
//! summed gradient then updates `theta`, and the model's rewards are rewritten
//! before the next epoch starts.
//!
//! Workers hold a read lock on the model for their whole solve; the reward
//! rewrite takes the write lock after every worker has joined, so planning and
//! rewriting never overlap.

use chrono::{DateTime, Utc};
use ndarray::{Array1, ArrayView1};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinSet;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use maxent_rl_core::{Model, RLError, Result, SolverConfig, StateId, ValueIterator, Visitation};

use crate::demonstration::Demonstration;
use crate::feature::Feature;
use crate::utils::{clip, cosine_similarity, l1_normalize, norm, ExponentialSchedule, Schedule};

/// Configuration for the linear-reward trainer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainerConfig {
    /// Bound applied to each multiplicative factor or additive step
    pub gradient_clip: f64,
    /// Per-epoch decay of the step size
    pub gradient_decay: f64,
    /// Soft-max temperature of the trainer's planners
    pub alpha: f64,
    /// Also fit a per-action reward offset with projected gradient ascent
    pub fit_unique_cost: bool,
    /// Seed for demonstration sampling; entropy-seeded when absent
    pub seed: Option<u64>,
    /// Solver bounds shared by every planner
    pub solver: SolverConfig,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            gradient_clip: 3.0,
            gradient_decay: 0.99,
            alpha: 0.0,
            fit_unique_cost: false,
            seed: None,
            solver: SolverConfig::default(),
        }
    }
}

impl TrainerConfig {
    /// Parse a configuration from JSON; missing fields take their defaults
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read a JSON configuration file
    pub async fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = tokio::fs::read_to_string(path).await?;
        Self::from_json_str(&text)
    }

    /// Reject configurations the trainer cannot run with
    pub fn validate(&self) -> Result<()> {
        if !(self.gradient_clip > 0.0) {
            return Err(RLError::InvalidConfig("gradient_clip must be positive".into()));
        }
        if !(self.gradient_decay > 0.0 && self.gradient_decay <= 1.0) {
            return Err(RLError::InvalidConfig(
                "gradient_decay must be in (0, 1]".into(),
            ));
        }
        if !(self.alpha >= 0.0) {
            return Err(RLError::InvalidConfig("alpha must be non-negative".into()));
        }
        self.solver.validate()
    }
}

/// Per-epoch training statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochStats {
    /// Epoch number, starting at zero
    pub epoch: usize,
    /// Step size used for the update
    pub step_size: f64,
    /// Euclidean norm of the averaged theta gradient
    pub gradient_norm: f64,
    /// Theta after the update
    pub theta: Vec<f64>,
}

/// Summary of one `fit` call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitReport {
    /// Unique id of the run
    pub run_id: Uuid,
    /// Wall-clock start
    pub started_at: DateTime<Utc>,
    /// Wall-clock end
    pub finished_at: DateTime<Utc>,
    /// Statistics per epoch
    pub epochs: Vec<EpochStats>,
}

/// Gradient of the demonstration log-likelihood
#[derive(Debug, Clone, PartialEq)]
struct Gradient {
    theta: Array1<f64>,
    unique: Option<Array1<f64>>,
}

impl Gradient {
    fn zeros(dims: usize, num_actions: usize, with_unique: bool) -> Self {
        Self {
            theta: Array1::zeros(dims),
            unique: with_unique.then(|| Array1::zeros(num_actions)),
        }
    }

    fn accumulate(&mut self, other: &Gradient) {
        self.theta += &other.theta;
        if let (Some(sum), Some(term)) = (self.unique.as_mut(), other.unique.as_ref()) {
            *sum += term;
        }
    }

    fn scale(&mut self, factor: f64) {
        self.theta *= factor;
        if let Some(unique) = self.unique.as_mut() {
            *unique *= factor;
        }
    }
}

/// Linear reward model fit to expert demonstrations by MaxEnt IRL
pub struct LinearRewardTrainer<K> {
    model: Arc<RwLock<Model<K>>>,
    feature: Arc<Feature>,
    theta: Array1<f64>,
    unique_cost: Option<Array1<f64>>,
    config: TrainerConfig,
    rng: StdRng,
}

impl<K: StateId> LinearRewardTrainer<K> {
    /// Create a trainer with uniform `theta` and write its rewards into `model`
    pub fn new(mut model: Model<K>, feature: Feature, config: TrainerConfig) -> Result<Self> {
        config.validate()?;
        if feature.num_actions() != model.num_actions() {
            return Err(RLError::DimensionMismatch {
                expected: model.num_actions(),
                actual: feature.num_actions(),
            });
        }
        if feature.dims() == 0 {
            return Err(RLError::InvalidConfig("feature matrix has no columns".into()));
        }

        let dims = feature.dims();
        let num_actions = feature.num_actions();
        let theta = Array1::from_elem(dims, 1.0 / dims as f64);
        let unique_cost = config
            .fit_unique_cost
            .then(|| Array1::from_elem(num_actions, 0.1 / num_actions as f64));
        let rng = config
            .seed
            .map_or_else(StdRng::from_entropy, StdRng::seed_from_u64);

        model.update_rewards(&linear_cost(&feature, &theta, unique_cost.as_ref()))?;

        Ok(Self {
            model: Arc::new(RwLock::new(model)),
            feature: Arc::new(feature),
            theta,
            unique_cost,
            config,
            rng,
        })
    }

    /// Shared handle to the model whose rewards this trainer rewrites
    #[must_use]
    pub fn model(&self) -> Arc<RwLock<Model<K>>> {
        Arc::clone(&self.model)
    }

    /// Feature matrix
    #[must_use]
    pub fn feature(&self) -> &Feature {
        &self.feature
    }

    /// Current reward weights
    #[must_use]
    pub fn theta(&self) -> &Array1<f64> {
        &self.theta
    }

    /// Current per-action offsets, when fit
    #[must_use]
    pub fn unique_cost(&self) -> Option<&Array1<f64>> {
        self.unique_cost.as_ref()
    }

    /// Trainer configuration
    #[must_use]
    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }

    /// Replace `theta` and rewrite the model's rewards from it
    pub async fn set_theta(&mut self, theta: Array1<f64>) -> Result<()> {
        if theta.len() != self.feature.dims() {
            return Err(RLError::DimensionMismatch {
                expected: self.feature.dims(),
                actual: theta.len(),
            });
        }
        self.theta = theta;
        self.apply_cost().await
    }

    /// Per-action reward under the current parameters
    #[must_use]
    pub fn compute_cost(&self) -> Vec<f64> {
        linear_cost(&self.feature, &self.theta, self.unique_cost.as_ref())
    }

    /// Expected feature vector under an action distribution
    pub fn feature_expectation(&self, action_dist: &[f64]) -> Result<Array1<f64>> {
        self.feature.expectation(action_dist)
    }

    async fn apply_cost(&self) -> Result<()> {
        let cost = self.compute_cost();
        self.model.write().await.update_rewards(&cost)
    }

    /// Fit the reward parameters to `demonstrations`.
    ///
    /// Every epoch runs `parallelism` planning workers, each on a
    /// demonstration drawn uniformly with replacement, then applies one
    /// gradient step. The step size starts at `initial_step_size` and decays
    /// geometrically.
    #[instrument(skip(self, demonstrations), fields(demonstrations = demonstrations.len()))]
    pub async fn fit(
        &mut self,
        demonstrations: &[Demonstration<K>],
        epochs: usize,
        parallelism: usize,
        initial_step_size: f64,
    ) -> Result<FitReport> {
        if demonstrations.is_empty() {
            return Err(RLError::InvalidConfig("no demonstrations to fit".into()));
        }
        if parallelism == 0 {
            return Err(RLError::InvalidConfig("parallelism must be at least 1".into()));
        }

        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        info!(%run_id, "starting MaxEnt IRL fit");

        let demos: Arc<[Demonstration<K>]> = demonstrations.to_vec().into();
        let schedule = ExponentialSchedule::new(initial_step_size, 0.0, self.config.gradient_decay);
        let with_unique = self.unique_cost.is_some();
        let mut stats = Vec::with_capacity(epochs);

        for epoch in 0..epochs {
            let step_size = schedule.value(epoch);
            let accumulator = Arc::new(Mutex::new(Gradient::zeros(
                self.feature.dims(),
                self.feature.num_actions(),
                with_unique,
            )));

            let mut workers = JoinSet::new();
            for _ in 0..parallelism {
                let demo_index = self.rng.gen_range(0..demos.len());
                let model = Arc::clone(&self.model);
                let feature = Arc::clone(&self.feature);
                let demos = Arc::clone(&demos);
                let accumulator = Arc::clone(&accumulator);
                let config = self.config.clone();

                workers.spawn_blocking(move || -> Result<()> {
                    let model = model.blocking_read();
                    let gradient = feature_expectation_difference(
                        &model,
                        &feature,
                        &demos[demo_index],
                        &config,
                        with_unique,
                    )?;
                    accumulator.blocking_lock().accumulate(&gradient);
                    Ok(())
                });
            }
            while let Some(joined) = workers.join_next().await {
                joined??;
            }

            let mut gradient = accumulator.lock().await.clone();
            gradient.scale(1.0 / parallelism as f64);
            let gradient_norm = norm(gradient.theta.view());

            match &gradient.unique {
                None => self.exponentiated_gradient_ascent(&gradient.theta, step_size),
                Some(unique) => self.projected_gradient_ascent(&gradient.theta, unique, step_size),
            }
            self.apply_cost().await?;

            metrics::increment_counter!("maxent_fit_epochs_total");
            metrics::gauge!("maxent_fit_step_size", step_size);
            metrics::histogram!("maxent_fit_gradient_norm", gradient_norm);
            info!(epoch, step_size, gradient_norm, theta = ?self.theta.to_vec(), "epoch finished");

            stats.push(EpochStats {
                epoch,
                step_size,
                gradient_norm,
                theta: self.theta.to_vec(),
            });
        }

        Ok(FitReport {
            run_id,
            started_at,
            finished_at: Utc::now(),
            epochs: stats,
        })
    }

    /// `theta *= clip(exp(-step * grad))`, then L1-normalize
    fn exponentiated_gradient_ascent(&mut self, grad: &Array1<f64>, step_size: f64) {
        let bound = self.config.gradient_clip;
        self.theta
            .zip_mut_with(grad, |t, &g| *t *= clip((-step_size * g).exp(), -bound, bound));
        l1_normalize(&mut self.theta);
    }

    /// `theta += clip(-step * grad)` and the same for the offsets, both divided
    /// by the updated sum of `theta`.
    ///
    /// The division is skipped when that sum is not positive, leaving the
    /// unscaled step in place.
    fn projected_gradient_ascent(
        &mut self,
        grad: &Array1<f64>,
        unique_grad: &Array1<f64>,
        step_size: f64,
    ) {
        let bound = self.config.gradient_clip;
        self.theta
            .zip_mut_with(grad, |t, &g| *t += clip(-step_size * g, -bound, bound));
        let mut z = self.theta.sum();
        if !(z.is_finite() && z > 0.0) {
            warn!(z, "theta sum is not positive, skipping renormalization");
            z = 1.0;
        }
        self.theta.mapv_inplace(|t| t / z);

        if let Some(unique) = self.unique_cost.as_mut() {
            unique.zip_mut_with(unique_grad, |u, &g| {
                *u = (*u + clip(-step_size * g, -bound, bound)) / z;
            });
        }
        debug!(z, "projected gradient step");
    }

    /// Re-plan for `demo`'s goal and compare the induced action distribution
    /// with the demonstrated one; 1 means an exact match in direction.
    pub async fn eval_action_dist(&self, demo: &Demonstration<K>) -> Result<f64> {
        let model = self.model.read().await;
        let visitation = plan(&model, demo, &self.config)?;
        Ok(cosine_similarity(
            ArrayView1::from(visitation.actions.as_slice()),
            ArrayView1::from(demo.action_dist()),
        ))
    }
}

/// `reward(a) = -theta . F(a)`, lowered by the offset and capped at zero when
/// offsets are present
fn linear_cost(feature: &Feature, theta: &Array1<f64>, unique_cost: Option<&Array1<f64>>) -> Vec<f64> {
    let mut cost = feature.as_array().dot(theta).mapv(|c| -c);
    if let Some(unique) = unique_cost {
        cost.zip_mut_with(unique, |c, &u| *c = (*c - u).min(0.0));
    }
    cost.to_vec()
}

/// Solve the model for `demo`'s goal and propagate its initial distribution
fn plan<K: StateId>(
    model: &Model<K>,
    demo: &Demonstration<K>,
    config: &TrainerConfig,
) -> Result<Visitation> {
    let mut planner = ValueIterator::with_config(model, config.solver.clone());
    planner.set_alpha(config.alpha);
    planner.set_absorbing_state(demo.goal())?;
    planner.run_value_iteration();
    planner.update_policy();
    planner.state_action_visitation(demo.initial_state_dist())
}

/// Expert minus planner feature expectation, plus the action-level difference
/// when offsets are fit
fn feature_expectation_difference<K: StateId>(
    model: &Model<K>,
    feature: &Feature,
    demo: &Demonstration<K>,
    config: &TrainerConfig,
    with_unique: bool,
) -> Result<Gradient> {
    let visitation = plan(model, demo, config)?;
    let expert = feature.expectation(demo.action_dist())?;
    let learner = feature.expectation(&visitation.actions)?;

    let unique = with_unique.then(|| {
        Array1::from_iter(
            demo.action_dist()
                .iter()
                .zip(&visitation.actions)
                .map(|(e, m)| e - m),
        )
    });
    Ok(Gradient {
        theta: expert - learner,
        unique,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use maxent_rl_core::Edge;
    use ndarray::array;

    /// Two routes from 0 to 3: via 1 (feature 0) or via 2 (feature 1).
    fn fork() -> (Model<u8>, Feature) {
        let model = Model::new(
            [0, 1, 2, 3],
            [
                Edge::new(0, 1, -1.0),
                Edge::new(0, 2, -1.0),
                Edge::new(1, 3, -1.0),
                Edge::new(2, 3, -1.0),
            ],
        );
        let feature = Feature::from_rows(&[
            vec![1.0, 0.0],
            vec![0.0, 1.0],
            vec![0.0, 0.0],
            vec![0.0, 0.0],
        ])
        .unwrap();
        (model, feature)
    }

    fn expert_via_2(model: &Model<u8>) -> Demonstration<u8> {
        Demonstration::from_trajectories(model, 3, &[vec![0, 2, 3]]).unwrap()
    }

    fn seeded(fit_unique_cost: bool) -> TrainerConfig {
        TrainerConfig {
            seed: Some(11),
            fit_unique_cost,
            ..TrainerConfig::default()
        }
    }

    #[tokio::test]
    async fn test_new_writes_initial_rewards() {
        let (model, feature) = fork();
        let trainer = LinearRewardTrainer::new(model, feature, seeded(false)).unwrap();
        assert_eq!(trainer.theta(), &array![0.5, 0.5]);

        let model = trainer.model();
        let model = model.read().await;
        assert_eq!(model.reward(0), -0.5);
        assert_eq!(model.reward(1), -0.5);
        assert_eq!(model.reward(2), 0.0);
    }

    #[test]
    fn test_feature_shape_is_checked() {
        let (model, _) = fork();
        let feature = Feature::zeros(3, 2);
        assert!(matches!(
            LinearRewardTrainer::new(model, feature, TrainerConfig::default()),
            Err(RLError::DimensionMismatch { expected: 4, actual: 3 })
        ));
    }

    #[tokio::test]
    async fn test_compute_cost_with_offsets_is_capped() {
        let (model, feature) = fork();
        let mut trainer = LinearRewardTrainer::new(model, feature, seeded(true)).unwrap();
        trainer.set_theta(array![-1.0, 0.2]).await.unwrap();

        let cost = trainer.compute_cost();
        assert_eq!(cost[0], 0.0);
        assert_relative_eq!(cost[1], -0.2 - 0.025);
        assert_relative_eq!(cost[2], -0.025);
        assert!(cost.iter().all(|&c| c <= 0.0));
    }

    #[tokio::test]
    async fn test_fit_exponentiated_moves_toward_expert() {
        let (model, feature) = fork();
        let demo = expert_via_2(&model);
        let mut trainer = LinearRewardTrainer::new(model, feature, seeded(false)).unwrap();

        let report = trainer.fit(&[demo.clone()], 3, 2, 0.5).await.unwrap();

        let e = 0.5f64.exp();
        let expected = array![e / (e + 1.0 / e), (1.0 / e) / (e + 1.0 / e)];
        assert_relative_eq!(trainer.theta()[0], expected[0], epsilon = 1e-12);
        assert_relative_eq!(trainer.theta()[1], expected[1], epsilon = 1e-12);

        assert_eq!(report.epochs.len(), 3);
        assert_relative_eq!(report.epochs[0].gradient_norm, 2f64.sqrt(), epsilon = 1e-12);
        assert_eq!(report.epochs[1].gradient_norm, 0.0);
        assert_relative_eq!(report.epochs[1].step_size, 0.495, epsilon = 1e-12);

        let score = trainer.eval_action_dist(&demo).await.unwrap();
        assert_relative_eq!(score, 1.0, epsilon = 1e-12);

        let model = trainer.model();
        assert_relative_eq!(model.read().await.reward(0), -expected[0], epsilon = 1e-12);
    }

    #[tokio::test]
    async fn test_fit_projected_updates_offsets() {
        let (model, feature) = fork();
        let demo = expert_via_2(&model);
        let mut trainer = LinearRewardTrainer::new(model, feature, seeded(true)).unwrap();

        trainer.fit(&[demo.clone()], 1, 1, 0.5).await.unwrap();

        assert_relative_eq!(trainer.theta()[0], 1.0, epsilon = 1e-12);
        assert_relative_eq!(trainer.theta()[1], 0.0, epsilon = 1e-12);
        let unique = trainer.unique_cost().unwrap();
        for (got, want) in unique.iter().zip([0.525, -0.475, 0.525, -0.475]) {
            assert_relative_eq!(*got, want, epsilon = 1e-12);
        }

        let score = trainer.eval_action_dist(&demo).await.unwrap();
        assert_relative_eq!(score, 1.0, epsilon = 1e-12);
    }

    #[tokio::test]
    async fn test_projected_step_with_non_positive_sum() {
        let (model, feature) = fork();
        let mut trainer = LinearRewardTrainer::new(model, feature, seeded(true)).unwrap();
        trainer.set_theta(array![0.3, -0.1]).await.unwrap();

        // Step lands theta on [0.2, -0.2], which sums to zero.
        trainer.projected_gradient_ascent(&array![0.2, 0.2], &Array1::zeros(4), 0.5);

        assert_relative_eq!(trainer.theta()[0], 0.2, epsilon = 1e-12);
        assert_relative_eq!(trainer.theta()[1], -0.2, epsilon = 1e-12);
        assert!(trainer.unique_cost().unwrap().iter().all(|u| u.is_finite()));
        assert!(trainer.compute_cost().iter().all(|c| c.is_finite()));
    }

    #[tokio::test]
    async fn test_fit_rejects_bad_arguments() {
        let (model, feature) = fork();
        let demo = expert_via_2(&model);
        let mut trainer = LinearRewardTrainer::new(model, feature, seeded(false)).unwrap();

        assert!(matches!(
            trainer.fit(&[], 1, 1, 0.5).await,
            Err(RLError::InvalidConfig(_))
        ));
        assert!(matches!(
            trainer.fit(&[demo], 1, 0, 0.5).await,
            Err(RLError::InvalidConfig(_))
        ));
    }

    #[tokio::test]
    async fn test_fit_surfaces_unknown_goal() {
        let (model, feature) = fork();
        let other = Model::new([0u8, 1, 2, 3, 9], [Edge::new(0, 9, -1.0)]);
        let demo = Demonstration::from_trajectories(&other, 9, &[vec![0, 9]]).unwrap();
        let mut trainer = LinearRewardTrainer::new(model, feature, seeded(false)).unwrap();

        assert!(trainer.fit(&[demo], 1, 2, 0.5).await.is_err());
    }

    #[test]
    fn test_config_from_json() {
        let config = TrainerConfig::from_json_str(r#"{"alpha": 0.05, "solver": {"annealing_rounds": 5}}"#)
            .unwrap();
        assert_eq!(config.alpha, 0.05);
        assert_eq!(config.gradient_clip, 3.0);
        assert_eq!(config.solver.annealing_rounds, 5);

        assert!(TrainerConfig::from_json_str(r#"{"gradient_decay": 1.5}"#).is_err());
    }
}
