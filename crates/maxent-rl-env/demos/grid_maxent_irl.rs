//! Example: recovering random reward weights on a 20x20 grid with MaxEnt IRL
//!
//! Pass a path to a JSON `TrainerConfig` as the first argument to override
//! the defaults.

use anyhow::Context;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::info;
use tracing_subscriber::EnvFilter;

use maxent_rl_agent::{
    angular_distance, cosine_similarity, Demonstration, LinearRewardTrainer,
    RolloutDemonstrationLoader, TrainerConfig,
};
use maxent_rl_core::{Model, ValueIterator};
use maxent_rl_env::{random_weights, GridWorld};

const WIDTH: usize = 20;
const HEIGHT: usize = 20;
const FEATURES: usize = 5;
const EPOCHS: usize = 100;
const SAMPLES: usize = 100;
const PARALLELISM: usize = 4;
const STEP_SIZE: f64 = 0.5;
const MAX_STEPS: usize = 1000;

/// Expert demonstrations for `goal` from every start, sampled at temperature `alpha`
async fn demonstrate(
    model: &Model<usize>,
    grid: &GridWorld,
    goal: (usize, usize),
    starts: &[(usize, usize)],
    alpha: f64,
    rng: StdRng,
) -> anyhow::Result<Demonstration<usize>> {
    let goal = grid.state_id_of(goal.0, goal.1).context("goal outside grid")?;
    let mut planner = ValueIterator::new(model);
    planner.set_alpha(alpha);
    planner.set_absorbing_state(&goal)?;
    planner.run_value_iteration();
    planner.update_policy();

    let mut loader = RolloutDemonstrationLoader::with_rng(&planner, MAX_STEPS, rng);
    for &(x, y) in starts {
        let start = grid.state_id_of(x, y).context("start outside grid")?;
        loader.set_initial_state(goal, start, SAMPLES);
    }
    Ok(Demonstration::from_loader(model, goal, &loader).await?)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => TrainerConfig::from_json_file(&path)
            .await
            .with_context(|| format!("loading trainer config from {path}"))?,
        None => TrainerConfig::default(),
    };
    let mut rng = config
        .seed
        .map_or_else(StdRng::from_entropy, StdRng::seed_from_u64);

    let grid = GridWorld::new(WIDTH, HEIGHT);
    let feature = grid.random_feature(FEATURES, &mut rng);
    let truth = random_weights(FEATURES, &mut rng)?;

    let mut expert = LinearRewardTrainer::new(
        GridWorld::new(WIDTH, HEIGHT).into_model(),
        feature.clone(),
        config.clone(),
    )?;
    expert.set_theta(truth.clone()).await?;
    info!(theta = ?truth.to_vec(), "expert weights installed");

    let goals = [
        (WIDTH / 2, HEIGHT / 2),
        (WIDTH / 2, 0),
        (0, HEIGHT / 2),
        (WIDTH / 2, HEIGHT - 1),
        (WIDTH - 1, HEIGHT / 2),
    ];
    let starts = [(0, 0), (0, HEIGHT - 1), (WIDTH - 1, HEIGHT - 1), (WIDTH - 1, 0)];

    for alpha in [0.01, 0.02, 0.04] {
        let demos = {
            let model = expert.model();
            let model = model.read().await;
            let mut demos = Vec::with_capacity(goals.len());
            for &goal in &goals {
                let seed = StdRng::from_rng(&mut rng)?;
                demos.push(demonstrate(&model, &grid, goal, &starts, alpha, seed).await?);
            }
            demos
        };

        let mut trainer = LinearRewardTrainer::new(
            GridWorld::new(WIDTH, HEIGHT).into_model(),
            feature.clone(),
            config.clone(),
        )?;
        let report = trainer.fit(&demos, EPOCHS, PARALLELISM, STEP_SIZE).await?;

        let score = cosine_similarity(truth.view(), trainer.theta().view());
        println!("expert temperature {alpha}");
        println!(
            "  theta: log10(1 - cos) = {:.2}, angle = {:.4} rad",
            (1.0 - score).log10(),
            angular_distance(truth.view(), trainer.theta().view())
        );
        println!("  learned theta: {:?}", trainer.theta().to_vec());
        println!("  true theta:    {:?}", truth.to_vec());

        let mut fits = Vec::with_capacity(demos.len());
        for demo in &demos {
            fits.push((1.0 - trainer.eval_action_dist(demo).await?).log10());
        }
        println!("  action distribution log10(1 - cos): {fits:.2?}");
        println!(
            "  run {} took {} ms",
            report.run_id,
            (report.finished_at - report.started_at).num_milliseconds()
        );
    }

    Ok(())
}
