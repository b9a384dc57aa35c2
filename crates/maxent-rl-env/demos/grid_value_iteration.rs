//! Example: value iteration and a greedy rollout on a 3x3 grid

use anyhow::Context;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing_subscriber::EnvFilter;

use maxent_rl_core::ValueIterator;
use maxent_rl_env::GridWorld;

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let (width, height) = (3, 3);
    let grid = GridWorld::new(width, height);
    let goal = grid.state_id_of(width - 1, height - 1).context("goal outside grid")?;
    let start = grid.state_id_of(0, 0).context("start outside grid")?;

    let mut planner = ValueIterator::new(grid.model());
    planner.set_absorbing_state(&goal)?;
    planner.run_value_iteration();
    planner.update_policy();

    let rollout = planner.generate_trajectory(&start, &goal, 10, &mut StdRng::seed_from_u64(0))?;
    for id in &rollout.states {
        let (x, y) = grid.coordinate_of(*id).context("rollout left the grid")?;
        println!("{x} {y}");
    }
    println!("reached goal: {}", rollout.reached_goal);
    println!("value of start: {:.3}", planner.value_of(&start)?);

    Ok(())
}
