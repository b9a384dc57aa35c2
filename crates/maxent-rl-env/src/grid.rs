//! 4-connected grid world

use ndarray::{Array1, Array2};
use rand::Rng;
use rand_distr::{Dirichlet, Distribution, Uniform};
use tracing::debug;

use maxent_rl_agent::Feature;
use maxent_rl_core::{Edge, Model, RLError, Result};

/// Cost of a single move
const MOVE_COST: f64 = 1.0;

/// Moves tried from every cell, in action order
const MOVES: [(isize, isize); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];

/// Grid of `width x height` cells where every in-bounds move costs one.
///
/// The cell `(x, y)` has state id `x * height + y`.
#[derive(Debug)]
pub struct GridWorld {
    width: usize,
    height: usize,
    model: Model<usize>,
}

impl GridWorld {
    /// Build the grid and its model
    #[must_use]
    pub fn new(width: usize, height: usize) -> Self {
        let mut state_ids = Vec::with_capacity(width * height);
        let mut edges = Vec::with_capacity(width * height * MOVES.len());

        for x in 0..width {
            for y in 0..height {
                let from = x * height + y;
                state_ids.push(from);
                for (dx, dy) in MOVES {
                    let (Some(to_x), Some(to_y)) =
                        (x.checked_add_signed(dx), y.checked_add_signed(dy))
                    else {
                        continue;
                    };
                    if to_x < width && to_y < height {
                        edges.push(Edge::new(from, to_x * height + to_y, -MOVE_COST));
                    }
                }
            }
        }

        let model = Model::new(state_ids, edges);
        debug!(width, height, actions = model.num_actions(), "grid world built");
        Self { width, height, model }
    }

    /// Number of columns
    #[must_use]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Number of rows
    #[must_use]
    pub fn height(&self) -> usize {
        self.height
    }

    /// State id of `(x, y)`, if inside the grid
    #[must_use]
    pub fn state_id_of(&self, x: usize, y: usize) -> Option<usize> {
        (x < self.width && y < self.height).then(|| x * self.height + y)
    }

    /// Cell of a state id, if inside the grid
    #[must_use]
    pub fn coordinate_of(&self, id: usize) -> Option<(usize, usize)> {
        (id < self.width * self.height).then(|| (id / self.height, id % self.height))
    }

    /// The grid's model
    #[must_use]
    pub fn model(&self) -> &Model<usize> {
        &self.model
    }

    /// Mutable access to the grid's model, e.g. to install expert rewards
    pub fn model_mut(&mut self) -> &mut Model<usize> {
        &mut self.model
    }

    /// Take ownership of the model
    #[must_use]
    pub fn into_model(self) -> Model<usize> {
        self.model
    }

    /// Features drawn uniformly from `[0, 1)` for every action of this grid
    pub fn random_feature<R: Rng + ?Sized>(&self, dims: usize, rng: &mut R) -> Feature {
        random_feature(self.model.num_actions(), dims, rng)
    }
}

/// Feature matrix of `num_actions x dims` entries drawn uniformly from `[0, 1)`
pub fn random_feature<R: Rng + ?Sized>(num_actions: usize, dims: usize, rng: &mut R) -> Feature {
    let unit = Uniform::new(0.0, 1.0);
    Feature::from_array(Array2::from_shape_fn((num_actions, dims), |_| unit.sample(&mut *rng)))
}

/// Non-negative weights summing to one, drawn from a flat Dirichlet
pub fn random_weights<R: Rng + ?Sized>(dims: usize, rng: &mut R) -> Result<Array1<f64>> {
    match dims {
        0 => Err(RLError::InvalidConfig("weights need at least one dimension".into())),
        1 => Ok(Array1::ones(1)),
        _ => {
            let dirichlet = Dirichlet::new_with_size(1.0, dims)
                .map_err(|e| RLError::InvalidConfig(e.to_string()))?;
            Ok(Array1::from(dirichlet.sample(rng)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_grid_shape() {
        let grid = GridWorld::new(3, 2);
        assert_eq!(grid.model().num_states(), 6);
        // 2 rows x 2 pairs x 2 directions, plus 3 columns x 1 pair x 2 directions
        assert_eq!(grid.model().num_actions(), 14);
        assert_eq!(grid.model().dropped_edges(), 0);
    }

    #[test]
    fn test_coordinates() {
        let grid = GridWorld::new(4, 3);
        assert_eq!(grid.state_id_of(2, 1), Some(7));
        assert_eq!(grid.coordinate_of(7), Some((2, 1)));
        assert_eq!(grid.state_id_of(4, 0), None);
        assert_eq!(grid.coordinate_of(12), None);
    }

    #[test]
    fn test_move_order() {
        let grid = GridWorld::new(3, 3);
        let corner = grid.model().state_of(&0).unwrap();
        let targets: Vec<_> = corner
            .actions()
            .iter()
            .map(|&a| grid.model().id_of(grid.model().next_state(a)).copied())
            .collect();
        assert_eq!(targets, vec![Some(3), Some(1)]);
        assert!(grid.model().actions().iter().all(|a| grid.model().reward(a.index()) == -1.0));
    }

    #[test]
    fn test_random_feature() {
        let mut rng = StdRng::seed_from_u64(5);
        let grid = GridWorld::new(2, 2);
        let feature = grid.random_feature(3, &mut rng);
        assert_eq!(feature.num_actions(), grid.model().num_actions());
        assert_eq!(feature.dims(), 3);
        assert!(feature.as_array().iter().all(|&v| (0.0..1.0).contains(&v)));
    }

    #[test]
    fn test_random_weights() {
        let mut rng = StdRng::seed_from_u64(5);
        let weights = random_weights(5, &mut rng).unwrap();
        assert_eq!(weights.len(), 5);
        assert_relative_eq!(weights.sum(), 1.0, epsilon = 1e-9);
        assert!(weights.iter().all(|&w| w >= 0.0));

        assert_eq!(random_weights(1, &mut rng).unwrap(), Array1::<f64>::ones(1));
        assert!(random_weights(0, &mut rng).is_err());
    }
}
