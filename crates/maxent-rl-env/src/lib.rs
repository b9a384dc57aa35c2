//! Environments for MaxEnt-RL
//!
//! Currently a single 4-connected [`GridWorld`] with unit move cost, plus
//! generators for random action features and reward weights.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod grid;

pub use grid::{random_feature, random_weights, GridWorld};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{random_feature, random_weights, GridWorld};
    pub use maxent_rl_agent::prelude::*;
}
