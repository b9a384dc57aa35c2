//! Maximum-entropy inverse reinforcement learning for MaxEnt-RL
//!
//! This crate fits linear reward functions to expert behavior:
//! - [`Feature`] matrices with one row per action
//! - [`Demonstration`]s aggregated from trajectories or a [`DemonstrationLoader`]
//! - [`LinearRewardTrainer`], which fans planning workers out per epoch and
//!   applies exponentiated or projected gradient steps

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod demonstration;
pub mod feature;
pub mod loader;
pub mod trainer;
pub mod utils;

// Re-export training components
pub use demonstration::{Demonstration, DemonstrationLoader, InitialStateCount, TransitionCount};
pub use feature::Feature;
pub use loader::{DemonstrationRecord, JsonDemonstrationLoader, RolloutDemonstrationLoader};
pub use trainer::{EpochStats, FitReport, LinearRewardTrainer, TrainerConfig};

// Re-export utilities
pub use utils::{angular_distance, cosine_similarity, ExponentialSchedule, Schedule};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        Demonstration, DemonstrationLoader, Feature, JsonDemonstrationLoader, LinearRewardTrainer,
        RolloutDemonstrationLoader, TrainerConfig,
    };
    pub use maxent_rl_core::prelude::*;
}
