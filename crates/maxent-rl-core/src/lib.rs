//! Deterministic MDP planning core
//!
//! This crate provides the model and solver that maximum-entropy inverse
//! reinforcement learning is built on:
//! - a flat-arena deterministic [`Model`] with mutable per-action rewards
//! - a push-or-raise [`PriorityQueue`] over a fixed index domain
//! - [`ValueIterator`], an entropy-regularized value iteration solver using
//!   prioritized sweeping, with policy extraction, stochastic rollouts and
//!   forward visitation frequencies

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod action;
pub mod config;
pub mod error;
pub mod model;
pub mod policy;
pub mod priority_queue;
pub mod state;
pub mod trajectory;
pub mod value_iteration;
pub mod visitation;

// Re-export core types
pub use action::{Action, Edge, Transition};
pub use config::SolverConfig;
pub use error::{RLError, Result};
pub use model::Model;
pub use priority_queue::PriorityQueue;
pub use state::{State, StateId};
pub use trajectory::Rollout;
pub use value_iteration::ValueIterator;
pub use visitation::Visitation;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        Edge, Model, RLError, Result, Rollout, SolverConfig, StateId, ValueIterator, Visitation,
    };
}
