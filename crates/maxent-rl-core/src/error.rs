//! Error types for the planning core

use thiserror::Error;

/// Core error type for MDP and IRL operations
#[derive(Error, Debug)]
pub enum RLError {
    /// A state identity that the model does not know
    #[error("Unknown state: {0}")]
    UnknownState(String),

    /// An action index outside the model's dense index space
    #[error("Action index {index} out of range (model has {len} actions)")]
    ActionOutOfRange {
        /// Offending action index
        index: usize,
        /// Number of actions in the model
        len: usize,
    },

    /// Dimension mismatch
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Length the operation required
        expected: usize,
        /// Length it was given
        actual: usize,
    },

    /// Pop from a priority queue with no live entries
    #[error("Priority queue is empty")]
    EmptyQueue,

    /// A demonstration without a single usable sample
    #[error("Demonstration for goal {0} has no samples")]
    EmptyDemonstration(String),

    /// Rejected configuration or call arguments
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Data-access failure reported by a demonstration loader
    #[error("Loader error: {0}")]
    Loader(String),

    /// A planning worker panicked or was cancelled
    #[error("Worker task failed: {0}")]
    Worker(#[from] tokio::task::JoinError),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Other errors
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl RLError {
    /// Build an [`RLError::UnknownState`] from any debuggable identity
    pub fn unknown_state(id: &impl std::fmt::Debug) -> Self {
        Self::UnknownState(format!("{id:?}"))
    }
}

/// Result type alias for planning and training operations
pub type Result<T> = std::result::Result<T, RLError>;
