//! Error taxonomy for decoding, accounting and stepping brains.
//!
//! Every variant of [`BrainError`] is raised eagerly: at configuration
//! validation, at brain construction, or at the entry of `step()` before any
//! arithmetic happens. None of them are transient and nothing here is retried.

use thiserror::Error;

/// Errors raised while sizing, decoding or stepping a brain.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum BrainError {
    /// Invalid or missing structural parameter (layer size, density, name).
    #[error("configuration error: {0}")]
    Configuration(String),

    /// CTRNN differential-equation name with no known dynamics.
    #[error("unsupported differential equation: {0}")]
    UnsupportedDifferentialEquation(String),

    /// Genome length differs from the configuration's individual size.
    #[error("genome size mismatch: expected {expected} parameters, got {actual}")]
    GenomeSizeMismatch { expected: usize, actual: usize },

    /// Decode cursor would run past the end of the genome.
    #[error("genome too short: reading {requested} values at cursor {cursor} exceeds length {available}")]
    GenomeTooShort {
        cursor: usize,
        requested: usize,
        available: usize,
    },

    /// Gate / hidden-component combination with no step function.
    #[error("unsupported cell topology: {gates} gates with {hidden_components} hidden components")]
    UnsupportedCellTopology { gates: usize, hidden_components: usize },

    /// Observation passed to `step()` has the wrong length.
    #[error("observation size mismatch: expected {expected} inputs, got {actual}")]
    ObservationSizeMismatch { expected: usize, actual: usize },

    /// A brain needs a structural-state entry that was not supplied.
    #[error("missing structural state entry: {0}")]
    MissingStructuralState(String),
}

impl BrainError {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }
}

/// Errors raised while persisting or reloading a [`crate::BrainState`].
#[derive(Debug, Error)]
pub enum StateError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Schema version mismatch: file has v{0}, expected v{1}")]
    SchemaMismatch(u32, u32),

    #[error("Digest mismatch: stored {expected}, computed {actual}")]
    DigestMismatch { expected: String, actual: String },

    #[error("Invalid mask: {0}")]
    InvalidMask(String),
}
