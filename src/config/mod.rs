//! Configuration Module
//!
//! Brain configurations are plain serde structs, validated once before any
//! genome is sized or decoded. An [`ExperimentConfig`] bundles one brain
//! configuration with the environment's I/O shape and the structural-state
//! seed, and is loaded from TOML.
//!
//! ## Loading Order
//!
//! 1. `EVOBRAIN_CONFIG` environment variable (path to TOML file)
//! 2. `evobrain.toml` in the current working directory
//! 3. Built-in defaults
//!
//! ## Example
//!
//! ```toml
//! seed = 42
//!
//! [io]
//! input_size = 2
//! output_size = 1
//!
//! [brain]
//! type = "ctrnn"
//! number_neurons = 4
//!
//! [brain.w_mask]
//! kind = "random"
//! density = 0.3
//! force_diagonal = true
//! ```

mod brain;
pub mod defaults;
mod experiment;
pub mod validation;

pub use brain::*;
pub use experiment::*;
