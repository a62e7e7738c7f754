//! evobrain: genome-to-network decoding and recurrent inference for
//! neuroevolution controllers.
//!
//! An evolutionary optimizer treats a brain as a black box over a flat
//! genome. This crate sizes that genome from a configuration, decodes it into
//! a steppable controller, and runs the controller one timestep at a time.
//!
//! ## Architecture
//!
//! - **Activation / Genome**: elementwise nonlinearities and the matrix
//!   decoder every brain reads through
//! - **Accounting**: named parameter breakdowns whose total is the genome length
//! - **Brain State**: connectivity masks generated once per configuration and persisted
//! - **Brains**: feed-forward, Elman, GRU, LSTM and CTRNN behind one registry
//! - **Episode**: the environment seam and the episode loop
//!
//! ```text
//! ExperimentConfig → generate_brain_state → individual_size → optimizer
//!                                             genome ──→ build → step / reset
//! ```

pub mod accounting;
pub mod activation;
pub mod brain_state;
pub mod brains;
pub mod config;
pub mod episode;
pub mod error;
pub mod genome;

pub use accounting::ParameterUsage;
pub use activation::Activation;
pub use brain_state::{BrainState, ConnectionMask};
pub use brains::{
    build, free_parameter_usage, generate_brain_state, individual_size, AnyBrain, Brain, BrainKind,
    CellKind, Ctrnn, FeedForwardNetwork, LayeredRecurrentNetwork,
};
pub use config::{BrainConfig, ExperimentConfig, IoShape};
pub use episode::{run_episode, Environment, Transition};
pub use error::{BrainError, StateError};
pub use genome::{random_genome, GenomeReader};
