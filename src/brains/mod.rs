//! Brains: decoded, steppable controllers, and the registry that builds them.
//!
//! The set of brain kinds is closed, so the registry is a static dispatch
//! table over [`BrainKind`] rather than a string-keyed lookup:
//!
//! ```text
//! BrainConfig ─┬─ free_parameter_usage ─→ individual_size ─→ optimizer
//!              ├─ generate_brain_state  ─→ BrainState (masks, shared read-only)
//!              └─ build(genome, ...)    ─→ AnyBrain ─→ step / reset
//! ```
//!
//! | Kind | Gates | Hidden components | Structural state |
//! |------|-------|-------------------|------------------|
//! | feed_forward | - | - | none |
//! | elman | 1 | 1 | none |
//! | gru | 3 | 1 | none |
//! | lstm | 4 | 2 | none |
//! | ctrnn | - | 1 | V/W/T masks |

pub mod ctrnn;
pub mod feed_forward;
pub mod layered;

use std::fmt;
use std::str::FromStr;

use ndarray::Array1;
use serde::{Deserialize, Serialize};

pub use ctrnn::Ctrnn;
pub use feed_forward::FeedForwardNetwork;
pub use layered::{CellKind, LayeredRecurrentNetwork};

use crate::accounting::ParameterUsage;
use crate::brain_state::BrainState;
use crate::config::{BrainConfig, IoShape};
use crate::error::BrainError;

/// Runtime interface shared by every decoded brain.
///
/// A brain is owned by exactly one evaluator; `step` mutates its hidden
/// state once per call and `reset` restores the initial state between
/// episodes.
pub trait Brain {
    fn input_size(&self) -> usize;

    fn output_size(&self) -> usize;

    /// Advance one timestep. Every action component lies in `[-1, 1]`.
    fn step(&mut self, observation: &[f64]) -> Result<Array1<f64>, BrainError>;

    fn reset(&mut self);
}

/// Reject observations of the wrong length before any arithmetic.
pub(crate) fn check_observation(observation: &[f64], expected: usize) -> Result<(), BrainError> {
    if observation.len() == expected {
        Ok(())
    } else {
        Err(BrainError::ObservationSizeMismatch {
            expected,
            actual: observation.len(),
        })
    }
}

// ============================================================================
// Brain Kinds
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BrainKind {
    FeedForward,
    Elman,
    Gru,
    Lstm,
    Ctrnn,
}

impl BrainKind {
    pub const ALL: [BrainKind; 5] = [
        BrainKind::FeedForward,
        BrainKind::Elman,
        BrainKind::Gru,
        BrainKind::Lstm,
        BrainKind::Ctrnn,
    ];

    pub fn name(self) -> &'static str {
        match self {
            BrainKind::FeedForward => "feed_forward",
            BrainKind::Elman => "elman",
            BrainKind::Gru => "gru",
            BrainKind::Lstm => "lstm",
            BrainKind::Ctrnn => "ctrnn",
        }
    }

    /// Recurrent cell for the layered kinds.
    pub fn cell(self) -> Option<CellKind> {
        match self {
            BrainKind::Elman => Some(CellKind::Elman),
            BrainKind::Gru => Some(CellKind::Gru),
            BrainKind::Lstm => Some(CellKind::Lstm),
            BrainKind::FeedForward | BrainKind::Ctrnn => None,
        }
    }

    /// Whether brains of this kind need masks in their [`BrainState`].
    pub fn needs_brain_state(self) -> bool {
        self == BrainKind::Ctrnn
    }
}

impl fmt::Display for BrainKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for BrainKind {
    type Err = BrainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "feed_forward" | "feedforward" | "ffnn" => Ok(BrainKind::FeedForward),
            "elman" | "elman_nn" | "rnn" => Ok(BrainKind::Elman),
            "gru" | "gru_nn" => Ok(BrainKind::Gru),
            "lstm" | "lstm_nn" => Ok(BrainKind::Lstm),
            "ctrnn" => Ok(BrainKind::Ctrnn),
            other => Err(BrainError::config(format!("unknown brain kind '{other}'"))),
        }
    }
}

// ============================================================================
// Registry
// ============================================================================

/// Named parameter breakdown for `config`, in decode order.
///
/// Needs no genome; for kinds with structural state, `state` must be the
/// one the brains will later be decoded against.
pub fn free_parameter_usage(
    config: &BrainConfig,
    io: IoShape,
    state: &BrainState,
) -> Result<ParameterUsage, BrainError> {
    match config {
        BrainConfig::FeedForward(c) => FeedForwardNetwork::free_parameter_usage(io, c),
        BrainConfig::Elman(c) => LayeredRecurrentNetwork::free_parameter_usage(CellKind::Elman, io, c),
        BrainConfig::Gru(c) => LayeredRecurrentNetwork::free_parameter_usage(CellKind::Gru, io, c),
        BrainConfig::Lstm(c) => LayeredRecurrentNetwork::free_parameter_usage(CellKind::Lstm, io, c),
        BrainConfig::Ctrnn(c) => Ctrnn::free_parameter_usage(io, c, state),
    }
}

/// Genome length required by `config`.
pub fn individual_size(config: &BrainConfig, io: IoShape, state: &BrainState) -> Result<usize, BrainError> {
    free_parameter_usage(config, io, state)?.individual_size()
}

/// Generate the structural state for `config`; empty for kinds that need none.
pub fn generate_brain_state(config: &BrainConfig, io: IoShape, seed: u64) -> Result<BrainState, BrainError> {
    config.validate()?;
    io.validate()?;
    match config {
        BrainConfig::Ctrnn(c) => Ok(ctrnn::wiring::generate_brain_state(c, io, seed)),
        _ => Ok(BrainState::empty()),
    }
}

/// Decode `genome` into the brain `config` describes.
pub fn build(
    genome: &[f64],
    config: &BrainConfig,
    io: IoShape,
    state: &BrainState,
) -> Result<AnyBrain, BrainError> {
    let brain = match config {
        BrainConfig::FeedForward(c) => AnyBrain::FeedForward(FeedForwardNetwork::new(genome, io, c)?),
        BrainConfig::Elman(c) => {
            AnyBrain::Layered(LayeredRecurrentNetwork::new(CellKind::Elman, genome, io, c)?)
        }
        BrainConfig::Gru(c) => AnyBrain::Layered(LayeredRecurrentNetwork::new(CellKind::Gru, genome, io, c)?),
        BrainConfig::Lstm(c) => {
            AnyBrain::Layered(LayeredRecurrentNetwork::new(CellKind::Lstm, genome, io, c)?)
        }
        BrainConfig::Ctrnn(c) => AnyBrain::Ctrnn(Ctrnn::new(genome, io, c, state)?),
    };
    Ok(brain)
}

/// Any decoded brain, dispatched statically.
#[derive(Debug, Clone)]
pub enum AnyBrain {
    FeedForward(FeedForwardNetwork),
    Layered(LayeredRecurrentNetwork),
    Ctrnn(Ctrnn),
}

impl AnyBrain {
    pub fn kind(&self) -> BrainKind {
        match self {
            AnyBrain::FeedForward(_) => BrainKind::FeedForward,
            AnyBrain::Layered(b) => match b.cell() {
                CellKind::Elman => BrainKind::Elman,
                CellKind::Gru => BrainKind::Gru,
                CellKind::Lstm => BrainKind::Lstm,
            },
            AnyBrain::Ctrnn(_) => BrainKind::Ctrnn,
        }
    }

    fn as_brain(&self) -> &dyn Brain {
        match self {
            AnyBrain::FeedForward(b) => b,
            AnyBrain::Layered(b) => b,
            AnyBrain::Ctrnn(b) => b,
        }
    }
}

impl Brain for AnyBrain {
    fn input_size(&self) -> usize {
        self.as_brain().input_size()
    }

    fn output_size(&self) -> usize {
        self.as_brain().output_size()
    }

    fn step(&mut self, observation: &[f64]) -> Result<Array1<f64>, BrainError> {
        match self {
            AnyBrain::FeedForward(b) => b.step(observation),
            AnyBrain::Layered(b) => b.step(observation),
            AnyBrain::Ctrnn(b) => b.step(observation),
        }
    }

    fn reset(&mut self) {
        match self {
            AnyBrain::FeedForward(b) => b.reset(),
            AnyBrain::Layered(b) => b.reset(),
            AnyBrain::Ctrnn(b) => b.reset(),
        }
    }
}
