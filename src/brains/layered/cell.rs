//! Recurrent cell families and their per-layer step functions.
//!
//! Each cell is characterized by two numbers: how many gates (independent
//! weighted sums) it computes per step, and how many hidden-state components
//! it carries. For every gate `k` the pre-activation is
//!
//! ```text
//! a_k = W_ih[k] * x + W_hh[k] * h + b[k]
//! ```
//!
//! - **Elman**: `h' = tanh(a_0)`
//! - **GRU**: `r = sigmoid(a_0)`, `z = sigmoid(a_1)`,
//!   `n = tanh(W_ih[2] x + r * (W_hh[2] h) + b[2])`, `h' = (1 - z) * n + z * h`
//! - **LSTM** (gates i, f, g, o): `c' = f * c + i * g`, `h' = o * tanh(c')`

use std::fmt;

use ndarray::{Array1, Array2, Array3, Axis, Zip};
use serde::{Deserialize, Serialize};

use crate::activation::sigmoid;
use crate::error::BrainError;

/// Recurrent cell family, fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CellKind {
    Elman,
    Gru,
    Lstm,
}

impl CellKind {
    pub const ALL: [CellKind; 3] = [CellKind::Elman, CellKind::Gru, CellKind::Lstm];

    /// Independent weighted sums per step.
    pub const fn gates(self) -> usize {
        match self {
            CellKind::Elman => 1,
            CellKind::Gru => 3,
            CellKind::Lstm => 4,
        }
    }

    /// Hidden-state vectors per layer (LSTM carries hidden + cell).
    pub const fn hidden_components(self) -> usize {
        match self {
            CellKind::Elman | CellKind::Gru => 1,
            CellKind::Lstm => 2,
        }
    }

    /// Reverse lookup from a gate / hidden-component pair to its cell.
    ///
    /// Construction always goes through a `CellKind` value, so unsupported
    /// topologies cannot reach the layered engine; this only maps counts read
    /// from elsewhere (tooling, saved shapes) back to a cell.
    pub fn from_topology(gates: usize, hidden_components: usize) -> Result<Self, BrainError> {
        Self::ALL
            .into_iter()
            .find(|c| c.gates() == gates && c.hidden_components() == hidden_components)
            .ok_or(BrainError::UnsupportedCellTopology { gates, hidden_components })
    }

    /// Advance one layer by one timestep.
    ///
    /// `state` has shape `(hidden_components, hidden)`; row 0 is the hidden
    /// vector passed on to the next layer, which is also returned.
    pub(crate) fn layer_step(self, layer: &RecurrentLayer, x: &Array1<f64>, state: &mut Array2<f64>) -> Array1<f64> {
        match self {
            CellKind::Elman => elman_step(layer, x, state),
            CellKind::Gru => gru_step(layer, x, state),
            CellKind::Lstm => lstm_step(layer, x, state),
        }
    }
}

impl fmt::Display for CellKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CellKind::Elman => "elman",
            CellKind::Gru => "gru",
            CellKind::Lstm => "lstm",
        })
    }
}

/// Decoded weights of one recurrent layer.
#[derive(Debug, Clone, PartialEq)]
pub struct RecurrentLayer {
    /// `(gates, hidden, input)`
    pub w_ih: Array3<f64>,
    /// `(gates, hidden, hidden)`; diagonal per gate when recurrence is
    /// restricted to self-connections.
    pub w_hh: Array3<f64>,
    /// `(gates, hidden)`; zeros when bias is disabled.
    pub bias: Array2<f64>,
}

impl RecurrentLayer {
    pub fn hidden_size(&self) -> usize {
        self.w_ih.shape()[1]
    }

    pub fn input_size(&self) -> usize {
        self.w_ih.shape()[2]
    }

    fn input_term(&self, gate: usize, x: &Array1<f64>) -> Array1<f64> {
        self.w_ih.index_axis(Axis(0), gate).dot(x)
    }

    fn recurrent_term(&self, gate: usize, h: &Array1<f64>) -> Array1<f64> {
        self.w_hh.index_axis(Axis(0), gate).dot(h)
    }

    /// `W_ih[g] x + W_hh[g] h + b[g]`
    fn pre_activation(&self, gate: usize, x: &Array1<f64>, h: &Array1<f64>) -> Array1<f64> {
        let mut a = self.input_term(gate, x);
        a += &self.recurrent_term(gate, h);
        a += &self.bias.row(gate);
        a
    }
}

fn elman_step(layer: &RecurrentLayer, x: &Array1<f64>, state: &mut Array2<f64>) -> Array1<f64> {
    let h = state.row(0).to_owned();
    let h_new = layer.pre_activation(0, x, &h).mapv(f64::tanh);
    state.row_mut(0).assign(&h_new);
    h_new
}

fn gru_step(layer: &RecurrentLayer, x: &Array1<f64>, state: &mut Array2<f64>) -> Array1<f64> {
    let h = state.row(0).to_owned();
    let r = layer.pre_activation(0, x, &h).mapv(sigmoid);
    let z = layer.pre_activation(1, x, &h).mapv(sigmoid);

    let mut n = layer.input_term(2, x);
    n += &(&r * &layer.recurrent_term(2, &h));
    n += &layer.bias.row(2);
    n.mapv_inplace(f64::tanh);

    let mut h_new = Array1::zeros(h.len());
    Zip::from(&mut h_new)
        .and(&z)
        .and(&n)
        .and(&h)
        .for_each(|out, &z, &n, &h| *out = (1.0 - z) * n + z * h);
    state.row_mut(0).assign(&h_new);
    h_new
}

fn lstm_step(layer: &RecurrentLayer, x: &Array1<f64>, state: &mut Array2<f64>) -> Array1<f64> {
    let h = state.row(0).to_owned();
    let c = state.row(1).to_owned();

    let i = layer.pre_activation(0, x, &h).mapv(sigmoid);
    let f = layer.pre_activation(1, x, &h).mapv(sigmoid);
    let g = layer.pre_activation(2, x, &h).mapv(f64::tanh);
    let o = layer.pre_activation(3, x, &h).mapv(sigmoid);

    let c_new = &f * &c + &i * &g;
    let h_new = &o * &c_new.mapv(f64::tanh);

    state.row_mut(0).assign(&h_new);
    state.row_mut(1).assign(&c_new);
    h_new
}
