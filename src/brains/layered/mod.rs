//! Layered gated-recurrent engine (Elman, GRU, LSTM).
//!
//! One decode skeleton serves every cell family. Per layer `l`, in order:
//!
//! 1. input-to-hidden weights `(gates, hidden[l], input[l])`
//! 2. hidden-to-hidden weights `(gates, hidden[l], hidden[l])`, or one
//!    diagonal of length `hidden[l]` per gate when recurrence is diagonal-only
//! 3. gate biases `(gates, hidden[l])` if bias is enabled
//!
//! followed by the output head `(output_size, hidden[last])`. Actions are
//! `tanh(W_out * h_last)`.

mod cell;

pub use cell::{CellKind, RecurrentLayer};

use ndarray::{Array1, Array2, ArrayView2};
use tracing::debug;

use super::{check_observation, Brain};
use crate::accounting::ParameterUsage;
use crate::config::{IoShape, LayeredConfig};
use crate::error::BrainError;
use crate::genome::{check_size, checked_count, GenomeReader};

/// Multi-layer recurrent controller.
#[derive(Debug, Clone)]
pub struct LayeredRecurrentNetwork {
    cell: CellKind,
    io: IoShape,
    layers: Vec<RecurrentLayer>,
    /// `(output_size, hidden[last])`
    w_out: Array2<f64>,
    /// Per layer, `(hidden_components, hidden[l])`.
    state: Vec<Array2<f64>>,
}

impl LayeredRecurrentNetwork {
    /// Parameter breakdown, grouped per layer, in decode order.
    pub fn free_parameter_usage(
        cell: CellKind,
        io: IoShape,
        config: &LayeredConfig,
    ) -> Result<ParameterUsage, BrainError> {
        config.validate()?;
        io.validate()?;
        let gates = cell.gates();

        let mut usage = ParameterUsage::group();
        let mut input_size = io.input_size;
        for (l, &hidden) in config.hidden_layers.iter().enumerate() {
            let recurrent = if config.diagonal_hidden_to_hidden {
                checked_count(&[gates, hidden])?
            } else {
                checked_count(&[gates, hidden, hidden])?
            };
            let mut layer = ParameterUsage::group()
                .with("input_to_hidden", checked_count(&[gates, hidden, input_size])?)
                .with("hidden_to_hidden", recurrent);
            if config.use_bias {
                layer = layer.with("bias", checked_count(&[gates, hidden])?);
            }
            usage = usage.with(format!("layer_{l}"), layer);
            input_size = hidden;
        }
        Ok(usage.with("output", checked_count(&[io.output_size, input_size])?))
    }

    pub fn individual_size(cell: CellKind, io: IoShape, config: &LayeredConfig) -> Result<usize, BrainError> {
        Self::free_parameter_usage(cell, io, config)?.individual_size()
    }

    /// Decode `genome`. Its length must equal `individual_size` exactly.
    pub fn new(cell: CellKind, genome: &[f64], io: IoShape, config: &LayeredConfig) -> Result<Self, BrainError> {
        let expected = Self::individual_size(cell, io, config)?;
        check_size(genome, expected)?;

        let gates = cell.gates();
        let mut reader = GenomeReader::new(genome);
        let mut layers = Vec::with_capacity(config.hidden_layers.len());
        let mut input_size = io.input_size;

        for &hidden in &config.hidden_layers {
            let w_ih = reader.read_gates(gates, hidden, input_size)?;
            let w_hh = if config.diagonal_hidden_to_hidden {
                reader.read_gate_diagonals(gates, hidden)?
            } else {
                reader.read_gates(gates, hidden, hidden)?
            };
            let bias = if config.use_bias {
                reader.read_block(gates, hidden)?
            } else {
                Array2::zeros((gates, hidden))
            };
            layers.push(RecurrentLayer { w_ih, w_hh, bias });
            input_size = hidden;
        }
        let w_out = reader.read_block(io.output_size, input_size)?;
        reader.finish()?;

        let state = config
            .hidden_layers
            .iter()
            .map(|&h| Array2::zeros((cell.hidden_components(), h)))
            .collect();

        debug!(cell = %cell, layers = ?config.hidden_layers, params = expected, "Decoded layered recurrent brain");

        Ok(Self {
            cell,
            io,
            layers,
            w_out,
            state,
        })
    }

    pub fn cell(&self) -> CellKind {
        self.cell
    }

    pub fn layers(&self) -> &[RecurrentLayer] {
        &self.layers
    }

    pub fn output_weights(&self) -> &Array2<f64> {
        &self.w_out
    }

    /// Hidden state of layer `l`, shape `(hidden_components, hidden[l])`.
    pub fn hidden_state(&self, l: usize) -> Option<ArrayView2<'_, f64>> {
        self.state.get(l).map(Array2::view)
    }
}

impl Brain for LayeredRecurrentNetwork {
    fn input_size(&self) -> usize {
        self.io.input_size
    }

    fn output_size(&self) -> usize {
        self.io.output_size
    }

    fn step(&mut self, observation: &[f64]) -> Result<Array1<f64>, BrainError> {
        check_observation(observation, self.io.input_size)?;

        let mut x = Array1::from(observation.to_vec());
        for (layer, state) in self.layers.iter().zip(self.state.iter_mut()) {
            x = self.cell.layer_step(layer, &x, state);
        }
        Ok(self.w_out.dot(&x).mapv(f64::tanh))
    }

    fn reset(&mut self) {
        for s in &mut self.state {
            s.fill(0.0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lstm_config() -> LayeredConfig {
        LayeredConfig {
            hidden_layers: vec![3],
            use_bias: false,
            diagonal_hidden_to_hidden: false,
        }
    }

    fn counting(n: usize) -> Vec<f64> {
        (0..n).map(|i| i as f64).collect()
    }

    #[test]
    fn test_lstm_individual_size() {
        let io = IoShape::new(2, 1);
        let usage = LayeredRecurrentNetwork::free_parameter_usage(CellKind::Lstm, io, &lstm_config()).unwrap();
        assert_eq!(usage.lookup("layer_0.input_to_hidden"), Some(&ParameterUsage::Count(24)));
        assert_eq!(usage.lookup("layer_0.hidden_to_hidden"), Some(&ParameterUsage::Count(36)));
        assert!(usage.lookup("layer_0.bias").is_none());
        assert_eq!(usage.lookup("output"), Some(&ParameterUsage::Count(3)));
        assert_eq!(usage.total(), 63);
    }

    #[test]
    fn test_diagonal_recurrence_cardinality() {
        let io = IoShape::new(2, 1);
        for cell in CellKind::ALL {
            let full = LayeredConfig {
                hidden_layers: vec![5],
                use_bias: true,
                diagonal_hidden_to_hidden: false,
            };
            let diag = LayeredConfig {
                diagonal_hidden_to_hidden: true,
                ..full.clone()
            };
            let g = cell.gates();
            let uf = LayeredRecurrentNetwork::free_parameter_usage(cell, io, &full).unwrap();
            let ud = LayeredRecurrentNetwork::free_parameter_usage(cell, io, &diag).unwrap();
            assert_eq!(uf.lookup("layer_0.hidden_to_hidden"), Some(&ParameterUsage::Count(g * 25)));
            assert_eq!(ud.lookup("layer_0.hidden_to_hidden"), Some(&ParameterUsage::Count(g * 5)));
            assert_eq!(uf.total() - ud.total(), g * 25 - g * 5);
        }
    }

    #[test]
    fn test_decode_order_matches_accounting() {
        // Genes 0..n: each tensor must start where accounting says it does.
        let io = IoShape::new(2, 2);
        let config = LayeredConfig {
            hidden_layers: vec![3, 2],
            use_bias: true,
            diagonal_hidden_to_hidden: false,
        };
        let size = LayeredRecurrentNetwork::individual_size(CellKind::Gru, io, &config).unwrap();
        let net = LayeredRecurrentNetwork::new(CellKind::Gru, &counting(size), io, &config).unwrap();

        let l0 = &net.layers()[0];
        assert_eq!(l0.w_ih.shape(), &[3, 3, 2]);
        assert_eq!(l0.w_ih[[0, 0, 0]], 0.0);
        assert_eq!(l0.w_ih[[2, 2, 1]], 17.0);
        assert_eq!(l0.w_hh[[0, 0, 0]], 18.0);
        assert_eq!(l0.w_hh[[2, 2, 2]], 44.0);
        assert_eq!(l0.bias[[0, 0]], 45.0);
        assert_eq!(l0.bias[[2, 2]], 53.0);

        let l1 = &net.layers()[1];
        assert_eq!(l1.w_ih.shape(), &[3, 2, 3]);
        assert_eq!(l1.w_ih[[0, 0, 0]], 54.0);
        assert_eq!(l1.bias[[2, 1]], (size - 2 * 2 - 1) as f64);

        assert_eq!(net.output_weights().shape(), &[2, 2]);
        assert_eq!(net.output_weights()[[1, 1]], (size - 1) as f64);
    }

    #[test]
    fn test_diagonal_decoding_expands() {
        let io = IoShape::new(1, 1);
        let config = LayeredConfig {
            hidden_layers: vec![2],
            use_bias: false,
            diagonal_hidden_to_hidden: true,
        };
        // w_ih: 1*2*1 = 2, w_hh diag: 1*2 = 2, out: 2
        let genome = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let net = LayeredRecurrentNetwork::new(CellKind::Elman, &genome, io, &config).unwrap();
        let w_hh = &net.layers()[0].w_hh;
        assert_eq!(w_hh[[0, 0, 0]], 3.0);
        assert_eq!(w_hh[[0, 1, 1]], 4.0);
        assert_eq!(w_hh[[0, 0, 1]], 0.0);
        assert_eq!(w_hh[[0, 1, 0]], 0.0);
    }

    #[test]
    fn test_diagonal_neurons_do_not_see_layer_mates() {
        let io = IoShape::new(1, 2);
        let config = LayeredConfig {
            hidden_layers: vec![2],
            use_bias: false,
            diagonal_hidden_to_hidden: true,
        };
        // neuron 0 driven by input, neuron 1 disconnected from input.
        let genome = vec![1.0, 0.0, 0.5, 0.5, 1.0, 0.0, 0.0, 1.0];
        let mut net = LayeredRecurrentNetwork::new(CellKind::Elman, &genome, io, &config).unwrap();
        for _ in 0..5 {
            let y = net.step(&[1.0]).unwrap();
            assert_eq!(y[1], 0.0);
        }
        assert_eq!(net.hidden_state(0).unwrap()[[0, 1]], 0.0);
        assert!(net.hidden_state(0).unwrap()[[0, 0]] > 0.0);
    }

    #[test]
    fn test_huge_layer_is_a_configuration_error() {
        let io = IoShape::new(2, 1);
        let config = LayeredConfig {
            hidden_layers: vec![1 << 33],
            ..lstm_config()
        };
        assert!(matches!(
            LayeredRecurrentNetwork::individual_size(CellKind::Lstm, io, &config),
            Err(BrainError::Configuration(_))
        ));
        assert!(matches!(
            LayeredRecurrentNetwork::new(CellKind::Lstm, &[0.0; 4], io, &config),
            Err(BrainError::Configuration(_))
        ));

        // Every tensor fits but their sum does not.
        let wide = LayeredConfig {
            hidden_layers: vec![1 << 61],
            use_bias: false,
            diagonal_hidden_to_hidden: true,
        };
        assert!(LayeredRecurrentNetwork::free_parameter_usage(CellKind::Lstm, IoShape::new(1, 1), &wide).is_ok());
        assert!(matches!(
            LayeredRecurrentNetwork::individual_size(CellKind::Lstm, IoShape::new(1, 1), &wide),
            Err(BrainError::Configuration(_))
        ));
    }

    #[test]
    fn test_genome_size_mismatch_before_decoding() {
        let io = IoShape::new(2, 1);
        let err = LayeredRecurrentNetwork::new(CellKind::Lstm, &[0.0; 62], io, &lstm_config()).unwrap_err();
        assert_eq!(err, BrainError::GenomeSizeMismatch { expected: 63, actual: 62 });
    }

    #[test]
    fn test_reset_zeroes_state() {
        let io = IoShape::new(2, 1);
        let genome: Vec<f64> = (0..63).map(|i| ((i as f64) * 0.37).sin()).collect();
        let mut net = LayeredRecurrentNetwork::new(CellKind::Lstm, &genome, io, &lstm_config()).unwrap();
        let first = net.step(&[0.3, -0.7]).unwrap();
        net.step(&[0.9, 0.1]).unwrap();
        assert!(net.hidden_state(0).unwrap().iter().any(|&v| v != 0.0));

        net.reset();
        assert!(net.hidden_state(0).unwrap().iter().all(|&v| v == 0.0));
        let again = net.step(&[0.3, -0.7]).unwrap();
        assert_eq!(first, again);
    }

    #[test]
    fn test_zero_genome_outputs_zero() {
        let io = IoShape::new(2, 1);
        let mut net = LayeredRecurrentNetwork::new(CellKind::Lstm, &[0.0; 63], io, &lstm_config()).unwrap();
        let y = net.step(&[5.0, -5.0]).unwrap();
        assert_eq!(y.to_vec(), vec![0.0]);
    }
}
