//! Stateless multi-layer perceptron.
//!
//! Decode order per layer (hidden layers first, then the output layer):
//! weights `(out, in)`, then bias `(out)` when bias is enabled. Hidden layers
//! use the configured activation; the output layer is always tanh.

use ndarray::{Array1, Array2};
use tracing::debug;

use super::{check_observation, Brain};
use crate::accounting::ParameterUsage;
use crate::activation::Activation;
use crate::config::{FeedForwardConfig, IoShape};
use crate::error::BrainError;
use crate::genome::{check_size, checked_count, GenomeReader};

#[derive(Debug, Clone, PartialEq)]
pub struct DenseLayer {
    /// `(out, in)`
    pub weights: Array2<f64>,
    pub bias: Option<Array1<f64>>,
    pub activation: Activation,
}

impl DenseLayer {
    fn forward(&self, x: &Array1<f64>) -> Array1<f64> {
        let mut z = self.weights.dot(x);
        if let Some(b) = &self.bias {
            z += b;
        }
        self.activation.apply_inplace(&mut z);
        z
    }
}

#[derive(Debug, Clone)]
pub struct FeedForwardNetwork {
    io: IoShape,
    layers: Vec<DenseLayer>,
}

impl FeedForwardNetwork {
    /// `(in, out)` of every layer, output layer last.
    fn layer_shapes(io: IoShape, config: &FeedForwardConfig) -> Vec<(usize, usize)> {
        let mut sizes = Vec::with_capacity(config.hidden_layers.len() + 2);
        sizes.push(io.input_size);
        sizes.extend_from_slice(&config.hidden_layers);
        sizes.push(io.output_size);
        sizes.windows(2).map(|w| (w[0], w[1])).collect()
    }

    pub fn free_parameter_usage(io: IoShape, config: &FeedForwardConfig) -> Result<ParameterUsage, BrainError> {
        config.validate()?;
        io.validate()?;

        let shapes = Self::layer_shapes(io, config);
        let last = shapes.len() - 1;
        let mut usage = ParameterUsage::group();
        for (l, &(input, output)) in shapes.iter().enumerate() {
            let mut layer = ParameterUsage::group().with("weights", checked_count(&[output, input])?);
            if config.use_bias {
                layer = layer.with("bias", output);
            }
            let name = if l == last { "output".to_string() } else { format!("layer_{l}") };
            usage = usage.with(name, layer);
        }
        Ok(usage)
    }

    pub fn individual_size(io: IoShape, config: &FeedForwardConfig) -> Result<usize, BrainError> {
        Self::free_parameter_usage(io, config)?.individual_size()
    }

    pub fn new(genome: &[f64], io: IoShape, config: &FeedForwardConfig) -> Result<Self, BrainError> {
        let expected = Self::individual_size(io, config)?;
        check_size(genome, expected)?;

        let shapes = Self::layer_shapes(io, config);
        let last = shapes.len() - 1;
        let mut reader = GenomeReader::new(genome);
        let mut layers = Vec::with_capacity(shapes.len());
        for (l, &(input, output)) in shapes.iter().enumerate() {
            let weights = reader.read_block(output, input)?;
            let bias = if config.use_bias {
                Some(reader.read_vector(output)?)
            } else {
                None
            };
            let activation = if l == last { Activation::Tanh } else { config.activation };
            layers.push(DenseLayer {
                weights,
                bias,
                activation,
            });
        }
        reader.finish()?;

        debug!(layers = ?config.hidden_layers, activation = %config.activation, params = expected, "Decoded feed-forward brain");
        Ok(Self { io, layers })
    }

    pub fn layers(&self) -> &[DenseLayer] {
        &self.layers
    }
}

impl Brain for FeedForwardNetwork {
    fn input_size(&self) -> usize {
        self.io.input_size
    }

    fn output_size(&self) -> usize {
        self.io.output_size
    }

    fn step(&mut self, observation: &[f64]) -> Result<Array1<f64>, BrainError> {
        check_observation(observation, self.io.input_size)?;
        let x = Array1::from(observation.to_vec());
        Ok(self.layers.iter().fold(x, |x, layer| layer.forward(&x)))
    }

    fn reset(&mut self) {}
}
