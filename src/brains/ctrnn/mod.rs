//! Continuous-time recurrent network integrated with forward Euler.
//!
//! The genome fills the active entries of the V, W and T masks (row-major,
//! in that order), then optionally the initial state `x0`. Each step:
//!
//! ```text
//! NaturalNet:    dx/dt = -alpha * x + W * f(x) + V * u
//! LiHoChow2005:  dx/dt = -alpha * x + W * f(x + V * u)
//!
//! x <- clip(x + delta_t * dx/dt, -clip, clip)
//! y  = tanh(T * x)
//! ```

pub mod wiring;

use ndarray::{Array1, Array2, Zip};
use tracing::debug;

use super::{check_observation, Brain};
use crate::accounting::ParameterUsage;
use crate::activation::Activation;
use crate::brain_state::{BrainState, ConnectionMask, T_MASK, V_MASK, W_MASK};
use crate::config::{CtrnnConfig, DifferentialEquation, IoShape};
use crate::error::BrainError;
use crate::genome::{check_size, GenomeReader};

/// Fetch the V, W and T masks and check them against the configured shapes.
fn masks<'a>(
    config: &CtrnnConfig,
    io: IoShape,
    state: &'a BrainState,
) -> Result<[&'a ConnectionMask; 3], BrainError> {
    let mut out = Vec::with_capacity(3);
    for (role, shape) in wiring::mask_shapes(config, io) {
        let mask = state.mask(role)?;
        if mask.shape() != shape {
            return Err(BrainError::config(format!(
                "{role} has shape {:?}, expected {:?} for {} neurons, io {}x{}",
                mask.shape(),
                shape,
                config.number_neurons,
                io.input_size,
                io.output_size
            )));
        }
        out.push(mask);
    }
    Ok([out[0], out[1], out[2]])
}

#[derive(Debug, Clone)]
pub struct Ctrnn {
    io: IoShape,
    delta_t: f64,
    alpha: f64,
    clip: f64,
    equation: DifferentialEquation,
    activation: Activation,
    /// `(neurons, inputs)`
    v: Array2<f64>,
    /// `(neurons, neurons)`
    w: Array2<f64>,
    /// `(outputs, neurons)`
    t: Array2<f64>,
    x0: Array1<f64>,
    x: Array1<f64>,
}

impl Ctrnn {
    /// Parameter breakdown `V`, `W`, `T` and, when learned, `x0`.
    ///
    /// Counts are the active entries of the masks in `state`, so the state
    /// must be the one brains will be decoded against.
    pub fn free_parameter_usage(
        io: IoShape,
        config: &CtrnnConfig,
        state: &BrainState,
    ) -> Result<ParameterUsage, BrainError> {
        config.validate()?;
        io.validate()?;
        let [v, w, t] = masks(config, io, state)?;

        let mut usage = ParameterUsage::group()
            .with("V", v.active_count())
            .with("W", w.active_count())
            .with("T", t.active_count());
        if config.optimize_x0 {
            usage = usage.with("x0", config.number_neurons);
        }
        Ok(usage)
    }

    pub fn individual_size(io: IoShape, config: &CtrnnConfig, state: &BrainState) -> Result<usize, BrainError> {
        Self::free_parameter_usage(io, config, state)?.individual_size()
    }

    pub fn new(genome: &[f64], io: IoShape, config: &CtrnnConfig, state: &BrainState) -> Result<Self, BrainError> {
        let expected = Self::individual_size(io, config, state)?;
        check_size(genome, expected)?;
        let [v_mask, w_mask, t_mask] = masks(config, io, state)?;

        let mut reader = GenomeReader::new(genome);
        let v = reader.read_masked(v_mask)?;
        let mut w = reader.read_masked(w_mask)?;
        let t = reader.read_masked(t_mask)?;
        let x0 = if config.optimize_x0 {
            reader.read_vector(config.number_neurons)?
        } else {
            Array1::zeros(config.number_neurons)
        };
        reader.finish()?;

        if config.negative_diagonal {
            w.diag_mut().mapv_inplace(|d| -d.abs());
        }

        debug!(
            neurons = config.number_neurons,
            equation = %config.differential_equation,
            params = expected,
            "Decoded CTRNN brain"
        );

        Ok(Self {
            io,
            delta_t: config.delta_t,
            alpha: config.alpha,
            clip: config.clip,
            equation: config.differential_equation,
            activation: config.neuron_activation,
            v,
            w,
            t,
            x: x0.clone(),
            x0,
        })
    }

    pub fn number_neurons(&self) -> usize {
        self.x.len()
    }

    /// Current continuous state.
    pub fn state(&self) -> &Array1<f64> {
        &self.x
    }

    pub fn initial_state(&self) -> &Array1<f64> {
        &self.x0
    }

    pub fn v(&self) -> &Array2<f64> {
        &self.v
    }

    pub fn w(&self) -> &Array2<f64> {
        &self.w
    }

    pub fn t(&self) -> &Array2<f64> {
        &self.t
    }

    fn derivative(&self, u: &Array1<f64>) -> Array1<f64> {
        let input = self.v.dot(u);
        let recurrent = match self.equation {
            DifferentialEquation::NaturalNet => self.x.mapv(|x| self.activation.apply(x)),
            DifferentialEquation::LiHoChow2005 => (&self.x + &input).mapv(|x| self.activation.apply(x)),
        };
        let mut dx = self.w.dot(&recurrent);
        if self.equation == DifferentialEquation::NaturalNet {
            dx += &input;
        }
        dx.scaled_add(-self.alpha, &self.x);
        dx
    }
}

impl Brain for Ctrnn {
    fn input_size(&self) -> usize {
        self.io.input_size
    }

    fn output_size(&self) -> usize {
        self.io.output_size
    }

    fn step(&mut self, observation: &[f64]) -> Result<Array1<f64>, BrainError> {
        check_observation(observation, self.io.input_size)?;
        let u = Array1::from(observation.to_vec());
        let dx = self.derivative(&u);

        let (dt, clip) = (self.delta_t, self.clip);
        Zip::from(&mut self.x)
            .and(&dx)
            .for_each(|x, &d| *x = (*x + dt * d).clamp(-clip, clip));

        Ok(self.t.dot(&self.x).mapv(f64::tanh))
    }

    fn reset(&mut self) {
        self.x.assign(&self.x0);
    }
}
