//! Per-kind brain configurations.
//!
//! Every struct implements `Default` with the values from
//! [`super::defaults`], and every field is `#[serde(default)]` so a TOML
//! file only needs to name what differs. Validation happens once, before any
//! genome is sized or decoded.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::defaults::{
    DEFAULT_ALPHA, DEFAULT_CLIP, DEFAULT_DELTA_T, DEFAULT_HIDDEN_LAYER_SIZE, DEFAULT_INPUT_SIZE,
    DEFAULT_MASK_DENSITY, DEFAULT_NUMBER_NEURONS, DEFAULT_OUTPUT_SIZE,
};
use crate::activation::Activation;
use crate::brains::BrainKind;
use crate::error::BrainError;

// ============================================================================
// I/O Shape
// ============================================================================

/// Observation and action lengths, supplied by the environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IoShape {
    pub input_size: usize,
    pub output_size: usize,
}

impl IoShape {
    pub const fn new(input_size: usize, output_size: usize) -> Self {
        Self { input_size, output_size }
    }

    pub fn validate(&self) -> Result<(), BrainError> {
        if self.input_size == 0 {
            return Err(BrainError::config("input_size must be > 0"));
        }
        if self.output_size == 0 {
            return Err(BrainError::config("output_size must be > 0"));
        }
        Ok(())
    }
}

impl Default for IoShape {
    fn default() -> Self {
        Self::new(DEFAULT_INPUT_SIZE, DEFAULT_OUTPUT_SIZE)
    }
}

// ============================================================================
// Brain Config
// ============================================================================

/// Configuration of one brain, tagged by kind (`type = "lstm"` in TOML).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BrainConfig {
    FeedForward(FeedForwardConfig),
    Elman(LayeredConfig),
    Gru(LayeredConfig),
    Lstm(LayeredConfig),
    Ctrnn(CtrnnConfig),
}

impl BrainConfig {
    pub fn kind(&self) -> BrainKind {
        match self {
            BrainConfig::FeedForward(_) => BrainKind::FeedForward,
            BrainConfig::Elman(_) => BrainKind::Elman,
            BrainConfig::Gru(_) => BrainKind::Gru,
            BrainConfig::Lstm(_) => BrainKind::Lstm,
            BrainConfig::Ctrnn(_) => BrainKind::Ctrnn,
        }
    }

    /// Default configuration for a given kind.
    pub fn default_for(kind: BrainKind) -> Self {
        match kind {
            BrainKind::FeedForward => BrainConfig::FeedForward(FeedForwardConfig::default()),
            BrainKind::Elman => BrainConfig::Elman(LayeredConfig::default()),
            BrainKind::Gru => BrainConfig::Gru(LayeredConfig::default()),
            BrainKind::Lstm => BrainConfig::Lstm(LayeredConfig::default()),
            BrainKind::Ctrnn => BrainConfig::Ctrnn(CtrnnConfig::default()),
        }
    }

    pub fn validate(&self) -> Result<(), BrainError> {
        match self {
            BrainConfig::FeedForward(c) => c.validate(),
            BrainConfig::Elman(c) | BrainConfig::Gru(c) | BrainConfig::Lstm(c) => c.validate(),
            BrainConfig::Ctrnn(c) => c.validate(),
        }
    }
}

impl Default for BrainConfig {
    fn default() -> Self {
        BrainConfig::Ctrnn(CtrnnConfig::default())
    }
}

fn validate_layers(layers: &[usize], what: &str) -> Result<(), BrainError> {
    if let Some(i) = layers.iter().position(|&n| n == 0) {
        return Err(BrainError::config(format!(
            "{what}[{i}] must be > 0"
        )));
    }
    Ok(())
}

// ============================================================================
// Feed-Forward
// ============================================================================

/// Stateless multi-layer perceptron.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedForwardConfig {
    /// Hidden layer sizes, input side first. May be empty (linear policy).
    pub hidden_layers: Vec<usize>,
    /// Nonlinearity of the hidden layers. The output layer is always tanh.
    pub activation: Activation,
    pub use_bias: bool,
}

impl Default for FeedForwardConfig {
    fn default() -> Self {
        Self {
            hidden_layers: vec![DEFAULT_HIDDEN_LAYER_SIZE],
            activation: Activation::Tanh,
            use_bias: true,
        }
    }
}

impl FeedForwardConfig {
    pub fn validate(&self) -> Result<(), BrainError> {
        validate_layers(&self.hidden_layers, "hidden_layers")
    }
}

// ============================================================================
// Layered Recurrent (Elman / GRU / LSTM)
// ============================================================================

/// Shared configuration of the layered gated-recurrent engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayeredConfig {
    /// Recurrent layer sizes, input side first. At least one.
    pub hidden_layers: Vec<usize>,
    pub use_bias: bool,
    /// Restrict hidden-to-hidden weights to the diagonal: each neuron only
    /// sees its own previous state.
    pub diagonal_hidden_to_hidden: bool,
}

impl Default for LayeredConfig {
    fn default() -> Self {
        Self {
            hidden_layers: vec![DEFAULT_HIDDEN_LAYER_SIZE],
            use_bias: true,
            diagonal_hidden_to_hidden: false,
        }
    }
}

impl LayeredConfig {
    pub fn validate(&self) -> Result<(), BrainError> {
        if self.hidden_layers.is_empty() {
            return Err(BrainError::config("hidden_layers must name at least one layer"));
        }
        validate_layers(&self.hidden_layers, "hidden_layers")
    }
}

// ============================================================================
// CTRNN
// ============================================================================

/// Continuous-time dynamics integrated by the CTRNN.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum DifferentialEquation {
    /// `dx/dt = -alpha * x + W * f(x) + V * u`
    NaturalNet,
    /// `dx/dt = -alpha * x + W * f(x + V * u)`
    LiHoChow2005,
}

impl DifferentialEquation {
    pub fn name(self) -> &'static str {
        match self {
            DifferentialEquation::NaturalNet => "NaturalNet",
            DifferentialEquation::LiHoChow2005 => "LiHoChow2005",
        }
    }
}

impl fmt::Display for DifferentialEquation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DifferentialEquation {
    type Err = BrainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "naturalnet" => Ok(DifferentialEquation::NaturalNet),
            "lihochow2005" => Ok(DifferentialEquation::LiHoChow2005),
            _ => Err(BrainError::UnsupportedDifferentialEquation(s.to_string())),
        }
    }
}

impl TryFrom<String> for DifferentialEquation {
    type Error = BrainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DifferentialEquation> for String {
    fn from(value: DifferentialEquation) -> Self {
        value.name().to_string()
    }
}

/// How a connectivity mask is generated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaskKind {
    /// Every entry learnable.
    Dense,
    /// Independent Bernoulli draw per entry at `density`.
    Random,
}

/// Generation settings for one connectivity mask.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaskConfig {
    pub kind: MaskKind,
    /// Probability that an entry is learnable (random masks only).
    pub density: f64,
    /// Force the main diagonal on regardless of density (square masks only).
    pub force_diagonal: bool,
}

impl Default for MaskConfig {
    fn default() -> Self {
        Self::dense()
    }
}

impl MaskConfig {
    pub const fn dense() -> Self {
        Self {
            kind: MaskKind::Dense,
            density: DEFAULT_MASK_DENSITY,
            force_diagonal: false,
        }
    }

    pub const fn random(density: f64) -> Self {
        Self {
            kind: MaskKind::Random,
            density,
            force_diagonal: false,
        }
    }

    #[must_use]
    pub const fn with_forced_diagonal(mut self) -> Self {
        self.force_diagonal = true;
        self
    }

    fn validate(&self, role: &str) -> Result<(), BrainError> {
        if !(0.0..=1.0).contains(&self.density) {
            return Err(BrainError::config(format!(
                "{role}.density = {} must lie in [0, 1]",
                self.density
            )));
        }
        Ok(())
    }
}

/// Continuous-time recurrent network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CtrnnConfig {
    pub number_neurons: usize,
    /// Forward Euler step size.
    pub delta_t: f64,
    /// Leak coefficient.
    pub alpha: f64,
    /// States are clipped to `[-clip, clip]` after every step.
    pub clip: f64,
    pub differential_equation: DifferentialEquation,
    /// Nonlinearity applied to the state inside the ODE.
    pub neuron_activation: Activation,
    /// Learn the initial state `x0` (N extra genes) instead of starting at 0.
    pub optimize_x0: bool,
    /// Replace every diagonal entry of W by `-|w_ii|`.
    pub negative_diagonal: bool,
    pub v_mask: MaskConfig,
    pub w_mask: MaskConfig,
    pub t_mask: MaskConfig,
}

impl Default for CtrnnConfig {
    fn default() -> Self {
        Self {
            number_neurons: DEFAULT_NUMBER_NEURONS,
            delta_t: DEFAULT_DELTA_T,
            alpha: DEFAULT_ALPHA,
            clip: DEFAULT_CLIP,
            differential_equation: DifferentialEquation::NaturalNet,
            neuron_activation: Activation::Tanh,
            optimize_x0: false,
            negative_diagonal: false,
            v_mask: MaskConfig::dense(),
            w_mask: MaskConfig::dense(),
            t_mask: MaskConfig::dense(),
        }
    }
}

impl CtrnnConfig {
    pub fn validate(&self) -> Result<(), BrainError> {
        if self.number_neurons == 0 {
            return Err(BrainError::config("number_neurons must be > 0"));
        }
        if !self.delta_t.is_finite() || self.delta_t <= 0.0 {
            return Err(BrainError::config(format!(
                "delta_t = {} must be a finite value > 0",
                self.delta_t
            )));
        }
        if !self.alpha.is_finite() || self.alpha < 0.0 {
            return Err(BrainError::config(format!(
                "alpha = {} must be a finite value >= 0",
                self.alpha
            )));
        }
        if !self.clip.is_finite() || self.clip <= 0.0 {
            return Err(BrainError::config(format!(
                "clip = {} must be a finite value > 0",
                self.clip
            )));
        }
        self.v_mask.validate("v_mask")?;
        self.w_mask.validate("w_mask")?;
        self.t_mask.validate("t_mask")?;
        if self.v_mask.force_diagonal || self.t_mask.force_diagonal {
            return Err(BrainError::config(
                "force_diagonal only applies to the square w_mask",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        for kind in BrainKind::ALL {
            BrainConfig::default_for(kind).validate().unwrap();
        }
    }

    #[test]
    fn test_zero_layer_rejected() {
        let cfg = LayeredConfig {
            hidden_layers: vec![4, 0],
            ..LayeredConfig::default()
        };
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("hidden_layers[1]"));
    }

    #[test]
    fn test_layered_needs_a_layer() {
        let cfg = LayeredConfig {
            hidden_layers: vec![],
            ..LayeredConfig::default()
        };
        assert!(cfg.validate().is_err());

        let ff = FeedForwardConfig {
            hidden_layers: vec![],
            ..FeedForwardConfig::default()
        };
        assert!(ff.validate().is_ok());
    }

    #[test]
    fn test_density_range() {
        let cfg = CtrnnConfig {
            w_mask: MaskConfig::random(1.5),
            ..CtrnnConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(BrainError::Configuration(_))));

        let cfg = CtrnnConfig {
            v_mask: MaskConfig::random(-0.1),
            ..CtrnnConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_forced_diagonal_only_on_w() {
        let cfg = CtrnnConfig {
            v_mask: MaskConfig::random(0.5).with_forced_diagonal(),
            ..CtrnnConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_ctrnn_numeric_checks() {
        for bad in [
            CtrnnConfig { number_neurons: 0, ..CtrnnConfig::default() },
            CtrnnConfig { delta_t: 0.0, ..CtrnnConfig::default() },
            CtrnnConfig { delta_t: f64::NAN, ..CtrnnConfig::default() },
            CtrnnConfig { alpha: -1.0, ..CtrnnConfig::default() },
            CtrnnConfig { clip: 0.0, ..CtrnnConfig::default() },
        ] {
            assert!(bad.validate().is_err(), "accepted {bad:?}");
        }
    }

    #[test]
    fn test_differential_equation_names() {
        assert_eq!(
            "NaturalNet".parse::<DifferentialEquation>().unwrap(),
            DifferentialEquation::NaturalNet
        );
        assert_eq!(
            "lihochow2005".parse::<DifferentialEquation>().unwrap(),
            DifferentialEquation::LiHoChow2005
        );
        assert_eq!(
            "Hopfield".parse::<DifferentialEquation>().unwrap_err(),
            BrainError::UnsupportedDifferentialEquation("Hopfield".into())
        );
    }

    #[test]
    fn test_tagged_toml() {
        let cfg: BrainConfig = toml::from_str(
            r#"
type = "ctrnn"
number_neurons = 4
differential_equation = "LiHoChow2005"

[w_mask]
kind = "random"
density = 0.25
force_diagonal = true
"#,
        )
        .unwrap();
        let BrainConfig::Ctrnn(c) = cfg else {
            panic!("expected ctrnn config");
        };
        assert_eq!(c.number_neurons, 4);
        assert_eq!(c.differential_equation, DifferentialEquation::LiHoChow2005);
        assert_eq!(c.w_mask.kind, MaskKind::Random);
        assert!(c.w_mask.force_diagonal);
        assert_eq!(c.v_mask, MaskConfig::dense());
        assert_eq!(c.delta_t, DEFAULT_DELTA_T);
    }

    #[test]
    fn test_unknown_equation_fails_parse() {
        let res: Result<BrainConfig, _> = toml::from_str(
            r#"
type = "ctrnn"
differential_equation = "Wilson"
"#,
        );
        let msg = res.unwrap_err().to_string();
        assert!(msg.contains("unsupported differential equation"), "{msg}");
    }

    #[test]
    fn test_layered_toml() {
        let cfg: BrainConfig = toml::from_str(
            r#"
type = "lstm"
hidden_layers = [3]
use_bias = false
"#,
        )
        .unwrap();
        assert_eq!(cfg.kind(), BrainKind::Lstm);
        let BrainConfig::Lstm(c) = cfg else {
            panic!("expected lstm config");
        };
        assert_eq!(c.hidden_layers, vec![3]);
        assert!(!c.use_bias);
        assert!(!c.diagonal_hidden_to_hidden);
    }
}
