//! System-wide default constants.
//!
//! Grouped by subsystem for easy discovery.

// ============================================================================
// Layered / Feed-Forward Brains
// ============================================================================

/// Hidden layer size used when a config names no layers explicitly.
pub const DEFAULT_HIDDEN_LAYER_SIZE: usize = 8;

/// Largest layer size accepted without a warning.
pub const LARGE_LAYER_WARNING: usize = 4_096;

// ============================================================================
// CTRNN
// ============================================================================

/// Number of CTRNN neurons.
pub const DEFAULT_NUMBER_NEURONS: usize = 8;

/// Forward Euler step size.
pub const DEFAULT_DELTA_T: f64 = 0.05;

/// Leak coefficient in `dx/dt = -alpha * x + ...`.
pub const DEFAULT_ALPHA: f64 = 0.0;

/// Symmetric clipping bound applied to the state after every Euler step.
pub const DEFAULT_CLIP: f64 = 1.0;

/// Mask density when a random mask names none.
pub const DEFAULT_MASK_DENSITY: f64 = 1.0;

// ============================================================================
// Experiment
// ============================================================================

/// Environment variable naming the experiment config file.
pub const CONFIG_ENV_VAR: &str = "EVOBRAIN_CONFIG";

/// Config file searched in the working directory.
pub const CONFIG_FILE_NAME: &str = "evobrain.toml";

/// Observation length of the default experiment.
pub const DEFAULT_INPUT_SIZE: usize = 4;

/// Action length of the default experiment.
pub const DEFAULT_OUTPUT_SIZE: usize = 2;

/// Seed for structural state generation.
pub const DEFAULT_SEED: u64 = 42;

// ============================================================================
// Probe (CLI)
// ============================================================================

/// Random genomes decoded per probe run.
pub const DEFAULT_PROBE_GENOMES: usize = 16;

/// Steps taken by each probed brain.
pub const DEFAULT_PROBE_STEPS: usize = 100;

/// Standard deviation of sampled genes.
pub const DEFAULT_GENOME_STD_DEV: f64 = 1.0;

/// Observations are drawn uniformly from `[-scale, scale]`.
pub const DEFAULT_OBSERVATION_SCALE: f64 = 1.0;
