//! Connectivity mask generation for the CTRNN.
//!
//! Masks are drawn from one seeded PRNG in a fixed order (V, then W, then T),
//! so a seed and a configuration always reproduce the same structural state:
//!
//! - **V** `(neurons, inputs)`: input → neuron
//! - **W** `(neurons, neurons)`: neuron → neuron
//! - **T** `(outputs, neurons)`: neuron → output
//!
//! Dense masks consume no random numbers. Random masks draw one Bernoulli
//! sample per entry, row-major.

use std::collections::BTreeMap;

use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::info;

use crate::brain_state::{BrainState, ConnectionMask, T_MASK, V_MASK, W_MASK};
use crate::config::{CtrnnConfig, IoShape, MaskConfig, MaskKind};

/// Draw one `(rows, cols)` mask.
///
/// With `force_diagonal`, entry `(i, i)` is on regardless of the draw; the
/// draw still happens so the PRNG stream does not depend on the flag.
pub fn generate_mask<R: Rng + ?Sized>(rows: usize, cols: usize, config: &MaskConfig, rng: &mut R) -> ConnectionMask {
    let bits = match config.kind {
        MaskKind::Dense => Array2::from_elem((rows, cols), true),
        MaskKind::Random => Array2::from_shape_fn((rows, cols), |(r, c)| {
            let on = rng.gen::<f64>() < config.density;
            on || (config.force_diagonal && r == c)
        }),
    };
    ConnectionMask::from_array(bits)
}

/// Shapes of the V, W and T masks for `config` and `io`.
pub fn mask_shapes(config: &CtrnnConfig, io: IoShape) -> [(&'static str, (usize, usize)); 3] {
    let n = config.number_neurons;
    [
        (V_MASK, (n, io.input_size)),
        (W_MASK, (n, n)),
        (T_MASK, (io.output_size, n)),
    ]
}

/// Generate the V/W/T masks deterministically from `seed`.
pub fn generate_brain_state(config: &CtrnnConfig, io: IoShape, seed: u64) -> BrainState {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut masks = BTreeMap::new();

    for (role, (rows, cols)) in mask_shapes(config, io) {
        let mask_config = match role {
            V_MASK => &config.v_mask,
            W_MASK => &config.w_mask,
            _ => &config.t_mask,
        };
        let mask = generate_mask(rows, cols, mask_config, &mut rng);
        masks.insert(role.to_string(), mask);
    }

    let count = |role: &str| masks.get(role).map_or(0, ConnectionMask::active_count);
    info!(
        seed,
        neurons = config.number_neurons,
        v_active = count(V_MASK),
        w_active = count(W_MASK),
        t_active = count(T_MASK),
        "Generated CTRNN connectivity masks"
    );

    BrainState::from_masks(Some(seed), masks)
}
