//! Accounting / Decoding Consistency Tests
//!
//! For every brain kind, the genome length reported by the registry must be
//! exactly the number of genes a decode consumes: one gene fewer or more is
//! rejected, and the exact length always builds and steps.

use rand::rngs::StdRng;
use rand::SeedableRng;

use evobrain::config::{CtrnnConfig, FeedForwardConfig, LayeredConfig, MaskConfig};
use evobrain::{
    build, free_parameter_usage, generate_brain_state, individual_size, random_genome, Activation, Brain,
    BrainConfig, BrainError, BrainKind, IoShape,
};

/// A spread of configurations per kind, including sparse CTRNN masks.
fn configurations() -> Vec<BrainConfig> {
    let mut configs: Vec<BrainConfig> = BrainKind::ALL.iter().map(|&k| BrainConfig::default_for(k)).collect();

    configs.push(BrainConfig::FeedForward(FeedForwardConfig {
        hidden_layers: vec![],
        activation: Activation::Identity,
        use_bias: false,
    }));
    configs.push(BrainConfig::FeedForward(FeedForwardConfig {
        hidden_layers: vec![7, 3, 5],
        activation: Activation::Relu,
        use_bias: true,
    }));

    for diagonal in [false, true] {
        for use_bias in [false, true] {
            let layered = LayeredConfig {
                hidden_layers: vec![4, 6],
                use_bias,
                diagonal_hidden_to_hidden: diagonal,
            };
            configs.push(BrainConfig::Elman(layered.clone()));
            configs.push(BrainConfig::Gru(layered.clone()));
            configs.push(BrainConfig::Lstm(layered));
        }
    }

    for optimize_x0 in [false, true] {
        configs.push(BrainConfig::Ctrnn(CtrnnConfig {
            number_neurons: 10,
            optimize_x0,
            negative_diagonal: true,
            v_mask: MaskConfig::random(0.5),
            w_mask: MaskConfig::random(0.25).with_forced_diagonal(),
            t_mask: MaskConfig::random(0.6),
            ..CtrnnConfig::default()
        }));
    }
    configs
}

#[test]
fn exact_length_builds_every_configuration() {
    let io = IoShape::new(3, 2);
    let mut rng = StdRng::seed_from_u64(1234);
    for (i, config) in configurations().iter().enumerate() {
        let state = generate_brain_state(config, io, i as u64).unwrap();
        let size = individual_size(config, io, &state).unwrap();
        assert!(size > 0, "config {i} has no parameters");

        let genome = random_genome(size, 1.0, &mut rng).unwrap();
        let mut brain = build(&genome, config, io, &state)
            .unwrap_or_else(|e| panic!("config {i} ({}) failed to build: {e}", config.kind()));
        let action = brain.step(&[0.1, -0.2, 0.3]).unwrap();
        assert_eq!(action.len(), 2);
    }
}

#[test]
fn off_by_one_lengths_are_rejected() {
    let io = IoShape::new(3, 2);
    for (i, config) in configurations().iter().enumerate() {
        let state = generate_brain_state(config, io, i as u64).unwrap();
        let size = individual_size(config, io, &state).unwrap();

        for wrong in [size - 1, size + 1] {
            let err = build(&vec![0.0; wrong], config, io, &state).unwrap_err();
            assert_eq!(
                err,
                BrainError::GenomeSizeMismatch {
                    expected: size,
                    actual: wrong
                },
                "config {i}"
            );
        }
    }
}

#[test]
fn usage_leaves_sum_to_individual_size() {
    let io = IoShape::new(5, 4);
    for (i, config) in configurations().iter().enumerate() {
        let state = generate_brain_state(config, io, 99).unwrap();
        let usage = free_parameter_usage(config, io, &state).unwrap();
        let leaf_sum: usize = usage.leaves().iter().map(|(_, n)| n).sum();
        assert_eq!(leaf_sum, usage.total(), "config {i}");
        assert_eq!(usage.total(), individual_size(config, io, &state).unwrap());
    }
}

#[test]
fn concrete_ctrnn_scenario_has_28_parameters() {
    let io = IoShape::new(2, 1);
    let config = BrainConfig::Ctrnn(CtrnnConfig {
        number_neurons: 4,
        ..CtrnnConfig::default()
    });
    let state = generate_brain_state(&config, io, 0).unwrap();
    assert_eq!(individual_size(&config, io, &state).unwrap(), 4 * 2 + 4 * 4 + 4);
}

#[test]
fn concrete_lstm_scenario_has_63_parameters() {
    let io = IoShape::new(2, 1);
    let config = BrainConfig::Lstm(LayeredConfig {
        hidden_layers: vec![3],
        use_bias: false,
        diagonal_hidden_to_hidden: false,
    });
    let state = generate_brain_state(&config, io, 0).unwrap();
    assert!(state.is_empty());
    assert_eq!(individual_size(&config, io, &state).unwrap(), 24 + 36 + 3);
}

#[test]
fn sparser_masks_need_fewer_genes() {
    let io = IoShape::new(4, 2);
    let dense = BrainConfig::Ctrnn(CtrnnConfig {
        number_neurons: 20,
        ..CtrnnConfig::default()
    });
    let sparse = BrainConfig::Ctrnn(CtrnnConfig {
        number_neurons: 20,
        w_mask: MaskConfig::random(0.1),
        ..CtrnnConfig::default()
    });
    let dense_state = generate_brain_state(&dense, io, 5).unwrap();
    let sparse_state = generate_brain_state(&sparse, io, 5).unwrap();
    let d = individual_size(&dense, io, &dense_state).unwrap();
    let s = individual_size(&sparse, io, &sparse_state).unwrap();
    assert_eq!(d, 20 * 4 + 20 * 20 + 2 * 20);
    assert!(s < d);
}
