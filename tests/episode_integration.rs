//! Episode Runner Integration Tests
//!
//! Drives registry-built brains through a toy point-mass environment, the
//! way an external fitness evaluator would.

use ndarray::Array1;
use rand::rngs::StdRng;
use rand::SeedableRng;

use evobrain::config::{FeedForwardConfig, LayeredConfig};
use evobrain::episode::run_episode_detailed;
use evobrain::{
    build, generate_brain_state, individual_size, random_genome, run_episode, Activation, AnyBrain, BrainConfig,
    BrainError, BrainKind, Environment, IoShape, Transition,
};

/// A point on a line that should move towards the origin.
///
/// Observation: `[position, velocity]`. Action: one acceleration in `[-1, 1]`.
/// Reward per step is `-|position|`; the episode ends when the point leaves
/// `[-10, 10]`.
struct PointMass {
    start: f64,
    position: f64,
    velocity: f64,
}

impl PointMass {
    fn new(start: f64) -> Self {
        Self {
            start,
            position: start,
            velocity: 0.0,
        }
    }

    fn observation(&self) -> Vec<f64> {
        vec![self.position, self.velocity]
    }
}

impl Environment for PointMass {
    fn reset(&mut self) -> Vec<f64> {
        self.position = self.start;
        self.velocity = 0.0;
        self.observation()
    }

    fn step(&mut self, action: &Array1<f64>) -> Transition {
        self.velocity += 0.1 * action[0];
        self.position += 0.1 * self.velocity;
        Transition {
            observation: self.observation(),
            reward: -self.position.abs(),
            done: self.position.abs() > 10.0,
        }
    }

    fn number_inputs(&self) -> usize {
        2
    }

    fn number_outputs(&self) -> usize {
        1
    }
}

fn brain_for(config: &BrainConfig, seed: u64) -> AnyBrain {
    let io = IoShape::new(2, 1);
    let state = generate_brain_state(config, io, seed).unwrap();
    let size = individual_size(config, io, &state).unwrap();
    let genome = random_genome(size, 0.5, &mut StdRng::seed_from_u64(seed)).unwrap();
    build(&genome, config, io, &state).unwrap()
}

#[test]
fn every_kind_completes_an_episode() {
    for kind in BrainKind::ALL {
        let mut brain = brain_for(&BrainConfig::default_for(kind), 17);
        let mut env = PointMass::new(2.0);
        let summary = run_episode_detailed(&mut brain, &mut env, 50).unwrap();
        assert!(summary.steps >= 1 && summary.steps <= 50, "{kind}");
        assert!(summary.total_reward.is_finite());
        assert!(summary.total_reward <= 0.0);
    }
}

#[test]
fn repeated_episodes_give_the_same_fitness() {
    // run_episode resets the brain, so hidden state never leaks across episodes.
    for kind in [BrainKind::Lstm, BrainKind::Ctrnn] {
        let mut brain = brain_for(&BrainConfig::default_for(kind), 3);
        let mut env = PointMass::new(-1.5);
        let first = run_episode(&mut brain, &mut env, 80).unwrap();
        let second = run_episode(&mut brain, &mut env, 80).unwrap();
        assert_eq!(first, second, "{kind}");
    }
}

#[test]
fn hand_built_controller_beats_passive_one() {
    // a = tanh(-2 * position - 3 * velocity): a damped spring towards 0.
    let io = IoShape::new(2, 1);
    let config = FeedForwardConfig {
        hidden_layers: vec![],
        activation: Activation::Identity,
        use_bias: false,
    };
    let config = BrainConfig::FeedForward(config);
    let state = generate_brain_state(&config, io, 0).unwrap();

    let mut controller = build(&[-2.0, -3.0], &config, io, &state).unwrap();
    let mut passive = build(&[0.0, 0.0], &config, io, &state).unwrap();

    let mut env = PointMass::new(3.0);
    let controlled = run_episode(&mut controller, &mut env, 300).unwrap();
    let idle = run_episode(&mut passive, &mut env, 300).unwrap();
    assert!(controlled > idle, "{controlled} vs {idle}");
}

#[test]
fn trait_objects_work_with_the_runner() {
    let config = BrainConfig::Gru(LayeredConfig {
        hidden_layers: vec![4],
        use_bias: true,
        diagonal_hidden_to_hidden: false,
    });
    let mut brain: Box<dyn evobrain::Brain> = Box::new(brain_for(&config, 11));
    let mut env: Box<dyn Environment> = Box::new(PointMass::new(0.5));
    let reward = run_episode(brain.as_mut(), env.as_mut(), 20).unwrap();
    assert!(reward.is_finite());
}

#[test]
fn mismatched_environment_is_rejected_before_stepping() {
    let io = IoShape::new(3, 1);
    let config = BrainConfig::Elman(LayeredConfig::default());
    let state = generate_brain_state(&config, io, 0).unwrap();
    let size = individual_size(&config, io, &state).unwrap();
    let mut brain = build(&vec![0.0; size], &config, io, &state).unwrap();
    let mut env = PointMass::new(1.0);
    assert!(matches!(
        run_episode(&mut brain, &mut env, 10),
        Err(BrainError::Configuration(_))
    ));
}
