//! Environment seam and the episode loop.
//!
//! Environments are external collaborators; this module only fixes the
//! interface a brain is evaluated against and the loop that drives one
//! episode. Fitness policy (retries, worst-case scores on failure) stays with
//! the caller.

use ndarray::Array1;
use tracing::debug;

use crate::brains::Brain;
use crate::error::BrainError;

/// Result of applying one action.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub observation: Vec<f64>,
    pub reward: f64,
    pub done: bool,
}

/// A simulated task a brain can act in.
pub trait Environment {
    /// Start a new episode and return the first observation.
    fn reset(&mut self) -> Vec<f64>;

    fn step(&mut self, action: &Array1<f64>) -> Transition;

    fn number_inputs(&self) -> usize;

    fn number_outputs(&self) -> usize;
}

/// Outcome of one episode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpisodeSummary {
    pub total_reward: f64,
    pub steps: usize,
    /// Whether the environment ended the episode before the step limit.
    pub terminated: bool,
}

/// Run one episode and return the summed reward.
pub fn run_episode<B, E>(brain: &mut B, env: &mut E, max_steps: usize) -> Result<f64, BrainError>
where
    B: Brain + ?Sized,
    E: Environment + ?Sized,
{
    Ok(run_episode_detailed(brain, env, max_steps)?.total_reward)
}

/// Run one episode: reset both sides, then step until `done` or `max_steps`.
///
/// The environment's I/O shape is checked against the brain's before the
/// first step.
pub fn run_episode_detailed<B, E>(brain: &mut B, env: &mut E, max_steps: usize) -> Result<EpisodeSummary, BrainError>
where
    B: Brain + ?Sized,
    E: Environment + ?Sized,
{
    if env.number_inputs() != brain.input_size() || env.number_outputs() != brain.output_size() {
        return Err(BrainError::config(format!(
            "environment io {}x{} does not match brain io {}x{}",
            env.number_inputs(),
            env.number_outputs(),
            brain.input_size(),
            brain.output_size()
        )));
    }

    brain.reset();
    let mut observation = env.reset();
    let mut summary = EpisodeSummary {
        total_reward: 0.0,
        steps: 0,
        terminated: false,
    };

    while summary.steps < max_steps {
        let action = brain.step(&observation)?;
        let transition = env.step(&action);
        summary.total_reward += transition.reward;
        summary.steps += 1;
        if transition.done {
            summary.terminated = true;
            break;
        }
        observation = transition.observation;
    }

    debug!(reward = summary.total_reward, steps = summary.steps, terminated = summary.terminated, "Episode finished");
    Ok(summary)
}
