//! evobrain - inspect and exercise neuroevolution brain configurations
//!
//! # Usage
//!
//! ```bash
//! # Parameter breakdown of the configured brain
//! evobrain size
//!
//! # Generate and persist the structural state (CTRNN masks)
//! evobrain --config experiment.toml init-state --output brain_state.json
//!
//! # Decode random genomes and step them with random observations
//! evobrain probe --genomes 64 --steps 500
//! ```
//!
//! # Environment Variables
//!
//! - `EVOBRAIN_CONFIG`: Path to the experiment TOML (default: ./evobrain.toml)
//! - `RUST_LOG`: Logging level (default: info)

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Parser;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use tracing::{info, warn};

use evobrain::{brains, random_genome, Brain, BrainState, ExperimentConfig};

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "evobrain")]
#[command(about = "Genome decoding and recurrent inference for neuroevolution brains")]
#[command(version)]
struct CliArgs {
    /// Experiment TOML file (overrides EVOBRAIN_CONFIG and ./evobrain.toml)
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: SubCommand,
}

#[derive(clap::Subcommand, Debug)]
enum SubCommand {
    /// Print the genome length and its per-tensor breakdown
    Size {
        /// Emit the breakdown as JSON
        #[arg(long)]
        json: bool,
    },
    /// Generate the structural state and write it to disk
    InitState {
        /// Output path (default: brain_state_path from the config)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Mask seed (default: seed from the config)
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Decode random genomes in parallel and step each with random observations
    Probe {
        /// Number of genomes (default: probe.genomes from the config)
        #[arg(long)]
        genomes: Option<usize>,
        /// Steps per genome (default: probe.steps from the config)
        #[arg(long)]
        steps: Option<usize>,
    },
}

// ============================================================================
// Helpers
// ============================================================================

fn load_config(path: Option<&Path>) -> Result<ExperimentConfig> {
    match path {
        Some(p) => ExperimentConfig::load_from_file(p)
            .with_context(|| format!("loading experiment config {}", p.display())),
        None => Ok(ExperimentConfig::load()),
    }
}

/// Load the persisted structural state if there is one, otherwise generate it
/// from the configured seed.
fn resolve_state(config: &ExperimentConfig) -> Result<BrainState> {
    if !config.brain.kind().needs_brain_state() {
        return Ok(BrainState::empty());
    }
    if let Some(path) = &config.brain_state_path {
        if path.exists() {
            return BrainState::load(path).with_context(|| format!("loading brain state {}", path.display()));
        }
        warn!(path = %path.display(), "Brain state file not found, generating from seed");
    }
    Ok(brains::generate_brain_state(&config.brain, config.io, config.seed)?)
}

// ============================================================================
// Subcommands
// ============================================================================

fn cmd_size(config: &ExperimentConfig, json: bool) -> Result<()> {
    let state = resolve_state(config)?;
    let usage = brains::free_parameter_usage(&config.brain, config.io, &state)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&usage)?);
    } else {
        println!(
            "{} brain, io {}x{}",
            config.brain.kind(),
            config.io.input_size,
            config.io.output_size
        );
        println!("{usage}");
    }
    Ok(())
}

fn cmd_init_state(config: &ExperimentConfig, output: Option<PathBuf>, seed: Option<u64>) -> Result<()> {
    if !config.brain.kind().needs_brain_state() {
        warn!(brain = %config.brain.kind(), "Brain kind carries no structural state; writing an empty bundle");
    }
    let path = match output.or_else(|| config.brain_state_path.clone()) {
        Some(p) => p,
        None => bail!("no output path: pass --output or set brain_state_path in the config"),
    };
    let state = brains::generate_brain_state(&config.brain, config.io, seed.unwrap_or(config.seed))?;
    state.save(&path)?;

    let size = brains::individual_size(&config.brain, config.io, &state)?;
    info!(path = %path.display(), genome_size = size, "Structural state ready");
    println!("{} ({} genes)", path.display(), size);
    Ok(())
}

#[derive(Debug, Clone, Copy)]
struct ProbeResult {
    min: f64,
    max: f64,
    mean_abs: f64,
}

fn probe_one(
    config: &ExperimentConfig,
    state: &BrainState,
    size: usize,
    index: usize,
    steps: usize,
) -> Result<ProbeResult> {
    let mut rng = StdRng::seed_from_u64(config.seed.wrapping_add(index as u64));
    let genome = random_genome(size, config.probe.genome_std_dev, &mut rng)?;
    let mut brain = brains::build(&genome, &config.brain, config.io, state)?;

    let scale = config.probe.observation_scale;
    let mut result = ProbeResult {
        min: f64::INFINITY,
        max: f64::NEG_INFINITY,
        mean_abs: 0.0,
    };
    let mut count = 0usize;
    for _ in 0..steps {
        let observation: Vec<f64> = (0..config.io.input_size)
            .map(|_| rng.gen_range(-scale..=scale))
            .collect();
        let action = brain.step(&observation)?;
        for &a in &action {
            result.min = result.min.min(a);
            result.max = result.max.max(a);
            result.mean_abs += a.abs();
            count += 1;
        }
    }
    if count > 0 {
        result.mean_abs /= count as f64;
    }
    Ok(result)
}

fn cmd_probe(config: &ExperimentConfig, genomes: Option<usize>, steps: Option<usize>) -> Result<()> {
    let genomes = genomes.unwrap_or(config.probe.genomes);
    let steps = steps.unwrap_or(config.probe.steps);
    let state = resolve_state(config)?;
    let size = brains::individual_size(&config.brain, config.io, &state)?;

    info!(brain = %config.brain.kind(), genome_size = size, genomes, steps, "Probing random genomes");

    let results: Vec<ProbeResult> = (0..genomes)
        .into_par_iter()
        .map(|i| probe_one(config, &state, size, i, steps))
        .collect::<Result<_>>()?;

    println!("{:>6}  {:>10}  {:>10}  {:>10}", "genome", "min", "max", "mean|a|");
    for (i, r) in results.iter().enumerate() {
        println!("{:>6}  {:>10.4}  {:>10.4}  {:>10.4}", i, r.min, r.max, r.mean_abs);
    }

    if let Some(bad) = results.iter().position(|r| r.min < -1.0 || r.max > 1.0) {
        bail!("genome {bad} produced an action outside [-1, 1]");
    }
    Ok(())
}

// ============================================================================
// Main
// ============================================================================

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = CliArgs::parse();
    let config = load_config(args.config.as_deref())?;

    match args.command {
        SubCommand::Size { json } => cmd_size(&config, json),
        SubCommand::InitState { output, seed } => cmd_init_state(&config, output, seed),
        SubCommand::Probe { genomes, steps } => cmd_probe(&config, genomes, steps),
    }
}
