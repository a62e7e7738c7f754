//! Experiment configuration: which brain, which I/O shape, which seed.
//!
//! Every struct implements `Default`, so an empty file or no file at all
//! still yields a runnable experiment.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::brain::{BrainConfig, IoShape};
use super::defaults::{
    CONFIG_ENV_VAR, CONFIG_FILE_NAME, DEFAULT_GENOME_STD_DEV, DEFAULT_OBSERVATION_SCALE,
    DEFAULT_PROBE_GENOMES, DEFAULT_PROBE_STEPS, DEFAULT_SEED,
};

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root configuration of one experiment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentConfig {
    /// Seed for structural state (mask) generation.
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Where the structural state is persisted, if anywhere.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brain_state_path: Option<PathBuf>,

    /// Observation / action lengths
    #[serde(default)]
    pub io: IoShape,

    /// Brain kind and its structural parameters
    #[serde(default)]
    pub brain: BrainConfig,

    /// Random-genome probe settings (CLI)
    #[serde(default)]
    pub probe: ProbeConfig,
}

fn default_seed() -> u64 {
    DEFAULT_SEED
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            seed: DEFAULT_SEED,
            brain_state_path: None,
            io: IoShape::default(),
            brain: BrainConfig::default(),
            probe: ProbeConfig::default(),
        }
    }
}

impl ExperimentConfig {
    /// Files tried by [`ExperimentConfig::load`], most specific first.
    ///
    /// `env_value` is the value of `$EVOBRAIN_CONFIG`, if set.
    pub fn search_paths(env_value: Option<&str>) -> Vec<PathBuf> {
        env_value
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .into_iter()
            .chain(std::iter::once(PathBuf::from(CONFIG_FILE_NAME)))
            .collect()
    }

    /// First readable, valid file from [`Self::search_paths`], else defaults.
    /// Unreadable or invalid files are skipped with a warning.
    pub fn load() -> Self {
        let env_value = std::env::var(CONFIG_ENV_VAR).ok();
        for path in Self::search_paths(env_value.as_deref()) {
            if !path.exists() {
                debug!(path = %path.display(), "No experiment config here");
                continue;
            }
            match Self::load_from_file(&path) {
                Ok(config) => {
                    info!(path = %path.display(), brain = %config.brain.kind(), "Experiment config loaded");
                    return config;
                }
                Err(e) => warn!(path = %path.display(), error = %e, "Skipping experiment config"),
            }
        }
        info!("No experiment config found, using defaults");
        Self::default()
    }

    /// Load from a specific TOML file path.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        Self::from_toml_str(&contents).map_err(|e| match e {
            ConfigError::Parse(_, err) => ConfigError::Parse(path.to_path_buf(), err),
            other => other,
        })
    }

    /// Parse and validate a TOML document.
    ///
    /// Unknown keys are reported as warnings first; the typed parse and
    /// validation follow.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        for w in super::validation::validate_unknown_keys(contents) {
            warn!("{}", w);
        }

        let config: Self = toml::from_str(contents)
            .map_err(|e| ConfigError::Parse(PathBuf::new(), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the current config to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn save_to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let contents = self.to_toml()?;
        std::fs::write(path, contents)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        info!(path = %path.display(), "Experiment config saved");
        Ok(())
    }

    /// Validate all values; suspicious-but-legal values are logged.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let (errors, warnings) = super::validation::validate_ranges(self);
        for w in &warnings {
            warn!("{}", w);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {}: {}", .0.display(), .1)]
    Io(PathBuf, #[source] std::io::Error),

    #[error("cannot parse {}: {}", .0.display(), .1)]
    Parse(PathBuf, #[source] toml::de::Error),

    #[error("cannot serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("invalid config: {}", .0.join("; "))]
    Validation(Vec<String>),
}

// ============================================================================
// Probe
// ============================================================================

/// Settings for decoding and stepping random genomes from the CLI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Number of random genomes decoded.
    pub genomes: usize,
    /// Steps per genome.
    pub steps: usize,
    /// Standard deviation of sampled genes.
    pub genome_std_dev: f64,
    /// Observations drawn uniformly from `[-scale, scale]`.
    pub observation_scale: f64,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            genomes: DEFAULT_PROBE_GENOMES,
            steps: DEFAULT_PROBE_STEPS,
            genome_std_dev: DEFAULT_GENOME_STD_DEV,
            observation_scale: DEFAULT_OBSERVATION_SCALE,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brains::BrainKind;

    #[test]
    fn test_default_validates() {
        ExperimentConfig::default().validate().unwrap();
    }

    #[test]
    fn test_empty_toml_gives_defaults() {
        let cfg = ExperimentConfig::from_toml_str("").unwrap();
        assert_eq!(cfg, ExperimentConfig::default());
    }

    #[test]
    fn test_toml_round_trip() {
        let cfg = ExperimentConfig::from_toml_str(
            r#"
seed = 7

[io]
input_size = 2
output_size = 1

[brain]
type = "gru"
hidden_layers = [5, 3]
diagonal_hidden_to_hidden = true
"#,
        )
        .unwrap();
        assert_eq!(cfg.seed, 7);
        assert_eq!(cfg.brain.kind(), BrainKind::Gru);

        let text = cfg.to_toml().unwrap();
        let back = ExperimentConfig::from_toml_str(&text).unwrap();
        assert_eq!(back, cfg);
    }

    #[test]
    fn test_validation_errors_reported() {
        let err = ExperimentConfig::from_toml_str(
            r#"
[brain]
type = "elman"
hidden_layers = [0]
"#,
        )
        .unwrap_err();
        match err {
            ConfigError::Validation(errors) => {
                assert_eq!(errors.len(), 1);
                assert!(errors[0].contains("hidden_layers[0]"));
            }
            other => panic!("expected validation error, got {other}"),
        }
    }

    #[test]
    fn test_unknown_brain_type_is_parse_error() {
        let err = ExperimentConfig::from_toml_str(
            r#"
[brain]
type = "transformer"
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_, _)));
    }

    #[test]
    fn test_save_and_load_file() {
        let dir = tempfile::tempdir().expect("tmpdir");
        let path = dir.path().join("evobrain.toml");
        let cfg = ExperimentConfig::default();
        cfg.save_to_file(&path).unwrap();
        let loaded = ExperimentConfig::load_from_file(&path).unwrap();
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn test_search_paths_order() {
        assert_eq!(
            ExperimentConfig::search_paths(Some("/etc/exp.toml")),
            vec![PathBuf::from("/etc/exp.toml"), PathBuf::from(CONFIG_FILE_NAME)]
        );
        assert_eq!(ExperimentConfig::search_paths(Some("")), vec![PathBuf::from(CONFIG_FILE_NAME)]);
        assert_eq!(ExperimentConfig::search_paths(None), vec![PathBuf::from(CONFIG_FILE_NAME)]);
    }

    #[test]
    fn test_error_messages_name_the_problem() {
        let err = ExperimentConfig::load_from_file(Path::new("/nonexistent/evobrain.toml")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/evobrain.toml"), "{err}");

        let err = ExperimentConfig::from_toml_str("[brain]\ntype = \"elman\"\nhidden_layers = [0]\n").unwrap_err();
        assert!(err.to_string().starts_with("invalid config: "), "{err}");
        assert!(err.to_string().contains("hidden_layers[0]"), "{err}");
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = ExperimentConfig::load_from_file(Path::new("/nonexistent/evobrain.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_, _)));
    }
}
