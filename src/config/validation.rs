//! Config validation: unknown-key detection with Levenshtein suggestions
//! and sanity-range checks.
//!
//! Two-pass parse approach: first deserialize raw TOML into `toml::Value`,
//! walk the key tree, compare against known field names, and emit warnings
//! with "did you mean?" suggestions. Then proceed with normal serde
//! deserialization. Warnings never break existing configs.

use std::collections::HashSet;

use super::brain::{BrainConfig, CtrnnConfig, MaskConfig, MaskKind};
use super::defaults::LARGE_LAYER_WARNING;
use super::experiment::ExperimentConfig;

/// A non-fatal config warning (typo, suspicious value).
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub field: String,
    pub message: String,
    pub suggestion: Option<String>,
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(ref s) = self.suggestion {
            write!(f, " (did you mean '{s}'?)")?;
        }
        Ok(())
    }
}

// ============================================================================
// Known Config Keys
// ============================================================================

/// Returns the complete set of valid dotted key paths for ExperimentConfig.
///
/// `[brain]` is a tagged union, so its key set is the union over all brain
/// kinds. Any new config field must be added here too.
pub fn known_config_keys() -> HashSet<&'static str> {
    let keys: &[&str] = &[
        "seed",
        "brain_state_path",
        // [io]
        "io",
        "io.input_size",
        "io.output_size",
        // [brain]
        "brain",
        "brain.type",
        "brain.hidden_layers",
        "brain.activation",
        "brain.use_bias",
        "brain.diagonal_hidden_to_hidden",
        "brain.number_neurons",
        "brain.delta_t",
        "brain.alpha",
        "brain.clip",
        "brain.differential_equation",
        "brain.neuron_activation",
        "brain.optimize_x0",
        "brain.negative_diagonal",
        // [brain.*_mask]
        "brain.v_mask",
        "brain.v_mask.kind",
        "brain.v_mask.density",
        "brain.v_mask.force_diagonal",
        "brain.w_mask",
        "brain.w_mask.kind",
        "brain.w_mask.density",
        "brain.w_mask.force_diagonal",
        "brain.t_mask",
        "brain.t_mask.kind",
        "brain.t_mask.density",
        "brain.t_mask.force_diagonal",
        // [probe]
        "probe",
        "probe.genomes",
        "probe.steps",
        "probe.genome_std_dev",
        "probe.observation_scale",
    ];
    keys.iter().copied().collect()
}

// ============================================================================
// TOML Key Walking
// ============================================================================

/// Recursively walks a `toml::Value` tree and collects all dotted key paths.
///
/// For example, a table `{ a = { b = 1, c = 2 } }` yields:
/// `["a", "a.b", "a.c"]`
pub fn walk_toml_keys(value: &toml::Value, prefix: &str) -> Vec<String> {
    let mut keys = Vec::new();
    if let Some(table) = value.as_table() {
        for (k, v) in table {
            let path = if prefix.is_empty() {
                k.clone()
            } else {
                format!("{prefix}.{k}")
            };
            keys.push(path.clone());
            if v.is_table() {
                keys.extend(walk_toml_keys(v, &path));
            }
        }
    }
    keys
}

// ============================================================================
// Levenshtein Distance
// ============================================================================

/// Compute the Levenshtein edit distance between two strings.
fn levenshtein(a: &str, b: &str) -> usize {
    let b_chars: Vec<char> = b.chars().collect();
    let b_len = b_chars.len();
    if a.is_empty() {
        return b_len;
    }
    if b_len == 0 {
        return a.chars().count();
    }

    let mut prev: Vec<usize> = (0..=b_len).collect();
    let mut curr = vec![0; b_len + 1];

    for (i, ca) in a.chars().enumerate() {
        curr[0] = i + 1;
        for (j, &cb) in b_chars.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b_len]
}

/// Suggest the closest known key for an unknown key, if within edit distance 3.
pub fn suggest_correction(unknown: &str, known: &HashSet<&str>) -> Option<String> {
    let mut best: Option<(&str, usize)> = None;
    for &k in known {
        let dist = levenshtein(unknown, k);
        if dist > 3 {
            continue;
        }
        // Ties break alphabetically so suggestions are stable across runs.
        let better = match best {
            None => true,
            Some((bk, bd)) => dist < bd || (dist == bd && k < bk),
        };
        if better {
            best = Some((k, dist));
        }
    }
    best.map(|(k, _)| k.to_string())
}

// ============================================================================
// Unknown Key Validation (entry point)
// ============================================================================

/// Parse a raw TOML string and return warnings for any unknown config keys.
///
/// This does NOT fail on unknown keys, it only warns.
pub fn validate_unknown_keys(raw_toml: &str) -> Vec<ValidationWarning> {
    let value: toml::Value = match raw_toml.parse() {
        Ok(v) => v,
        Err(_) => return Vec::new(), // parse errors are handled by serde later
    };

    let known = known_config_keys();
    walk_toml_keys(&value, "")
        .into_iter()
        .filter(|key| !known.contains(key.as_str()))
        .map(|key| {
            let suggestion = suggest_correction(&key, &known);
            ValidationWarning {
                message: format!("Unknown config key '{key}'"),
                field: key,
                suggestion,
            }
        })
        .collect()
}

// ============================================================================
// Range Validation
// ============================================================================

fn warn(warnings: &mut Vec<ValidationWarning>, field: &str, message: String) {
    warnings.push(ValidationWarning {
        field: field.to_string(),
        message,
        suggestion: None,
    });
}

/// Validate value ranges on a parsed ExperimentConfig.
///
/// Returns (errors, warnings): errors are impossible values that must
/// prevent startup; warnings are suspicious but not fatal.
pub fn validate_ranges(config: &ExperimentConfig) -> (Vec<String>, Vec<ValidationWarning>) {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    if let Err(e) = config.io.validate() {
        errors.push(format!("io: {e}"));
    }
    if let Err(e) = config.brain.validate() {
        errors.push(format!("brain: {e}"));
    }

    let layers: &[usize] = match &config.brain {
        BrainConfig::FeedForward(c) => &c.hidden_layers,
        BrainConfig::Elman(c) | BrainConfig::Gru(c) | BrainConfig::Lstm(c) => &c.hidden_layers,
        BrainConfig::Ctrnn(c) => {
            check_ctrnn(c, &mut warnings);
            &[]
        }
    };
    for (i, &n) in layers.iter().enumerate() {
        if n > LARGE_LAYER_WARNING {
            warn(
                &mut warnings,
                "brain.hidden_layers",
                format!("hidden_layers[{i}] = {n} is unusually large for an evolved controller"),
            );
        }
    }

    let p = &config.probe;
    if p.genomes == 0 {
        errors.push("probe.genomes must be > 0".to_string());
    }
    if !p.genome_std_dev.is_finite() || p.genome_std_dev <= 0.0 {
        errors.push(format!(
            "probe.genome_std_dev = {} must be a finite value > 0",
            p.genome_std_dev
        ));
    }
    if !p.observation_scale.is_finite() || p.observation_scale < 0.0 {
        errors.push(format!(
            "probe.observation_scale = {} must be a finite value >= 0",
            p.observation_scale
        ));
    }

    (errors, warnings)
}

fn check_ctrnn(c: &CtrnnConfig, warnings: &mut Vec<ValidationWarning>) {
    // Explicit Euler on the leak term alone oscillates once alpha * dt > 1.
    if c.alpha * c.delta_t > 1.0 {
        warn(
            warnings,
            "brain.delta_t",
            format!(
                "alpha * delta_t = {:.3} exceeds 1; the Euler step overshoots the leak term",
                c.alpha * c.delta_t
            ),
        );
    }
    if c.delta_t > 1.0 {
        warn(
            warnings,
            "brain.delta_t",
            format!("delta_t = {} is coarse for forward Euler integration", c.delta_t),
        );
    }
    for (role, mask) in [("v_mask", &c.v_mask), ("w_mask", &c.w_mask), ("t_mask", &c.t_mask)] {
        check_mask(role, mask, warnings);
    }
    if c.number_neurons > LARGE_LAYER_WARNING {
        warn(
            warnings,
            "brain.number_neurons",
            format!("number_neurons = {} is unusually large", c.number_neurons),
        );
    }
}

fn check_mask(role: &str, mask: &MaskConfig, warnings: &mut Vec<ValidationWarning>) {
    if mask.kind == MaskKind::Dense && (mask.density - 1.0).abs() > f64::EPSILON {
        warn(
            warnings,
            &format!("brain.{role}.density"),
            format!("{role}.density = {} is ignored for dense masks", mask.density),
        );
    }
    if mask.kind == MaskKind::Random && mask.density == 0.0 && !mask.force_diagonal {
        warn(
            warnings,
            &format!("brain.{role}.density"),
            format!("{role}.density = 0 leaves the mask without learnable entries"),
        );
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levenshtein_identical() {
        assert_eq!(levenshtein("hello", "hello"), 0);
    }

    #[test]
    fn test_levenshtein_one_edit() {
        assert_eq!(levenshtein("nuber_neurons", "number_neurons"), 1);
    }

    #[test]
    fn test_levenshtein_empty() {
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("abc", ""), 3);
    }

    #[test]
    fn test_walk_toml_keys_nested() {
        let toml: toml::Value = r#"
            [brain]
            type = "ctrnn"
            [brain.w_mask]
            density = 0.5
        "#
        .parse()
        .unwrap();
        let keys = walk_toml_keys(&toml, "");
        assert!(keys.contains(&"brain".to_string()));
        assert!(keys.contains(&"brain.w_mask".to_string()));
        assert!(keys.contains(&"brain.w_mask.density".to_string()));
    }

    #[test]
    fn test_suggestion_for_typo() {
        let known = known_config_keys();
        assert_eq!(
            suggest_correction("brain.delta_tt", &known).as_deref(),
            Some("brain.delta_t")
        );
        assert!(suggest_correction("completely.unrelated.key", &known).is_none());
    }

    #[test]
    fn test_ctrnn_range_warnings() {
        let mut cfg = ExperimentConfig::default();
        cfg.brain = BrainConfig::Ctrnn(CtrnnConfig {
            alpha: 30.0,
            delta_t: 0.1,
            ..CtrnnConfig::default()
        });
        let (errors, warnings) = validate_ranges(&cfg);
        assert!(errors.is_empty(), "{errors:?}");
        assert!(warnings.iter().any(|w| w.message.contains("alpha * delta_t")));
    }

    #[test]
    fn test_range_errors_collected() {
        let mut cfg = ExperimentConfig::default();
        cfg.io.input_size = 0;
        cfg.probe.genomes = 0;
        let (errors, _) = validate_ranges(&cfg);
        assert_eq!(errors.len(), 2, "{errors:?}");
    }
}
