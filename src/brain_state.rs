//! Structural state: non-learned data a brain needs to interpret a genome.
//!
//! A [`BrainState`] is generated once per configuration (deterministic given
//! a seed), persisted, and shared read-only by every brain decoded with that
//! configuration. For the CTRNN it holds the three connectivity masks; the
//! layout of their `true` entries fixes the genome decode order, so a
//! reloaded state must be bit-identical to the saved one:
//! - masks serialize as `{ shape: [rows, cols], data: [0|1, ...] }`, row-major
//! - the bundle carries an md5 digest over roles, shapes and bits
//! - `load` rejects schema or digest mismatches instead of guessing

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{BrainError, StateError};

/// Current on-disk schema version.
pub const BRAIN_STATE_VERSION: u32 = 1;

/// Role key of the input→neuron mask.
pub const V_MASK: &str = "v_mask";
/// Role key of the neuron→neuron mask.
pub const W_MASK: &str = "w_mask";
/// Role key of the neuron→output mask.
pub const T_MASK: &str = "t_mask";

/// Boolean connectivity mask with its active positions precomputed.
///
/// `active` holds the row-major flat indices of every `true` entry, in scan
/// order. Decoding writes consecutive genome values into exactly those
/// positions, so the mask is scanned once at creation and never again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "MaskRecord", into = "MaskRecord")]
pub struct ConnectionMask {
    bits: Array2<bool>,
    active: Vec<usize>,
}

impl ConnectionMask {
    pub fn from_array(bits: Array2<bool>) -> Self {
        let active = bits
            .iter()
            .enumerate()
            .filter_map(|(i, &on)| on.then_some(i))
            .collect();
        Self { bits, active }
    }

    /// Mask with every entry learnable.
    pub fn dense(rows: usize, cols: usize) -> Self {
        Self::from_array(Array2::from_elem((rows, cols), true))
    }

    pub fn rows(&self) -> usize {
        self.bits.nrows()
    }

    pub fn cols(&self) -> usize {
        self.bits.ncols()
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows(), self.cols())
    }

    #[inline]
    pub fn is_active(&self, row: usize, col: usize) -> bool {
        self.bits[[row, col]]
    }

    /// Number of learnable entries (parameters this mask contributes).
    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Row-major flat indices of the learnable entries.
    pub fn active_indices(&self) -> &[usize] {
        &self.active
    }

    pub fn as_array(&self) -> &Array2<bool> {
        &self.bits
    }

    /// Fraction of entries that are learnable.
    pub fn density(&self) -> f64 {
        let total = self.bits.len();
        if total == 0 {
            0.0
        } else {
            self.active.len() as f64 / total as f64
        }
    }

    fn digest_bytes(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&(self.rows() as u64).to_le_bytes());
        buf.extend_from_slice(&(self.cols() as u64).to_le_bytes());
        buf.extend(self.bits.iter().map(|&b| u8::from(b)));
    }
}

/// Wire form of a mask: shape plus a row-major 0/1 array.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct MaskRecord {
    shape: [usize; 2],
    data: Vec<u8>,
}

impl TryFrom<MaskRecord> for ConnectionMask {
    type Error = StateError;

    fn try_from(record: MaskRecord) -> Result<Self, Self::Error> {
        let [rows, cols] = record.shape;
        let expected = rows
            .checked_mul(cols)
            .ok_or_else(|| StateError::InvalidMask(format!("shape {rows}x{cols} overflows usize")))?;
        if record.data.len() != expected {
            return Err(StateError::InvalidMask(format!(
                "shape {rows}x{cols} needs {expected} entries, found {}",
                record.data.len()
            )));
        }
        if let Some(bad) = record.data.iter().find(|&&v| v > 1) {
            return Err(StateError::InvalidMask(format!(
                "mask entries must be 0 or 1, found {bad}"
            )));
        }
        let bits = Array2::from_shape_vec((rows, cols), record.data.iter().map(|&v| v == 1).collect())
            .map_err(|e| StateError::InvalidMask(e.to_string()))?;
        Ok(Self::from_array(bits))
    }
}

impl From<ConnectionMask> for MaskRecord {
    fn from(mask: ConnectionMask) -> Self {
        MaskRecord {
            shape: [mask.rows(), mask.cols()],
            data: mask.bits.iter().map(|&b| u8::from(b)).collect(),
        }
    }
}

/// Named bundle of structural arrays shared by all brains of one configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrainState {
    /// Format version for forward compatibility.
    pub version: u32,
    /// When the state was generated.
    pub created_at: DateTime<Utc>,
    /// Seed the masks were drawn with, if any.
    pub seed: Option<u64>,
    masks: BTreeMap<String, ConnectionMask>,
    /// md5 hex digest over roles, shapes and mask bits.
    pub digest: String,
}

impl BrainState {
    /// State for brains that need no structural data.
    pub fn empty() -> Self {
        Self::from_masks(None, BTreeMap::new())
    }

    pub fn from_masks(seed: Option<u64>, masks: BTreeMap<String, ConnectionMask>) -> Self {
        let digest = compute_digest(&masks);
        Self {
            version: BRAIN_STATE_VERSION,
            created_at: Utc::now(),
            seed,
            masks,
            digest,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.masks.is_empty()
    }

    /// Look up a mask by role, failing if the state does not carry it.
    pub fn mask(&self, role: &str) -> Result<&ConnectionMask, BrainError> {
        self.masks
            .get(role)
            .ok_or_else(|| BrainError::MissingStructuralState(role.to_string()))
    }

    /// Roles present in the bundle, sorted.
    pub fn roles(&self) -> impl Iterator<Item = &str> {
        self.masks.keys().map(String::as_str)
    }

    /// Recompute the digest and compare it with the stored one.
    pub fn verify(&self) -> Result<(), StateError> {
        if self.version != BRAIN_STATE_VERSION {
            return Err(StateError::SchemaMismatch(self.version, BRAIN_STATE_VERSION));
        }
        let actual = compute_digest(&self.masks);
        if actual != self.digest {
            return Err(StateError::DigestMismatch {
                expected: self.digest.clone(),
                actual,
            });
        }
        Ok(())
    }

    pub fn to_json(&self) -> Result<String, StateError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, StateError> {
        let state: Self = serde_json::from_str(json)?;
        state.verify()?;
        Ok(state)
    }

    /// Save to disk atomically (write temp file, then rename).
    pub fn save(&self, path: &Path) -> Result<(), StateError> {
        let json = serde_json::to_vec(self)?;

        let tmp_path = path.with_extension("json.tmp");
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(&tmp_path, &json)?;
        if let Err(e) = std::fs::rename(&tmp_path, path) {
            let _ = std::fs::remove_file(&tmp_path);
            return Err(e.into());
        }
        info!(path = %path.display(), roles = self.masks.len(), digest = %self.digest, "Brain state saved");
        Ok(())
    }

    /// Load from disk, rejecting schema or digest mismatches.
    pub fn load(path: &Path) -> Result<Self, StateError> {
        let data = std::fs::read_to_string(path)?;
        let state = Self::from_json(&data)?;
        info!(path = %path.display(), roles = state.masks.len(), "Brain state loaded");
        Ok(state)
    }
}

impl Default for BrainState {
    fn default() -> Self {
        Self::empty()
    }
}

fn compute_digest(masks: &BTreeMap<String, ConnectionMask>) -> String {
    let mut buf = Vec::new();
    for (role, mask) in masks {
        buf.extend_from_slice(role.as_bytes());
        buf.push(0);
        mask.digest_bytes(&mut buf);
    }
    format!("{:x}", md5::compute(&buf))
}
