//! Matrix decoder: turns "the next K floats" of a flat genome into tensors.
//!
//! Every brain decodes through [`GenomeReader`], which consumes the genome
//! strictly left to right. The read order is the contract shared with each
//! brain's `free_parameter_usage`; `finish()` rejects leftover genes so a
//! drift between accounting and decoding can never pass silently.

use ndarray::{Array1, Array2, Array3};
use rand::Rng;
use rand_distr::{Distribution, Normal};

use crate::brain_state::ConnectionMask;
use crate::error::BrainError;

/// Read a `rows x cols` row-major block starting at `cursor`.
///
/// Returns the block and the cursor just past it.
pub fn read_block(
    genome: &[f64],
    cursor: usize,
    rows: usize,
    cols: usize,
) -> Result<(Array2<f64>, usize), BrainError> {
    let end = checked_end(genome, cursor, checked_count(&[rows, cols])?)?;
    let block = Array2::from_shape_vec((rows, cols), genome[cursor..end].to_vec())
        .map_err(|e| BrainError::config(e.to_string()))?;
    Ok((block, end))
}

fn checked_end(genome: &[f64], cursor: usize, requested: usize) -> Result<usize, BrainError> {
    match cursor.checked_add(requested) {
        Some(end) if end <= genome.len() => Ok(end),
        _ => Err(BrainError::GenomeTooShort {
            cursor,
            requested,
            available: genome.len(),
        }),
    }
}

/// Product of `dims`, or a configuration error if it does not fit in `usize`.
pub fn checked_count(dims: &[usize]) -> Result<usize, BrainError> {
    dims.iter()
        .try_fold(1usize, |acc, &d| acc.checked_mul(d))
        .ok_or_else(|| BrainError::config(format!("parameter count of shape {dims:?} overflows usize")))
}

/// Fail unless `genome` has exactly `expected` values.
pub fn check_size(genome: &[f64], expected: usize) -> Result<(), BrainError> {
    if genome.len() == expected {
        Ok(())
    } else {
        Err(BrainError::GenomeSizeMismatch {
            expected,
            actual: genome.len(),
        })
    }
}

/// Cursor over a genome.
#[derive(Debug)]
pub struct GenomeReader<'a> {
    genome: &'a [f64],
    cursor: usize,
}

impl<'a> GenomeReader<'a> {
    pub fn new(genome: &'a [f64]) -> Self {
        Self { genome, cursor: 0 }
    }

    /// Number of values consumed so far.
    pub fn position(&self) -> usize {
        self.cursor
    }

    pub fn remaining(&self) -> usize {
        self.genome.len() - self.cursor
    }

    fn take(&mut self, n: usize) -> Result<&'a [f64], BrainError> {
        let end = checked_end(self.genome, self.cursor, n)?;
        let slice = &self.genome[self.cursor..end];
        self.cursor = end;
        Ok(slice)
    }

    pub fn read_block(&mut self, rows: usize, cols: usize) -> Result<Array2<f64>, BrainError> {
        let (block, end) = read_block(self.genome, self.cursor, rows, cols)?;
        self.cursor = end;
        Ok(block)
    }

    pub fn read_vector(&mut self, len: usize) -> Result<Array1<f64>, BrainError> {
        Ok(Array1::from(self.take(len)?.to_vec()))
    }

    /// Read one `(rows, cols)` block per gate, stacked as `(gates, rows, cols)`.
    pub fn read_gates(&mut self, gates: usize, rows: usize, cols: usize) -> Result<Array3<f64>, BrainError> {
        let values = self.take(checked_count(&[gates, rows, cols])?)?;
        Array3::from_shape_vec((gates, rows, cols), values.to_vec())
            .map_err(|e| BrainError::config(e.to_string()))
    }

    /// Read one diagonal of length `size` per gate and expand each into a
    /// `(size, size)` diagonal matrix.
    pub fn read_gate_diagonals(&mut self, gates: usize, size: usize) -> Result<Array3<f64>, BrainError> {
        checked_count(&[gates, size, size])?;
        let values = self.take(checked_count(&[gates, size])?)?;
        let mut out = Array3::zeros((gates, size, size));
        for g in 0..gates {
            for i in 0..size {
                out[[g, i, i]] = values[g * size + i];
            }
        }
        Ok(out)
    }

    /// Place the next values into the mask's active positions (row-major
    /// scan order). Inactive positions stay zero.
    pub fn read_masked(&mut self, mask: &ConnectionMask) -> Result<Array2<f64>, BrainError> {
        let values = self.take(mask.active_count())?;
        let mut flat = vec![0.0; mask.as_array().len()];
        for (&idx, &v) in mask.active_indices().iter().zip(values) {
            flat[idx] = v;
        }
        Array2::from_shape_vec(mask.shape(), flat).map_err(|e| BrainError::config(e.to_string()))
    }

    /// Finish decoding; every gene must have been consumed.
    pub fn finish(self) -> Result<(), BrainError> {
        if self.cursor == self.genome.len() {
            Ok(())
        } else {
            Err(BrainError::GenomeSizeMismatch {
                expected: self.cursor,
                actual: self.genome.len(),
            })
        }
    }
}

/// Sample a genome with i.i.d. `N(0, std_dev²)` genes.
pub fn random_genome<R: Rng + ?Sized>(size: usize, std_dev: f64, rng: &mut R) -> Result<Vec<f64>, BrainError> {
    let normal = Normal::new(0.0, std_dev)
        .map_err(|e| BrainError::config(format!("invalid genome std_dev {std_dev}: {e}")))?;
    Ok((0..size).map(|_| normal.sample(rng)).collect())
}
