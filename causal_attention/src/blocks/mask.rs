//! Precomputed causal mask.

use crate::config::MAX_CONTEXT_LENGTH;
use crate::error::{AttentionError, Result};
use crate::matrix::Matrix;

/// Upper-triangular boolean mask: `true` strictly above the diagonal, i.e. at
/// every future position a query may not attend to.
#[derive(Clone, Debug, PartialEq)]
pub struct CausalMask {
    size: usize,
    masked: Vec<bool>, // [size * size]
}

impl CausalMask {
    pub fn new(size: usize) -> Result<Self> {
        let cells = size
            .checked_mul(size)
            .filter(|_| size <= MAX_CONTEXT_LENGTH)
            .ok_or_else(|| {
                AttentionError::invalid_config(format!(
                    "causal mask size {size} exceeds {MAX_CONTEXT_LENGTH}"
                ))
            })?;
        let mut masked = vec![false; cells];
        for i in 0..size {
            for j in (i + 1)..size {
                masked[i * size + j] = true;
            }
        }
        Ok(CausalMask { size, masked })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn is_masked(&self, i: usize, j: usize) -> bool {
        self.masked[i * self.size + j]
    }

    /// Fill masked scores with `-inf`, using the top-left window of the mask
    /// that matches the score matrix.
    pub fn apply(&self, scores: &mut Matrix) -> Result<()> {
        let (rows, cols) = scores.shape();
        if rows > self.size || cols > self.size {
            return Err(AttentionError::ContextLengthExceeded {
                max: self.size,
                got: rows.max(cols),
            });
        }
        scores.masked_fill(f32::NEG_INFINITY, |i, j| self.is_masked(i, j));
        Ok(())
    }
}
