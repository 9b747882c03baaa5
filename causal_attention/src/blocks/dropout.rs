//! Dropout on attention weights.

use crate::error::{AttentionError, Result};
use crate::matrix::Matrix;
use rand::Rng;

/// Inverted dropout: during training each element is zeroed with probability
/// `p` and survivors are scaled by `1 / (1 - p)`. Evaluation is the identity.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Dropout {
    p: f32,
}

impl Dropout {
    pub fn new(p: f32) -> Result<Self> {
        if !(0.0..1.0).contains(&p) {
            return Err(AttentionError::invalid_config(format!(
                "dropout probability must be in [0, 1), got {p}"
            )));
        }
        Ok(Dropout { p })
    }

    pub fn p(&self) -> f32 {
        self.p
    }

    pub fn is_identity(&self) -> bool {
        self.p == 0.0
    }

    /// Evaluation mode: weights pass through unchanged.
    pub fn forward_eval(&self, weights: Matrix) -> Matrix {
        weights
    }

    pub fn forward_train<R: Rng + ?Sized>(&self, weights: &mut Matrix, rng: &mut R) {
        if self.is_identity() {
            return;
        }
        let scale = 1.0 / (1.0 - self.p);
        for w in weights.as_mut_slice() {
            if rng.gen_bool(f64::from(self.p)) {
                *w = 0.0;
            } else {
                *w *= scale;
            }
        }
    }
}
