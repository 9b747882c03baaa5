use crate::cpu_utils::matvec_mul_add_bias;
use crate::error::{AttentionError, Result};
use crate::matrix::Matrix;
use rand::Rng;
use rand::distributions::{Distribution, Uniform};
use rayon::prelude::*;

/// Dense projection `in_dim -> out_dim` with an optional additive bias.
#[derive(Clone, Debug)]
pub struct Linear {
    weight: Matrix,          // shape: [out_dim][in_dim]
    bias: Option<Vec<f32>>, // shape: [out_dim]
}

impl Linear {
    pub fn new<R: Rng + ?Sized>(
        in_dim: usize,
        out_dim: usize,
        bias: bool,
        rng: &mut R,
    ) -> Result<Self> {
        if in_dim == 0 || out_dim == 0 {
            return Err(AttentionError::invalid_config(format!(
                "linear dimensions must be positive, got {in_dim}->{out_dim}"
            )));
        }
        // U(-1/sqrt(in), 1/sqrt(in)) for both weight and bias
        let limit = 1.0 / (in_dim as f32).sqrt();
        let dist = Uniform::new(-limit, limit);
        let data: Vec<f32> = (0..out_dim * in_dim).map(|_| dist.sample(rng)).collect();
        let weight = Matrix::from_vec(out_dim, in_dim, data)?;
        let bias = bias.then(|| (0..out_dim).map(|_| dist.sample(rng)).collect());
        Ok(Linear { weight, bias })
    }

    pub fn from_weights(weight: Matrix, bias: Option<Vec<f32>>) -> Result<Self> {
        if weight.rows() == 0 || weight.cols() == 0 {
            return Err(AttentionError::invalid_config("linear weight must be non-empty"));
        }
        if let Some(b) = &bias {
            if b.len() != weight.rows() {
                return Err(AttentionError::LengthMismatch {
                    what: "bias",
                    expected: weight.rows(),
                    got: b.len(),
                });
            }
        }
        Ok(Linear { weight, bias })
    }

    pub fn in_dim(&self) -> usize {
        self.weight.cols()
    }

    pub fn out_dim(&self) -> usize {
        self.weight.rows()
    }

    pub fn weight(&self) -> &Matrix {
        &self.weight
    }

    pub fn bias(&self) -> Option<&[f32]> {
        self.bias.as_deref()
    }

    /// input: [seq][in_dim], output: [seq][out_dim]
    pub fn forward(&self, input: &Matrix) -> Result<Matrix> {
        if input.cols() != self.in_dim() {
            return Err(AttentionError::MatmulDimMismatch {
                m: input.rows(),
                k1: input.cols(),
                k2: self.in_dim(),
                n: self.out_dim(),
            });
        }
        let out_dim = self.out_dim();
        let mut out = Matrix::zeros(input.rows(), out_dim);
        out.as_mut_slice()
            .par_chunks_mut(out_dim)
            .zip(input.as_slice().par_chunks(self.in_dim()))
            .for_each(|(out_row, x)| {
                matvec_mul_add_bias(
                    self.weight.as_slice(),
                    self.in_dim(),
                    x,
                    self.bias.as_deref(),
                    out_row,
                )
            });
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_forward_known_weights() -> Result<()> {
        let weight = Matrix::from_rows(&[vec![1.0, 0.0, 1.0], vec![0.0, 2.0, 0.0]])?;
        let linear = Linear::from_weights(weight, Some(vec![0.5, -0.5]))?;
        let x = Matrix::from_rows(&[vec![1.0, 2.0, 3.0], vec![0.0, 1.0, 0.0]])?;
        let y = linear.forward(&x)?;
        assert_eq!(y.to_rows(), vec![vec![4.5, 3.5], vec![0.5, 1.5]]);
        Ok(())
    }

    #[test]
    fn test_init_is_bounded_and_seeded() -> Result<()> {
        let a = Linear::new(4, 3, true, &mut StdRng::seed_from_u64(7))?;
        let b = Linear::new(4, 3, true, &mut StdRng::seed_from_u64(7))?;
        assert_eq!(a.weight(), b.weight());
        assert_eq!(a.bias(), b.bias());
        let limit = 0.5;
        assert!(a.weight().as_slice().iter().all(|w| w.abs() <= limit));
        assert_eq!(a.bias().map(<[f32]>::len), Some(3));
        Ok(())
    }

    #[test]
    fn test_no_bias() -> Result<()> {
        let linear = Linear::new(3, 2, false, &mut StdRng::seed_from_u64(1))?;
        assert!(linear.bias().is_none());
        let y = linear.forward(&Matrix::zeros(5, 3))?;
        assert_eq!(y.shape(), (5, 2));
        assert!(y.as_slice().iter().all(|v| *v == 0.0));
        Ok(())
    }

    #[test]
    fn test_rejects_wrong_width_and_bias_len() -> Result<()> {
        let linear = Linear::new(3, 2, false, &mut StdRng::seed_from_u64(1))?;
        assert!(linear.forward(&Matrix::zeros(1, 4)).is_err());
        assert!(Linear::from_weights(Matrix::zeros(2, 3), Some(vec![0.0; 3])).is_err());
        assert!(Linear::new(0, 2, false, &mut StdRng::seed_from_u64(1)).is_err());
        Ok(())
    }
}
