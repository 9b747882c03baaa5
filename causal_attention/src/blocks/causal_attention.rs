use super::dropout::Dropout;
use super::linear::Linear;
use super::mask::CausalMask;
use crate::config::AttentionConfig;
use crate::error::{AttentionError, Result};
use crate::matrix::{Batch, Matrix};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use tracing::{debug, info, warn};

/// Context vectors together with the attention weights that produced them.
#[derive(Clone, Debug)]
pub struct AttentionOutput {
    /// [batch][seq][output_dim]
    pub context: Batch,
    /// [batch][seq][seq], row-stochastic, zero above the diagonal
    pub weights: Batch,
}

/// Single-head causal scaled dot-product self-attention.
///
/// Weights, mask and dropout rate are fixed at construction; every forward
/// method takes `&self`, so one instance can serve concurrent callers.
#[derive(Clone, Debug)]
pub struct CausalSelfAttention {
    config: AttentionConfig,
    w_query: Linear,
    w_key: Linear,
    w_value: Linear,
    mask: CausalMask,
    dropout: Dropout,
}

impl CausalSelfAttention {
    pub fn new(config: AttentionConfig) -> Result<Self> {
        config.validate()?;
        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let (d_in, d_out, bias) = (config.input_dim, config.output_dim, config.qkv_bias);
        let w_query = Linear::new(d_in, d_out, bias, &mut rng)?;
        let w_key = Linear::new(d_in, d_out, bias, &mut rng)?;
        let w_value = Linear::new(d_in, d_out, bias, &mut rng)?;
        Self::from_projections(config, w_query, w_key, w_value)
    }

    pub fn from_projections(
        config: AttentionConfig,
        query: Linear,
        key: Linear,
        value: Linear,
    ) -> Result<Self> {
        config.validate()?;
        for (name, linear) in [("query", &query), ("key", &key), ("value", &value)] {
            if linear.in_dim() != config.input_dim || linear.out_dim() != config.output_dim {
                return Err(AttentionError::ProjectionMismatch {
                    name,
                    expected_in: config.input_dim,
                    expected_out: config.output_dim,
                    got_in: linear.in_dim(),
                    got_out: linear.out_dim(),
                });
            }
        }
        let dropout = Dropout::new(config.dropout)?;
        let mask = CausalMask::new(config.context_length)?;
        info!(
            input_dim = config.input_dim,
            output_dim = config.output_dim,
            context_length = config.context_length,
            qkv_bias = config.qkv_bias,
            dropout = config.dropout,
            "causal self-attention ready"
        );
        Ok(CausalSelfAttention {
            config,
            w_query: query,
            w_key: key,
            w_value: value,
            mask,
            dropout,
        })
    }

    pub fn config(&self) -> &AttentionConfig {
        &self.config
    }

    pub fn query(&self) -> &Linear {
        &self.w_query
    }

    pub fn key(&self) -> &Linear {
        &self.w_key
    }

    pub fn value(&self) -> &Linear {
        &self.w_value
    }

    pub fn mask(&self) -> &CausalMask {
        &self.mask
    }

    /// Compute context vectors for a batch (evaluation mode, dropout inert).
    pub fn forward(&self, input: &Batch) -> Result<Batch> {
        Ok(self.forward_with_weights(input)?.context)
    }

    pub fn forward_with_weights(&self, input: &Batch) -> Result<AttentionOutput> {
        self.check_input(input)?;
        debug!(shape = ?input.shape(), "attention forward (eval)");
        let (weights, values): (Vec<Matrix>, Vec<Matrix>) = input
            .par_iter()
            .map(|x| -> Result<(Matrix, Matrix)> {
                let (weights, values) = self.attention_weights(x)?;
                Ok((self.dropout.forward_eval(weights), values))
            })
            .collect::<Result<Vec<_>>>()?
            .into_iter()
            .unzip();
        let weights = Batch::new(weights)?;
        let context = weights.batched_matmul(&Batch::new(values)?)?;
        Ok(AttentionOutput { context, weights })
    }

    /// Training-mode forward: dropout is applied to the attention weights
    /// using the caller's RNG. Batch elements run sequentially so the RNG
    /// stream is reproducible.
    pub fn forward_train<R: Rng + ?Sized>(&self, input: &Batch, rng: &mut R) -> Result<Batch> {
        self.check_input(input)?;
        debug!(shape = ?input.shape(), p = self.dropout.p(), "attention forward (train)");
        let mut context = Vec::with_capacity(input.len());
        for x in input.iter() {
            let (mut weights, values) = self.attention_weights(x)?;
            self.dropout.forward_train(&mut weights, rng);
            context.push(weights.matmul(&values)?);
        }
        Batch::new(context)
    }

    fn check_input(&self, input: &Batch) -> Result<()> {
        let (batch, seq_len, dim) = input.shape();
        // Empty sequences carry no feature width to check
        if batch == 0 || seq_len == 0 {
            return Ok(());
        }
        if dim != self.config.input_dim {
            warn!(expected = self.config.input_dim, got = dim, "input width rejected");
            return Err(AttentionError::InputDimMismatch {
                expected: self.config.input_dim,
                got: dim,
            });
        }
        if seq_len > self.config.context_length {
            warn!(max = self.config.context_length, got = seq_len, "sequence length rejected");
            return Err(AttentionError::ContextLengthExceeded {
                max: self.config.context_length,
                got: seq_len,
            });
        }
        Ok(())
    }

    /// Masked, scaled, softmaxed attention weights for one sequence, plus its
    /// value projection.
    fn attention_weights(&self, x: &Matrix) -> Result<(Matrix, Matrix)> {
        if x.rows() == 0 {
            return Ok((Matrix::zeros(0, 0), Matrix::zeros(0, self.config.output_dim)));
        }
        let queries = self.w_query.forward(x)?;
        let keys = self.w_key.forward(x)?;
        let values = self.w_value.forward(x)?;

        let mut scores = queries.matmul_transposed(&keys)?; // [seq][seq]
        self.mask.apply(&mut scores)?;
        scores.scale_in_place(1.0 / (keys.cols() as f32).sqrt());
        scores.softmax_rows_in_place();
        Ok((scores, values))
    }
}
