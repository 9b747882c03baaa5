//! Error types for the attention kernel and its configuration.

/// Crate result type
pub type Result<T> = std::result::Result<T, AttentionError>;

#[derive(Debug, thiserror::Error)]
pub enum AttentionError {
    /// Input feature width disagrees with the configured input dimension
    #[error("input dimension mismatch: expected {expected}, got {got}")]
    InputDimMismatch { expected: usize, got: usize },

    /// Sequence is longer than the precomputed causal mask
    #[error("sequence length {got} exceeds context length {max}")]
    ContextLengthExceeded { max: usize, got: usize },

    /// An element count disagrees with the declared size
    #[error("{what} length mismatch: expected {expected}, got {got}")]
    LengthMismatch {
        what: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("matmul dimension mismatch: [{m}x{k1}] @ [{k2}x{n}]")]
    MatmulDimMismatch {
        m: usize,
        k1: usize,
        k2: usize,
        n: usize,
    },

    /// A row or batch element has a different shape than the first one
    #[error("ragged input at index {index}: expected {expected:?}, got {got:?}")]
    RaggedBatch {
        index: usize,
        expected: (usize, usize),
        got: (usize, usize),
    },

    #[error("invalid config: {reason}")]
    InvalidConfig { reason: String },

    /// A caller-supplied projection does not fit the configured dimensions
    #[error("{name} projection is {got_in}->{got_out}, expected {expected_in}->{expected_out}")]
    ProjectionMismatch {
        name: &'static str,
        expected_in: usize,
        expected_out: usize,
        got_in: usize,
        got_out: usize,
    },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AttentionError {
    pub(crate) fn invalid_config(reason: impl Into<String>) -> Self {
        AttentionError::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// True for the caller-contract violations raised by a forward pass.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            AttentionError::InputDimMismatch { .. } | AttentionError::ContextLengthExceeded { .. }
        )
    }
}
