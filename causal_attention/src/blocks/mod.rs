pub mod causal_attention;
pub mod dropout;
pub mod linear;
pub mod mask;

pub use causal_attention::{AttentionOutput, CausalSelfAttention};
pub use dropout::Dropout;
pub use linear::Linear;
pub use mask::CausalMask;
