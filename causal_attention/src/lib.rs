pub mod blocks;
pub mod config;
mod cpu_utils;
pub mod error;
pub mod matrix;

pub use blocks::{AttentionOutput, CausalMask, CausalSelfAttention, Dropout, Linear};
pub use config::{AttentionConfig, MAX_CONTEXT_LENGTH};
pub use error::{AttentionError, Result};
pub use matrix::{Batch, Matrix};
