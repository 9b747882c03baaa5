//! Configuration for a causal self-attention module
use crate::error::{AttentionError, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AttentionConfig {
    pub input_dim: usize,
    pub output_dim: usize,
    /// Longest sequence the causal mask is precomputed for
    #[serde(default = "default_context_length")]
    pub context_length: usize,
    /// Dropout probability on attention weights, only used by `forward_train`
    #[serde(default)]
    pub dropout: f32,
    #[serde(default)]
    pub qkv_bias: bool,
    /// Seed for projection initialization; entropy when absent
    #[serde(default)]
    pub seed: Option<u64>,
}

/// Largest supported context length; the causal mask holds
/// `context_length²` entries.
pub const MAX_CONTEXT_LENGTH: usize = 8192;

fn default_context_length() -> usize {
    1024
}

impl Default for AttentionConfig {
    fn default() -> Self {
        Self {
            input_dim: 3,
            output_dim: 2,
            context_length: 6,
            dropout: 0.0,
            qkv_bias: false,
            seed: None,
        }
    }
}

impl AttentionConfig {
    pub fn new(input_dim: usize, output_dim: usize, context_length: usize) -> Self {
        Self {
            input_dim,
            output_dim,
            context_length,
            ..Self::default()
        }
    }

    pub fn with_dropout(mut self, dropout: f32) -> Self {
        self.dropout = dropout;
        self
    }

    pub fn with_qkv_bias(mut self, qkv_bias: bool) -> Self {
        self.qkv_bias = qkv_bias;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.input_dim == 0 {
            return Err(AttentionError::invalid_config("input_dim must be positive"));
        }
        if self.output_dim == 0 {
            return Err(AttentionError::invalid_config("output_dim must be positive"));
        }
        if self.context_length == 0 {
            return Err(AttentionError::invalid_config(
                "context_length must be positive",
            ));
        }
        if self.context_length > MAX_CONTEXT_LENGTH {
            return Err(AttentionError::invalid_config(format!(
                "context_length must be at most {MAX_CONTEXT_LENGTH}, got {}",
                self.context_length
            )));
        }
        if !(0.0..1.0).contains(&self.dropout) {
            return Err(AttentionError::invalid_config(format!(
                "dropout must be in [0, 1), got {}",
                self.dropout
            )));
        }
        Ok(())
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let config: Self = serde_json::from_reader(reader)?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_fills_defaults() -> Result<()> {
        let config = AttentionConfig::from_json_str(r#"{"input_dim": 3, "output_dim": 2}"#)?;
        assert_eq!(config.context_length, 1024);
        assert_eq!(config.dropout, 0.0);
        assert!(!config.qkv_bias);
        assert_eq!(config.seed, None);
        Ok(())
    }

    #[test]
    fn test_json_full() -> Result<()> {
        let config = AttentionConfig::from_json_str(
            r#"{"input_dim": 8, "output_dim": 4, "context_length": 16,
                "dropout": 0.1, "qkv_bias": true, "seed": 123}"#,
        )?;
        assert_eq!(
            config,
            AttentionConfig::new(8, 4, 16)
                .with_dropout(0.1)
                .with_qkv_bias(true)
                .with_seed(123)
        );
        Ok(())
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(AttentionConfig::new(0, 2, 6).validate().is_err());
        assert!(AttentionConfig::new(3, 0, 6).validate().is_err());
        assert!(AttentionConfig::new(3, 2, 0).validate().is_err());
        assert!(AttentionConfig::new(3, 2, 6).with_dropout(1.0).validate().is_err());
        assert!(AttentionConfig::new(3, 2, 6).with_dropout(-0.1).validate().is_err());
        assert!(AttentionConfig::new(3, 2, 6).with_dropout(0.5).validate().is_ok());
    }

    #[test]
    fn test_validate_caps_context_length() {
        assert!(AttentionConfig::new(3, 2, MAX_CONTEXT_LENGTH).validate().is_ok());
        for context_length in [MAX_CONTEXT_LENGTH + 1, 1usize << 32, usize::MAX] {
            let result = AttentionConfig::new(3, 2, context_length).validate();
            assert!(matches!(result, Err(AttentionError::InvalidConfig { .. })));
        }
    }

    #[test]
    fn test_json_rejects_invalid_config() {
        let result =
            AttentionConfig::from_json_str(r#"{"input_dim": 3, "output_dim": 2, "dropout": 2.0}"#);
        assert!(matches!(result, Err(AttentionError::InvalidConfig { .. })));
    }

    #[test]
    fn test_json_file_round_trip() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("attention.json");
        let config = AttentionConfig::new(4, 2, 32).with_qkv_bias(true).with_seed(7);
        std::fs::write(&path, serde_json::to_string(&config)?)?;
        assert_eq!(AttentionConfig::from_json_file(&path)?, config);
        Ok(())
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = AttentionConfig::from_json_file("/nonexistent/attention.json");
        assert!(matches!(result, Err(AttentionError::Io(_))));
    }
}
