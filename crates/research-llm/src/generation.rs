//! Generation parameters and usage accounting

use serde::{Deserialize, Serialize};

/// Sampling parameters sent with every generation request
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Maximum tokens to generate
    pub max_output_tokens: u32,

    /// Sampling temperature (0.0-2.0)
    pub temperature: f32,

    /// Top-k sampling cutoff
    pub top_k: u32,

    /// Nucleus sampling cutoff (0.0-1.0)
    pub top_p: f32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_output_tokens: 4000,
            temperature: 0.7,
            top_k: 40,
            top_p: 0.95,
        }
    }
}

impl GenerationConfig {
    /// Set the maximum number of output tokens
    pub fn with_max_output_tokens(mut self, tokens: u32) -> Self {
        self.max_output_tokens = tokens;
        self
    }

    /// Set the sampling temperature, clamped to 0.0-2.0
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature.clamp(0.0, 2.0);
        self
    }

    /// Set the top-k cutoff
    pub fn with_top_k(mut self, top_k: u32) -> Self {
        self.top_k = top_k;
        self
    }

    /// Set the top-p cutoff, clamped to 0.0-1.0
    pub fn with_top_p(mut self, top_p: f32) -> Self {
        self.top_p = top_p.clamp(0.0, 1.0);
        self
    }
}

/// Token usage statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Number of prompt tokens
    pub input_tokens: usize,

    /// Number of generated tokens
    pub output_tokens: usize,
}

impl TokenUsage {
    /// Total tokens used (input + output)
    pub fn total(&self) -> usize {
        self.input_tokens + self.output_tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = GenerationConfig::default();
        assert_eq!(config.max_output_tokens, 4000);
        assert_eq!(config.top_k, 40);
    }

    #[test]
    fn test_builder_clamps() {
        let config = GenerationConfig::default()
            .with_temperature(5.0)
            .with_top_p(-1.0)
            .with_max_output_tokens(50);

        assert!((config.temperature - 2.0).abs() < f32::EPSILON);
        assert!(config.top_p.abs() < f32::EPSILON);
        assert_eq!(config.max_output_tokens, 50);
    }

    #[test]
    fn test_token_usage_total() {
        let usage = TokenUsage {
            input_tokens: 120,
            output_tokens: 880,
        };
        assert_eq!(usage.total(), 1000);
    }
}
