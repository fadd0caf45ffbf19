//! AI client abstraction layer for research-rs
//!
//! This crate provides a provider-agnostic way to turn a prompt into text.
//! It includes:
//!
//! - The [`AiClient`] trait used by the research engine
//! - Generation parameters and token usage types
//! - The error type with its mapping onto [`research_core::Error`]
//! - Concrete provider implementations (behind feature flags)

pub mod error;
pub mod generation;
pub mod provider;

// Re-export main types
pub use error::{LLMError, Result};
pub use generation::{GenerationConfig, TokenUsage};
pub use provider::AiClient;

// Provider implementations (feature-gated)
#[cfg(feature = "gemini")]
pub mod providers;
