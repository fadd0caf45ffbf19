//! Concrete AI provider implementations

#[cfg(feature = "gemini")]
pub mod gemini;

#[cfg(feature = "gemini")]
pub use gemini::{GeminiConfig, GeminiProvider};
