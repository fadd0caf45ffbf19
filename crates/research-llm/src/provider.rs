//! AI client trait definition

use crate::Result;
use async_trait::async_trait;

/// Trait for generative-AI clients
///
/// Implementations send a single prompt to a text-generation service and
/// return the raw text of the answer. Structure is imposed later by the
/// research engine's parser, not here.
#[async_trait]
pub trait AiClient: Send + Sync {
    /// Generate text for a prompt
    ///
    /// # Arguments
    ///
    /// * `prompt` - The full user prompt
    ///
    /// # Returns
    ///
    /// The generated text, or an error classifying why the provider refused
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Get the provider name (e.g., "gemini")
    fn name(&self) -> &'static str;
}
