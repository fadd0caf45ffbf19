//! Google Gemini provider implementation
//!
//! This module implements the AiClient trait for Google's Gemini models
//! through the REST `generateContent` endpoint.
//! See: https://ai.google.dev/api/generate-content
//!
//! # Examples
//!
//! ```no_run
//! use research_llm::AiClient;
//! use research_llm::providers::{GeminiConfig, GeminiProvider};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = GeminiConfig::new("AIza...")
//!         .with_model("gemini-1.5-flash-latest")
//!         .with_timeout(60);
//!
//!     let provider = GeminiProvider::with_config(config)?;
//!     let text = provider.generate("Summarize the state of solid-state batteries").await?;
//!     println!("{text}");
//!
//!     Ok(())
//! }
//! ```

use crate::{AiClient, GenerationConfig, LLMError, Result, TokenUsage};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument, warn};

const DEFAULT_GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-pro-latest";
const DEFAULT_TIMEOUT_SECS: u64 = 120;
const API_KEY_HEADER: &str = "x-goog-api-key";

const SAFETY_CATEGORIES: [&str; 4] = [
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
];
const SAFETY_THRESHOLD: &str = "BLOCK_MEDIUM_AND_ABOVE";

/// Configuration for Gemini provider
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    /// API key for authentication
    pub api_key: String,

    /// Base URL of the models collection
    /// (default: "https://generativelanguage.googleapis.com/v1beta/models")
    pub api_base: String,

    /// Model name (default: "gemini-1.5-pro-latest")
    pub model: String,

    /// Request timeout in seconds (default: 120)
    pub timeout_secs: u64,

    /// Sampling parameters
    pub generation: GenerationConfig,

    /// Optional system instruction sent with every request
    pub system_prompt: Option<String>,
}

impl GeminiConfig {
    /// Create a new config with the given API key and default settings
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_base: DEFAULT_GEMINI_API_BASE.to_string(),
            model: DEFAULT_GEMINI_MODEL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            generation: GenerationConfig::default(),
            system_prompt: None,
        }
    }

    /// Set custom API base URL
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// Set the model name
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set request timeout in seconds
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Set sampling parameters
    pub fn with_generation(mut self, generation: GenerationConfig) -> Self {
        self.generation = generation;
        self
    }

    /// Set the system instruction
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }
}

/// Google Gemini provider
pub struct GeminiProvider {
    client: Client,
    config: GeminiConfig,
}

impl GeminiProvider {
    /// Create a new Gemini provider with custom configuration
    ///
    /// Fails with [`LLMError::ConfigurationError`] when the API key is blank.
    pub fn with_config(config: GeminiConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(LLMError::ConfigurationError(
                "Gemini API key is empty".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| LLMError::ConfigurationError(format!("HTTP client: {e}")))?;

        Ok(Self { client, config })
    }

    /// Create a new Gemini provider with API key and default settings
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_config(GeminiConfig::new(api_key))
    }

    /// Get the current configuration
    pub fn config(&self) -> &GeminiConfig {
        &self.config
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/{}:generateContent",
            self.config.api_base.trim_end_matches('/'),
            self.config.model
        )
    }

    fn build_request(&self, prompt: &str) -> GeminiRequest {
        let generation = self.config.generation;

        GeminiRequest {
            system_instruction: self.config.system_prompt.as_ref().map(|text| GeminiContent {
                role: None,
                parts: vec![GeminiPart { text: text.clone() }],
            }),
            contents: vec![GeminiContent {
                role: Some("user".to_string()),
                parts: vec![GeminiPart {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: GeminiGenerationConfig {
                max_output_tokens: generation.max_output_tokens,
                temperature: generation.temperature,
                top_k: generation.top_k,
                top_p: generation.top_p,
            },
            safety_settings: SAFETY_CATEGORIES
                .iter()
                .map(|category| SafetySetting {
                    category: (*category).to_string(),
                    threshold: SAFETY_THRESHOLD.to_string(),
                })
                .collect(),
        }
    }

    fn transport_error(&self, err: reqwest::Error) -> LLMError {
        if err.is_timeout() {
            LLMError::Timeout(self.config.timeout_secs)
        } else {
            LLMError::Network(err.without_url().to_string())
        }
    }
}

#[async_trait]
impl AiClient for GeminiProvider {
    #[instrument(skip(self, prompt), fields(model = %self.config.model, prompt_len = prompt.len()))]
    async fn generate(&self, prompt: &str) -> Result<String> {
        debug!("Sending request to Gemini API at {}", self.config.api_base);

        let request = self.build_request(prompt);

        let response = self
            .client
            .post(self.endpoint())
            .header(API_KEY_HEADER, &self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        // Handle errors
        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "Gemini API returned an error");
            return Err(classify_error(status.as_u16(), &error_text, &self.config.model));
        }

        let body = response.text().await.map_err(|e| self.transport_error(e))?;
        let gemini_response: GeminiResponse = serde_json::from_str(&body).map_err(|e| {
            LLMError::UnexpectedResponse(format!("Failed to parse response: {e}"))
        })?;

        let usage = gemini_response.token_usage();
        let text = extract_text(gemini_response)?;

        debug!(
            "Received response - {} chars, tokens: {}/{}",
            text.len(),
            usage.input_tokens,
            usage.output_tokens
        );

        Ok(text)
    }

    fn name(&self) -> &'static str {
        "gemini"
    }
}

// ============================================================================
// Gemini-specific request types
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    contents: Vec<GeminiContent>,
    generation_config: GeminiGenerationConfig,
    safety_settings: Vec<SafetySetting>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    max_output_tokens: u32,
    temperature: f32,
    top_k: u32,
    top_p: f32,
}

#[derive(Debug, Serialize)]
struct SafetySetting {
    category: String,
    threshold: String,
}

// ============================================================================
// Gemini-specific response types
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    prompt_feedback: Option<PromptFeedback>,
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    content: Option<GeminiContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: usize,
    #[serde(default)]
    candidates_token_count: usize,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorBody {
    error: GeminiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorDetail {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
}

impl GeminiResponse {
    fn token_usage(&self) -> TokenUsage {
        self.usage_metadata
            .as_ref()
            .map(|usage| TokenUsage {
                input_tokens: usage.prompt_token_count,
                output_tokens: usage.candidates_token_count,
            })
            .unwrap_or_default()
    }
}

// ============================================================================
// Conversion functions
// ============================================================================

/// Pull the generated text out of the first candidate
fn extract_text(response: GeminiResponse) -> Result<String> {
    let block_reason = response
        .prompt_feedback
        .and_then(|feedback| feedback.block_reason);

    let Some(candidate) = response.candidates.into_iter().next() else {
        return Err(LLMError::ContentBlocked(block_reason.unwrap_or_else(|| {
            "no candidates returned; the prompt may have been filtered".to_string()
        })));
    };

    let text: String = candidate
        .content
        .map(|content| content.parts.into_iter().map(|part| part.text).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(match candidate.finish_reason.as_deref() {
            Some(reason @ ("SAFETY" | "RECITATION" | "BLOCKLIST" | "PROHIBITED_CONTENT")) => {
                LLMError::ContentBlocked(reason.to_string())
            }
            _ => LLMError::UnexpectedResponse("Candidate contained no text".to_string()),
        });
    }

    Ok(text)
}

/// Map an error status and body onto an [`LLMError`]
fn classify_error(status: u16, body: &str, model: &str) -> LLMError {
    let (message, api_status) = serde_json::from_str::<GeminiErrorBody>(body).map_or_else(
        |_| (body.trim().to_string(), String::new()),
        |parsed| (parsed.error.message, parsed.error.status),
    );

    let invalid_key = body.contains("API_KEY_INVALID") || message.contains("API key not valid");

    match status {
        401 | 403 => LLMError::AuthenticationFailed(message),
        400 if invalid_key => LLMError::AuthenticationFailed(message),
        429 => LLMError::RateLimitExceeded(message),
        _ if api_status == "RESOURCE_EXHAUSTED" => LLMError::RateLimitExceeded(message),
        404 => LLMError::ModelNotFound(model.to_string()),
        400 => LLMError::InvalidRequest(message),
        502..=504 => LLMError::Network(format!("HTTP {status}: {message}")),
        _ => LLMError::RequestFailed(format!("HTTP {status}: {message}")),
    }
}

// ============================================================================
// Tests
// ============================================================================
