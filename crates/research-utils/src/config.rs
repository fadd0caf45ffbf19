//! Configuration management utilities
//!
//! Configuration is read once at startup (usually from the environment) and
//! passed by value to the clients that need it. Nothing here is global.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Default Gemini model
pub const DEFAULT_MODEL: &str = "gemini-1.5-pro-latest";

const DEFAULT_API_TIMEOUT_SECS: u64 = 120;
const DEFAULT_SOURCE_TIMEOUT_SECS: u64 = 30;
const DEFAULT_NEWS_LIMIT: usize = 10;
const DEFAULT_NEWS_DAYS_BACK: u32 = 7;
const MAX_NEWS_LIMIT: usize = 100;
const MAX_NEWS_DAYS_BACK: u32 = 3650;

/// Environment variables read by [`Config::from_env`]
pub mod env {
    pub const GEMINI_API_KEY: &str = "GEMINI_API_KEY";
    pub const GOOGLE_API_KEY: &str = "GOOGLE_API_KEY";
    pub const NEWS_API_KEY: &str = "NEWS_API_KEY";
    pub const MARKET_API_KEY: &str = "MARKET_API_KEY";
    pub const FINNHUB_API_KEY: &str = "FINNHUB_API_KEY";
    pub const MODEL: &str = "RESEARCH_MODEL";
    pub const TIMEOUT_SECS: &str = "RESEARCH_TIMEOUT_SECS";
    pub const NEWS_LIMIT: &str = "RESEARCH_NEWS_LIMIT";
    pub const NEWS_DAYS: &str = "RESEARCH_NEWS_DAYS";
    pub const LOG_FORMAT: &str = "RESEARCH_LOG_FORMAT";
}

/// Configuration errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A variable is present but cannot be parsed
    #[error("Invalid value for {key}: {value:?} ({reason})")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },

    /// The assembled configuration is inconsistent
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Result type for configuration operations
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Tracing output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Pretty,
    /// One JSON object per event
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown log format '{other}', expected pretty or json")),
        }
    }
}

/// API keys for the three external services
///
/// A missing key disables the corresponding collaborator. `Debug` output
/// never shows key material.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiKeys {
    /// Google Gemini key (required for research)
    pub gemini: Option<String>,
    /// NewsAPI key
    pub news: Option<String>,
    /// Finnhub key
    pub market: Option<String>,
}

impl fmt::Debug for ApiKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mask = |key: &Option<String>| if key.is_some() { "<set>" } else { "<unset>" };
        f.debug_struct("ApiKeys")
            .field("gemini", &mask(&self.gemini))
            .field("news", &mask(&self.news))
            .field("market", &mask(&self.market))
            .finish()
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Keys for the AI, news and market services
    pub api_keys: ApiKeys,
    /// Gemini model name
    pub model: String,
    /// Timeout for AI requests
    pub api_timeout: Duration,
    /// Timeout for news and market requests
    pub source_timeout: Duration,
    /// Maximum number of news articles per report (1-100)
    pub news_limit: usize,
    /// How far back news searches reach, in days
    pub news_days_back: u32,
    /// Tracing output format
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_keys: ApiKeys::default(),
            model: DEFAULT_MODEL.to_string(),
            api_timeout: Duration::from_secs(DEFAULT_API_TIMEOUT_SECS),
            source_timeout: Duration::from_secs(DEFAULT_SOURCE_TIMEOUT_SECS),
            news_limit: DEFAULT_NEWS_LIMIT,
            news_days_back: DEFAULT_NEWS_DAYS_BACK,
            log_format: LogFormat::Pretty,
        }
    }
}

impl Config {
    /// Create a new configuration builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Load configuration from process environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    ///
    /// Blank values are treated as absent.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let mut builder = Config::builder().api_keys(ApiKeys {
            gemini: get(env::GEMINI_API_KEY).or_else(|| get(env::GOOGLE_API_KEY)),
            news: get(env::NEWS_API_KEY),
            market: get(env::MARKET_API_KEY).or_else(|| get(env::FINNHUB_API_KEY)),
        });

        if let Some(model) = get(env::MODEL) {
            builder = builder.model(model);
        }
        if let Some(value) = get(env::TIMEOUT_SECS) {
            let secs = parse_number(env::TIMEOUT_SECS, &value)?;
            builder = builder.api_timeout(Duration::from_secs(secs));
        }
        if let Some(value) = get(env::NEWS_LIMIT) {
            builder = builder.news_limit(parse_number(env::NEWS_LIMIT, &value)?);
        }
        if let Some(value) = get(env::NEWS_DAYS) {
            builder = builder.news_days_back(parse_number(env::NEWS_DAYS, &value)?);
        }
        if let Some(value) = get(env::LOG_FORMAT) {
            let format = value.parse::<LogFormat>().map_err(|reason| ConfigError::InvalidValue {
                key: env::LOG_FORMAT,
                value: value.clone(),
                reason,
            })?;
            builder = builder.log_format(format);
        }

        builder.build()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.model.trim().is_empty() {
            return Err(ConfigError::Invalid("model must not be empty".to_string()));
        }

        if self.api_timeout.is_zero() || self.source_timeout.is_zero() {
            return Err(ConfigError::Invalid(
                "timeouts must be greater than 0".to_string(),
            ));
        }

        if !(1..=MAX_NEWS_LIMIT).contains(&self.news_limit) {
            return Err(ConfigError::Invalid(format!(
                "news_limit must be between 1 and {MAX_NEWS_LIMIT}, got {}",
                self.news_limit
            )));
        }

        if !(1..=MAX_NEWS_DAYS_BACK).contains(&self.news_days_back) {
            return Err(ConfigError::Invalid(format!(
                "news_days_back must be between 1 and {MAX_NEWS_DAYS_BACK}, got {}",
                self.news_days_back
            )));
        }

        Ok(())
    }
}

fn parse_number<T>(key: &'static str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    value.parse().map_err(|e: T::Err| ConfigError::InvalidValue {
        key,
        value: value.to_string(),
        reason: e.to_string(),
    })
}

/// Builder for Config
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    api_keys: ApiKeys,
    model: Option<String>,
    api_timeout: Option<Duration>,
    source_timeout: Option<Duration>,
    news_limit: Option<usize>,
    news_days_back: Option<u32>,
    log_format: Option<LogFormat>,
}

impl ConfigBuilder {
    /// Set all API keys at once
    pub fn api_keys(mut self, keys: ApiKeys) -> Self {
        self.api_keys = keys;
        self
    }

    /// Set the Gemini API key
    pub fn gemini_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_keys.gemini = Some(key.into());
        self
    }

    /// Set the NewsAPI key
    pub fn news_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_keys.news = Some(key.into());
        self
    }

    /// Set the Finnhub key
    pub fn market_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_keys.market = Some(key.into());
        self
    }

    /// Set the Gemini model
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Set the AI request timeout
    pub fn api_timeout(mut self, timeout: Duration) -> Self {
        self.api_timeout = Some(timeout);
        self
    }

    /// Set the news/market request timeout
    pub fn source_timeout(mut self, timeout: Duration) -> Self {
        self.source_timeout = Some(timeout);
        self
    }

    /// Set the maximum number of news articles
    pub fn news_limit(mut self, limit: usize) -> Self {
        self.news_limit = Some(limit);
        self
    }

    /// Set the news look-back window in days
    pub fn news_days_back(mut self, days: u32) -> Self {
        self.news_days_back = Some(days);
        self
    }

    /// Set the tracing output format
    pub fn log_format(mut self, format: LogFormat) -> Self {
        self.log_format = Some(format);
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<Config> {
        let defaults = Config::default();

        let config = Config {
            api_keys: self.api_keys,
            model: self.model.unwrap_or(defaults.model),
            api_timeout: self.api_timeout.unwrap_or(defaults.api_timeout),
            source_timeout: self.source_timeout.unwrap_or(defaults.source_timeout),
            news_limit: self.news_limit.unwrap_or(defaults.news_limit),
            news_days_back: self.news_days_back.unwrap_or(defaults.news_days_back),
            log_format: self.log_format.unwrap_or(defaults.log_format),
        };

        config.validate()?;
        Ok(config)
    }
}
