//! Market client backed by Finnhub symbol search and quotes
//!
//! A research topic is usually a theme ("solid state batteries"), not a
//! ticker. The client resolves it to listed companies with `/search`, quotes
//! the best few matches with `/quote` and renders a short snapshot that the
//! engine appends to the market analysis section.

use crate::error::{Result, SourceError};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::fmt::Write as _;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

const PROVIDER: &str = "Finnhub";
const DEFAULT_BASE_URL: &str = "https://finnhub.io/api/v1";
const TOKEN_HEADER: &str = "X-Finnhub-Token";
const DEFAULT_MAX_SYMBOLS: usize = 3;

/// Something that can describe the market around a topic
#[async_trait]
pub trait MarketSource: Send + Sync {
    /// A short human-readable market summary for `topic`
    ///
    /// Empty when no market data relates to the topic.
    async fn search(&self, topic: &str) -> Result<String>;

    /// Short name used in logs and reports
    fn name(&self) -> &'static str;
}

/// Finnhub client
pub struct FinnhubClient {
    client: Client,
    api_key: String,
    base_url: String,
    max_symbols: usize,
    timeout: Duration,
}

impl FinnhubClient {
    pub fn new(api_key: impl Into<String>, timeout: Duration) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(SourceError::InvalidConfig(
                "Finnhub API key is empty".to_string(),
            ));
        }

        Ok(Self {
            client: SourceError::client(timeout)?,
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            max_symbols: DEFAULT_MAX_SYMBOLS,
            timeout,
        })
    }

    /// Point the client at another deployment (tests, proxies)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// How many matching companies to quote (at least one)
    pub fn with_max_symbols(mut self, max_symbols: usize) -> Self {
        self.max_symbols = max_symbols.max(1);
        self
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> Result<T> {
        let url = format!("{}/{path}", self.base_url.trim_end_matches('/'));

        let response = self
            .client
            .get(&url)
            .header(TOKEN_HEADER, &self.api_key)
            .query(query)
            .send()
            .await
            .map_err(|e| SourceError::transport(PROVIDER, self.timeout, e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| SourceError::transport(PROVIDER, self.timeout, e))?;

        if !status.is_success() {
            return Err(SourceError::from_status(
                PROVIDER,
                status.as_u16(),
                error_message(&body),
            ));
        }

        serde_json::from_str(&body).map_err(|e| SourceError::ParseError {
            provider: PROVIDER,
            message: e.to_string(),
        })
    }
}

#[async_trait]
impl MarketSource for FinnhubClient {
    #[instrument(skip(self), fields(max_symbols = self.max_symbols))]
    async fn search(&self, topic: &str) -> Result<String> {
        let found: SymbolSearch = self.get("search", &[("q", topic)]).await?;
        let matches = select_symbols(found.result, self.max_symbols);
        debug!("Resolved {} listed symbols", matches.len());

        if matches.is_empty() {
            info!("No listed companies matched the topic");
            return Ok(String::new());
        }

        let mut lines = Vec::with_capacity(matches.len());
        let mut last_error = None;

        for symbol in &matches {
            match self
                .get::<Quote>("quote", &[("symbol", symbol.symbol.as_str())])
                .await
            {
                Ok(quote) => lines.extend(format_quote(symbol, &quote)),
                Err(e) => {
                    warn!(symbol = %symbol.symbol, error = %e, "Quote lookup failed");
                    last_error = Some(e);
                }
            }
        }

        match (lines.is_empty(), last_error) {
            (true, Some(err)) => Err(err),
            _ => Ok(summarize(topic, &lines)),
        }
    }

    fn name(&self) -> &'static str {
        "finnhub"
    }
}

// ============================================================================
// Finnhub response types
// ============================================================================

#[derive(Debug, Deserialize)]
struct SymbolSearch {
    #[serde(default)]
    result: Vec<SymbolMatch>,
}

#[derive(Debug, Clone, Deserialize)]
struct SymbolMatch {
    #[serde(default)]
    description: String,
    symbol: String,
    #[serde(rename = "type", default)]
    kind: String,
}

/// Finnhub quote; all prices are zero for unknown symbols
#[derive(Debug, Default, Deserialize)]
struct Quote {
    /// Current price
    #[serde(rename = "c", default)]
    current: f64,
    /// Change
    #[serde(rename = "d")]
    change: Option<f64>,
    /// Percent change
    #[serde(rename = "dp")]
    change_percent: Option<f64>,
    /// High of the day
    #[serde(rename = "h", default)]
    high: f64,
    /// Low of the day
    #[serde(rename = "l", default)]
    low: f64,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorBody>(body)
        .map_or_else(|_| body.trim().to_string(), |parsed| parsed.error)
}

/// Prefer primary-listed common stock, then anything else, deduplicated
fn select_symbols(matches: Vec<SymbolMatch>, max: usize) -> Vec<SymbolMatch> {
    let (mut primary, rest): (Vec<_>, Vec<_>) = matches
        .into_iter()
        .filter(|m| !m.symbol.trim().is_empty())
        .partition(|m| m.kind == "Common Stock" && !m.symbol.contains('.'));

    primary.extend(rest);

    let mut seen = Vec::new();
    primary.retain(|m| {
        if seen.contains(&m.symbol) {
            false
        } else {
            seen.push(m.symbol.clone());
            true
        }
    });
    primary.truncate(max);
    primary
}

fn format_quote(symbol: &SymbolMatch, quote: &Quote) -> Option<String> {
    if quote.current <= 0.0 {
        return None;
    }

    let mut line = format!("- {}", symbol.symbol);
    if !symbol.description.is_empty() {
        let _ = write!(line, " ({})", symbol.description);
    }
    let _ = write!(line, ": {:.2}", quote.current);

    if let (Some(change), Some(percent)) = (quote.change, quote.change_percent) {
        let _ = write!(line, ", {change:+.2} ({percent:+.2}%) today");
    }
    if quote.high > 0.0 && quote.low > 0.0 {
        let _ = write!(line, ", day range {:.2}-{:.2}", quote.low, quote.high);
    }

    Some(line)
}

fn summarize(topic: &str, lines: &[String]) -> String {
    if lines.is_empty() {
        return String::new();
    }

    format!(
        "Market snapshot for listed companies matching \"{topic}\":\n{}",
        lines.join("\n")
    )
}
