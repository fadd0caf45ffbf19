//! News client backed by the NewsAPI `/v2/everything` endpoint

use crate::error::{Result, SourceError};
use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use research_core::NewsItem;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, instrument};

const PROVIDER: &str = "NewsAPI";
const DEFAULT_BASE_URL: &str = "https://newsapi.org/v2";
const API_KEY_HEADER: &str = "X-Api-Key";
/// NewsAPI rejects page sizes above this
const MAX_PAGE_SIZE: usize = 100;
/// NewsAPI placeholder for deleted articles
const REMOVED_MARKER: &str = "[Removed]";
/// Longest search window, in days
pub const MAX_DAYS_BACK: u32 = 3650;

/// Something that can find recent articles about a topic
#[async_trait]
pub trait NewsSource: Send + Sync {
    /// Recent articles about `topic`, most relevant first
    async fn search(&self, topic: &str) -> Result<Vec<NewsItem>>;

    /// Short name used in logs and reports
    fn name(&self) -> &'static str;
}

/// NewsAPI client
pub struct NewsApiClient {
    client: Client,
    api_key: String,
    base_url: String,
    limit: usize,
    days_back: u32,
    timeout: Duration,
}

impl NewsApiClient {
    /// Create a client with the default limit (10 articles from the last 7 days)
    pub fn new(api_key: impl Into<String>, timeout: Duration) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(SourceError::InvalidConfig(
                "NewsAPI key is empty".to_string(),
            ));
        }

        Ok(Self {
            client: SourceError::client(timeout)?,
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            limit: 10,
            days_back: 7,
            timeout,
        })
    }

    /// Point the client at another deployment (tests, proxies)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Maximum number of articles, capped at 100
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit.clamp(1, MAX_PAGE_SIZE);
        self
    }

    /// How many days of history to search, capped at ten years
    pub fn with_days_back(mut self, days: u32) -> Self {
        self.days_back = days.min(MAX_DAYS_BACK);
        self
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    fn endpoint(&self) -> String {
        format!("{}/everything", self.base_url.trim_end_matches('/'))
    }

    fn query(&self, topic: &str, now: DateTime<Utc>) -> Vec<(&'static str, String)> {
        let from = now
            .checked_sub_signed(ChronoDuration::days(i64::from(self.days_back)))
            .unwrap_or(now);

        vec![
            ("q", topic.to_string()),
            ("from", from.format("%Y-%m-%d").to_string()),
            ("to", now.format("%Y-%m-%d").to_string()),
            ("sortBy", "relevancy".to_string()),
            ("language", "en".to_string()),
            ("pageSize", self.limit.to_string()),
        ]
    }
}

#[async_trait]
impl NewsSource for NewsApiClient {
    #[instrument(skip(self), fields(limit = self.limit, days_back = self.days_back))]
    async fn search(&self, topic: &str) -> Result<Vec<NewsItem>> {
        debug!("Querying {PROVIDER}");

        let response = self
            .client
            .get(self.endpoint())
            .header(API_KEY_HEADER, &self.api_key)
            .query(&self.query(topic, Utc::now()))
            .send()
            .await
            .map_err(|e| SourceError::transport(PROVIDER, self.timeout, e))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| SourceError::transport(PROVIDER, self.timeout, e))?;

        let items = parse_response(status, &body, self.limit)?;
        info!("Fetched {} news articles", items.len());
        Ok(items)
    }

    fn name(&self) -> &'static str {
        "newsapi"
    }
}

// ============================================================================
// NewsAPI response types
// ============================================================================

#[derive(Debug, Deserialize)]
struct EverythingResponse {
    status: String,
    #[serde(default)]
    articles: Vec<Article>,
    code: Option<String>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Article {
    title: Option<String>,
    url: Option<String>,
    description: Option<String>,
    #[serde(default)]
    source: ArticleSource,
    published_at: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ArticleSource {
    name: Option<String>,
}

impl Article {
    fn into_news_item(self) -> Option<NewsItem> {
        let title = self.title.map(|t| t.trim().to_string())?;
        let url = self.url.filter(|u| !u.trim().is_empty())?;
        if title.is_empty() || title == REMOVED_MARKER {
            return None;
        }

        Some(NewsItem {
            title,
            url,
            source: self
                .source
                .name
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| "Unknown".to_string()),
            published_at: self
                .published_at
                .as_deref()
                .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
                .map(|dt| dt.with_timezone(&Utc)),
            description: self
                .description
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty() && d != REMOVED_MARKER),
        })
    }
}

/// Turn a NewsAPI reply into news items or a classified error
fn parse_response(status: u16, body: &str, limit: usize) -> Result<Vec<NewsItem>> {
    let parsed = serde_json::from_str::<EverythingResponse>(body);

    let parsed = match parsed {
        Ok(parsed) if parsed.status == "ok" && (200..300).contains(&status) => parsed,
        Ok(failed) => return Err(classify_failure(status, failed.code, failed.message)),
        Err(_) if !(200..300).contains(&status) => {
            return Err(SourceError::from_status(
                PROVIDER,
                status,
                body.trim().to_string(),
            ));
        }
        Err(e) => {
            return Err(SourceError::ParseError {
                provider: PROVIDER,
                message: e.to_string(),
            });
        }
    };

    Ok(parsed
        .articles
        .into_iter()
        .filter_map(Article::into_news_item)
        .take(limit)
        .collect())
}

fn classify_failure(status: u16, code: Option<String>, message: Option<String>) -> SourceError {
    let code = code.unwrap_or_default();
    let message = message.unwrap_or_else(|| format!("request failed with code {code:?}"));

    match code.as_str() {
        "apiKeyInvalid" | "apiKeyMissing" | "apiKeyDisabled" | "apiKeyExhausted" => {
            SourceError::Unauthorized {
                provider: PROVIDER,
                message,
            }
        }
        "rateLimited" => SourceError::RateLimited { provider: PROVIDER },
        _ => SourceError::from_status(PROVIDER, status, message),
    }
}
