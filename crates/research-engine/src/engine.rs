//! Research orchestration
//!
//! One request is one flow: ask the AI client for a report, split it into
//! sections, then enrich it with news and market data fetched concurrently.
//! Only the AI call is allowed to fail the request. Source failures are
//! logged and leave the corresponding data empty.

use crate::parser::{HeadingTable, ResponseParser};
use crate::prompt;
use research_core::{
    DataSource, Error, NewsItem, ResearchRequest, ResearchResult, Result, SectionName, Sections,
};
use research_llm::AiClient;
use research_llm::providers::{GeminiConfig, GeminiProvider};
use research_sources::{FinnhubClient, MarketSource, NewsApiClient, NewsSource};
use research_utils::Config;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

const PROBE_PROMPT: &str = "Reply with the single word OK.";
const PROBE_NEWS_QUERY: &str = "technology";
const PROBE_MARKET_QUERY: &str = "Apple";

/// Turns a topic into a sectioned research report
pub struct ResearchEngine {
    ai: Arc<dyn AiClient>,
    news: Option<Arc<dyn NewsSource>>,
    market: Option<Arc<dyn MarketSource>>,
    parser: ResponseParser,
}

impl fmt::Debug for ResearchEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResearchEngine")
            .field("ai", &self.ai.name())
            .field("news", &self.news.as_ref().map(|n| n.name()))
            .field("market", &self.market.as_ref().map(|m| m.name()))
            .finish_non_exhaustive()
    }
}

impl ResearchEngine {
    /// Start building an engine around an AI client
    pub fn builder(ai: Arc<dyn AiClient>) -> ResearchEngineBuilder {
        ResearchEngineBuilder {
            ai,
            news: None,
            market: None,
            headings: HeadingTable::default(),
        }
    }

    /// Build the Gemini, NewsAPI and Finnhub clients described by `config`
    ///
    /// The Gemini key is required. News and market clients are created only
    /// when their keys are present.
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::builder_from_config(config)?.build())
    }

    /// Like [`ResearchEngine::from_config`], but leaves the builder open for
    /// further customization such as a heading table
    pub fn builder_from_config(config: &Config) -> Result<ResearchEngineBuilder> {
        let gemini_key = config.api_keys.gemini.as_deref().ok_or_else(|| {
            Error::Auth("GEMINI_API_KEY is not set; the AI client cannot be created".to_string())
        })?;

        let ai = GeminiProvider::with_config(
            GeminiConfig::new(gemini_key)
                .with_model(&config.model)
                .with_timeout(config.api_timeout.as_secs())
                .with_system_prompt(prompt::system_prompt()),
        )?;

        let mut builder = Self::builder(Arc::new(ai));

        if let Some(key) = config.api_keys.news.as_deref() {
            let client = NewsApiClient::new(key, config.source_timeout)?
                .with_limit(config.news_limit)
                .with_days_back(config.news_days_back);
            builder = builder.news(Arc::new(client));
        }

        if let Some(key) = config.api_keys.market.as_deref() {
            builder = builder.market(Arc::new(FinnhubClient::new(key, config.source_timeout)?));
        }

        Ok(builder)
    }

    pub fn has_news(&self) -> bool {
        self.news.is_some()
    }

    pub fn has_market(&self) -> bool {
        self.market.is_some()
    }

    /// Run one research request end to end
    #[instrument(skip(self, request), fields(topic = %request.topic()))]
    pub async fn research(&self, request: &ResearchRequest) -> Result<ResearchResult> {
        info!("Starting research");
        let started = Instant::now();

        let raw = self
            .ai
            .generate(&prompt::research_prompt(request.topic()))
            .await
            .map_err(|e| {
                warn!(client = self.ai.name(), error = %e, "AI generation failed");
                Error::from(e)
            })?;
        debug!(chars = raw.len(), "Received AI response");

        let parsed = self.parser.parse(&raw);
        if parsed.outcome.is_fallback() {
            warn!("No section headings recognized; the whole response becomes the executive summary");
        }
        if !parsed.preamble.is_empty() {
            debug!(chars = parsed.preamble.len(), "Dropping text before the first heading");
        }

        let (news, market) = tokio::join!(self.fetch_news(request), self.fetch_market(request));

        let mut sections = parsed.sections;
        let mut sources = vec![format!("ai:{}", self.ai.name())];
        let mut news_items = Vec::new();

        if let Some((name, items)) = news {
            if !items.is_empty() {
                sections.append(SectionName::LatestNews, &format_headlines(&items));
                sources.push(format!("news:{name}"));
                news_items = items;
            }
        }

        if let Some((name, summary)) = market {
            if !summary.trim().is_empty() {
                sections.append(SectionName::MarketAnalysis, &summary);
                sources.push(format!("market:{name}"));
            }
        }

        let mut result = ResearchResult::new(request.topic(), sections, parsed.outcome);
        result.confidence_score = confidence_score(&result.sections, news_items.len());
        result.news_items = news_items;
        result.sources = sources;

        info!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            confidence = result.confidence_score,
            "Research complete"
        );
        Ok(result)
    }

    /// Build a result from AI output obtained elsewhere (saved responses)
    pub fn parse_response(&self, topic: &str, raw: &str) -> ResearchResult {
        report_from_text(&self.parser, topic, raw)
    }

    async fn fetch_news(&self, request: &ResearchRequest) -> Option<(&'static str, Vec<NewsItem>)> {
        if !request.wants(DataSource::News) {
            return None;
        }
        let Some(news) = &self.news else {
            info!("News requested but no news client is configured; skipping");
            return None;
        };

        match news.search(request.topic()).await {
            Ok(items) => Some((news.name(), items)),
            Err(e) => {
                warn!(source = news.name(), error = %e, "News fetch failed; continuing without news");
                None
            }
        }
    }

    async fn fetch_market(&self, request: &ResearchRequest) -> Option<(&'static str, String)> {
        if !request.wants(DataSource::Market) {
            return None;
        }
        let Some(market) = &self.market else {
            info!("Market data requested but no market client is configured; skipping");
            return None;
        };

        match market.search(request.topic()).await {
            Ok(summary) => Some((market.name(), summary)),
            Err(e) => {
                warn!(source = market.name(), error = %e, "Market fetch failed; continuing without market data");
                None
            }
        }
    }

    /// Probe every collaborator once and report how it responded
    pub async fn check_services(&self) -> Vec<ServiceStatus> {
        let ai = async {
            let started = Instant::now();
            let outcome = self.ai.generate(PROBE_PROMPT).await.map(|_| ());
            ServiceStatus::probed("ai", Some(self.ai.name()), started.elapsed(), outcome)
        };

        let news = async {
            match &self.news {
                Some(news) => {
                    let started = Instant::now();
                    let outcome = news.search(PROBE_NEWS_QUERY).await.map(|_| ());
                    ServiceStatus::probed("news", Some(news.name()), started.elapsed(), outcome)
                }
                None => ServiceStatus::not_configured("news"),
            }
        };

        let market = async {
            match &self.market {
                Some(market) => {
                    let started = Instant::now();
                    let outcome = market.search(PROBE_MARKET_QUERY).await.map(|_| ());
                    ServiceStatus::probed("market", Some(market.name()), started.elapsed(), outcome)
                }
                None => ServiceStatus::not_configured("market"),
            }
        };

        let (ai, news, market) = tokio::join!(ai, news, market);
        vec![ai, news, market]
    }
}

/// Builder for [`ResearchEngine`]
pub struct ResearchEngineBuilder {
    ai: Arc<dyn AiClient>,
    news: Option<Arc<dyn NewsSource>>,
    market: Option<Arc<dyn MarketSource>>,
    headings: HeadingTable,
}

impl ResearchEngineBuilder {
    pub fn news(mut self, news: Arc<dyn NewsSource>) -> Self {
        self.news = Some(news);
        self
    }

    pub fn market(mut self, market: Arc<dyn MarketSource>) -> Self {
        self.market = Some(market);
        self
    }

    /// Replace the built-in heading phrases
    pub fn headings(mut self, headings: HeadingTable) -> Self {
        self.headings = headings;
        self
    }

    pub fn build(self) -> ResearchEngine {
        ResearchEngine {
            ai: self.ai,
            news: self.news,
            market: self.market,
            parser: ResponseParser::new(self.headings),
        }
    }
}

/// Health of one collaborator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceState {
    Ok,
    Failed(String),
    NotConfigured,
}

/// Result of probing one collaborator
#[derive(Debug, Clone)]
pub struct ServiceStatus {
    /// "ai", "news" or "market"
    pub service: &'static str,
    /// Client name, when one is configured
    pub provider: Option<&'static str>,
    pub state: ServiceState,
    pub latency: Option<Duration>,
}

impl ServiceStatus {
    fn probed<E: fmt::Display>(
        service: &'static str,
        provider: Option<&'static str>,
        latency: Duration,
        outcome: std::result::Result<(), E>,
    ) -> Self {
        let state = match outcome {
            Ok(()) => ServiceState::Ok,
            Err(e) => ServiceState::Failed(e.to_string()),
        };
        Self {
            service,
            provider,
            state,
            latency: Some(latency),
        }
    }

    fn not_configured(service: &'static str) -> Self {
        Self {
            service,
            provider: None,
            state: ServiceState::NotConfigured,
            latency: None,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.state == ServiceState::Ok
    }
}

/// Build a result from raw AI text without contacting any service
pub fn report_from_text(parser: &ResponseParser, topic: &str, raw: &str) -> ResearchResult {
    let parsed = parser.parse(raw);
    let mut result = ResearchResult::new(topic, parsed.sections, parsed.outcome);
    result.confidence_score = confidence_score(&result.sections, 0);
    result
}

/// Completeness estimate in percent
///
/// +20 for each of the four prose sections longer than 50 characters, +10 when
/// the key players section yields list items, +10 when latest news has text,
/// +5 when news articles were fetched. Capped at 100.
pub fn confidence_score(sections: &Sections, news_count: usize) -> f64 {
    const PROSE: [SectionName; 4] = [
        SectionName::ExecutiveSummary,
        SectionName::MarketAnalysis,
        SectionName::TechnicalDetails,
        SectionName::BusinessOpportunities,
    ];

    let mut score: f64 = PROSE
        .iter()
        .filter(|name| sections.get(**name).chars().count() > 50)
        .map(|_| 20.0)
        .sum();

    if !research_core::model::list_items(sections.get(SectionName::KeyPlayers)).is_empty() {
        score += 10.0;
    }
    if !sections.is_empty(SectionName::LatestNews) {
        score += 10.0;
    }
    if news_count > 0 {
        score += 5.0;
    }

    score.min(100.0)
}

/// Headline list appended to the latest news section
fn format_headlines(items: &[NewsItem]) -> String {
    let mut text = String::from("Recent headlines:");
    for item in items {
        text.push_str(&format!("\n- {} ({}", item.title, item.source));
        if let Some(published) = item.published_at {
            text.push_str(&format!(", {}", published.format("%Y-%m-%d")));
        }
        text.push_str(&format!(")\n  {}", item.url));
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use mockall::mock;
    use research_core::ParseOutcome;
    use research_llm::LLMError;
    use research_sources::SourceError;

    mock! {
        pub Ai {}

        #[async_trait]
        impl AiClient for Ai {
            async fn generate(&self, prompt: &str) -> research_llm::Result<String>;
            fn name(&self) -> &'static str;
        }
    }

    mock! {
        pub News {}

        #[async_trait]
        impl NewsSource for News {
            async fn search(&self, topic: &str) -> research_sources::Result<Vec<NewsItem>>;
            fn name(&self) -> &'static str;
        }
    }

    mock! {
        pub Market {}

        #[async_trait]
        impl MarketSource for Market {
            async fn search(&self, topic: &str) -> research_sources::Result<String>;
            fn name(&self) -> &'static str;
        }
    }

    const REPORT: &str = "\
1. EXECUTIVE SUMMARY
Solid-state batteries swap the liquid electrolyte for a solid one, improving safety.
2. MARKET ANALYSIS
Analysts expect the segment to grow strongly through the end of the decade.
3. TECHNICAL DETAILS
Sulfide, oxide and polymer electrolytes each trade conductivity for stability.
4. BUSINESS OPPORTUNITIES
Suppliers of separator films and dry-room equipment stand to benefit first.
5. KEY PLAYERS
- Toyota
- QuantumScape
6. LATEST NEWS
Several pilot lines started production this year.";

    fn ai_returning(text: &'static str) -> MockAi {
        let mut ai = MockAi::new();
        ai.expect_name().return_const("mock-ai");
        ai.expect_generate()
            .times(1)
            .returning(move |_| Ok(text.to_string()));
        ai
    }

    fn news_item() -> NewsItem {
        NewsItem {
            title: "Pilot line opens".to_string(),
            url: "https://example.com/pilot".to_string(),
            source: "Reuters".to_string(),
            published_at: Some(Utc.with_ymd_and_hms(2026, 10, 12, 8, 0, 0).unwrap()),
            description: None,
        }
    }

    fn request(topic: &str) -> ResearchRequest {
        ResearchRequest::new(topic).unwrap()
    }

    #[tokio::test]
    async fn test_research_merges_all_sources() {
        let mut news = MockNews::new();
        news.expect_name().return_const("mock-news");
        news.expect_search()
            .withf(|topic| topic == "batteries")
            .times(1)
            .returning(|_| Ok(vec![news_item()]));

        let mut market = MockMarket::new();
        market.expect_name().return_const("mock-market");
        market
            .expect_search()
            .times(1)
            .returning(|_| Ok("Market snapshot: QS 7.10".to_string()));

        let engine = ResearchEngine::builder(Arc::new(ai_returning(REPORT)))
            .news(Arc::new(news))
            .market(Arc::new(market))
            .build();

        let result = engine.research(&request("batteries")).await.unwrap();

        assert_eq!(result.topic, "batteries");
        assert_eq!(result.parse_outcome, ParseOutcome::Structured { headings: 6 });
        assert_eq!(result.news_items, vec![news_item()]);
        assert!(result.section(SectionName::LatestNews).starts_with("Several pilot lines"));
        assert!(
            result
                .section(SectionName::LatestNews)
                .contains("- Pilot line opens (Reuters, 2026-10-12)\n  https://example.com/pilot")
        );
        assert!(
            result
                .section(SectionName::MarketAnalysis)
                .ends_with("\n\nMarket snapshot: QS 7.10")
        );
        assert_eq!(
            result.sources,
            ["ai:mock-ai", "news:mock-news", "market:mock-market"]
        );
        assert!((result.confidence_score - 100.0).abs() < f64::EPSILON);
        assert_eq!(result.key_players(), ["Toyota", "QuantumScape"]);
    }

    #[tokio::test]
    async fn test_news_failure_is_downgraded() {
        let mut news = MockNews::new();
        news.expect_name().return_const("mock-news");
        news.expect_search().times(1).returning(|_| {
            Err(SourceError::RequestFailed {
                provider: "NewsAPI",
                message: "connection reset".to_string(),
            })
        });

        let engine = ResearchEngine::builder(Arc::new(ai_returning(REPORT)))
            .news(Arc::new(news))
            .build();

        let result = engine.research(&request("batteries")).await.unwrap();

        assert!(result.news_items.is_empty());
        assert_eq!(result.sections.populated(), 6);
        assert_eq!(
            result.section(SectionName::LatestNews),
            "Several pilot lines started production this year."
        );
        assert_eq!(result.sources, ["ai:mock-ai"]);
    }

    #[tokio::test]
    async fn test_market_failure_is_downgraded() {
        let mut market = MockMarket::new();
        market.expect_name().return_const("mock-market");
        market
            .expect_search()
            .times(1)
            .returning(|_| Err(SourceError::RateLimited { provider: "Finnhub" }));

        let engine = ResearchEngine::builder(Arc::new(ai_returning(REPORT)))
            .market(Arc::new(market))
            .build();

        let result = engine.research(&request("batteries")).await.unwrap();
        assert_eq!(
            result.section(SectionName::MarketAnalysis),
            "Analysts expect the segment to grow strongly through the end of the decade."
        );
    }

    #[tokio::test]
    async fn test_empty_market_summary_is_not_a_source() {
        let mut market = MockMarket::new();
        market.expect_name().return_const("mock-market");
        market
            .expect_search()
            .times(1)
            .returning(|_| Ok(String::new()));

        let engine = ResearchEngine::builder(Arc::new(ai_returning(REPORT)))
            .market(Arc::new(market))
            .build();

        let result = engine.research(&request("batteries")).await.unwrap();
        assert_eq!(
            result.section(SectionName::MarketAnalysis),
            "Analysts expect the segment to grow strongly through the end of the decade."
        );
        assert_eq!(result.sources, ["ai:mock-ai"]);
    }

    #[tokio::test]
    async fn test_ai_auth_failure_is_fatal() {
        let mut ai = MockAi::new();
        ai.expect_name().return_const("mock-ai");
        ai.expect_generate()
            .times(1)
            .returning(|_| Err(LLMError::AuthenticationFailed("API key not valid".to_string())));

        let mut news = MockNews::new();
        news.expect_name().return_const("mock-news");
        news.expect_search().never();

        let engine = ResearchEngine::builder(Arc::new(ai))
            .news(Arc::new(news))
            .build();

        let err = engine.research(&request("batteries")).await.unwrap_err();
        assert!(matches!(err, Error::Auth(_)));
    }

    #[tokio::test]
    async fn test_ai_quota_and_network_errors_classified() {
        let mut ai = MockAi::new();
        ai.expect_name().return_const("mock-ai");
        ai.expect_generate()
            .times(1)
            .returning(|_| Err(LLMError::RateLimitExceeded("quota".to_string())));
        let engine = ResearchEngine::builder(Arc::new(ai)).build();
        assert!(matches!(
            engine.research(&request("x")).await,
            Err(Error::Quota(_))
        ));

        let mut ai = MockAi::new();
        ai.expect_name().return_const("mock-ai");
        ai.expect_generate()
            .times(1)
            .returning(|_| Err(LLMError::Timeout(120)));
        let engine = ResearchEngine::builder(Arc::new(ai)).build();
        assert!(matches!(
            engine.research(&request("x")).await,
            Err(Error::Network(_))
        ));
    }

    #[tokio::test]
    async fn test_unrequested_sources_are_not_called() {
        let mut news = MockNews::new();
        news.expect_name().return_const("mock-news");
        news.expect_search().never();

        let mut market = MockMarket::new();
        market.expect_name().return_const("mock-market");
        market.expect_search().never();

        let engine = ResearchEngine::builder(Arc::new(ai_returning(REPORT)))
            .news(Arc::new(news))
            .market(Arc::new(market))
            .build();

        let req = request("batteries")
            .without(DataSource::News)
            .without(DataSource::Market);
        let result = engine.research(&req).await.unwrap();

        assert!(result.news_items.is_empty());
        assert_eq!(result.sources, ["ai:mock-ai"]);
    }

    #[tokio::test]
    async fn test_requested_but_unconfigured_sources_are_skipped() {
        let engine = ResearchEngine::builder(Arc::new(ai_returning(REPORT))).build();
        assert!(!engine.has_news());
        assert!(!engine.has_market());

        let result = engine.research(&request("batteries")).await.unwrap();
        assert!(result.news_items.is_empty());
        assert_eq!(result.sources, ["ai:mock-ai"]);
        assert_eq!(result.sections.populated(), 6);
    }

    #[tokio::test]
    async fn test_unstructured_response_falls_back() {
        let engine =
            ResearchEngine::builder(Arc::new(ai_returning("Just a paragraph about batteries.")))
                .build();

        let result = engine.research(&request("batteries")).await.unwrap();
        assert_eq!(result.parse_outcome, ParseOutcome::Fallback);
        assert_eq!(
            result.section(SectionName::ExecutiveSummary),
            "Just a paragraph about batteries."
        );
        assert_eq!(result.sections.populated(), 1);
    }

    #[tokio::test]
    async fn test_custom_headings() {
        let table = HeadingTable::from_json_str(r#"{"executive_summary": ["TL;DR"]}"#).unwrap();
        let engine = ResearchEngine::builder(Arc::new(ai_returning("TL;DR\nShort answer.")))
            .headings(table)
            .build();

        let result = engine.research(&request("batteries")).await.unwrap();
        assert_eq!(result.section(SectionName::ExecutiveSummary), "Short answer.");
    }

    #[tokio::test]
    async fn test_check_services() {
        let mut ai = MockAi::new();
        ai.expect_name().return_const("mock-ai");
        ai.expect_generate()
            .withf(|prompt| prompt == PROBE_PROMPT)
            .times(1)
            .returning(|_| Ok("OK".to_string()));

        let mut news = MockNews::new();
        news.expect_name().return_const("mock-news");
        news.expect_search()
            .times(1)
            .returning(|_| Err(SourceError::RateLimited { provider: "NewsAPI" }));

        let engine = ResearchEngine::builder(Arc::new(ai))
            .news(Arc::new(news))
            .build();

        let statuses = engine.check_services().await;
        assert_eq!(statuses.len(), 3);

        assert_eq!(statuses[0].service, "ai");
        assert_eq!(statuses[0].provider, Some("mock-ai"));
        assert!(statuses[0].is_ok());
        assert!(statuses[0].latency.is_some());

        assert_eq!(statuses[1].service, "news");
        assert_eq!(
            statuses[1].state,
            ServiceState::Failed("Rate limit exceeded for NewsAPI".to_string())
        );

        assert_eq!(statuses[2].service, "market");
        assert_eq!(statuses[2].state, ServiceState::NotConfigured);
        assert!(statuses[2].latency.is_none());
    }

    #[test]
    fn test_from_config_requires_gemini_key() {
        let config = Config::builder().news_api_key("news-key").build().unwrap();
        let err = ResearchEngine::from_config(&config).unwrap_err();
        assert!(matches!(err, Error::Auth(_)));
    }

    #[test]
    fn test_from_config_builds_optional_clients() {
        let config = Config::builder()
            .gemini_api_key("gemini-key")
            .market_api_key("market-key")
            .build()
            .unwrap();
        let engine = ResearchEngine::from_config(&config).unwrap();

        assert!(!engine.has_news());
        assert!(engine.has_market());
    }

    #[test]
    fn test_parse_response_offline() {
        let engine = ResearchEngine::builder(Arc::new(MockAi::new())).build();
        let result = engine.parse_response("batteries", REPORT);

        assert_eq!(result.parse_outcome, ParseOutcome::Structured { headings: 6 });
        assert!(result.news_items.is_empty());
        assert!((result.confidence_score - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_confidence_score() {
        let mut sections = Sections::new();
        assert!(confidence_score(&sections, 0).abs() < f64::EPSILON);

        sections.set(SectionName::ExecutiveSummary, "x".repeat(51));
        sections.set(SectionName::MarketAnalysis, "too short");
        assert!((confidence_score(&sections, 0) - 20.0).abs() < f64::EPSILON);

        sections.set(SectionName::KeyPlayers, "- Acme Corp");
        sections.set(SectionName::LatestNews, "Something happened.");
        assert!((confidence_score(&sections, 3) - 45.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_confidence_is_capped() {
        let mut sections = Sections::new();
        for name in SectionName::ALL {
            sections.set(name, format!("- {}", "long text ".repeat(10)));
        }
        assert!((confidence_score(&sections, 5) - 100.0).abs() < f64::EPSILON);
    }
}
