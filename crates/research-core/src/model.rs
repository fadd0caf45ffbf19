//! Research request and report types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::ops::Index;

use crate::error::{Error, Result};

const MAX_LIST_ITEMS: usize = 10;

/// One of the six fixed parts of a research report
///
/// Variants are declared in canonical report order; `Ord` follows it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionName {
    ExecutiveSummary,
    MarketAnalysis,
    TechnicalDetails,
    BusinessOpportunities,
    KeyPlayers,
    LatestNews,
}

impl SectionName {
    /// All sections in canonical order
    pub const ALL: [SectionName; 6] = [
        Self::ExecutiveSummary,
        Self::MarketAnalysis,
        Self::TechnicalDetails,
        Self::BusinessOpportunities,
        Self::KeyPlayers,
        Self::LatestNews,
    ];

    /// Display heading, e.g. "Executive Summary"
    pub fn title(self) -> &'static str {
        match self {
            Self::ExecutiveSummary => "Executive Summary",
            Self::MarketAnalysis => "Market Analysis",
            Self::TechnicalDetails => "Technical Details",
            Self::BusinessOpportunities => "Business Opportunities",
            Self::KeyPlayers => "Key Players",
            Self::LatestNews => "Latest News",
        }
    }

    /// Serialized key, e.g. "executive_summary"
    pub fn key(self) -> &'static str {
        match self {
            Self::ExecutiveSummary => "executive_summary",
            Self::MarketAnalysis => "market_analysis",
            Self::TechnicalDetails => "technical_details",
            Self::BusinessOpportunities => "business_opportunities",
            Self::KeyPlayers => "key_players",
            Self::LatestNews => "latest_news",
        }
    }
}

impl fmt::Display for SectionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

/// Report body: exactly one text entry per [`SectionName`]
///
/// Missing entries are filled with the empty string on construction and on
/// deserialization, so lookups never fail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    from = "BTreeMap<SectionName, String>",
    into = "BTreeMap<SectionName, String>"
)]
pub struct Sections {
    entries: BTreeMap<SectionName, String>,
}

impl Default for Sections {
    fn default() -> Self {
        Self {
            entries: SectionName::ALL
                .iter()
                .map(|name| (*name, String::new()))
                .collect(),
        }
    }
}

impl Sections {
    /// Create a report body with every section empty
    pub fn new() -> Self {
        Self::default()
    }

    /// Text of a section ("" when nothing was found)
    pub fn get(&self, name: SectionName) -> &str {
        self.entries.get(&name).map_or("", String::as_str)
    }

    /// Replace the text of a section
    pub fn set(&mut self, name: SectionName, text: impl Into<String>) {
        self.entries.insert(name, text.into());
    }

    /// Append a block to a section, separated from existing text by a blank line
    pub fn append(&mut self, name: SectionName, block: &str) {
        let block = block.trim();
        if block.is_empty() {
            return;
        }

        let entry = self.entries.entry(name).or_default();
        if !entry.is_empty() {
            entry.push_str("\n\n");
        }
        entry.push_str(block);
    }

    /// Whether the section has no text
    pub fn is_empty(&self, name: SectionName) -> bool {
        self.get(name).trim().is_empty()
    }

    /// Number of sections carrying text
    pub fn populated(&self) -> usize {
        SectionName::ALL
            .iter()
            .filter(|name| !self.is_empty(**name))
            .count()
    }

    /// Iterate sections in canonical order
    pub fn iter(&self) -> impl Iterator<Item = (SectionName, &str)> {
        self.entries.iter().map(|(name, text)| (*name, text.as_str()))
    }
}

impl Index<SectionName> for Sections {
    type Output = str;

    fn index(&self, name: SectionName) -> &str {
        self.get(name)
    }
}

impl From<BTreeMap<SectionName, String>> for Sections {
    fn from(mut entries: BTreeMap<SectionName, String>) -> Self {
        for name in SectionName::ALL {
            entries.entry(name).or_default();
        }
        Self { entries }
    }
}

impl From<Sections> for BTreeMap<SectionName, String> {
    fn from(sections: Sections) -> Self {
        sections.entries
    }
}

/// Optional data source that can enrich a report
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    /// Recent news articles about the topic
    News,
    /// Market quotes for companies related to the topic
    Market,
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::News => f.write_str("news"),
            Self::Market => f.write_str("market"),
        }
    }
}

/// A research request: a topic plus the optional sources to consult
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResearchRequest {
    topic: String,
    sources: BTreeSet<DataSource>,
}

impl ResearchRequest {
    /// Create a request with every optional source enabled
    ///
    /// Fails with [`Error::InvalidRequest`] when the topic is blank.
    pub fn new(topic: impl Into<String>) -> Result<Self> {
        let topic = topic.into().trim().to_string();
        if topic.is_empty() {
            return Err(Error::InvalidRequest(
                "research topic must not be empty".to_string(),
            ));
        }

        Ok(Self {
            topic,
            sources: [DataSource::News, DataSource::Market].into_iter().collect(),
        })
    }

    /// Replace the set of enabled sources
    pub fn with_sources(mut self, sources: impl IntoIterator<Item = DataSource>) -> Self {
        self.sources = sources.into_iter().collect();
        self
    }

    /// Disable a single source
    pub fn without(mut self, source: DataSource) -> Self {
        self.sources.remove(&source);
        self
    }

    /// The trimmed topic
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Enabled sources
    pub fn sources(&self) -> &BTreeSet<DataSource> {
        &self.sources
    }

    /// Whether a source was requested
    pub fn wants(&self, source: DataSource) -> bool {
        self.sources.contains(&source)
    }
}

/// A news article attached to a report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsItem {
    pub title: String,
    pub url: String,
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// How the AI text was split into sections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ParseOutcome {
    /// At least one recognized heading
    Structured { headings: usize },
    /// No headings found; everything went into the executive summary
    Fallback,
}

impl ParseOutcome {
    pub fn is_fallback(self) -> bool {
        matches!(self, Self::Fallback)
    }
}

/// A finished research report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearchResult {
    pub topic: String,
    pub sections: Sections,
    #[serde(default)]
    pub news_items: Vec<NewsItem>,
    pub generated_at: DateTime<Utc>,
    pub parse_outcome: ParseOutcome,
    /// Completeness estimate in percent (0-100)
    #[serde(default)]
    pub confidence_score: f64,
    /// Data sources that contributed to the report
    #[serde(default)]
    pub sources: Vec<String>,
}

impl ResearchResult {
    pub fn new(topic: impl Into<String>, sections: Sections, parse_outcome: ParseOutcome) -> Self {
        Self {
            topic: topic.into(),
            sections,
            news_items: Vec::new(),
            generated_at: Utc::now(),
            parse_outcome,
            confidence_score: 0.0,
            sources: Vec::new(),
        }
    }

    /// Shortcut for `self.sections.get(name)`
    pub fn section(&self, name: SectionName) -> &str {
        self.sections.get(name)
    }

    /// Names listed in the key players section
    pub fn key_players(&self) -> Vec<String> {
        list_items(self.sections.get(SectionName::KeyPlayers))
    }
}

/// Extract list entries from a block of text
///
/// Bulleted (`-`, `*`, `•`, `+`) and numbered (`1.`, `2)`) lines are preferred.
/// When none are present every substantial line counts as an entry. Results
/// are de-duplicated in order and capped at ten.
pub fn list_items(text: &str) -> Vec<String> {
    let mut items: Vec<String> = text.lines().filter_map(strip_list_marker).collect();

    if items.is_empty() {
        items = text
            .lines()
            .map(|line| {
                line.trim()
                    .trim_start_matches(|c: char| c == '-' || c == '.' || c.is_ascii_digit())
                    .trim()
                    .replace("**", "")
            })
            .filter(|line| line.chars().count() > 5)
            .collect();
    }

    let mut seen = BTreeSet::new();
    items.retain(|item| seen.insert(item.to_lowercase()));
    items.truncate(MAX_LIST_ITEMS);
    items
}

fn strip_list_marker(line: &str) -> Option<String> {
    let line = line.trim();

    let rest = if let Some(rest) = line
        .strip_prefix("- ")
        .or_else(|| line.strip_prefix("* "))
        .or_else(|| line.strip_prefix("• "))
        .or_else(|| line.strip_prefix("+ "))
    {
        rest
    } else {
        let digits = line.chars().take_while(char::is_ascii_digit).count();
        if digits == 0 || digits > 2 {
            return None;
        }
        let after = &line[digits..];
        after
            .strip_prefix(". ")
            .or_else(|| after.strip_prefix(") "))?
    };

    let item = rest.replace("**", "").trim().to_string();
    (!item.is_empty()).then_some(item)
}
