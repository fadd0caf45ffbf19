//! Text and JSON export of finished reports

use research_core::{ResearchResult, Result};
use std::fmt;
use std::str::FromStr;

/// File format for saved reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Text,
    Json,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Text => "txt",
            Self::Json => "json",
        }
    }

    /// Render a result in this format
    pub fn render(self, result: &ResearchResult) -> Result<String> {
        match self {
            Self::Text => Ok(to_text(result)),
            Self::Json => to_json(result),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Text => "text",
            Self::Json => "json",
        })
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "text" | "txt" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown export format '{other}' (expected text or json)")),
        }
    }
}

/// Plain-text report
pub fn to_text(result: &ResearchResult) -> String {
    let mut out = String::new();

    out.push_str(&format!("Research Report: {}\n", result.topic));
    out.push_str(&format!(
        "Generated: {}\n",
        result.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    out.push_str(&format!("Confidence: {:.0}%\n", result.confidence_score));
    if !result.sources.is_empty() {
        out.push_str(&format!("Sources: {}\n", result.sources.join(", ")));
    }
    if result.parse_outcome.is_fallback() {
        out.push_str("Note: no section headings were recognized in the AI response\n");
    }

    for (name, text) in result.sections.iter() {
        let title = name.title().to_uppercase();
        out.push_str(&format!("\n{title}\n{}\n", "=".repeat(title.chars().count())));
        if text.trim().is_empty() {
            out.push_str("(no content)\n");
        } else {
            out.push_str(text.trim_end());
            out.push('\n');
        }
    }

    if !result.news_items.is_empty() {
        let heading = format!("NEWS ARTICLES ({})", result.news_items.len());
        out.push_str(&format!("\n{heading}\n{}\n", "=".repeat(heading.len())));
        for (index, item) in result.news_items.iter().enumerate() {
            out.push_str(&format!("{}. {}\n", index + 1, item.title));
            if let Some(description) = &item.description {
                out.push_str(&format!("   {description}\n"));
            }
            out.push_str(&format!("   Source: {}", item.source));
            if let Some(published) = item.published_at {
                out.push_str(&format!(" | Published: {}", published.format("%Y-%m-%d")));
            }
            out.push_str(&format!("\n   URL: {}\n", item.url));
        }
    }

    out
}

/// Pretty JSON mirroring the data model
pub fn to_json(result: &ResearchResult) -> Result<String> {
    Ok(serde_json::to_string_pretty(result)?)
}

/// Parse a report saved with [`to_json`]
pub fn from_json(json: &str) -> Result<ResearchResult> {
    Ok(serde_json::from_str(json)?)
}

/// `research_<slug>_<YYYYMMDD>.<ext>`
pub fn file_name(result: &ResearchResult, format: ExportFormat) -> String {
    format!(
        "research_{}_{}.{}",
        slug(&result.topic),
        result.generated_at.format("%Y%m%d"),
        format.extension()
    )
}

/// Lowercase alphanumerics joined by underscores, at most 50 characters
fn slug(topic: &str) -> String {
    let words: Vec<String> = topic
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect();

    let mut slug: String = words.join("_").chars().take(50).collect();
    while slug.ends_with('_') {
        slug.pop();
    }

    if slug.is_empty() {
        "report".to_string()
    } else {
        slug
    }
}
