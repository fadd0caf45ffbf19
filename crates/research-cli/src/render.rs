//! Terminal rendering for reports and service checks

use comfy_table::presets::UTF8_FULL;
use comfy_table::{ContentArrangement, Table};
use research_core::{ResearchResult, SectionName};
use research_engine::{ServiceState, ServiceStatus};

const RULE_WIDTH: usize = 60;

fn section_icon(name: SectionName) -> &'static str {
    match name {
        SectionName::ExecutiveSummary => "📋",
        SectionName::MarketAnalysis => "📈",
        SectionName::TechnicalDetails => "🔧",
        SectionName::BusinessOpportunities => "💡",
        SectionName::KeyPlayers => "🏢",
        SectionName::LatestNews => "📰",
    }
}

/// Human-oriented report for the terminal
pub fn pretty(result: &ResearchResult) -> String {
    let mut out = String::new();

    out.push_str(&format!("🔍 Research: {}\n", result.topic));
    out.push_str(&format!(
        "   Generated {} | Confidence {:.0}%\n",
        result.generated_at.format("%Y-%m-%d %H:%M UTC"),
        result.confidence_score
    ));
    if !result.sources.is_empty() {
        out.push_str(&format!("   Sources: {}\n", result.sources.join(", ")));
    }
    if result.parse_outcome.is_fallback() {
        out.push_str("⚠️  No section headings recognized; showing the full response as the summary\n");
    }

    for (name, text) in result.sections.iter() {
        if text.trim().is_empty() {
            continue;
        }

        out.push_str(&format!(
            "\n{} {}\n{}\n",
            section_icon(name),
            name.title().to_uppercase(),
            "─".repeat(RULE_WIDTH)
        ));

        if name == SectionName::KeyPlayers {
            let players = result.key_players();
            if !players.is_empty() {
                for player in players {
                    out.push_str(&format!("  • {player}\n"));
                }
                continue;
            }
        }

        out.push_str(text.trim_end());
        out.push('\n');
    }

    if !result.news_items.is_empty() {
        out.push_str(&format!("\n📰 NEWS ARTICLES ({})\n", result.news_items.len()));
        out.push_str(&news_table(result));
        out.push('\n');
    }

    out
}

fn news_table(result: &ResearchResult) -> String {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["#", "Title", "Source", "Published"]);

    for (index, item) in result.news_items.iter().enumerate() {
        table.add_row(vec![
            (index + 1).to_string(),
            item.title.clone(),
            item.source.clone(),
            item.published_at
                .map(|dt| dt.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
        ]);
    }

    table.to_string()
}

/// Table of service probe results
pub fn services(statuses: &[ServiceStatus]) -> String {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Service", "Provider", "Status", "Latency"]);

    for status in statuses {
        let state = match &status.state {
            ServiceState::Ok => "✅ ok".to_string(),
            ServiceState::Failed(reason) => format!("❌ {reason}"),
            ServiceState::NotConfigured => "⚪ not configured".to_string(),
        };

        table.add_row(vec![
            status.service.to_string(),
            status.provider.unwrap_or("-").to_string(),
            state,
            status
                .latency
                .map(|latency| format!("{} ms", latency.as_millis()))
                .unwrap_or_else(|| "-".to_string()),
        ]);
    }

    table.to_string()
}

/// Fatal error line
pub fn error(err: &anyhow::Error) -> String {
    format!("❌ Error: {err:#}")
}
