//! Prompts sent to the AI client
//!
//! The research prompt asks for the six section headings verbatim and in
//! canonical order so the heading table recognizes them without guesswork.

use research_core::SectionName;

/// System instruction for research reports
pub fn system_prompt() -> &'static str {
    r"You are a senior research analyst who writes concise, factual briefings for business readers.

Your expertise includes:
- Market sizing, growth drivers and competitive landscapes
- Explaining technology in plain language without losing accuracy
- Spotting concrete business and investment opportunities

When writing a report:
1. Use exactly the numbered section headings you are given, each on its own line
2. Prefer specific figures, dates and company names over generalities
3. State uncertainty plainly when data is estimated or dated
4. Never add sections beyond the ones requested

Use plain text or simple Markdown. Do not wrap the report in code fences."
}

/// What each section should cover
fn guidance(name: SectionName) -> &'static str {
    match name {
        SectionName::ExecutiveSummary => {
            "What the topic is, why it matters now, adoption level and headline figures."
        }
        SectionName::MarketAnalysis => {
            "Market size and projections, growth rate and drivers, competitive landscape, recent funding."
        }
        SectionName::TechnicalDetails => {
            "How it works, core components, current capabilities and limitations, roadmap."
        }
        SectionName::BusinessOpportunities => {
            "Concrete startup ideas, project suggestions and partnership or investment angles."
        }
        SectionName::KeyPlayers => {
            "A bulleted list of the most important companies or organizations, one per line."
        }
        SectionName::LatestNews => {
            "Notable developments from the last few months, most recent first."
        }
    }
}

/// User prompt asking for a six-section report on `topic`
pub fn research_prompt(topic: &str) -> String {
    let mut prompt = format!(
        "Write a research report on: {}\n\nStructure the report with these headings, in this order:\n\n",
        topic.trim()
    );

    for (index, name) in SectionName::ALL.iter().enumerate() {
        prompt.push_str(&format!(
            "{}. {}\n   {}\n",
            index + 1,
            name.title().to_uppercase(),
            guidance(*name)
        ));
    }

    prompt.push_str(
        "\nStart directly with the first heading. Keep the whole report under 1500 words.",
    );
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::ResponseParser;

    #[test]
    fn test_research_prompt_lists_headings_in_order() {
        let prompt = research_prompt("  quantum computing ");
        assert!(prompt.starts_with("Write a research report on: quantum computing\n"));

        let positions: Vec<usize> = SectionName::ALL
            .iter()
            .map(|name| prompt.find(&name.title().to_uppercase()).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
        assert!(prompt.contains("6. LATEST NEWS"));
    }

    #[test]
    fn test_prompt_headings_are_recognized() {
        let prompt = research_prompt("anything");
        let parsed = ResponseParser::default().parse(&prompt);
        assert_eq!(
            parsed.outcome,
            research_core::ParseOutcome::Structured { headings: 6 }
        );
    }

    #[test]
    fn test_system_prompt() {
        assert!(system_prompt().contains("numbered section headings"));
    }
}
