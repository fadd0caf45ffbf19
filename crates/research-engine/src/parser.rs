//! Splits free-form AI output into the six report sections
//!
//! Headings are recognized line by line against an explicit [`HeadingTable`].
//! A line counts as a heading when, once decoration is stripped, its text is
//! exactly one of a section's phrases:
//!
//! ```text
//! ## 1. **Executive Summary** (250 words)
//! MARKET ANALYSIS: demand is growing
//! IV) Business Opportunities
//! ```
//!
//! Decoration means leading `#`, `*`, `_`, `>` markup, a numbering prefix
//! (`1.`, `2)`, `IV.`), trailing markup and a trailing parenthetical. Text after
//! a colon on the heading line becomes the first line of the section body, but
//! only for multi-word phrases: `Market: demand is up` is body text.
//!
//! List items (`* `, `- `, `+ `, `• `) are never headings, so labeled bullets
//! such as `* **Technology:** sulfide electrolytes` stay in their section.
//!
//! Parsing never fails. Output without any recognized heading is returned
//! whole as the executive summary with [`ParseOutcome::Fallback`].

use research_core::{Error, ParseOutcome, Result, SectionName, Sections};
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;
use tracing::debug;

pub use research_core::model::list_items as extract_list_items;

/// `1.`, `12)`, `iv.`, `IV)` followed by optional whitespace
///
/// A single lowercase letter is a list marker (`c)`), not a roman numeral.
static NUMBERING: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"^(?:\d{1,3}|[IVXLC]{1,6}|[ivxlc]{2,6})[.)]\s*").ok()
});

/// `(250 words)` at the end of a heading
static TRAILING_PARENTHETICAL: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\s*\([^()]*\)\s*$").ok());

const MARKUP: &[char] = &['#', '*', '_', '>'];

const LIST_BULLETS: &[&str] = &["* ", "- ", "+ ", "• "];

/// Built-in heading phrases, matched case-insensitively
mod phrases {
    pub const EXECUTIVE_SUMMARY: &[&str] = &["executive summary", "summary", "overview"];

    pub const MARKET_ANALYSIS: &[&str] = &[
        "market analysis",
        "market overview",
        "market landscape",
        "market",
    ];

    pub const TECHNICAL_DETAILS: &[&str] = &[
        "technical details",
        "technical analysis",
        "technical overview",
        "technology",
    ];

    pub const BUSINESS_OPPORTUNITIES: &[&str] = &[
        "business opportunities",
        "business opportunities & project suggestions",
        "business opportunities and project suggestions",
        "opportunities",
    ];

    pub const KEY_PLAYERS: &[&str] = &[
        "key players",
        "major players",
        "key companies",
        "leading companies",
        "players",
    ];

    pub const LATEST_NEWS: &[&str] = &[
        "latest news",
        "recent news",
        "latest developments",
        "recent developments",
        "news",
    ];
}

/// Section name to recognized heading phrases
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadingTable {
    phrases: BTreeMap<SectionName, Vec<String>>,
}

impl Default for HeadingTable {
    fn default() -> Self {
        let builtin = |name: SectionName| -> &'static [&'static str] {
            match name {
                SectionName::ExecutiveSummary => phrases::EXECUTIVE_SUMMARY,
                SectionName::MarketAnalysis => phrases::MARKET_ANALYSIS,
                SectionName::TechnicalDetails => phrases::TECHNICAL_DETAILS,
                SectionName::BusinessOpportunities => phrases::BUSINESS_OPPORTUNITIES,
                SectionName::KeyPlayers => phrases::KEY_PLAYERS,
                SectionName::LatestNews => phrases::LATEST_NEWS,
            }
        };

        Self {
            phrases: SectionName::ALL
                .iter()
                .map(|&name| {
                    let list = builtin(name).iter().map(|p| (*p).to_string()).collect();
                    (name, list)
                })
                .collect(),
        }
    }
}

impl HeadingTable {
    /// Load a table from a JSON object keyed by snake_case section name
    ///
    /// ```json
    /// { "executive_summary": ["TL;DR", "Summary"], "latest_news": ["Headlines"] }
    /// ```
    ///
    /// Sections present in the document replace the built-in phrases, the
    /// others keep them. A phrase claimed by two sections is rejected.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let overrides: BTreeMap<SectionName, Vec<String>> = serde_json::from_str(json)?;

        let mut table = Self::default();
        for (name, list) in overrides {
            table.set(name, list)?;
        }
        table.check_conflicts()?;
        Ok(table)
    }

    /// Replace the phrases for one section
    pub fn set(&mut self, name: SectionName, phrases: impl IntoIterator<Item = String>) -> Result<()> {
        let list: Vec<String> = phrases
            .into_iter()
            .map(|p| normalize(&p))
            .filter(|p| !p.is_empty())
            .collect();

        if list.is_empty() {
            return Err(Error::Configuration(format!(
                "heading table entry '{}' has no usable phrases",
                name.key()
            )));
        }

        self.phrases.insert(name, list);
        Ok(())
    }

    /// Phrases recognized for a section
    pub fn phrases(&self, name: SectionName) -> &[String] {
        self.phrases.get(&name).map_or(&[], Vec::as_slice)
    }

    /// Which section a normalized heading text names, if any
    fn lookup(&self, heading: &str) -> Option<SectionName> {
        self.phrases
            .iter()
            .find(|(_, list)| list.iter().any(|p| p == heading))
            .map(|(name, _)| *name)
    }

    fn check_conflicts(&self) -> Result<()> {
        let mut owners: BTreeMap<&str, SectionName> = BTreeMap::new();
        for (name, list) in &self.phrases {
            for phrase in list {
                if let Some(other) = owners.insert(phrase.as_str(), *name) {
                    if other != *name {
                        return Err(Error::Configuration(format!(
                            "heading '{phrase}' is listed under both '{}' and '{}'",
                            other.key(),
                            name.key()
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}

/// Output of [`ResponseParser::parse`]
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedSections {
    pub sections: Sections,
    pub outcome: ParseOutcome,
    /// Text before the first recognized heading
    pub preamble: String,
}

/// Heading-driven section splitter
#[derive(Debug, Clone, Default)]
pub struct ResponseParser {
    table: HeadingTable,
}

impl ResponseParser {
    pub fn new(table: HeadingTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &HeadingTable {
        &self.table
    }

    /// Split `text` into sections
    pub fn parse(&self, text: &str) -> ParsedSections {
        let mut buffers: BTreeMap<SectionName, Vec<&str>> = BTreeMap::new();
        let mut preamble: Vec<&str> = Vec::new();
        let mut seen = BTreeSet::new();
        let mut current: Option<SectionName> = None;

        for line in text.lines() {
            let heading = self
                .match_heading(line)
                .filter(|(name, _)| !seen.contains(name));

            if let Some((name, rest)) = heading {
                seen.insert(name);
                current = Some(name);
                let body = buffers.entry(name).or_default();
                if !rest.is_empty() {
                    body.push(rest);
                }
                continue;
            }

            match current {
                Some(name) => buffers.entry(name).or_default().push(line),
                None => preamble.push(line),
            }
        }

        let mut sections = Sections::new();

        if seen.is_empty() {
            debug!("No headings recognized, using fallback");
            sections.set(SectionName::ExecutiveSummary, text.trim());
            return ParsedSections {
                sections,
                outcome: ParseOutcome::Fallback,
                preamble: String::new(),
            };
        }

        for (name, lines) in buffers {
            sections.set(name, lines.join("\n").trim());
        }

        debug!(headings = seen.len(), "Parsed structured response");
        ParsedSections {
            sections,
            outcome: ParseOutcome::Structured {
                headings: seen.len(),
            },
            preamble: preamble.join("\n").trim().to_string(),
        }
    }

    /// If `line` is a heading, the section it opens and any inline body text
    fn match_heading<'a>(&self, line: &'a str) -> Option<(SectionName, &'a str)> {
        let line = line.trim();
        if LIST_BULLETS.iter().any(|bullet| line.starts_with(bullet)) {
            return None;
        }

        let mut text = line.trim_start_matches(|c: char| MARKUP.contains(&c) || c.is_whitespace());

        if let Some(numbering) = NUMBERING.as_ref() {
            if let Some(found) = numbering.find(text) {
                text = &text[found.end()..];
            }
        }
        text = text.trim_start_matches(|c: char| MARKUP.contains(&c) || c.is_whitespace());

        let (heading, rest) = match text.split_once(':') {
            Some((heading, rest)) => (heading, rest),
            None => (text, ""),
        };

        let heading = clean_heading(heading);
        let name = self.table.lookup(&heading)?;
        let rest = rest.trim_matches(|c: char| MARKUP.contains(&c) || c.is_whitespace());

        if !rest.is_empty() && !heading.contains(' ') {
            return None;
        }
        Some((name, rest))
    }
}

/// Strip trailing decoration from heading text and normalize it for lookup
fn clean_heading(heading: &str) -> String {
    let mut text = heading.trim_end_matches(|c: char| MARKUP.contains(&c) || c.is_whitespace());

    if let Some(parenthetical) = TRAILING_PARENTHETICAL.as_ref() {
        if let Some(found) = parenthetical.find(text) {
            text = &text[..found.start()];
        }
    }

    normalize(text.trim_end_matches(|c: char| MARKUP.contains(&c) || c.is_whitespace()))
}

/// Lowercase with internal whitespace collapsed
fn normalize(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> ParsedSections {
        ResponseParser::default().parse(text)
    }

    const FULL_REPORT: &str = "\
1. EXECUTIVE SUMMARY
Solid-state batteries replace the liquid electrolyte.

2. MARKET ANALYSIS
The market is projected to grow quickly.
Automakers dominate demand.

3. TECHNICAL DETAILS
Sulfide and oxide electrolytes compete.

4. BUSINESS OPPORTUNITIES
Separator films and test equipment.

5. KEY PLAYERS
- Toyota
- QuantumScape
- Samsung SDI

6. LATEST NEWS
Pilot lines opened this quarter.";

    #[test]
    fn test_simple_headings() {
        let parsed =
            parse("Executive Summary\nAI is transforming tech.\nMarket Analysis\nGrowing 20% YoY.");

        assert_eq!(
            &parsed.sections[SectionName::ExecutiveSummary],
            "AI is transforming tech."
        );
        assert_eq!(
            &parsed.sections[SectionName::MarketAnalysis],
            "Growing 20% YoY."
        );
        assert_eq!(parsed.outcome, ParseOutcome::Structured { headings: 2 });
        assert!(parsed.sections.is_empty(SectionName::LatestNews));
    }

    #[test]
    fn test_all_six_sections_in_order() {
        let parsed = parse(FULL_REPORT);

        assert_eq!(parsed.outcome, ParseOutcome::Structured { headings: 6 });
        assert_eq!(parsed.sections.populated(), 6);
        assert!(parsed.preamble.is_empty());
        assert_eq!(
            &parsed.sections[SectionName::MarketAnalysis],
            "The market is projected to grow quickly.\nAutomakers dominate demand."
        );
        assert_eq!(
            &parsed.sections[SectionName::KeyPlayers],
            "- Toyota\n- QuantumScape\n- Samsung SDI"
        );
        assert_eq!(
            &parsed.sections[SectionName::LatestNews],
            "Pilot lines opened this quarter."
        );
    }

    #[test]
    fn test_no_content_lost() {
        let parsed = parse(FULL_REPORT);
        let body_lines: Vec<&str> = FULL_REPORT
            .lines()
            .filter(|l| !l.trim().is_empty())
            .filter(|l| !l.starts_with(|c: char| c.is_ascii_digit()))
            .collect();

        let rebuilt: Vec<&str> = parsed
            .sections
            .iter()
            .flat_map(|(_, text)| text.lines())
            .filter(|l| !l.trim().is_empty())
            .collect();

        assert_eq!(rebuilt, body_lines);
    }

    #[test]
    fn test_fallback_without_headings() {
        let text = "  Batteries are improving.\nNothing here looks like a heading.  ";
        let parsed = parse(text);

        assert_eq!(parsed.outcome, ParseOutcome::Fallback);
        assert_eq!(&parsed.sections[SectionName::ExecutiveSummary], text.trim());
        for name in &SectionName::ALL[1..] {
            assert!(parsed.sections.is_empty(*name));
        }
    }

    #[test]
    fn test_empty_input() {
        let parsed = parse("");
        assert_eq!(parsed.outcome, ParseOutcome::Fallback);
        assert_eq!(parsed.sections.populated(), 0);
    }

    #[test]
    fn test_markdown_decorations() {
        let text = "\
## 1. **Executive Summary** (250 words)
Short version.
### II) Market Analysis:
Long version.
**Technical Details:** inline body
more detail
> _Key Players_
Toyota";
        let parsed = parse(text);

        assert_eq!(parsed.outcome, ParseOutcome::Structured { headings: 4 });
        assert_eq!(&parsed.sections[SectionName::ExecutiveSummary], "Short version.");
        assert_eq!(&parsed.sections[SectionName::MarketAnalysis], "Long version.");
        assert_eq!(
            &parsed.sections[SectionName::TechnicalDetails],
            "inline body\nmore detail"
        );
        assert_eq!(&parsed.sections[SectionName::KeyPlayers], "Toyota");
    }

    #[test]
    fn test_labeled_bullets_stay_in_body() {
        let text = "\
1. EXECUTIVE SUMMARY
Solid-state batteries are nearing production.
* **Technology:** sulfide electrolytes lead.
- Market: automakers are the main buyers.
c) News

2. MARKET ANALYSIS
Demand is growing.

3. TECHNICAL DETAILS
Dendrites remain the main challenge.

4. BUSINESS OPPORTUNITIES
Separator films.

5. KEY PLAYERS
- Toyota

6. LATEST NEWS
Pilot lines opened.";
        let parsed = parse(text);

        assert_eq!(parsed.outcome, ParseOutcome::Structured { headings: 6 });
        assert_eq!(
            &parsed.sections[SectionName::ExecutiveSummary],
            "Solid-state batteries are nearing production.\n\
             * **Technology:** sulfide electrolytes lead.\n\
             - Market: automakers are the main buyers.\n\
             c) News"
        );
        assert_eq!(&parsed.sections[SectionName::MarketAnalysis], "Demand is growing.");
        assert_eq!(
            &parsed.sections[SectionName::TechnicalDetails],
            "Dendrites remain the main challenge."
        );
        assert_eq!(&parsed.sections[SectionName::LatestNews], "Pilot lines opened.");
    }

    #[test]
    fn test_single_word_heading_needs_own_line() {
        let parsed = parse("Summary\nMarket: demand is up.\nMarket:\nGrowth.");
        assert_eq!(
            &parsed.sections[SectionName::ExecutiveSummary],
            "Market: demand is up."
        );
        assert_eq!(&parsed.sections[SectionName::MarketAnalysis], "Growth.");
    }

    #[test]
    fn test_lowercase_letter_is_not_numbering() {
        let parsed = parse("i. Summary\nx\nii. Market Analysis\ny");
        assert_eq!(parsed.outcome, ParseOutcome::Structured { headings: 1 });
        assert_eq!(&parsed.sections[SectionName::MarketAnalysis], "y");
        assert_eq!(parsed.preamble, "i. Summary\nx");
    }

    #[test]
    fn test_case_insensitive_and_colon_body() {
        let parsed = parse("market analysis: demand is strong\nEXECUTIVE SUMMARY:\nok");
        assert_eq!(
            &parsed.sections[SectionName::MarketAnalysis],
            "demand is strong"
        );
        assert_eq!(&parsed.sections[SectionName::ExecutiveSummary], "ok");
    }

    #[test]
    fn test_mid_sentence_heading_not_matched() {
        let parsed = parse(
            "Executive Summary\nThe market analysis below is brief.\nOur executive summary ends here.",
        );
        assert_eq!(parsed.outcome, ParseOutcome::Structured { headings: 1 });
        assert!(parsed.sections.is_empty(SectionName::MarketAnalysis));
        assert_eq!(
            &parsed.sections[SectionName::ExecutiveSummary],
            "The market analysis below is brief.\nOur executive summary ends here."
        );
    }

    #[test]
    fn test_duplicate_heading_first_wins() {
        let parsed = parse(
            "Executive Summary\nFirst.\nMarket Analysis\nGrowth.\nExecutive Summary\nSecond.",
        );

        assert_eq!(parsed.outcome, ParseOutcome::Structured { headings: 2 });
        assert_eq!(&parsed.sections[SectionName::ExecutiveSummary], "First.");
        assert_eq!(
            &parsed.sections[SectionName::MarketAnalysis],
            "Growth.\nExecutive Summary\nSecond."
        );
    }

    #[test]
    fn test_out_of_order_headings() {
        let parsed = parse("Key Players\n- Acme\nExecutive Summary\nAll good.");
        assert_eq!(&parsed.sections[SectionName::KeyPlayers], "- Acme");
        assert_eq!(&parsed.sections[SectionName::ExecutiveSummary], "All good.");
    }

    #[test]
    fn test_preamble_kept_separately() {
        let parsed = parse("Sure! Here is your report.\n\nExecutive Summary\nBody.");
        assert_eq!(parsed.preamble, "Sure! Here is your report.");
        assert_eq!(&parsed.sections[SectionName::ExecutiveSummary], "Body.");
    }

    #[test]
    fn test_custom_table_from_json() {
        let table = HeadingTable::from_json_str(r#"{"executive_summary": ["TL;DR"], "latest_news": ["Headlines"]}"#)
            .unwrap();
        assert_eq!(table.phrases(SectionName::ExecutiveSummary), ["tl;dr"]);
        assert!(!table.phrases(SectionName::MarketAnalysis).is_empty());

        let parsed = ResponseParser::new(table).parse("TL;DR\nShort.\nHeadlines\n- One");
        assert_eq!(&parsed.sections[SectionName::ExecutiveSummary], "Short.");
        assert_eq!(&parsed.sections[SectionName::LatestNews], "- One");
    }

    #[test]
    fn test_table_rejects_conflicts_and_empties() {
        let conflict = HeadingTable::from_json_str(r#"{"latest_news": ["market"]}"#);
        assert!(matches!(conflict, Err(Error::Configuration(_))));

        let empty = HeadingTable::from_json_str(r#"{"key_players": ["  "]}"#);
        assert!(matches!(empty, Err(Error::Configuration(_))));

        let unknown = HeadingTable::from_json_str(r#"{"appendix": ["Appendix"]}"#);
        assert!(matches!(unknown, Err(Error::Serialization(_))));
    }

    #[test]
    fn test_extract_list_items_reexport() {
        let parsed = parse(FULL_REPORT);
        assert_eq!(
            extract_list_items(&parsed.sections[SectionName::KeyPlayers]),
            ["Toyota", "QuantumScape", "Samsung SDI"]
        );
    }
}
