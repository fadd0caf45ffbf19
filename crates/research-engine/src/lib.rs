//! Research orchestration for research-rs
//!
//! - [`parser`]: splits AI output into the six report sections
//! - [`prompt`]: the prompts sent to the AI client
//! - [`engine`]: runs a request against the AI client and optional sources
//! - [`export`]: text and JSON rendering of finished reports

pub mod engine;
pub mod export;
pub mod parser;
pub mod prompt;

pub use engine::{
    ResearchEngine, ResearchEngineBuilder, ServiceState, ServiceStatus, confidence_score,
    report_from_text,
};
pub use export::ExportFormat;
pub use parser::{HeadingTable, ParsedSections, ResponseParser, extract_list_items};
