//! Core types for research-rs
//!
//! This crate defines the data model shared by every other crate in the
//! workspace: research requests, the six fixed report sections, news items,
//! and the caller-facing error taxonomy.

pub mod error;
pub mod model;

pub use error::{Error, Result};
pub use model::{
    DataSource, NewsItem, ParseOutcome, ResearchRequest, ResearchResult, SectionName, Sections,
};
