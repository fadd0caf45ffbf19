//! External data sources that enrich a research report
//!
//! - [`NewsSource`] / [`NewsApiClient`]: recent articles from NewsAPI
//! - [`MarketSource`] / [`FinnhubClient`]: listed companies and quotes from Finnhub
//!
//! Both are optional. The engine downgrades their failures to warnings.

pub mod error;
pub mod market;
pub mod news;

pub use error::{Result, SourceError};
pub use market::{FinnhubClient, MarketSource};
pub use news::{NewsApiClient, NewsSource};
