//! Shared utilities for research-rs
//!
//! This crate provides common functionality used across the research-rs workspace:
//! tracing setup and the configuration that is loaded once at startup and
//! handed to every client constructor.

pub mod config;
pub mod logging;

pub use config::{ApiKeys, Config, ConfigBuilder, ConfigError, LogFormat};
pub use logging::{init_tracing, init_tracing_with};
