//! Logging and tracing utilities

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::LogFormat;

/// Initialize tracing subscriber with default configuration
pub fn init_tracing() {
    init_tracing_with(LogFormat::Pretty);
}

/// Initialize tracing with the given output format
///
/// Logs are written to stderr so stdout only carries report output. The
/// filter comes from `RUST_LOG` and defaults to `info`.
pub fn init_tracing_with(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match format {
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init(),
    }

    tracing::debug!(?format, "Tracing initialized");
}
