//! Tracing setup for the pipeline binary.
//!
//! Structured logging via `tracing` and `tracing-subscriber`. The filter is
//! taken from `RUST_LOG` when set, falling back to the configured level, so a
//! config file sets the baseline and the environment can still override it
//! per invocation.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the global tracing subscriber.
///
/// `default_level` is a `tracing` directive string (e.g. `"info"` or
/// `"speckle_pipeline=debug"`). Returns an error if a global subscriber is
/// already installed.
pub fn init(default_level: &str) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact().with_target(true))
        .try_init()?;
    Ok(())
}
