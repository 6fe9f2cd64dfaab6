//! Log subscriber installation for the CLI process.

use thiserror::Error;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::ParseError;

/// Filter applied when `RUST_LOG` is unset or unusable.
pub(crate) const DEFAULT_LOG_FILTER: &str = "info";

/// Errors raised while installing the subscriber.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// The fallback filter directive did not parse.
    #[error("invalid log filter {value:?}")]
    EnvFilter {
        /// Directive that failed to parse.
        value: String,
        /// Parser failure.
        #[source]
        source: ParseError,
    },
    /// A global subscriber is already installed.
    #[error("failed to install log subscriber")]
    Subscriber(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Install a compact `fmt` subscriber writing to stderr.
///
/// `RUST_LOG` takes precedence over `fallback`. Records emitted through the
/// `log` facade by the library crates are forwarded to the subscriber.
pub(crate) fn init(fallback: &str) -> Result<(), TelemetryError> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(fallback))
        .map_err(|source| TelemetryError::EnvFilter {
            value: fallback.to_owned(),
            source,
        })?;

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .try_init()
        .map_err(TelemetryError::Subscriber)
}
