use std::sync::Once;

use thiserror::Error;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{EnvFilter, fmt};

/// Environment variable enabling log output in tests.
pub const ENABLE_TRACING_ENV_NAME: &str = "ENABLE_TRACING";

/// Filter applied when `RUST_LOG` is not set.
const DEFAULT_FILTER: &str = "info";

static INIT_TEST_TRACING: Once = Once::new();

/// Output format of the global subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable, colored output.
    Pretty,
    /// One JSON object per event.
    Json,
}

#[derive(Debug, Error)]
pub enum TracingError {
    #[error("failed to install the global tracing subscriber: {0}")]
    Init(#[from] TryInitError),
}

/// Installs the global tracing subscriber for `app_name`.
///
/// The filter comes from `RUST_LOG` and falls back to `info`. Events are written to stderr so
/// that stdout only carries program output.
pub fn init_tracing(app_name: &str, format: LogFormat) -> Result<(), TracingError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into());
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Pretty => registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .try_init()?,
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(false)
                    .with_writer(std::io::stderr),
            )
            .try_init()?,
    }

    tracing::info!(app = app_name, ?format, "tracing initialized");

    Ok(())
}

/// Installs a test subscriber once per process when `ENABLE_TRACING` is set.
///
/// Output goes through the test writer, so it is captured per test like `println!`.
pub fn init_test_tracing() {
    if std::env::var(ENABLE_TRACING_ENV_NAME).is_err() {
        return;
    }

    INIT_TEST_TRACING.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "debug".into());
        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_test_writer())
            .try_init();
    });
}
