//! Tracing subscriber setup

use courier_core::{ConfigError, CourierResult};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when `RUST_LOG` is not set.
pub const DEFAULT_LOG_FILTER: &str = "courier_broker=debug,info";

/// Install the global tracing subscriber.
///
/// Honors `RUST_LOG`, falling back to [`DEFAULT_LOG_FILTER`]. `json` selects
/// structured JSON lines instead of the human-readable format. Fails if a
/// global subscriber is already installed.
pub fn init_tracing(json: bool) -> CourierResult<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let registry = tracing_subscriber::registry().with(env_filter);
    let result = if json {
        registry.with(fmt::layer().json()).try_init()
    } else {
        registry.with(fmt::layer()).try_init()
    };

    result.map_err(|e| ConfigError::TelemetryInit {
        reason: format!("Failed to init subscriber: {}", e),
    })?;

    tracing::info!(json, "Telemetry initialized");
    Ok(())
}
