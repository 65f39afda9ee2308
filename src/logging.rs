//! Structured logging for method binding and dispatch.
//!
//! All events go through `tracing` with an `event` field so they can be
//! filtered in JSON output. Call [`init_tracing`] once from a binary or test
//! harness; the library itself never installs a subscriber.

use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the tracing subscriber with appropriate configuration
pub fn init_tracing() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("mcpbind=info"));

    // Check if JSON format is requested
    let json_format = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(env_filter);
    let installed = if json_format {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(true),
            )
            .try_init()
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_level(true),
            )
            .try_init()
    };

    if installed.is_ok() {
        info!("Tracing initialized");
    }
}

/// A declared method was left out of a provider's output
pub fn log_method_skipped(component: &str, method: &str, reason: &str) {
    warn!(
        component = %component,
        method = %method,
        reason = %reason,
        event = "method_skipped",
        "Skipping method"
    );
}

/// A provider found nothing to emit
pub fn log_provider_empty(kind: &str, components: usize) {
    warn!(
        kind = %kind,
        components = components,
        event = "provider_empty",
        "No qualifying methods found"
    );
}

pub fn log_specification_built(kind: &str, name: &str, flavor: &str) {
    debug!(
        kind = %kind,
        name = %name,
        flavor = %flavor,
        event = "specification_built",
        "Built specification"
    );
}

pub fn log_duplicate_name(kind: &str, name: &str) {
    warn!(
        kind = %kind,
        name = %name,
        event = "duplicate_name",
        "Dropping duplicate name, keeping the first"
    );
}

/// Invocation failure that was turned into an error envelope
pub fn log_invocation_error(kind: &str, method: &str, error: &anyhow::Error) {
    warn!(
        kind = %kind,
        method = %method,
        error = %error,
        event = "invocation_error",
        "Method invocation failed"
    );
}

/// Peer lacks a capability, so the operation was skipped
pub fn log_capability_skipped(capability: &str, reason: &str) {
    warn!(
        capability = %capability,
        reason = %reason,
        event = "capability_skipped",
        "Skipping operation"
    );
}

pub fn log_dispatch(kind: &str, name: &str) {
    debug!(
        kind = %kind,
        name = %name,
        event = "dispatch",
        "Dispatching"
    );
}

pub fn log_registry_replaced(kind: &str, name: &str) {
    warn!(
        kind = %kind,
        name = %name,
        event = "registry_replaced",
        "Replacing registered specification"
    );
}
