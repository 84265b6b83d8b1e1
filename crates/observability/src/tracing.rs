//! Tracing/logging initialization.
//!
//! Logs are emitted as one JSON object per line. The filter comes from
//! `RUST_LOG`; when it is unset or unparsable the given default applies.

use tracing::info;
use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is absent.
pub const DEFAULT_FILTER: &str = "info";

/// Resolve the effective filter directive.
pub fn filter(default_directive: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive))
}

/// Initialize tracing/logging for the process.
///
/// Safe to call multiple times (subsequent calls are no-ops). Returns whether
/// this call installed the subscriber.
pub fn init(default_directive: &str) -> bool {
    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter(default_directive))
        .json()
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_target(false)
        .with_current_span(true)
        .try_init()
        .is_ok();

    if installed {
        info!(default_filter = default_directive, "tracing initialized");
    }
    installed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_init_is_a_no_op() {
        let _first = init("debug");
        assert!(!init("debug"));
    }
}
