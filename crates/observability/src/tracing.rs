//! Tracing subscriber initialization.
//!
//! Logs are JSON lines with timestamps. `RUST_LOG` selects what is emitted;
//! without it the ledger crates log at `info`.

use std::sync::Once;

use tracing_subscriber::EnvFilter;

/// Directive used when `RUST_LOG` is unset or unparsable.
pub const DEFAULT_DIRECTIVE: &str = "info";

static INIT: Once = Once::new();

fn filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE))
}

/// Install the global subscriber once.
///
/// Another subscriber installed first (a test harness, an embedding
/// application) wins; this then does nothing.
pub fn init() {
    INIT.call_once(|| {
        let installed = tracing_subscriber::fmt()
            .with_env_filter(filter())
            .json()
            .with_timer(tracing_subscriber::fmt::time::SystemTime)
            .with_target(false)
            .try_init()
            .is_ok();
        if installed {
            ::tracing::debug!(directive = DEFAULT_DIRECTIVE, "tracing initialized");
        }
    });
}
