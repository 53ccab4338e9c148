//! Process-wide logging setup shared by binaries, tests and benches.

/// Initialize tracing for the process.
///
/// Safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init();
}

/// Subscriber configuration (filter, JSON formatting).
pub mod tracing;
