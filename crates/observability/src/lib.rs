//! Tracing and logging setup shared by every binary in the workspace.

/// Initialize process-wide observability for `service_name`.
///
/// Safe to call multiple times; subsequent calls become no-ops.
pub fn init(service_name: &'static str) {
    tracing::init(service_name);
}

/// Tracing configuration (filters, layers).
pub mod tracing;
