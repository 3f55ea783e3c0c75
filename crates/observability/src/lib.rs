//! Process-wide logging setup shared by the service binaries.

pub mod tracing;

pub use crate::tracing::LogFormat;

/// Initialize tracing with the format selected by `MARKET_LOG_FORMAT`.
///
/// Safe to call multiple times; subsequent calls are no-ops.
pub fn init() {
    crate::tracing::init(LogFormat::from_env());
}
