//! Process-level tracing initialization.

use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter directive.
pub const LOG_ENV: &str = "CAIGED_LOG";

const DEFAULT_FILTER: &str = "warn";

/// Initialize stderr tracing output from `CAIGED_LOG`.
///
/// Best-effort: a second call or an invalid directive never fails startup.
pub fn init() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
