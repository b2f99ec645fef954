//! Default configuration constants.
//!
//! Callers share these constants instead of duplicating literals.

/// Prefix for image tags, container names and multiplexer sessions.
pub(super) const DEFAULT_IMAGE_PREFIX: &str = "caiged";
/// Shell used for interactive access inside containers.
pub(super) const DEFAULT_CONTAINER_SHELL: &str = "/bin/zsh";
/// Profile selected when `--spin` is omitted.
pub(super) const DEFAULT_SPIN: &str = "qa";
/// First host port tried for a fresh session.
pub(super) const DEFAULT_BASE_PORT: u16 = 4096;
/// Number of candidate ports scanned upward from the base.
pub(super) const DEFAULT_PORT_SPAN: u16 = 1000;
/// Overall readiness wall-clock budget.
pub(super) const DEFAULT_READY_TIMEOUT_SECS: u64 = 60;
/// First readiness retry delay.
pub(super) const DEFAULT_READY_INITIAL_BACKOFF_MS: u64 = 250;
/// Readiness retry delay cap.
pub(super) const DEFAULT_READY_MAX_BACKOFF_MS: u64 = 2_000;
/// Per-request readiness probe timeout.
pub(super) const DEFAULT_READY_REQUEST_TIMEOUT_MS: u64 = 1_000;
pub(super) const DEFAULT_ARCH: &str = "arm64";
pub(super) const DEFAULT_MISE_VERSION: &str = "2026.2.13";
pub(super) const DEFAULT_GH_VERSION: &str = "2.86.0";
pub(super) const DEFAULT_OPENCODE_VERSION: &str = "latest";
