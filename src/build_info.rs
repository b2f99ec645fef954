//! Compile-time build metadata exposed to CLI/runtime surfaces.

/// Semver package version from `Cargo.toml`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// VCS commit hash captured at build time.
pub const GIT_COMMIT: &str = env!("CAIGED_BUILD_GIT_HASH");

/// Build timestamp captured at compile time.
pub const BUILD_TIMESTAMP: &str = env!("CAIGED_BUILD_TIMESTAMP");

/// Repository root compiled in via `CAIGED_DEFAULT_REPO`, if any.
pub const DEFAULT_REPO_PATH: Option<&str> = option_env!("CAIGED_DEFAULT_REPO");

/// Render CLI version block used by `caiged --version`.
pub fn cli_version_text() -> String {
    let mut text = format!("caiged {VERSION}\ncommit: {GIT_COMMIT}\nbuilt: {BUILD_TIMESTAMP}");
    if let Some(repo) = DEFAULT_REPO_PATH {
        text.push_str(&format!("\nrepo: {repo}"));
    }
    text
}
