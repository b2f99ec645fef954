//! Settings loading from TOML files and environment variables.
//!
//! Settings are loaded in this order of precedence (highest wins):
//! 1. Environment variables (`IMAGE_PREFIX`, `CONTAINER_SHELL`, `ARCH`,
//!    `MISE_VERSION`, `GH_VERSION`, `OPENCODE_VERSION`)
//! 2. TOML file specified via --config CLI flag
//! 3. $XDG_CONFIG_HOME/caiged/caiged.toml (or ~/.config/caiged/caiged.toml)
//! 4. Built-in defaults

use crate::error::ConfigError;
use std::path::{Path, PathBuf};

mod defaults;
mod env;
mod types;

use env::apply_env_overrides;
pub use env::REPO_ENV;
pub use types::{
    BuildSettings, DisplaySettings, PortSettings, ReadinessSettings, Settings, WorkspaceSettings,
};

/// Directory name under the config root holding caiged state.
const APP_DIR: &str = "caiged";
const SETTINGS_FILE: &str = "caiged.toml";
const SALT_FILE: &str = "salt";

/// Load settings from disk and environment.
///
/// `path_override` is an explicit settings file path (from --config flag).
pub fn load_settings(path_override: Option<&Path>) -> Result<Settings, ConfigError> {
    load_settings_from_sources(
        path_override,
        |path| std::fs::read_to_string(path),
        |name| std::env::var(name).ok(),
        config_root_dir,
    )
}

fn load_settings_from_sources<FRead, FEnv, FRoot>(
    path_override: Option<&Path>,
    read_file: FRead,
    env_lookup: FEnv,
    config_root: FRoot,
) -> Result<Settings, ConfigError>
where
    FRead: Fn(&Path) -> Result<String, std::io::Error>,
    FEnv: Fn(&str) -> Option<String>,
    FRoot: Fn() -> Option<PathBuf>,
{
    let text = match path_override {
        // An explicit path must exist; the global file is optional.
        Some(path) => read_file(path)?,
        None => config_root()
            .map(|dir| dir.join(APP_DIR).join(SETTINGS_FILE))
            .and_then(|path| read_file(&path).ok())
            .unwrap_or_default(),
    };
    let mut settings: Settings = toml::from_str(&text)?;
    apply_env_overrides(&mut settings, &env_lookup);
    validate(&settings)?;
    Ok(settings)
}

fn validate(settings: &Settings) -> Result<(), ConfigError> {
    if settings.image_prefix.trim().is_empty() {
        return Err(ConfigError::Invalid("image_prefix cannot be empty".into()));
    }
    if settings.ports.base == 0 {
        return Err(ConfigError::Invalid("ports.base must be at least 1".into()));
    }
    if settings.ports.span == 0 {
        return Err(ConfigError::Invalid(
            "ports.span must scan at least one port".into(),
        ));
    }
    if settings.readiness.initial_backoff_ms == 0
        || settings.readiness.max_backoff_ms < settings.readiness.initial_backoff_ms
    {
        return Err(ConfigError::Invalid(
            "readiness backoff must satisfy 0 < initial_backoff_ms <= max_backoff_ms".into(),
        ));
    }
    Ok(())
}

/// Return the config root directory (`$XDG_CONFIG_HOME` or `~/.config`).
pub fn config_root_dir() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("XDG_CONFIG_HOME") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return Some(PathBuf::from(trimmed));
        }
    }
    dirs::home_dir()
        .map(|home| home.join(".config"))
        .or_else(dirs::config_dir)
}

/// Fixed per-user path of the credential salt file.
pub fn default_salt_path() -> Option<PathBuf> {
    config_root_dir().map(|dir| dir.join(APP_DIR).join(SALT_FILE))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
