//! Host secret forwarding into session containers.

use crate::error::ConfigError;
use std::path::{Path, PathBuf};

/// True when `name` matches `^[A-Z_][A-Z0-9_]*$`.
pub fn is_valid_env_name(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    (first.is_ascii_uppercase() || first == '_')
        && chars.all(|ch| ch.is_ascii_uppercase() || ch.is_ascii_digit() || ch == '_')
}

/// Resolve requested secret names into `NAME=value` assignments.
///
/// Blank entries are skipped; order follows the request.
pub fn resolve_secret_envs<FEnv>(names: &[String], env_lookup: FEnv) -> Result<Vec<String>, ConfigError>
where
    FEnv: Fn(&str) -> Option<String>,
{
    let mut assignments = Vec::with_capacity(names.len());
    for raw in names {
        let name = raw.trim();
        if name.is_empty() {
            continue;
        }
        if !is_valid_env_name(name) {
            return Err(ConfigError::InvalidSecretName(name.to_string()));
        }
        let Some(value) = env_lookup(name) else {
            return Err(ConfigError::MissingSecret(name.to_string()));
        };
        assignments.push(format!("{name}={value}"));
    }
    Ok(assignments)
}

/// Validate a `--env-file` path: it must exist and must not be a directory.
pub fn resolve_secret_env_file(path: &Path) -> Result<PathBuf, ConfigError> {
    match std::fs::metadata(path) {
        Ok(meta) if meta.is_dir() => Err(ConfigError::InvalidSecretEnvFile(format!(
            "{} is a directory",
            path.display()
        ))),
        Ok(_) => Ok(path.to_path_buf()),
        Err(_) => Err(ConfigError::InvalidSecretEnvFile(path.display().to_string())),
    }
}
