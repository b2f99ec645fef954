//! Repository root discovery and profile validation.

use crate::error::ConfigError;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Directory holding one subdirectory per profile.
pub const SPINS_DIR: &str = "spins";
const DOCKERFILE: &str = "Dockerfile";
const ENTRYPOINT: &str = "entrypoint.sh";
const AGENTS_FILE: &str = "AGENTS.md";
const LEGACY_AGENTS_FILE: &str = "AGENT.md";

/// Candidate sources for the repository root, highest precedence first.
#[derive(Debug, Default, Clone, Copy)]
pub struct RepoSearch<'a> {
    /// `--repo` flag.
    pub explicit: Option<&'a Path>,
    /// `CAIGED_REPO` environment value.
    pub env: Option<&'a Path>,
    /// Path baked in at build time.
    pub compiled: Option<&'a Path>,
    pub workdir: Option<&'a Path>,
    pub cwd: Option<&'a Path>,
    pub exe_dir: Option<&'a Path>,
}

/// True when `path` contains `spins/`, `Dockerfile` and `entrypoint.sh`.
pub fn is_repo_root(path: &Path) -> bool {
    path.join(SPINS_DIR).is_dir() && path.join(DOCKERFILE).exists() && path.join(ENTRYPOINT).exists()
}

/// Walk from `start` toward the filesystem root and return the first root.
pub fn find_repo_root(start: &Path) -> Option<PathBuf> {
    start.ancestors().find(|dir| is_repo_root(dir)).map(Path::to_path_buf)
}

/// Resolve the repository root from the ordered candidate list.
///
/// Explicit and environment overrides must qualify or resolution fails; a
/// stale compiled-in path only warns and falls through to searching.
pub fn resolve_repo_root(search: &RepoSearch<'_>) -> Result<PathBuf, ConfigError> {
    for (source, path) in [("--repo", search.explicit), ("CAIGED_REPO", search.env)] {
        if let Some(path) = path {
            if is_repo_root(path) {
                debug!(source, path = %path.display(), "using repo root override");
                return Ok(path.to_path_buf());
            }
            return Err(ConfigError::InvalidRepo(path.to_path_buf()));
        }
    }

    if let Some(compiled) = search.compiled {
        if is_repo_root(compiled) {
            debug!(path = %compiled.display(), "using compiled repo root");
            return Ok(compiled.to_path_buf());
        }
        warn!(
            path = %compiled.display(),
            "compiled repo path no longer qualifies; searching instead"
        );
    }

    let starts = [
        ("workdir", search.workdir),
        ("cwd", search.cwd),
        ("executable", search.exe_dir),
    ];
    for (source, start) in starts {
        let Some(start) = start else { continue };
        if let Some(root) = find_repo_root(start) {
            debug!(source, path = %root.display(), "found repo root by search");
            return Ok(root);
        }
    }

    Err(ConfigError::RepoNotFound(
        "set --repo or CAIGED_REPO".to_string(),
    ))
}

/// Locate and validate a profile directory under the repository root.
pub fn validate_profile(repo_root: &Path, spin: &str) -> Result<PathBuf, ConfigError> {
    let spins = repo_root.join(SPINS_DIR);
    if spin.is_empty() || spin.contains(['/', '\\']) || spin == "." || spin == ".." {
        return Err(ConfigError::InvalidProfile {
            path: spins,
            reason: format!("invalid spin name `{spin}`"),
        });
    }
    let spin_dir = spins.join(spin);
    if !spin_dir.is_dir() {
        return Err(ConfigError::InvalidProfile {
            path: spin_dir,
            reason: format!("unknown spin `{spin}`"),
        });
    }

    if !spin_dir.join(AGENTS_FILE).is_file() && !spin_dir.join(LEGACY_AGENTS_FILE).is_file() {
        return Err(ConfigError::InvalidProfile {
            path: spin_dir.join(AGENTS_FILE),
            reason: format!("missing {AGENTS_FILE} (or legacy {LEGACY_AGENTS_FILE})"),
        });
    }

    for sub in ["skills", "mcp"] {
        let candidate = spin_dir.join(sub);
        if candidate.exists() && !candidate.is_dir() {
            return Err(ConfigError::InvalidProfile {
                path: candidate,
                reason: format!("{sub} is not a directory"),
            });
        }
    }

    Ok(spin_dir)
}
