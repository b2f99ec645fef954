//! Snapshot of host process state consulted while resolving a session.

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};

use crate::build_info::DEFAULT_REPO_PATH;

/// Process environment captured once per invocation.
///
/// Resolution never reads ambient process state directly, so tests can build
/// this value by hand.
#[derive(Debug, Clone, Default)]
pub struct HostContext {
    pub vars: HashMap<String, String>,
    pub cwd: Option<PathBuf>,
    pub exe_dir: Option<PathBuf>,
    pub home: Option<PathBuf>,
    pub compiled_repo: Option<PathBuf>,
}

impl HostContext {
    /// Capture the current process environment.
    pub fn capture() -> Self {
        let vars = std::env::vars_os()
            .filter_map(|(key, value)| Some((key.into_string().ok()?, value.into_string().ok()?)))
            .collect();
        Self {
            vars,
            cwd: std::env::current_dir().ok(),
            exe_dir: std::env::current_exe()
                .ok()
                .and_then(|exe| exe.parent().map(Path::to_path_buf)),
            home: dirs::home_dir(),
            compiled_repo: DEFAULT_REPO_PATH
                .filter(|path| !path.trim().is_empty())
                .map(PathBuf::from),
        }
    }

    /// Look up one environment variable.
    pub fn var(&self, name: &str) -> Option<String> {
        self.vars.get(name).cloned()
    }

    /// Non-empty variable value as a path, made absolute against the cwd.
    pub fn path_var(&self, name: &str) -> Option<PathBuf> {
        self.vars
            .get(name)
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
            .map(|value| self.absolutize(Path::new(value)))
    }

    /// Make `path` absolute against the captured cwd and normalize `.`/`..`.
    pub fn absolutize(&self, path: &Path) -> PathBuf {
        let joined = if path.is_absolute() {
            path.to_path_buf()
        } else {
            match &self.cwd {
                Some(cwd) => cwd.join(path),
                None => path.to_path_buf(),
            }
        };
        normalize(&joined)
    }

    /// `~/.config/gh` when present as a directory.
    pub fn gh_config_dir(&self) -> Option<PathBuf> {
        self.home
            .as_ref()
            .map(|home| home.join(".config").join("gh"))
            .filter(|path| path.is_dir())
    }

    /// `~/.local/share/opencode/auth.json` when present as a file.
    pub fn opencode_auth_file(&self) -> Option<PathBuf> {
        self.home
            .as_ref()
            .map(|home| home.join(".local/share/opencode/auth.json"))
            .filter(|path| path.is_file())
    }
}

fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            other => out.push(other),
        }
    }
    if out.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        out
    }
}
