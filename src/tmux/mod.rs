//! Terminal multiplexer client and workspace management.

use async_trait::async_trait;

use crate::error::RuntimeError;
use crate::runtime::process::{non_empty_lines, run_checked, run_inherited, run_process};

pub mod windows;
pub mod workspace;

pub use windows::{WorkspaceWindow, WINDOW_ENV};
pub use workspace::{attach_workspace, ensure_workspace, order_windows, WorkspaceOutcome};

const TMUX: &str = "tmux";
const WINDOW_FORMAT: &str = "#{window_id}\t#{window_index}\t#{window_name}";

/// One window as reported by `list-windows`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowInfo {
    /// Stable id (`@3`); survives moves and renames.
    pub id: String,
    pub index: u32,
    pub name: String,
}

/// Target kind for `set-option`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionScope {
    Session,
    Window,
}

/// Narrow command surface used to manage workspaces.
#[async_trait]
pub trait Multiplexer: Send + Sync {
    /// Whether the current process runs inside a multiplexer client.
    fn inside_client(&self) -> bool;
    async fn has_session(&self, session: &str) -> bool;
    async fn new_session(
        &self,
        session: &str,
        first_window: &str,
        command: &str,
    ) -> Result<(), RuntimeError>;
    async fn new_window(&self, session: &str, name: &str, command: &str)
        -> Result<(), RuntimeError>;
    async fn list_windows(&self, session: &str) -> Result<Vec<WindowInfo>, RuntimeError>;
    async fn move_window(&self, window_id: &str, session: &str, index: u32)
        -> Result<(), RuntimeError>;
    async fn swap_window(&self, source_id: &str, target_id: &str) -> Result<(), RuntimeError>;
    async fn rename_window(&self, window_id: &str, name: &str) -> Result<(), RuntimeError>;
    async fn set_option(
        &self,
        scope: OptionScope,
        target: &str,
        option: &str,
        value: &str,
    ) -> Result<(), RuntimeError>;
    /// Configured `base-index`; 0 when it cannot be read.
    async fn base_index(&self) -> u32;
    async fn attach(&self, session: &str) -> Result<(), RuntimeError>;
    async fn switch_client(&self, session: &str) -> Result<(), RuntimeError>;
    async fn kill_session(&self, session: &str) -> Result<(), RuntimeError>;
    async fn list_sessions(&self) -> Result<Vec<String>, RuntimeError>;
}

/// [`Multiplexer`] backed by the `tmux` binary.
#[derive(Debug, Clone, Copy, Default)]
pub struct TmuxCli {
    inside: bool,
}

impl TmuxCli {
    /// Returns `None` when tmux is not installed.
    pub async fn discover() -> Option<Self> {
        if !crate::runtime::binary_available(TMUX, "-V").await {
            return None;
        }
        let inside = std::env::var("TMUX").is_ok_and(|value| !value.is_empty());
        Some(Self { inside })
    }

    async fn tmux(&self, args: &[&str]) -> Result<String, RuntimeError> {
        let args: Vec<String> = args.iter().map(|arg| arg.to_string()).collect();
        Ok(run_checked(TMUX, &args).await?.stdout)
    }
}

/// Exact-match session target, so `app` never matches `app-2`.
fn exact(session: &str) -> String {
    format!("={session}")
}

/// Parse `list-windows` output in [`WINDOW_FORMAT`].
pub(crate) fn parse_windows(output: &str) -> Vec<WindowInfo> {
    non_empty_lines(output)
        .iter()
        .filter_map(|line| {
            let mut parts = line.splitn(3, '\t');
            let id = parts.next()?.to_string();
            let index = parts.next()?.parse().ok()?;
            let name = parts.next().unwrap_or_default().to_string();
            Some(WindowInfo { id, index, name })
        })
        .collect()
}

/// Whether a tmux error only means no server is running.
pub fn is_no_server_error(err: &RuntimeError) -> bool {
    let detail = err.detail();
    detail.contains("no server running") || detail.contains("error connecting to")
}

#[async_trait]
impl Multiplexer for TmuxCli {
    fn inside_client(&self) -> bool {
        self.inside
    }

    async fn has_session(&self, session: &str) -> bool {
        let args = vec!["has-session".to_string(), "-t".into(), exact(session)];
        matches!(run_process(TMUX, &args).await, Ok(out) if out.exit_code == 0)
    }

    async fn new_session(
        &self,
        session: &str,
        first_window: &str,
        command: &str,
    ) -> Result<(), RuntimeError> {
        self.tmux(&["new-session", "-d", "-s", session, "-n", first_window, command])
            .await
            .map(drop)
    }

    async fn new_window(
        &self,
        session: &str,
        name: &str,
        command: &str,
    ) -> Result<(), RuntimeError> {
        let target = format!("{}:", exact(session));
        self.tmux(&["new-window", "-d", "-t", &target, "-n", name, command])
            .await
            .map(drop)
    }

    async fn list_windows(&self, session: &str) -> Result<Vec<WindowInfo>, RuntimeError> {
        let target = exact(session);
        let out = self
            .tmux(&["list-windows", "-t", &target, "-F", WINDOW_FORMAT])
            .await?;
        Ok(parse_windows(&out))
    }

    async fn move_window(
        &self,
        window_id: &str,
        session: &str,
        index: u32,
    ) -> Result<(), RuntimeError> {
        let target = format!("{}:{index}", exact(session));
        self.tmux(&["move-window", "-d", "-s", window_id, "-t", &target])
            .await
            .map(drop)
    }

    async fn swap_window(&self, source_id: &str, target_id: &str) -> Result<(), RuntimeError> {
        self.tmux(&["swap-window", "-d", "-s", source_id, "-t", target_id])
            .await
            .map(drop)
    }

    async fn rename_window(&self, window_id: &str, name: &str) -> Result<(), RuntimeError> {
        self.tmux(&["rename-window", "-t", window_id, name])
            .await
            .map(drop)
    }

    async fn set_option(
        &self,
        scope: OptionScope,
        target: &str,
        option: &str,
        value: &str,
    ) -> Result<(), RuntimeError> {
        let target = match scope {
            OptionScope::Session => exact(target),
            OptionScope::Window => target.to_string(),
        };
        let mut args = vec!["set-option", "-q"];
        if scope == OptionScope::Window {
            args.push("-w");
        }
        args.extend(["-t", target.as_str(), option, value]);
        self.tmux(&args).await.map(drop)
    }

    async fn base_index(&self) -> u32 {
        self.tmux(&["show-options", "-gv", "base-index"])
            .await
            .ok()
            .and_then(|out| out.trim().parse().ok())
            .unwrap_or(0)
    }

    async fn attach(&self, session: &str) -> Result<(), RuntimeError> {
        let args = vec!["attach-session".to_string(), "-t".into(), exact(session)];
        run_inherited(TMUX, &args).await
    }

    async fn switch_client(&self, session: &str) -> Result<(), RuntimeError> {
        let target = exact(session);
        self.tmux(&["switch-client", "-t", &target]).await.map(drop)
    }

    async fn kill_session(&self, session: &str) -> Result<(), RuntimeError> {
        let target = exact(session);
        self.tmux(&["kill-session", "-t", &target]).await.map(drop)
    }

    async fn list_sessions(&self) -> Result<Vec<String>, RuntimeError> {
        match self.tmux(&["list-sessions", "-F", "#{session_name}"]).await {
            Ok(out) => Ok(non_empty_lines(&out)),
            Err(err) if is_no_server_error(&err) => Ok(Vec::new()),
            Err(err) => Err(err),
        }
    }
}
