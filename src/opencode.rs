//! Host-side agent client used to attach to a container's server.

use async_trait::async_trait;

use crate::error::RuntimeError;
use crate::ports::SERVER_PORT;
use crate::reconcile::WORKSPACE_DIR;
use crate::runtime::process::run_inherited;
use crate::runtime::{shell_join, ExecSpec};

const OPENCODE: &str = "opencode";

/// Where and how to attach.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachTarget {
    pub url: String,
    pub password: String,
    /// Conversation to resume; a new one is started when unset.
    pub session: Option<String>,
}

impl AttachTarget {
    pub fn args(&self) -> Vec<String> {
        let mut args = vec![
            "attach".to_string(),
            self.url.clone(),
            "--dir".to_string(),
            WORKSPACE_DIR.to_string(),
            "--password".to_string(),
            self.password.clone(),
        ];
        if let Some(session) = &self.session {
            args.push("--session".to_string());
            args.push(session.clone());
        }
        args
    }

    /// Copy-pasteable command line for attaching by hand.
    pub fn manual_command(&self) -> String {
        shell_join(OPENCODE, &self.args())
    }
}

/// Interactive agent client inheriting the invoking terminal.
#[async_trait]
pub trait AgentClient: Send + Sync {
    async fn attach(&self, target: &AttachTarget) -> Result<(), RuntimeError>;
}

/// [`AgentClient`] backed by the host's `opencode` binary.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpencodeCli;

#[async_trait]
impl AgentClient for OpencodeCli {
    async fn attach(&self, target: &AttachTarget) -> Result<(), RuntimeError> {
        run_inherited(OPENCODE, &target.args()).await
    }
}

/// In-container command line starting the agent server on the inner port.
pub fn serve_command() -> String {
    format!("{OPENCODE} serve --hostname 0.0.0.0 --port {SERVER_PORT}")
}

/// Background exec starting the agent server in a running container.
///
/// Runs through a login shell so the container's tool paths are set up.
pub fn serve_exec_spec(container: &str, shell: &str) -> ExecSpec {
    ExecSpec::new(
        container,
        vec![shell.to_string(), "-lc".to_string(), serve_command()],
    )
    .detached()
}

/// Base URL of a server published on `port`.
pub fn server_url(port: u16) -> String {
    format!("http://localhost:{port}")
}
