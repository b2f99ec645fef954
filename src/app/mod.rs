//! Session orchestration: sequences identity, allocation, reconciliation,
//! workspace management and attachment into the CLI workflows.
//!
//! Every collaborator is injected, so each workflow runs unchanged against
//! the in-memory mocks in tests.

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info};

use crate::config::Settings;
use crate::credentials::CredentialStore;
use crate::error::CaigedResult;
use crate::opencode::{serve_exec_spec, AgentClient};
use crate::readiness::{wait_ready, ProbeTransport, ReadinessPolicy, ReadyReport};
use crate::reconcile::{ServerMode, MODE_LABEL};
use crate::render::Renderer;
use crate::runtime::ContainerRuntime;
use crate::session::{resolve_descriptor, HostContext, RunOptions, SessionDescriptor};
use crate::tmux::Multiplexer;

mod connect;
mod containers;
mod run;

pub use run::{RunMode, RunOutcome};

/// External processes the orchestrator drives.
#[derive(Clone)]
pub struct Collaborators {
    pub runtime: Arc<dyn ContainerRuntime>,
    /// `None` when no multiplexer binary is installed.
    pub mux: Option<Arc<dyn Multiplexer>>,
    pub agent: Arc<dyn AgentClient>,
    pub probe: Arc<dyn ProbeTransport>,
}

/// Entry point for every CLI workflow.
pub struct Orchestrator {
    runtime: Arc<dyn ContainerRuntime>,
    mux: Option<Arc<dyn Multiplexer>>,
    agent: Arc<dyn AgentClient>,
    probe: Arc<dyn ProbeTransport>,
    credentials: CredentialStore,
    settings: Settings,
    host: HostContext,
    renderer: Renderer,
}

impl Orchestrator {
    pub fn new(
        collaborators: Collaborators,
        credentials: CredentialStore,
        settings: Settings,
        host: HostContext,
        renderer: Renderer,
    ) -> Self {
        let Collaborators {
            runtime,
            mux,
            agent,
            probe,
        } = collaborators;
        Self {
            runtime,
            mux,
            agent,
            probe,
            credentials,
            settings,
            host,
            renderer,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    fn runtime(&self) -> &dyn ContainerRuntime {
        self.runtime.as_ref()
    }

    fn mux(&self) -> Option<&dyn Multiplexer> {
        self.mux.as_deref()
    }

    /// Multiplexer to use for a workspace, honoring settings and `--no-tmux`.
    fn workspace_mux(&self, no_tmux: bool) -> Option<&dyn Multiplexer> {
        if no_tmux || !self.settings.workspace.enabled {
            return None;
        }
        self.mux()
    }

    fn readiness_policy(&self) -> ReadinessPolicy {
        ReadinessPolicy::from(&self.settings.readiness)
    }

    fn resolve(&self, workdir: &Path, opts: &RunOptions) -> CaigedResult<SessionDescriptor> {
        let desc = resolve_descriptor(workdir, opts, &self.settings, &self.host)?;
        debug!(container = %desc.container_name, "session resolved");
        Ok(desc)
    }

    /// Wait for the agent server in `container`, starting it in the
    /// background first when no workspace window is serving it.
    ///
    /// Daemon containers restart the server from their entrypoint, so only
    /// workspace and unlabelled containers get a detached `serve`.
    async fn ensure_server_ready(&self, container: &str, url: &str) -> CaigedResult<ReadyReport> {
        let mode = self
            .runtime()
            .inspect_label(container, MODE_LABEL)
            .await
            .ok()
            .and_then(|value| ServerMode::from_label(&value));
        if mode != Some(ServerMode::Daemon) && self.probe.probe(url).await.is_err() {
            info!(container, ?mode, "agent server not answering; starting it in the background");
            let spec = serve_exec_spec(container, &self.settings.container_shell);
            self.runtime().exec_detached(&spec).await?;
        }
        let report = wait_ready(self.probe.as_ref(), url, &self.readiness_policy()).await?;
        debug!(container, attempts = report.attempts, status = report.status, "server answered");
        Ok(report)
    }

    /// Kill the descriptor's workspace session if one exists.
    async fn kill_workspace(&self, session: &str) -> CaigedResult<bool> {
        let Some(mux) = self.mux() else {
            return Ok(false);
        };
        if !mux.has_session(session).await {
            return Ok(false);
        }
        mux.kill_session(session).await?;
        Ok(true)
    }
}

/// Name accepted by `connect`/`port` for a container: its name without the
/// prefix and spin segments.
pub fn connect_name(desc: &SessionDescriptor) -> String {
    let spin_prefix = format!("{}-", crate::session::slugify(&desc.spin));
    desc.slug
        .strip_prefix(&spin_prefix)
        .filter(|rest| !rest.is_empty())
        .unwrap_or(&desc.slug)
        .to_string()
}
