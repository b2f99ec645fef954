//! `run`, `attach`, `build`, `restart` and `reset-session`.

use std::path::Path;

use tracing::info;

use super::{connect_name, Orchestrator};
use crate::error::{CaigedError, CaigedResult};
use crate::opencode::{server_url, AttachTarget};
use crate::ports::allocate_port;
use crate::reconcile::{build_images, ensure_images, reconcile, run_one_shot, LaunchPlan, ReconcileAction};
use crate::render::{Banner, ConnectionSummary};
use crate::resume::find_resumable_session;
use crate::session::{multiplexer_session_name, RunOptions, SessionDescriptor};
use crate::tmux::{attach_workspace, ensure_workspace, WorkspaceOutcome, WorkspaceWindow};

/// How a `run` invocation attaches.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunMode {
    /// Non-empty: run this command in a throwaway container instead.
    pub command: Vec<String>,
    /// Reconcile and print connection details without attaching.
    pub no_attach: bool,
    /// Skip the multiplexer workspace even when one is available.
    pub no_tmux: bool,
}

/// What a `run` invocation did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    OneShot,
    Session {
        action: ReconcileAction,
        summary: ConnectionSummary,
        /// Set when the multiplexer workspace was used.
        workspace: Option<WorkspaceOutcome>,
        /// Conversation handed to the agent client, when attaching directly.
        resumed: Option<String>,
        attached: bool,
    },
}

impl Orchestrator {
    /// Run-or-resume the session for `workdir`.
    pub async fn run(
        &self,
        workdir: &Path,
        opts: &RunOptions,
        mode: &RunMode,
    ) -> CaigedResult<RunOutcome> {
        let desc = self.resolve(workdir, opts)?;

        if !self.runtime().image_exists(&desc.base_image).await
            || !self.runtime().image_exists(&desc.spin_image).await
            || desc.features.force_build
        {
            self.renderer.activity(&format!("Building images for spin {}", desc.spin));
        }
        ensure_images(self.runtime(), &desc, &self.settings.build).await?;

        if !mode.command.is_empty() {
            info!(command = ?mode.command, "running one-shot command");
            run_one_shot(self.runtime(), &desc, &mode.command).await?;
            return Ok(RunOutcome::OneShot);
        }

        let workspace_mux = self.workspace_mux(mode.no_tmux);
        let port = allocate_port(self.runtime(), &desc.container_name, &self.settings.ports).await?;
        let password = self.credentials.derive(&desc.container_name)?;
        let plan = LaunchPlan {
            port,
            password: password.clone(),
            daemon: workspace_mux.is_none(),
        };
        let action = reconcile(self.runtime(), &desc, &plan).await?;

        let url = server_url(port);
        let mut target = AttachTarget {
            url: url.clone(),
            password,
            session: None,
        };
        let banner = match action {
            ReconcileAction::Created => Banner::Started,
            ReconcileAction::Started | ReconcileAction::AlreadyRunning => Banner::Existing,
        };
        let summary = self.summary(&desc, banner, &target);
        self.renderer.connection_summary(&summary);

        if let Some(mux) = workspace_mux {
            let outcome = ensure_workspace(mux, &desc, self.runtime().program()).await?;
            let attached = !mode.no_attach;
            if attached {
                attach_workspace(mux, &desc.session_name).await?;
            }
            return Ok(RunOutcome::Session {
                action,
                summary,
                workspace: Some(outcome),
                resumed: None,
                attached,
            });
        }

        if mode.no_attach {
            return Ok(RunOutcome::Session {
                action,
                summary,
                workspace: None,
                resumed: None,
                attached: false,
            });
        }

        self.renderer.activity("Waiting for OpenCode server");
        self.ensure_server_ready(&desc.container_name, &url).await?;
        target.session = find_resumable_session(self.runtime(), &desc.container_name).await;
        if let Some(session) = &target.session {
            self.renderer.activity(&format!("Resuming session {session}"));
        }
        self.agent.attach(&target).await?;

        Ok(RunOutcome::Session {
            action,
            summary,
            workspace: None,
            resumed: target.session,
            attached: true,
        })
    }

    /// Attach by workdir (full run workflow) or by session/container name.
    pub async fn attach(&self, target: &str, opts: &RunOptions) -> CaigedResult<()> {
        let path = self.host.absolutize(Path::new(target));
        if path.is_dir() {
            self.run(&path, opts, &RunMode::default()).await?;
            return Ok(());
        }

        if let Some(mux) = self.mux() {
            let session = multiplexer_session_name(target);
            if mux.has_session(&session).await {
                attach_workspace(mux, &session).await?;
                return Ok(());
            }
        }
        if self.runtime().is_running(target).await {
            let spec = WorkspaceWindow::Shell.exec_spec(target, &self.settings.container_shell);
            self.runtime().exec_interactive(&spec).await?;
            return Ok(());
        }
        Err(CaigedError::NotFound(format!(
            "no session, directory or running container named {target}"
        )))
    }

    /// Rebuild base and spin images unconditionally.
    pub async fn build(&self, workdir: &Path, opts: &RunOptions) -> CaigedResult<()> {
        let desc = self.resolve(workdir, opts)?;
        self.renderer
            .activity(&format!("Building {} and {}", desc.base_image, desc.spin_image));
        build_images(self.runtime(), &desc, &self.settings.build).await?;
        self.renderer.success("Images built");
        Ok(())
    }

    /// Kill the workspace, remove the container, then run again.
    pub async fn restart(
        &self,
        workdir: &Path,
        opts: &RunOptions,
        mode: &RunMode,
    ) -> CaigedResult<RunOutcome> {
        let desc = self.resolve(workdir, opts)?;
        self.reset_workspace(&desc).await?;
        if self.runtime().exists(&desc.container_name).await {
            self.renderer
                .activity(&format!("Removing container {}", desc.container_name));
            self.runtime().remove(&desc.container_name).await?;
        }
        self.run(workdir, opts, mode).await
    }

    /// Kill the terminal workspace only; the container keeps running.
    pub async fn reset_session(&self, workdir: &Path, opts: &RunOptions) -> CaigedResult<bool> {
        let desc = self.resolve(workdir, opts)?;
        let killed = self.reset_workspace(&desc).await?;
        if !killed {
            self.renderer
                .detail(&format!("No workspace session named {}", desc.session_name));
        }
        Ok(killed)
    }

    async fn reset_workspace(&self, desc: &SessionDescriptor) -> CaigedResult<bool> {
        let killed = self.kill_workspace(&desc.session_name).await?;
        if killed {
            self.renderer
                .activity(&format!("Reset workspace session {}", desc.session_name));
        }
        Ok(killed)
    }

    fn summary(
        &self,
        desc: &SessionDescriptor,
        banner: Banner,
        target: &AttachTarget,
    ) -> ConnectionSummary {
        ConnectionSummary {
            banner,
            project: connect_name(desc),
            container: desc.container_name.clone(),
            url: target.url.clone(),
            password: target.password.clone(),
            manual_command: target.manual_command(),
        }
    }
}
