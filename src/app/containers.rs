//! `containers list|stop|stop-all|shell`.

use tracing::warn;

use super::Orchestrator;
use crate::error::{CaigedError, CaigedResult};
use crate::ports::existing_port;
use crate::reconcile::SPIN_LABEL;
use crate::render::ContainerRow;
use crate::session::slugify;
use crate::tmux::{is_no_server_error, WorkspaceWindow};

const NAMES_FORMAT: &str = "{{.Names}}";

/// Result of `containers stop`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    Stopped,
    AlreadyStopped,
    Removed,
}

/// Strip `prefix` and the spin segment from a container name. The spin label
/// disambiguates hyphenated spins; unlabelled containers drop one segment.
fn reconnect_name<'a>(name: &'a str, prefix: &str, spin: Option<&str>) -> &'a str {
    let Some(rest) = name.strip_prefix(prefix) else {
        return name;
    };
    if let Some(spin) = spin.map(str::trim).filter(|spin| !spin.is_empty()) {
        if let Some(project) = rest
            .strip_prefix(slugify(spin).as_str())
            .and_then(|tail| tail.strip_prefix('-'))
            .filter(|project| !project.is_empty())
        {
            return project;
        }
    }
    rest.split_once('-').map(|(_, project)| project).unwrap_or(name)
}

impl Orchestrator {
    async fn prefixed_containers(&self, include_stopped: bool) -> CaigedResult<Vec<String>> {
        let filter = self.runtime().prefix_filter(&self.settings.image_prefix);
        let mut names: Vec<String> = self
            .runtime()
            .list_containers(&filter, NAMES_FORMAT, include_stopped)
            .await?
            .into_iter()
            .map(|name| name.trim_start_matches('/').to_string())
            .collect();
        names.sort();
        Ok(names)
    }

    /// Every container under the prefix with status and a reconnect hint.
    pub async fn list(&self) -> CaigedResult<Vec<ContainerRow>> {
        let prefix = format!("{}-", self.settings.image_prefix);
        let mut rows = Vec::new();
        for name in self.prefixed_containers(true).await? {
            let running = self.runtime().is_running(&name).await;
            let port = existing_port(self.runtime(), &name).await;
            let hint = if running {
                let spin = self.runtime().inspect_label(&name, SPIN_LABEL).await.ok();
                format!("caiged connect {}", reconnect_name(&name, &prefix, spin.as_deref()))
            } else {
                format!("caiged run <workdir>  (or: caiged containers stop {name} --remove)")
            };
            rows.push(ContainerRow {
                name,
                running,
                port,
                hint,
            });
        }

        if rows.is_empty() {
            self.renderer.detail("No caiged containers");
        }
        for row in &rows {
            self.renderer.container_row(row);
        }
        if let Some(mux) = self.mux() {
            let sessions: Vec<String> = match mux.list_sessions().await {
                Ok(sessions) => sessions
                    .into_iter()
                    .filter(|session| session.starts_with(&prefix))
                    .collect(),
                Err(err) => {
                    warn!(error = %err, "unable to list workspace sessions");
                    Vec::new()
                }
            };
            if !sessions.is_empty() {
                self.renderer.section("Workspace sessions");
                for session in &sessions {
                    self.renderer.detail(session);
                }
            }
        }
        Ok(rows)
    }

    /// Stop one container, optionally removing it.
    pub async fn stop(&self, name: &str, remove: bool) -> CaigedResult<StopOutcome> {
        if !self.runtime().exists(name).await {
            return Err(CaigedError::NotFound(format!(
                "container '{name}' does not exist"
            )));
        }
        if remove {
            self.runtime().remove(name).await?;
            self.renderer.success(&format!("Container '{name}' removed"));
            return Ok(StopOutcome::Removed);
        }
        if !self.runtime().is_running(name).await {
            self.renderer
                .detail(&format!("Container '{name}' is already stopped"));
            return Ok(StopOutcome::AlreadyStopped);
        }
        self.renderer.activity(&format!("Stopping container '{name}'"));
        self.runtime().stop(name).await?;
        self.renderer
            .success(&format!("Container '{name}' stopped successfully"));
        Ok(StopOutcome::Stopped)
    }

    /// Remove every prefixed container and kill matching workspace sessions.
    ///
    /// Keeps going past individual failures and reports them together.
    pub async fn stop_all(&self) -> CaigedResult<usize> {
        let mut failures = Vec::new();
        let mut removed = 0;

        match self.prefixed_containers(true).await {
            Ok(names) => {
                for name in names {
                    match self.runtime().remove(&name).await {
                        Ok(()) => removed += 1,
                        Err(err) => failures.push(format!("remove container {name}: {err}")),
                    }
                }
            }
            Err(err) => failures.push(format!("list containers: {err}")),
        }

        if let Some(mux) = self.mux() {
            let prefix = format!("{}-", self.settings.image_prefix);
            let sessions = match mux.list_sessions().await {
                Ok(sessions) => sessions,
                Err(err) if is_no_server_error(&err) => Vec::new(),
                Err(err) => {
                    failures.push(format!("list sessions: {err}"));
                    Vec::new()
                }
            };
            for session in sessions.iter().filter(|s| s.starts_with(&prefix)) {
                match mux.kill_session(session).await {
                    Ok(()) => {}
                    Err(err) if is_no_server_error(&err) => {
                        warn!(session = %session, "multiplexer server already gone");
                    }
                    Err(err) => failures.push(format!("kill session {session}: {err}")),
                }
            }
        }

        if !failures.is_empty() {
            return Err(CaigedError::Incomplete {
                operation: "stop-all",
                failures,
            });
        }
        self.renderer
            .success(&format!("Removed {removed} container(s)"));
        Ok(removed)
    }

    /// Interactive login shell in a running container.
    pub async fn shell(&self, name: &str) -> CaigedResult<()> {
        if !self.runtime().is_running(name).await {
            return Err(CaigedError::NotFound(format!(
                "container '{name}' is not running"
            )));
        }
        let spec = WorkspaceWindow::Shell.exec_spec(name, &self.settings.container_shell);
        self.runtime().exec_interactive(&spec).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::test_harness::Harness;
    use crate::runtime::ContainerRuntime;
    use crate::testsupport::MockMultiplexer;

    #[tokio::test]
    async fn list_reports_status_ports_and_hints() {
        let h = Harness::new("list", Some(MockMultiplexer::new()));
        h.runtime.add_container("caiged-qa-my-app", true, Some(4300));
        h.runtime.add_container("caiged-dev-api", false, Some(4301));
        h.runtime.add_container("unrelated", true, None);

        let rows = h.orchestrator.list().await.expect("list");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].name, "caiged-dev-api");
        assert!(!rows[0].running);
        assert_eq!(rows[0].port, Some(4301));
        assert!(rows[0].hint.contains("caiged containers stop caiged-dev-api --remove"));
        assert_eq!(rows[1].name, "caiged-qa-my-app");
        assert!(rows[1].running);
        assert_eq!(rows[1].hint, "caiged connect my-app");
        assert_eq!(h.runtime.count_calls("ps -a --filter name=^/caiged-"), 1);
    }

    #[tokio::test]
    async fn hyphenated_spin_is_stripped_from_connect_hint() {
        let h = Harness::new("list-spin", None);
        h.runtime.add_container("caiged-dev-ops-my-app", true, Some(4302));
        h.runtime.set_label("caiged-dev-ops-my-app", SPIN_LABEL, "dev-ops");

        let rows = h.orchestrator.list().await.expect("list");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].hint, "caiged connect my-app");
    }

    #[test]
    fn reconnect_name_falls_back_without_a_usable_spin() {
        assert_eq!(reconnect_name("caiged-qa-app", "caiged-", None), "app");
        assert_eq!(reconnect_name("caiged-qa-app", "caiged-", Some("")), "app");
        assert_eq!(reconnect_name("caiged-qa-app", "caiged-", Some("other")), "app");
        assert_eq!(reconnect_name("caiged-dev-ops-x", "caiged-", Some("Dev Ops")), "x");
        assert_eq!(reconnect_name("elsewhere", "caiged-", Some("qa")), "elsewhere");
    }

    #[tokio::test]
    async fn stop_handles_running_stopped_missing_and_remove() {
        let h = Harness::new("stop", None);
        h.runtime.add_container("caiged-qa-app", true, Some(4300));

        assert_eq!(
            h.orchestrator.stop("caiged-qa-app", false).await.expect("stop"),
            StopOutcome::Stopped
        );
        assert!(!h.runtime.running_now("caiged-qa-app"));
        assert_eq!(
            h.orchestrator.stop("caiged-qa-app", false).await.expect("again"),
            StopOutcome::AlreadyStopped
        );
        assert_eq!(
            h.orchestrator.stop("caiged-qa-app", true).await.expect("remove"),
            StopOutcome::Removed
        );
        assert!(!h.runtime.exists_now("caiged-qa-app"));

        let err = h
            .orchestrator
            .stop("caiged-qa-app", false)
            .await
            .expect_err("missing");
        assert_eq!(err.to_string(), "container 'caiged-qa-app' does not exist");
    }

    #[tokio::test]
    async fn stop_all_removes_prefixed_containers_and_sessions() {
        let h = Harness::new("stop-all", Some(MockMultiplexer::new()));
        h.runtime.add_container("caiged-qa-a", true, Some(4300));
        h.runtime.add_container("caiged-dev-b", false, None);
        h.runtime.add_container("keep-me", true, None);
        h.mux().seed_session("caiged-qa-a", &[(0, "help")]);
        h.mux().seed_session("personal", &[(0, "zsh")]);

        let removed = h.orchestrator.stop_all().await.expect("stop-all");
        assert_eq!(removed, 2);
        assert!(h.runtime.exists_now("keep-me"));
        assert!(!h.mux().has("caiged-qa-a"));
        assert!(h.mux().has("personal"));
    }

    #[tokio::test]
    async fn stop_all_tolerates_missing_multiplexer_server() {
        let h = Harness::new("stop-all-noserver", Some(MockMultiplexer::new().without_server()));
        h.runtime.add_container("caiged-qa-a", true, Some(4300));
        assert_eq!(h.orchestrator.stop_all().await.expect("stop-all"), 1);
    }

    #[tokio::test]
    async fn shell_requires_a_running_container() {
        let h = Harness::new("shell", None);
        h.runtime.add_container("caiged-qa-app", false, None);
        assert!(h.orchestrator.shell("caiged-qa-app").await.is_err());

        h.runtime.start("caiged-qa-app").await.expect("start");
        h.orchestrator.shell("caiged-qa-app").await.expect("shell");
        assert_eq!(
            h.runtime.calls_matching("exec -it"),
            vec!["exec -it -e CAIGED_WINDOW=shell caiged-qa-app /bin/zsh -l".to_string()]
        );
    }
}
