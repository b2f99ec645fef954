//! `connect` and `port`: reach a running container by project name.

use tracing::debug;

use super::Orchestrator;
use crate::error::{CaigedError, CaigedResult};
use crate::opencode::{server_url, AttachTarget};
use crate::ports::existing_port;
use crate::render::{Banner, ConnectionSummary};
use crate::resume::find_resumable_session;
use crate::session::slugify;

const NAMES_FORMAT: &str = "{{.Names}}";

/// Connection details for a running project container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectConnection {
    pub container: String,
    pub port: u16,
    pub target: AttachTarget,
}

impl Orchestrator {
    /// Running container whose name ends in the project's slug.
    ///
    /// Several spins may serve the same project; the default spin wins ties.
    pub async fn find_project_container(&self, project: &str) -> CaigedResult<String> {
        let slug = slugify(project);
        let prefix = format!("{}-", self.settings.image_prefix);
        let filter = format!("name=-{slug}$");
        let mut candidates: Vec<String> = self
            .runtime()
            .list_containers(&filter, NAMES_FORMAT, false)
            .await?
            .into_iter()
            .map(|name| name.trim_start_matches('/').to_string())
            .filter(|name| name.starts_with(&prefix) && name.ends_with(&format!("-{slug}")))
            .collect();
        candidates.sort();
        debug!(project, ?candidates, "project container candidates");

        let preferred = format!("{prefix}{}-{slug}", self.settings.default_spin);
        if candidates.contains(&preferred) {
            return Ok(preferred);
        }
        candidates
            .into_iter()
            .next()
            .ok_or_else(|| CaigedError::NotFound(format!("no running container found for project: {project}")))
    }

    /// Resolve container, port and credential for a project.
    pub async fn project_connection(&self, project: &str) -> CaigedResult<ProjectConnection> {
        let container = self.find_project_container(project).await?;
        let port = existing_port(self.runtime(), &container)
            .await
            .ok_or_else(|| {
                CaigedError::NotFound(format!(
                    "no port found for container: {container} (container may be using legacy configuration)"
                ))
            })?;
        let password = self.credentials.derive(&container)?;
        Ok(ProjectConnection {
            target: AttachTarget {
                url: server_url(port),
                password,
                session: None,
            },
            container,
            port,
        })
    }

    /// Attach the agent client to a project's running server, resuming the
    /// newest conversation.
    pub async fn connect(&self, project: &str) -> CaigedResult<ProjectConnection> {
        let mut conn = self.project_connection(project).await?;
        self.renderer.connection_summary(&ConnectionSummary {
            banner: Banner::Existing,
            project: slugify(project),
            container: conn.container.clone(),
            url: conn.target.url.clone(),
            password: conn.target.password.clone(),
            manual_command: conn.target.manual_command(),
        });

        self.ensure_server_ready(&conn.container, &conn.target.url)
            .await?;
        conn.target.session = find_resumable_session(self.runtime(), &conn.container).await;
        self.agent.attach(&conn.target).await?;
        Ok(conn)
    }

    /// Print container, server URL and manual attach command.
    pub async fn port(&self, project: &str) -> CaigedResult<ProjectConnection> {
        let conn = self.project_connection(project).await?;
        self.renderer.line(&format!("Container: {}", conn.container));
        self.renderer.line(&format!("OpenCode server: {}", conn.target.url));
        self.renderer
            .line(&format!("Attach command: {}", conn.target.manual_command()));
        Ok(conn)
    }
}
