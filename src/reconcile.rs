//! Container reconciliation.
//!
//! Observed state is re-read from the engine on every call; nothing cached
//! crosses invocations. A human removing the container between `observe` and
//! the chosen action is an accepted race: the action fails loudly and the
//! next invocation re-classifies.

use tracing::{debug, info};

use crate::config::BuildSettings;
use crate::error::RuntimeError;
use crate::ports::{PORT_LABEL, SERVER_PORT};
use crate::runtime::{BuildSpec, ContainerRuntime, RunSpec};
use crate::session::SessionDescriptor;

/// In-container workspace mount point.
pub const WORKSPACE_DIR: &str = "/workspace";
/// Container label recording how the agent server is started.
pub const MODE_LABEL: &str = "caiged.mode";
/// Container label recording the spin the container was created for.
pub const SPIN_LABEL: &str = "caiged.spin";
const DOCKER_SOCK: &str = "/var/run/docker.sock";
const CONTAINER_GH_CONFIG: &str = "/root/.config/gh";
const CONTAINER_OPENCODE_AUTH: &str = "/root/.local/share/opencode/auth.json";

/// Observed container state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerState {
    Absent,
    Stopped,
    Running,
}

/// Action taken to reach the running state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileAction {
    Created,
    Started,
    AlreadyRunning,
}

/// Dockerfile stage selected for a build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageTarget {
    Base,
    Spin,
}

impl ImageTarget {
    fn stage(self) -> &'static str {
        match self {
            Self::Base => "base",
            Self::Spin => "spin",
        }
    }
}

/// Who runs the agent server inside a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerMode {
    /// The entrypoint starts it (`AGENT_DAEMON=1`).
    Daemon,
    /// The workspace's `opencode` window starts it (`AGENT_DAEMON=0`).
    Workspace,
}

impl ServerMode {
    pub fn label(self) -> &'static str {
        match self {
            Self::Daemon => "daemon",
            Self::Workspace => "workspace",
        }
    }

    /// Mode recorded on a container; `None` for unlabelled containers.
    pub fn from_label(value: &str) -> Option<Self> {
        match value.trim() {
            "daemon" => Some(Self::Daemon),
            "workspace" => Some(Self::Workspace),
            _ => None,
        }
    }
}

/// Per-launch values not part of the session identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchPlan {
    pub port: u16,
    pub password: String,
    /// Start the agent server from the entrypoint instead of a workspace window.
    pub daemon: bool,
}

/// Query the engine for the container's current state.
pub async fn observe(runtime: &dyn ContainerRuntime, name: &str) -> ContainerState {
    if runtime.is_running(name).await {
        ContainerState::Running
    } else if runtime.exists(name).await {
        ContainerState::Stopped
    } else {
        ContainerState::Absent
    }
}

/// Build spec for one image stage.
pub fn build_spec(
    desc: &SessionDescriptor,
    build: &BuildSettings,
    target: ImageTarget,
) -> BuildSpec {
    let mut build_args = vec![
        ("ARCH".to_string(), build.arch.clone()),
        ("MISE_VERSION".to_string(), build.mise_version.clone()),
        ("GH_VERSION".to_string(), build.gh_version.clone()),
        ("OPENCODE_VERSION".to_string(), build.opencode_version.clone()),
    ];
    let tag = match target {
        ImageTarget::Base => desc.base_image.clone(),
        ImageTarget::Spin => {
            build_args.push(("SPIN".to_string(), desc.spin.clone()));
            desc.spin_image.clone()
        }
    };
    BuildSpec {
        context: desc.repo_root.clone(),
        dockerfile: desc.repo_root.join("Dockerfile"),
        tag,
        target: target.stage().to_string(),
        build_args,
    }
}

/// Build both images unconditionally, base first.
pub async fn build_images(
    runtime: &dyn ContainerRuntime,
    desc: &SessionDescriptor,
    build: &BuildSettings,
) -> Result<(), RuntimeError> {
    for target in [ImageTarget::Base, ImageTarget::Spin] {
        let spec = build_spec(desc, build, target);
        info!(tag = %spec.tag, "building image");
        runtime.build_image(&spec).await?;
    }
    Ok(())
}

/// Ensure base and spin images exist, building missing ones.
///
/// Any build failure aborts; there is no degraded path.
pub async fn ensure_images(
    runtime: &dyn ContainerRuntime,
    desc: &SessionDescriptor,
    build: &BuildSettings,
) -> Result<(), RuntimeError> {
    if desc.features.force_build {
        return build_images(runtime, desc, build).await;
    }
    for (target, tag) in [
        (ImageTarget::Base, &desc.base_image),
        (ImageTarget::Spin, &desc.spin_image),
    ] {
        if runtime.image_exists(tag).await {
            debug!(tag = %tag, "image present");
            continue;
        }
        let spec = build_spec(desc, build, target);
        info!(tag = %spec.tag, "building missing image");
        runtime.build_image(&spec).await?;
    }
    Ok(())
}

/// Mounts, network and secrets shared by persistent and one-shot runs.
fn base_run_spec(desc: &SessionDescriptor) -> RunSpec {
    let mut volumes = vec![format!("{}:{WORKSPACE_DIR}", desc.workdir.display())];
    if desc.features.docker_sock {
        volumes.push(format!("{DOCKER_SOCK}:{DOCKER_SOCK}"));
    }
    if let Some(gh) = &desc.mounts.gh_config {
        let mode = if desc.features.gh_read_write { "" } else { ":ro" };
        volumes.push(format!("{}:{CONTAINER_GH_CONFIG}{mode}", gh.display()));
    }
    if let Some(auth) = &desc.mounts.opencode_auth {
        volumes.push(format!("{}:{CONTAINER_OPENCODE_AUTH}:ro", auth.display()));
    }

    RunSpec {
        image: desc.spin_image.clone(),
        volumes,
        network: Some(if desc.features.network { "bridge" } else { "none" }.to_string()),
        env: desc.secret_envs.clone(),
        env_file: desc.secret_env_file.clone(),
        ..RunSpec::default()
    }
}

/// Spec for the persistent, detached session container.
pub fn container_run_spec(desc: &SessionDescriptor, plan: &LaunchPlan) -> RunSpec {
    let mut spec = base_run_spec(desc);
    spec.name = Some(desc.container_name.clone());
    spec.hostname = Some(desc.container_name.clone());
    spec.detach = true;
    spec.ports = vec![format!("{}:{SERVER_PORT}", plan.port)];
    let mode = if plan.daemon {
        ServerMode::Daemon
    } else {
        ServerMode::Workspace
    };
    spec.labels = vec![
        (PORT_LABEL.to_string(), plan.port.to_string()),
        (MODE_LABEL.to_string(), mode.label().to_string()),
        (SPIN_LABEL.to_string(), desc.spin.clone()),
    ];
    spec.env.extend([
        format!("AGENT_SPIN={}", desc.spin),
        format!("AGENT_DAEMON={}", if plan.daemon { "1" } else { "0" }),
        format!("OPENCODE_SERVER_PASSWORD={}", plan.password),
    ]);
    spec
}

/// Spec for a throwaway container running `command` and exiting.
pub fn one_shot_run_spec(desc: &SessionDescriptor, command: &[String]) -> RunSpec {
    let mut spec = base_run_spec(desc);
    spec.remove = true;
    spec.interactive = true;
    spec.env.push(format!("AGENT_SPIN={}", desc.spin));
    spec.command = command.to_vec();
    spec
}

/// Bring the session container to the running state with the minimal action.
pub async fn reconcile(
    runtime: &dyn ContainerRuntime,
    desc: &SessionDescriptor,
    plan: &LaunchPlan,
) -> Result<ReconcileAction, RuntimeError> {
    let name = &desc.container_name;
    let state = observe(runtime, name).await;
    debug!(container = %name, ?state, "observed container state");
    match state {
        ContainerState::Running => Ok(ReconcileAction::AlreadyRunning),
        ContainerState::Stopped => {
            info!(container = %name, "resuming stopped container");
            runtime.start(name).await?;
            Ok(ReconcileAction::Started)
        }
        ContainerState::Absent => {
            info!(container = %name, port = plan.port, "creating container");
            runtime.run(&container_run_spec(desc, plan)).await?;
            Ok(ReconcileAction::Created)
        }
    }
}

/// Run `command` in a throwaway container, bypassing reconciliation.
pub async fn run_one_shot(
    runtime: &dyn ContainerRuntime,
    desc: &SessionDescriptor,
    command: &[String],
) -> Result<(), RuntimeError> {
    runtime.run(&one_shot_run_spec(desc, command)).await
}
