//! Container runtime client.
//!
//! The orchestrator only talks to the container engine through
//! [`ContainerRuntime`]. State queries (`exists`, `is_running`, `image_exists`)
//! fold every failure into `false`: an uninspectable container is treated the
//! same as a missing one.

use async_trait::async_trait;
use tracing::debug;

use crate::error::RuntimeError;

pub mod process;
pub mod spec;

pub use process::{
    binary_available, detect_container_engine, shell_join, shell_quote, ContainerEngine,
    ContainerEngineKind, ExecOutput,
};
pub use spec::{BuildSpec, ExecSpec, RunSpec};

use process::{non_empty_lines, run_checked, run_inherited, run_process};

/// Narrow command surface the orchestrator needs from a container engine.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Binary name used for invocations (`docker`, `podman`).
    fn program(&self) -> &str;
    /// `ps --filter` expression matching every container under `prefix`.
    fn prefix_filter(&self, prefix: &str) -> String;
    /// Whether a container with this name exists, running or not.
    async fn exists(&self, name: &str) -> bool;
    async fn is_running(&self, name: &str) -> bool;
    async fn start(&self, name: &str) -> Result<(), RuntimeError>;
    async fn stop(&self, name: &str) -> Result<(), RuntimeError>;
    /// Force-remove a container.
    async fn remove(&self, name: &str) -> Result<(), RuntimeError>;
    /// Detached runs capture output; interactive runs inherit the terminal.
    async fn run(&self, spec: &RunSpec) -> Result<(), RuntimeError>;
    /// Run a command in a container and return its stdout.
    async fn exec_capture(&self, name: &str, command: &[String]) -> Result<String, RuntimeError>;
    /// Run a command in a container attached to the invoking terminal.
    async fn exec_interactive(&self, spec: &ExecSpec) -> Result<(), RuntimeError>;
    /// Start a background command in a container and return once it is launched.
    async fn exec_detached(&self, spec: &ExecSpec) -> Result<(), RuntimeError>;
    /// Value of a container label; empty when unset.
    async fn inspect_label(&self, name: &str, key: &str) -> Result<String, RuntimeError>;
    /// Host port bound to `container_port/tcp`, if published.
    async fn published_port(
        &self,
        name: &str,
        container_port: u16,
    ) -> Result<Option<u16>, RuntimeError>;
    /// `ps` lines for the filter and Go-template format.
    async fn list_containers(
        &self,
        filter: &str,
        format: &str,
        include_stopped: bool,
    ) -> Result<Vec<String>, RuntimeError>;
    async fn image_exists(&self, tag: &str) -> bool;
    /// Build one image, streaming build output to the terminal.
    async fn build_image(&self, spec: &BuildSpec) -> Result<(), RuntimeError>;
}

/// [`ContainerRuntime`] backed by the docker/podman CLI.
#[derive(Debug, Clone, Copy)]
pub struct CliRuntime {
    engine: ContainerEngine,
}

impl CliRuntime {
    pub fn new(engine: ContainerEngine) -> Self {
        Self { engine }
    }

    /// Probe the host for docker, then podman.
    pub async fn detect() -> Result<Self, RuntimeError> {
        let engine = detect_container_engine().await?;
        debug!(engine = engine.command, kind = ?engine.kind, "detected container engine");
        Ok(Self::new(engine))
    }

    pub fn engine(&self) -> ContainerEngine {
        self.engine
    }

    async fn succeeds(&self, args: &[String]) -> bool {
        matches!(run_process(self.engine.command, args).await, Ok(out) if out.exit_code == 0)
    }

    async fn capture(&self, args: Vec<String>) -> Result<String, RuntimeError> {
        Ok(run_checked(self.engine.command, &args).await?.stdout)
    }
}

fn strings<const N: usize>(parts: [&str; N]) -> Vec<String> {
    parts.iter().map(|part| part.to_string()).collect()
}

/// Parse `docker port` output such as `0.0.0.0:4100\n[::]:4100`.
pub(crate) fn parse_port_binding(output: &str) -> Option<u16> {
    output
        .lines()
        .filter_map(|line| line.trim().rsplit(':').next())
        .find_map(|port| port.trim().parse::<u16>().ok())
        .filter(|port| *port > 0)
}

/// Normalize template output for a label that may be unset.
pub(crate) fn normalize_label_value(raw: &str) -> String {
    let value = raw.trim();
    if value == "<no value>" {
        String::new()
    } else {
        value.to_string()
    }
}

#[async_trait]
impl ContainerRuntime for CliRuntime {
    fn program(&self) -> &str {
        self.engine.command
    }

    fn prefix_filter(&self, prefix: &str) -> String {
        self.engine.prefix_filter(prefix)
    }

    async fn exists(&self, name: &str) -> bool {
        self.succeeds(&strings(["inspect", "--type", "container", name]))
            .await
    }

    async fn is_running(&self, name: &str) -> bool {
        match self
            .capture(strings(["inspect", "-f", "{{.State.Running}}", name]))
            .await
        {
            Ok(out) => out.trim() == "true",
            Err(_) => false,
        }
    }

    async fn start(&self, name: &str) -> Result<(), RuntimeError> {
        self.capture(strings(["start", name])).await.map(drop)
    }

    async fn stop(&self, name: &str) -> Result<(), RuntimeError> {
        self.capture(strings(["stop", name])).await.map(drop)
    }

    async fn remove(&self, name: &str) -> Result<(), RuntimeError> {
        self.capture(strings(["rm", "-f", name])).await.map(drop)
    }

    async fn run(&self, spec: &RunSpec) -> Result<(), RuntimeError> {
        let args = spec.to_args();
        if spec.interactive {
            run_inherited(self.engine.command, &args).await
        } else {
            self.capture(args).await.map(drop)
        }
    }

    async fn exec_capture(&self, name: &str, command: &[String]) -> Result<String, RuntimeError> {
        self.capture(ExecSpec::new(name, command.to_vec()).to_args())
            .await
    }

    async fn exec_interactive(&self, spec: &ExecSpec) -> Result<(), RuntimeError> {
        run_inherited(self.engine.command, &spec.to_args()).await
    }

    async fn exec_detached(&self, spec: &ExecSpec) -> Result<(), RuntimeError> {
        let spec = spec.clone().detached();
        self.capture(spec.to_args()).await.map(drop)
    }

    async fn inspect_label(&self, name: &str, key: &str) -> Result<String, RuntimeError> {
        let template = format!("{{{{index .Config.Labels \"{key}\"}}}}");
        let out = self
            .capture(strings(["inspect", "--format", template.as_str(), name]))
            .await?;
        Ok(normalize_label_value(&out))
    }

    async fn published_port(
        &self,
        name: &str,
        container_port: u16,
    ) -> Result<Option<u16>, RuntimeError> {
        let binding = format!("{container_port}/tcp");
        let out = self.capture(strings(["port", name, binding.as_str()])).await?;
        Ok(parse_port_binding(&out))
    }

    async fn list_containers(
        &self,
        filter: &str,
        format: &str,
        include_stopped: bool,
    ) -> Result<Vec<String>, RuntimeError> {
        let mut args = vec!["ps".to_string()];
        if include_stopped {
            args.push("-a".into());
        }
        args.extend(strings(["--filter", filter, "--format", format]));
        Ok(non_empty_lines(&self.capture(args).await?))
    }

    async fn image_exists(&self, tag: &str) -> bool {
        self.succeeds(&strings(["image", "inspect", tag])).await
    }

    async fn build_image(&self, spec: &BuildSpec) -> Result<(), RuntimeError> {
        run_inherited(self.engine.command, &spec.to_args()).await
    }
}
