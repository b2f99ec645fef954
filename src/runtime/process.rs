//! Process execution helpers shared by the runtime, multiplexer and agent clients.

use std::process::Stdio;

use tokio::process::Command;

use crate::error::RuntimeError;

/// Captured result of one finished child process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

/// Which CLI frontend answers to the container engine commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerEngineKind {
    Docker,
    Podman,
}

/// Detected container engine binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContainerEngine {
    pub command: &'static str,
    pub kind: ContainerEngineKind,
}

impl ContainerEngine {
    /// Name filter matching every container under `prefix`.
    ///
    /// Docker reports names with a leading slash; podman does not.
    pub fn prefix_filter(&self, prefix: &str) -> String {
        match self.kind {
            ContainerEngineKind::Docker => format!("name=^/{prefix}-"),
            ContainerEngineKind::Podman => format!("name=^{prefix}-"),
        }
    }
}

/// Spawn and wait for a process with captured output.
pub(crate) async fn run_process(program: &str, args: &[String]) -> Result<ExecOutput, RuntimeError> {
    let mut cmd = Command::new(program);
    cmd.kill_on_drop(true);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let output = cmd.output().await.map_err(|e| spawn_error(program, args, e))?;

    Ok(ExecOutput {
        exit_code: output.status.code().unwrap_or(-1),
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
    })
}

/// Run a process attached to the invoking terminal and wait for it.
pub(crate) async fn run_inherited(program: &str, args: &[String]) -> Result<(), RuntimeError> {
    let status = Command::new(program)
        .args(args)
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()
        .await
        .map_err(|e| spawn_error(program, args, e))?;
    if status.success() {
        return Ok(());
    }
    let detail = match status.code() {
        Some(code) => format!("exit status {code}"),
        None => "terminated by signal".to_string(),
    };
    Err(RuntimeError::invocation(program, action_of(args), detail))
}

/// Convert non-zero command status into a runtime invocation error.
pub(crate) fn ensure_success(
    output: ExecOutput,
    program: &str,
    args: &[String],
) -> Result<ExecOutput, RuntimeError> {
    if output.exit_code == 0 {
        return Ok(output);
    }

    let mut details = if output.stderr.trim().is_empty() {
        output.stdout.trim().to_string()
    } else {
        output.stderr.trim().to_string()
    };
    if details.is_empty() {
        details = format!("command exited with {}", output.exit_code);
    }

    Err(RuntimeError::invocation(program, action_of(args), details))
}

/// Run and require success in one step.
pub(crate) async fn run_checked(program: &str, args: &[String]) -> Result<ExecOutput, RuntimeError> {
    let output = run_process(program, args).await?;
    ensure_success(output, program, args)
}

fn spawn_error(program: &str, args: &[String], err: std::io::Error) -> RuntimeError {
    if err.kind() == std::io::ErrorKind::NotFound {
        RuntimeError::Unavailable(format!("`{program}` was not found in PATH"))
    } else {
        RuntimeError::invocation(program, action_of(args), err.to_string())
    }
}

/// Subcommand name used in error messages (`docker run ...` ⇒ `run`).
fn action_of(args: &[String]) -> &str {
    args.first().map(String::as_str).unwrap_or_default()
}

/// Detect docker/podman frontend availability and compatibility mode.
pub async fn detect_container_engine() -> Result<ContainerEngine, RuntimeError> {
    if let Some(version) = probe_version("docker", "--version").await? {
        let kind = docker_frontend_kind(&version);
        return Ok(ContainerEngine {
            command: "docker",
            kind,
        });
    }

    if probe_version("podman", "--version").await?.is_some() {
        return Ok(ContainerEngine {
            command: "podman",
            kind: ContainerEngineKind::Podman,
        });
    }

    Err(RuntimeError::Unavailable(
        "neither `docker` nor `podman` was found in PATH".into(),
    ))
}

/// True when `program` can be spawned on this host.
pub async fn binary_available(program: &str, version_flag: &str) -> bool {
    matches!(probe_version(program, version_flag).await, Ok(Some(_)))
}

async fn probe_version(command: &str, flag: &str) -> Result<Option<String>, RuntimeError> {
    let output = match Command::new(command).arg(flag).output().await {
        Ok(out) => out,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(RuntimeError::invocation(
                command,
                flag,
                format!("failed to probe: {e}"),
            ))
        }
    };

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    Ok(Some(format!("{stdout}\n{stderr}")))
}

/// Infer container frontend compatibility when docker binary is present.
pub(crate) fn docker_frontend_kind(version_output: &str) -> ContainerEngineKind {
    let text = version_output.to_ascii_lowercase();
    if text.contains("podman") {
        ContainerEngineKind::Podman
    } else {
        ContainerEngineKind::Docker
    }
}

/// Shell-safe single-quote escaping.
pub fn shell_quote(s: &str) -> String {
    let plain = !s.is_empty()
        && s
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.' | '/' | ':' | '=' | '@' | ','));
    if plain {
        s.to_string()
    } else {
        format!("'{}'", s.replace('\'', "'\\''"))
    }
}

/// Join argv into one shell command line.
pub fn shell_join(program: &str, args: &[String]) -> String {
    std::iter::once(shell_quote(program))
        .chain(args.iter().map(|arg| shell_quote(arg)))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Non-empty trimmed lines of command output.
pub(crate) fn non_empty_lines(output: &str) -> Vec<String> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}
