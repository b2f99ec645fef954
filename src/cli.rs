//! CLI argument parsing via clap.

use std::path::PathBuf;

use caiged::app::RunMode;
use caiged::session::RunOptions;
use clap::{Args as ClapArgs, Parser, Subcommand};

/// Per-project dev containers running an OpenCode agent server.
#[derive(Debug, Parser)]
#[command(name = "caiged", version, disable_version_flag = true)]
pub struct Args {
    /// Path to a settings file (default: ~/.config/caiged/caiged.toml).
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<PathBuf>,

    /// Disable color output.
    #[arg(long = "no-color", global = true)]
    pub no_color: bool,

    /// Print version, commit and build metadata.
    #[arg(short = 'V', long = "version")]
    pub version: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start or resume the session for a working directory.
    Run {
        workdir: PathBuf,
        #[command(flatten)]
        session: SessionFlags,
        #[command(flatten)]
        attach: AttachFlags,
        /// Run this command in a throwaway container instead.
        #[arg(last = true)]
        command: Vec<String>,
    },
    /// Attach to a session by workdir, workspace session or container name.
    Attach {
        target: String,
        #[command(flatten)]
        session: SessionFlags,
    },
    /// Attach the OpenCode client to a running project container.
    Connect { project: String },
    /// Show connection details for a running project container.
    Port { project: String },
    /// Rebuild the base and spin images.
    Build {
        workdir: PathBuf,
        #[command(flatten)]
        session: SessionFlags,
    },
    /// Kill the workspace, remove the container and run again.
    Restart {
        workdir: PathBuf,
        #[command(flatten)]
        session: SessionFlags,
        #[command(flatten)]
        attach: AttachFlags,
    },
    /// Kill the terminal workspace for a working directory.
    ResetSession {
        workdir: PathBuf,
        #[command(flatten)]
        session: SessionFlags,
    },
    /// Manage caiged containers.
    #[command(subcommand)]
    Containers(ContainersCommand),
}

#[derive(Debug, Subcommand)]
pub enum ContainersCommand {
    /// List containers with status and reconnect hints.
    List,
    /// Stop a container.
    Stop {
        name: String,
        /// Remove the container instead of only stopping it.
        #[arg(long)]
        remove: bool,
    },
    /// Remove every caiged container and workspace session.
    StopAll,
    /// Open an interactive shell in a running container.
    Shell { name: String },
}

/// Flags shaping the session identity and container.
#[derive(Debug, Clone, Default, ClapArgs)]
pub struct SessionFlags {
    /// Spin (profile) to run.
    #[arg(long)]
    pub spin: Option<String>,
    /// Project name (default: last two workdir segments).
    #[arg(long)]
    pub project: Option<String>,
    /// Path to the caiged repository.
    #[arg(long)]
    pub repo: Option<PathBuf>,
    /// Do not mount the host docker socket.
    #[arg(long = "disable-docker-sock")]
    pub disable_docker_sock: bool,
    /// Run the container without network access.
    #[arg(long = "no-network")]
    pub no_network: bool,
    /// Host environment variable to pass into the container (repeatable).
    #[arg(long = "secret-env", value_name = "NAME")]
    pub secret_env: Vec<String>,
    /// Env file passed to the container runtime.
    #[arg(long = "secret-env-file", value_name = "PATH")]
    pub secret_env_file: Option<PathBuf>,
    /// Do not mount the host OpenCode auth file.
    #[arg(long = "no-mount-opencode-auth")]
    pub no_mount_opencode_auth: bool,
    /// Mount the host gh config read-write.
    #[arg(long = "mount-gh-rw")]
    pub mount_gh_rw: bool,
    /// Do not mount the host gh config.
    #[arg(long = "no-mount-gh")]
    pub no_mount_gh: bool,
    /// Rebuild images even when they exist.
    #[arg(long = "rebuild-images")]
    pub rebuild_images: bool,
}

impl SessionFlags {
    pub fn to_options(&self) -> RunOptions {
        RunOptions {
            spin: self.spin.clone(),
            project: self.project.clone(),
            repo: self.repo.clone(),
            disable_docker_sock: self.disable_docker_sock,
            disable_network: self.no_network,
            secret_env: self.secret_env.clone(),
            secret_env_file: self.secret_env_file.clone(),
            mount_gh: !self.no_mount_gh,
            mount_gh_rw: self.mount_gh_rw,
            mount_opencode_auth: !self.no_mount_opencode_auth,
            force_build: self.rebuild_images,
        }
    }
}

/// Flags controlling how a run attaches.
#[derive(Debug, Clone, Copy, Default, ClapArgs)]
pub struct AttachFlags {
    /// Start or resume without attaching.
    #[arg(long = "no-attach")]
    pub no_attach: bool,
    /// Attach directly instead of through a tmux workspace.
    #[arg(long = "no-tmux")]
    pub no_tmux: bool,
}

impl AttachFlags {
    pub fn to_mode(self, command: Vec<String>) -> RunMode {
        RunMode {
            command,
            no_attach: self.no_attach,
            no_tmux: self.no_tmux,
        }
    }
}
