//! Session identity resolution.
//!
//! Turns a working directory, a spin and operator overrides into an immutable
//! [`SessionDescriptor`]. Nothing here queries the container runtime or the
//! multiplexer; only the local filesystem and the captured host environment.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::{Settings, REPO_ENV};
use crate::error::ConfigError;

mod host;
pub mod naming;
pub mod repo;
pub mod secrets;

pub use host::HostContext;
pub use naming::{
    container_name, derive_project_name, multiplexer_session_name, slugify, FALLBACK_NAME,
};
pub use repo::{find_repo_root, is_repo_root, resolve_repo_root, validate_profile, RepoSearch};
pub use secrets::{is_valid_env_name, resolve_secret_env_file, resolve_secret_envs};

/// Operator-supplied overrides for one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    /// Profile; the configured default spin when unset.
    pub spin: Option<String>,
    pub project: Option<String>,
    pub repo: Option<PathBuf>,
    pub disable_docker_sock: bool,
    pub disable_network: bool,
    pub secret_env: Vec<String>,
    pub secret_env_file: Option<PathBuf>,
    pub mount_gh: bool,
    pub mount_gh_rw: bool,
    pub mount_opencode_auth: bool,
    pub force_build: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            spin: None,
            project: None,
            repo: None,
            disable_docker_sock: false,
            disable_network: false,
            secret_env: Vec::new(),
            secret_env_file: None,
            mount_gh: true,
            mount_gh_rw: false,
            mount_opencode_auth: true,
            force_build: false,
        }
    }
}

/// Feature toggles carried into container creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionFeatures {
    pub docker_sock: bool,
    pub network: bool,
    pub gh_read_write: bool,
    pub force_build: bool,
}

/// Host paths bind-mounted into the container when present.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostMounts {
    pub gh_config: Option<PathBuf>,
    pub opencode_auth: Option<PathBuf>,
}

/// Canonical identity of one session. Built once, never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionDescriptor {
    pub workdir: PathBuf,
    pub repo_root: PathBuf,
    pub spin: String,
    pub spin_dir: PathBuf,
    /// `{spin}-{project}` before slugification.
    pub project: String,
    pub slug: String,
    pub image_prefix: String,
    pub base_image: String,
    pub spin_image: String,
    pub container_name: String,
    /// Multiplexer session name: the container name with `.`/`:` mapped to `_`.
    pub session_name: String,
    pub shell: String,
    pub features: SessionFeatures,
    pub mounts: HostMounts,
    /// `NAME=value` assignments in request order.
    pub secret_envs: Vec<String>,
    pub secret_env_file: Option<PathBuf>,
}

/// Resolve the descriptor for `workdir` under the given options.
pub fn resolve_descriptor(
    workdir: &Path,
    opts: &RunOptions,
    settings: &Settings,
    host: &HostContext,
) -> Result<SessionDescriptor, ConfigError> {
    let workdir = host.absolutize(workdir);
    let explicit = opts.repo.as_deref().map(|path| host.absolutize(path));
    let env_repo = host.path_var(REPO_ENV);
    let repo_root = resolve_repo_root(&RepoSearch {
        explicit: explicit.as_deref(),
        env: env_repo.as_deref(),
        compiled: host.compiled_repo.as_deref(),
        workdir: Some(&workdir),
        cwd: host.cwd.as_deref(),
        exe_dir: host.exe_dir.as_deref(),
    })?;

    let spin = opts
        .spin
        .as_deref()
        .map(str::trim)
        .filter(|spin| !spin.is_empty())
        .unwrap_or(&settings.default_spin)
        .to_string();
    let spin_dir = validate_profile(&repo_root, &spin)?;

    let base_project = opts
        .project
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| derive_project_name(&workdir));
    let project = naming::qualified_project(&spin, &base_project);
    let slug = slugify(&project);
    let name = container_name(&settings.image_prefix, &slug);

    let secret_envs = resolve_secret_envs(&opts.secret_env, |key| host.var(key))?;
    let secret_env_file = opts
        .secret_env_file
        .as_deref()
        .map(|path| resolve_secret_env_file(&host.absolutize(path)))
        .transpose()?;

    let mounts = HostMounts {
        gh_config: opts.mount_gh.then(|| host.gh_config_dir()).flatten(),
        opencode_auth: opts
            .mount_opencode_auth
            .then(|| host.opencode_auth_file())
            .flatten(),
    };

    debug!(
        container = %name,
        repo = %repo_root.display(),
        spin = %spin,
        "resolved session descriptor"
    );

    Ok(SessionDescriptor {
        workdir,
        repo_root,
        spin_image: format!("{}:{spin}", settings.image_prefix),
        base_image: format!("{}:base", settings.image_prefix),
        image_prefix: settings.image_prefix.clone(),
        spin,
        spin_dir,
        project,
        slug,
        session_name: multiplexer_session_name(&name),
        container_name: name,
        shell: settings.container_shell.clone(),
        features: SessionFeatures {
            docker_sock: !opts.disable_docker_sock,
            network: !opts.disable_network,
            gh_read_write: opts.mount_gh_rw,
            force_build: opts.force_build,
        },
        mounts,
        secret_envs,
        secret_env_file,
    })
}
