//! Unified error types for the session orchestrator.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// Errors when loading settings or resolving a session identity.
///
/// These are always fatal and never retried.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Toml(toml::de::Error),
    Invalid(String),
    /// No candidate directory qualified as a repository root.
    RepoNotFound(String),
    /// An explicitly requested repository root lacks the marker entries.
    InvalidRepo(PathBuf),
    /// The selected profile directory is missing or malformed.
    InvalidProfile { path: PathBuf, reason: String },
    InvalidSecretName(String),
    MissingSecret(String),
    InvalidSecretEnvFile(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "io: {e}"),
            Self::Toml(e) => write!(f, "toml: {e}"),
            Self::Invalid(msg) => write!(f, "invalid config: {msg}"),
            Self::RepoNotFound(msg) => write!(f, "unable to locate caiged repo: {msg}"),
            Self::InvalidRepo(path) => write!(
                f,
                "invalid repo path: {} (expected spins/, Dockerfile and entrypoint.sh)",
                path.display()
            ),
            Self::InvalidProfile { path, reason } => {
                write!(f, "invalid spin: {reason} ({})", path.display())
            }
            Self::InvalidSecretName(name) => write!(f, "invalid secret env name: {name}"),
            Self::MissingSecret(name) => write!(f, "missing host secret env: {name}"),
            Self::InvalidSecretEnvFile(msg) => write!(f, "invalid secret env file: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(e: toml::de::Error) -> Self {
        Self::Toml(e)
    }
}

// ---------------------------------------------------------------------------
// RuntimeError
// ---------------------------------------------------------------------------

/// Errors from invoking the container runtime, multiplexer or agent binaries.
#[derive(Debug)]
pub enum RuntimeError {
    /// The binary could not be found on this host.
    Unavailable(String),
    /// The binary ran and failed, or could not be spawned.
    Invocation {
        program: String,
        action: String,
        detail: String,
    },
}

impl RuntimeError {
    pub(crate) fn invocation(
        program: impl Into<String>,
        action: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        Self::Invocation {
            program: program.into(),
            action: action.into(),
            detail: detail.into(),
        }
    }

    /// Underlying failure text, without the uniform prefix.
    pub fn detail(&self) -> &str {
        match self {
            Self::Unavailable(msg) => msg,
            Self::Invocation { detail, .. } => detail,
        }
    }
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable(msg) => write!(f, "runtime unavailable: {msg}"),
            Self::Invocation {
                program,
                action,
                detail,
            } => write!(f, "runtime invocation failed: {program} {action}: {detail}"),
        }
    }
}

impl std::error::Error for RuntimeError {}

// ---------------------------------------------------------------------------
// CaigedError: top-level
// ---------------------------------------------------------------------------

/// Top-level error type surfaced to the operator as a single line.
#[derive(Debug)]
pub enum CaigedError {
    Config(ConfigError),
    Runtime(RuntimeError),
    /// The inner server never answered within the readiness budget.
    ServerNotReady {
        url: String,
        attempts: u32,
        elapsed: Duration,
    },
    /// Every candidate port in the scan range was taken.
    NoFreePort { start: u16, end: u16 },
    /// Salt persistence failed.
    Credential(std::io::Error),
    /// A named container/project could not be found.
    NotFound(String),
    /// A bulk operation finished with per-item failures.
    Incomplete {
        operation: &'static str,
        failures: Vec<String>,
    },
}

impl fmt::Display for CaigedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "{e}"),
            Self::Runtime(e) => write!(f, "{e}"),
            Self::ServerNotReady {
                url,
                attempts,
                elapsed,
            } => write!(
                f,
                "OpenCode server at {url} failed to start within {}s (attempted {attempts} times)",
                elapsed.as_secs()
            ),
            Self::NoFreePort { start, end } => {
                write!(f, "no free port found in range {start}-{end}")
            }
            Self::Credential(e) => write!(f, "credential salt: {e}"),
            Self::NotFound(msg) => write!(f, "{msg}"),
            Self::Incomplete {
                operation,
                failures,
            } => write!(f, "{operation} completed with errors: {}", failures.join("; ")),
        }
    }
}

impl std::error::Error for CaigedError {}

impl From<ConfigError> for CaigedError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<RuntimeError> for CaigedError {
    fn from(e: RuntimeError) -> Self {
        Self::Runtime(e)
    }
}

/// Convenience alias used across orchestration code.
pub type CaigedResult<T> = Result<T, CaigedError>;
