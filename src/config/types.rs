//! Settings data model.
//!
//! Loader and source-resolution logic lives in `config::mod` so parsing and
//! precedence behavior stays centralized.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::defaults::{
    DEFAULT_ARCH, DEFAULT_BASE_PORT, DEFAULT_CONTAINER_SHELL, DEFAULT_GH_VERSION,
    DEFAULT_IMAGE_PREFIX, DEFAULT_MISE_VERSION, DEFAULT_OPENCODE_VERSION, DEFAULT_PORT_SPAN,
    DEFAULT_READY_INITIAL_BACKOFF_MS, DEFAULT_READY_MAX_BACKOFF_MS,
    DEFAULT_READY_REQUEST_TIMEOUT_MS, DEFAULT_READY_TIMEOUT_SECS, DEFAULT_SPIN,
};

/// Top-level settings threaded through every component.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub image_prefix: String,
    pub container_shell: String,
    pub default_spin: String,
    pub ports: PortSettings,
    pub readiness: ReadinessSettings,
    pub build: BuildSettings,
    pub workspace: WorkspaceSettings,
    pub display: DisplaySettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            image_prefix: DEFAULT_IMAGE_PREFIX.to_string(),
            container_shell: DEFAULT_CONTAINER_SHELL.to_string(),
            default_spin: DEFAULT_SPIN.to_string(),
            ports: PortSettings::default(),
            readiness: ReadinessSettings::default(),
            build: BuildSettings::default(),
            workspace: WorkspaceSettings::default(),
            display: DisplaySettings::default(),
        }
    }
}

/// Host port allocation range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct PortSettings {
    pub base: u16,
    pub span: u16,
}

impl Default for PortSettings {
    fn default() -> Self {
        Self {
            base: DEFAULT_BASE_PORT,
            span: DEFAULT_PORT_SPAN,
        }
    }
}

/// Readiness probe budget and backoff shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReadinessSettings {
    pub timeout_secs: u64,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub request_timeout_ms: u64,
}

impl Default for ReadinessSettings {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_READY_TIMEOUT_SECS,
            initial_backoff_ms: DEFAULT_READY_INITIAL_BACKOFF_MS,
            max_backoff_ms: DEFAULT_READY_MAX_BACKOFF_MS,
            request_timeout_ms: DEFAULT_READY_REQUEST_TIMEOUT_MS,
        }
    }
}

impl ReadinessSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

/// Build arguments passed to every image build.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct BuildSettings {
    pub arch: String,
    pub mise_version: String,
    pub gh_version: String,
    pub opencode_version: String,
}

impl Default for BuildSettings {
    fn default() -> Self {
        Self {
            arch: DEFAULT_ARCH.to_string(),
            mise_version: DEFAULT_MISE_VERSION.to_string(),
            gh_version: DEFAULT_GH_VERSION.to_string(),
            opencode_version: DEFAULT_OPENCODE_VERSION.to_string(),
        }
    }
}

/// Terminal workspace behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct WorkspaceSettings {
    /// Use the multiplexer workspace when the binary is installed.
    pub enabled: bool,
}

impl Default for WorkspaceSettings {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct DisplaySettings {
    pub color: bool,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self { color: true }
    }
}
