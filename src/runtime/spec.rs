//! Typed container engine invocations rendered to argv in one place.

use std::path::PathBuf;

/// `run` invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSpec {
    pub image: String,
    pub name: Option<String>,
    pub hostname: Option<String>,
    pub detach: bool,
    pub remove: bool,
    /// Allocate a TTY and keep stdin open (`-it`).
    pub interactive: bool,
    /// `host:container[:mode]` bind mounts.
    pub volumes: Vec<String>,
    /// `host:container` port publications.
    pub ports: Vec<String>,
    pub network: Option<String>,
    /// Ordered `key=value` labels.
    pub labels: Vec<(String, String)>,
    /// `NAME=value` assignments.
    pub env: Vec<String>,
    pub env_file: Option<PathBuf>,
    pub command: Vec<String>,
}

impl RunSpec {
    pub fn to_args(&self) -> Vec<String> {
        let mut args = vec!["run".to_string()];
        if self.detach {
            args.push("-d".into());
        }
        if self.remove {
            args.push("--rm".into());
        }
        if self.interactive {
            args.push("-it".into());
        }
        if let Some(name) = &self.name {
            args.push("--name".into());
            args.push(name.clone());
        }
        if let Some(hostname) = &self.hostname {
            args.push("--hostname".into());
            args.push(hostname.clone());
        }
        for (key, value) in &self.labels {
            args.push("--label".into());
            args.push(format!("{key}={value}"));
        }
        for volume in &self.volumes {
            args.push("-v".into());
            args.push(volume.clone());
        }
        if let Some(network) = &self.network {
            args.push(format!("--network={network}"));
        }
        for port in &self.ports {
            args.push("-p".into());
            args.push(port.clone());
        }
        for assignment in &self.env {
            args.push("-e".into());
            args.push(assignment.clone());
        }
        if let Some(path) = &self.env_file {
            args.push("--env-file".into());
            args.push(path.display().to_string());
        }
        args.push(self.image.clone());
        args.extend(self.command.iter().cloned());
        args
    }

    /// Value of `key` among the labels.
    pub fn label(&self, key: &str) -> Option<&str> {
        self.labels
            .iter()
            .find(|(candidate, _)| candidate == key)
            .map(|(_, value)| value.as_str())
    }

    /// Whether `assignment` (`NAME=value`) is among the env entries.
    pub fn has_env(&self, assignment: &str) -> bool {
        self.env.iter().any(|entry| entry == assignment)
    }
}

/// `build` invocation for one Dockerfile stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildSpec {
    pub context: PathBuf,
    pub dockerfile: PathBuf,
    pub tag: String,
    pub target: String,
    pub build_args: Vec<(String, String)>,
}

impl BuildSpec {
    pub fn to_args(&self) -> Vec<String> {
        let mut args = vec![
            "build".to_string(),
            "--target".into(),
            self.target.clone(),
            "-f".into(),
            self.dockerfile.display().to_string(),
            "-t".into(),
            self.tag.clone(),
        ];
        for (key, value) in &self.build_args {
            args.push("--build-arg".into());
            args.push(format!("{key}={value}"));
        }
        args.push(self.context.display().to_string());
        args
    }
}

/// `exec` invocation against a running container.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecSpec {
    pub container: String,
    pub interactive: bool,
    /// Leave the command running in the background (`-d`).
    pub detach: bool,
    pub env: Vec<String>,
    pub command: Vec<String>,
}

impl ExecSpec {
    pub fn new(container: impl Into<String>, command: Vec<String>) -> Self {
        Self {
            container: container.into(),
            command,
            ..Self::default()
        }
    }

    pub fn interactive(mut self) -> Self {
        self.interactive = true;
        self
    }

    pub fn detached(mut self) -> Self {
        self.detach = true;
        self
    }

    pub fn with_env(mut self, assignment: impl Into<String>) -> Self {
        self.env.push(assignment.into());
        self
    }

    pub fn to_args(&self) -> Vec<String> {
        let mut args = vec!["exec".to_string()];
        if self.detach {
            args.push("-d".into());
        }
        if self.interactive {
            args.push("-it".into());
        }
        for assignment in &self.env {
            args.push("-e".into());
            args.push(assignment.clone());
        }
        args.push(self.container.clone());
        args.extend(self.command.iter().cloned());
        args
    }
}
