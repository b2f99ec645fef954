//! Shared test fixtures: temp dirs, fake repo roots and recording mocks for
//! every collaborator seam.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;

use crate::error::RuntimeError;
use crate::opencode::{AgentClient, AttachTarget};
use crate::ports::{PORT_LABEL, SERVER_PORT};
use crate::readiness::ProbeTransport;
use crate::runtime::{BuildSpec, ContainerRuntime, ExecSpec, RunSpec};
use crate::session::{HostMounts, SessionDescriptor, SessionFeatures};
use crate::tmux::{Multiplexer, OptionScope, WindowInfo};

static TEST_DIR_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Temporary directory fixture with best-effort cleanup.
#[derive(Debug)]
pub struct TestTempDir {
    path: PathBuf,
}

impl TestTempDir {
    /// Create a unique temporary directory with a readable prefix.
    pub fn new(prefix: &str) -> Self {
        let suffix = TEST_DIR_COUNTER.fetch_add(1, Ordering::Relaxed);
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis();
        let dir = std::env::temp_dir().join(format!("caiged-{prefix}-{millis}-{suffix}"));
        fs::create_dir_all(&dir).expect("failed to create temporary fixture directory");
        Self { path: dir }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn child(&self, relative: &str) -> PathBuf {
        self.path.join(relative)
    }

    /// Write UTF-8 text to a child path, creating parent directories as needed.
    pub fn write_text(&self, relative: &str, content: &str) -> PathBuf {
        let path = self.child(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("failed to create parent directories for fixture");
        }
        fs::write(&path, content).expect("failed to write fixture file");
        path
    }
}

impl Drop for TestTempDir {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.path);
    }
}

/// Repository root with the marker entries and optional spins.
#[derive(Debug)]
pub struct FakeRepo {
    dir: TestTempDir,
}

impl FakeRepo {
    pub fn new(prefix: &str) -> Self {
        let dir = TestTempDir::new(prefix);
        fs::create_dir_all(dir.child("spins")).expect("spins dir");
        dir.write_text("Dockerfile", "FROM scratch AS base\n");
        dir.write_text("entrypoint.sh", "#!/bin/sh\nexec \"$@\"\n");
        Self { dir }
    }

    /// Add a valid spin with an agent-instructions file.
    pub fn with_spin(self, name: &str) -> Self {
        self.write(&format!("spins/{name}/AGENTS.md"), "# agent\n");
        self
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn mkdir(&self, relative: &str) -> PathBuf {
        let path = self.dir.child(relative);
        fs::create_dir_all(&path).expect("fixture dir");
        path
    }

    pub fn write(&self, relative: &str, content: &str) -> PathBuf {
        self.dir.write_text(relative, content)
    }
}

/// Descriptor for spin `qa` on `/src/app`, with no filesystem behind it.
pub fn sample_descriptor() -> SessionDescriptor {
    SessionDescriptor {
        workdir: PathBuf::from("/src/app"),
        repo_root: PathBuf::from("/opt/caiged"),
        spin: "qa".into(),
        spin_dir: PathBuf::from("/opt/caiged/spins/qa"),
        project: "qa-app".into(),
        slug: "qa-app".into(),
        image_prefix: "caiged".into(),
        base_image: "caiged:base".into(),
        spin_image: "caiged:qa".into(),
        container_name: "caiged-qa-app".into(),
        session_name: "caiged-qa-app".into(),
        shell: "/bin/zsh".into(),
        features: SessionFeatures {
            docker_sock: true,
            network: true,
            gh_read_write: false,
            force_build: false,
        },
        mounts: HostMounts::default(),
        secret_envs: Vec::new(),
        secret_env_file: None,
    }
}

fn invocation(action: &str, detail: &str) -> RuntimeError {
    RuntimeError::invocation("docker", action, detail)
}

#[derive(Debug, Clone, Default)]
struct MockContainer {
    running: bool,
    labels: BTreeMap<String, String>,
    binding: Option<u16>,
}

#[derive(Debug, Default)]
struct RuntimeState {
    containers: BTreeMap<String, MockContainer>,
    images: BTreeSet<String>,
    calls: Vec<String>,
    exec_scripts: Vec<(String, String, Result<String, String>)>,
    run_failure: Option<String>,
    build_failure: Option<String>,
}

/// In-memory container engine recording every invocation as its argv.
#[derive(Debug, Default)]
pub struct MockRuntime {
    state: Mutex<RuntimeState>,
}

impl MockRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, RuntimeState> {
        self.state.lock().expect("mock runtime state")
    }

    fn record(&self, args: &[String]) {
        self.lock().calls.push(args.join(" "));
    }

    /// Add a container; `port` sets both the label and the binding.
    pub fn add_container(&self, name: &str, running: bool, port: Option<u16>) {
        let mut container = MockContainer {
            running,
            ..MockContainer::default()
        };
        if let Some(port) = port {
            container
                .labels
                .insert(PORT_LABEL.to_string(), port.to_string());
            container.binding = Some(port);
        }
        self.lock().containers.insert(name.to_string(), container);
    }

    pub fn set_label(&self, name: &str, key: &str, value: &str) {
        if let Some(container) = self.lock().containers.get_mut(name) {
            container.labels.insert(key.to_string(), value.to_string());
        }
    }

    pub fn set_binding(&self, name: &str, port: u16) {
        if let Some(container) = self.lock().containers.get_mut(name) {
            container.binding = Some(port);
        }
    }

    pub fn add_image(&self, tag: &str) {
        self.lock().images.insert(tag.to_string());
    }

    pub fn exists_now(&self, name: &str) -> bool {
        self.lock().containers.contains_key(name)
    }

    pub fn running_now(&self, name: &str) -> bool {
        self.lock()
            .containers
            .get(name)
            .is_some_and(|container| container.running)
    }

    pub fn fail_run(&self, msg: &str) {
        self.lock().run_failure = Some(msg.to_string());
    }

    pub fn fail_build(&self, msg: &str) {
        self.lock().build_failure = Some(msg.to_string());
    }

    /// Answer execs in `container` whose command line contains `needle`.
    pub fn script_exec(&self, container: &str, needle: &str, result: Result<&str, &str>) {
        self.lock().exec_scripts.push((
            container.to_string(),
            needle.to_string(),
            result.map(str::to_string).map_err(str::to_string),
        ));
    }

    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    pub fn calls_matching(&self, prefix: &str) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|call| call.starts_with(prefix))
            .collect()
    }

    pub fn count_calls(&self, prefix: &str) -> usize {
        self.calls_matching(prefix).len()
    }
}

/// Minimal emulation of the engine's `name=` regex filter.
fn name_filter_matches(filter: &str, name: &str) -> bool {
    let pattern = filter.strip_prefix("name=").unwrap_or(filter);
    let (anchored_start, pattern) = match pattern.strip_prefix('^') {
        Some(rest) => (true, rest.strip_prefix('/').unwrap_or(rest)),
        None => (false, pattern),
    };
    let (anchored_end, pattern) = match pattern.strip_suffix('$') {
        Some(rest) => (true, rest),
        None => (false, pattern),
    };
    match (anchored_start, anchored_end) {
        (true, true) => name == pattern,
        (true, false) => name.starts_with(pattern),
        (false, true) => name.ends_with(pattern),
        (false, false) => name.contains(pattern),
    }
}

#[async_trait]
impl ContainerRuntime for MockRuntime {
    fn program(&self) -> &str {
        "docker"
    }

    fn prefix_filter(&self, prefix: &str) -> String {
        format!("name=^/{prefix}-")
    }

    async fn exists(&self, name: &str) -> bool {
        self.exists_now(name)
    }

    async fn is_running(&self, name: &str) -> bool {
        self.running_now(name)
    }

    async fn start(&self, name: &str) -> Result<(), RuntimeError> {
        self.record(&["start".into(), name.into()]);
        match self.lock().containers.get_mut(name) {
            Some(container) => {
                container.running = true;
                Ok(())
            }
            None => Err(invocation("start", &format!("No such container: {name}"))),
        }
    }

    async fn stop(&self, name: &str) -> Result<(), RuntimeError> {
        self.record(&["stop".into(), name.into()]);
        match self.lock().containers.get_mut(name) {
            Some(container) => {
                container.running = false;
                Ok(())
            }
            None => Err(invocation("stop", &format!("No such container: {name}"))),
        }
    }

    async fn remove(&self, name: &str) -> Result<(), RuntimeError> {
        self.record(&["rm".into(), "-f".into(), name.into()]);
        match self.lock().containers.remove(name) {
            Some(_) => Ok(()),
            None => Err(invocation("rm", &format!("No such container: {name}"))),
        }
    }

    async fn run(&self, spec: &RunSpec) -> Result<(), RuntimeError> {
        self.record(&spec.to_args());
        let mut state = self.lock();
        if let Some(msg) = &state.run_failure {
            return Err(invocation("run", msg));
        }
        if let (Some(name), false) = (&spec.name, spec.remove) {
            let binding = spec.ports.iter().find_map(|publish| {
                publish
                    .strip_suffix(&format!(":{SERVER_PORT}"))
                    .and_then(|host| host.parse().ok())
            });
            state.containers.insert(
                name.clone(),
                MockContainer {
                    running: true,
                    labels: spec.labels.iter().cloned().collect(),
                    binding,
                },
            );
        }
        Ok(())
    }

    async fn exec_capture(&self, name: &str, command: &[String]) -> Result<String, RuntimeError> {
        let args = ExecSpec::new(name, command.to_vec()).to_args();
        self.record(&args);
        let line = command.join(" ");
        let state = self.lock();
        if !state
            .containers
            .get(name)
            .is_some_and(|container| container.running)
        {
            return Err(invocation("exec", &format!("container {name} is not running")));
        }
        let scripted = state
            .exec_scripts
            .iter()
            .find(|(container, needle, _)| container == name && line.contains(needle.as_str()));
        match scripted {
            Some((_, _, Ok(out))) => Ok(out.clone()),
            Some((_, _, Err(msg))) => Err(invocation("exec", msg)),
            None => Ok(String::new()),
        }
    }

    async fn exec_interactive(&self, spec: &ExecSpec) -> Result<(), RuntimeError> {
        self.record(&spec.to_args());
        if self.running_now(&spec.container) {
            Ok(())
        } else {
            Err(invocation(
                "exec",
                &format!("container {} is not running", spec.container),
            ))
        }
    }

    async fn exec_detached(&self, spec: &ExecSpec) -> Result<(), RuntimeError> {
        self.record(&spec.clone().detached().to_args());
        if self.running_now(&spec.container) {
            Ok(())
        } else {
            Err(invocation(
                "exec",
                &format!("container {} is not running", spec.container),
            ))
        }
    }

    async fn inspect_label(&self, name: &str, key: &str) -> Result<String, RuntimeError> {
        match self.lock().containers.get(name) {
            Some(container) => Ok(container.labels.get(key).cloned().unwrap_or_default()),
            None => Err(invocation("inspect", &format!("No such object: {name}"))),
        }
    }

    async fn published_port(
        &self,
        name: &str,
        _container_port: u16,
    ) -> Result<Option<u16>, RuntimeError> {
        match self.lock().containers.get(name) {
            Some(container) => Ok(container.binding),
            None => Err(invocation("port", &format!("No such container: {name}"))),
        }
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
        args.extend([
            "--filter".to_string(),
            filter.to_string(),
            "--format".to_string(),
            format.to_string(),
        ]);
        self.record(&args);
        Ok(self
            .lock()
            .containers
            .iter()
            .filter(|(_, container)| include_stopped || container.running)
            .filter(|(name, _)| name_filter_matches(filter, name))
            .map(|(name, _)| name.clone())
            .collect())
    }

    async fn image_exists(&self, tag: &str) -> bool {
        self.lock().images.contains(tag)
    }

    async fn build_image(&self, spec: &BuildSpec) -> Result<(), RuntimeError> {
        self.record(&spec.to_args());
        let mut state = self.lock();
        if let Some(msg) = &state.build_failure {
            return Err(invocation("build", msg));
        }
        state.images.insert(spec.tag.clone());
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct MockWindow {
    id: String,
    index: u32,
    name: String,
    command: String,
}

#[derive(Debug, Default)]
struct MuxState {
    sessions: BTreeMap<String, Vec<MockWindow>>,
    next_id: u32,
    calls: Vec<String>,
    no_server: bool,
}

impl MuxState {
    fn window_mut(&mut self, id: &str) -> Option<&mut MockWindow> {
        self.sessions
            .values_mut()
            .flat_map(|windows| windows.iter_mut())
            .find(|window| window.id == id)
    }

    fn add_window(&mut self, session: &str, base: u32, name: &str, command: &str) {
        let id = format!("@{}", self.next_id);
        self.next_id += 1;
        let windows = self.sessions.entry(session.to_string()).or_default();
        let index = (base..)
            .find(|candidate| !windows.iter().any(|window| window.index == *candidate))
            .unwrap_or(base);
        windows.push(MockWindow {
            id,
            index,
            name: name.to_string(),
            command: command.to_string(),
        });
    }
}

/// In-memory multiplexer with stable `@N` window ids.
#[derive(Debug, Default)]
pub struct MockMultiplexer {
    state: Mutex<MuxState>,
    base: u32,
    inside: bool,
}

impl MockMultiplexer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base_index(mut self, base: u32) -> Self {
        self.base = base;
        self
    }

    pub fn inside_client(mut self, inside: bool) -> Self {
        self.inside = inside;
        self
    }

    /// Every kill fails as if no server were running.
    pub fn without_server(self) -> Self {
        self.lock().no_server = true;
        self
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MuxState> {
        self.state.lock().expect("mock multiplexer state")
    }

    fn record(&self, call: String) {
        self.lock().calls.push(call);
    }

    /// Create a session with windows at explicit indexes.
    pub fn seed_session(&self, session: &str, windows: &[(u32, &str)]) {
        let mut state = self.lock();
        let mut seeded = Vec::new();
        for (index, name) in windows {
            seeded.push(MockWindow {
                id: format!("@{}", state.next_id),
                index: *index,
                name: name.to_string(),
                command: String::new(),
            });
            state.next_id += 1;
        }
        state.sessions.insert(session.to_string(), seeded);
    }

    pub fn has(&self, session: &str) -> bool {
        self.lock().sessions.contains_key(session)
    }

    /// Windows sorted by index.
    pub fn windows(&self, session: &str) -> Vec<WindowInfo> {
        let mut windows: Vec<WindowInfo> = self
            .lock()
            .sessions
            .get(session)
            .map(|windows| {
                windows
                    .iter()
                    .map(|window| WindowInfo {
                        id: window.id.clone(),
                        index: window.index,
                        name: window.name.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default();
        windows.sort_by_key(|window| window.index);
        windows
    }

    pub fn window_names(&self, session: &str) -> Vec<String> {
        self.windows(session).into_iter().map(|w| w.name).collect()
    }

    pub fn window_indexes(&self, session: &str) -> Vec<u32> {
        self.windows(session).into_iter().map(|w| w.index).collect()
    }

    pub fn window_command(&self, session: &str, name: &str) -> Option<String> {
        self.lock()
            .sessions
            .get(session)?
            .iter()
            .find(|window| window.name == name)
            .map(|window| window.command.clone())
    }

    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    pub fn count_calls(&self, prefix: &str) -> usize {
        self.calls()
            .iter()
            .filter(|call| call.starts_with(prefix))
            .count()
    }
}

fn mux_error(action: &str, detail: &str) -> RuntimeError {
    RuntimeError::invocation("tmux", action, detail)
}

#[async_trait]
impl Multiplexer for MockMultiplexer {
    fn inside_client(&self) -> bool {
        self.inside
    }

    async fn has_session(&self, session: &str) -> bool {
        self.has(session)
    }

    async fn new_session(
        &self,
        session: &str,
        first_window: &str,
        command: &str,
    ) -> Result<(), RuntimeError> {
        self.record(format!("new-session {session} {first_window}"));
        // tmux stores `.` and `:` in session names as `_`.
        let stored = session.replace(['.', ':'], "_");
        let mut state = self.lock();
        if state.sessions.contains_key(&stored) {
            return Err(mux_error("new-session", &format!("duplicate session: {stored}")));
        }
        state.add_window(&stored, self.base, first_window, command);
        Ok(())
    }

    async fn new_window(
        &self,
        session: &str,
        name: &str,
        command: &str,
    ) -> Result<(), RuntimeError> {
        self.record(format!("new-window {session} {name}"));
        let mut state = self.lock();
        if !state.sessions.contains_key(session) {
            return Err(mux_error("new-window", &format!("can't find session: {session}")));
        }
        state.add_window(session, self.base, name, command);
        Ok(())
    }

    async fn list_windows(&self, session: &str) -> Result<Vec<WindowInfo>, RuntimeError> {
        if !self.has(session) {
            return Err(mux_error("list-windows", &format!("can't find session: {session}")));
        }
        Ok(self.windows(session))
    }

    async fn move_window(
        &self,
        window_id: &str,
        session: &str,
        index: u32,
    ) -> Result<(), RuntimeError> {
        self.record(format!("move-window {window_id} {session}:{index}"));
        let mut state = self.lock();
        let occupied = state
            .sessions
            .get(session)
            .is_some_and(|windows| windows.iter().any(|window| window.index == index));
        if occupied {
            return Err(mux_error("move-window", &format!("index in use: {index}")));
        }
        match state.window_mut(window_id) {
            Some(window) => {
                window.index = index;
                Ok(())
            }
            None => Err(mux_error("move-window", &format!("can't find window: {window_id}"))),
        }
    }

    async fn swap_window(&self, source_id: &str, target_id: &str) -> Result<(), RuntimeError> {
        self.record(format!("swap-window {source_id} {target_id}"));
        let mut state = self.lock();
        let source = state.window_mut(source_id).map(|window| window.index);
        let target = state.window_mut(target_id).map(|window| window.index);
        let (Some(source_index), Some(target_index)) = (source, target) else {
            return Err(mux_error("swap-window", "can't find window"));
        };
        if let Some(window) = state.window_mut(source_id) {
            window.index = target_index;
        }
        if let Some(window) = state.window_mut(target_id) {
            window.index = source_index;
        }
        Ok(())
    }

    async fn rename_window(&self, window_id: &str, name: &str) -> Result<(), RuntimeError> {
        self.record(format!("rename-window {window_id} {name}"));
        match self.lock().window_mut(window_id) {
            Some(window) => {
                window.name = name.to_string();
                Ok(())
            }
            None => Err(mux_error("rename-window", &format!("can't find window: {window_id}"))),
        }
    }

    async fn set_option(
        &self,
        scope: OptionScope,
        target: &str,
        option: &str,
        value: &str,
    ) -> Result<(), RuntimeError> {
        let scope = match scope {
            OptionScope::Session => "session",
            OptionScope::Window => "window",
        };
        self.record(format!("set-option {scope} {option} {value} {target}"));
        Ok(())
    }

    async fn base_index(&self) -> u32 {
        self.base
    }

    async fn attach(&self, session: &str) -> Result<(), RuntimeError> {
        self.record(format!("attach {session}"));
        Ok(())
    }

    async fn switch_client(&self, session: &str) -> Result<(), RuntimeError> {
        self.record(format!("switch-client {session}"));
        Ok(())
    }

    async fn kill_session(&self, session: &str) -> Result<(), RuntimeError> {
        self.record(format!("kill-session {session}"));
        let mut state = self.lock();
        if state.no_server {
            return Err(mux_error(
                "kill-session",
                "no server running on /tmp/tmux-0/default",
            ));
        }
        match state.sessions.remove(session) {
            Some(_) => Ok(()),
            None => Err(mux_error("kill-session", &format!("can't find session: {session}"))),
        }
    }

    async fn list_sessions(&self) -> Result<Vec<String>, RuntimeError> {
        let state = self.lock();
        if state.no_server {
            return Err(mux_error(
                "list-sessions",
                "no server running on /tmp/tmux-0/default",
            ));
        }
        Ok(state.sessions.keys().cloned().collect())
    }
}

/// Probe transport failing a fixed number of times, then answering.
#[derive(Debug)]
pub struct ScriptedProbe {
    failures: usize,
    status: Option<u16>,
    calls: AtomicUsize,
}

impl ScriptedProbe {
    pub fn failing_then(failures: usize, status: u16) -> Self {
        Self {
            failures,
            status: Some(status),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn never_ready() -> Self {
        Self {
            failures: usize::MAX,
            status: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProbeTransport for ScriptedProbe {
    async fn probe(&self, _url: &str) -> Result<u16, String> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        match self.status {
            Some(status) if call >= self.failures => Ok(status),
            _ => Err("connection refused".to_string()),
        }
    }
}

/// Agent client recording attach targets instead of running a process.
#[derive(Debug, Default)]
pub struct RecordingAgent {
    attached: Mutex<Vec<AttachTarget>>,
}

impl RecordingAgent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attached(&self) -> Vec<AttachTarget> {
        self.attached.lock().expect("agent state").clone()
    }
}

#[async_trait]
impl AgentClient for RecordingAgent {
    async fn attach(&self, target: &AttachTarget) -> Result<(), RuntimeError> {
        self.attached
            .lock()
            .expect("agent state")
            .push(target.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temp_dir_fixture_writes_and_resolves_paths() {
        let tmp = TestTempDir::new("fixture");
        let path = tmp.write_text("nested/file.txt", "hello");
        assert_eq!(fs::read_to_string(path).expect("read"), "hello");
        assert!(tmp.path().exists());
    }

    #[test]
    fn fake_repo_has_markers() {
        let repo = FakeRepo::new("fixture-repo").with_spin("qa");
        assert!(crate::session::is_repo_root(repo.root()));
        assert!(repo.root().join("spins/qa/AGENTS.md").is_file());
    }

    #[test]
    fn name_filter_emulates_anchors() {
        assert!(name_filter_matches("name=^/caiged-", "caiged-qa-app"));
        assert!(name_filter_matches("name=^caiged-", "caiged-qa-app"));
        assert!(!name_filter_matches("name=^/caiged-", "other-caiged-app"));
        assert!(name_filter_matches("name=-app$", "caiged-qa-app"));
        assert!(!name_filter_matches("name=-app$", "caiged-qa-app-2"));
    }
}
