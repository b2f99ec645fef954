//! Fixed set of workspace windows and the commands bound to them.

use crate::opencode::serve_command;
use crate::runtime::{shell_join, ExecSpec};

/// Environment variable telling the in-container shell which window it is in.
pub const WINDOW_ENV: &str = "CAIGED_WINDOW";

/// Required workspace windows in canonical order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkspaceWindow {
    Help,
    Opencode,
    Shell,
}

impl WorkspaceWindow {
    pub const ALL: [Self; 3] = [Self::Help, Self::Opencode, Self::Shell];

    pub fn name(self) -> &'static str {
        match self {
            Self::Help => "help",
            Self::Opencode => "opencode",
            Self::Shell => "shell",
        }
    }

    /// Program run before dropping to an interactive shell.
    fn startup(self) -> Option<String> {
        match self {
            Self::Help => Some("caiged-help".to_string()),
            Self::Opencode => Some(serve_command()),
            Self::Shell => None,
        }
    }

    /// Exec invocation bound to this window.
    pub fn exec_spec(self, container: &str, shell: &str) -> ExecSpec {
        let command = match self.startup() {
            Some(startup) => vec![
                shell.to_string(),
                "-lc".to_string(),
                format!("{startup}; exec {shell} -l"),
            ],
            None => vec![shell.to_string(), "-l".to_string()],
        };
        ExecSpec::new(container, command)
            .interactive()
            .with_env(format!("{WINDOW_ENV}={}", self.name()))
    }

    /// Shell command line the multiplexer runs for this window.
    pub fn command(self, program: &str, container: &str, shell: &str) -> String {
        shell_join(program, &self.exec_spec(container, shell).to_args())
    }
}
