//! Terminal output for status lines and connection summaries.
//!
//! Status goes to stderr; data the operator may pipe (`port`, `containers
//! list`) goes to stdout.

use crossterm::style::{Color, Stylize};

const INDENT: &str = "  ";
const BULLET: &str = "•";
const LABEL_WARNING: &str = "warning:";
const LABEL_ERROR: &str = "✗ Error:";
const LABEL_SUCCESS: &str = "✓";

/// Which connection banner to print.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Banner {
    Started,
    Existing,
}

impl Banner {
    pub fn title(self) -> &'static str {
        match self {
            Self::Started => "CONTAINER STARTED",
            Self::Existing => "CONNECTING TO EXISTING CONTAINER",
        }
    }
}

/// Everything needed to reconnect to a running session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionSummary {
    pub banner: Banner,
    /// Name accepted by `caiged connect`.
    pub project: String,
    pub container: String,
    pub url: String,
    pub password: String,
    pub manual_command: String,
}

impl ConnectionSummary {
    pub fn reconnect_command(&self) -> String {
        format!("caiged connect {}", self.project)
    }

    /// Ordered label/value rows shown under the banner.
    pub fn rows(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Project", self.project.clone()),
            ("Container", self.container.clone()),
            ("Server", self.url.clone()),
            ("Password", self.password.clone()),
            ("Reconnect", self.reconnect_command()),
            ("Manual Connect", self.manual_command.clone()),
        ]
    }
}

/// One row of `containers list`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerRow {
    pub name: String,
    pub running: bool,
    pub port: Option<u16>,
    /// Command that reconnects to this container.
    pub hint: String,
}

/// Plain-text `containers list` line, without styling.
pub fn container_row_text(row: &ContainerRow) -> String {
    let status = if row.running { "running" } else { "stopped" };
    let port = row
        .port
        .map(|port| format!("port {port}"))
        .unwrap_or_else(|| "no port".to_string());
    format!("{}  [{status}, {port}]  {}", row.name, row.hint)
}

/// Stateless terminal renderer; `color` is fixed at construction.
#[derive(Debug, Clone, Copy)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    pub fn new(color: bool) -> Self {
        Self { color }
    }

    pub fn color(&self) -> bool {
        self.color
    }

    pub fn section(&self, title: &str) {
        if self.color {
            eprintln!(
                "{} {}",
                BULLET.with(Color::DarkGrey),
                title.with(Color::White).bold()
            );
        } else {
            eprintln!("{title}:");
        }
    }

    /// Lifecycle line such as "building image".
    pub fn activity(&self, text: &str) {
        if self.color {
            eprintln!(
                "{} {}",
                BULLET.with(Color::DarkGrey),
                text.with(Color::Grey).bold()
            );
        } else {
            eprintln!("{text}");
        }
    }

    pub fn field(&self, key: &str, value: &str) {
        if self.color {
            eprintln!(
                "{INDENT}{} {}",
                format!("{key}:").with(Color::DarkGrey),
                value.with(Color::White)
            );
        } else {
            eprintln!("{INDENT}{key}: {value}");
        }
    }

    pub fn detail(&self, text: &str) {
        if self.color {
            eprintln!("{INDENT}{}", text.with(Color::DarkGrey));
        } else {
            eprintln!("{INDENT}{text}");
        }
    }

    pub fn warn(&self, msg: &str) {
        if self.color {
            eprintln!("{} {msg}", LABEL_WARNING.with(Color::Yellow).bold());
        } else {
            eprintln!("{LABEL_WARNING} {msg}");
        }
    }

    pub fn error(&self, msg: &str) {
        if self.color {
            eprintln!("{} {msg}", LABEL_ERROR.with(Color::Red).bold());
        } else {
            eprintln!("{LABEL_ERROR} {msg}");
        }
    }

    pub fn success(&self, msg: &str) {
        if self.color {
            eprintln!("{} {msg}", LABEL_SUCCESS.with(Color::Green).bold());
        } else {
            eprintln!("{LABEL_SUCCESS} {msg}");
        }
    }

    /// Banner plus reconnect details.
    pub fn connection_summary(&self, summary: &ConnectionSummary) {
        let rule = "=".repeat(summary.banner.title().len() + 4);
        if self.color {
            eprintln!("\n{}", rule.as_str().with(Color::Green));
            eprintln!("  {}", summary.banner.title().with(Color::Green).bold());
            eprintln!("{}", rule.as_str().with(Color::Green));
        } else {
            eprintln!("\n{rule}\n  {}\n{rule}", summary.banner.title());
        }
        for (key, value) in summary.rows() {
            self.field(key, &value);
        }
        eprintln!();
    }

    /// Print one data line to stdout.
    pub fn line(&self, text: &str) {
        println!("{text}");
    }

    pub fn container_row(&self, row: &ContainerRow) {
        if !self.color {
            self.line(&container_row_text(row));
            return;
        }
        let status = if row.running {
            "running".with(Color::Green)
        } else {
            "stopped".with(Color::DarkGrey)
        };
        let port = row
            .port
            .map(|port| format!("port {port}"))
            .unwrap_or_else(|| "no port".to_string());
        println!(
            "{}  [{status}, {port}]  {}",
            row.name.as_str().bold(),
            row.hint.as_str().with(Color::DarkGrey)
        );
    }
}
