//! caiged: per-project dev containers hosting an OpenCode agent server.
//!
//! A session's identity is derived from a working directory and a spin
//! (profile). Each invocation re-observes the container engine and the tmux
//! server, then takes the minimal action to reach a running container, an
//! ordered terminal workspace and an attached agent client.
//!
//! # Quick start
//!
//! ```no_run
//! use caiged::config::Settings;
//! use caiged::session::{resolve_descriptor, HostContext, RunOptions};
//!
//! let desc = resolve_descriptor(
//!     std::path::Path::new("."),
//!     &RunOptions::default(),
//!     &Settings::default(),
//!     &HostContext::capture(),
//! )
//! .unwrap();
//! println!("{}", desc.container_name);
//! ```

pub mod app;
pub mod build_info;
pub mod config;
pub mod credentials;
pub mod error;
pub mod logging;
pub mod opencode;
pub mod ports;
pub mod readiness;
pub mod reconcile;
pub mod render;
pub mod resume;
pub mod runtime;
pub mod session;
#[cfg(test)]
pub mod testsupport;
pub mod tmux;
