//! Host port allocation for the inner agent server.
//!
//! A container's port label is the durable record; once written it is reused
//! on every later reconciliation so reconnect instructions stay valid.

use std::net::{Ipv4Addr, TcpListener};

use tracing::{debug, info};

use crate::config::PortSettings;
use crate::error::CaigedError;
use crate::runtime::ContainerRuntime;

/// Port the agent server listens on inside every container.
pub const SERVER_PORT: u16 = 4096;
/// Container label recording the allocated host port.
pub const PORT_LABEL: &str = "opencode.port";

/// Port already published by `container`, from its label or its binding.
pub async fn existing_port(runtime: &dyn ContainerRuntime, container: &str) -> Option<u16> {
    if let Ok(label) = runtime.inspect_label(container, PORT_LABEL).await {
        if let Ok(port) = label.trim().parse::<u16>() {
            if port > 0 {
                return Some(port);
            }
        }
    }
    runtime
        .published_port(container, SERVER_PORT)
        .await
        .ok()
        .flatten()
}

/// Reuse the container's published port or scan for a free one.
pub async fn allocate_port(
    runtime: &dyn ContainerRuntime,
    container: &str,
    ports: &PortSettings,
) -> Result<u16, CaigedError> {
    if let Some(port) = existing_port(runtime, container).await {
        debug!(container, port, "reusing published port");
        return Ok(port);
    }
    let port = find_free_port(ports.base, ports.span)?;
    info!(container, port, "allocated fresh port");
    Ok(port)
}

/// First port in `[base, base + span)` bindable on all interfaces.
///
/// Port 0 is never returned; binding it would succeed with an
/// OS-chosen ephemeral port that cannot be published.
pub fn find_free_port(base: u16, span: u16) -> Result<u16, CaigedError> {
    let end = scan_end(base, span);
    let start = base.max(1);
    if span == 0 || start > end {
        return Err(CaigedError::NoFreePort { start, end });
    }
    (start..=end)
        .find(|port| TcpListener::bind((Ipv4Addr::UNSPECIFIED, *port)).is_ok())
        .ok_or(CaigedError::NoFreePort { start, end })
}

fn scan_end(base: u16, span: u16) -> u16 {
    base.saturating_add(span.saturating_sub(1))
}
