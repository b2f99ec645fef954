//! Workspace reconciliation: required windows exist, in order, under fixed names.

use tracing::{debug, info};

use super::{Multiplexer, OptionScope, WindowInfo, WorkspaceWindow};
use crate::error::RuntimeError;
use crate::session::SessionDescriptor;

/// What [`ensure_workspace`] had to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceOutcome {
    /// The session did not exist and was created.
    pub created: bool,
    /// Required windows that were missing and added.
    pub added: Vec<WorkspaceWindow>,
}

/// Ensure the descriptor's workspace session exists with every required window
/// in canonical order. Extra user windows are left alone.
pub async fn ensure_workspace(
    mux: &dyn Multiplexer,
    desc: &SessionDescriptor,
    program: &str,
) -> Result<WorkspaceOutcome, RuntimeError> {
    let session = desc.session_name.as_str();
    let container = desc.container_name.as_str();
    let shell = desc.shell.as_str();

    let outcome = if mux.has_session(session).await {
        disable_session_rename(mux, session).await?;
        let present = mux.list_windows(session).await?;
        let mut added = Vec::new();
        for window in WorkspaceWindow::ALL {
            if find_window(&present, window).is_none() {
                mux.new_window(session, window.name(), &window.command(program, container, shell))
                    .await?;
                added.push(window);
            }
        }
        if !added.is_empty() {
            info!(session, ?added, "restored missing workspace windows");
        }
        WorkspaceOutcome {
            created: false,
            added,
        }
    } else {
        let [first, rest @ ..] = WorkspaceWindow::ALL;
        mux.new_session(session, first.name(), &first.command(program, container, shell))
            .await?;
        for window in rest {
            mux.new_window(session, window.name(), &window.command(program, container, shell))
                .await?;
        }
        disable_session_rename(mux, session).await?;
        info!(session, "created workspace session");
        WorkspaceOutcome {
            created: true,
            added: WorkspaceWindow::ALL.to_vec(),
        }
    };

    order_windows(mux, session).await?;
    Ok(outcome)
}

async fn disable_session_rename(mux: &dyn Multiplexer, session: &str) -> Result<(), RuntimeError> {
    mux.set_option(OptionScope::Session, session, "allow-rename", "off")
        .await
}

fn find_window(windows: &[WindowInfo], window: WorkspaceWindow) -> Option<&WindowInfo> {
    windows
        .iter()
        .filter(|info| info.name == window.name())
        .min_by_key(|info| info.index)
}

/// Move required windows to `base + position` and pin their names.
///
/// Window ids are stable across moves, so each step re-lists and works from
/// ids rather than indexes.
pub async fn order_windows(mux: &dyn Multiplexer, session: &str) -> Result<(), RuntimeError> {
    let base = mux.base_index().await;
    for (position, window) in (0u32..).zip(WorkspaceWindow::ALL) {
        let target = base + position;
        let windows = mux.list_windows(session).await?;
        let Some(current) = find_window(&windows, window) else {
            continue;
        };
        if current.index != target {
            match windows.iter().find(|info| info.index == target) {
                Some(occupant) => {
                    debug!(session, window = window.name(), target, occupant = %occupant.name, "swapping window");
                    mux.swap_window(&current.id, &occupant.id).await?;
                }
                None => {
                    debug!(session, window = window.name(), target, "moving window");
                    mux.move_window(&current.id, session, target).await?;
                }
            }
        }
        mux.rename_window(&current.id, window.name()).await?;
        mux.set_option(OptionScope::Window, &current.id, "automatic-rename", "off")
            .await?;
    }
    Ok(())
}

/// Switch the current client when nested, attach otherwise.
pub async fn attach_workspace(mux: &dyn Multiplexer, session: &str) -> Result<(), RuntimeError> {
    if mux.inside_client() {
        mux.switch_client(session).await
    } else {
        mux.attach(session).await
    }
}
