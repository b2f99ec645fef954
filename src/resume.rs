//! Discovery of the newest saved agent conversation inside a container.
//!
//! Finding nothing is a normal outcome: every failure maps to `None`.

use serde::Deserialize;
use tracing::debug;

use crate::runtime::ContainerRuntime;

/// Directory holding one state file per saved conversation.
pub const SESSION_STORAGE_DIR: &str = "/root/.local/share/opencode/storage/session_diff";
const SESSION_PREFIX: &str = "ses_";
const SESSION_SUFFIX: &str = ".json";

/// Session id from the first line of a newest-first file listing.
pub fn parse_session_listing(listing: &str) -> Option<String> {
    let first = listing.lines().map(str::trim).find(|line| !line.is_empty())?;
    let file = first.rsplit('/').next().unwrap_or(first);
    let id = file.strip_suffix(SESSION_SUFFIX)?;
    (id.starts_with(SESSION_PREFIX) && id.len() > SESSION_PREFIX.len()).then(|| id.to_string())
}

#[derive(Debug, Deserialize)]
struct SessionEntry {
    id: String,
}

/// Session id from the agent's `session list --format json` output.
pub fn parse_session_list_json(output: &str) -> Option<String> {
    let entries: Vec<SessionEntry> = serde_json::from_str(output.trim()).ok()?;
    entries
        .into_iter()
        .map(|entry| entry.id)
        .find(|id| !id.trim().is_empty())
}

fn listing_command() -> Vec<String> {
    vec![
        "sh".to_string(),
        "-c".to_string(),
        format!("ls -t {SESSION_STORAGE_DIR}/{SESSION_PREFIX}*{SESSION_SUFFIX} 2>/dev/null | head -n1"),
    ]
}

fn session_list_command() -> Vec<String> {
    ["opencode", "session", "list", "--format", "json", "-n", "1"]
        .iter()
        .map(|part| part.to_string())
        .collect()
}

/// Newest resumable session in `container`, if any.
pub async fn find_resumable_session(
    runtime: &dyn ContainerRuntime,
    container: &str,
) -> Option<String> {
    match runtime.exec_capture(container, &listing_command()).await {
        Ok(listing) => {
            if let Some(id) = parse_session_listing(&listing) {
                debug!(container, session = %id, "found session state file");
                return Some(id);
            }
        }
        Err(err) => debug!(container, error = %err, "session listing failed"),
    }

    match runtime.exec_capture(container, &session_list_command()).await {
        Ok(output) => {
            let id = parse_session_list_json(&output);
            debug!(container, session = ?id, "queried agent session list");
            id
        }
        Err(err) => {
            debug!(container, error = %err, "agent session list failed");
            None
        }
    }
}
