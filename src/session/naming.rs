//! Project naming and slug helpers.
//!
//! Every container, image-independent name and multiplexer session is derived
//! from these pure functions, so they must be total over arbitrary input.

use std::path::{Component, Path};

/// Name used when a path or project yields nothing usable.
pub const FALLBACK_NAME: &str = "workspace";

/// Normalize a project name into a filesystem and shell-safe slug.
///
/// Output matches `^[a-z0-9]([a-z0-9._-]*[a-z0-9])?$` or equals
/// [`FALLBACK_NAME`].
pub fn slugify(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars().flat_map(char::to_lowercase) {
        if ch.is_ascii_lowercase() || ch.is_ascii_digit() || matches!(ch, '-' | '_' | '.') {
            out.push(ch);
        } else {
            // Spaces included.
            out.push('-');
        }
    }
    let trimmed = out.trim_matches(|ch: char| !(ch.is_ascii_lowercase() || ch.is_ascii_digit()));
    if trimmed.is_empty() {
        FALLBACK_NAME.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Derive a project name from the last two non-empty path segments.
///
/// `/a/b` ⇒ `a-b`, `project` ⇒ `project`, `/` ⇒ [`FALLBACK_NAME`].
pub fn derive_project_name(path: &Path) -> String {
    let segments: Vec<String> = path
        .components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .filter(|part| !part.is_empty())
        .collect();
    match segments.as_slice() {
        [] => FALLBACK_NAME.to_string(),
        [only] => only.clone(),
        [.., parent, last] => format!("{parent}-{last}"),
    }
}

/// Full project identity, qualified by the spin so sessions never collide
/// across profiles for the same directory.
pub fn qualified_project(spin: &str, project: &str) -> String {
    format!("{spin}-{project}")
}

/// Container (and multiplexer session) name for a project slug.
pub fn container_name(image_prefix: &str, slug: &str) -> String {
    format!("{image_prefix}-{slug}")
}

/// Multiplexer session name for a container.
///
/// tmux rewrites `.` and `:` in new session names because they delimit
/// window and pane targets. Mapping them up front keeps `=name` lookups exact.
pub fn multiplexer_session_name(container: &str) -> String {
    container
        .chars()
        .map(|ch| if matches!(ch, '.' | ':') { '_' } else { ch })
        .collect()
}
