//! Environment overrides applied on top of file/default settings.

use super::Settings;

/// Repository root override consulted by the identity resolver.
pub const REPO_ENV: &str = "CAIGED_REPO";

pub(super) fn apply_env_overrides<FEnv>(settings: &mut Settings, env_lookup: &FEnv)
where
    FEnv: Fn(&str) -> Option<String>,
{
    let non_empty = |name: &str| env_lookup(name).filter(|value| !value.trim().is_empty());

    if let Some(prefix) = non_empty("IMAGE_PREFIX") {
        settings.image_prefix = prefix;
    }
    if let Some(shell) = non_empty("CONTAINER_SHELL") {
        settings.container_shell = shell;
    }
    if let Some(arch) = non_empty("ARCH") {
        settings.build.arch = arch;
    }
    if let Some(version) = non_empty("MISE_VERSION") {
        settings.build.mise_version = version;
    }
    if let Some(version) = non_empty("GH_VERSION") {
        settings.build.gh_version = version;
    }
    if let Some(version) = non_empty("OPENCODE_VERSION") {
        settings.build.opencode_version = version;
    }
}
