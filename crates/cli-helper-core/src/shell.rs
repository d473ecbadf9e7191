//! Detection of the user's login shell.

use std::path::Path;

pub const UNKNOWN_SHELL: &str = "unknown";

pub const SUPPORTED_SHELLS: [&str; 3] = ["bash", "zsh", "fish"];

/// Basename of `$SHELL`, or `"unknown"` when it is unset or empty.
pub fn detect_shell() -> String {
    shell_name(std::env::var("SHELL").ok().as_deref())
}

pub fn is_supported_shell(shell: &str) -> bool {
    SUPPORTED_SHELLS.contains(&shell)
}

fn shell_name(path: Option<&str>) -> String {
    path.filter(|p| !p.trim().is_empty())
        .and_then(|p| Path::new(p).file_name())
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| UNKNOWN_SHELL.to_string())
}
