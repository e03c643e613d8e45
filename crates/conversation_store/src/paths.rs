use std::path::{Path, PathBuf};

pub const STATE_DIR: &str = ".agent_chat";
pub const STATE_FILE: &str = "state.json";

#[must_use]
pub fn state_path_under(root: &Path) -> PathBuf {
    root.join(STATE_DIR).join(STATE_FILE)
}

/// `$HOME/.agent_chat/state.json`, or the same layout under the working
/// directory when no home directory is set.
#[must_use]
pub fn default_state_path() -> PathBuf {
    let root = std::env::var_os("HOME")
        .filter(|home| !home.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));
    state_path_under(&root)
}
