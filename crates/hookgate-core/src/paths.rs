use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const HOOKGATE_DIR: &str = ".hookgate";

/// Project-local overrides. Never committed to the shared copy.
pub const LOCAL_CONFIG_FILE: &str = ".hookgate/hooks.local.yaml";

/// Shared configuration, typically vendored or committed for the whole team.
pub const SHARED_CONFIG_FILE: &str = ".hookgate/hooks.yaml";

/// Marker written into installed hook shims.
pub const HOOK_MARKER: &str = "# installed by hookgate";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn hookgate_dir(root: &Path) -> PathBuf {
    root.join(HOOKGATE_DIR)
}

pub fn local_config_path(root: &Path) -> PathBuf {
    root.join(LOCAL_CONFIG_FILE)
}

pub fn shared_config_path(root: &Path) -> PathBuf {
    root.join(SHARED_CONFIG_FILE)
}

/// Configuration lookup locations in priority order: the first existing file
/// wins.
pub fn config_search_paths(root: &Path) -> Vec<PathBuf> {
    vec![local_config_path(root), shared_config_path(root)]
}
