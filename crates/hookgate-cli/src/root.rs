use hookgate_core::paths::HOOKGATE_DIR;
use std::path::{Path, PathBuf};

/// Resolve the repository root.
///
/// Priority:
/// 1. `--root` flag / `HOOKGATE_ROOT` env var (passed in as `explicit`)
/// 2. Walk upward from `cwd` looking for `.hookgate/`
/// 3. Walk upward from `cwd` looking for `.git` (a directory, or a file in
///    worktrees and submodules)
/// 4. Fall back to `cwd`
pub fn resolve_root(explicit: Option<&Path>) -> PathBuf {
    if let Some(p) = explicit {
        return p.to_path_buf();
    }
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    find_root_from(&cwd)
}

fn find_root_from(start: &Path) -> PathBuf {
    if let Some(dir) = walk_up(start, |d| d.join(HOOKGATE_DIR).is_dir()) {
        return dir;
    }
    if let Some(dir) = walk_up(start, |d| d.join(".git").exists()) {
        return dir;
    }
    start.to_path_buf()
}

fn walk_up(start: &Path, found: impl Fn(&Path) -> bool) -> Option<PathBuf> {
    start.ancestors().find(|d| found(d)).map(Path::to_path_buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn explicit_root_wins() {
        let dir = TempDir::new().unwrap();
        let result = resolve_root(Some(dir.path()));
        assert_eq!(result, dir.path());
    }

    #[test]
    fn finds_hookgate_dir_above_git() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join(".hookgate")).unwrap();
        let nested = dir.path().join("packages/web");
        std::fs::create_dir_all(nested.join(".git")).unwrap();
        let deep = nested.join("src/deep");
        std::fs::create_dir_all(&deep).unwrap();

        assert_eq!(find_root_from(&deep), dir.path());
    }

    #[test]
    fn falls_back_to_git_then_start() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(".git"), "gitdir: ../main/.git/worktrees/x\n").unwrap();
        let deep = dir.path().join("src");
        std::fs::create_dir_all(&deep).unwrap();
        assert_eq!(find_root_from(&deep), dir.path());
    }
}
