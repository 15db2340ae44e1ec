//! Thin wrapper over the `git` binary plus the [`Workspace`] seam the runner
//! uses to re-stage auto-fixed files.

use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::{HookError, Result};

// ---------------------------------------------------------------------------
// Workspace
// ---------------------------------------------------------------------------

/// The mutable working tree and index, as seen by the runner.
pub trait Workspace {
    /// Files currently staged for commit, in index order.
    fn staged_files(&self) -> Result<Vec<PathBuf>>;

    /// Re-add `files` to the index after a fix routine rewrote them.
    fn restage(&self, files: &[PathBuf]) -> Result<()>;
}

// ---------------------------------------------------------------------------
// Git
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Git {
    root: PathBuf,
}

impl Git {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn run(&self, args: &[&str]) -> Result<String> {
        let output = Command::new("git")
            .args(args)
            .current_dir(&self.root)
            .output()
            .map_err(|e| HookError::Git {
                command: args.join(" "),
                message: e.to_string(),
            })?;
        if !output.status.success() {
            return Err(HookError::Git {
                command: args.join(" "),
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Current branch name; `detached@<sha>` on a detached HEAD.
    pub fn current_branch(&self) -> Result<String> {
        if let Ok(name) = self.run(&["symbolic-ref", "--short", "-q", "HEAD"]) {
            return Ok(name.trim().to_string());
        }
        let sha = self.run(&["rev-parse", "--short", "HEAD"])?;
        Ok(format!("detached@{}", sha.trim()))
    }

    /// Files changed by the commits selected by `revs` (rev-list syntax),
    /// first occurrence order.
    pub fn changed_files(&self, revs: &[String]) -> Result<Vec<PathBuf>> {
        let mut args = vec!["log", "--format=", "--name-only", "--no-renames"];
        args.extend(revs.iter().map(String::as_str));
        let out = self.run(&args)?;
        let mut files: Vec<PathBuf> = Vec::new();
        for line in out.lines().map(str::trim).filter(|l| !l.is_empty()) {
            let path = PathBuf::from(line);
            if !files.contains(&path) {
                files.push(path);
            }
        }
        Ok(files)
    }

    /// Full messages of the commits selected by `revs`, newest first.
    pub fn commit_messages(&self, revs: &[String]) -> Result<String> {
        let mut args = vec!["log", "--format=%B"];
        args.extend(revs.iter().map(String::as_str));
        self.run(&args)
    }

    /// Absolute path of the hooks directory (honours `core.hooksPath`).
    pub fn hooks_dir(&self) -> Result<PathBuf> {
        let out = self.run(&["rev-parse", "--git-path", "hooks"])?;
        let dir = PathBuf::from(out.trim());
        Ok(if dir.is_absolute() {
            dir
        } else {
            self.root.join(dir)
        })
    }
}

impl Workspace for Git {
    fn staged_files(&self) -> Result<Vec<PathBuf>> {
        let out = self.run(&["diff", "--cached", "--name-only", "-z", "--diff-filter=ACMR"])?;
        Ok(out
            .split('\0')
            .filter(|s| !s.is_empty())
            .map(PathBuf::from)
            .collect())
    }

    fn restage(&self, files: &[PathBuf]) -> Result<()> {
        let existing: Vec<&str> = files
            .iter()
            .filter(|f| self.root.join(f).exists())
            .filter_map(|f| f.to_str())
            .collect();
        if existing.is_empty() {
            return Ok(());
        }
        let mut args = vec!["add", "--"];
        args.extend(existing);
        self.run(&args)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// PushUpdate
// ---------------------------------------------------------------------------

/// One line of pre-push stdin: `<local-ref> <local-sha> <remote-ref> <remote-sha>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushUpdate {
    pub local_ref: String,
    pub local_sha: String,
    pub remote_ref: String,
    pub remote_sha: String,
}

fn is_zero_sha(sha: &str) -> bool {
    !sha.is_empty() && sha.chars().all(|c| c == '0')
}

impl PushUpdate {
    pub fn parse(line: &str) -> Result<Self> {
        let fields: Vec<&str> = line.split_whitespace().collect();
        match fields.as_slice() {
            [local_ref, local_sha, remote_ref, remote_sha] => Ok(Self {
                local_ref: local_ref.to_string(),
                local_sha: local_sha.to_string(),
                remote_ref: remote_ref.to_string(),
                remote_sha: remote_sha.to_string(),
            }),
            _ => Err(HookError::InvalidPushLine(line.to_string())),
        }
    }

    /// Parse every non-blank line of pre-push stdin.
    pub fn parse_all(input: &str) -> Result<Vec<Self>> {
        input
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(Self::parse)
            .collect()
    }

    pub fn is_delete(&self) -> bool {
        is_zero_sha(&self.local_sha)
    }

    pub fn is_new_branch(&self) -> bool {
        is_zero_sha(&self.remote_sha)
    }

    /// Branch name of the local ref (`refs/heads/main` → `main`).
    pub fn branch(&self) -> &str {
        self.local_ref
            .strip_prefix("refs/heads/")
            .unwrap_or(&self.local_ref)
    }

    /// Rev-list arguments selecting the commits this update pushes. `None`
    /// for a branch deletion, which pushes nothing.
    pub fn revs(&self, remote: &str) -> Option<Vec<String>> {
        if self.is_delete() {
            return None;
        }
        if self.is_new_branch() {
            return Some(vec![
                self.local_sha.clone(),
                "--not".to_string(),
                format!("--remotes={remote}"),
            ]);
        }
        Some(vec![format!("{}..{}", self.remote_sha, self.local_sha)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ZERO: &str = "0000000000000000000000000000000000000000";

    #[test]
    fn parse_update_line() {
        let u = PushUpdate::parse("refs/heads/main abc123 refs/heads/main def456").unwrap();
        assert_eq!(u.branch(), "main");
        assert_eq!(u.revs("origin").unwrap(), vec!["def456..abc123".to_string()]);
        assert!(!u.is_delete());
        assert!(!u.is_new_branch());
    }

    #[test]
    fn new_branch_excludes_remote_history() {
        let line = format!("refs/heads/feat abc123 refs/heads/feat {ZERO}");
        let u = PushUpdate::parse(&line).unwrap();
        assert!(u.is_new_branch());
        assert_eq!(
            u.revs("origin").unwrap(),
            vec!["abc123", "--not", "--remotes=origin"]
        );
    }

    #[test]
    fn delete_pushes_nothing() {
        let line = format!("(delete) {ZERO} refs/heads/old def456");
        let u = PushUpdate::parse(&line).unwrap();
        assert!(u.is_delete());
        assert!(u.revs("origin").is_none());
    }

    #[test]
    fn malformed_line_is_rejected() {
        let err = PushUpdate::parse("refs/heads/main abc123").unwrap_err();
        assert!(err.to_string().contains("refs/heads/main abc123"));
    }

    #[test]
    fn parse_all_skips_blank_lines() {
        let input = "refs/heads/a 1 refs/heads/a 2\n\nrefs/heads/b 3 refs/heads/b 4\n";
        let updates = PushUpdate::parse_all(input).unwrap();
        assert_eq!(updates.len(), 2);
        assert_eq!(updates[1].branch(), "b");
    }

    #[test]
    fn git_outside_repository_errors() {
        let dir = tempfile::TempDir::new().unwrap();
        let git = Git::new(dir.path());
        let err = git.staged_files().unwrap_err();
        assert!(matches!(err, HookError::Git { .. }));
    }
}
