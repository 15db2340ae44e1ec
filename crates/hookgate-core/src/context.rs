use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::Result;
use crate::git::{Git, PushUpdate, Workspace};
use crate::types::Stage;

// ---------------------------------------------------------------------------
// InvocationContext
// ---------------------------------------------------------------------------

/// Snapshot of everything a check may look at for one hook invocation.
///
/// Built once by the entry point. The runner never mutates a snapshot; after an
/// auto-fix it derives a new one via [`InvocationContext::with_staged_files`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvocationContext {
    pub stage: Stage,
    pub root: PathBuf,
    pub staged_files: Vec<PathBuf>,
    /// commit-msg: the message being committed. pre-push: messages of the
    /// pushed commits, newest first.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commit_message: Option<String>,
    /// pre-push only: deployment diff supplied up front. When absent the
    /// deployment-safety check runs its configured diff command.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diff_text: Option<String>,
    pub branch: String,
}

impl InvocationContext {
    pub fn new(stage: Stage, root: impl Into<PathBuf>) -> Self {
        Self {
            stage,
            root: root.into(),
            staged_files: Vec::new(),
            commit_message: None,
            diff_text: None,
            branch: String::new(),
        }
    }

    pub fn with_staged_files(self, staged_files: Vec<PathBuf>) -> Self {
        Self {
            staged_files,
            ..self
        }
    }

    pub fn with_commit_message(self, message: impl Into<String>) -> Self {
        Self {
            commit_message: Some(message.into()),
            ..self
        }
    }

    pub fn with_diff_text(self, diff: impl Into<String>) -> Self {
        Self {
            diff_text: Some(diff.into()),
            ..self
        }
    }

    pub fn with_branch(self, branch: impl Into<String>) -> Self {
        Self {
            branch: branch.into(),
            ..self
        }
    }

    // -----------------------------------------------------------------------
    // Construction from git
    // -----------------------------------------------------------------------

    pub fn for_pre_commit(git: &Git) -> Result<Self> {
        let files = git.staged_files()?;
        Ok(Self::new(Stage::PreCommit, git.root())
            .with_staged_files(files)
            .with_branch(branch_or_empty(git)))
    }

    pub fn for_commit_msg(git: &Git, message_path: &Path) -> Result<Self> {
        let message = std::fs::read_to_string(message_path)?;
        // The index may be unavailable (e.g. `git commit --amend` in odd
        // states); the message is what this stage is about.
        let files = git.staged_files().unwrap_or_else(|e| {
            debug!("staged files unavailable: {e}");
            Vec::new()
        });
        Ok(Self::new(Stage::CommitMsg, git.root())
            .with_staged_files(files)
            .with_commit_message(message)
            .with_branch(branch_or_empty(git)))
    }

    pub fn for_pre_push(
        git: &Git,
        remote: &str,
        updates: &[PushUpdate],
        diff_text: Option<String>,
    ) -> Result<Self> {
        let mut files: Vec<PathBuf> = Vec::new();
        let mut messages: Vec<String> = Vec::new();
        for update in updates {
            let Some(revs) = update.revs(remote) else {
                debug!("skipping deletion of {}", update.remote_ref);
                continue;
            };
            for file in git.changed_files(&revs)? {
                if !files.contains(&file) {
                    files.push(file);
                }
            }
            let text = git.commit_messages(&revs)?;
            if !text.trim().is_empty() {
                messages.push(text.trim().to_string());
            }
        }

        let branch = updates
            .iter()
            .find(|u| !u.is_delete())
            .map(|u| u.branch().to_string())
            .unwrap_or_else(|| branch_or_empty(git));

        let mut ctx = Self::new(Stage::PrePush, git.root())
            .with_staged_files(files)
            .with_commit_message(messages.join("\n\n"))
            .with_branch(branch);
        if let Some(diff) = diff_text {
            ctx = ctx.with_diff_text(diff);
        }
        Ok(ctx)
    }
}

fn branch_or_empty(git: &Git) -> String {
    git.current_branch().unwrap_or_else(|e| {
        debug!("branch unavailable: {e}");
        String::new()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn builders_produce_new_snapshots() {
        let base = InvocationContext::new(Stage::PreCommit, "/repo").with_branch("main");
        let fixed = base
            .clone()
            .with_staged_files(vec![PathBuf::from("src/a.ts")]);
        assert!(base.staged_files.is_empty());
        assert_eq!(fixed.staged_files, vec![PathBuf::from("src/a.ts")]);
        assert_eq!(fixed.branch, "main");
    }

    #[test]
    fn commit_msg_reads_message_file_outside_git() {
        let dir = TempDir::new().unwrap();
        let msg = dir.path().join("COMMIT_EDITMSG");
        std::fs::write(&msg, "feat(api): add endpoint\n").unwrap();
        let ctx = InvocationContext::for_commit_msg(&Git::new(dir.path()), &msg).unwrap();
        assert_eq!(ctx.stage, Stage::CommitMsg);
        assert_eq!(
            ctx.commit_message.as_deref(),
            Some("feat(api): add endpoint\n")
        );
    }

    #[test]
    fn commit_msg_missing_file_is_error() {
        let dir = TempDir::new().unwrap();
        let result =
            InvocationContext::for_commit_msg(&Git::new(dir.path()), &dir.path().join("nope"));
        assert!(result.is_err());
    }

    #[test]
    fn pre_push_without_updates_keeps_supplied_diff() {
        let dir = TempDir::new().unwrap();
        let ctx = InvocationContext::for_pre_push(
            &Git::new(dir.path()),
            "origin",
            &[],
            Some("[+] AWS::S3::Bucket Logs".to_string()),
        )
        .unwrap();
        assert_eq!(ctx.stage, Stage::PrePush);
        assert_eq!(ctx.diff_text.as_deref(), Some("[+] AWS::S3::Bucket Logs"));
        assert_eq!(ctx.commit_message.as_deref(), Some(""));
    }
}
