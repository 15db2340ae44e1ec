use crate::cmd::EXIT_OK;
use crate::output::print_json;
use anyhow::Context;
use hookgate_core::git::Git;
use hookgate_core::io;
use hookgate_core::paths::HOOK_MARKER;
use hookgate_core::types::Stage;
use serde::Serialize;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum Action {
    Created,
    Updated,
    Replaced,
    Skipped,
}

impl Action {
    fn label(self) -> &'static str {
        match self {
            Action::Created => "created:",
            Action::Updated => "updated:",
            Action::Replaced => "replaced:",
            Action::Skipped => "skipped:",
        }
    }
}

#[derive(Serialize)]
struct Installed {
    hook: Stage,
    path: String,
    action: Action,
}

/// Shell shim for one hook. Git's arguments and stdin pass straight through.
fn shim(stage: Stage) -> String {
    format!("#!/bin/sh\n{HOOK_MARKER}\nexec hookgate {stage} \"$@\"\n")
}

pub fn run(root: &Path, force: bool, json: bool) -> anyhow::Result<i32> {
    let hooks_dir = Git::new(root)
        .hooks_dir()
        .context("not a git repository (or git is unavailable)")?;

    let mut results = Vec::new();
    for &stage in Stage::all() {
        let path = hooks_dir.join(stage.as_str());
        let action = match std::fs::read_to_string(&path) {
            Ok(existing) if existing.contains(HOOK_MARKER) => Action::Updated,
            Ok(_) if !force => Action::Skipped,
            Ok(_) => Action::Replaced,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Action::Created,
            Err(e) => {
                return Err(e).with_context(|| format!("failed to read {}", path.display()));
            }
        };
        if action != Action::Skipped {
            io::write_executable(&path, shim(stage).as_bytes())
                .with_context(|| format!("failed to write {}", path.display()))?;
        }
        results.push(Installed {
            hook: stage,
            path: path.display().to_string(),
            action,
        });
    }

    if json {
        print_json(&results)?;
        return Ok(EXIT_OK);
    }

    println!("Installing hooks into: {}", hooks_dir.display());
    for r in &results {
        println!("  {:<9} {}", r.action.label(), r.hook);
    }
    if results.iter().any(|r| r.action == Action::Skipped) {
        println!("\nExisting hooks were left untouched. Re-run with --force to replace them.");
    }
    Ok(EXIT_OK)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shim_is_marked_and_forwards_arguments() {
        let text = shim(Stage::PrePush);
        assert!(text.starts_with("#!/bin/sh\n"));
        assert!(text.contains(HOOK_MARKER));
        assert!(text.ends_with("exec hookgate pre-push \"$@\"\n"));
    }
}
