//! Format / lint / type-check and any other configured external tool.

use std::path::PathBuf;

use tracing::debug;

use super::{Check, Finding};
use crate::config::CheckDefinition;
use crate::context::InvocationContext;
use crate::error::{HookError, Result};
use crate::process::{run_shell, shell_quote};

/// Placeholder replaced by the (filtered, quoted) staged files.
pub const FILES_PLACEHOLDER: &str = "{files}";

/// Runs `def.command` and maps its exit code to Pass/Fail; `fix` runs
/// `def.fix_command`.
pub struct ExternalCommandCheck;

impl ExternalCommandCheck {
    /// Expand `{files}` in `template`. `None` when the placeholder is present
    /// but no staged file matches `def.include`.
    pub fn render(template: &str, def: &CheckDefinition, ctx: &InvocationContext) -> Option<String> {
        if !template.contains(FILES_PLACEHOLDER) {
            return Some(template.to_string());
        }
        let files: Vec<String> = selected_files(def, ctx)
            .iter()
            .filter_map(|f| f.to_str())
            .map(shell_quote)
            .collect();
        if files.is_empty() {
            return None;
        }
        Some(template.replace(FILES_PLACEHOLDER, &files.join(" ")))
    }
}

fn selected_files<'a>(def: &CheckDefinition, ctx: &'a InvocationContext) -> Vec<&'a PathBuf> {
    ctx.staged_files
        .iter()
        .filter(|f| match &def.include {
            Some(re) => f.to_str().is_some_and(|s| re.is_match(s)),
            None => true,
        })
        .collect()
}

fn env(ctx: &InvocationContext) -> [(&'static str, &str); 2] {
    [
        ("HOOKGATE_STAGE", ctx.stage.as_str()),
        ("HOOKGATE_BRANCH", ctx.branch.as_str()),
    ]
}

impl Check for ExternalCommandCheck {
    fn execute(&self, def: &CheckDefinition, ctx: &InvocationContext) -> Result<Finding> {
        let Some(template) = def.command.as_deref() else {
            return Ok(Finding::Fail(format!(
                "check '{}' has no command configured",
                def.name
            )));
        };
        let Some(command) = Self::render(template, def, ctx) else {
            return Ok(Finding::Skip("no staged files to check".to_string()));
        };

        debug!(check = %def.name, %command, "running external check");
        let output = match run_shell(&command, &ctx.root, &env(ctx), def.timeout()) {
            Ok(output) => output,
            Err(e @ (HookError::ToolSpawn { .. } | HookError::ToolTimeout { .. })) => {
                return Ok(Finding::Fail(e.to_string()));
            }
            Err(e) => return Err(e),
        };

        let text = output.combined();
        if output.success() {
            let message = if text.is_empty() {
                "passed".to_string()
            } else {
                text
            };
            return Ok(Finding::Pass(message));
        }

        let mut message = format!("`{command}` failed with {}", output.describe_exit());
        if !text.is_empty() {
            message.push('\n');
            message.push_str(&text);
        }
        Ok(Finding::Fail(message))
    }

    fn fix(&self, def: &CheckDefinition, ctx: &InvocationContext) -> Result<()> {
        let Some(template) = def.fix_command.as_deref() else {
            return Err(HookError::NoFixRoutine(def.name.clone()));
        };
        let Some(command) = Self::render(template, def, ctx) else {
            return Ok(());
        };

        debug!(check = %def.name, %command, "running fix command");
        let output = run_shell(&command, &ctx.root, &env(ctx), def.timeout())?;
        if !output.success() {
            return Err(HookError::ToolFailed {
                command,
                status: output.describe_exit(),
                output: output.combined(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Stage;
    use regex::Regex;
    use tempfile::TempDir;

    fn ctx(root: &std::path::Path, files: &[&str]) -> InvocationContext {
        InvocationContext::new(Stage::PreCommit, root)
            .with_staged_files(files.iter().map(PathBuf::from).collect())
            .with_branch("main")
    }

    #[test]
    fn zero_exit_passes() {
        let def = CheckDefinition::new("type-check").with_command("true");
        let finding = ExternalCommandCheck
            .execute(&def, &ctx(std::path::Path::new("/tmp"), &[]))
            .unwrap();
        assert_eq!(finding, Finding::Pass("passed".to_string()));
    }

    #[test]
    fn nonzero_exit_fails_with_output() {
        let def = CheckDefinition::new("lint").with_command("echo 'src/a.ts: bad' >&2; exit 2");
        let finding = ExternalCommandCheck
            .execute(&def, &ctx(std::path::Path::new("/tmp"), &[]))
            .unwrap();
        let Finding::Fail(message) = finding else {
            panic!("expected failure");
        };
        assert!(message.contains("exit code 2"));
        assert!(message.contains("src/a.ts: bad"));
    }

    #[test]
    fn timeout_is_a_failure() {
        let mut def = CheckDefinition::new("slow").with_command("sleep 5");
        def.timeout_seconds = 1;
        let finding = ExternalCommandCheck
            .execute(&def, &ctx(std::path::Path::new("/tmp"), &[]))
            .unwrap();
        let Finding::Fail(message) = finding else {
            panic!("expected failure");
        };
        assert!(message.contains("timed out after 1s"));
    }

    #[test]
    fn spawn_failure_names_os_error() {
        let def = CheckDefinition::new("lint").with_command("true");
        let finding = ExternalCommandCheck
            .execute(&def, &ctx(std::path::Path::new("/nonexistent/hookgate"), &[]))
            .unwrap();
        let Finding::Fail(message) = finding else {
            panic!("expected failure");
        };
        assert!(message.contains("failed to spawn `true`"));
    }

    #[test]
    fn files_placeholder_is_filtered_and_quoted() {
        let mut def = CheckDefinition::new("format").with_command("prettier --check {files}");
        def.include = Some(Regex::new(r"\.ts$").unwrap());
        let c = ctx(
            std::path::Path::new("/tmp"),
            &["src/a.ts", "README.md", "src/my file.ts"],
        );
        let rendered = ExternalCommandCheck::render("prettier --check {files}", &def, &c).unwrap();
        assert_eq!(rendered, "prettier --check src/a.ts 'src/my file.ts'");
    }

    #[test]
    fn no_matching_files_skips() {
        let mut def = CheckDefinition::new("format").with_command("false {files}");
        def.include = Some(Regex::new(r"\.ts$").unwrap());
        let finding = ExternalCommandCheck
            .execute(&def, &ctx(std::path::Path::new("/tmp"), &["README.md"]))
            .unwrap();
        assert!(matches!(finding, Finding::Skip(_)));
    }

    #[test]
    fn stage_is_exported_to_the_tool() {
        let def = CheckDefinition::new("env").with_command("echo $HOOKGATE_STAGE@$HOOKGATE_BRANCH");
        let finding = ExternalCommandCheck
            .execute(&def, &ctx(std::path::Path::new("/tmp"), &[]))
            .unwrap();
        assert_eq!(finding, Finding::Pass("pre-commit@main".to_string()));
    }

    #[test]
    fn fix_runs_fix_command_in_root() {
        let dir = TempDir::new().unwrap();
        let def = CheckDefinition::new("format")
            .with_command("grep -q fixed file.txt")
            .with_fix_command("echo fixed > file.txt")
            .auto_fixable();
        let c = ctx(dir.path(), &["file.txt"]);
        assert!(ExternalCommandCheck.execute(&def, &c).unwrap().is_fail());
        ExternalCommandCheck.fix(&def, &c).unwrap();
        assert!(matches!(
            ExternalCommandCheck.execute(&def, &c).unwrap(),
            Finding::Pass(_)
        ));
    }

    #[test]
    fn failing_fix_is_an_error() {
        let def = CheckDefinition::new("format")
            .with_command("false")
            .with_fix_command("echo nope; exit 4");
        let err = ExternalCommandCheck
            .fix(&def, &ctx(std::path::Path::new("/tmp"), &[]))
            .unwrap_err();
        assert!(err.to_string().contains("exit code 4"));
        assert!(err.to_string().contains("nope"));
    }
}
