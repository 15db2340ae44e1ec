use crate::cmd::{EXIT_BLOCKED, EXIT_OK};
use crate::output::print_json;
use anyhow::Context;
use hookgate_core::bypass::BypassAuditor;
use hookgate_core::check::CheckRegistry;
use hookgate_core::config::{load_config, HookConfig};
use hookgate_core::context::InvocationContext;
use hookgate_core::git::{Git, PushUpdate, Workspace};
use hookgate_core::paths::config_search_paths;
use hookgate_core::report;
use hookgate_core::runner::HookRunner;
use hookgate_core::types::Stage;
use std::io::Read;
use std::path::Path;

// ---------------------------------------------------------------------------
// Git hook entry points
// ---------------------------------------------------------------------------

pub fn pre_commit(root: &Path, bypass: bool, json: bool) -> anyhow::Result<i32> {
    let config = load(root)?;
    let git = Git::new(root);
    let ctx = InvocationContext::for_pre_commit(&git).context("failed to read staged files")?;
    execute(root, &config, &git, ctx, bypass, json)
}

pub fn commit_msg(root: &Path, file: &Path, bypass: bool, json: bool) -> anyhow::Result<i32> {
    let config = load(root)?;
    let git = Git::new(root);
    let ctx = InvocationContext::for_commit_msg(&git, file)
        .with_context(|| format!("failed to read commit message from {}", file.display()))?;
    execute(root, &config, &git, ctx, bypass, json)
}

pub fn pre_push(
    root: &Path,
    remote: &str,
    diff_file: Option<&Path>,
    bypass: bool,
    json: bool,
) -> anyhow::Result<i32> {
    let config = load(root)?;
    let git = Git::new(root);

    let mut input = String::new();
    std::io::stdin()
        .read_to_string(&mut input)
        .context("failed to read ref updates from stdin")?;
    let updates = PushUpdate::parse_all(&input)?;
    let diff = diff_file.map(read_file).transpose()?;

    let ctx = InvocationContext::for_pre_push(&git, remote, &updates, diff)
        .context("failed to collect pushed commits")?;
    execute(root, &config, &git, ctx, bypass, json)
}

// ---------------------------------------------------------------------------
// hookgate run
// ---------------------------------------------------------------------------

/// Run a stage outside git: inputs come from files instead of hook
/// arguments and stdin.
pub fn run(
    root: &Path,
    stage: Stage,
    message_file: Option<&Path>,
    diff_file: Option<&Path>,
    bypass: bool,
    json: bool,
) -> anyhow::Result<i32> {
    let config = load(root)?;
    let git = Git::new(root);

    let mut ctx = match stage {
        Stage::PreCommit => {
            InvocationContext::for_pre_commit(&git).context("failed to read staged files")?
        }
        _ => {
            let files = git.staged_files().unwrap_or_default();
            let branch = git.current_branch().unwrap_or_default();
            InvocationContext::new(stage, root)
                .with_staged_files(files)
                .with_branch(branch)
        }
    };
    if let Some(path) = message_file {
        ctx = ctx.with_commit_message(read_file(path)?);
    }
    if let Some(path) = diff_file {
        ctx = ctx.with_diff_text(read_file(path)?);
    }
    execute(root, &config, &git, ctx, bypass, json)
}

// ---------------------------------------------------------------------------
// Shared pipeline
// ---------------------------------------------------------------------------

fn load(root: &Path) -> anyhow::Result<HookConfig> {
    load_config(&config_search_paths(root)).context("failed to load hook configuration")
}

fn read_file(path: &Path) -> anyhow::Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

fn execute(
    root: &Path,
    config: &HookConfig,
    workspace: &dyn Workspace,
    ctx: InvocationContext,
    bypass: bool,
    json: bool,
) -> anyhow::Result<i32> {
    let stage = ctx.stage;
    tracing::debug!(%stage, source = %config.source, "running stage");

    let registry = CheckRegistry::from_config(config)?;
    let runner = HookRunner::new(&registry, workspace);
    let mut verdict = runner.run(stage, &ctx, config.checks_for(stage));

    let auditor = BypassAuditor::from_env(bypass, config.audit_log_path(root));
    auditor.mark(&mut verdict);
    if auditor.requested() {
        auditor
            .record(stage, &verdict, &mut std::io::stderr())
            .context("failed to write bypass audit record")?;
    }

    if json {
        print_json(&verdict)?;
    } else {
        print!("{}", report::render(&verdict));
    }

    Ok(if verdict.may_proceed() {
        EXIT_OK
    } else {
        EXIT_BLOCKED
    })
}
