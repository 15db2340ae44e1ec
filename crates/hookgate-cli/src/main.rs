mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::config::ConfigSubcommand;
use hookgate_core::types::Stage;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "hookgate",
    about = "Ordered, auditable policy checks for git hooks",
    version,
    propagate_version = true
)]
struct Cli {
    /// Repository root (default: auto-detect from .hookgate/ or .git/)
    #[arg(long, global = true, env = "HOOKGATE_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    /// Let the git operation proceed even if a blocking check fails (audited).
    /// HOOKGATE_BYPASS=1 has the same effect.
    #[arg(long = "no-verify", visible_alias = "bypass", global = true)]
    no_verify: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the pre-commit pipeline against the staged files
    PreCommit,

    /// Run the commit-msg pipeline against a message file
    CommitMsg {
        /// Path git passes to the hook (usually .git/COMMIT_EDITMSG)
        file: PathBuf,
    },

    /// Run the pre-push pipeline; reads ref updates from stdin
    PrePush {
        /// Name of the remote being pushed to
        remote: String,

        /// URL of the remote
        url: Option<String>,

        /// Deployment diff to evaluate instead of running the diff command
        #[arg(long)]
        diff_file: Option<PathBuf>,
    },

    /// Run a stage manually, outside of a git hook
    Run {
        /// pre-commit, commit-msg, or pre-push
        stage: Stage,

        /// Commit message(s) to validate
        #[arg(long)]
        message_file: Option<PathBuf>,

        /// Deployment diff to evaluate
        #[arg(long)]
        diff_file: Option<PathBuf>,
    },

    /// Install hook shims into the repository's hooks directory
    Install {
        /// Overwrite hooks not installed by hookgate
        #[arg(long)]
        force: bool,
    },

    /// Inspect and validate the hook configuration
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let root = root::resolve_root(cli.root.as_deref());

    let result = match cli.command {
        Commands::PreCommit => cmd::hook::pre_commit(&root, cli.no_verify, cli.json),
        Commands::CommitMsg { file } => {
            cmd::hook::commit_msg(&root, &file, cli.no_verify, cli.json)
        }
        Commands::PrePush {
            remote,
            url: _,
            diff_file,
        } => cmd::hook::pre_push(
            &root,
            &remote,
            diff_file.as_deref(),
            cli.no_verify,
            cli.json,
        ),
        Commands::Run {
            stage,
            message_file,
            diff_file,
        } => cmd::hook::run(
            &root,
            stage,
            message_file.as_deref(),
            diff_file.as_deref(),
            cli.no_verify,
            cli.json,
        ),
        Commands::Install { force } => cmd::install::run(&root, force, cli.json),
        Commands::Config { subcommand } => cmd::config::run(&root, subcommand, cli.json),
    };

    let code = match result {
        Ok(code) => code,
        Err(e) => {
            // Print the full error chain (anyhow's alternate Display)
            eprintln!("error: {e:#}");
            cmd::EXIT_ERROR
        }
    };
    std::process::exit(code);
}
