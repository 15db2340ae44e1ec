use crate::cmd::EXIT_OK;
use crate::output::{print_json, print_table};
use anyhow::Context;
use clap::Subcommand;
use hookgate_core::config::{load_config, HookConfig, WarnLevel};
use hookgate_core::paths::config_search_paths;
use hookgate_core::types::Stage;
use std::path::Path;

// ---------------------------------------------------------------------------
// Subcommand types
// ---------------------------------------------------------------------------

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Show the resolved configuration and each stage's checks
    Show,

    /// Validate the config for common mistakes
    Validate,
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub fn run(root: &Path, subcmd: ConfigSubcommand, json: bool) -> anyhow::Result<i32> {
    let config = load_config(&config_search_paths(root)).context("failed to load config")?;
    match subcmd {
        ConfigSubcommand::Show => show(&config, json),
        ConfigSubcommand::Validate => validate(&config, json),
    }
}

// ---------------------------------------------------------------------------
// show
// ---------------------------------------------------------------------------

fn show(config: &HookConfig, json: bool) -> anyhow::Result<i32> {
    if json {
        print_json(config)?;
        return Ok(EXIT_OK);
    }

    println!("source:  {}", config.source);
    println!("timeout: {}s", config.timeout_seconds);
    if let Some(log) = &config.audit_log {
        println!("audit:   {}", log.display());
    }
    println!();

    let mut rows = Vec::new();
    for &stage in Stage::all() {
        for def in config.checks_for(stage) {
            let mode = if def.blocking { "blocking" } else { "advisory" };
            let fix = if def.auto_fixable { "yes" } else { "-" };
            let command = def.command.clone().unwrap_or_else(|| "(built-in)".to_string());
            rows.push(vec![
                stage.to_string(),
                def.name.clone(),
                mode.to_string(),
                fix.to_string(),
                command,
            ]);
        }
    }
    if rows.is_empty() {
        println!("No checks configured.");
    } else {
        print_table(&["STAGE", "CHECK", "MODE", "AUTO-FIX", "COMMAND"], rows);
    }
    Ok(EXIT_OK)
}

// ---------------------------------------------------------------------------
// validate
// ---------------------------------------------------------------------------

fn validate(config: &HookConfig, json: bool) -> anyhow::Result<i32> {
    let warnings = config.validate();

    if json {
        let value = serde_json::json!({
            "source": config.source,
            "warnings": warnings,
        });
        print_json(&value)?;
    } else if warnings.is_empty() {
        println!("Config is valid ({}). No warnings.", config.source);
    } else {
        for w in &warnings {
            let prefix = match w.level {
                WarnLevel::Warning => "warning",
                WarnLevel::Error => "error",
            };
            println!("[{prefix}] {}", w.message);
        }
    }

    let has_errors = warnings.iter().any(|w| w.level == WarnLevel::Error);
    if has_errors {
        anyhow::bail!("config validation found errors");
    }

    Ok(EXIT_OK)
}
