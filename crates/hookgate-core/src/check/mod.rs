//! Pluggable checks and the name-keyed table that selects them.

pub mod commit_format;
pub mod deployment;
pub mod external;

use std::collections::HashMap;

use crate::config::{CheckDefinition, HookConfig};
use crate::context::InvocationContext;
use crate::error::{HookError, Result};
use crate::types::Stage;

pub use commit_format::CommitFormatCheck;
pub use deployment::DeploymentSafetyCheck;
pub use external::ExternalCommandCheck;

// ---------------------------------------------------------------------------
// Finding
// ---------------------------------------------------------------------------

/// What a check concluded about its input. The runner turns this into a
/// `CheckOutcome` once blocking and auto-fix are taken into account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Finding {
    Pass(String),
    Fail(String),
    Warn(String),
    /// Nothing to check (e.g. no staged file matched).
    Skip(String),
}

impl Finding {
    pub fn is_fail(&self) -> bool {
        matches!(self, Finding::Fail(_))
    }

    pub fn message(&self) -> &str {
        match self {
            Finding::Pass(m) | Finding::Fail(m) | Finding::Warn(m) | Finding::Skip(m) => m,
        }
    }
}

// ---------------------------------------------------------------------------
// Check
// ---------------------------------------------------------------------------

pub trait Check {
    fn execute(&self, def: &CheckDefinition, ctx: &InvocationContext) -> Result<Finding>;

    /// Mutate the working tree to resolve a previous failure.
    fn fix(&self, def: &CheckDefinition, _ctx: &InvocationContext) -> Result<()> {
        Err(HookError::NoFixRoutine(def.name.clone()))
    }
}

// ---------------------------------------------------------------------------
// Built-in table
// ---------------------------------------------------------------------------

type Factory = fn(&HookConfig) -> Result<Box<dyn Check>>;

struct Builtin {
    name: &'static str,
    stages: &'static [Stage],
    build: Factory,
}

const BUILTINS: &[Builtin] = &[
    Builtin {
        name: "commit-format",
        stages: &[Stage::CommitMsg],
        build: build_commit_format,
    },
    Builtin {
        name: "deployment-safety",
        stages: &[Stage::PrePush],
        build: build_deployment_safety,
    },
];

fn build_commit_format(config: &HookConfig) -> Result<Box<dyn Check>> {
    Ok(Box::new(CommitFormatCheck::new(&config.commit_format)))
}

fn build_deployment_safety(config: &HookConfig) -> Result<Box<dyn Check>> {
    Ok(Box::new(DeploymentSafetyCheck::new(&config.deployment_safety)?))
}

/// Stages a built-in check is restricted to. `None` for external checks,
/// which run wherever they are configured.
pub fn native_stages(name: &str) -> Option<&'static [Stage]> {
    BUILTINS.iter().find(|b| b.name == name).map(|b| b.stages)
}

// ---------------------------------------------------------------------------
// CheckRegistry
// ---------------------------------------------------------------------------

/// Maps check names to implementations. Names without an entry run as
/// external commands.
pub struct CheckRegistry {
    checks: HashMap<String, Box<dyn Check>>,
    fallback: Box<dyn Check>,
}

impl CheckRegistry {
    pub fn empty() -> Self {
        Self {
            checks: HashMap::new(),
            fallback: Box::new(ExternalCommandCheck),
        }
    }

    pub fn from_config(config: &HookConfig) -> Result<Self> {
        let mut registry = Self::empty();
        for builtin in BUILTINS {
            registry.register(builtin.name, (builtin.build)(config)?);
        }
        Ok(registry)
    }

    pub fn register(&mut self, name: impl Into<String>, check: Box<dyn Check>) {
        self.checks.insert(name.into(), check);
    }

    pub fn resolve(&self, def: &CheckDefinition) -> &dyn Check {
        self.checks
            .get(&def.name)
            .map(|c| c.as_ref())
            .unwrap_or(self.fallback.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigFile, ConfigSource};

    #[test]
    fn builtins_are_stage_restricted() {
        assert_eq!(native_stages("commit-format"), Some(&[Stage::CommitMsg][..]));
        assert_eq!(native_stages("deployment-safety"), Some(&[Stage::PrePush][..]));
        assert_eq!(native_stages("lint"), None);
    }

    #[test]
    fn unknown_names_resolve_to_external_commands() {
        let config = HookConfig::from_file(ConfigFile::default(), ConfigSource::BuiltIn).unwrap();
        let registry = CheckRegistry::from_config(&config).unwrap();
        let def = CheckDefinition::new("echo").with_command("echo hi");
        let ctx = InvocationContext::new(Stage::PreCommit, "/tmp");
        let finding = registry.resolve(&def).execute(&def, &ctx).unwrap();
        assert_eq!(finding, Finding::Pass("hi".to_string()));
    }

    #[test]
    fn registered_commit_format_is_used() {
        let config = HookConfig::from_file(ConfigFile::default(), ConfigSource::BuiltIn).unwrap();
        let registry = CheckRegistry::from_config(&config).unwrap();
        let def = CheckDefinition::new("commit-format");
        let ctx = InvocationContext::new(Stage::CommitMsg, "/tmp").with_commit_message("nope");
        let finding = registry.resolve(&def).execute(&def, &ctx).unwrap();
        assert!(finding.is_fail());
    }

    #[test]
    fn default_fix_is_an_error() {
        let def = CheckDefinition::new("commit-format");
        let check = CommitFormatCheck::new(&Default::default());
        let ctx = InvocationContext::new(Stage::CommitMsg, "/tmp");
        assert!(matches!(
            check.fix(&def, &ctx),
            Err(HookError::NoFixRoutine(_))
        ));
    }
}
