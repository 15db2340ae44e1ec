use serde::Serialize;
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Instant;
use tracing::{debug, info};

use crate::check::{Check, CheckRegistry, Finding};
use crate::config::CheckDefinition;
use crate::context::InvocationContext;
use crate::error::Result;
use crate::git::Workspace;
use crate::types::{CheckStatus, OverallStatus, Stage};

// ---------------------------------------------------------------------------
// CheckOutcome
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckOutcome {
    pub check_name: String,
    pub status: CheckStatus,
    pub message: String,
    /// True whenever a fix was attempted, whether or not it worked.
    pub auto_fix_applied: bool,
    pub blocking: bool,
    /// The blocking check whose failure kept this one from running.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub halted_by: Option<String>,
}

impl CheckOutcome {
    fn skipped(def: &CheckDefinition, message: String, halted_by: Option<&str>) -> Self {
        Self {
            check_name: def.name.clone(),
            status: CheckStatus::Skipped,
            message,
            auto_fix_applied: false,
            blocking: def.blocking,
            halted_by: halted_by.map(str::to_string),
        }
    }

    fn from_finding(def: &CheckDefinition, finding: Finding, auto_fix_applied: bool) -> Self {
        let (status, message) = match finding {
            Finding::Pass(m) => (CheckStatus::Pass, m),
            Finding::Warn(m) => (CheckStatus::Warn, m),
            Finding::Skip(m) => (CheckStatus::Skipped, m),
            Finding::Fail(m) if def.blocking => (CheckStatus::Fail, m),
            // Advisory failures are reported, never enforced.
            Finding::Fail(m) => (CheckStatus::Warn, m),
        };
        Self {
            check_name: def.name.clone(),
            status,
            message,
            auto_fix_applied,
            blocking: def.blocking,
            halted_by: None,
        }
    }

    pub fn is_blocking_failure(&self) -> bool {
        self.blocking && self.status == CheckStatus::Fail
    }
}

// ---------------------------------------------------------------------------
// StageVerdict
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageVerdict {
    pub stage: Stage,
    /// Execution order.
    pub outcomes: Vec<CheckOutcome>,
    pub overall_status: OverallStatus,
    pub bypassed: bool,
}

impl StageVerdict {
    pub fn new(stage: Stage, outcomes: Vec<CheckOutcome>) -> Self {
        let overall_status = if outcomes.iter().any(CheckOutcome::is_blocking_failure) {
            OverallStatus::Blocked
        } else {
            OverallStatus::Pass
        };
        Self {
            stage,
            outcomes,
            overall_status,
            bypassed: false,
        }
    }

    pub fn is_blocked(&self) -> bool {
        self.overall_status == OverallStatus::Blocked
    }

    /// Whether the git operation may go ahead.
    pub fn may_proceed(&self) -> bool {
        !self.is_blocked() || self.bypassed
    }

    /// Checks an override would wave through: failures plus anything the
    /// short-circuit left unrun. Checks that never run in this stage are not
    /// listed.
    pub fn overridden_checks(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|o| o.status == CheckStatus::Fail || o.halted_by.is_some())
            .map(|o| o.check_name.as_str())
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Auto-fix state machine
// ---------------------------------------------------------------------------

/// Per-check progression. A failing auto-fixable check is fixed and verified
/// exactly once more; there is no third pass.
enum FixState {
    Initial,
    Fixing { failure: String },
    Reverifying { ctx: InvocationContext },
    Settled { finding: Finding, fixed: bool },
}

// ---------------------------------------------------------------------------
// HookRunner
// ---------------------------------------------------------------------------

pub struct HookRunner<'a> {
    registry: &'a CheckRegistry,
    workspace: &'a dyn Workspace,
}

impl<'a> HookRunner<'a> {
    pub fn new(registry: &'a CheckRegistry, workspace: &'a dyn Workspace) -> Self {
        Self {
            registry,
            workspace,
        }
    }

    /// Run `checks` in order for `stage`.
    ///
    /// Checks that do not apply to `stage` are skipped in place. The first
    /// blocking failure halts the stage: every later check, blocking or
    /// advisory, is skipped.
    pub fn run(
        &self,
        stage: Stage,
        ctx: &InvocationContext,
        checks: &[CheckDefinition],
    ) -> StageVerdict {
        let mut snapshot = ctx.clone();
        let mut outcomes = Vec::with_capacity(checks.len());
        let mut halted_by: Option<&str> = None;

        for def in checks {
            if !def.applies_to(stage) {
                outcomes.push(CheckOutcome::skipped(
                    def,
                    format!("does not run during {stage}"),
                    None,
                ));
                continue;
            }
            if let Some(failed) = halted_by {
                outcomes.push(CheckOutcome::skipped(
                    def,
                    format!("not run: blocking check '{failed}' failed"),
                    Some(failed),
                ));
                continue;
            }

            let start = Instant::now();
            let (outcome, rederived) = self.run_check(def, &snapshot);
            debug!(
                check = %def.name,
                status = %outcome.status,
                duration_ms = start.elapsed().as_millis() as u64,
                "check finished"
            );
            if let Some(next) = rederived {
                snapshot = next;
            }
            if outcome.is_blocking_failure() {
                halted_by = Some(def.name.as_str());
            }
            outcomes.push(outcome);
        }

        StageVerdict::new(stage, outcomes)
    }

    /// Drive one check through the fix state machine. Returns the outcome and,
    /// if a fix ran, the re-derived snapshot later checks must see.
    fn run_check(
        &self,
        def: &CheckDefinition,
        ctx: &InvocationContext,
    ) -> (CheckOutcome, Option<InvocationContext>) {
        let check = self.registry.resolve(def);
        let mut rederived = None;
        let mut state = FixState::Initial;

        let (finding, fixed) = loop {
            state = match state {
                FixState::Initial => match evaluate(check, def, ctx) {
                    Finding::Fail(failure) if def.auto_fixable => FixState::Fixing { failure },
                    finding => FixState::Settled {
                        finding,
                        fixed: false,
                    },
                },
                FixState::Fixing { failure } => {
                    info!(check = %def.name, "check failed, attempting auto-fix");
                    match self.apply_fix(check, def, ctx) {
                        Ok(next) => FixState::Reverifying { ctx: next },
                        Err(reason) => FixState::Settled {
                            finding: Finding::Fail(format!("{failure}\nauto-fix failed: {reason}")),
                            fixed: true,
                        },
                    }
                }
                FixState::Reverifying { ctx: next } => {
                    let finding = evaluate(check, def, &next);
                    rederived = Some(next);
                    FixState::Settled {
                        finding,
                        fixed: true,
                    }
                }
                FixState::Settled { finding, fixed } => break (finding, fixed),
            };
        };

        (CheckOutcome::from_finding(def, finding, fixed), rederived)
    }

    /// Run the fix routine, re-add the staged files it may have rewritten and
    /// take a fresh snapshot of the index.
    fn apply_fix(
        &self,
        check: &dyn Check,
        def: &CheckDefinition,
        ctx: &InvocationContext,
    ) -> std::result::Result<InvocationContext, String> {
        guarded(|| check.fix(def, ctx))?;
        if ctx.stage != Stage::PreCommit {
            return Ok(ctx.clone());
        }
        let restage = || -> Result<Vec<std::path::PathBuf>> {
            self.workspace.restage(&ctx.staged_files)?;
            self.workspace.staged_files()
        };
        let files = restage().map_err(|e| format!("re-staging fixed files failed: {e}"))?;
        Ok(ctx.clone().with_staged_files(files))
    }
}

/// Execute a check, turning errors and panics into failures.
fn evaluate(check: &dyn Check, def: &CheckDefinition, ctx: &InvocationContext) -> Finding {
    match guarded(|| check.execute(def, ctx)) {
        Ok(finding) => finding,
        Err(reason) => Finding::Fail(format!("check '{}' crashed: {reason}", def.name)),
    }
}

fn guarded<T>(f: impl FnOnce() -> Result<T>) -> std::result::Result<T, String> {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(e.to_string()),
        Err(payload) => Err(format!("panicked: {}", panic_message(payload.as_ref()))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
