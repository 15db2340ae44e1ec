//! Operator overrides: detected, let through, and written down.

use chrono::{DateTime, SecondsFormat, Utc};
use std::io::Write;
use std::path::PathBuf;
use tracing::warn;

use crate::error::Result;
use crate::io::append_line;
use crate::runner::StageVerdict;
use crate::types::Stage;

pub const BYPASS_ENV: &str = "HOOKGATE_BYPASS";

pub struct BypassAuditor {
    requested: bool,
    audit_log: Option<PathBuf>,
}

impl BypassAuditor {
    pub fn new(requested: bool, audit_log: Option<PathBuf>) -> Self {
        Self {
            requested,
            audit_log,
        }
    }

    /// An override is requested by the parsed `--no-verify`/`--bypass` flag
    /// or by `HOOKGATE_BYPASS`.
    pub fn from_env(flag: bool, audit_log: Option<PathBuf>) -> Self {
        let env = std::env::var(BYPASS_ENV).ok();
        Self::new(detect(flag, env.as_deref()), audit_log)
    }

    pub fn requested(&self) -> bool {
        self.requested
    }

    /// Flag the verdict as overridden. Outcomes and overall status are left
    /// untouched.
    pub fn mark(&self, verdict: &mut StageVerdict) {
        verdict.bypassed = self.requested;
    }

    /// Write the audit record to `sink` and the configured audit log.
    pub fn record(&self, stage: Stage, verdict: &StageVerdict, sink: &mut dyn Write) -> Result<()> {
        self.record_at(stage, verdict, Utc::now(), sink)
    }

    pub fn record_at(
        &self,
        stage: Stage,
        verdict: &StageVerdict,
        now: DateTime<Utc>,
        sink: &mut dyn Write,
    ) -> Result<()> {
        let line = audit_line(stage, verdict, now);
        warn!(%stage, status = %verdict.overall_status, "hook bypassed by operator");
        writeln!(sink, "{line}")?;
        if let Some(path) = &self.audit_log {
            append_line(path, &line)?;
        }
        Ok(())
    }
}

/// True if the override flag was given or `env_value` is truthy.
pub fn detect(flag: bool, env_value: Option<&str>) -> bool {
    flag || env_value.is_some_and(is_truthy)
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

pub fn audit_line(stage: Stage, verdict: &StageVerdict, now: DateTime<Utc>) -> String {
    let overridden = verdict.overridden_checks();
    let overridden = if overridden.is_empty() {
        "none".to_string()
    } else {
        overridden.join(",")
    };
    format!(
        "{} hookgate bypass stage={stage} status={} bypassed={overridden}",
        now.to_rfc3339_opts(SecondsFormat::Secs, true),
        verdict.overall_status.label(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::CheckOutcome;
    use crate::types::{CheckStatus, OverallStatus};
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn outcome(name: &str, status: CheckStatus) -> CheckOutcome {
        CheckOutcome {
            check_name: name.to_string(),
            status,
            message: String::new(),
            auto_fix_applied: false,
            blocking: true,
            halted_by: None,
        }
    }

    fn blocked() -> StageVerdict {
        let mut smoke = outcome("smoke", CheckStatus::Skipped);
        smoke.halted_by = Some("deployment-safety".to_string());
        StageVerdict::new(
            Stage::PrePush,
            vec![
                outcome("lint", CheckStatus::Skipped),
                outcome("type-check", CheckStatus::Pass),
                outcome("deployment-safety", CheckStatus::Fail),
                smoke,
            ],
        )
    }

    fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn flag_or_env_requests_a_bypass() {
        assert!(detect(true, None));
        assert!(detect(true, Some("0")));
        assert!(detect(false, Some("1")));
        assert!(detect(false, Some("TRUE")));
        assert!(detect(false, Some(" on ")));
        assert!(!detect(false, Some("0")));
        assert!(!detect(false, Some("")));
        assert!(!detect(false, None));
    }

    #[test]
    fn mark_sets_only_the_flag() {
        let mut verdict = blocked();
        let before = verdict.clone();
        BypassAuditor::new(true, None).mark(&mut verdict);
        assert!(verdict.bypassed);
        assert_eq!(verdict.outcomes, before.outcomes);
        assert_eq!(verdict.overall_status, OverallStatus::Blocked);
        assert!(verdict.may_proceed());
    }

    #[test]
    fn unrequested_mark_is_a_no_op() {
        let mut verdict = blocked();
        BypassAuditor::new(false, None).mark(&mut verdict);
        assert!(!verdict.bypassed);
        assert!(!verdict.may_proceed());
    }

    #[test]
    fn audit_line_names_overridden_checks() {
        let line = audit_line(Stage::PrePush, &blocked(), noon());
        assert_eq!(
            line,
            "2026-03-01T12:00:00Z hookgate bypass stage=pre-push status=BLOCKED bypassed=deployment-safety,smoke"
        );
    }

    #[test]
    fn audit_line_leaves_out_checks_that_never_run_in_the_stage() {
        let line = audit_line(Stage::PrePush, &blocked(), noon());
        assert!(!line.contains("lint"), "{line}");
    }

    #[test]
    fn audit_line_for_a_passing_stage() {
        let verdict = StageVerdict::new(Stage::PreCommit, vec![outcome("lint", CheckStatus::Pass)]);
        let line = audit_line(Stage::PreCommit, &verdict, noon());
        assert!(line.ends_with("stage=pre-commit status=OK bypassed=none"));
    }

    #[test]
    fn record_writes_sink_and_appends_log() {
        let dir = TempDir::new().unwrap();
        let log = dir.path().join("audit.log");
        let auditor = BypassAuditor::new(true, Some(log.clone()));
        let mut sink = Vec::new();
        auditor
            .record_at(Stage::PrePush, &blocked(), noon(), &mut sink)
            .unwrap();
        auditor
            .record_at(Stage::PrePush, &blocked(), noon(), &mut sink)
            .unwrap();

        let printed = String::from_utf8(sink).unwrap();
        assert_eq!(printed.lines().count(), 2);
        let logged = std::fs::read_to_string(&log).unwrap();
        assert_eq!(logged, printed);
    }
}
