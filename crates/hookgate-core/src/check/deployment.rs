//! Deployment diff classification.
//!
//! The diff is the text an infrastructure diff tool (e.g. `cdk diff`) prints.
//! Top-level resource lines carry a change marker:
//!
//! ```text
//! [+]   AWS::S3::Bucket Logs LogsA1B2       create
//! [~]   AWS::Lambda::Function Fn FnC3D4     update
//! [-]   AWS::SQS::Queue Jobs JobsE5F6       delete
//! [-/+] AWS::RDS::DBInstance MyDb MyDb7788  replace
//! ```
//!
//! Indented tree lines (`├─`, `└─`) belong to the preceding resource; an
//! update whose details say it requires replacement is a replace. Any other
//! line outside the parameter, output and IAM sections that cannot be
//! classified is kept as an unknown line and fails the check.

use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::sync::OnceLock;
use tracing::debug;

use super::{Check, Finding};
use crate::config::{compile_patterns, ApprovedOutcome, CheckDefinition, DeploymentSafetyConfig};
use crate::context::InvocationContext;
use crate::error::{HookError, Result};
use crate::process::run_shell;

// ---------------------------------------------------------------------------
// Parsed model
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Create,
    Update,
    Replace,
    Delete,
}

impl ChangeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ChangeKind::Create => "create",
            ChangeKind::Update => "update",
            ChangeKind::Replace => "replace",
            ChangeKind::Delete => "delete",
        }
    }

    pub fn is_destructive(self) -> bool {
        matches!(self, ChangeKind::Replace | ChangeKind::Delete)
    }

    fn from_marker(marker: &str) -> Option<Self> {
        match marker {
            "+" => Some(ChangeKind::Create),
            "~" => Some(ChangeKind::Update),
            "-" => Some(ChangeKind::Delete),
            "-/+" => Some(ChangeKind::Replace),
            _ => None,
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceChange {
    pub resource_type: String,
    pub resource_id: String,
    pub kind: ChangeKind,
    /// 1-indexed line in the diff text.
    pub line: usize,
}

impl ResourceChange {
    /// The text stateful patterns are matched against.
    pub fn subject(&self) -> String {
        format!("{} {}", self.resource_type, self.resource_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnknownLine {
    pub line: usize,
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ParsedDiff {
    pub changes: Vec<ResourceChange>,
    pub unknown: Vec<UnknownLine>,
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Preamble,
    Resources,
    Other,
}

fn ansi_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\x1b\[[0-9;]*[A-Za-z]").expect("valid ansi regex"))
}

fn marker_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^\[(?P<marker>[^\]]+)\]\s+(?P<type>[A-Za-z0-9]+(?:::[A-Za-z0-9]+)+)\s+(?P<id>\S+)(?P<rest>.*)$",
        )
        .expect("valid marker regex")
    })
}

fn replacement_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)requires replacement|may be replaced|may cause replacement|\breplace\b")
            .expect("valid replacement regex")
    })
}

fn info_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^(✨\s*)?(Number of stacks with differences|Synthesis time|There were no differences|Hold on while|Creating a change set|Including dependency stacks|Could not create a change set|\(NOTE|start:|success:)",
        )
        .expect("valid info regex")
    })
}

fn section_for(line: &str) -> Option<Section> {
    match line {
        "Resources" => Some(Section::Resources),
        "Parameters" | "Outputs" | "Conditions" | "Mappings" | "Metadata" | "Transform"
        | "Other Changes" | "IAM Statement Changes" | "IAM Policy Changes"
        | "Security Group Changes" | "NOTICES" => Some(Section::Other),
        _ if line.starts_with("Stack ") => Some(Section::Preamble),
        _ => None,
    }
}

fn is_detail_line(line: &str) -> bool {
    line.starts_with(char::is_whitespace) || line.starts_with(['├', '└', '│'])
}

/// Tree-drawing prefix of a detail line (`" │   └─ "`) removed.
fn strip_tree(line: &str) -> &str {
    line.trim_start_matches(|c: char| c.is_whitespace() || matches!(c, '├' | '└' | '│' | '─'))
}

/// Parse diff text into resource changes plus any lines that could not be
/// classified.
///
/// Outside the non-resource sections (parameters, outputs, IAM tables,
/// notices) every non-blank line must be a section header, a known
/// informational line, a change line, or a detail of the change above it.
pub fn parse_diff(text: &str) -> ParsedDiff {
    let mut parsed = ParsedDiff::default();
    let mut section = Section::Preamble;
    // Index into `parsed.changes` of the resource detail lines attach to.
    let mut current: Option<usize> = None;

    for (idx, raw) in text.lines().enumerate() {
        let line_no = idx + 1;
        let cleaned = ansi_re().replace_all(raw, "");
        let line = cleaned.trim_end();
        if line.trim().is_empty() {
            continue;
        }
        let unknown = UnknownLine {
            line: line_no,
            text: line.trim().to_string(),
        };

        if is_detail_line(line) {
            if section == Section::Other {
                continue;
            }
            // Resource lines are never nested.
            if classify(strip_tree(line), line_no).is_some() {
                parsed.unknown.push(unknown);
                continue;
            }
            match current {
                Some(i) => {
                    let change = &mut parsed.changes[i];
                    if change.kind == ChangeKind::Update && replacement_re().is_match(line) {
                        change.kind = ChangeKind::Replace;
                    }
                }
                None => parsed.unknown.push(unknown),
            }
            continue;
        }

        if let Some(next) = section_for(line) {
            section = next;
            current = None;
            continue;
        }

        current = None;
        if line.starts_with('[') {
            match classify(line, line_no) {
                Some(change) => {
                    parsed.changes.push(change);
                    current = Some(parsed.changes.len() - 1);
                }
                // Parameters/Outputs entries share the bracket notation but
                // are not resources.
                None if section == Section::Other => {}
                None => parsed.unknown.push(unknown),
            }
            continue;
        }

        if section != Section::Other && !info_re().is_match(line) {
            parsed.unknown.push(unknown);
        }
    }

    parsed
}

fn classify(line: &str, line_no: usize) -> Option<ResourceChange> {
    let caps = marker_re().captures(line)?;
    let mut kind = ChangeKind::from_marker(caps["marker"].trim())?;
    if kind == ChangeKind::Update && replacement_re().is_match(&caps["rest"]) {
        kind = ChangeKind::Replace;
    }
    Some(ResourceChange {
        resource_type: caps["type"].to_string(),
        resource_id: caps["id"].to_string(),
        kind,
        line: line_no,
    })
}

// ---------------------------------------------------------------------------
// DeploymentSafetyCheck
// ---------------------------------------------------------------------------

pub struct DeploymentSafetyCheck {
    diff_command: Option<String>,
    stateful: Vec<Regex>,
    approval_keys: Vec<String>,
    approved_outcome: ApprovedOutcome,
}

impl DeploymentSafetyCheck {
    pub fn new(config: &DeploymentSafetyConfig) -> Result<Self> {
        Ok(Self {
            diff_command: config.diff_command.clone(),
            stateful: compile_patterns(
                &config.stateful_patterns,
                "deployment_safety.stateful_patterns",
            )?,
            approval_keys: config.approval_keys.clone(),
            approved_outcome: config.approved_outcome,
        })
    }

    pub fn is_stateful(&self, change: &ResourceChange) -> bool {
        let subject = change.subject();
        self.stateful.iter().any(|re| re.is_match(&subject))
    }

    /// True if every approval key appears, in configured order, on
    /// consecutive `Key: <value>` lines of `message`.
    pub fn is_approved(&self, message: &str) -> bool {
        if self.approval_keys.is_empty() {
            return false;
        }
        let lines: Vec<&str> = message.lines().map(str::trim).collect();
        lines.windows(self.approval_keys.len()).any(|window| {
            window.iter().zip(&self.approval_keys).all(|(line, key)| {
                line.strip_prefix(key.as_str())
                    .and_then(|rest| rest.strip_prefix(':'))
                    .is_some_and(|value| !value.trim().is_empty())
            })
        })
    }

    fn approval_block(&self) -> String {
        self.approval_keys
            .iter()
            .map(|k| format!("  {k}: <value>"))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// The diff text, from the context or by running the diff command.
    fn diff_text(&self, def: &CheckDefinition, ctx: &InvocationContext) -> std::result::Result<String, String> {
        if let Some(text) = &ctx.diff_text {
            return Ok(text.clone());
        }
        let Some(command) = def.command.as_deref().or(self.diff_command.as_deref()) else {
            return Err(
                "no deployment diff available: pass --diff-file or set deployment_safety.diff_command"
                    .to_string(),
            );
        };
        debug!(%command, "generating deployment diff");
        match run_shell(command, &ctx.root, &[], def.timeout()) {
            Ok(output) if output.success() => Ok(format!("{}\n{}", output.stdout, output.stderr)),
            Ok(output) => Err(format!(
                "diff command `{command}` failed with {}\n{}",
                output.describe_exit(),
                output.combined()
            )),
            Err(e @ (HookError::ToolSpawn { .. } | HookError::ToolTimeout { .. })) => {
                Err(e.to_string())
            }
            Err(e) => Err(format!("diff command `{command}` failed: {e}")),
        }
    }

    pub fn evaluate(&self, diff: &str, commit_message: &str) -> Finding {
        let parsed = parse_diff(diff);
        let dangerous: Vec<&ResourceChange> = parsed
            .changes
            .iter()
            .filter(|c| c.kind.is_destructive() && self.is_stateful(c))
            .collect();
        let approved = !dangerous.is_empty() && self.is_approved(commit_message);

        let mut problems: Vec<String> = parsed
            .unknown
            .iter()
            .map(|u| {
                format!(
                    "unrecognized diff line {}: '{}' (assuming unsafe)",
                    u.line, u.text
                )
            })
            .collect();

        if !dangerous.is_empty() && !approved {
            for change in &dangerous {
                problems.push(format!(
                    "{} of stateful resource {} (diff line {}) requires approval",
                    change.kind,
                    change.subject(),
                    change.line
                ));
            }
            problems.push(format!(
                "add this block to the commit message to approve:\n{}",
                self.approval_block()
            ));
        }

        if !problems.is_empty() {
            return Finding::Fail(problems.join("\n"));
        }

        if approved {
            let list: Vec<String> = dangerous
                .iter()
                .map(|c| format!("{} {}", c.kind, c.subject()))
                .collect();
            let message = format!("approved stateful changes: {}", list.join(", "));
            return match self.approved_outcome {
                ApprovedOutcome::Pass => Finding::Pass(message),
                ApprovedOutcome::Warn => Finding::Warn(message),
            };
        }

        if parsed.changes.is_empty() {
            Finding::Pass("no resource changes".to_string())
        } else {
            Finding::Pass(format!(
                "{} resource change(s), none destructive to stateful resources",
                parsed.changes.len()
            ))
        }
    }
}

impl Check for DeploymentSafetyCheck {
    fn execute(&self, def: &CheckDefinition, ctx: &InvocationContext) -> Result<Finding> {
        let diff = match self.diff_text(def, ctx) {
            Ok(diff) => diff,
            Err(reason) => return Ok(Finding::Fail(reason)),
        };
        let message = ctx.commit_message.as_deref().unwrap_or("");
        Ok(self.evaluate(&diff, message))
    }
}
