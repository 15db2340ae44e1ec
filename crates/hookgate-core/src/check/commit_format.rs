//! Conventional commit header and footer validation.

use regex::Regex;
use std::sync::OnceLock;

use super::{Check, Finding};
use crate::config::{CheckDefinition, CommitFormatConfig};
use crate::context::InvocationContext;
use crate::error::Result;

/// Everything below this line is dropped by git (`commit --verbose`).
const SCISSORS: &str = "# ------------------------ >8 ------------------------";

/// Headers git writes itself; they are not held to the header rules.
const GENERATED_PREFIXES: &[&str] = &["Merge ", "Revert \"", "fixup! ", "squash! ", "amend! "];

fn header_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?P<type>[A-Za-z][A-Za-z0-9_-]*)(?:\((?P<scope>[^()]*)\))?(?P<breaking>!)?: (?P<subject>.*)$")
            .expect("valid header regex")
    })
}

pub struct CommitFormatCheck {
    config: CommitFormatConfig,
}

impl CommitFormatCheck {
    pub fn new(config: &CommitFormatConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// Every rule `message` violates, one human-readable line each. Empty
    /// means the message is acceptable.
    pub fn violations(&self, message: &str) -> Vec<String> {
        let lines = meaningful_lines(message);
        let Some(header) = lines.first().map(|l| l.trim_end()) else {
            return vec!["empty commit message".to_string()];
        };
        let generated = GENERATED_PREFIXES.iter().any(|p| header.starts_with(p));

        let mut violations = Vec::new();
        match header_re().captures(header) {
            _ if generated => {}
            None => violations.push(format!(
                "header '{header}' does not match 'type(scope): subject'"
            )),
            Some(caps) => {
                let kind = &caps["type"];
                if !self.config.types.iter().any(|t| t == kind) {
                    violations.push(format!(
                        "type '{kind}' is not allowed (allowed: {})",
                        self.config.types.join(", ")
                    ));
                }
                match caps.name("scope").map(|m| m.as_str()) {
                    Some(scope) if scope.trim().is_empty() => {
                        violations.push(format!("empty scope in header '{header}'"));
                    }
                    None if self.config.require_scope => violations.push(
                        "missing scope: header must be 'type(scope): subject'".to_string(),
                    ),
                    _ => {}
                }
                let subject = caps["subject"].trim();
                if subject.is_empty() {
                    violations.push(format!("missing subject after '{kind}:'"));
                } else {
                    let len = subject.chars().count();
                    if len > self.config.max_subject_length {
                        violations.push(format!(
                            "subject is {len} characters (max {})",
                            self.config.max_subject_length
                        ));
                    }
                }
            }
        }

        if self.config.require_body_separator
            && !generated
            && lines.get(1).is_some_and(|l| !l.trim().is_empty())
        {
            violations.push("missing blank line after header".to_string());
        }

        if let Some(footer) = self.config.required_footer.as_deref() {
            if !has_footer(&lines[1..], footer) {
                let expected = if footer.contains(':') {
                    footer.trim().to_string()
                } else {
                    format!("{footer}: <value>")
                };
                violations.push(format!("missing footer '{expected}'"));
            }
        }

        violations
    }
}

/// Message lines git would keep: comments and the verbose diff removed,
/// surrounding blank lines trimmed.
fn meaningful_lines(message: &str) -> Vec<&str> {
    let mut lines: Vec<&str> = message
        .lines()
        .take_while(|l| l.trim_end() != SCISSORS)
        .filter(|l| !l.starts_with('#'))
        .collect();
    while lines.last().is_some_and(|l| l.trim().is_empty()) {
        lines.pop();
    }
    let leading = lines.iter().take_while(|l| l.trim().is_empty()).count();
    lines.drain(..leading);
    lines
}

/// `Key` matches any `Key: <non-empty>` line; `Key: value` must match exactly.
fn has_footer(lines: &[&str], footer: &str) -> bool {
    if footer.contains(':') {
        let wanted = footer.trim();
        return lines.iter().any(|l| l.trim() == wanted);
    }
    lines.iter().any(|l| {
        l.trim_end()
            .strip_prefix(footer)
            .and_then(|rest| rest.strip_prefix(':'))
            .is_some_and(|value| !value.trim().is_empty())
    })
}

impl Check for CommitFormatCheck {
    fn execute(&self, _def: &CheckDefinition, ctx: &InvocationContext) -> Result<Finding> {
        let Some(message) = ctx.commit_message.as_deref() else {
            return Ok(Finding::Fail(
                "no commit message available to validate".to_string(),
            ));
        };
        let violations = self.violations(message);
        if violations.is_empty() {
            Ok(Finding::Pass("commit message is well-formed".to_string()))
        } else {
            Ok(Finding::Fail(violations.join("\n")))
        }
    }
}
