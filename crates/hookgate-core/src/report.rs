//! Plain-text rendering of a stage verdict.

use std::fmt::Write;

use crate::runner::{CheckOutcome, StageVerdict};

const INDENT: &str = "    ";

/// One block per outcome followed by the summary line.
pub fn render(verdict: &StageVerdict) -> String {
    let mut out = String::new();
    for outcome in &verdict.outcomes {
        render_outcome(&mut out, outcome);
    }
    out.push_str(verdict.overall_status.label());
    if verdict.bypassed {
        out.push_str(" (bypassed)");
    }
    out.push('\n');
    out
}

fn render_outcome(out: &mut String, outcome: &CheckOutcome) {
    let mut lines = outcome.message.lines().filter(|l| !l.trim().is_empty());
    let fixed = if outcome.auto_fix_applied {
        " (auto-fixed)"
    } else {
        ""
    };
    let _ = write!(out, "[{}] {}{fixed}", outcome.status.tag(), outcome.check_name);
    match lines.next() {
        Some(first) => {
            let _ = writeln!(out, ": {}", first.trim_end());
        }
        None => out.push('\n'),
    }
    for line in lines {
        let _ = writeln!(out, "{INDENT}{}", line.trim_end());
    }
}
