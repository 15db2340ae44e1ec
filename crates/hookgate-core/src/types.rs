use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Stage
// ---------------------------------------------------------------------------

/// The git lifecycle points a pipeline can be bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    PreCommit,
    CommitMsg,
    PrePush,
}

impl Stage {
    pub fn all() -> &'static [Stage] {
        &[Stage::PreCommit, Stage::CommitMsg, Stage::PrePush]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Stage::PreCommit => "pre-commit",
            Stage::CommitMsg => "commit-msg",
            Stage::PrePush => "pre-push",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Stage {
    type Err = crate::error::HookError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pre-commit" => Ok(Stage::PreCommit),
            "commit-msg" => Ok(Stage::CommitMsg),
            "pre-push" => Ok(Stage::PrePush),
            _ => Err(crate::error::HookError::InvalidStage(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// CheckStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    Pass,
    Fail,
    Warn,
    Skipped,
}

impl CheckStatus {
    /// Fixed-width tag used in the text report.
    pub fn tag(self) -> &'static str {
        match self {
            CheckStatus::Pass => "PASS",
            CheckStatus::Fail => "FAIL",
            CheckStatus::Warn => "WARN",
            CheckStatus::Skipped => "SKIP",
        }
    }
}

impl fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

// ---------------------------------------------------------------------------
// OverallStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverallStatus {
    Pass,
    Blocked,
}

impl OverallStatus {
    pub fn label(self) -> &'static str {
        match self {
            OverallStatus::Pass => "OK",
            OverallStatus::Blocked => "BLOCKED",
        }
    }
}

impl fmt::Display for OverallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_string_roundtrip() {
        for stage in Stage::all() {
            let parsed: Stage = stage.as_str().parse().unwrap();
            assert_eq!(parsed, *stage);
        }
    }

    #[test]
    fn unknown_stage_is_rejected() {
        let err = "post-merge".parse::<Stage>().unwrap_err();
        assert!(err.to_string().contains("post-merge"));
    }

    #[test]
    fn stage_yaml_is_kebab_case() {
        let yaml = serde_yaml::to_string(&Stage::CommitMsg).unwrap();
        assert_eq!(yaml.trim(), "commit-msg");
    }

    #[test]
    fn status_tags_are_fixed_width() {
        for status in [
            CheckStatus::Pass,
            CheckStatus::Fail,
            CheckStatus::Warn,
            CheckStatus::Skipped,
        ] {
            assert_eq!(status.tag().len(), 4);
        }
    }
}
