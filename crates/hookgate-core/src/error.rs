use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HookError {
    #[error("invalid configuration at '{key}': {message}")]
    Config { key: String, message: String },

    #[error("failed to parse {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("configuration file {0} is empty")]
    EmptyConfig(PathBuf),

    #[error("invalid stage '{0}': expected pre-commit, commit-msg, or pre-push")]
    InvalidStage(String),

    #[error("invalid pre-push input line '{0}': expected '<local-ref> <local-sha> <remote-ref> <remote-sha>'")]
    InvalidPushLine(String),

    #[error("git {command} failed: {message}")]
    Git { command: String, message: String },

    #[error("failed to spawn `{command}`: {source}")]
    ToolSpawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` timed out after {seconds}s")]
    ToolTimeout { command: String, seconds: u64 },

    #[error("`{command}` failed with {status}: {output}")]
    ToolFailed {
        command: String,
        status: String,
        output: String,
    },

    #[error("check '{0}' has no fix routine")]
    NoFixRoutine(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl HookError {
    pub fn config(key: impl Into<String>, message: impl Into<String>) -> Self {
        HookError::Config {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Configuration errors are fatal for the whole invocation; everything
    /// else is reported against the check that hit it.
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            HookError::Config { .. } | HookError::ConfigParse { .. } | HookError::EmptyConfig(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, HookError>;
