use crate::check::native_stages;
use crate::error::{HookError, Result};
use crate::types::Stage;
use regex::Regex;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// CommitFormatConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CommitFormatConfig {
    #[serde(default = "default_commit_types")]
    pub types: Vec<String>,
    #[serde(default)]
    pub require_scope: bool,
    #[serde(default = "default_max_subject")]
    pub max_subject_length: usize,
    /// Require a blank line between the header and anything after it.
    #[serde(default)]
    pub require_body_separator: bool,
    /// `Key` requires any `Key: <value>` line; `Key: value` requires that
    /// exact line.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_footer: Option<String>,
}

fn default_commit_types() -> Vec<String> {
    [
        "feat", "fix", "docs", "style", "refactor", "perf", "test", "build", "ci", "chore",
        "revert",
    ]
    .iter()
    .map(|t| t.to_string())
    .collect()
}

fn default_max_subject() -> usize {
    72
}

impl Default for CommitFormatConfig {
    fn default() -> Self {
        Self {
            types: default_commit_types(),
            require_scope: false,
            max_subject_length: default_max_subject(),
            require_body_separator: false,
            required_footer: None,
        }
    }
}

// ---------------------------------------------------------------------------
// DeploymentSafetyConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovedOutcome {
    Pass,
    Warn,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeploymentSafetyConfig {
    /// Command producing the deployment diff when none is supplied up front.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diff_command: Option<String>,
    /// Regexes matched against `<resource-type> <resource-id>`.
    #[serde(default = "default_stateful_patterns")]
    pub stateful_patterns: Vec<String>,
    /// Footer keys that must all appear, on consecutive lines, to approve a
    /// destructive change.
    #[serde(default = "default_approval_keys")]
    pub approval_keys: Vec<String>,
    #[serde(default = "default_approved_outcome")]
    pub approved_outcome: ApprovedOutcome,
}

fn default_stateful_patterns() -> Vec<String> {
    [
        r"AWS::RDS::",
        r"AWS::DynamoDB::(Global)?Table",
        r"AWS::S3::Bucket\b",
        r"AWS::EFS::FileSystem",
        r"AWS::ElastiCache::",
        r"AWS::Cognito::UserPool\b",
        r"AWS::KMS::Key",
        r"AWS::OpenSearchService::Domain",
    ]
    .iter()
    .map(|p| p.to_string())
    .collect()
}

fn default_approval_keys() -> Vec<String> {
    vec![
        "Deploy-Approved-By".to_string(),
        "Deploy-Reason".to_string(),
    ]
}

fn default_approved_outcome() -> ApprovedOutcome {
    ApprovedOutcome::Warn
}

impl Default for DeploymentSafetyConfig {
    fn default() -> Self {
        Self {
            diff_command: None,
            stateful_patterns: default_stateful_patterns(),
            approval_keys: default_approval_keys(),
            approved_outcome: default_approved_outcome(),
        }
    }
}

/// Compile `patterns`, naming `key[i]` on the first invalid one.
pub fn compile_patterns(patterns: &[String], key: &str) -> Result<Vec<Regex>> {
    patterns
        .iter()
        .enumerate()
        .map(|(i, p)| {
            Regex::new(p).map_err(|e| HookError::config(format!("{key}[{i}]"), e.to_string()))
        })
        .collect()
}

// ---------------------------------------------------------------------------
// CheckEntry / ConfigFile (on-disk schema)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CheckEntry {
    pub name: String,
    #[serde(default = "default_blocking")]
    pub blocking: bool,
    #[serde(default, alias = "autoFixable")]
    pub auto_fixable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(default, alias = "fixCommand", skip_serializing_if = "Option::is_none")]
    pub fix_command: Option<String>,
    /// Regex selecting which staged files are substituted for `{files}`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_seconds: Option<u64>,
}

fn default_blocking() -> bool {
    true
}

impl CheckEntry {
    fn external(name: &str, command: &str, fix_command: Option<&str>) -> Self {
        Self {
            name: name.to_string(),
            blocking: true,
            auto_fixable: fix_command.is_some(),
            command: Some(command.to_string()),
            fix_command: fix_command.map(str::to_string),
            include: None,
            timeout_seconds: None,
        }
    }

    fn builtin(name: &str) -> Self {
        Self {
            name: name.to_string(),
            blocking: true,
            auto_fixable: false,
            command: None,
            fix_command: None,
            include: None,
            timeout_seconds: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    #[serde(default = "default_version")]
    pub version: u32,
    /// Default per-check timeout; `0` disables it.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audit_log: Option<PathBuf>,
    #[serde(default)]
    pub commit_format: CommitFormatConfig,
    #[serde(default)]
    pub deployment_safety: DeploymentSafetyConfig,
    #[serde(default, rename = "pre-commit")]
    pub pre_commit: Vec<CheckEntry>,
    #[serde(default, rename = "commit-msg")]
    pub commit_msg: Vec<CheckEntry>,
    #[serde(default, rename = "pre-push")]
    pub pre_push: Vec<CheckEntry>,
}

fn default_version() -> u32 {
    1
}

fn default_timeout() -> u64 {
    60
}

impl Default for ConfigFile {
    /// The built-in pipeline used when no configuration file exists.
    fn default() -> Self {
        const FILES: &str = r"\.(ts|tsx|js|jsx|mjs|cjs|json|css|md)$";
        const SOURCES: &str = r"\.(ts|tsx|js|jsx|mjs|cjs)$";
        let mut format = CheckEntry::external(
            "format",
            "npx prettier --check {files}",
            Some("npx prettier --write {files}"),
        );
        format.include = Some(FILES.to_string());
        let mut lint = CheckEntry::external(
            "lint",
            "npx eslint {files}",
            Some("npx eslint --fix {files}"),
        );
        lint.include = Some(SOURCES.to_string());

        Self {
            version: default_version(),
            timeout_seconds: default_timeout(),
            audit_log: None,
            commit_format: CommitFormatConfig::default(),
            deployment_safety: DeploymentSafetyConfig::default(),
            pre_commit: vec![
                format,
                lint,
                CheckEntry::external("type-check", "npx tsc --noEmit", None),
            ],
            commit_msg: vec![CheckEntry::builtin("commit-format")],
            // deployment-safety needs a diff source, so it is opt-in.
            pre_push: vec![CheckEntry::external("type-check", "npx tsc --noEmit", None)],
        }
    }
}

impl ConfigFile {
    fn entries(&self, stage: Stage) -> &[CheckEntry] {
        match stage {
            Stage::PreCommit => &self.pre_commit,
            Stage::CommitMsg => &self.commit_msg,
            Stage::PrePush => &self.pre_push,
        }
    }
}

// ---------------------------------------------------------------------------
// CheckDefinition / StageConfig (validated model)
// ---------------------------------------------------------------------------

/// A validated, read-only check definition.
#[derive(Debug, Clone, Serialize)]
pub struct CheckDefinition {
    pub name: String,
    pub blocking: bool,
    pub auto_fixable: bool,
    pub applies_to: BTreeSet<Stage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fix_command: Option<String>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_regex"
    )]
    pub include: Option<Regex>,
    /// `0` means no timeout.
    pub timeout_seconds: u64,
}

fn serialize_regex<S: Serializer>(re: &Option<Regex>, s: S) -> std::result::Result<S::Ok, S::Error> {
    match re {
        Some(re) => s.serialize_str(re.as_str()),
        None => s.serialize_none(),
    }
}

impl CheckDefinition {
    /// A blocking definition applying to every stage, with the default
    /// timeout and no command.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            blocking: true,
            auto_fixable: false,
            applies_to: Stage::all().iter().copied().collect(),
            command: None,
            fix_command: None,
            include: None,
            timeout_seconds: default_timeout(),
        }
    }

    pub fn advisory(mut self) -> Self {
        self.blocking = false;
        self
    }

    pub fn auto_fixable(mut self) -> Self {
        self.auto_fixable = true;
        self
    }

    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        self.command = Some(command.into());
        self
    }

    pub fn with_fix_command(mut self, command: impl Into<String>) -> Self {
        self.fix_command = Some(command.into());
        self
    }

    pub fn only(mut self, stages: &[Stage]) -> Self {
        self.applies_to = stages.iter().copied().collect();
        self
    }

    pub fn applies_to(&self, stage: Stage) -> bool {
        self.applies_to.contains(&stage)
    }

    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_seconds > 0).then(|| Duration::from_secs(self.timeout_seconds))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StageConfig {
    pub stage: Stage,
    pub checks: Vec<CheckDefinition>,
}

// ---------------------------------------------------------------------------
// HookConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "path", rename_all = "snake_case")]
pub enum ConfigSource {
    File(PathBuf),
    BuiltIn,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::File(path) => write!(f, "{}", path.display()),
            ConfigSource::BuiltIn => f.write_str("built-in defaults"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HookConfig {
    pub source: ConfigSource,
    pub timeout_seconds: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audit_log: Option<PathBuf>,
    pub commit_format: CommitFormatConfig,
    pub deployment_safety: DeploymentSafetyConfig,
    pub stages: BTreeMap<Stage, StageConfig>,
}

/// Load configuration from the first existing path in `paths`, falling back
/// to built-in defaults. Reads only; never writes to any of the paths.
pub fn load_config(paths: &[PathBuf]) -> Result<HookConfig> {
    for path in paths {
        if !path.is_file() {
            continue;
        }
        let data = std::fs::read_to_string(path)?;
        if data.trim().is_empty() {
            return Err(HookError::EmptyConfig(path.clone()));
        }
        let file: ConfigFile = serde_yaml::from_str(&data).map_err(|source| {
            HookError::ConfigParse {
                path: path.clone(),
                source,
            }
        })?;
        return HookConfig::from_file(file, ConfigSource::File(path.clone()));
    }
    HookConfig::from_file(ConfigFile::default(), ConfigSource::BuiltIn)
}

impl HookConfig {
    pub fn from_file(file: ConfigFile, source: ConfigSource) -> Result<Self> {
        if file.version != 1 {
            return Err(HookError::config(
                "version",
                format!("unsupported version {} (expected 1)", file.version),
            ));
        }
        compile_patterns(
            &file.deployment_safety.stateful_patterns,
            "deployment_safety.stateful_patterns",
        )?;
        for (i, key) in file.deployment_safety.approval_keys.iter().enumerate() {
            if key.trim().is_empty() || key.contains(':') {
                return Err(HookError::config(
                    format!("deployment_safety.approval_keys[{i}]"),
                    "approval keys must be non-empty and must not contain ':'",
                ));
            }
        }
        if file.commit_format.types.is_empty() {
            return Err(HookError::config(
                "commit_format.types",
                "at least one commit type is required",
            ));
        }

        let mut stages = BTreeMap::new();
        for &stage in Stage::all() {
            let mut checks: Vec<CheckDefinition> = Vec::new();
            for (i, entry) in file.entries(stage).iter().enumerate() {
                let def = build_definition(stage, i, entry, file.timeout_seconds)?;
                if checks.iter().any(|c| c.name == def.name) {
                    return Err(HookError::config(
                        format!("{stage}[{i}].name"),
                        format!("duplicate check name '{}'", def.name),
                    ));
                }
                checks.push(def);
            }
            stages.insert(stage, StageConfig { stage, checks });
        }

        Ok(Self {
            source,
            timeout_seconds: file.timeout_seconds,
            audit_log: file.audit_log,
            commit_format: file.commit_format,
            deployment_safety: file.deployment_safety,
            stages,
        })
    }

    pub fn checks_for(&self, stage: Stage) -> &[CheckDefinition] {
        self.stages
            .get(&stage)
            .map(|s| s.checks.as_slice())
            .unwrap_or(&[])
    }

    /// The audit log path resolved against the repository root.
    pub fn audit_log_path(&self, root: &Path) -> Option<PathBuf> {
        self.audit_log.as_ref().map(|p| {
            if p.is_absolute() {
                p.clone()
            } else {
                root.join(p)
            }
        })
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    /// Non-fatal findings about a configuration that loaded successfully.
    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        for stage_config in self.stages.values() {
            let stage = stage_config.stage;
            for def in &stage_config.checks {
                if !def.applies_to(stage) {
                    warnings.push(ConfigWarning {
                        level: WarnLevel::Warning,
                        message: format!(
                            "check '{}' never runs during {stage}; it will always be skipped",
                            def.name
                        ),
                    });
                }
                for command in def.command.iter().chain(def.fix_command.iter()) {
                    if let Some(program) = missing_program(command) {
                        warnings.push(ConfigWarning {
                            level: WarnLevel::Warning,
                            message: format!(
                                "check '{}' on {stage} runs '{program}', which is not on PATH",
                                def.name
                            ),
                        });
                    }
                }
                if def.name == "deployment-safety"
                    && def.command.is_none()
                    && self.deployment_safety.diff_command.is_none()
                {
                    warnings.push(ConfigWarning {
                        level: WarnLevel::Warning,
                        message: "deployment-safety has no diff command; \
                                  pushes must supply --diff-file"
                            .to_string(),
                    });
                }
            }
        }

        if self.timeout_seconds == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "timeout_seconds is 0: external checks may hang forever".to_string(),
            });
        }

        warnings
    }
}

fn build_definition(
    stage: Stage,
    index: usize,
    entry: &CheckEntry,
    default_timeout: u64,
) -> Result<CheckDefinition> {
    let key = |field: &str| format!("{stage}[{index}].{field}");
    let name = entry.name.trim();
    if name.is_empty() {
        return Err(HookError::config(key("name"), "check name must not be empty"));
    }

    let native = native_stages(name);
    let has_command = entry
        .command
        .as_deref()
        .is_some_and(|c| !c.trim().is_empty());

    match native {
        Some(_) => {
            if entry.auto_fixable {
                return Err(HookError::config(
                    key("auto_fixable"),
                    format!("built-in check '{name}' cannot auto-fix"),
                ));
            }
            if has_command && name != "deployment-safety" {
                return Err(HookError::config(
                    key("command"),
                    format!("built-in check '{name}' does not take a command"),
                ));
            }
            if !entry.blocking && name == "deployment-safety" {
                return Err(HookError::config(
                    key("blocking"),
                    "deployment-safety is always blocking",
                ));
            }
        }
        None => {
            if !has_command {
                return Err(HookError::config(
                    key("command"),
                    format!("external check '{name}' requires a command"),
                ));
            }
        }
    }

    if entry.auto_fixable
        && !entry
            .fix_command
            .as_deref()
            .is_some_and(|c| !c.trim().is_empty())
    {
        return Err(HookError::config(
            key("fix_command"),
            format!("check '{name}' is auto_fixable but has no fix_command"),
        ));
    }

    let include = entry
        .include
        .as_deref()
        .map(|p| Regex::new(p).map_err(|e| HookError::config(key("include"), e.to_string())))
        .transpose()?;

    let applies_to = match native {
        Some(stages) if !stages.contains(&stage) => BTreeSet::new(),
        _ => BTreeSet::from([stage]),
    };

    Ok(CheckDefinition {
        name: name.to_string(),
        blocking: entry.blocking,
        auto_fixable: entry.auto_fixable,
        applies_to,
        command: entry.command.clone().filter(|c| !c.trim().is_empty()),
        fix_command: entry.fix_command.clone(),
        include,
        timeout_seconds: entry.timeout_seconds.unwrap_or(default_timeout),
    })
}

/// The first word of `command` if it names a program that cannot be found.
fn missing_program(command: &str) -> Option<String> {
    let program = command.split_whitespace().next()?;
    if program.contains('/') || program.contains('=') || program.contains('$') {
        return None;
    }
    which::which(program).is_err().then(|| program.to_string())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn parse(yaml: &str) -> Result<HookConfig> {
        let file: ConfigFile = serde_yaml::from_str(yaml)?;
        HookConfig::from_file(file, ConfigSource::BuiltIn)
    }

    #[test]
    fn builtin_defaults_when_no_file_exists() {
        let dir = TempDir::new().unwrap();
        let cfg = load_config(&crate::paths::config_search_paths(dir.path())).unwrap();
        assert_eq!(cfg.source, ConfigSource::BuiltIn);
        let names: Vec<&str> = cfg
            .checks_for(Stage::PreCommit)
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(names, vec!["format", "lint", "type-check"]);
        assert_eq!(cfg.checks_for(Stage::CommitMsg)[0].name, "commit-format");
        let pre_push: Vec<&str> = cfg
            .checks_for(Stage::PrePush)
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(pre_push, vec!["type-check"]);
        assert!(cfg.checks_for(Stage::PreCommit)[0].auto_fixable);
        assert!(cfg
            .validate()
            .iter()
            .all(|w| !w.message.contains("deployment-safety")));
    }

    #[test]
    fn local_file_overrides_shared_file() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join(".hookgate")).unwrap();
        std::fs::write(
            crate::paths::shared_config_path(root),
            "pre-commit:\n  - name: shared\n    command: 'true'\n",
        )
        .unwrap();
        std::fs::write(
            crate::paths::local_config_path(root),
            "pre-commit:\n  - name: local\n    command: 'true'\n",
        )
        .unwrap();

        let cfg = load_config(&crate::paths::config_search_paths(root)).unwrap();
        assert_eq!(
            cfg.source,
            ConfigSource::File(crate::paths::local_config_path(root))
        );
        assert_eq!(cfg.checks_for(Stage::PreCommit)[0].name, "local");
    }

    #[test]
    fn shared_file_used_when_local_missing() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join(".hookgate")).unwrap();
        std::fs::write(
            crate::paths::shared_config_path(root),
            "commit-msg:\n  - name: commit-format\n",
        )
        .unwrap();
        let cfg = load_config(&crate::paths::config_search_paths(root)).unwrap();
        assert_eq!(cfg.checks_for(Stage::CommitMsg).len(), 1);
        // Stages absent from the file have no checks; defaults do not leak in.
        assert!(cfg.checks_for(Stage::PreCommit).is_empty());
    }

    #[test]
    fn loading_never_writes() {
        let dir = TempDir::new().unwrap();
        let paths = crate::paths::config_search_paths(dir.path());
        load_config(&paths).unwrap();
        assert!(!paths[0].exists());
        assert!(!paths[1].exists());
    }

    #[test]
    fn entry_defaults_and_alias() {
        let cfg = parse(
            "pre-commit:\n  - name: format\n    autoFixable: true\n    command: prettier --check .\n    fix_command: prettier --write .\n",
        )
        .unwrap();
        let def = &cfg.checks_for(Stage::PreCommit)[0];
        assert!(def.blocking);
        assert!(def.auto_fixable);
        assert_eq!(def.timeout_seconds, 60);
        assert!(def.applies_to(Stage::PreCommit));
        assert!(!def.applies_to(Stage::PrePush));
    }

    #[test]
    fn per_check_timeout_overrides_default() {
        let cfg = parse(
            "timeout_seconds: 30\npre-push:\n  - name: build\n    command: npm run build\n    timeout_seconds: 0\n  - name: test\n    command: npm test\n",
        )
        .unwrap();
        let checks = cfg.checks_for(Stage::PrePush);
        assert_eq!(checks[0].timeout(), None);
        assert_eq!(checks[1].timeout(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn missing_command_names_the_key() {
        let err = parse("pre-commit:\n  - name: ok\n    command: 'true'\n  - name: lint\n")
            .unwrap_err();
        assert!(err.is_config());
        assert!(err.to_string().contains("pre-commit[1].command"), "{err}");
    }

    #[test]
    fn auto_fix_without_fix_command_is_rejected() {
        let err =
            parse("pre-commit:\n  - name: format\n    auto_fixable: true\n    command: x\n")
                .unwrap_err();
        assert!(err.to_string().contains("pre-commit[0].fix_command"), "{err}");
    }

    #[test]
    fn builtin_cannot_auto_fix() {
        let err = parse("commit-msg:\n  - name: commit-format\n    auto_fixable: true\n    fix_command: x\n")
            .unwrap_err();
        assert!(err.to_string().contains("commit-msg[0].auto_fixable"), "{err}");
    }

    #[test]
    fn deployment_safety_cannot_be_advisory() {
        let err = parse("pre-push:\n  - name: deployment-safety\n    blocking: false\n")
            .unwrap_err();
        assert!(err.is_config());
        assert!(err.to_string().contains("pre-push[0].blocking"), "{err}");

        let cfg = parse("pre-push:\n  - name: deployment-safety\n    blocking: true\n").unwrap();
        assert!(cfg.checks_for(Stage::PrePush)[0].blocking);
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let err = parse(
            "pre-commit:\n  - name: lint\n    command: a\n  - name: lint\n    command: b\n",
        )
        .unwrap_err();
        assert!(err.to_string().contains("pre-commit[1].name"), "{err}");
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn invalid_include_regex_is_rejected() {
        let err = parse("pre-commit:\n  - name: lint\n    command: a\n    include: '(['\n")
            .unwrap_err();
        assert!(err.to_string().contains("pre-commit[0].include"), "{err}");
    }

    #[test]
    fn invalid_stateful_pattern_is_rejected() {
        let err = parse("deployment_safety:\n  stateful_patterns: ['RDS', '(']\n").unwrap_err();
        assert!(
            err.to_string()
                .contains("deployment_safety.stateful_patterns[1]"),
            "{err}"
        );
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("hooks.yaml");
        std::fs::write(&path, "pre-commit:\n  - name: lint\n    comand: a\n").unwrap();
        let err = load_config(&[path]).unwrap_err();
        assert!(err.is_config());
        assert!(err.to_string().contains("comand"), "{err}");
    }

    #[test]
    fn malformed_stage_is_fatal_not_skipped() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("hooks.yaml");
        std::fs::write(&path, "pre-push: not-a-list\n").unwrap();
        let err = load_config(&[path]).unwrap_err();
        assert!(err.is_config());
        assert!(err.to_string().contains("pre-push"), "{err}");
    }

    #[test]
    fn empty_file_is_config_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("hooks.yaml");
        std::fs::write(&path, "   \n").unwrap();
        let err = load_config(&[path]).unwrap_err();
        assert!(matches!(err, HookError::EmptyConfig(_)));
    }

    #[test]
    fn unsupported_version_is_rejected() {
        let err = parse("version: 2\n").unwrap_err();
        assert!(err.to_string().contains("'version'"), "{err}");
    }

    #[test]
    fn misplaced_builtin_never_applies() {
        let cfg = parse("pre-commit:\n  - name: commit-format\n").unwrap();
        let def = &cfg.checks_for(Stage::PreCommit)[0];
        assert!(!def.applies_to(Stage::PreCommit));
        let warnings = cfg.validate();
        assert!(warnings
            .iter()
            .any(|w| w.message.contains("never runs during pre-commit")));
    }

    #[test]
    fn validate_flags_missing_programs() {
        let cfg = parse(
            "pre-commit:\n  - name: lint\n    command: hookgate-no-such-program-xyz --check\n",
        )
        .unwrap();
        let warnings = cfg.validate();
        assert!(warnings
            .iter()
            .any(|w| w.message.contains("hookgate-no-such-program-xyz")));
    }

    #[test]
    fn audit_log_resolves_against_root() {
        let cfg = parse("audit_log: .git/hookgate-audit.log\n").unwrap();
        assert_eq!(
            cfg.audit_log_path(Path::new("/repo")).unwrap(),
            PathBuf::from("/repo/.git/hookgate-audit.log")
        );
    }

    #[test]
    fn default_config_file_roundtrip() {
        let yaml = serde_yaml::to_string(&ConfigFile::default()).unwrap();
        assert!(yaml.contains("pre-commit:"));
        assert!(yaml.contains("commit-format"));
        let parsed: ConfigFile = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed, ConfigFile::default());
    }
}
