//! JSON build file.

use crate::action::CommandAction;
use crate::conditions::EnvCondition;
use anyhow::{Context, Result};
use keel_core::TargetNode;
use keel_execution::BuildEngine;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Contents of a build file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BuildFile {
    /// Target run when none are requested
    pub default: String,

    /// Target declarations, in declaration order
    #[serde(default)]
    pub targets: Vec<TargetSpec>,
}

/// One declared target.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TargetSpec {
    /// Unique name
    pub name: String,

    /// Human description
    #[serde(default)]
    pub description: String,

    /// Targets that must run first
    #[serde(default)]
    pub depends_on: Vec<String>,

    /// Environment variables that must be set before the run starts
    #[serde(default)]
    pub requires: Vec<String>,

    /// All must hold for the target to run
    #[serde(default)]
    pub only_when: Vec<ConditionSpec>,

    /// Commands, each an argument vector
    #[serde(default)]
    pub run: Vec<Vec<String>>,

    /// Extra environment for the commands
    #[serde(default)]
    pub env: BTreeMap<String, String>,

    /// Working directory, relative to the build file
    #[serde(default)]
    pub cwd: Option<PathBuf>,
}

/// Declared applicability condition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub enum ConditionSpec {
    /// Variable is set and non-empty
    EnvSet(String),

    /// Variable equals a value
    EnvEquals {
        /// Variable name
        name: String,
        /// Expected value
        value: String,
    },

    /// Variable matches a regular expression
    EnvMatches {
        /// Variable name
        name: String,
        /// Regular expression
        pattern: String,
    },

    /// Path exists, relative to the build file
    PathExists(PathBuf),
}

impl ConditionSpec {
    fn compile(&self, base: &Path) -> Result<EnvCondition> {
        Ok(match self {
            ConditionSpec::EnvSet(name) => EnvCondition::Set(name.clone()),
            ConditionSpec::EnvEquals { name, value } => EnvCondition::Equals {
                name: name.clone(),
                value: value.clone(),
            },
            ConditionSpec::EnvMatches { name, pattern } => EnvCondition::Matches {
                name: name.clone(),
                pattern: Regex::new(pattern)
                    .with_context(|| format!("invalid pattern for ${name}: {pattern}"))?,
            },
            ConditionSpec::PathExists(path) => EnvCondition::PathExists(base.join(path)),
        })
    }
}

impl BuildFile {
    /// Read and parse a build file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read build file {}", path.display()))?;
        Self::parse(&content)
            .with_context(|| format!("invalid build file {}", path.display()))
    }

    /// Parse build file JSON.
    pub fn parse(content: &str) -> Result<Self> {
        let file: Self = serde_json::from_str(content)?;
        debug!(targets = file.targets.len(), default = %file.default, "Parsed build file");
        Ok(file)
    }

    /// Convert the declarations into target nodes.
    ///
    /// Relative `cwd` and `path_exists` entries resolve against `base`.
    pub fn to_targets(&self, base: &Path) -> Result<Vec<TargetNode>> {
        self.targets.iter().map(|spec| spec.to_node(base)).collect()
    }

    /// Build an engine over the declared targets.
    pub fn into_engine(self, base: &Path) -> Result<BuildEngine> {
        let targets = self.to_targets(base)?;
        Ok(BuildEngine::new(targets, &self.default)?)
    }
}

impl TargetSpec {
    fn to_node(&self, base: &Path) -> Result<TargetNode> {
        let mut builder = TargetNode::builder(&self.name)
            .description(&self.description)
            .depends_on_all(self.depends_on.iter().cloned());

        for requirement in &self.requires {
            builder = builder.requires(requirement.as_str());
        }

        for condition in &self.only_when {
            let condition = condition
                .compile(base)
                .with_context(|| format!("target '{}'", self.name))?;
            builder = builder.only_when_condition(Arc::new(condition));
        }

        let cwd = self.cwd.as_ref().map(|dir| base.join(dir));
        for argv in &self.run {
            let action = CommandAction::from_argv(argv)
                .with_context(|| format!("target '{}'", self.name))?
                .with_env(self.env.clone())
                .with_cwd(cwd.clone());
            builder = builder.executes_action(Arc::new(action));
        }

        Ok(builder.build())
    }
}

/// Directory that relative paths in the build file resolve against.
pub fn base_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"{
        "default": "package",
        "targets": [
            { "name": "compile", "description": "Compile sources", "run": [["cargo", "build"]] },
            { "name": "test", "depends_on": ["compile"], "requires": ["API_KEY"],
              "only_when": [{ "env_set": "CI" }, { "env_equals": { "name": "MODE", "value": "full" } }],
              "run": [["cargo", "test"], ["cargo", "doc"]],
              "env": { "RUST_BACKTRACE": "1" }, "cwd": "." },
            { "name": "package", "depends_on": ["test"] }
        ]
    }"#;

    #[test]
    fn test_parse_sample() {
        let file = BuildFile::parse(SAMPLE).unwrap();

        assert_eq!(file.default, "package");
        assert_eq!(file.targets.len(), 3);

        let test = &file.targets[1];
        assert_eq!(test.depends_on, vec!["compile"]);
        assert_eq!(test.requires, vec!["API_KEY"]);
        assert_eq!(test.run.len(), 2);
        assert_eq!(test.env.get("RUST_BACKTRACE").map(String::as_str), Some("1"));
        assert_eq!(
            test.only_when[1],
            ConditionSpec::EnvEquals {
                name: "MODE".to_string(),
                value: "full".to_string(),
            }
        );
        assert!(file.targets[2].run.is_empty());
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = BuildFile::parse(r#"{ "default": "a", "targets": [{ "name": "a", "after": [] }] }"#);
        assert!(err.is_err());
    }

    #[test]
    fn test_unknown_condition_rejected() {
        let err = BuildFile::parse(
            r#"{ "default": "a", "targets": [{ "name": "a", "only_when": [{ "os": "linux" }] }] }"#,
        );
        assert!(err.is_err());
    }

    #[test]
    fn test_to_targets_preserves_declarations() {
        let file = BuildFile::parse(SAMPLE).unwrap();
        let targets = file.to_targets(Path::new("/work")).unwrap();

        let names: Vec<_> = targets.iter().map(|t| t.name()).collect();
        assert_eq!(names, vec!["compile", "test", "package"]);
        assert_eq!(targets[0].description(), "Compile sources");
        assert_eq!(targets[1].dependencies(), &["compile".to_string()][..]);
        assert_eq!(targets[1].requirements().len(), 1);
        assert_eq!(
            targets[1].action_labels(),
            vec!["cargo test".to_string(), "cargo doc".to_string()]
        );
        assert_eq!(targets[2].action_count(), 0);
    }

    #[test]
    fn test_empty_command_rejected() {
        let file = BuildFile::parse(r#"{ "default": "a", "targets": [{ "name": "a", "run": [[]] }] }"#)
            .unwrap();
        let err = file.to_targets(Path::new(".")).unwrap_err();
        assert!(format!("{err:#}").contains("target 'a'"));
    }

    #[test]
    fn test_invalid_pattern_rejected() {
        let file = BuildFile::parse(
            r#"{ "default": "a", "targets": [{ "name": "a",
                "only_when": [{ "env_matches": { "name": "TAG", "pattern": "(" } }] }] }"#,
        )
        .unwrap();
        assert!(file.to_targets(Path::new(".")).is_err());
    }

    #[test]
    fn test_path_condition_resolves_against_base() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Cargo.lock"), "").unwrap();

        let file = BuildFile::parse(
            r#"{ "default": "a", "targets": [
                { "name": "a", "only_when": [{ "path_exists": "Cargo.lock" }] },
                { "name": "b", "only_when": [{ "path_exists": "missing.txt" }] }
            ] }"#,
        )
        .unwrap();
        let targets = file.to_targets(dir.path()).unwrap();

        assert!(targets[0].is_applicable());
        assert!(!targets[1].is_applicable());
    }

    #[test]
    fn test_graph_errors_surface_from_engine() {
        let file = BuildFile::parse(
            r#"{ "default": "a", "targets": [{ "name": "a", "depends_on": ["ghost"] }] }"#,
        )
        .unwrap();
        let err = file.into_engine(Path::new(".")).err().unwrap();
        assert!(err.to_string().contains("ghost"));
    }

    #[test]
    fn test_load_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let loaded = BuildFile::load(file.path()).unwrap();
        assert_eq!(loaded.targets.len(), 3);

        let engine = loaded.into_engine(&base_dir(file.path())).unwrap();
        assert_eq!(engine.plan(&[]).unwrap().names(), vec!["compile", "test", "package"]);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = BuildFile::load(&dir.path().join("keel.json")).unwrap_err();
        assert!(err.to_string().starts_with("failed to read build file"));
    }

    #[test]
    fn test_base_dir() {
        assert_eq!(base_dir(Path::new("keel.json")), PathBuf::from("."));
        assert_eq!(base_dir(Path::new("ci/keel.json")), PathBuf::from("ci"));
    }
}
