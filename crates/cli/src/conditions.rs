//! Applicability conditions and the requirement oracle backed by the
//! process environment.

use keel_core::{Condition, RequirementId};
use regex::Regex;
use std::path::PathBuf;

/// Condition evaluated against the environment at run time.
#[derive(Debug, Clone)]
pub enum EnvCondition {
    /// Variable is set and non-empty
    Set(String),

    /// Variable equals a value
    Equals {
        /// Variable name
        name: String,
        /// Expected value
        value: String,
    },

    /// Variable matches a regular expression
    Matches {
        /// Variable name
        name: String,
        /// Compiled pattern
        pattern: Regex,
    },

    /// Path exists on disk
    PathExists(PathBuf),
}

impl Condition for EnvCondition {
    fn evaluate(&self) -> bool {
        match self {
            EnvCondition::Set(name) => env_value(name).is_some(),
            EnvCondition::Equals { name, value } => {
                env_value(name).map(|v| v == *value).unwrap_or(false)
            }
            EnvCondition::Matches { name, pattern } => {
                env_value(name).map(|v| pattern.is_match(&v)).unwrap_or(false)
            }
            EnvCondition::PathExists(path) => path.exists(),
        }
    }

    fn describe(&self) -> String {
        match self {
            EnvCondition::Set(name) => format!("${name} is set"),
            EnvCondition::Equals { name, value } => format!("${name} == {value:?}"),
            EnvCondition::Matches { name, pattern } => format!("${name} =~ /{}/", pattern.as_str()),
            EnvCondition::PathExists(path) => format!("{} exists", path.display()),
        }
    }
}

/// A requirement holds when the environment variable of the same name is
/// set and non-empty.
pub fn env_requirement_satisfied(requirement: &RequirementId) -> bool {
    env_value(requirement.as_str()).is_some()
}

fn env_value(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}
