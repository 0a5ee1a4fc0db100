//! Error taxonomy for the build pipeline.
//!
//! Graph, selection and requirement errors are fatal and surface before any
//! action runs. Action failures are recorded per target and never abort the
//! pipeline itself; [`Error::ExecutionFailed`] exists so reporters can turn a
//! failed run into the same error surface.

use indexmap::IndexMap;
use keel_core::{ExecutionResult, RequirementId};
use thiserror::Error;

/// Error type for pipeline operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while constructing the dependency graph.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    /// Two targets share a name
    #[error("target '{0}' is declared more than once")]
    DuplicateNode(String),

    /// A dependency names a target that does not exist
    #[error("target '{target}' depends on unknown target '{dependency}'")]
    UnknownDependency {
        /// Target declaring the dependency
        target: String,
        /// The unresolved name
        dependency: String,
    },

    /// Dependencies form a loop
    #[error("circular dependency: {}", format_cycle(.path))]
    Cycle {
        /// Targets on the loop, each depending on the next; the last depends on the first
        path: Vec<String>,
    },

    /// The default target is not declared
    #[error("default target '{0}' is not declared")]
    UnknownDefaultTarget(String),
}

/// Errors raised while resolving requested targets.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    /// One or more requested names do not resolve
    #[error("unknown target(s): {}", .0.join(", "))]
    UnknownTargets(Vec<String>),
}

/// Every unmet requirement of a plan, grouped by target in plan order.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unmet requirements: {}", format_unmet(.unmet))]
pub struct RequirementUnmetError {
    /// Target name -> unmet requirement ids, in declaration order
    pub unmet: IndexMap<String, Vec<RequirementId>>,
}

impl RequirementUnmetError {
    /// Unmet requirements of one target.
    pub fn for_target(&self, name: &str) -> Option<&[RequirementId]> {
        self.unmet.get(name).map(Vec::as_slice)
    }

    /// Total number of unmet requirements across all targets.
    pub fn len(&self) -> usize {
        self.unmet.values().map(Vec::len).sum()
    }

    /// Whether nothing is unmet.
    pub fn is_empty(&self) -> bool {
        self.unmet.is_empty()
    }
}

/// An action of a target failed.
#[derive(Debug, Error)]
#[error("target '{target}' failed: {cause:#}")]
pub struct ActionFailedError {
    /// Failing target
    pub target: String,

    /// Underlying cause returned by the action
    #[source]
    pub cause: anyhow::Error,
}

/// Any error the pipeline can surface to a reporter.
#[derive(Debug, Error)]
pub enum Error {
    /// Graph construction failed
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// Target selection failed
    #[error(transparent)]
    Selection(#[from] SelectionError),

    /// Pre-flight requirement check failed
    #[error(transparent)]
    Requirements(#[from] RequirementUnmetError),

    /// The run completed with failed targets
    #[error("targets failed: {}", .failed.join(", "))]
    ExecutionFailed {
        /// Failed target names in plan order
        failed: Vec<String>,
    },
}

impl Error {
    /// Error for a run with failed targets, or `None` if the run succeeded.
    pub fn from_failed_run(result: &ExecutionResult) -> Option<Self> {
        if result.is_success() {
            return None;
        }
        Some(Error::ExecutionFailed {
            failed: result
                .failed_targets()
                .into_iter()
                .map(str::to_string)
                .collect(),
        })
    }

    /// Process exit code for this error.
    pub fn exit_code(&self) -> u8 {
        failure_exit_code(&self.to_string())
    }
}

/// Deterministic non-zero exit code for a failure message.
///
/// The same message always yields the same code, so repeated failures can
/// be grouped by exit code alone. The result is in `1..=255`.
pub fn failure_exit_code(message: &str) -> u8 {
    let checksum = crc32c::crc32c(message.as_bytes());
    (checksum % 255) as u8 + 1
}

fn format_cycle(path: &[String]) -> String {
    match path.first() {
        Some(first) => format!("{} -> {}", path.join(" -> "), first),
        None => String::new(),
    }
}

fn format_unmet(unmet: &IndexMap<String, Vec<RequirementId>>) -> String {
    unmet
        .iter()
        .map(|(target, reqs)| {
            let reqs: Vec<_> = reqs.iter().map(RequirementId::as_str).collect();
            format!("{target} [{}]", reqs.join(", "))
        })
        .collect::<Vec<_>>()
        .join("; ")
}
