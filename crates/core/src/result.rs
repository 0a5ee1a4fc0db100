//! Run results - what happened to each target in a plan.

use crate::id::RunId;
use crate::Time;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Why a target was not executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// An applicability condition did not hold
    NotApplicable,
    /// A direct or transitive dependency failed
    DependencyFailed,
    /// The run was cancelled before the target started
    Cancelled,
    /// An earlier failure stopped the run
    Aborted,
}

impl SkipReason {
    /// Get string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::NotApplicable => "not applicable",
            SkipReason::DependencyFailed => "dependency failed",
            SkipReason::Cancelled => "run cancelled",
            SkipReason::Aborted => "run aborted",
        }
    }
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Final status of one target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TargetStatus {
    /// Actions ran to completion
    Succeeded,
    /// An action failed
    Failed {
        /// Failure cause, including its chain
        reason: String,
    },
    /// Actions were not run
    Skipped {
        /// Why the target was skipped
        reason: SkipReason,
    },
}

impl TargetStatus {
    /// Whether the target failed.
    pub fn is_failed(&self) -> bool {
        matches!(self, TargetStatus::Failed { .. })
    }

    /// Whether the target succeeded.
    pub fn is_succeeded(&self) -> bool {
        matches!(self, TargetStatus::Succeeded)
    }

    /// Skip reason, if the target was skipped.
    pub fn skip_reason(&self) -> Option<SkipReason> {
        match self {
            TargetStatus::Skipped { reason } => Some(*reason),
            _ => None,
        }
    }
}

impl std::fmt::Display for TargetStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TargetStatus::Succeeded => f.write_str("succeeded"),
            TargetStatus::Failed { reason } => write!(f, "failed: {reason}"),
            TargetStatus::Skipped { reason } => write!(f, "skipped: {reason}"),
        }
    }
}

/// Outcome recorded for one target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetOutcome {
    /// Target name
    pub name: String,

    /// Final status
    #[serde(flatten)]
    pub status: TargetStatus,

    /// Time spent evaluating and running the target
    pub duration: Duration,
}

/// Number of targets per status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    /// Targets that succeeded
    pub succeeded: usize,
    /// Targets that failed
    pub failed: usize,
    /// Targets that were skipped
    pub skipped: usize,
}

/// Result of executing a plan.
///
/// Outcomes are in plan order. The run succeeded only if no target failed;
/// skipped targets do not affect the overall outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    run_id: RunId,
    started_at: Time,
    finished_at: Time,
    /// No target failed
    success: bool,
    outcomes: Vec<TargetOutcome>,
}

impl ExecutionResult {
    /// Assemble a result from recorded outcomes.
    pub fn new(run_id: RunId, started_at: Time, finished_at: Time, outcomes: Vec<TargetOutcome>) -> Self {
        let success = !outcomes.iter().any(|o| o.status.is_failed());
        Self {
            run_id,
            started_at,
            finished_at,
            success,
            outcomes,
        }
    }

    /// Identifier of this run.
    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    /// When the first target was considered.
    pub fn started_at(&self) -> Time {
        self.started_at
    }

    /// When the last target finished.
    pub fn finished_at(&self) -> Time {
        self.finished_at
    }

    /// Per-target outcomes in plan order.
    pub fn outcomes(&self) -> &[TargetOutcome] {
        &self.outcomes
    }

    /// Whether no target failed.
    pub fn is_success(&self) -> bool {
        self.success
    }

    /// Status of a target, if it was part of the run.
    pub fn status_of(&self, name: &str) -> Option<&TargetStatus> {
        self.outcomes
            .iter()
            .find(|o| o.name == name)
            .map(|o| &o.status)
    }

    /// Names of failed targets in plan order.
    pub fn failed_targets(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|o| o.status.is_failed())
            .map(|o| o.name.as_str())
            .collect()
    }

    /// Count targets per status.
    pub fn counts(&self) -> StatusCounts {
        self.outcomes
            .iter()
            .fold(StatusCounts::default(), |mut acc, o| {
                match o.status {
                    TargetStatus::Succeeded => acc.succeeded += 1,
                    TargetStatus::Failed { .. } => acc.failed += 1,
                    TargetStatus::Skipped { .. } => acc.skipped += 1,
                }
                acc
            })
    }

    /// Total wall-clock time of the run.
    pub fn elapsed(&self) -> Duration {
        (self.finished_at - self.started_at).to_std().unwrap_or_default()
    }
}
