//! Plan execution with failure isolation and cooperative cancellation.

use crate::dependency::DependencyGraph;
use crate::error::ActionFailedError;
use crate::scheduler::ExecutionPlan;
use keel_core::{ExecutionResult, RunId, SkipReason, TargetNode, TargetOutcome, TargetStatus};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, info_span, warn, Instrument};

/// What happens to the rest of the plan when a target fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailureStrategy {
    /// Skip only the failed target's dependents; keep running everything else
    #[default]
    Isolate,

    /// Skip every target that has not started yet
    Stop,
}

/// Configuration for the executor.
#[derive(Debug, Clone, Default)]
pub struct ExecutorConfig {
    /// Reaction to a failed target
    pub failure_strategy: FailureStrategy,
}

/// Cloneable handle used to cancel a run from another task.
///
/// Cancellation is cooperative: the target in flight finishes on its own
/// terms, and no further target starts. A request applies to the current
/// run, or to the next one if none is in flight; the executor clears it
/// when that run ends.
#[derive(Debug, Clone, Default)]
pub struct CancellationHandle {
    cancelled: Arc<AtomicBool>,
}

impl CancellationHandle {
    /// Create a handle that is not cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Clear a pending request.
    pub fn reset(&self) {
        self.cancelled.store(false, Ordering::SeqCst);
    }
}

/// Runs an execution plan one target at a time.
pub struct Executor {
    config: ExecutorConfig,
    cancellation: CancellationHandle,
}

impl Executor {
    /// Create a new executor.
    pub fn new() -> Self {
        Self {
            config: ExecutorConfig::default(),
            cancellation: CancellationHandle::new(),
        }
    }

    /// Set the configuration.
    pub fn with_config(mut self, config: ExecutorConfig) -> Self {
        self.config = config;
        self
    }

    /// Use an existing cancellation handle.
    pub fn with_cancellation(mut self, cancellation: CancellationHandle) -> Self {
        self.cancellation = cancellation;
        self
    }

    /// Handle that cancels runs of this executor.
    pub fn cancellation(&self) -> CancellationHandle {
        self.cancellation.clone()
    }

    /// Execute the plan in order.
    ///
    /// A failed target skips its transitive dependents with
    /// [`SkipReason::DependencyFailed`]; unrelated targets keep running unless
    /// the strategy is [`FailureStrategy::Stop`].
    pub async fn execute(&self, plan: &ExecutionPlan<'_>) -> ExecutionResult {
        let run_id = RunId::new();
        let span = info_span!("run", %run_id);

        async move {
            let graph = plan.graph();
            let started_at = chrono::Utc::now();
            let mut outcomes = Vec::with_capacity(plan.len());
            let mut blocked = HashSet::new();
            let mut aborted = false;

            info!(targets = plan.len(), "Starting run");

            for &index in plan.indices() {
                let node = graph.node(index);
                let start = Instant::now();

                let status = if blocked.contains(&index) {
                    debug!(target_name = node.name(), "Skipping target, dependency failed");
                    TargetStatus::Skipped { reason: SkipReason::DependencyFailed }
                } else if aborted {
                    debug!(target_name = node.name(), "Skipping target, run aborted");
                    TargetStatus::Skipped { reason: SkipReason::Aborted }
                } else if self.cancellation.is_cancelled() {
                    debug!(target_name = node.name(), "Skipping target, run cancelled");
                    TargetStatus::Skipped { reason: SkipReason::Cancelled }
                } else {
                    let span = info_span!("target", name = node.name());
                    self.run_target(node).instrument(span).await
                };

                if status.is_failed() {
                    block_dependents(graph, index, &mut blocked);
                    if self.config.failure_strategy == FailureStrategy::Stop {
                        aborted = true;
                    }
                }

                outcomes.push(TargetOutcome {
                    name: node.name().to_string(),
                    status,
                    duration: start.elapsed(),
                });
            }

            let result = ExecutionResult::new(run_id, started_at, chrono::Utc::now(), outcomes);
            let counts = result.counts();
            if self.cancellation.is_cancelled() {
                warn!("Run cancelled");
                self.cancellation.reset();
            }
            if result.is_success() {
                info!(
                    succeeded = counts.succeeded,
                    skipped = counts.skipped,
                    "Run succeeded"
                );
            } else {
                error!(
                    succeeded = counts.succeeded,
                    failed = counts.failed,
                    skipped = counts.skipped,
                    "Run failed"
                );
            }
            result
        }
        .instrument(span)
        .await
    }

    /// Evaluate applicability, then run the target's actions.
    async fn run_target(&self, node: &TargetNode) -> TargetStatus {
        if let Some(condition) = node.unmet_condition() {
            info!(condition = %condition, "Skipping target, not applicable");
            return TargetStatus::Skipped { reason: SkipReason::NotApplicable };
        }

        info!(actions = ?node.action_labels(), "Executing target");

        match node.run().await {
            Ok(()) => {
                info!("Target succeeded");
                TargetStatus::Succeeded
            }
            Err(cause) => {
                let err = ActionFailedError {
                    target: node.name().to_string(),
                    cause,
                };
                error!(error = %err, "Target failed");
                TargetStatus::Failed {
                    reason: format!("{:#}", err.cause),
                }
            }
        }
    }
}

impl Default for Executor {
    fn default() -> Self {
        Self::new()
    }
}

/// Mark every transitive dependent of `failed` as blocked.
fn block_dependents(graph: &DependencyGraph, failed: usize, blocked: &mut HashSet<usize>) {
    let mut stack: Vec<usize> = graph.dependents_of(failed).to_vec();
    while let Some(i) = stack.pop() {
        if blocked.insert(i) {
            stack.extend_from_slice(graph.dependents_of(i));
        }
    }
    debug!(
        failed = graph.node(failed).name(),
        blocked = blocked.len(),
        "Blocked dependents of failed target"
    );
}
