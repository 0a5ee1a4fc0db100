//! The build engine - runs the full pipeline.

use crate::dependency::DependencyGraph;
use crate::error::{GraphError, Result};
use crate::executor::{CancellationHandle, Executor, ExecutorConfig, FailureStrategy};
use crate::scheduler::{ExecutionPlan, Scheduler};
use crate::selector::TargetSelector;
use crate::validator::RequirementValidator;
use keel_core::{ExecutionResult, RequirementId, TargetNode};
use tracing::{debug, info};

/// Configuration for the build engine.
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    /// Reaction to a failed target
    pub failure_strategy: FailureStrategy,
}

/// The build engine.
///
/// Runs the pipeline:
/// ```text
/// Select → Order → Validate requirements → Execute
/// ```
/// Nothing executes unless selection and validation both succeed.
pub struct BuildEngine {
    graph: DependencyGraph,
    selector: TargetSelector,
    scheduler: Scheduler,
    validator: RequirementValidator,
    executor: Executor,
}

impl BuildEngine {
    /// Create an engine from targets and the default target name.
    pub fn new(targets: Vec<TargetNode>, default_target: &str) -> std::result::Result<Self, GraphError> {
        Ok(Self::from_graph(DependencyGraph::build(targets, default_target)?))
    }

    /// Create an engine over an already built graph.
    pub fn from_graph(graph: DependencyGraph) -> Self {
        Self {
            graph,
            selector: TargetSelector::default(),
            scheduler: Scheduler::default(),
            validator: RequirementValidator::default(),
            executor: Executor::default(),
        }
    }

    /// Set the configuration.
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.executor = self.executor.with_config(ExecutorConfig {
            failure_strategy: config.failure_strategy,
        });
        self
    }

    /// Use an existing cancellation handle.
    pub fn with_cancellation(mut self, cancellation: CancellationHandle) -> Self {
        self.executor = self.executor.with_cancellation(cancellation);
        self
    }

    /// Handle that cancels runs of this engine.
    ///
    /// A request stops the run in flight, or the next run if none is; later
    /// runs start clean.
    pub fn cancellation(&self) -> CancellationHandle {
        self.executor.cancellation()
    }

    /// The dependency graph.
    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    /// Resolve the requested targets into an execution plan without running it.
    pub fn plan(&self, requested: &[&str]) -> Result<ExecutionPlan<'_>> {
        let selection = self.selector.select(&self.graph, requested)?;
        Ok(self.scheduler.order(&selection))
    }

    /// Run the requested targets, or the default target if none are requested.
    ///
    /// Returns an error only when the run could not start. A run with failed
    /// targets returns `Ok`; check [`ExecutionResult::is_success`].
    pub async fn run<F>(&self, requested: &[&str], is_satisfied: F) -> Result<ExecutionResult>
    where
        F: Fn(&RequirementId) -> bool,
    {
        let plan = self.plan(requested)?;
        info!(plan = ?plan.names(), "Resolved execution plan");

        self.validator.validate(&plan, is_satisfied)?;
        debug!("Pre-flight validation passed");

        Ok(self.executor.execute(&plan).await)
    }
}
