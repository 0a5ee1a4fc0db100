//! Execution layer - graph construction, target selection, scheduling,
//! requirement validation, and plan execution.

#![warn(missing_docs)]

pub mod error;
pub mod dependency;
pub mod selector;
pub mod scheduler;
pub mod validator;
pub mod executor;
pub mod engine;

pub use error::{
    failure_exit_code, ActionFailedError, Error, GraphError, RequirementUnmetError, Result,
    SelectionError,
};
pub use dependency::DependencyGraph;
pub use selector::{Selection, TargetSelector};
pub use scheduler::{ExecutionPlan, Scheduler};
pub use validator::RequirementValidator;
pub use executor::{CancellationHandle, Executor, ExecutorConfig, FailureStrategy};
pub use engine::{BuildEngine, EngineConfig};
