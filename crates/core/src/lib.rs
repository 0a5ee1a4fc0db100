//! keel core data models.
//!
//! This crate defines the build target model and the result types the
//! execution pipeline produces. It has no knowledge of graphs or ordering.

#![warn(missing_docs)]

// Identities
mod id;

// Target model
mod action;
mod target;

// Run results
mod result;

// Re-exports
pub use id::{RequirementId, RunId};
pub use action::{Action, Condition, FnAction, FnCondition};
pub use target::{TargetBuilder, TargetNode};
pub use result::{ExecutionResult, SkipReason, StatusCounts, TargetOutcome, TargetStatus};

/// Timestamp type
pub type Time = chrono::DateTime<chrono::Utc>;
