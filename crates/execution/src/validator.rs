//! Pre-flight requirement validation.

use crate::error::RequirementUnmetError;
use crate::scheduler::ExecutionPlan;
use indexmap::IndexMap;
use keel_core::RequirementId;
use tracing::{debug, warn};

/// Checks every requirement of a plan before anything runs.
pub struct RequirementValidator;

impl RequirementValidator {
    /// Create a new validator.
    pub fn new() -> Self {
        Self
    }

    /// Validate all requirements of all targets in the plan.
    ///
    /// Every unmet requirement is collected; the error lists them grouped by
    /// target in plan order.
    pub fn validate<F>(
        &self,
        plan: &ExecutionPlan<'_>,
        is_satisfied: F,
    ) -> Result<(), RequirementUnmetError>
    where
        F: Fn(&RequirementId) -> bool,
    {
        let mut unmet: IndexMap<String, Vec<RequirementId>> = IndexMap::new();
        let mut checked = 0usize;

        for node in plan.iter() {
            for requirement in node.requirements() {
                checked += 1;
                if !is_satisfied(requirement) {
                    warn!(
                        target_name = node.name(),
                        requirement = %requirement,
                        "Requirement not satisfied"
                    );
                    unmet
                        .entry(node.name().to_string())
                        .or_default()
                        .push(requirement.clone());
                }
            }
        }

        if unmet.is_empty() {
            debug!(checked, "All requirements satisfied");
            Ok(())
        } else {
            Err(RequirementUnmetError { unmet })
        }
    }
}

impl Default for RequirementValidator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dependency::DependencyGraph;
    use crate::scheduler::Scheduler;
    use crate::selector::TargetSelector;
    use keel_core::TargetNode;
    use std::cell::Cell;

    fn graph() -> DependencyGraph {
        DependencyGraph::build(
            vec![
                TargetNode::builder("restore").requires("FEED_URL").build(),
                TargetNode::builder("build")
                    .depends_on("restore")
                    .requires("API_KEY")
                    .requires("CONFIGURATION")
                    .build(),
                TargetNode::builder("publish")
                    .depends_on("build")
                    .requires("API_KEY")
                    .requires("NUGET_TOKEN")
                    .build(),
                TargetNode::builder("lint").requires("LINT_RULES").build(),
            ],
            "publish",
        )
        .unwrap()
    }

    fn validate(
        graph: &DependencyGraph,
        requested: &[&str],
        present: &[&str],
    ) -> Result<(), RequirementUnmetError> {
        let selection = TargetSelector::new().select(graph, requested).unwrap();
        let plan = Scheduler::new().order(&selection);
        RequirementValidator::new().validate(&plan, |r| present.contains(&r.as_str()))
    }

    #[test]
    fn test_all_satisfied() {
        let graph = graph();
        let present = ["FEED_URL", "API_KEY", "CONFIGURATION", "NUGET_TOKEN"];
        assert!(validate(&graph, &[], &present).is_ok());
    }

    #[test]
    fn test_single_unmet_requirement() {
        let graph = DependencyGraph::build(
            vec![TargetNode::builder("build").requires("API_KEY").build()],
            "build",
        )
        .unwrap();

        let err = validate(&graph, &[], &[]).unwrap_err();
        assert_eq!(err.unmet.len(), 1);
        assert_eq!(err.for_target("build"), Some(&[RequirementId::from("API_KEY")][..]));
    }

    #[test]
    fn test_aggregates_every_unmet_requirement_in_plan_order() {
        let graph = graph();
        let err = validate(&graph, &[], &["CONFIGURATION"]).unwrap_err();

        let targets: Vec<_> = err.unmet.keys().map(String::as_str).collect();
        assert_eq!(targets, vec!["restore", "build", "publish"]);
        assert_eq!(err.for_target("restore"), Some(&[RequirementId::from("FEED_URL")][..]));
        assert_eq!(err.for_target("build"), Some(&[RequirementId::from("API_KEY")][..]));
        assert_eq!(
            err.for_target("publish"),
            Some(&[RequirementId::from("API_KEY"), RequirementId::from("NUGET_TOKEN")][..])
        );
        assert_eq!(err.len(), 4);
    }

    #[test]
    fn test_unselected_targets_are_not_checked() {
        let graph = graph();
        let queried = Cell::new(0usize);

        let selection = TargetSelector::new().select(&graph, &["restore"]).unwrap();
        let plan = Scheduler::new().order(&selection);
        let result = RequirementValidator::new().validate(&plan, |r| {
            queried.set(queried.get() + 1);
            r.as_str() != "LINT_RULES"
        });

        assert!(result.is_ok());
        assert_eq!(queried.get(), 1);
    }
}
