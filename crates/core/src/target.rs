//! Target model - the unit of build work.

use crate::action::{Action, Condition, FnAction, FnCondition};
use crate::id::RequirementId;
use std::sync::Arc;

/// A named unit of build work.
///
/// Names are case-sensitive. Dependencies and requirements are ordered sets:
/// declaring the same entry twice keeps the first occurrence.
#[derive(Clone)]
pub struct TargetNode {
    name: String,
    description: String,
    dependencies: Vec<String>,
    conditions: Vec<Arc<dyn Condition>>,
    requirements: Vec<RequirementId>,
    actions: Vec<Arc<dyn Action>>,
}

impl TargetNode {
    /// Start building a target with the given name.
    pub fn builder(name: impl Into<String>) -> TargetBuilder {
        TargetBuilder::new(name)
    }

    /// Target name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Free-text description.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Names of targets that must complete before this one.
    pub fn dependencies(&self) -> &[String] {
        &self.dependencies
    }

    /// Preconditions that must hold before any target runs.
    pub fn requirements(&self) -> &[RequirementId] {
        &self.requirements
    }

    /// Number of actions attached to this target.
    pub fn action_count(&self) -> usize {
        self.actions.len()
    }

    /// Labels of the attached actions, in run order.
    pub fn action_labels(&self) -> Vec<String> {
        self.actions.iter().map(|a| a.describe()).collect()
    }

    /// Evaluate applicability.
    ///
    /// Returns the label of the first condition that does not hold, or
    /// `None` when the target applies. Conditions are checked in
    /// declaration order and evaluation stops at the first false one.
    pub fn unmet_condition(&self) -> Option<String> {
        self.conditions
            .iter()
            .find(|c| !c.evaluate())
            .map(|c| c.describe())
    }

    /// Whether every applicability condition holds.
    pub fn is_applicable(&self) -> bool {
        self.unmet_condition().is_none()
    }

    /// Run every action in declaration order, stopping at the first failure.
    pub async fn run(&self) -> anyhow::Result<()> {
        for action in &self.actions {
            action.run().await?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for TargetNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TargetNode")
            .field("name", &self.name)
            .field("dependencies", &self.dependencies)
            .field("requirements", &self.requirements)
            .field("conditions", &self.conditions.len())
            .field("actions", &self.actions.len())
            .finish()
    }
}

/// Builder for [`TargetNode`].
pub struct TargetBuilder {
    node: TargetNode,
}

impl TargetBuilder {
    /// Create a new target builder.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            node: TargetNode {
                name: name.into(),
                description: String::new(),
                dependencies: Vec::new(),
                conditions: Vec::new(),
                requirements: Vec::new(),
                actions: Vec::new(),
            },
        }
    }

    /// Set description.
    pub fn description(mut self, desc: impl Into<String>) -> Self {
        self.node.description = desc.into();
        self
    }

    /// Add a dependency.
    pub fn depends_on(mut self, target: impl Into<String>) -> Self {
        let target = target.into();
        if !self.node.dependencies.contains(&target) {
            self.node.dependencies.push(target);
        }
        self
    }

    /// Add several dependencies.
    pub fn depends_on_all<I, S>(self, targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        targets.into_iter().fold(self, |b, t| b.depends_on(t))
    }

    /// Add a requirement.
    pub fn requires(mut self, requirement: impl Into<RequirementId>) -> Self {
        let requirement = requirement.into();
        if !self.node.requirements.contains(&requirement) {
            self.node.requirements.push(requirement);
        }
        self
    }

    /// Add an applicability predicate.
    pub fn only_when<F>(self, predicate: F) -> Self
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        self.only_when_condition(Arc::new(FnCondition::new(predicate)))
    }

    /// Add an applicability condition object.
    pub fn only_when_condition(mut self, condition: Arc<dyn Condition>) -> Self {
        self.node.conditions.push(condition);
        self
    }

    /// Add a closure action.
    pub fn executes<F>(self, f: F) -> Self
    where
        F: Fn() -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.executes_action(Arc::new(FnAction::new(f)))
    }

    /// Add an action object.
    pub fn executes_action(mut self, action: Arc<dyn Action>) -> Self {
        self.node.actions.push(action);
        self
    }

    /// Build the target.
    pub fn build(self) -> TargetNode {
        self.node
    }
}
