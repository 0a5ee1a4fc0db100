//! Action and applicability abstractions.

use async_trait::async_trait;

/// Opaque unit of work attached to a target.
///
/// An action either completes or fails. Retries and timeouts are the
/// action's own business; the executor calls `run` once and waits.
#[async_trait]
pub trait Action: Send + Sync {
    /// Run the action.
    async fn run(&self) -> anyhow::Result<()>;

    /// Short human-readable label used in logs.
    fn describe(&self) -> String {
        "action".to_string()
    }
}

/// Run-time predicate deciding whether a target's actions execute.
pub trait Condition: Send + Sync {
    /// Evaluate the predicate.
    fn evaluate(&self) -> bool;

    /// Short human-readable label used in logs.
    fn describe(&self) -> String {
        "condition".to_string()
    }
}

/// Adapts a synchronous closure into an [`Action`].
pub struct FnAction<F> {
    f: F,
}

impl<F> FnAction<F>
where
    F: Fn() -> anyhow::Result<()> + Send + Sync,
{
    /// Wrap a closure.
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<F> Action for FnAction<F>
where
    F: Fn() -> anyhow::Result<()> + Send + Sync,
{
    async fn run(&self) -> anyhow::Result<()> {
        (self.f)()
    }
}

/// Adapts a closure into a [`Condition`].
pub struct FnCondition<F> {
    f: F,
}

impl<F> FnCondition<F>
where
    F: Fn() -> bool + Send + Sync,
{
    /// Wrap a closure.
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> Condition for FnCondition<F>
where
    F: Fn() -> bool + Send + Sync,
{
    fn evaluate(&self) -> bool {
        (self.f)()
    }
}
