//! Human and JSON output for the CLI commands.

use keel_core::{ExecutionResult, TargetNode, TargetStatus};
use keel_execution::ExecutionPlan;
use serde::Serialize;
use std::io::{self, Write};
use std::time::Duration;

/// Write the per-target table and totals of a finished run.
pub fn write_summary(out: &mut impl Write, result: &ExecutionResult) -> io::Result<()> {
    let width = name_width(result.outcomes().iter().map(|o| o.name.as_str()));

    writeln!(out)?;
    writeln!(out, "{:<width$}  {:<10}  {:>9}", "Target", "Status", "Duration")?;
    writeln!(out, "{}", "-".repeat(width + 23))?;

    for outcome in result.outcomes() {
        writeln!(
            out,
            "{:<width$}  {:<10}  {:>9}",
            outcome.name,
            format_status(&outcome.status),
            format_duration(outcome.duration),
        )?;
        match &outcome.status {
            TargetStatus::Failed { reason } => {
                for line in reason.lines() {
                    writeln!(out, "  | {line}")?;
                }
            }
            TargetStatus::Skipped { reason } => writeln!(out, "  | {reason}")?,
            TargetStatus::Succeeded => {}
        }
    }

    let counts = result.counts();
    writeln!(out, "{}", "-".repeat(width + 23))?;
    writeln!(
        out,
        "Run {}: {} succeeded, {} failed, {} skipped in {}",
        result.run_id(),
        counts.succeeded,
        counts.failed,
        counts.skipped,
        format_duration(result.elapsed()),
    )?;

    if result.is_success() {
        writeln!(out, "Build succeeded")
    } else {
        writeln!(out, "Build failed: {}", result.failed_targets().join(", "))
    }
}

/// Write the resolved order of a plan without running it.
pub fn write_plan(out: &mut impl Write, plan: &ExecutionPlan<'_>) -> io::Result<()> {
    writeln!(out, "Execution plan ({} targets)", plan.len())?;
    for (position, node) in plan.iter().enumerate() {
        writeln!(out, "  {:>2}. {}", position + 1, node.name())?;
        if !node.dependencies().is_empty() {
            writeln!(out, "      after: {}", node.dependencies().join(", "))?;
        }
        for requirement in node.requirements() {
            writeln!(out, "      requires: {requirement}")?;
        }
        for label in node.action_labels() {
            writeln!(out, "      $ {label}")?;
        }
    }
    Ok(())
}

/// Write every declared target, marking the default.
pub fn write_targets(
    out: &mut impl Write,
    targets: &[TargetNode],
    default_target: &str,
) -> io::Result<()> {
    let width = name_width(targets.iter().map(|t| t.name()));

    writeln!(out, "Targets ({})", targets.len())?;
    for target in targets {
        let marker = if target.name() == default_target { "*" } else { " " };
        writeln!(
            out,
            "{marker} {:<width$}  {}",
            target.name(),
            target.description()
        )?;
        if !target.dependencies().is_empty() {
            writeln!(
                out,
                "  {:<width$}  -> {}",
                "",
                target.dependencies().join(", ")
            )?;
        }
    }
    writeln!(out)?;
    writeln!(out, "* default target")
}

/// Write any serializable value as pretty JSON followed by a newline.
pub fn write_json<T: Serialize>(out: &mut impl Write, value: &T) -> anyhow::Result<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}

/// JSON shape of a plan entry.
#[derive(Debug, Serialize)]
pub struct PlanEntry<'a> {
    /// Target name
    pub name: &'a str,
    /// Direct dependencies
    pub depends_on: &'a [String],
    /// Requirement names
    pub requires: Vec<&'a str>,
    /// Command lines
    pub run: Vec<String>,
}

impl<'a> PlanEntry<'a> {
    /// Describe a node for JSON output.
    pub fn from_node(node: &'a TargetNode) -> Self {
        Self {
            name: node.name(),
            depends_on: node.dependencies(),
            requires: node.requirements().iter().map(|r| r.as_str()).collect(),
            run: node.action_labels(),
        }
    }
}

fn format_status(status: &TargetStatus) -> &'static str {
    match status {
        TargetStatus::Succeeded => "SUCCEEDED",
        TargetStatus::Failed { .. } => "FAILED",
        TargetStatus::Skipped { .. } => "SKIPPED",
    }
}

fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs_f64();
    if secs < 1.0 {
        format!("{}ms", duration.as_millis())
    } else if secs < 60.0 {
        format!("{secs:.2}s")
    } else {
        format!("{}m{:02}s", duration.as_secs() / 60, duration.as_secs() % 60)
    }
}

fn name_width<'a>(names: impl Iterator<Item = &'a str>) -> usize {
    names.map(str::len).max().unwrap_or(0).max("Target".len())
}
