//! Keel CLI - dependency-ordered build target runner.

mod action;
mod conditions;
mod config;
mod report;

use anyhow::Result;
use clap::{Parser, Subcommand};
use config::BuildFile;
use keel_execution::{failure_exit_code, EngineConfig, Error, FailureStrategy};
use report::PlanEntry;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "keel")]
#[command(about = "Run build targets in dependency order", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Build file
    #[arg(short, long, global = true, env = "KEEL_FILE", default_value = "keel.json")]
    file: PathBuf,

    /// Log level; RUST_LOG takes precedence
    #[arg(
        long,
        global = true,
        default_value = "info",
        value_parser = ["trace", "debug", "info", "warn", "error"]
    )]
    log_level: String,

    /// Print machine-readable JSON instead of text
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run targets and their dependencies
    Run {
        /// Targets to run; the default target when empty
        targets: Vec<String>,

        /// Abort the remaining plan after the first failure
        #[arg(long)]
        stop_on_failure: bool,
    },

    /// Show the execution order without running anything
    Plan {
        /// Targets to plan; the default target when empty
        targets: Vec<String>,
    },

    /// List declared targets
    Targets,
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // stdout is reserved for reports
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    match execute(cli, &mut std::io::stdout()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(failure_exit_code(&err.to_string()))
        }
    }
}

async fn execute(cli: Cli, out: &mut impl Write) -> Result<()> {
    let file = BuildFile::load(&cli.file)?;
    let base = config::base_dir(&cli.file);

    match cli.command {
        Commands::Run {
            targets,
            stop_on_failure,
        } => {
            let failure_strategy = if stop_on_failure {
                FailureStrategy::Stop
            } else {
                FailureStrategy::Isolate
            };
            let engine = file
                .into_engine(&base)?
                .with_config(EngineConfig { failure_strategy });

            let cancellation = engine.cancellation();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("Interrupted; no further targets will start");
                    cancellation.cancel();
                }
            });

            let requested: Vec<&str> = targets.iter().map(String::as_str).collect();
            let result = engine
                .run(&requested, conditions::env_requirement_satisfied)
                .await?;

            if cli.json {
                report::write_json(&mut *out, &result)?;
            } else {
                report::write_summary(&mut *out, &result)?;
            }
            out.flush()?;

            if let Some(err) = Error::from_failed_run(&result) {
                return Err(err.into());
            }
            info!(run_id = %result.run_id(), "Build succeeded");
        }
        Commands::Plan { targets } => {
            let engine = file.into_engine(&base)?;
            let requested: Vec<&str> = targets.iter().map(String::as_str).collect();
            let plan = engine.plan(&requested)?;

            if cli.json {
                let entries: Vec<_> = plan.iter().map(PlanEntry::from_node).collect();
                report::write_json(&mut *out, &entries)?;
            } else {
                report::write_plan(&mut *out, &plan)?;
            }
        }
        Commands::Targets => {
            let targets = file.to_targets(&base)?;

            if cli.json {
                let entries: Vec<_> = targets.iter().map(PlanEntry::from_node).collect();
                report::write_json(&mut *out, &entries)?;
            } else {
                report::write_targets(&mut *out, &targets, &file.default)?;
            }
        }
    }

    Ok(())
}
