//! External command actions.

use anyhow::{bail, Context};
use async_trait::async_trait;
use keel_core::Action;
use std::collections::{BTreeMap, VecDeque};
use std::io::Write;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::debug;

/// Runs one external command; a non-zero exit fails the target.
///
/// Stdout is inherited. Stderr is echoed line by line as the command runs,
/// and its last lines are attached to the failure.
#[derive(Debug, Clone)]
pub struct CommandAction {
    program: String,
    args: Vec<String>,
    env: BTreeMap<String, String>,
    cwd: Option<PathBuf>,
}

impl CommandAction {
    /// Create from an argument vector; the first element is the program.
    pub fn from_argv(argv: &[String]) -> anyhow::Result<Self> {
        let Some((program, args)) = argv.split_first() else {
            bail!("empty command");
        };
        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
            env: BTreeMap::new(),
            cwd: None,
        })
    }

    /// Set environment variables for the command.
    pub fn with_env(mut self, env: BTreeMap<String, String>) -> Self {
        self.env = env;
        self
    }

    /// Set the working directory.
    pub fn with_cwd(mut self, cwd: Option<PathBuf>) -> Self {
        self.cwd = cwd;
        self
    }

    fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[async_trait]
impl Action for CommandAction {
    async fn run(&self) -> anyhow::Result<()> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);

        for (k, v) in &self.env {
            cmd.env(k, v);
        }

        if let Some(cwd) = &self.cwd {
            cmd.current_dir(cwd);
        }

        debug!(command = %self.command_line(), "Spawning command");

        let mut child = cmd
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("failed to start `{}`", self.program))?;

        let mut tail = StderrTail::default();
        if let Some(stderr) = child.stderr.take() {
            let mut lines = BufReader::new(stderr).split(b'\n');
            while let Some(line) = lines
                .next_segment()
                .await
                .context("failed to read command stderr")?
            {
                echo_stderr(&line);
                tail.push(&line);
            }
        }

        let status = child
            .wait()
            .await
            .with_context(|| format!("failed to wait for `{}`", self.program))?;

        let failure = match status.code() {
            Some(0) => return Ok(()),
            Some(code) => format!("`{}` exited with code {}", self.command_line(), code),
            None => format!("`{}` was terminated by a signal", self.command_line()),
        };

        match tail.finish() {
            Some(tail) => bail!("{failure}\n{tail}"),
            None => bail!("{failure}"),
        }
    }

    fn describe(&self) -> String {
        self.command_line()
    }
}

fn echo_stderr(line: &[u8]) {
    let mut out = std::io::stderr().lock();
    if let Err(err) = out.write_all(line).and_then(|_| out.write_all(b"\n")) {
        debug!(error = %err, "Failed to echo command stderr");
    }
}

/// Number of trailing stderr lines kept in a failure reason.
const STDERR_TAIL_LINES: usize = 5;

/// Last non-blank stderr lines of a command.
#[derive(Debug, Default)]
struct StderrTail {
    lines: VecDeque<String>,
}

impl StderrTail {
    fn push(&mut self, line: &[u8]) {
        let line = String::from_utf8_lossy(line);
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() {
            return;
        }
        if self.lines.len() == STDERR_TAIL_LINES {
            self.lines.pop_front();
        }
        self.lines.push_back(line.to_string());
    }

    fn finish(self) -> Option<String> {
        if self.lines.is_empty() {
            None
        } else {
            Some(Vec::from(self.lines).join("\n"))
        }
    }
}
