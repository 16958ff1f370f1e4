//! Launching the external trainer and evaluator
//!
//! Every launch goes through the [`Runner`] trait so sweeps can be driven
//! against a real process ([`ProcessRunner`]), a logger ([`DryRunRunner`])
//! or a recording double in tests. Launches are synchronous: the sweep
//! waits for each process before deciding on the next config.

mod command;
mod driver;

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::Result;

pub use command::{
    workers_for, EvaluatorSettings, TrainerSettings, TEST_FILE, TRAIN_FILE, VALID_FILE,
};
pub use driver::{LaunchKind, LaunchRecord, Launcher, SweepReport};

/// Program plus argument vector. Executed without a shell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invocation {
    program: String,
    args: Vec<String>,
    working_dir: Option<PathBuf>,
}

impl Invocation {
    /// Start an invocation of `program` with no arguments.
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
        }
    }

    /// Append one argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Append a boolean flag when `enabled`.
    #[must_use]
    pub fn flag(self, name: &str, enabled: bool) -> Self {
        if enabled {
            self.arg(name)
        } else {
            self
        }
    }

    /// Run in `dir` instead of the driver's working directory.
    #[must_use]
    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Get the program.
    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Get the arguments.
    #[must_use]
    pub fn arg_list(&self) -> &[String] {
        &self.args
    }

    /// Get the working directory, if set.
    #[must_use]
    pub fn working_dir(&self) -> Option<&Path> {
        self.working_dir.as_deref()
    }
}

impl fmt::Display for Invocation {
    /// Shell-like rendering for logs. Arguments with spaces or quotes are
    /// single-quoted.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            let needs_quotes = arg
                .chars()
                .any(|c| c.is_whitespace() || matches!(c, '\'' | '"' | '$'));
            if arg.is_empty() || needs_quotes {
                write!(f, " '{}'", arg.replace('\'', r"'\''"))?;
            } else {
                write!(f, " {arg}")?;
            }
        }
        Ok(())
    }
}

/// How a launched process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LaunchOutcome {
    /// Process exited with a code.
    Exited(i32),
    /// Process was terminated by a signal.
    Signaled,
    /// Nothing was spawned.
    DryRun,
}

impl LaunchOutcome {
    /// True for exit code 0 and dry runs.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Exited(0) | Self::DryRun)
    }
}

impl From<std::process::ExitStatus> for LaunchOutcome {
    fn from(status: std::process::ExitStatus) -> Self {
        status.code().map_or(Self::Signaled, Self::Exited)
    }
}

impl fmt::Display for LaunchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exited(code) => write!(f, "exit code {code}"),
            Self::Signaled => f.write_str("termination by signal"),
            Self::DryRun => f.write_str("dry run"),
        }
    }
}

/// Capability to execute an [`Invocation`] and wait for it.
pub trait Runner {
    /// Execute `invocation` to completion.
    ///
    /// An unsuccessful exit is an `Ok` outcome; `Err` means the process
    /// could not be run at all.
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be spawned or waited on.
    fn run(&mut self, invocation: &Invocation) -> Result<LaunchOutcome>;

    /// True when nothing is spawned, so nothing should be written to disk.
    fn is_dry_run(&self) -> bool {
        false
    }
}

impl<R: Runner + ?Sized> Runner for &mut R {
    fn run(&mut self, invocation: &Invocation) -> Result<LaunchOutcome> {
        (**self).run(invocation)
    }

    fn is_dry_run(&self) -> bool {
        (**self).is_dry_run()
    }
}

impl<R: Runner + ?Sized> Runner for Box<R> {
    fn run(&mut self, invocation: &Invocation) -> Result<LaunchOutcome> {
        (**self).run(invocation)
    }

    fn is_dry_run(&self) -> bool {
        (**self).is_dry_run()
    }
}

/// Spawns real processes, inheriting stdin/stdout/stderr.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessRunner;

impl Runner for ProcessRunner {
    fn run(&mut self, invocation: &Invocation) -> Result<LaunchOutcome> {
        debug!(command = %invocation, "spawning");
        let mut command = Command::new(invocation.program());
        command.args(invocation.arg_list());
        if let Some(dir) = invocation.working_dir() {
            command.current_dir(dir);
        }
        Ok(command.status()?.into())
    }
}

/// Logs invocations without spawning anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct DryRunRunner;

impl Runner for DryRunRunner {
    fn run(&mut self, invocation: &Invocation) -> Result<LaunchOutcome> {
        info!(command = %invocation, "dry run");
        Ok(LaunchOutcome::DryRun)
    }

    fn is_dry_run(&self) -> bool {
        true
    }
}
