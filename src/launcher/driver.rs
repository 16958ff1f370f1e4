//! Sweep driver - check, create, launch, one run at a time

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use super::{EvaluatorSettings, Invocation, LaunchOutcome, Runner, TrainerSettings};
use crate::experiment::{completion, ExperimentStore, RunConfig, RunFilter, RunName};
use crate::sweep::SweepGrid;
use crate::{Error, Result};

/// What a launch was for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LaunchKind {
    /// Training a run
    Train,
    /// Evaluating a finished run on the test split
    Eval,
}

/// One launched process.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LaunchRecord {
    /// Run name
    pub run: String,
    /// Train or eval
    pub kind: LaunchKind,
    /// Rendered command line
    pub command: String,
    /// How the process ended
    pub outcome: LaunchOutcome,
    /// Wall-clock start
    pub started_at: DateTime<Utc>,
    /// Wall-clock end
    pub ended_at: DateTime<Utc>,
}

/// Everything a sweep invocation did.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SweepReport {
    /// Launches in order
    pub launched: Vec<LaunchRecord>,
    /// Runs left alone because they were already done
    pub skipped: Vec<String>,
    /// Directories excluded because their names did not parse
    pub invalid: Vec<String>,
    /// Set when the sweep stopped at its first failed launch
    pub aborted: bool,
}

impl SweepReport {
    /// Number of successful launches.
    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.launched
            .iter()
            .filter(|l| l.outcome.is_success())
            .count()
    }

    /// Number of failed launches.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.launched.len() - self.succeeded()
    }

    /// Turn an aborted sweep into its error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LaunchFailed`] for the launch that stopped the sweep.
    pub fn check(&self) -> Result<()> {
        if !self.aborted {
            return Ok(());
        }
        let last = self.launched.last();
        Err(Error::LaunchFailed {
            run: last.map_or_else(String::new, |l| l.run.clone()),
            status: last.map_or_else(String::new, |l| l.outcome.to_string()),
        })
    }

    /// Write the report as pretty JSON, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_vec_pretty(self)?)?;
        Ok(())
    }
}

/// Drives the external programs over an output root.
///
/// Completion is read from the filesystem before each launch, so stopping
/// and restarting a sweep resumes where it left off. Nothing guards against
/// a second driver on the same output root.
#[derive(Debug)]
pub struct Launcher<R> {
    runner: R,
    store: ExperimentStore,
    dataset_root: PathBuf,
    abort_on_failure: bool,
}

impl<R: Runner> Launcher<R> {
    /// Create a launcher.
    ///
    /// # Arguments
    ///
    /// * `runner` - Executes the commands
    /// * `store` - Output root holding one directory per run
    /// * `dataset_root` - Directory holding one sub-directory per version
    #[must_use]
    pub fn new(runner: R, store: ExperimentStore, dataset_root: impl Into<PathBuf>) -> Self {
        Self {
            runner,
            store,
            dataset_root: dataset_root.into(),
            abort_on_failure: false,
        }
    }

    /// Stop the sweep at the first unsuccessful launch.
    #[must_use]
    pub const fn abort_on_failure(mut self, abort: bool) -> Self {
        self.abort_on_failure = abort;
        self
    }

    /// Get the runner.
    #[must_use]
    pub const fn runner(&self) -> &R {
        &self.runner
    }

    /// Consume the launcher, returning the runner.
    #[must_use]
    pub fn into_runner(self) -> R {
        self.runner
    }

    /// Get the store.
    #[must_use]
    pub const fn store(&self) -> &ExperimentStore {
        &self.store
    }

    /// Train one config unconditionally.
    ///
    /// Creates the run directory if needed (not on a dry run), then blocks
    /// until the trainer exits. A failed exit is returned in the record,
    /// not as an error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the config is unusable, and an error if
    /// the run directory cannot be created or the trainer cannot be spawned.
    pub fn train(&mut self, config: &RunConfig, trainer: &TrainerSettings) -> Result<LaunchRecord> {
        config.validate()?;
        let name = config.run_name();
        let dir = if self.runner.is_dry_run() {
            self.store.run_dir(&name)
        } else {
            self.store.ensure_run_dir(&name)?
        };
        let invocation = trainer.invocation(config, &dir, &self.dataset_root);
        info!(run = %name, "training");
        self.launch(&name, LaunchKind::Train, &invocation)
    }

    /// Train every config of `grid` that has no model artifact yet.
    ///
    /// When aborting on failure, the sweep stops after the first failed
    /// launch and the returned report is marked [`SweepReport::aborted`].
    ///
    /// # Errors
    ///
    /// Returns an error on filesystem or spawn failures.
    pub fn train_sweep(
        &mut self,
        grid: &SweepGrid,
        trainer: &TrainerSettings,
    ) -> Result<SweepReport> {
        let mut report = SweepReport::default();
        info!(runs = grid.len(), "starting training sweep");

        for config in grid.configs() {
            let name = config.run_name();
            if completion::is_finished(&self.store.run_dir(&name)) {
                info!(run = %name, "already trained, skipping");
                report.skipped.push(name.to_string());
                continue;
            }

            let record = self.train(&config, trainer)?;
            if self.record(&mut report, record) {
                break;
            }
        }

        info!(
            launched = report.launched.len(),
            failed = report.failed(),
            skipped = report.skipped.len(),
            aborted = report.aborted,
            "training sweep done"
        );
        Ok(report)
    }

    /// Evaluate every finished run accepted by `filter` that has no metrics
    /// file yet.
    ///
    /// Aborting on failure behaves as in [`Launcher::train_sweep`].
    ///
    /// # Errors
    ///
    /// Returns an error if the output root cannot be read or the evaluator
    /// cannot be spawned.
    pub fn eval_sweep(
        &mut self,
        filter: &RunFilter,
        evaluator: &EvaluatorSettings,
    ) -> Result<SweepReport> {
        let mut report = SweepReport::default();
        let names = self.store.run_names(filter)?;
        info!(candidates = names.len(), "starting evaluation sweep");

        for dir_name in names {
            let parsed = RunName::try_from(dir_name.as_str())
                .and_then(|name| name.to_config().map(|config| (name, config)));
            let (name, config) = match parsed {
                Ok(parsed) => parsed,
                Err(e) => {
                    warn!(run = %dir_name, error = %e, "excluding run from evaluation");
                    report.invalid.push(dir_name);
                    continue;
                }
            };

            let dir = self.store.run_dir(&name);
            if !completion::is_finished(&dir) {
                continue;
            }
            if completion::has_eval(&dir) {
                info!(run = %name, "already evaluated, skipping");
                report.skipped.push(name.to_string());
                continue;
            }

            let invocation = evaluator.invocation(config.version(), &dir, &self.dataset_root);
            info!(run = %name, "evaluating");
            let record = self.launch(&name, LaunchKind::Eval, &invocation)?;
            if self.record(&mut report, record) {
                break;
            }
        }

        info!(
            launched = report.launched.len(),
            failed = report.failed(),
            skipped = report.skipped.len(),
            aborted = report.aborted,
            "evaluation sweep done"
        );
        Ok(report)
    }

    fn launch(
        &mut self,
        name: &RunName,
        kind: LaunchKind,
        invocation: &Invocation,
    ) -> Result<LaunchRecord> {
        let started_at = Utc::now();
        let outcome = self.runner.run(invocation)?;
        let ended_at = Utc::now();

        if outcome.is_success() {
            let elapsed_s = (ended_at - started_at).num_seconds();
            info!(run = %name, elapsed_s, "{kind:?} finished");
        } else {
            warn!(run = %name, %outcome, "{kind:?} failed; run stays unfinished");
        }

        Ok(LaunchRecord {
            run: name.to_string(),
            kind,
            command: invocation.to_string(),
            outcome,
            started_at,
            ended_at,
        })
    }

    /// Append `record`; true when the sweep has to stop.
    fn record(&self, report: &mut SweepReport, record: LaunchRecord) -> bool {
        let stop = self.abort_on_failure && !record.outcome.is_success();
        if stop {
            warn!(run = %record.run, "aborting sweep");
        }
        report.launched.push(record);
        report.aborted |= stop;
        stop
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::launcher::DryRunRunner;

    fn record(outcome: LaunchOutcome) -> LaunchRecord {
        let now = Utc::now();
        LaunchRecord {
            run: "r".into(),
            kind: LaunchKind::Train,
            command: "x".into(),
            outcome,
            started_at: now,
            ended_at: now,
        }
    }

    #[test]
    fn test_report_counts() {
        let report = SweepReport {
            launched: vec![
                record(LaunchOutcome::Exited(0)),
                record(LaunchOutcome::Exited(1)),
            ],
            ..SweepReport::default()
        };
        assert_eq!(report.succeeded(), 1);
        assert_eq!(report.failed(), 1);
        assert!(report.check().is_ok());
    }

    #[test]
    fn test_aborted_report_check_names_failed_run() {
        let mut failed = record(LaunchOutcome::Exited(2));
        failed.run = "v1_lr1e-05_bs512_ep1".into();
        let report = SweepReport {
            launched: vec![record(LaunchOutcome::Exited(0)), failed],
            aborted: true,
            ..SweepReport::default()
        };

        let err = report.check().unwrap_err();
        assert!(
            matches!(
                err,
                Error::LaunchFailed { ref run, ref status }
                    if run == "v1_lr1e-05_bs512_ep1" && status == "exit code 2"
            ),
            "{err}"
        );
    }

    #[test]
    fn test_write_json_creates_parent() {
        let root = tempfile::tempdir().unwrap();
        let path = root.path().join("reports/sweep.json");
        SweepReport::default().write_json(&path).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
        assert_eq!(value["launched"], serde_json::json!([]));
        assert_eq!(value["aborted"], serde_json::json!(false));
    }

    #[test]
    fn test_dry_run_train_creates_nothing() {
        let root = tempfile::tempdir().unwrap();
        let store = ExperimentStore::new(root.path());
        let mut launcher = Launcher::new(DryRunRunner, store, "data");
        let config = RunConfig::new("v1", 1e-5, 256, 10);

        let record = launcher
            .train(&config, &TrainerSettings::default())
            .unwrap();
        assert_eq!(record.outcome, LaunchOutcome::DryRun);
        assert!(record.command.contains("v1_lr1e-05_bs256_ep10"));
        assert!(!root.path().join("v1_lr1e-05_bs256_ep10").exists());
    }

    #[test]
    fn test_dry_run_sweep_leaves_output_root_empty() {
        let root = tempfile::tempdir().unwrap();
        let store = ExperimentStore::new(root.path());
        let mut launcher = Launcher::new(DryRunRunner, store, "data");
        let grid = SweepGrid::new(vec!["v1".into()], vec![1e-5, 3e-5], vec![256], vec![1]);

        let report = launcher
            .train_sweep(&grid, &TrainerSettings::default())
            .unwrap();
        assert_eq!(report.launched.len(), 2);
        assert_eq!(fs::read_dir(root.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_train_rejects_invalid_config() {
        let root = tempfile::tempdir().unwrap();
        let store = ExperimentStore::new(root.path());
        let mut launcher = Launcher::new(DryRunRunner, store, "data");

        for config in [
            RunConfig::new("v1", 0.0, 256, 10),
            RunConfig::new("v1", f64::NAN, 256, 10),
            RunConfig::new("v1", 1e-5, 0, 10),
            RunConfig::new("v1", 1e-5, 256, 0),
        ] {
            let err = launcher
                .train(&config, &TrainerSettings::default())
                .unwrap_err();
            assert!(matches!(err, Error::Config(_)), "{err}");
        }
        assert_eq!(fs::read_dir(root.path()).unwrap().count(), 0);
    }
}
