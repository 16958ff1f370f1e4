//! Experiment Store - the output root as the source of truth for run state
//!
//! The store owns no in-memory state: every query re-reads the directory
//! tree, so records always reflect what the external programs have written.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, warn};

use super::{completion, RunName, RunRecord, VersionFields};
use crate::metrics::MetricsDocument;
use crate::Result;

/// Selects which run directories a scan or evaluation sweep considers.
///
/// Both criteria are optional and unset by default. The narrative sweeps
/// restrict to `prefix = "kg_base_prop"` and `contains = "role_0"`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunFilter {
    prefix: Option<String>,
    contains: Option<String>,
}

impl RunFilter {
    /// Create a filter that accepts every name.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Require names to start with `prefix`. Empty strings are ignored.
    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into()).filter(|p| !p.is_empty());
        self
    }

    /// Require names to contain `needle`. Empty strings are ignored.
    #[must_use]
    pub fn with_contains(mut self, needle: impl Into<String>) -> Self {
        self.contains = Some(needle.into()).filter(|n| !n.is_empty());
        self
    }

    /// Check a directory name against the filter.
    #[must_use]
    pub fn matches(&self, name: &str) -> bool {
        self.prefix.as_deref().map_or(true, |p| name.starts_with(p))
            && self.contains.as_deref().map_or(true, |n| name.contains(n))
    }
}

/// Directory that matched the filter but could not be turned into a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedRun {
    /// Directory name
    pub name: String,
    /// Why it was skipped
    pub reason: String,
}

/// Result of scanning the output root.
#[derive(Debug, Clone, Default)]
pub struct Scan {
    /// Records sorted by run name
    pub records: Vec<RunRecord>,
    /// Directories whose names did not parse
    pub skipped: Vec<SkippedRun>,
}

/// Filesystem-backed store of run directories.
#[derive(Debug, Clone)]
pub struct ExperimentStore {
    root: PathBuf,
}

impl ExperimentStore {
    /// Create a store over an output root. The root is not touched.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Get the output root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Get the directory of a run.
    #[must_use]
    pub fn run_dir(&self, name: &RunName) -> PathBuf {
        self.root.join(name.as_str())
    }

    /// Create the run directory if it does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Io`] if the directory cannot be created.
    pub fn ensure_run_dir(&self, name: &RunName) -> Result<PathBuf> {
        let dir = self.run_dir(name);
        if !dir.is_dir() {
            debug!(dir = %dir.display(), "creating run directory");
            fs::create_dir_all(&dir)?;
        }
        Ok(dir)
    }

    /// List run directory names accepted by `filter`, sorted.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Io`] if the output root cannot be read.
    pub fn run_names(&self, filter: &RunFilter) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
                warn!(path = %entry.path().display(), "skipping non UTF-8 directory name");
                continue;
            };
            if filter.matches(&name) {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }

    /// Read every run accepted by `filter` into a [`RunRecord`].
    ///
    /// Names that do not parse are reported in [`Scan::skipped`]. A metrics
    /// file that does not parse leaves the run without metrics.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Io`] if the output root cannot be read.
    pub fn scan(&self, filter: &RunFilter) -> Result<Scan> {
        let mut scan = Scan::default();

        for name in self.run_names(filter)? {
            let parsed = RunName::try_from(name.as_str())
                .and_then(|run_name| run_name.to_config().map(|config| (run_name, config)));
            let (run_name, config) = match parsed {
                Ok(parsed) => parsed,
                Err(e) => {
                    warn!(run = %name, error = %e, "excluding run from scan");
                    scan.skipped.push(SkippedRun {
                        name,
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            let dir = self.root.join(&name);
            let finished = completion::is_finished(&dir);
            let has_eval = completion::has_eval(&dir);
            let version_fields = VersionFields::parse(config.version()).ok();

            let mut builder = RunRecord::builder(run_name, config, &dir)
                .version_fields(version_fields)
                .completion(finished, has_eval);

            if has_eval {
                match read_average_metrics(&dir) {
                    Ok(metrics) => builder = builder.metrics(metrics),
                    Err(e) => warn!(run = %name, error = %e, "ignoring unreadable metrics"),
                }
            }

            scan.records.push(builder.build());
        }

        scan.records.sort_by(|a, b| a.name().cmp(b.name()));
        Ok(scan)
    }
}

fn read_average_metrics(dir: &Path) -> Result<std::collections::BTreeMap<String, f64>> {
    MetricsDocument::from_path(dir.join(completion::METRICS_FILE))?.average_metrics()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::experiment::RunConfig;

    #[test]
    fn test_filter_default_accepts_all() {
        let filter = RunFilter::new();
        assert!(filter.matches("anything"));
        assert!(RunFilter::new()
            .with_prefix("")
            .with_contains("")
            .matches("x"));
    }

    #[test]
    fn test_filter_prefix_and_contains() {
        let filter = RunFilter::new()
            .with_prefix("kg_base_prop")
            .with_contains("role_0");
        assert!(filter.matches("kg_base_prop_1_subevent_0_role_0_causation_1"));
        assert!(!filter.matches("kg_base_prop_1_subevent_0_role_1_causation_1"));
        assert!(!filter.matches("v1_role_0"));
    }

    #[test]
    fn test_ensure_run_dir_is_idempotent() {
        let root = tempfile::tempdir().unwrap();
        let store = ExperimentStore::new(root.path());
        let name = RunConfig::new("v1", 1e-5, 256, 10).run_name();

        let dir = store.ensure_run_dir(&name).unwrap();
        assert!(dir.is_dir());
        fs::write(dir.join("keep"), b"x").unwrap();
        assert_eq!(store.ensure_run_dir(&name).unwrap(), dir);
        assert!(dir.join("keep").exists());
    }

    #[test]
    fn test_run_names_sorted_and_dirs_only() {
        let root = tempfile::tempdir().unwrap();
        fs::create_dir(root.path().join("b_lr0.1_bs1_ep1")).unwrap();
        fs::create_dir(root.path().join("a_lr0.1_bs1_ep1")).unwrap();
        fs::write(root.path().join("c_lr0.1_bs1_ep1"), b"").unwrap();

        let names = ExperimentStore::new(root.path())
            .run_names(&RunFilter::new())
            .unwrap();
        assert_eq!(names, vec!["a_lr0.1_bs1_ep1", "b_lr0.1_bs1_ep1"]);
    }

    #[test]
    fn test_missing_root_is_io_error() {
        let root = tempfile::tempdir().unwrap();
        let err = ExperimentStore::new(root.path().join("nope"))
            .run_names(&RunFilter::new())
            .unwrap_err();
        assert!(matches!(err, crate::Error::Io(_)));
    }
}
