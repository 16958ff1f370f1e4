//! Run Record - what the output root says about one run

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::{RunConfig, RunName, RunStatus, VersionFields};

/// Run Record represents one discovered run directory.
///
/// Records are recomputed from the filesystem on every invocation and are
/// never written back; the results CSV is the only persisted form.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunRecord {
    name: RunName,
    config: RunConfig,
    version_fields: Option<VersionFields>,
    output_dir: PathBuf,
    finished: bool,
    has_eval: bool,
    metrics: Option<BTreeMap<String, f64>>,
}

impl RunRecord {
    /// Create a builder for a run record.
    ///
    /// # Arguments
    ///
    /// * `name` - Directory name of the run
    /// * `config` - Config parsed from the name
    /// * `output_dir` - Run directory
    #[must_use]
    pub fn builder(
        name: RunName,
        config: RunConfig,
        output_dir: impl Into<PathBuf>,
    ) -> RunRecordBuilder {
        RunRecordBuilder::new(name, config, output_dir)
    }

    /// Get the run name.
    #[must_use]
    pub const fn name(&self) -> &RunName {
        &self.name
    }

    /// Get the run config.
    #[must_use]
    pub const fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Get the categorical version fields, if the version has them.
    #[must_use]
    pub const fn version_fields(&self) -> Option<&VersionFields> {
        self.version_fields.as_ref()
    }

    /// Get the run directory.
    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Whether the model artifact was present.
    #[must_use]
    pub const fn finished(&self) -> bool {
        self.finished
    }

    /// Whether the metrics file was present.
    #[must_use]
    pub const fn has_eval(&self) -> bool {
        self.has_eval
    }

    /// Get the "average metrics" of the run, if they were readable.
    #[must_use]
    pub const fn metrics(&self) -> Option<&BTreeMap<String, f64>> {
        self.metrics.as_ref()
    }

    /// Get the completion status.
    #[must_use]
    pub const fn status(&self) -> RunStatus {
        RunStatus::from_flags(self.finished, self.has_eval)
    }
}

/// Builder for `RunRecord`.
#[derive(Debug)]
pub struct RunRecordBuilder {
    name: RunName,
    config: RunConfig,
    version_fields: Option<VersionFields>,
    output_dir: PathBuf,
    finished: bool,
    has_eval: bool,
    metrics: Option<BTreeMap<String, f64>>,
}

impl RunRecordBuilder {
    /// Create a new builder with required fields.
    #[must_use]
    pub fn new(name: RunName, config: RunConfig, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            name,
            config,
            version_fields: None,
            output_dir: output_dir.into(),
            finished: false,
            has_eval: false,
            metrics: None,
        }
    }

    /// Set the categorical version fields.
    #[must_use]
    pub fn version_fields(mut self, fields: Option<VersionFields>) -> Self {
        self.version_fields = fields;
        self
    }

    /// Set both completion flags.
    #[must_use]
    pub const fn completion(mut self, finished: bool, has_eval: bool) -> Self {
        self.finished = finished;
        self.has_eval = has_eval;
        self
    }

    /// Set the parsed metrics.
    #[must_use]
    pub fn metrics(mut self, metrics: BTreeMap<String, f64>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Build the `RunRecord`.
    #[must_use]
    pub fn build(self) -> RunRecord {
        RunRecord {
            name: self.name,
            config: self.config,
            version_fields: self.version_fields,
            output_dir: self.output_dir,
            finished: self.finished,
            has_eval: self.has_eval,
            metrics: self.metrics,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_record_defaults() {
        let config = RunConfig::new("v1", 1e-5, 256, 10);
        let record = RunRecord::builder(config.run_name(), config.clone(), "/tmp/out/v1").build();
        assert_eq!(record.config(), &config);
        assert_eq!(record.status(), RunStatus::NotStarted);
        assert!(record.metrics().is_none());
        assert!(record.version_fields().is_none());
    }

    #[test]
    fn test_run_record_evaluated() {
        let config = RunConfig::new("v1", 1e-5, 256, 10);
        let record = RunRecord::builder(config.run_name(), config, "/tmp/out/v1")
            .completion(true, true)
            .metrics(BTreeMap::from([("mrr".to_string(), 0.5)]))
            .build();
        assert_eq!(record.status(), RunStatus::Evaluated);
        assert_eq!(record.metrics().unwrap()["mrr"], 0.5);
    }
}
