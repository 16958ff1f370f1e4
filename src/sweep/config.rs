//! Sweep configuration: defaults, JSON file, command-line overrides
//!
//! Precedence, lowest first: [`SweepConfig::default`], a JSON file
//! ([`SweepConfig::from_json_file`]), then [`SweepOverrides`]. The merged
//! config is resolved once into a [`SweepGrid`] before anything launches.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::SweepGrid;
use crate::experiment::{check_batch_size, check_epochs, check_learning_rate};
use crate::launcher::{EvaluatorSettings, TrainerSettings};
use crate::{Error, Result};

/// Default learning rates.
pub const DEFAULT_LEARNING_RATES: [f64; 3] = [1e-5, 3e-5, 5e-5];
/// Default epoch counts.
pub const DEFAULT_EPOCHS: [u32; 3] = [1, 10, 50];
/// Default batch sizes.
pub const DEFAULT_BATCH_SIZES: [u32; 3] = [256, 512, 1024];

/// Full configuration of a sweep invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    /// Directory holding one sub-directory per dataset version
    pub dataset_root: PathBuf,
    /// Directory holding one sub-directory per run
    pub output_root: PathBuf,
    /// Versions to sweep; empty means every version under `dataset_root`
    pub versions: Vec<String>,
    /// Learning rates to sweep
    pub learning_rates: Vec<f64>,
    /// Epoch counts to sweep
    pub epochs: Vec<u32>,
    /// Batch sizes to sweep
    pub batch_sizes: Vec<u32>,
    /// Stop at the first unsuccessful launch
    pub abort_on_failure: bool,
    /// Fixed trainer settings
    pub trainer: TrainerSettings,
    /// Fixed evaluator settings
    pub evaluator: EvaluatorSettings,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            dataset_root: default_dataset_root(),
            output_root: PathBuf::from("narrative/experiments"),
            versions: Vec::new(),
            learning_rates: DEFAULT_LEARNING_RATES.to_vec(),
            epochs: DEFAULT_EPOCHS.to_vec(),
            batch_sizes: DEFAULT_BATCH_SIZES.to_vec(),
            abort_on_failure: false,
            trainer: TrainerSettings::default(),
            evaluator: EvaluatorSettings::default(),
        }
    }
}

fn default_dataset_root() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_default()
        .join("data/SimKGC/NarrativeInductiveDataset")
}

/// Command-line overrides; `None` keeps the configured value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SweepOverrides {
    /// Dataset root
    pub dataset_root: Option<PathBuf>,
    /// Output root
    pub output_root: Option<PathBuf>,
    /// Versions
    pub versions: Option<Vec<String>>,
    /// Learning rates
    pub learning_rates: Option<Vec<f64>>,
    /// Epoch counts
    pub epochs: Option<Vec<u32>>,
    /// Batch sizes
    pub batch_sizes: Option<Vec<u32>>,
    /// Abort on failure (only ever switches it on)
    pub abort_on_failure: bool,
    /// Appended to the trainer's extra arguments
    pub trainer_args: Vec<String>,
}

impl SweepConfig {
    /// Create a builder starting from the defaults.
    #[must_use]
    pub fn builder() -> SweepConfigBuilder {
        SweepConfigBuilder::default()
    }

    /// Load a config from a JSON file. Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] or [`Error::Json`] if the file cannot be read
    /// or parsed.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "loading sweep config");
        Ok(serde_json::from_str(&fs::read_to_string(path)?)?)
    }

    /// Load from `path` if given, defaults otherwise.
    ///
    /// # Errors
    ///
    /// See [`SweepConfig::from_json_file`].
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_json_file(path),
            None => Ok(Self::default()),
        }
    }

    /// Merge command-line overrides into this config.
    #[must_use]
    pub fn with_overrides(mut self, overrides: SweepOverrides) -> Self {
        if let Some(root) = overrides.dataset_root {
            self.dataset_root = root;
        }
        if let Some(root) = overrides.output_root {
            self.output_root = root;
        }
        if let Some(versions) = overrides.versions {
            self.versions = versions;
        }
        if let Some(lrs) = overrides.learning_rates {
            self.learning_rates = lrs;
        }
        if let Some(epochs) = overrides.epochs {
            self.epochs = epochs;
        }
        if let Some(batch_sizes) = overrides.batch_sizes {
            self.batch_sizes = batch_sizes;
        }
        self.abort_on_failure |= overrides.abort_on_failure;
        self.trainer.extra_args.extend(overrides.trainer_args);
        self
    }

    /// Versions present under the dataset root, sorted.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the dataset root cannot be listed.
    pub fn available_versions(&self) -> Result<Vec<String>> {
        let unreadable = |e: std::io::Error| {
            Error::Config(format!(
                "cannot list dataset root {}: {e}",
                self.dataset_root.display()
            ))
        };

        let mut versions = Vec::new();
        for entry in fs::read_dir(&self.dataset_root).map_err(unreadable)? {
            let entry = entry.map_err(unreadable)?;
            if entry.path().is_dir() {
                if let Some(name) = entry.file_name().to_str() {
                    versions.push(name.to_string());
                }
            }
        }
        versions.sort();
        Ok(versions)
    }

    /// Validate the config and resolve it into a grid.
    ///
    /// Duplicate entries are dropped, keeping the first occurrence.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for an empty dimension, a non-positive
    /// value, or an unreadable dataset root, and [`Error::UnknownVersion`]
    /// for a requested version missing from the dataset root.
    pub fn resolve(&self) -> Result<SweepGrid> {
        let available = self.available_versions()?;
        let versions = if self.versions.is_empty() {
            available
        } else {
            if let Some(missing) = self.versions.iter().find(|v| !available.contains(v)) {
                return Err(Error::UnknownVersion {
                    version: missing.clone(),
                    root: self.dataset_root.clone(),
                    available: available.join(", "),
                });
            }
            dedup(&self.versions)
        };

        for &lr in &self.learning_rates {
            check_learning_rate(lr)?;
        }
        for &batch_size in &self.batch_sizes {
            check_batch_size(batch_size)?;
        }
        for &epochs in &self.epochs {
            check_epochs(epochs)?;
        }

        let grid = SweepGrid::new(
            versions,
            dedup(&self.learning_rates),
            dedup(&self.batch_sizes),
            dedup(&self.epochs),
        );
        for (dimension, len) in [
            ("versions", grid.versions().len()),
            ("learning rates", grid.learning_rates().len()),
            ("batch sizes", grid.batch_sizes().len()),
            ("epochs", grid.epochs().len()),
        ] {
            if len == 0 {
                return Err(Error::Config(format!("no {dimension} to sweep")));
            }
        }
        Ok(grid)
    }
}

/// Builder for [`SweepConfig`]
#[derive(Debug, Clone, Default)]
pub struct SweepConfigBuilder {
    config: SweepConfig,
}

impl SweepConfigBuilder {
    /// Set the dataset root.
    #[must_use]
    pub fn dataset_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.config.dataset_root = root.into();
        self
    }

    /// Set the output root.
    #[must_use]
    pub fn output_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.config.output_root = root.into();
        self
    }

    /// Set the versions to sweep.
    #[must_use]
    pub fn versions<I, S>(mut self, versions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.versions = versions.into_iter().map(Into::into).collect();
        self
    }

    /// Set the learning rates.
    #[must_use]
    pub fn learning_rates(mut self, lrs: impl Into<Vec<f64>>) -> Self {
        self.config.learning_rates = lrs.into();
        self
    }

    /// Set the epoch counts.
    #[must_use]
    pub fn epochs(mut self, epochs: impl Into<Vec<u32>>) -> Self {
        self.config.epochs = epochs.into();
        self
    }

    /// Set the batch sizes.
    #[must_use]
    pub fn batch_sizes(mut self, batch_sizes: impl Into<Vec<u32>>) -> Self {
        self.config.batch_sizes = batch_sizes.into();
        self
    }

    /// Stop at the first unsuccessful launch.
    #[must_use]
    pub const fn abort_on_failure(mut self, abort: bool) -> Self {
        self.config.abort_on_failure = abort;
        self
    }

    /// Set the trainer settings.
    #[must_use]
    pub fn trainer(mut self, trainer: TrainerSettings) -> Self {
        self.config.trainer = trainer;
        self
    }

    /// Set the evaluator settings.
    #[must_use]
    pub fn evaluator(mut self, evaluator: EvaluatorSettings) -> Self {
        self.config.evaluator = evaluator;
        self
    }

    /// Build the config.
    #[must_use]
    pub fn build(self) -> SweepConfig {
        self.config
    }
}

fn dedup<T: PartialEq + Clone>(values: &[T]) -> Vec<T> {
    let mut out: Vec<T> = Vec::with_capacity(values.len());
    for value in values {
        if !out.contains(value) {
            out.push(value.clone());
        }
    }
    out
}
