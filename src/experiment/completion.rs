//! Completion checks - filesystem markers left by the external programs
//!
//! These are advisory reads with no locking: two drivers sharing an output
//! root can both see a run as unfinished and launch it twice. Only one
//! sequential driver may work on an output root at a time.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Model artifact written by the trainer when a run completes.
pub const MODEL_ARTIFACT: &str = "model_best.mdl";

/// Metrics file written by the evaluator for [`MODEL_ARTIFACT`].
pub const METRICS_FILE: &str = "metrics_test.txt.json_model_best.mdl.json";

/// Completion state of a run.
///
/// Transitions are driven by the external programs only:
/// `NotStarted -> Finished -> Evaluated`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RunStatus {
    /// No model artifact yet (never launched, still running, or failed).
    NotStarted,
    /// Model artifact present, not evaluated.
    Finished,
    /// Model artifact and metrics file present.
    Evaluated,
}

impl RunStatus {
    /// Read the status of a run directory.
    #[must_use]
    pub fn of(output_dir: &Path) -> Self {
        Self::from_flags(is_finished(output_dir), has_eval(output_dir))
    }

    /// Combine the two completion flags.
    ///
    /// A metrics file without a model artifact does not count as evaluated.
    #[must_use]
    pub const fn from_flags(finished: bool, has_eval: bool) -> Self {
        match (finished, has_eval) {
            (true, true) => Self::Evaluated,
            (true, false) => Self::Finished,
            (false, _) => Self::NotStarted,
        }
    }
}

/// True iff the model artifact exists directly under `output_dir`.
#[must_use]
pub fn is_finished(output_dir: &Path) -> bool {
    output_dir.join(MODEL_ARTIFACT).is_file()
}

/// True iff the evaluator's metrics file exists under `output_dir`.
#[must_use]
pub fn has_eval(output_dir: &Path) -> bool {
    output_dir.join(METRICS_FILE).is_file()
}
