//! Run Tracking Schema
//!
//! A run is one point of the hyperparameter grid. Its state lives entirely
//! on disk under the output root:
//!
//! ```text
//! {output_root}/{run_name}/
//!     model_best.mdl                               -> Finished
//!     metrics_test.txt.json_model_best.mdl.json    -> Evaluated
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use kg_sweep::experiment::{RunConfig, RunName};
//!
//! let config = RunConfig::new("v1", 1e-5, 256, 10);
//! let name = config.run_name();
//! assert_eq!(name.as_str(), "v1_lr1e-05_bs256_ep10");
//! assert_eq!(RunName::parse(name.as_str()).unwrap(), config);
//! ```

pub mod completion;
mod run_config;
mod run_name;
mod run_record;
mod store;
mod version;

pub use completion::{has_eval, is_finished, RunStatus, METRICS_FILE, MODEL_ARTIFACT};
pub use run_config::RunConfig;
pub(crate) use run_config::{check_batch_size, check_epochs, check_learning_rate};
pub use run_name::{format_learning_rate, RunName};
pub use run_record::{RunRecord, RunRecordBuilder};
pub use store::{ExperimentStore, RunFilter, Scan, SkippedRun};
pub use version::{VersionFields, SYNTAX_DISPLAY_PREFIX};
