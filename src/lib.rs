//! # kg-sweep: Grid-Search Driver for Knowledge-Graph Embedding Training
//!
//! Sweeps learning rate, batch size and epoch count over the versions of a
//! narrative dataset, launching an external trainer and evaluator once per
//! configuration and aggregating the metrics they write into a CSV.
//!
//! ## Design Principles
//!
//! - **Filesystem is the database**: a run is finished when its model
//!   artifact exists and evaluated when its metrics file exists, so an
//!   interrupted sweep resumes by re-running it
//! - **Reversible names**: every run directory name parses back to the
//!   config that produced it
//! - **No evaluation of untrusted text**: metrics files go through a
//!   constrained literal parser
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use kg_sweep::experiment::{ExperimentStore, RunFilter};
//! use kg_sweep::results::ResultsTable;
//!
//! let store = ExperimentStore::new("narrative/experiments");
//! let table = ResultsTable::aggregate(&store, &RunFilter::new().with_contains("role_0"))?;
//! table.write_csv("results/results.csv")?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod error;
pub mod experiment;
pub mod launcher;
pub mod metrics;
pub mod results;
pub mod sweep;

pub use error::{Error, Result};
