//! Results aggregation
//!
//! Joins every run directory's config, completion status and average
//! metrics into a [`ResultsTable`], exported as an Arrow batch and CSV.
//! Per-dimension run counts are diagnostics only and never persisted.

mod groups;
mod table;

pub use groups::{Dimension, GroupCount, MISSING_LABEL};
pub use table::{ResultsTable, FIXED_COLUMNS};
