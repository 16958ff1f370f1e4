//! Sweep definition
//!
//! A sweep is configured once per invocation ([`SweepConfig`]) and resolved
//! into an immutable [`SweepGrid`] whose configs are launched in order.

mod config;
mod grid;

pub use config::{
    SweepConfig, SweepConfigBuilder, SweepOverrides, DEFAULT_BATCH_SIZES, DEFAULT_EPOCHS,
    DEFAULT_LEARNING_RATES,
};
pub use grid::SweepGrid;
