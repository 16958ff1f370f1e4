//! Run Name - reversible directory name for a run config
//!
//! ## Format
//!
//! ```text
//! {version}_lr{learning_rate}_bs{batch_size}_ep{epochs}
//! ```
//!
//! The learning rate uses the shortest digits that round-trip, switching to
//! exponent notation below `1e-4` and from `1e16` upward (`1e-05`, `3e-05`,
//! `0.001`, `1.0`). Directories written by earlier sweeps use exactly this
//! rendering, so changing it orphans completed runs.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::RunConfig;
use crate::{Error, Result};

const RUN_NAME_PATTERN: &str =
    r"^(?P<version>.+)_lr(?P<lr>[^_]+)_bs(?P<batch_size>\d+)_ep(?P<epochs>\d+)$";

fn run_name_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(RUN_NAME_PATTERN).expect("run name pattern is valid"))
}

/// Directory name of a run, derived from its [`RunConfig`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunName(String);

impl RunName {
    /// Derive the name of a config. Pure and deterministic.
    #[must_use]
    pub fn from_config(config: &RunConfig) -> Self {
        Self(format!(
            "{}_lr{}_bs{}_ep{}",
            config.version(),
            format_learning_rate(config.learning_rate()),
            config.batch_size(),
            config.epochs()
        ))
    }

    /// Parse a directory name back into its config.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRunName`] if the name does not match the
    /// run-name pattern or a numeric field does not parse.
    pub fn parse(name: &str) -> Result<RunConfig> {
        let caps = run_name_regex().captures(name).ok_or_else(|| {
            Error::invalid_run_name(name, "expected '{version}_lr{lr}_bs{batch_size}_ep{epochs}'")
        })?;

        let learning_rate: f64 = caps["lr"]
            .parse()
            .map_err(|e| {
                Error::invalid_run_name(name, format!("learning rate '{}': {e}", &caps["lr"]))
            })?;
        let batch_size: u32 = caps["batch_size"]
            .parse()
            .map_err(|e| Error::invalid_run_name(name, format!("batch size: {e}")))?;
        let epochs: u32 = caps["epochs"]
            .parse()
            .map_err(|e| Error::invalid_run_name(name, format!("epochs: {e}")))?;

        Ok(RunConfig::new(&caps["version"], learning_rate, batch_size, epochs))
    }

    /// Get the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parse this name back into its config.
    ///
    /// # Errors
    ///
    /// See [`RunName::parse`].
    pub fn to_config(&self) -> Result<RunConfig> {
        Self::parse(&self.0)
    }
}

impl From<&RunConfig> for RunName {
    fn from(config: &RunConfig) -> Self {
        Self::from_config(config)
    }
}

impl TryFrom<&str> for RunName {
    type Error = Error;

    /// Accept an existing directory name as-is, provided it parses.
    fn try_from(name: &str) -> Result<Self> {
        Self::parse(name)?;
        Ok(Self(name.to_string()))
    }
}

impl AsRef<str> for RunName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RunName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl RunConfig {
    /// Get the run name of this config.
    #[must_use]
    pub fn run_name(&self) -> RunName {
        RunName::from_config(self)
    }
}

/// Render a learning rate the way run directories spell it.
///
/// Shortest round-trip digits; exponent form (two-digit, signed exponent)
/// when the decimal exponent is below -4 or at least 16; integral values
/// keep a trailing `.0`.
#[must_use]
pub fn format_learning_rate(lr: f64) -> String {
    if lr.is_nan() {
        return "nan".to_string();
    }
    if lr.is_infinite() {
        return if lr > 0.0 { "inf" } else { "-inf" }.to_string();
    }

    let scientific = format!("{lr:e}");
    if let Some((mantissa, exponent)) = scientific.split_once('e') {
        let exponent: i32 = exponent.parse().unwrap_or(0);
        if lr != 0.0 && !(-4..16).contains(&exponent) {
            let sign = if exponent < 0 { '-' } else { '+' };
            return format!("{mantissa}e{sign}{:02}", exponent.unsigned_abs());
        }
    }

    let plain = format!("{lr}");
    if plain.contains('.') {
        plain
    } else {
        format!("{plain}.0")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_learning_rate_small_uses_exponent() {
        assert_eq!(format_learning_rate(1e-5), "1e-05");
        assert_eq!(format_learning_rate(3e-5), "3e-05");
        assert_eq!(format_learning_rate(5e-5), "5e-05");
        assert_eq!(format_learning_rate(2.5e-7), "2.5e-07");
    }

    #[test]
    fn test_format_learning_rate_plain_range() {
        assert_eq!(format_learning_rate(0.001), "0.001");
        assert_eq!(format_learning_rate(1e-4), "0.0001");
        assert_eq!(format_learning_rate(1.0), "1.0");
        assert_eq!(format_learning_rate(0.0), "0.0");
    }

    #[test]
    fn test_format_learning_rate_large_uses_exponent() {
        assert_eq!(format_learning_rate(1e16), "1e+16");
        assert_eq!(format_learning_rate(1e15), "1000000000000000.0");
    }

    #[test]
    fn test_run_name_scenario() {
        let config = RunConfig::new("v1", 1e-5, 256, 10);
        assert_eq!(config.run_name().as_str(), "v1_lr1e-05_bs256_ep10");
    }

    #[test]
    fn test_parse_round_trip() {
        let config = RunConfig::new("kg_base_prop_1_subevent_0_role_0", 3e-5, 1024, 50);
        assert_eq!(RunName::parse(config.run_name().as_str()).unwrap(), config);
    }

    #[test]
    fn test_parse_version_containing_separator() {
        let config = RunConfig::new("a_lrx_bs1_ep1", 0.01, 8, 2);
        assert_eq!(config.run_name().to_config().unwrap(), config);
    }

    #[test]
    fn test_try_from_keeps_spelling() {
        let name = RunName::try_from("v1_lr1e-5_bs256_ep10").unwrap();
        assert_eq!(name.as_str(), "v1_lr1e-5_bs256_ep10");
        assert_eq!(name.to_config().unwrap(), RunConfig::new("v1", 1e-5, 256, 10));
        assert!(RunName::try_from("v1").is_err());
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for bad in [
            "",
            "v1",
            "v1_lr1e-05_bs256",
            "v1_lrabc_bs256_ep10",
            "v1_lr0.1_bs-1_ep10",
            "_lr0.1_bs1_ep1",
        ] {
            let err = RunName::parse(bad).unwrap_err();
            assert!(matches!(err, Error::InvalidRunName { .. }), "{bad}: {err}");
        }
    }
}
