//! Run Config - one point of the hyperparameter grid

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// One configuration of the sweep.
///
/// Identity is the whole tuple: two configs with equal fields describe the
/// same run and map to the same output directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    version: String,
    learning_rate: f64,
    batch_size: u32,
    epochs: u32,
}

impl RunConfig {
    /// Create a new run config.
    ///
    /// # Arguments
    ///
    /// * `version` - Dataset version (directory name under the dataset root)
    /// * `learning_rate` - Optimizer learning rate
    /// * `batch_size` - Training batch size
    /// * `epochs` - Number of training epochs
    #[must_use]
    pub fn new(
        version: impl Into<String>,
        learning_rate: f64,
        batch_size: u32,
        epochs: u32,
    ) -> Self {
        Self {
            version: version.into(),
            learning_rate,
            batch_size,
            epochs,
        }
    }

    /// Get the dataset version.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Get the learning rate.
    #[must_use]
    pub const fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    /// Get the batch size.
    #[must_use]
    pub const fn batch_size(&self) -> u32 {
        self.batch_size
    }

    /// Get the epoch count.
    #[must_use]
    pub const fn epochs(&self) -> u32 {
        self.epochs
    }

    /// Check that the config can be handed to the trainer.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for an empty version, a learning rate that
    /// is not positive and finite, or a zero batch size or epoch count.
    pub fn validate(&self) -> Result<()> {
        if self.version.is_empty() {
            return Err(Error::Config("dataset version must not be empty".to_string()));
        }
        check_learning_rate(self.learning_rate)?;
        check_batch_size(self.batch_size)?;
        check_epochs(self.epochs)
    }
}

pub(crate) fn check_learning_rate(lr: f64) -> Result<()> {
    if lr.is_finite() && lr > 0.0 {
        Ok(())
    } else {
        Err(Error::Config(format!("learning rate must be positive and finite, got {lr}")))
    }
}

pub(crate) fn check_batch_size(batch_size: u32) -> Result<()> {
    if batch_size == 0 {
        return Err(Error::Config("batch size must be positive".to_string()));
    }
    Ok(())
}

pub(crate) fn check_epochs(epochs: u32) -> Result<()> {
    if epochs == 0 {
        return Err(Error::Config("epoch count must be positive".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_config_new() {
        let config = RunConfig::new("v1", 1e-5, 256, 10);
        assert_eq!(config.version(), "v1");
        assert!((config.learning_rate() - 1e-5).abs() < f64::EPSILON);
        assert_eq!(config.batch_size(), 256);
        assert_eq!(config.epochs(), 10);
    }

    #[test]
    fn test_run_config_identity_is_tuple() {
        assert_eq!(
            RunConfig::new("v1", 3e-5, 512, 1),
            RunConfig::new("v1", 3e-5, 512, 1)
        );
        assert_ne!(
            RunConfig::new("v1", 3e-5, 512, 1),
            RunConfig::new("v1", 3e-5, 512, 10)
        );
    }

    #[test]
    fn test_validate_accepts_sweep_values() {
        assert!(RunConfig::new("v1", 1e-5, 256, 10).validate().is_ok());
        assert!(RunConfig::new("v1", 1.0, 1, 1).validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_unusable_values() {
        for config in [
            RunConfig::new("", 1e-5, 256, 10),
            RunConfig::new("v1", 0.0, 256, 10),
            RunConfig::new("v1", -1e-5, 256, 10),
            RunConfig::new("v1", f64::NAN, 256, 10),
            RunConfig::new("v1", f64::INFINITY, 256, 10),
            RunConfig::new("v1", 1e-5, 0, 10),
            RunConfig::new("v1", 1e-5, 256, 0),
        ] {
            let err = config.validate().unwrap_err();
            assert!(matches!(err, Error::Config(_)), "{err}");
        }
    }
}
