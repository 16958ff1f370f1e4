//! Sweep Grid - Cartesian product of the swept dimensions

use serde::Serialize;

use crate::experiment::RunConfig;

/// Resolved sweep dimensions.
///
/// Enumeration order is epoch outermost, then version, then learning rate,
/// then batch size. Order only affects launch sequencing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SweepGrid {
    versions: Vec<String>,
    learning_rates: Vec<f64>,
    batch_sizes: Vec<u32>,
    epochs: Vec<u32>,
}

impl SweepGrid {
    /// Create a grid from explicit dimension lists.
    #[must_use]
    pub fn new(
        versions: Vec<String>,
        learning_rates: Vec<f64>,
        batch_sizes: Vec<u32>,
        epochs: Vec<u32>,
    ) -> Self {
        Self {
            versions,
            learning_rates,
            batch_sizes,
            epochs,
        }
    }

    /// Dataset versions.
    #[must_use]
    pub fn versions(&self) -> &[String] {
        &self.versions
    }

    /// Learning rates.
    #[must_use]
    pub fn learning_rates(&self) -> &[f64] {
        &self.learning_rates
    }

    /// Batch sizes.
    #[must_use]
    pub fn batch_sizes(&self) -> &[u32] {
        &self.batch_sizes
    }

    /// Epoch counts.
    #[must_use]
    pub fn epochs(&self) -> &[u32] {
        &self.epochs
    }

    /// Number of configs, the product of the dimension lengths.
    #[must_use]
    pub fn len(&self) -> usize {
        self.versions.len() * self.learning_rates.len() * self.batch_sizes.len() * self.epochs.len()
    }

    /// Check if any dimension is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Lazily enumerate every config of the grid.
    pub fn configs(&self) -> impl Iterator<Item = RunConfig> + '_ {
        self.epochs.iter().flat_map(move |&epochs| {
            self.versions.iter().flat_map(move |version| {
                self.learning_rates.iter().flat_map(move |&lr| {
                    self.batch_sizes.iter().map(move |&batch_size| {
                        RunConfig::new(version.as_str(), lr, batch_size, epochs)
                    })
                })
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_order_epoch_outermost() {
        let grid = SweepGrid::new(
            vec!["a".into(), "b".into()],
            vec![1e-5, 3e-5],
            vec![256],
            vec![1, 10],
        );
        let names: Vec<String> = grid.configs().map(|c| c.run_name().to_string()).collect();
        assert_eq!(
            names,
            vec![
                "a_lr1e-05_bs256_ep1",
                "a_lr3e-05_bs256_ep1",
                "b_lr1e-05_bs256_ep1",
                "b_lr3e-05_bs256_ep1",
                "a_lr1e-05_bs256_ep10",
                "a_lr3e-05_bs256_ep10",
                "b_lr1e-05_bs256_ep10",
                "b_lr3e-05_bs256_ep10",
            ]
        );
        assert_eq!(grid.len(), 8);
    }

    #[test]
    fn test_empty_dimension_yields_nothing() {
        let grid = SweepGrid::new(vec!["a".into()], vec![], vec![256], vec![1]);
        assert!(grid.is_empty());
        assert_eq!(grid.configs().count(), 0);
    }
}
