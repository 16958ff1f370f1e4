//! Grouped run counts per dimension

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use arrow::array::{ArrayRef, StringArray, UInt64Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use arrow::util::pretty::pretty_format_batches;

use super::ResultsTable;
use crate::experiment::{format_learning_rate, RunRecord};
use crate::{Error, Result};

/// Label for rows that have no value in a dimension.
pub const MISSING_LABEL: &str = "-";

/// A dimension runs can be grouped by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dimension {
    /// Proportion level of the dataset version
    Prop,
    /// Sub-event level of the dataset version
    Subevent,
    /// Role level of the dataset version
    Role,
    /// Causation level of the dataset version
    Causation,
    /// Learning rate
    LearningRate,
    /// Epoch count
    Epoch,
    /// Batch size
    BatchSize,
}

impl Dimension {
    /// Dimensions decoded from the dataset version.
    pub const CATEGORICAL: [Self; 4] = [Self::Prop, Self::Subevent, Self::Role, Self::Causation];

    /// Swept hyperparameters.
    pub const SWEPT: [Self; 3] = [Self::LearningRate, Self::Epoch, Self::BatchSize];

    /// Every dimension, categorical first.
    pub const ALL: [Self; 7] = [
        Self::Prop,
        Self::Subevent,
        Self::Role,
        Self::Causation,
        Self::LearningRate,
        Self::Epoch,
        Self::BatchSize,
    ];

    /// Column name of the dimension.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Prop => "prop",
            Self::Subevent => "subevent",
            Self::Role => "role",
            Self::Causation => "causation",
            Self::LearningRate => "lr",
            Self::Epoch => "epoch",
            Self::BatchSize => "batch_size",
        }
    }

    fn value(self, record: &RunRecord) -> Option<f64> {
        let config = record.config();
        let fields = record.version_fields();
        match self {
            Self::Prop => fields.map(|v| f64::from(v.prop)),
            Self::Subevent => fields.map(|v| f64::from(v.subevent)),
            Self::Role => fields.map(|v| f64::from(v.role)),
            Self::Causation => fields.map(|v| f64::from(v.causation)),
            Self::LearningRate => Some(config.learning_rate()),
            Self::Epoch => Some(f64::from(config.epochs())),
            Self::BatchSize => Some(f64::from(config.batch_size())),
        }
    }

    fn label(self, value: f64) -> String {
        match self {
            Self::LearningRate => format_learning_rate(value),
            _ => format!("{value}"),
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Dimension {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|d| d.name() == s)
            .ok_or_else(|| Error::Table(format!("unknown dimension '{s}'")))
    }
}

/// Number of runs sharing one value of a dimension.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupCount {
    /// Rendered value, [`MISSING_LABEL`] for runs without one
    pub label: String,
    /// Number of runs
    pub count: u64,
}

impl ResultsTable {
    /// Count rows per value of `dimension`, in ascending value order.
    /// Rows without a value are counted last under [`MISSING_LABEL`].
    #[must_use]
    pub fn group_counts(&self, dimension: Dimension) -> Vec<GroupCount> {
        let mut groups: Vec<(f64, u64)> = Vec::new();
        let mut missing = 0;

        for value in self.rows().iter().map(|r| dimension.value(r)) {
            let Some(value) = value else {
                missing += 1;
                continue;
            };
            let existing = groups.iter_mut().find(|(v, _)| v.total_cmp(&value).is_eq());
            match existing {
                Some((_, count)) => *count += 1,
                None => groups.push((value, 1)),
            }
        }
        groups.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut counts: Vec<GroupCount> = groups
            .into_iter()
            .map(|(value, count)| GroupCount {
                label: dimension.label(value),
                count,
            })
            .collect();
        if missing > 0 {
            counts.push(GroupCount {
                label: MISSING_LABEL.to_string(),
                count: missing,
            });
        }
        counts
    }

    /// Grouped counts as a two-column batch: the dimension and `count`.
    ///
    /// # Errors
    ///
    /// Returns an error if the batch cannot be assembled.
    pub fn group_counts_batch(&self, dimension: Dimension) -> Result<RecordBatch> {
        let counts = self.group_counts(dimension);
        let schema = Schema::new(vec![
            Field::new(dimension.name(), DataType::Utf8, false),
            Field::new("count", DataType::UInt64, false),
        ]);
        let labels = StringArray::from_iter_values(counts.iter().map(|g| g.label.as_str()));
        let totals = UInt64Array::from_iter_values(counts.iter().map(|g| g.count));
        let columns: Vec<ArrayRef> = vec![Arc::new(labels), Arc::new(totals)];
        Ok(RecordBatch::try_new(Arc::new(schema), columns)?)
    }

    /// Render the grouped counts of each dimension as text tables.
    ///
    /// # Errors
    ///
    /// Returns an error if a table cannot be formatted.
    pub fn format_group_counts(&self, dimensions: &[Dimension]) -> Result<String> {
        let mut out = String::new();
        for &dimension in dimensions {
            let batch = self.group_counts_batch(dimension)?;
            out.push_str(&pretty_format_batches(&[batch])?.to_string());
            out.push('\n');
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::experiment::{RunConfig, VersionFields};

    fn record(version: &str, lr: f64, epochs: u32) -> RunRecord {
        let config = RunConfig::new(version, lr, 256, epochs);
        RunRecord::builder(config.run_name(), config.clone(), "out")
            .version_fields(VersionFields::parse(version).ok())
            .build()
    }

    fn group(label: &str, count: u64) -> GroupCount {
        GroupCount {
            label: label.to_string(),
            count,
        }
    }

    fn narrative(role: u32) -> String {
        format!("kg_base_prop_1_subevent_0_role_{role}_causation_1_syntax_simple_rdf_prop")
    }

    #[test]
    fn test_counts_sorted_numerically() {
        let table = ResultsTable::from_records(vec![
            record("v1", 1e-5, 50),
            record("v1", 1e-5, 10),
            record("v2", 3e-5, 10),
            record("v2", 1e-5, 1),
        ]);

        let epochs = table.group_counts(Dimension::Epoch);
        let labels: Vec<&str> = epochs.iter().map(|g| g.label.as_str()).collect();
        assert_eq!(labels, ["1", "10", "50"]);
        assert_eq!(epochs[1].count, 2);

        let lrs = table.group_counts(Dimension::LearningRate);
        assert_eq!(lrs[0], group("1e-05", 3));
        assert_eq!(lrs[1], group("3e-05", 1));
    }

    #[test]
    fn test_missing_categorical_counted_last() {
        let table = ResultsTable::from_records(vec![
            record(&narrative(0), 1e-5, 1),
            record(&narrative(2), 1e-5, 1),
            record(&narrative(0), 3e-5, 1),
            record("v1", 1e-5, 1),
        ]);
        let roles = table.group_counts(Dimension::Role);
        assert_eq!(
            roles,
            vec![group("0", 2), group("2", 1), group(MISSING_LABEL, 1)]
        );
    }

    #[test]
    fn test_format_group_counts() {
        let table = ResultsTable::from_records(vec![record("v1", 1e-5, 10)]);
        let text = table.format_group_counts(&Dimension::SWEPT).unwrap();
        assert!(text.contains("| lr "));
        assert!(text.contains("| batch_size |"));
        assert!(text.contains("1e-05"));
    }

    #[test]
    fn test_dimension_from_str() {
        for dimension in Dimension::ALL {
            assert_eq!(dimension.name().parse::<Dimension>().unwrap(), dimension);
        }
        assert!("syntax".parse::<Dimension>().is_err());
    }
}
