//! Results table: one row per discovered run, exported through Arrow

use std::collections::BTreeSet;
use std::fs::{self, File};
use std::path::Path;
use std::sync::Arc;

use arrow::array::{ArrayRef, BooleanArray, Float64Array, StringArray, UInt32Array};
use arrow::csv::WriterBuilder;
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use tracing::info;

use crate::experiment::{
    ExperimentStore, RunFilter, RunRecord, Scan, SkippedRun, VersionFields,
};
use crate::Result;

/// Fixed leading columns, in output order.
pub const FIXED_COLUMNS: [&str; 12] = [
    "exp",
    "version",
    "prop",
    "subevent",
    "role",
    "causation",
    "syntax",
    "lr",
    "batch_size",
    "epoch",
    "finished",
    "has_eval",
];

/// Aggregated view of every run under an output root.
#[derive(Debug, Clone, Default)]
pub struct ResultsTable {
    records: Vec<RunRecord>,
    metric_keys: Vec<String>,
    skipped: Vec<SkippedRun>,
}

impl ResultsTable {
    /// Scan `store` and build the table.
    ///
    /// # Errors
    ///
    /// Returns an error if the output root cannot be listed.
    pub fn aggregate(store: &ExperimentStore, filter: &RunFilter) -> Result<Self> {
        let table = Self::from_scan(store.scan(filter)?);
        info!(
            runs = table.len(),
            evaluated = table.evaluated_count(),
            skipped = table.skipped.len(),
            "aggregated results"
        );
        Ok(table)
    }

    /// Build a table from a finished scan.
    #[must_use]
    pub fn from_scan(scan: Scan) -> Self {
        let mut table = Self::from_records(scan.records);
        table.skipped = scan.skipped;
        table
    }

    /// Build a table from records. Rows are sorted by run name.
    #[must_use]
    pub fn from_records(mut records: Vec<RunRecord>) -> Self {
        records.sort_by(|a, b| a.name().cmp(b.name()));
        let metric_keys: BTreeSet<&String> = records
            .iter()
            .filter_map(RunRecord::metrics)
            .flat_map(|m| m.keys())
            .collect();
        let metric_keys = metric_keys.into_iter().cloned().collect();
        Self {
            records,
            metric_keys,
            skipped: Vec::new(),
        }
    }

    /// Rows, sorted by run name.
    #[must_use]
    pub fn rows(&self) -> &[RunRecord] {
        &self.records
    }

    /// Union of metric keys over all rows, sorted.
    #[must_use]
    pub fn metric_keys(&self) -> &[String] {
        &self.metric_keys
    }

    /// Directories excluded because their names did not parse.
    #[must_use]
    pub fn skipped(&self) -> &[SkippedRun] {
        &self.skipped
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if the table has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Rows with a model artifact.
    #[must_use]
    pub fn finished_count(&self) -> usize {
        self.records.iter().filter(|r| r.finished()).count()
    }

    /// Rows with parsed metrics.
    #[must_use]
    pub fn evaluated_count(&self) -> usize {
        self.records
            .iter()
            .filter(|r| r.metrics().is_some())
            .count()
    }

    /// Column names of the metric keys, in [`ResultsTable::metric_keys`]
    /// order.
    ///
    /// A key that collides with a fixed column is prefixed with `metrics.`,
    /// repeatedly if the prefixed name is itself a metric key, so every
    /// header is unique: keys `epoch` and `metrics.epoch` become
    /// `metrics.metrics.epoch` and `metrics.epoch`.
    #[must_use]
    pub fn metric_columns(&self) -> Vec<String> {
        let mut taken: BTreeSet<&str> = FIXED_COLUMNS.into_iter().collect();
        taken.extend(self.metric_keys.iter().map(String::as_str));

        self.metric_keys
            .iter()
            .map(|key| {
                if !FIXED_COLUMNS.contains(&key.as_str()) {
                    return key.clone();
                }
                let mut column = format!("metrics.{key}");
                while taken.contains(column.as_str()) {
                    column = format!("metrics.{column}");
                }
                column
            })
            .collect()
    }

    /// Convert the table to a single Arrow batch.
    ///
    /// Version fields and metrics are nullable; a run without metrics has
    /// nulls in every metric column.
    ///
    /// # Errors
    ///
    /// Returns an error if the batch cannot be assembled.
    pub fn to_record_batch(&self) -> Result<RecordBatch> {
        let rows = &self.records;
        let field_of = |f: fn(&VersionFields) -> u32| -> ArrayRef {
            Arc::new(UInt32Array::from(
                rows.iter()
                    .map(|r| r.version_fields().map(f))
                    .collect::<Vec<_>>(),
            ))
        };

        let mut fields = vec![
            Field::new("exp", DataType::Utf8, false),
            Field::new("version", DataType::Utf8, false),
            Field::new("prop", DataType::UInt32, true),
            Field::new("subevent", DataType::UInt32, true),
            Field::new("role", DataType::UInt32, true),
            Field::new("causation", DataType::UInt32, true),
            Field::new("syntax", DataType::Utf8, true),
            Field::new("lr", DataType::Float64, false),
            Field::new("batch_size", DataType::UInt32, false),
            Field::new("epoch", DataType::UInt32, false),
            Field::new("finished", DataType::Boolean, false),
            Field::new("has_eval", DataType::Boolean, false),
        ];
        let mut columns: Vec<ArrayRef> = vec![
            Arc::new(StringArray::from_iter_values(
                rows.iter().map(|r| r.name().as_str()),
            )),
            Arc::new(StringArray::from_iter_values(
                rows.iter().map(|r| r.config().version()),
            )),
            field_of(|v| v.prop),
            field_of(|v| v.subevent),
            field_of(|v| v.role),
            field_of(|v| v.causation),
            Arc::new(StringArray::from(
                rows.iter()
                    .map(|r| r.version_fields().map(VersionFields::display_syntax))
                    .collect::<Vec<_>>(),
            )),
            Arc::new(Float64Array::from_iter_values(
                rows.iter().map(|r| r.config().learning_rate()),
            )),
            Arc::new(UInt32Array::from_iter_values(
                rows.iter().map(|r| r.config().batch_size()),
            )),
            Arc::new(UInt32Array::from_iter_values(
                rows.iter().map(|r| r.config().epochs()),
            )),
            Arc::new(BooleanArray::from(
                rows.iter().map(RunRecord::finished).collect::<Vec<_>>(),
            )),
            Arc::new(BooleanArray::from(
                rows.iter().map(RunRecord::has_eval).collect::<Vec<_>>(),
            )),
        ];

        for (key, column) in self.metric_keys.iter().zip(self.metric_columns()) {
            fields.push(Field::new(column, DataType::Float64, true));
            let values: Vec<Option<f64>> = rows
                .iter()
                .map(|r| r.metrics().and_then(|m| m.get(key)).copied())
                .collect();
            columns.push(Arc::new(Float64Array::from(values)));
        }

        let schema = Arc::new(Schema::new(fields));
        Ok(RecordBatch::try_new(schema, columns)?)
    }

    /// Write the table as CSV with a header row, creating parent
    /// directories. Nulls are written as empty cells.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created or written.
    pub fn write_csv(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let batch = self.to_record_batch()?;
        let mut writer = WriterBuilder::new()
            .with_header(true)
            .build(File::create(path)?);
        writer.write(&batch)?;

        info!(path = %path.display(), rows = batch.num_rows(), "wrote results");
        Ok(())
    }
}
