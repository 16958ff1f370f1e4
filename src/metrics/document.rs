//! Metrics Document - `label: literal` records written by the evaluator

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Serialize;
use tracing::debug;

use super::Literal;
use crate::{Error, Result};

/// Label of the mapping that is flattened into result columns.
pub const AVERAGE_METRICS: &str = "average metrics";

/// Separator between a label and its value.
const SEPARATOR: &str = ": ";

/// Parsed metrics file: label -> literal value.
///
/// Every non-blank line must contain `": "`; the line is split at the
/// first occurrence, so labels cannot contain it while values may.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MetricsDocument {
    entries: BTreeMap<String, Literal>,
}

impl MetricsDocument {
    /// Parse a whole metrics file body.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MetricsParse`] with the 1-based line number of the
    /// first line that lacks the separator or holds an invalid literal.
    pub fn parse_str(text: &str) -> Result<Self> {
        let mut entries = BTreeMap::new();
        for (idx, line) in text.lines().enumerate() {
            let line_no = idx + 1;
            if line.trim().is_empty() {
                continue;
            }
            let (label, raw) = line.split_once(SEPARATOR).ok_or_else(|| {
                Error::metrics_parse(line_no, format!("missing '{SEPARATOR}' separator"))
            })?;
            let value = Literal::parse_line(raw, line_no)?;
            entries.insert(label.trim().to_string(), value);
        }
        Ok(Self { entries })
    }

    /// Read and parse a metrics file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the file cannot be read, or the errors of
    /// [`MetricsDocument::parse_str`].
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "reading metrics file");
        Self::parse_str(&fs::read_to_string(path)?)
    }

    /// Get the value stored under a label.
    #[must_use]
    pub fn get(&self, label: &str) -> Option<&Literal> {
        self.entries.get(label)
    }

    /// Iterate over labels in sorted order.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the document has no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Numeric entries of the [`AVERAGE_METRICS`] mapping.
    ///
    /// Non-numeric entries are dropped.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingAverageMetrics`] if the label is absent or
    /// its value is not a mapping.
    pub fn average_metrics(&self) -> Result<BTreeMap<String, f64>> {
        let map = self
            .get(AVERAGE_METRICS)
            .and_then(Literal::as_dict)
            .ok_or_else(|| Error::MissingAverageMetrics(AVERAGE_METRICS.to_string()))?;

        Ok(map
            .iter()
            .filter_map(|(key, value)| {
                let number = value.as_f64();
                if number.is_none() {
                    debug!(key = %key, "dropping non-numeric average metric");
                }
                number.map(|n| (key.clone(), n))
            })
            .collect())
    }
}

impl std::str::FromStr for MetricsDocument {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIMKGC_OUTPUT: &str = r#"forward metrics: {"mean_rank": 120.5, "mrr": 0.41, "hit@1": 0.3, "hit@3": 0.45, "hit@10": 0.6}
backward metrics: {"mean_rank": 98.0, "mrr": 0.47, "hit@1": 0.36, "hit@3": 0.5, "hit@10": 0.66}
average metrics: {"mean_rank": 109.25, "mrr": 0.44, "hit@1": 0.33, "hit@3": 0.475, "hit@10": 0.63}
"#;

    #[test]
    fn test_parse_evaluator_output() {
        let doc = MetricsDocument::parse_str(SIMKGC_OUTPUT).unwrap();
        assert_eq!(doc.len(), 3);
        assert_eq!(
            doc.labels().collect::<Vec<_>>(),
            vec!["average metrics", "backward metrics", "forward metrics"]
        );

        let avg = doc.average_metrics().unwrap();
        assert_eq!(avg.len(), 5);
        assert!((avg["mrr"] - 0.44).abs() < f64::EPSILON);
        assert!((avg["mean_rank"] - 109.25).abs() < f64::EPSILON);
    }

    #[test]
    fn test_parse_is_idempotent() {
        let first: MetricsDocument = SIMKGC_OUTPUT.parse().unwrap();
        let second: MetricsDocument = SIMKGC_OUTPUT.parse().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_value_may_contain_separator() {
        let doc = MetricsDocument::parse_str("note: 'a: b'\n").unwrap();
        assert_eq!(doc.get("note"), Some(&Literal::Str("a: b".into())));
    }

    #[test]
    fn test_blank_lines_skipped_and_crlf() {
        let doc = MetricsDocument::parse_str("\r\nx: 1\r\n\n  \ny: 2.0\r\n").unwrap();
        assert_eq!(doc.get("x"), Some(&Literal::Int(1)));
        assert_eq!(doc.get("y"), Some(&Literal::Float(2.0)));
    }

    #[test]
    fn test_missing_separator_reports_line() {
        let err = MetricsDocument::parse_str("x: 1\nbroken line\n").unwrap_err();
        assert!(matches!(err, Error::MetricsParse { line: 2, .. }), "{err}");
    }

    #[test]
    fn test_invalid_literal_reports_line() {
        let err = MetricsDocument::parse_str("x: 1\ny: 2\nz: os.system('x')\n").unwrap_err();
        assert!(matches!(err, Error::MetricsParse { line: 3, .. }), "{err}");
    }

    #[test]
    fn test_average_metrics_absent_or_not_mapping() {
        let doc = MetricsDocument::parse_str("forward metrics: {'mrr': 0.1}").unwrap();
        assert!(matches!(
            doc.average_metrics(),
            Err(Error::MissingAverageMetrics(_))
        ));

        let doc = MetricsDocument::parse_str("average metrics: [0.1, 0.2]").unwrap();
        assert!(matches!(
            doc.average_metrics(),
            Err(Error::MissingAverageMetrics(_))
        ));
    }

    #[test]
    fn test_average_metrics_drops_non_numeric() {
        let text = "average metrics: {'mrr': 0.5, 'model': 'bert', 'n': 3}";
        let doc = MetricsDocument::parse_str(text).unwrap();
        let avg = doc.average_metrics().unwrap();
        assert_eq!(avg.len(), 2);
        assert!((avg["n"] - 3.0).abs() < f64::EPSILON);
    }
}
