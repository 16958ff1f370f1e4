//! Metrics file parsing
//!
//! The evaluator writes one record per line, `label: value`, where the
//! value is a Python or JSON literal:
//!
//! ```text
//! forward metrics: {"mean_rank": 120.5, "mrr": 0.41, "hit@1": 0.3}
//! average metrics: {"mean_rank": 109.25, "mrr": 0.44, "hit@1": 0.33}
//! ```
//!
//! Values are read with a small literal grammar ([`Literal`]); anything
//! that is not plain data is a parse error.

mod document;
mod literal;

pub use document::{MetricsDocument, AVERAGE_METRICS};
pub use literal::Literal;
