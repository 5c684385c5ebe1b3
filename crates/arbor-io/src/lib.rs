//! CSV ingestion and result export for arbor decision trees.

mod domain;
mod error;
mod reader;
mod writer;

pub use domain::{ExperimentName, FeatureTable, LabeledTable};
pub use error::IoError;
pub use reader::{CATEGORICAL_MAX_DISTINCT, TableReader};
pub use writer::{EvaluationReport, ResultWriter, render_rules};
