//! Domain types for arbor-io.

use std::path::{Path, PathBuf};

use arbor_cart::{Dataset, FeatureSpec, Value};

use crate::IoError;

/// A validated experiment name for output file naming.
///
/// Must match `[a-zA-Z0-9_-]+`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExperimentName(String);

impl ExperimentName {
    /// Parse and validate an experiment name.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::InvalidExperimentName`] if the name is empty or
    /// contains characters outside `[a-zA-Z0-9_-]`.
    pub fn new(name: String) -> Result<Self, IoError> {
        let valid = !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(IoError::InvalidExperimentName { name });
        }
        Ok(Self(name))
    }

    /// Return the experiment name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ExperimentName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A labeled table read from CSV, with one [`FeatureSpec`] per feature column.
///
/// Produced by [`TableReader::read`](crate::TableReader::read). `rows[i]`
/// is labeled `labels[i]`.
#[derive(Debug, Clone)]
pub struct LabeledTable {
    path: PathBuf,
    target: String,
    features: Vec<FeatureSpec>,
    rows: Vec<Vec<Value>>,
    labels: Vec<String>,
}

impl LabeledTable {
    pub(crate) fn new(
        path: &Path,
        target: String,
        features: Vec<FeatureSpec>,
        rows: Vec<Vec<Value>>,
        labels: Vec<String>,
    ) -> Self {
        Self {
            path: path.to_path_buf(),
            target,
            features,
            rows,
            labels,
        }
    }

    /// Return the name of the target column.
    #[must_use]
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Return the inferred or forced feature specs, in column order.
    #[must_use]
    pub fn features(&self) -> &[FeatureSpec] {
        &self.features
    }

    /// Return the feature rows.
    #[must_use]
    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    /// Return the raw labels.
    #[must_use]
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Return the number of data rows.
    #[must_use]
    pub fn n_samples(&self) -> usize {
        self.rows.len()
    }

    /// Validate into a [`Dataset`] with a sorted class list.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::InvalidDataset`] wrapping the validation error.
    pub fn into_dataset(self) -> Result<Dataset, IoError> {
        Dataset::new(self.rows, &self.labels, self.features)
            .map_err(|source| IoError::InvalidDataset { path: self.path, source })
    }
}

/// Feature rows read against an existing schema, labels optional.
///
/// Produced by [`TableReader::read_for`](crate::TableReader::read_for).
#[derive(Debug, Clone)]
pub struct FeatureTable {
    /// Feature rows in schema column order.
    pub rows: Vec<Vec<Value>>,
    /// Raw labels, when the file has the target column.
    pub labels: Option<Vec<String>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn experiment_name_valid() {
        let name = ExperimentName::new("churn-model_01".to_string()).unwrap();
        assert_eq!(name.as_str(), "churn-model_01");
        assert_eq!(name.to_string(), "churn-model_01");
    }

    #[test]
    fn experiment_name_rejects_empty() {
        let name = ExperimentName::new(String::new());
        assert!(matches!(name, Err(IoError::InvalidExperimentName { .. })));
    }

    #[test]
    fn experiment_name_rejects_special_chars() {
        let name = ExperimentName::new("my model!".to_string());
        assert!(matches!(name, Err(IoError::InvalidExperimentName { .. })));
    }

    #[test]
    fn invalid_table_wraps_cart_error() {
        let table = LabeledTable::new(
            Path::new("t.csv"),
            "y".into(),
            vec![FeatureSpec::continuous("x")],
            vec![vec![Value::from(1.0)], vec![Value::from(2.0)]],
            vec!["a".into()],
        );
        let err = table.into_dataset().unwrap_err();
        assert!(matches!(err, IoError::InvalidDataset { .. }));
    }
}
