//! CSV table reader with feature-type inference.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use arbor_cart::{FeatureKind, FeatureSpec, Schema, Value};
use tracing::{debug, info, instrument};

use crate::IoError;
use crate::domain::{FeatureTable, LabeledTable};

/// A numeric column needs more distinct values than this to be inferred continuous.
pub const CATEGORICAL_MAX_DISTINCT: usize = 10;

/// Reads labeled tabular data from a CSV file.
///
/// Expected CSV format:
/// - Header row required, one name per column
/// - One column is the target (the last one unless [`with_target`](Self::with_target) says otherwise)
/// - Every other column is a feature
///
/// A feature column is inferred continuous when every cell parses as a
/// finite number and it has more than [`CATEGORICAL_MAX_DISTINCT`] distinct
/// values; otherwise it is categorical. Cells are trimmed.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`IoError::FileNotFound`] | File doesn't exist or is unreadable |
/// | [`IoError::CsvParse`] | Malformed CSV record |
/// | [`IoError::EmptyDataset`] | Zero data rows after header |
/// | [`IoError::NoFeatureColumns`] | Only the target column |
/// | [`IoError::MissingTargetColumn`] | Named target not in header |
/// | [`IoError::MissingColumn`] | A type override names an unknown column |
/// | [`IoError::InconsistentRowLength`] | Row has different column count than header |
/// | [`IoError::NonNumericValue`] | A column forced continuous holds a non-number |
pub struct TableReader {
    path: PathBuf,
    target: Option<String>,
    categorical: Vec<String>,
    continuous: Vec<String>,
}

/// Header and trimmed cells of a CSV file.
struct RawTable {
    header: Vec<String>,
    records: Vec<Vec<String>>,
}

impl TableReader {
    /// Create a new reader for the given CSV file path.
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            target: None,
            categorical: Vec::new(),
            continuous: Vec::new(),
        }
    }

    /// Use the named column as the target instead of the last column.
    #[must_use]
    pub fn with_target(mut self, column: impl Into<String>) -> Self {
        self.target = Some(column.into());
        self
    }

    /// Treat the named columns as categorical regardless of inference.
    #[must_use]
    pub fn with_categorical<S: Into<String>>(mut self, columns: impl IntoIterator<Item = S>) -> Self {
        self.categorical.extend(columns.into_iter().map(Into::into));
        self
    }

    /// Treat the named columns as continuous regardless of inference.
    #[must_use]
    pub fn with_continuous<S: Into<String>>(mut self, columns: impl IntoIterator<Item = S>) -> Self {
        self.continuous.extend(columns.into_iter().map(Into::into));
        self
    }

    /// Read and validate the CSV file, returning a [`LabeledTable`].
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn read(&self) -> Result<LabeledTable, IoError> {
        let raw = self.read_raw()?;
        let n_cols = raw.header.len();

        let target_index = match &self.target {
            Some(name) => raw
                .header
                .iter()
                .position(|h| h == name)
                .ok_or_else(|| IoError::MissingTargetColumn {
                    path: self.path.clone(),
                    column: name.clone(),
                })?,
            None => n_cols - 1,
        };
        if n_cols < 2 {
            return Err(IoError::NoFeatureColumns {
                path: self.path.clone(),
            });
        }
        for name in self.categorical.iter().chain(&self.continuous) {
            if !raw.header.contains(name) {
                return Err(IoError::MissingColumn {
                    path: self.path.clone(),
                    column: name.clone(),
                });
            }
        }

        let feature_columns: Vec<usize> = (0..n_cols).filter(|&c| c != target_index).collect();
        let features: Vec<FeatureSpec> = feature_columns
            .iter()
            .map(|&c| {
                let name = &raw.header[c];
                let kind = self.column_kind(name, raw.records.iter().map(|r| r[c].as_str()));
                debug!(column = %name, %kind, "feature type");
                FeatureSpec::new(name.clone(), kind)
            })
            .collect();

        let mut rows = Vec::with_capacity(raw.records.len());
        let mut labels = Vec::with_capacity(raw.records.len());
        for (row_index, record) in raw.records.iter().enumerate() {
            let row = feature_columns
                .iter()
                .zip(&features)
                .map(|(&c, spec)| self.parse_cell(&record[c], spec, row_index))
                .collect::<Result<Vec<Value>, IoError>>()?;
            rows.push(row);
            labels.push(record[target_index].clone());
        }

        let target = raw.header[target_index].clone();
        info!(
            n_samples = rows.len(),
            n_features = features.len(),
            target = %target,
            "labeled table loaded"
        );
        Ok(LabeledTable::new(&self.path, target, features, rows, labels))
    }

    /// Read feature columns by name and kind from `schema`, in schema order.
    ///
    /// The file may hold extra columns and any column order. Labels are
    /// returned when the target column (see [`with_target`](Self::with_target),
    /// no default here) is present.
    #[instrument(skip(self, schema), fields(path = %self.path.display()))]
    pub fn read_for(&self, schema: &Schema) -> Result<FeatureTable, IoError> {
        let raw = self.read_raw()?;

        let columns = schema
            .features()
            .iter()
            .map(|spec| {
                raw.header
                    .iter()
                    .position(|h| h == spec.name())
                    .ok_or_else(|| IoError::MissingColumn {
                        path: self.path.clone(),
                        column: spec.name().to_string(),
                    })
            })
            .collect::<Result<Vec<usize>, IoError>>()?;
        let target_index = self
            .target
            .as_ref()
            .and_then(|name| raw.header.iter().position(|h| h == name));

        let mut rows = Vec::with_capacity(raw.records.len());
        for (row_index, record) in raw.records.iter().enumerate() {
            let row = columns
                .iter()
                .zip(schema.features())
                .map(|(&c, spec)| self.parse_cell(&record[c], spec, row_index))
                .collect::<Result<Vec<Value>, IoError>>()?;
            rows.push(row);
        }
        let labels = target_index.map(|t| raw.records.iter().map(|r| r[t].clone()).collect());

        info!(n_samples = rows.len(), labeled = target_index.is_some(), "feature table loaded");
        Ok(FeatureTable { rows, labels })
    }

    fn read_raw(&self) -> Result<RawTable, IoError> {
        let file = std::fs::File::open(&self.path).map_err(|e| IoError::FileNotFound {
            path: self.path.clone(),
            source: e,
        })?;

        // flexible(true) so that InconsistentRowLength fires instead of a CsvParse error.
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(file);

        let header: Vec<String> = rdr
            .headers()
            .map_err(|e| self.csv_error(e))?
            .iter()
            .map(String::from)
            .collect();
        let expected = header.len();
        debug!(expected_cols = expected, "read CSV header");

        let mut records = Vec::new();
        for (row_index, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| self.csv_error(e))?;
            if record.len() != expected {
                return Err(IoError::InconsistentRowLength {
                    path: self.path.clone(),
                    row_index,
                    expected,
                    got: record.len(),
                });
            }
            records.push(record.iter().map(String::from).collect());
        }

        if records.is_empty() {
            return Err(IoError::EmptyDataset {
                path: self.path.clone(),
            });
        }
        Ok(RawTable { header, records })
    }

    fn csv_error(&self, e: csv::Error) -> IoError {
        IoError::CsvParse {
            path: self.path.clone(),
            offset: e.position().map_or(0, |p| p.byte()),
            source: e,
        }
    }

    fn column_kind<'a>(&self, name: &str, cells: impl Iterator<Item = &'a str>) -> FeatureKind {
        if self.categorical.iter().any(|c| c == name) {
            return FeatureKind::Categorical;
        }
        if self.continuous.iter().any(|c| c == name) {
            return FeatureKind::Continuous;
        }
        let mut distinct = HashSet::new();
        for cell in cells {
            if parse_finite(cell).is_none() {
                return FeatureKind::Categorical;
            }
            distinct.insert(cell);
        }
        if distinct.len() > CATEGORICAL_MAX_DISTINCT {
            FeatureKind::Continuous
        } else {
            FeatureKind::Categorical
        }
    }

    fn parse_cell(&self, raw: &str, spec: &FeatureSpec, row_index: usize) -> Result<Value, IoError> {
        match spec.kind() {
            FeatureKind::Categorical => Ok(Value::from(raw)),
            FeatureKind::Continuous => {
                parse_finite(raw)
                    .map(Value::from)
                    .ok_or_else(|| IoError::NonNumericValue {
                        path: self.path.clone(),
                        row_index,
                        column: spec.name().to_string(),
                        raw: raw.to_string(),
                    })
            }
        }
    }
}

fn parse_finite(raw: &str) -> Option<f64> {
    raw.parse::<f64>().ok().filter(|v| v.is_finite())
}
