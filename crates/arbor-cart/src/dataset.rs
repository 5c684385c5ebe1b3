//! Validated training data: feature schema, typed columns, encoded labels.

use std::collections::HashMap;
use std::fmt;

use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, instrument};

use crate::error::CartError;

/// Upper bound on distinct categories per categorical feature.
///
/// Categorical split search enumerates 2^(k-1) - 1 bipartitions, so the
/// bound keeps one search under about half a million candidates.
pub const MAX_CATEGORIES: usize = 20;

/// A single feature value of a sample.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum Value {
    /// A continuous measurement.
    Number(f64),
    /// A categorical level.
    Category(String),
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Number(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Category(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Category(value)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(v) => write!(f, "{v}"),
            Value::Category(c) => f.write_str(c),
        }
    }
}

/// Whether a feature is split by threshold or by category sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum FeatureKind {
    /// Numeric feature, split at a threshold.
    Continuous,
    /// Nominal feature, split into two category groups.
    Categorical,
}

impl FeatureKind {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            FeatureKind::Continuous => "continuous",
            FeatureKind::Categorical => "categorical",
        }
    }
}

impl fmt::Display for FeatureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Name and kind of one feature column.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct FeatureSpec {
    name: String,
    kind: FeatureKind,
}

impl FeatureSpec {
    /// Create a feature spec.
    pub fn new(name: impl Into<String>, kind: FeatureKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    /// Shorthand for a continuous feature.
    pub fn continuous(name: impl Into<String>) -> Self {
        Self::new(name, FeatureKind::Continuous)
    }

    /// Shorthand for a categorical feature.
    pub fn categorical(name: impl Into<String>) -> Self {
        Self::new(name, FeatureKind::Categorical)
    }

    /// Return the feature name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Return the feature kind.
    #[must_use]
    pub fn kind(&self) -> FeatureKind {
        self.kind
    }
}

/// Feature metadata and the ordered class list shared by a dataset and its trees.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Schema {
    features: Vec<FeatureSpec>,
    classes: Vec<String>,
}

impl Schema {
    /// Return the feature specs in column order.
    #[must_use]
    pub fn features(&self) -> &[FeatureSpec] {
        &self.features
    }

    /// Return the class names; class index `i` is `classes()[i]`.
    #[must_use]
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    /// Return the number of feature columns.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.features.len()
    }

    /// Return the number of classes.
    #[must_use]
    pub fn n_classes(&self) -> usize {
        self.classes.len()
    }

    /// Return the feature names in column order.
    #[must_use]
    pub fn feature_names(&self) -> Vec<&str> {
        self.features.iter().map(FeatureSpec::name).collect()
    }

    /// Look up the index of a class by name.
    #[must_use]
    pub fn class_index(&self, name: &str) -> Option<usize> {
        self.classes.iter().position(|c| c == name)
    }

    /// Return the name of a class index.
    #[must_use]
    pub fn class_name(&self, class: usize) -> Option<&str> {
        self.classes.get(class).map(String::as_str)
    }

    pub(crate) fn feature(&self, feature: usize) -> Result<&FeatureSpec, CartError> {
        self.features.get(feature).ok_or(CartError::UnknownFeature {
            feature,
            n_features: self.features.len(),
        })
    }
}

/// Column-major storage of one feature.
#[derive(Debug, Clone)]
pub(crate) enum Column {
    Continuous(Vec<f64>),
    Categorical {
        codes: Vec<usize>,
        vocabulary: Vec<String>,
    },
}

/// A validated labeled dataset.
///
/// Rows are kept as given (row-major, for prediction and export) together
/// with a column-major copy used by split search. Labels are encoded as
/// indices into [`Schema::classes`], which is sorted by name unless the
/// caller supplies its own order through [`Dataset::with_classes`].
#[derive(Debug, Clone)]
pub struct Dataset {
    schema: Schema,
    rows: Vec<Vec<Value>>,
    labels: Vec<usize>,
    columns: Vec<Column>,
}

impl Dataset {
    /// Validate rows and labels against the feature specs.
    ///
    /// # Errors
    ///
    /// | Variant                             | When                                           |
    /// |-------------------------------------|------------------------------------------------|
    /// | [`CartError::EmptyDataset`]         | `rows` is empty                                |
    /// | [`CartError::ZeroFeatures`]         | `features` is empty                            |
    /// | [`CartError::LabelCountMismatch`]   | `labels.len() != rows.len()`                   |
    /// | [`CartError::FeatureCountMismatch`] | a row's length differs from `features.len()`   |
    /// | [`CartError::ValueKindMismatch`]    | a value's kind differs from its feature's kind |
    /// | [`CartError::NonFiniteValue`]       | a continuous value is NaN or infinite          |
    /// | [`CartError::TooManyCategories`]    | a categorical feature exceeds [`MAX_CATEGORIES`] |
    #[instrument(skip_all, fields(n_samples = rows.len(), n_features = features.len()))]
    pub fn new<S: AsRef<str>>(
        rows: Vec<Vec<Value>>,
        labels: &[S],
        features: Vec<FeatureSpec>,
    ) -> Result<Self, CartError> {
        validate_rows(&rows, labels.len(), &features)?;

        let mut classes: Vec<String> = labels.iter().map(|l| l.as_ref().to_string()).collect();
        classes.sort();
        classes.dedup();
        Self::assemble(rows, labels, features, classes)
    }

    /// Like [`Dataset::new`], but with a caller-supplied ordered class list.
    ///
    /// Classes listed here need not occur in `labels`, so a dataset can keep
    /// the class list of a larger corpus it was drawn from.
    ///
    /// # Errors
    ///
    /// Any error of [`Dataset::new`], plus:
    ///
    /// | Variant                       | When                                   |
    /// |-------------------------------|----------------------------------------|
    /// | [`CartError::DuplicateClass`] | a class name appears twice in `classes` |
    /// | [`CartError::UnknownLabel`]   | a label is not in `classes`            |
    pub fn with_classes<S: AsRef<str>>(
        rows: Vec<Vec<Value>>,
        labels: &[S],
        features: Vec<FeatureSpec>,
        classes: Vec<String>,
    ) -> Result<Self, CartError> {
        validate_rows(&rows, labels.len(), &features)?;
        for (i, class) in classes.iter().enumerate() {
            if classes[..i].contains(class) {
                return Err(CartError::DuplicateClass {
                    class: class.clone(),
                });
            }
        }
        Self::assemble(rows, labels, features, classes)
    }

    fn assemble<S: AsRef<str>>(
        rows: Vec<Vec<Value>>,
        labels: &[S],
        features: Vec<FeatureSpec>,
        classes: Vec<String>,
    ) -> Result<Self, CartError> {
        let class_lookup: HashMap<&str, usize> = classes
            .iter()
            .enumerate()
            .map(|(i, c)| (c.as_str(), i))
            .collect();
        let encoded = labels
            .iter()
            .enumerate()
            .map(|(sample_index, l)| {
                class_lookup
                    .get(l.as_ref())
                    .copied()
                    .ok_or_else(|| CartError::UnknownLabel {
                        label: l.as_ref().to_string(),
                        sample_index,
                    })
            })
            .collect::<Result<Vec<usize>, CartError>>()?;

        let columns = build_columns(&rows, &features)?;

        debug!(n_classes = classes.len(), "dataset validated");

        Ok(Self {
            schema: Schema { features, classes },
            rows,
            labels: encoded,
            columns,
        })
    }

    /// Return the schema.
    #[must_use]
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Return the sample rows (row-major).
    #[must_use]
    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    /// Return the encoded labels.
    #[must_use]
    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    /// Return the number of samples.
    #[must_use]
    pub fn n_samples(&self) -> usize {
        self.rows.len()
    }

    pub(crate) fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Shuffle with a seeded RNG and split into `(train, test)`.
    ///
    /// The train part holds `floor(n * train_fraction)` samples. Both parts
    /// share this dataset's schema, so class indices stay comparable.
    ///
    /// # Errors
    ///
    /// | Variant                              | When                                  |
    /// |--------------------------------------|---------------------------------------|
    /// | [`CartError::InvalidTrainFraction`]  | fraction not in (0.0, 1.0)            |
    /// | [`CartError::EmptyDataset`]          | either part would hold zero samples   |
    #[instrument(skip(self), fields(n_samples = self.n_samples()))]
    pub fn train_test_split(
        &self,
        train_fraction: f64,
        seed: u64,
    ) -> Result<(Dataset, Dataset), CartError> {
        if !(train_fraction > 0.0 && train_fraction < 1.0) {
            return Err(CartError::InvalidTrainFraction {
                fraction: train_fraction,
            });
        }
        let n = self.n_samples();
        let mut indices: Vec<usize> = (0..n).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        indices.shuffle(&mut rng);

        let n_train = (n as f64 * train_fraction).floor() as usize;
        if n_train == 0 || n_train == n {
            return Err(CartError::EmptyDataset);
        }
        let (train_idx, test_idx) = indices.split_at(n_train);
        debug!(n_train, n_test = test_idx.len(), "dataset split");
        Ok((self.subset(train_idx), self.subset(test_idx)))
    }

    /// Build a dataset from a subset of rows, keeping the schema and vocabularies.
    fn subset(&self, indices: &[usize]) -> Dataset {
        let columns = self
            .columns
            .iter()
            .map(|column| match column {
                Column::Continuous(values) => {
                    Column::Continuous(indices.iter().map(|&i| values[i]).collect())
                }
                Column::Categorical { codes, vocabulary } => Column::Categorical {
                    codes: indices.iter().map(|&i| codes[i]).collect(),
                    vocabulary: vocabulary.clone(),
                },
            })
            .collect();
        Dataset {
            schema: self.schema.clone(),
            rows: indices.iter().map(|&i| self.rows[i].clone()).collect(),
            labels: indices.iter().map(|&i| self.labels[i]).collect(),
            columns,
        }
    }
}

/// Check shape, value kinds, and finiteness.
fn validate_rows(rows: &[Vec<Value>], n_labels: usize, features: &[FeatureSpec]) -> Result<(), CartError> {
    if rows.is_empty() {
        return Err(CartError::EmptyDataset);
    }
    if features.is_empty() {
        return Err(CartError::ZeroFeatures);
    }
    if n_labels != rows.len() {
        return Err(CartError::LabelCountMismatch {
            n_samples: rows.len(),
            n_labels,
        });
    }
    let n_features = features.len();
    for (sample_index, row) in rows.iter().enumerate() {
        if row.len() != n_features {
            return Err(CartError::FeatureCountMismatch {
                expected: n_features,
                got: row.len(),
                sample_index,
            });
        }
        for (feature_index, (value, spec)) in row.iter().zip(features).enumerate() {
            match (value, spec.kind) {
                (Value::Number(v), FeatureKind::Continuous) => {
                    if !v.is_finite() {
                        return Err(CartError::NonFiniteValue {
                            sample_index,
                            feature_index,
                        });
                    }
                }
                (Value::Category(_), FeatureKind::Categorical) => {}
                _ => {
                    return Err(CartError::ValueKindMismatch {
                        feature: spec.name.clone(),
                        expected: spec.kind.as_str(),
                        sample_index,
                    });
                }
            }
        }
    }
    Ok(())
}

/// Convert validated rows into typed columns.
fn build_columns(rows: &[Vec<Value>], features: &[FeatureSpec]) -> Result<Vec<Column>, CartError> {
    features
        .iter()
        .enumerate()
        .map(|(feature_idx, spec)| match spec.kind {
            FeatureKind::Continuous => Ok(Column::Continuous(
                rows.iter()
                    .map(|row| match &row[feature_idx] {
                        Value::Number(v) => *v,
                        Value::Category(_) => unreachable!("kinds validated above"),
                    })
                    .collect(),
            )),
            FeatureKind::Categorical => {
                let mut vocabulary: Vec<String> = Vec::new();
                let mut lookup: HashMap<&str, usize> = HashMap::new();
                let mut codes = Vec::with_capacity(rows.len());
                for row in rows {
                    let Value::Category(category) = &row[feature_idx] else {
                        unreachable!("kinds validated above");
                    };
                    let code = *lookup.entry(category.as_str()).or_insert_with(|| {
                        vocabulary.push(category.clone());
                        vocabulary.len() - 1
                    });
                    codes.push(code);
                }
                if vocabulary.len() > MAX_CATEGORIES {
                    return Err(CartError::TooManyCategories {
                        feature: spec.name.clone(),
                        n_categories: vocabulary.len(),
                        max: MAX_CATEGORIES,
                    });
                }
                Ok(Column::Categorical { codes, vocabulary })
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mixed() -> Dataset {
        let rows = vec![
            vec![Value::from(1.0), Value::from("red")],
            vec![Value::from(2.0), Value::from("blue")],
            vec![Value::from(3.0), Value::from("red")],
            vec![Value::from(4.0), Value::from("green")],
        ];
        Dataset::new(
            rows,
            &["yes", "no", "yes", "no"],
            vec![FeatureSpec::continuous("size"), FeatureSpec::categorical("color")],
        )
        .unwrap()
    }

    #[test]
    fn classes_are_sorted_and_labels_encoded() {
        let ds = mixed();
        assert_eq!(ds.schema().classes(), &["no".to_string(), "yes".to_string()]);
        assert_eq!(ds.labels(), &[1, 0, 1, 0]);
        assert_eq!(ds.schema().class_index("yes"), Some(1));
        assert_eq!(ds.schema().class_name(0), Some("no"));
    }

    #[test]
    fn vocabulary_in_first_appearance_order() {
        let ds = mixed();
        match &ds.columns()[1] {
            Column::Categorical { codes, vocabulary } => {
                assert_eq!(vocabulary, &["red", "blue", "green"]);
                assert_eq!(codes, &[0, 1, 0, 2]);
            }
            Column::Continuous(_) => panic!("expected categorical column"),
        }
    }

    #[test]
    fn supplied_class_list_keeps_order_and_absent_classes() {
        let ds = Dataset::with_classes(
            vec![vec![Value::from(1.0)], vec![Value::from(2.0)]],
            &["b", "b"],
            vec![FeatureSpec::continuous("x")],
            vec!["b".into(), "a".into()],
        )
        .unwrap();
        assert_eq!(ds.schema().classes(), &["b".to_string(), "a".to_string()]);
        assert_eq!(ds.labels(), &[0, 0]);
    }

    #[test]
    fn supplied_class_list_is_checked() {
        let rows = || vec![vec![Value::from(1.0)]];
        let features = || vec![FeatureSpec::continuous("x")];
        let err = Dataset::with_classes(rows(), &["c"], features(), vec!["a".into(), "b".into()])
            .unwrap_err();
        assert!(matches!(err, CartError::UnknownLabel { sample_index: 0, .. }));
        let err = Dataset::with_classes(rows(), &["a"], features(), vec!["a".into(), "a".into()])
            .unwrap_err();
        assert!(matches!(err, CartError::DuplicateClass { .. }));
    }

    #[test]
    fn rejects_kind_mismatch() {
        let err = Dataset::new(
            vec![vec![Value::from("a")]],
            &["x"],
            vec![FeatureSpec::continuous("f")],
        )
        .unwrap_err();
        assert!(matches!(err, CartError::ValueKindMismatch { sample_index: 0, .. }));
    }

    #[test]
    fn rejects_non_finite() {
        let err = Dataset::new(
            vec![vec![Value::from(f64::NAN)]],
            &["x"],
            vec![FeatureSpec::continuous("f")],
        )
        .unwrap_err();
        assert!(matches!(err, CartError::NonFiniteValue { .. }));
    }

    #[test]
    fn rejects_label_count_mismatch() {
        let err = Dataset::new(
            vec![vec![Value::from(1.0)]],
            &["a", "b"],
            vec![FeatureSpec::continuous("f")],
        )
        .unwrap_err();
        assert!(matches!(err, CartError::LabelCountMismatch { n_samples: 1, n_labels: 2 }));
    }

    #[test]
    fn rejects_too_many_categories() {
        let rows: Vec<Vec<Value>> = (0..=MAX_CATEGORIES)
            .map(|i| vec![Value::from(format!("c{i}"))])
            .collect();
        let labels: Vec<&str> = (0..rows.len()).map(|i| if i % 2 == 0 { "a" } else { "b" }).collect();
        let err = Dataset::new(rows, &labels, vec![FeatureSpec::categorical("f")]).unwrap_err();
        assert!(matches!(err, CartError::TooManyCategories { n_categories: 21, max: 20, .. }));
    }

    #[test]
    fn category_limit_is_inclusive() {
        use crate::config::TreeConfig;
        use crate::node::SplitRule;

        // Two samples per category; c0..c9 are "a", c10..c19 are "b".
        let rows: Vec<Vec<Value>> = (0..2 * MAX_CATEGORIES)
            .map(|i| vec![Value::from(format!("c{}", i / 2))])
            .collect();
        let labels: Vec<&str> = (0..rows.len()).map(|i| if i / 2 < 10 { "a" } else { "b" }).collect();
        let ds = Dataset::new(rows, &labels, vec![FeatureSpec::categorical("f")]).unwrap();

        let tree = TreeConfig::new()
            .with_max_depth(1)
            .with_min_samples_leaf(1)
            .fit(&ds)
            .unwrap();
        let split = tree.root().split().expect("root should split");
        let SplitRule::Categorical { left, right } = split.rule() else {
            panic!("expected a categorical split, got {:?}", split.rule());
        };
        let expected: Vec<String> = (0..10).map(|i| format!("c{i}")).collect();
        assert_eq!(left, &expected);
        assert_eq!(right.len(), 10);
        assert_eq!(tree.n_leaves(), 2);
    }

    #[test]
    fn empty_and_zero_feature_errors() {
        let none: &[&str] = &[];
        assert!(matches!(
            Dataset::new(vec![], none, vec![FeatureSpec::continuous("f")]),
            Err(CartError::EmptyDataset)
        ));
        assert!(matches!(
            Dataset::new(vec![vec![]], &["a"], vec![]),
            Err(CartError::ZeroFeatures)
        ));
    }

    #[test]
    fn train_test_split_is_seeded_and_disjoint() {
        let rows: Vec<Vec<Value>> = (0..10).map(|i| vec![Value::from(i as f64)]).collect();
        let labels: Vec<&str> = (0..10).map(|i| if i < 5 { "a" } else { "b" }).collect();
        let ds = Dataset::new(rows, &labels, vec![FeatureSpec::continuous("x")]).unwrap();

        let (train, test) = ds.train_test_split(0.7, 42).unwrap();
        assert_eq!(train.n_samples(), 7);
        assert_eq!(test.n_samples(), 3);
        assert_eq!(train.schema(), ds.schema());

        let (train_again, _) = ds.train_test_split(0.7, 42).unwrap();
        assert_eq!(train.rows(), train_again.rows());

        let mut all: Vec<f64> = train
            .rows()
            .iter()
            .chain(test.rows())
            .map(|r| match r[0] {
                Value::Number(v) => v,
                Value::Category(_) => unreachable!(),
            })
            .collect();
        all.sort_by(f64::total_cmp);
        assert_eq!(all, (0..10).map(|i| i as f64).collect::<Vec<_>>());
    }

    #[test]
    fn train_test_split_rejects_bad_fraction() {
        let ds = mixed();
        assert!(matches!(
            ds.train_test_split(1.0, 1),
            Err(CartError::InvalidTrainFraction { .. })
        ));
        assert!(matches!(
            ds.train_test_split(0.1, 1),
            Err(CartError::EmptyDataset)
        ));
    }
}
