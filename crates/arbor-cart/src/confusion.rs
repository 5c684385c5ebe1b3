//! Confusion matrix, per-class counts, and aggregate classification metrics.

use std::fmt;

use tracing::instrument;

use crate::dataset::Dataset;
use crate::error::CartError;
use crate::predict::Prediction;
use crate::tree::Tree;

/// A confusion matrix for multi-class classification.
///
/// Entry `matrix[true_class][predicted_class]` counts how many samples
/// with true label `true_class` were predicted as `predicted_class`.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ConfusionMatrix {
    matrix: Vec<Vec<usize>>,
    n_classes: usize,
}

/// One-vs-rest counts and scores of a single class.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ClassMetrics {
    /// The class index.
    pub class: usize,
    /// Samples of this class predicted as this class.
    pub tp: usize,
    /// Samples of other classes predicted as this class.
    pub fp: usize,
    /// Samples of this class predicted as another class.
    pub fn_: usize,
    /// Samples of other classes predicted as another class.
    pub tn: usize,
    /// Precision: TP / (TP + FP). 0.0 if no predictions for this class.
    pub precision: f64,
    /// Recall: TP / (TP + FN). 0.0 if no true samples for this class.
    pub recall: f64,
    /// F1: 2 * precision * recall / (precision + recall). 0.0 if both are zero.
    pub f1: f64,
    /// Number of true samples in this class.
    pub support: usize,
}

impl ConfusionMatrix {
    /// Build a confusion matrix from true and predicted class indices.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`CartError::EmptyDataset`] | Zero labels provided |
    /// | [`CartError::LengthMismatch`] | The two slices differ in length |
    /// | [`CartError::UnknownClass`] | A label is `>= n_classes` |
    pub fn from_labels(
        true_labels: &[usize],
        predicted: &[usize],
        n_classes: usize,
    ) -> Result<Self, CartError> {
        if true_labels.is_empty() {
            return Err(CartError::EmptyDataset);
        }
        if true_labels.len() != predicted.len() {
            return Err(CartError::LengthMismatch {
                n_labels: true_labels.len(),
                n_predictions: predicted.len(),
            });
        }
        let mut matrix = vec![vec![0usize; n_classes]; n_classes];
        for (&t, &p) in true_labels.iter().zip(predicted) {
            if let Some(class) = [t, p].into_iter().find(|&c| c >= n_classes) {
                return Err(CartError::UnknownClass { class, n_classes });
            }
            matrix[t][p] += 1;
        }
        Ok(Self { matrix, n_classes })
    }

    /// Overall accuracy: proportion of correct predictions.
    #[must_use]
    pub fn accuracy(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            0.0
        } else {
            self.trace() as f64 / total as f64
        }
    }

    /// Sum of the diagonal.
    #[must_use]
    pub fn trace(&self) -> usize {
        (0..self.n_classes).map(|i| self.matrix[i][i]).sum()
    }

    /// Total number of samples counted.
    #[must_use]
    pub fn total(&self) -> usize {
        self.matrix.iter().flat_map(|row| row.iter()).sum()
    }

    /// Per-class one-vs-rest counts, precision, recall, F1, and support.
    #[must_use]
    pub fn class_metrics(&self) -> Vec<ClassMetrics> {
        let total = self.total();
        (0..self.n_classes)
            .map(|c| {
                let tp = self.matrix[c][c];
                let fp: usize = (0..self.n_classes)
                    .filter(|&i| i != c)
                    .map(|i| self.matrix[i][c])
                    .sum();
                let fn_: usize = (0..self.n_classes)
                    .filter(|&j| j != c)
                    .map(|j| self.matrix[c][j])
                    .sum();
                let tn = total - tp - fp - fn_;
                let support = tp + fn_;
                let precision = ratio(tp, tp + fp);
                let recall = ratio(tp, support);
                let f1 = if precision + recall == 0.0 {
                    0.0
                } else {
                    2.0 * precision * recall / (precision + recall)
                };
                ClassMetrics {
                    class: c,
                    tp,
                    fp,
                    fn_,
                    tn,
                    precision,
                    recall,
                    f1,
                    support,
                }
            })
            .collect()
    }

    /// Return the underlying matrix rows.
    #[must_use]
    pub fn as_rows(&self) -> &[Vec<usize>] {
        &self.matrix
    }

    /// Return the number of classes.
    #[must_use]
    pub fn n_classes(&self) -> usize {
        self.n_classes
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 { 0.0 } else { num as f64 / den as f64 }
}

impl fmt::Display for ConfusionMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:>8}", "")?;
        for j in 0..self.n_classes {
            write!(f, " pred_{j:>3}")?;
        }
        writeln!(f)?;

        for (i, row) in self.matrix.iter().enumerate() {
            write!(f, "true_{i:>3}")?;
            for val in row {
                write!(f, " {val:>8}")?;
            }
            writeln!(f)?;
        }

        Ok(())
    }
}

/// How the headline precision/recall/F1 were derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Averaging {
    /// Two classes: the scores of the positive class.
    Binary {
        /// The positive class index.
        positive: usize,
    },
    /// Three or more classes: unweighted mean over classes.
    Macro,
}

/// Headline classification quality of a set of predictions.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Metrics {
    /// Class names in index order.
    pub classes: Vec<String>,
    /// Number of evaluated samples.
    pub n_samples: usize,
    /// Trace / n.
    pub accuracy: f64,
    /// Headline precision (see `averaging`).
    pub precision: f64,
    /// Headline recall (see `averaging`).
    pub recall: f64,
    /// Headline F1 (see `averaging`).
    pub f1: f64,
    /// Binary positive-class scores or macro averages.
    pub averaging: Averaging,
    /// Per-class one-vs-rest results.
    pub per_class: Vec<ClassMetrics>,
    /// Actual x predicted counts.
    pub confusion: ConfusionMatrix,
}

impl Metrics {
    /// Score predicted class indices against true class indices.
    ///
    /// With exactly two classes the headline scores are those of `target`,
    /// or of class 0 when `target` is `None`. With three or more classes
    /// they are macro averages and `target` is ignored.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`CartError::EmptyDataset`] | Zero labels provided |
    /// | [`CartError::LengthMismatch`] | The two slices differ in length |
    /// | [`CartError::UnknownClass`] | A label or `target` is out of range |
    pub fn compute(
        true_labels: &[usize],
        predicted: &[usize],
        classes: &[String],
        target: Option<usize>,
    ) -> Result<Self, CartError> {
        let n_classes = classes.len();
        let confusion = ConfusionMatrix::from_labels(true_labels, predicted, n_classes)?;
        let per_class = confusion.class_metrics();

        let (precision, recall, f1, averaging) = if n_classes == 2 {
            let positive = target.unwrap_or(0);
            let m = per_class
                .get(positive)
                .ok_or(CartError::UnknownClass { class: positive, n_classes })?;
            (m.precision, m.recall, m.f1, Averaging::Binary { positive })
        } else {
            let k = n_classes.max(1) as f64;
            let mean = |f: fn(&ClassMetrics) -> f64| per_class.iter().map(f).sum::<f64>() / k;
            (
                mean(|m: &ClassMetrics| m.precision),
                mean(|m: &ClassMetrics| m.recall),
                mean(|m: &ClassMetrics| m.f1),
                Averaging::Macro,
            )
        };

        Ok(Self {
            classes: classes.to_vec(),
            n_samples: true_labels.len(),
            accuracy: confusion.accuracy(),
            precision,
            recall,
            f1,
            averaging,
            per_class,
            confusion,
        })
    }

    /// Score [`Prediction`]s against true class indices.
    ///
    /// # Errors
    ///
    /// Same as [`Metrics::compute`].
    pub fn from_predictions(
        true_labels: &[usize],
        predictions: &[Prediction],
        classes: &[String],
        target: Option<usize>,
    ) -> Result<Self, CartError> {
        let predicted: Vec<usize> = predictions.iter().map(Prediction::class).collect();
        Self::compute(true_labels, &predicted, classes, target)
    }
}

impl Tree {
    /// Predict every sample of `dataset` and score the result.
    ///
    /// Labels are matched to this tree's classes by name, so the dataset
    /// may come from a separate file with its own class order.
    ///
    /// # Errors
    ///
    /// Any prediction error, [`CartError::UnknownLabel`] for a label the tree
    /// has no class for, or any error of [`Metrics::compute`].
    #[instrument(skip_all, fields(n_samples = dataset.n_samples()))]
    pub fn evaluate(&self, dataset: &Dataset, target: Option<usize>) -> Result<Metrics, CartError> {
        let true_labels = self.align_labels(dataset)?;
        let predictions = self.predict(dataset.rows())?;
        Metrics::from_predictions(&true_labels, &predictions, self.schema.classes(), target)
    }

    /// Re-encode `dataset`'s labels as this tree's class indices.
    pub(crate) fn align_labels(&self, dataset: &Dataset) -> Result<Vec<usize>, CartError> {
        let names = dataset.schema().classes();
        dataset
            .labels()
            .iter()
            .enumerate()
            .map(|(sample_index, &label)| {
                let name = &names[label];
                self.schema
                    .class_index(name)
                    .ok_or_else(|| CartError::UnknownLabel {
                        label: name.clone(),
                        sample_index,
                    })
            })
            .collect()
    }
}
