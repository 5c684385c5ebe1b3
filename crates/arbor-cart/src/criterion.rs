//! Node impurity measures and impurity-decrease gain.

use std::fmt;

use crate::node::Impurity;

/// Criterion for measuring the quality of a split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Criterion {
    /// Gini impurity: 1 - Σ(p_i²)
    Gini,
    /// Information entropy in bits: -Σ(p_i · log2(p_i))
    Entropy,
}

impl Criterion {
    /// Compute the impurity of a node from its class counts.
    ///
    /// Returns [`Impurity::new(0.0)`] when `n_samples` is zero.
    #[must_use]
    pub fn impurity(&self, class_counts: &[usize], n_samples: usize) -> Impurity {
        if n_samples == 0 {
            return Impurity::new(0.0);
        }
        let n = n_samples as f64;
        let value = match self {
            Criterion::Gini => {
                let sum_sq: f64 = class_counts
                    .iter()
                    .map(|&c| {
                        let p = c as f64 / n;
                        p * p
                    })
                    .sum();
                1.0 - sum_sq
            }
            Criterion::Entropy => {
                -class_counts
                    .iter()
                    .filter(|&&c| c > 0)
                    .map(|&c| {
                        let p = c as f64 / n;
                        p * p.log2()
                    })
                    .sum::<f64>()
            }
        };
        Impurity::new(value)
    }

    /// Impurity of the parent minus the sample-weighted impurity of both children.
    ///
    /// Returns 0.0 when either child is empty.
    #[must_use]
    pub fn gain(&self, parent: &[usize], left: &[usize], right: &[usize]) -> f64 {
        let n_left: usize = left.iter().sum();
        let n_right: usize = right.iter().sum();
        if n_left == 0 || n_right == 0 {
            return 0.0;
        }
        let n_parent: usize = parent.iter().sum();
        let n = n_parent as f64;
        let weighted = (n_left as f64 / n) * self.impurity(left, n_left).value()
            + (n_right as f64 / n) * self.impurity(right, n_right).value();
        self.impurity(parent, n_parent).value() - weighted
    }
}

impl fmt::Display for Criterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Criterion::Gini => f.write_str("gini"),
            Criterion::Entropy => f.write_str("entropy"),
        }
    }
}

/// Count class occurrences in a slice of zero-based class labels.
#[must_use]
pub fn class_counts(labels: &[usize], n_classes: usize) -> Vec<usize> {
    let mut counts = vec![0usize; n_classes];
    for &label in labels {
        counts[label] += 1;
    }
    counts
}

/// Impurity of a slice of zero-based class labels.
#[must_use]
pub fn impurity_of_labels(labels: &[usize], n_classes: usize, criterion: Criterion) -> Impurity {
    criterion.impurity(&class_counts(labels, n_classes), labels.len())
}
