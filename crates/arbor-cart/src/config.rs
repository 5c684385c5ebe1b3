//! Configuration builder for decision tree training.

use crate::criterion::Criterion;
use crate::dataset::{Dataset, FeatureSpec, Value};
use crate::error::CartError;
use crate::tree::Tree;

/// How prediction routes a categorical value that neither branch of a split saw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub enum UnseenCategoryPolicy {
    /// Follow the child that received more training samples (left on ties).
    #[default]
    MajorityChild,
    /// Fail with [`CartError::UnseenCategory`].
    Reject,
}

/// Configuration for decision tree training.
///
/// Construct via [`TreeConfig::new`], then chain `with_*` methods. The same
/// configuration drives [`ManualBuilder`](crate::manual::ManualBuilder).
///
/// # Defaults
///
/// | Parameter          | Default         |
/// |--------------------|-----------------|
/// | `max_depth`        | 3               |
/// | `min_samples_leaf` | 10              |
/// | `criterion`        | `Gini`          |
/// | `unseen_category`  | `MajorityChild` |
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TreeConfig {
    pub(crate) max_depth: usize,
    pub(crate) min_samples_leaf: usize,
    pub(crate) criterion: Criterion,
    pub(crate) unseen_category: UnseenCategoryPolicy,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl TreeConfig {
    /// Create a config with default hyperparameters.
    #[must_use]
    pub fn new() -> Self {
        Self {
            max_depth: 3,
            min_samples_leaf: 10,
            criterion: Criterion::Gini,
            unseen_category: UnseenCategoryPolicy::MajorityChild,
        }
    }

    // --- Setters ---

    /// Set the maximum tree depth (root is depth 0).
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Set the minimum number of samples required in each leaf after a split.
    #[must_use]
    pub fn with_min_samples_leaf(mut self, min_samples_leaf: usize) -> Self {
        self.min_samples_leaf = min_samples_leaf;
        self
    }

    /// Set the impurity criterion.
    #[must_use]
    pub fn with_criterion(mut self, criterion: Criterion) -> Self {
        self.criterion = criterion;
        self
    }

    /// Set the routing policy for unseen categories at prediction time.
    #[must_use]
    pub fn with_unseen_category(mut self, policy: UnseenCategoryPolicy) -> Self {
        self.unseen_category = policy;
        self
    }

    // --- Getters ---

    /// Return the maximum tree depth.
    #[must_use]
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Return the minimum samples required in each leaf.
    #[must_use]
    pub fn min_samples_leaf(&self) -> usize {
        self.min_samples_leaf
    }

    /// Return the impurity criterion.
    #[must_use]
    pub fn criterion(&self) -> Criterion {
        self.criterion
    }

    /// Return the unseen-category policy.
    #[must_use]
    pub fn unseen_category(&self) -> UnseenCategoryPolicy {
        self.unseen_category
    }

    /// Check hyperparameters and that `dataset` can support at least one split.
    pub(crate) fn validate(&self, dataset: &Dataset) -> Result<(), CartError> {
        if self.max_depth == 0 {
            return Err(CartError::InvalidMaxDepth {
                max_depth: self.max_depth,
            });
        }
        if self.min_samples_leaf == 0 {
            return Err(CartError::InvalidMinSamplesLeaf {
                min_samples_leaf: self.min_samples_leaf,
            });
        }
        let required = 2 * self.min_samples_leaf;
        if dataset.n_samples() < required {
            return Err(CartError::TooFewSamples {
                n_samples: dataset.n_samples(),
                required,
            });
        }
        let n_classes = dataset.schema().n_classes();
        if n_classes < 2 {
            return Err(CartError::TooFewClasses { n_classes });
        }
        Ok(())
    }

    /// Grow a tree greedily on a validated dataset.
    ///
    /// # Errors
    ///
    /// | Variant                              | When                                        |
    /// |--------------------------------------|---------------------------------------------|
    /// | [`CartError::InvalidMaxDepth`]       | `max_depth` is zero                         |
    /// | [`CartError::InvalidMinSamplesLeaf`] | `min_samples_leaf` is zero                  |
    /// | [`CartError::TooFewSamples`]         | fewer than `2 * min_samples_leaf` samples   |
    /// | [`CartError::TooFewClasses`]         | the class list has fewer than two entries   |
    pub fn fit(&self, dataset: &Dataset) -> Result<Tree, CartError> {
        crate::builder::grow(self, dataset)
    }

    /// Validate raw rows into a [`Dataset`], then [`fit`](Self::fit).
    ///
    /// # Errors
    ///
    /// Any error of [`Dataset::new`] or [`TreeConfig::fit`].
    pub fn fit_rows<S: AsRef<str>>(
        &self,
        rows: Vec<Vec<Value>>,
        labels: &[S],
        features: Vec<FeatureSpec>,
    ) -> Result<Tree, CartError> {
        let dataset = Dataset::new(rows, labels, features)?;
        self.fit(&dataset)
    }
}
