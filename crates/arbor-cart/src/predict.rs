//! Prediction methods for a completed tree.

use crate::config::UnseenCategoryPolicy;
use crate::dataset::Value;
use crate::error::CartError;
use crate::node::{NodeIndex, NodeKind, SplitRule};
use crate::tree::Tree;

/// Outcome of routing one sample to a leaf.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Prediction {
    class: usize,
    confidence: f64,
    distribution: Vec<usize>,
    node: NodeIndex,
}

impl Prediction {
    /// Return the predicted class index (the leaf's majority class).
    #[must_use]
    pub fn class(&self) -> usize {
        self.class
    }

    /// Return the leaf's majority class share.
    #[must_use]
    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    /// Return the leaf's per-class training counts.
    #[must_use]
    pub fn distribution(&self) -> &[usize] {
        &self.distribution
    }

    /// Return the leaf that was reached.
    #[must_use]
    pub fn node(&self) -> NodeIndex {
        self.node
    }
}

/// Per-class probabilities of one sample; entries sum to 1.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ProbabilityVector {
    probs: Vec<f64>,
}

impl ProbabilityVector {
    pub(crate) fn from_counts(counts: &[usize]) -> Self {
        let total: usize = counts.iter().sum();
        let probs = if total == 0 {
            vec![1.0 / counts.len() as f64; counts.len()]
        } else {
            counts.iter().map(|&c| c as f64 / total as f64).collect()
        };
        Self { probs }
    }

    /// Return the class with the highest probability (lowest index on ties).
    #[must_use]
    pub fn predicted_class(&self) -> usize {
        let mut best = 0;
        for (class, &p) in self.probs.iter().enumerate() {
            if p > self.probs[best] {
                best = class;
            }
        }
        best
    }

    /// Return the probability of one class, or 0.0 when out of range.
    #[must_use]
    pub fn get(&self, class: usize) -> f64 {
        self.probs.get(class).copied().unwrap_or(0.0)
    }

    /// Return the top-k classes sorted by descending probability.
    #[must_use]
    pub fn top_k(&self, k: usize) -> Vec<(usize, f64)> {
        let mut indexed: Vec<(usize, f64)> = self.probs.iter().copied().enumerate().collect();
        indexed.sort_by(|a, b| b.1.total_cmp(&a.1));
        indexed.truncate(k);
        indexed
    }

    /// Return the probabilities as a slice in class-index order.
    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.probs
    }
}

impl Tree {
    /// Route one sample from the root to a leaf.
    ///
    /// Continuous splits send `value <= threshold` left. Categorical splits
    /// send members of the left set left and members of the right set right;
    /// any other category follows the tree's [`UnseenCategoryPolicy`].
    ///
    /// # Errors
    ///
    /// | Variant                                   | When                                        |
    /// |-------------------------------------------|---------------------------------------------|
    /// | [`CartError::PredictionFeatureMismatch`]  | `sample.len()` differs from the schema       |
    /// | [`CartError::ValueKindMismatch`]          | a tested value has the wrong kind            |
    /// | [`CartError::NonFiniteValue`]             | a tested value is NaN or infinite            |
    /// | [`CartError::UnseenCategory`]             | unseen category under `Reject`               |
    pub fn predict_one(&self, sample: &[Value]) -> Result<Prediction, CartError> {
        self.predict_indexed(sample, 0)
    }

    /// Predict every sample, preserving order.
    ///
    /// # Errors
    ///
    /// The first error of [`Tree::predict_one`], with `sample_index` set
    /// where the variant carries one.
    pub fn predict(&self, samples: &[Vec<Value>]) -> Result<Vec<Prediction>, CartError> {
        samples
            .iter()
            .enumerate()
            .map(|(i, sample)| self.predict_indexed(sample, i))
            .collect()
    }

    /// Return the reached leaf's normalized class distribution for every sample.
    ///
    /// # Errors
    ///
    /// Same as [`Tree::predict`].
    pub fn predict_proba(&self, samples: &[Vec<Value>]) -> Result<Vec<ProbabilityVector>, CartError> {
        samples
            .iter()
            .enumerate()
            .map(|(i, sample)| {
                let leaf = self.traverse(sample, i)?;
                Ok(ProbabilityVector::from_counts(&self.nodes[leaf.index()].distribution))
            })
            .collect()
    }

    fn predict_indexed(&self, sample: &[Value], sample_index: usize) -> Result<Prediction, CartError> {
        let leaf = self.traverse(sample, sample_index)?;
        let node = &self.nodes[leaf.index()];
        Ok(Prediction {
            class: node.prediction,
            confidence: node.confidence,
            distribution: node.distribution.clone(),
            node: leaf,
        })
    }

    fn traverse(&self, sample: &[Value], sample_index: usize) -> Result<NodeIndex, CartError> {
        let n_features = self.schema.n_features();
        if sample.len() != n_features {
            return Err(CartError::PredictionFeatureMismatch {
                expected: n_features,
                got: sample.len(),
            });
        }

        let mut idx = NodeIndex::ROOT;
        loop {
            let NodeKind::Internal { split, left, right } = &self.nodes[idx.index()].kind else {
                return Ok(idx);
            };
            let feature = split.feature.index();
            let spec = &self.schema.features()[feature];

            idx = match (&split.rule, &sample[feature]) {
                (SplitRule::Continuous { threshold }, Value::Number(v)) => {
                    if !v.is_finite() {
                        return Err(CartError::NonFiniteValue {
                            sample_index,
                            feature_index: feature,
                        });
                    }
                    if *v <= *threshold { *left } else { *right }
                }
                (SplitRule::Categorical { left: left_set, right: right_set }, Value::Category(c)) => {
                    if left_set.contains(c) {
                        *left
                    } else if right_set.contains(c) {
                        *right
                    } else {
                        self.route_unseen(idx, *left, *right, spec.name(), c)?
                    }
                }
                _ => {
                    return Err(CartError::ValueKindMismatch {
                        feature: spec.name().to_string(),
                        expected: spec.kind().as_str(),
                        sample_index,
                    });
                }
            };
        }
    }

    fn route_unseen(
        &self,
        at: NodeIndex,
        left: NodeIndex,
        right: NodeIndex,
        feature: &str,
        category: &str,
    ) -> Result<NodeIndex, CartError> {
        match self.unseen_category {
            UnseenCategoryPolicy::MajorityChild => {
                let n_left = self.nodes[left.index()].n_samples;
                let n_right = self.nodes[right.index()].n_samples;
                Ok(if n_left >= n_right { left } else { right })
            }
            UnseenCategoryPolicy::Reject => Err(CartError::UnseenCategory {
                feature: feature.to_string(),
                category: category.to_string(),
                node: at,
            }),
        }
    }
}
