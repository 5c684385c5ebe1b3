//! CART classification trees: grow, build by hand, predict, evaluate.
//!
//! Trees are grown greedily over mixed continuous and categorical features
//! with Gini or Entropy impurity, or assembled split by split through a
//! [`ManualBuilder`]. Either way the result is an immutable [`Tree`] that
//! predicts class distributions, extracts decision rules, ranks feature
//! importance, and serializes to disk. Evaluation covers confusion
//! matrices, precision/recall/F1, and ROC curves.

mod builder;
mod config;
mod confusion;
mod criterion;
mod dataset;
mod error;
mod importance;
mod manual;
mod node;
mod predict;
mod roc;
mod rules;
mod serialize;
mod split;
mod tree;

pub use config::{TreeConfig, UnseenCategoryPolicy};
pub use confusion::{Averaging, ClassMetrics, ConfusionMatrix, Metrics};
pub use criterion::{Criterion, class_counts, impurity_of_labels};
pub use dataset::{Dataset, FeatureKind, FeatureSpec, MAX_CATEGORIES, Schema, Value};
pub use error::CartError;
pub use importance::FeatureImportance;
pub use manual::{CandidateRule, CandidateSplit, ManualBuilder, NodeState, SplitPreview};
pub use node::{FeatureIndex, Impurity, Node, NodeIndex, NodeKind, Side, Split, SplitRule, StopReason};
pub use predict::{Prediction, ProbabilityVector};
pub use roc::{RocCurve, roc_curve};
pub use rules::{Condition, Rule};
pub use split::{CategoricalSplit, ContinuousSplit, best_categorical_split, best_continuous_split};
pub use tree::{Tree, TreeStats};
