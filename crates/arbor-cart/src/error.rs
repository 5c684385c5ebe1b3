use std::path::PathBuf;

use crate::node::{NodeIndex, Side, StopReason};

/// Errors from tree construction, prediction, and evaluation.
#[derive(Debug, thiserror::Error)]
pub enum CartError {
    /// Returned when max_depth is zero.
    #[error("max_depth must be at least 1, got {max_depth}")]
    InvalidMaxDepth {
        /// The invalid max_depth value provided.
        max_depth: usize,
    },

    /// Returned when min_samples_leaf is zero.
    #[error("min_samples_leaf must be at least 1, got {min_samples_leaf}")]
    InvalidMinSamplesLeaf {
        /// The invalid min_samples_leaf value provided.
        min_samples_leaf: usize,
    },

    /// Returned when a train/test split fraction is not in (0.0, 1.0).
    #[error("train_fraction must be in (0.0, 1.0), got {fraction}")]
    InvalidTrainFraction {
        /// The invalid fraction provided.
        fraction: f64,
    },

    /// Returned when the dataset has zero samples.
    #[error("dataset has zero samples")]
    EmptyDataset,

    /// Returned when the dataset has zero feature columns.
    #[error("dataset has zero feature columns")]
    ZeroFeatures,

    /// Returned when a sample has a different number of features than the schema.
    #[error("sample {sample_index} has {got} features, expected {expected}")]
    FeatureCountMismatch {
        /// The expected number of features.
        expected: usize,
        /// The actual number of features in the sample.
        got: usize,
        /// The zero-based index of the offending sample.
        sample_index: usize,
    },

    /// Returned when the label vector and the feature rows differ in length.
    #[error("got {n_labels} labels for {n_samples} samples")]
    LabelCountMismatch {
        /// Number of feature rows.
        n_samples: usize,
        /// Number of labels.
        n_labels: usize,
    },

    /// Returned when a continuous value is NaN or infinite.
    #[error("non-finite value at sample {sample_index}, feature {feature_index}")]
    NonFiniteValue {
        /// The zero-based index of the offending sample.
        sample_index: usize,
        /// The zero-based index of the offending feature column.
        feature_index: usize,
    },

    /// Returned when a cell's value kind does not match its feature's declared kind.
    #[error("feature '{feature}' expects a {expected} value at sample {sample_index}")]
    ValueKindMismatch {
        /// Name of the feature.
        feature: String,
        /// The expected kind, "continuous" or "categorical".
        expected: &'static str,
        /// The zero-based index of the offending sample.
        sample_index: usize,
    },

    /// Returned when there are too few samples to form even one split.
    #[error("need at least {required} samples (2 x min_samples_leaf), got {n_samples}")]
    TooFewSamples {
        /// Number of samples provided.
        n_samples: usize,
        /// Minimum number of samples required.
        required: usize,
    },

    /// Returned when the class list has fewer than two classes.
    #[error("need at least 2 distinct classes, got {n_classes}")]
    TooFewClasses {
        /// Number of distinct classes found.
        n_classes: usize,
    },

    /// Returned when a label is not in the supplied class list.
    #[error("label '{label}' at sample {sample_index} is not a known class")]
    UnknownLabel {
        /// The unrecognized label.
        label: String,
        /// The zero-based index of the offending sample.
        sample_index: usize,
    },

    /// Returned when a supplied class list names a class twice.
    #[error("class '{class}' is listed more than once")]
    DuplicateClass {
        /// The repeated class name.
        class: String,
    },

    /// Returned when a categorical feature has more categories than the split search allows.
    #[error("categorical feature '{feature}' has {n_categories} categories, at most {max} are supported")]
    TooManyCategories {
        /// Name of the feature.
        feature: String,
        /// Number of distinct categories found.
        n_categories: usize,
        /// The supported maximum.
        max: usize,
    },

    /// Returned when a committed split would leave a branch below min_samples_leaf.
    #[error("{side} branch would have {n_samples} samples, need at least {min_samples_leaf}")]
    BranchTooSmall {
        /// The offending branch.
        side: Side,
        /// Number of samples the branch would receive.
        n_samples: usize,
        /// The configured minimum.
        min_samples_leaf: usize,
    },

    /// Returned when a categorical candidate has no categories on one side.
    #[error("{side} category group is empty")]
    EmptyCategoryGroup {
        /// The empty side.
        side: Side,
    },

    /// Returned when a category is assigned to both sides of a candidate.
    #[error("category '{category}' is assigned to both branches")]
    OverlappingCategories {
        /// The duplicated category.
        category: String,
    },

    /// Returned when the stopping rules forbid splitting a node.
    #[error("node {node} cannot be split: {reason}")]
    NodeNotSplittable {
        /// The node that was targeted.
        node: NodeIndex,
        /// The stopping rule that applies.
        reason: StopReason,
    },

    /// Returned when committing a decision on a node that is already decided.
    #[error("node {node} is already decided as {state}")]
    IllegalTransition {
        /// The node that was targeted.
        node: NodeIndex,
        /// The node's current state.
        state: &'static str,
    },

    /// Returned when a node index does not exist in the tree.
    #[error("node {node} does not exist")]
    UnknownNode {
        /// The missing node index.
        node: NodeIndex,
    },

    /// Returned when a feature index is outside the schema.
    #[error("feature {feature} does not exist (schema has {n_features} features)")]
    UnknownFeature {
        /// The invalid feature index.
        feature: usize,
        /// Number of features in the schema.
        n_features: usize,
    },

    /// Returned when a candidate split's kind does not match the feature's kind.
    #[error("feature '{feature}' is {expected}, candidate split does not match")]
    SplitKindMismatch {
        /// Name of the feature.
        feature: String,
        /// The feature's kind.
        expected: &'static str,
    },

    /// Returned when a manual tree still has undecided nodes.
    #[error("tree is incomplete: {n_undecided} node(s) still undecided")]
    IncompleteTree {
        /// Number of undecided nodes.
        n_undecided: usize,
    },

    /// Returned when a sample has a different number of features at prediction time.
    #[error("prediction input has {got} features, expected {expected}")]
    PredictionFeatureMismatch {
        /// The expected number of features.
        expected: usize,
        /// The actual number of features in the prediction input.
        got: usize,
    },

    /// Returned under the reject policy when a category matches neither branch of a split.
    #[error("category '{category}' of feature '{feature}' was not seen by the split at node {node}")]
    UnseenCategory {
        /// Name of the feature.
        feature: String,
        /// The unmatched category.
        category: String,
        /// The split node where routing failed.
        node: NodeIndex,
    },

    /// Returned when paired evaluation inputs differ in length.
    #[error("got {n_labels} labels but {n_predictions} predictions")]
    LengthMismatch {
        /// Number of true labels.
        n_labels: usize,
        /// Number of predictions or probability vectors.
        n_predictions: usize,
    },

    /// Returned when a class index is outside the class list.
    #[error("class index {class} is out of range for {n_classes} classes")]
    UnknownClass {
        /// The invalid class index.
        class: usize,
        /// The number of classes.
        n_classes: usize,
    },

    /// Returned when model serialization fails.
    #[error("failed to serialize model")]
    SerializeModel {
        /// The underlying bincode error.
        source: Box<bincode::ErrorKind>,
    },

    /// Returned when model deserialization fails.
    #[error("failed to deserialize model from {path}")]
    DeserializeModel {
        /// Path to the model file that could not be deserialized.
        path: PathBuf,
        /// The underlying bincode error.
        source: Box<bincode::ErrorKind>,
    },

    /// Returned when writing the model file fails.
    #[error("failed to write model to {path}")]
    WriteModel {
        /// Path to the file that could not be written.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when reading the model file fails.
    #[error("failed to read model from {path}")]
    ReadModel {
        /// Path to the file that could not be read.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when loading a model with an incompatible format version.
    #[error("incompatible model version in {path}: expected {expected}, found {found}")]
    IncompatibleModelVersion {
        /// The model format version this build expects.
        expected: u32,
        /// The model format version found in the file.
        found: u32,
        /// Path to the model file with the incompatible version.
        path: PathBuf,
    },
}
