use std::fmt;

use crate::criterion::Criterion;

/// Zero-based feature column index.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
    serde::Serialize, serde::Deserialize,
)]
pub struct FeatureIndex(usize);

impl FeatureIndex {
    /// Create a new feature index from a zero-based column position.
    #[must_use]
    pub fn new(index: usize) -> Self {
        Self(index)
    }

    /// Return the zero-based feature column index.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for FeatureIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Index into a node arena, identifying a specific node in a tree.
///
/// The root is always index 0.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
    serde::Serialize, serde::Deserialize,
)]
pub struct NodeIndex(usize);

impl NodeIndex {
    /// The root node of every tree.
    pub const ROOT: NodeIndex = NodeIndex(0);

    pub(crate) fn new(index: usize) -> Self {
        Self(index)
    }

    /// Return the zero-based arena index.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Criterion-agnostic impurity value (Gini or Entropy).
#[derive(
    Debug, Clone, Copy, PartialEq, PartialOrd,
    serde::Serialize, serde::Deserialize,
)]
pub struct Impurity(f64);

impl Impurity {
    pub(crate) fn new(value: f64) -> Self {
        Self(value)
    }

    /// Return the raw impurity value.
    #[must_use]
    pub fn value(self) -> f64 {
        self.0
    }

    /// Return `true` when the node holds a single class.
    #[must_use]
    pub fn is_pure(self) -> bool {
        self.0 == 0.0
    }
}

impl fmt::Display for Impurity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6}", self.0)
    }
}

/// One of the two branches of a binary split.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// Samples with value <= threshold, or in the left category set.
    Left,
    /// Everything else.
    Right,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Left => f.write_str("left"),
            Side::Right => f.write_str("right"),
        }
    }
}

/// Why a node became (or must stay) a leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The node sits at the configured maximum depth.
    MaxDepth,
    /// The node has fewer than 2 x min_samples_leaf samples.
    TooFewSamples,
    /// The node holds a single class.
    Pure,
    /// No admissible split improves impurity.
    NoInformativeSplit,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            StopReason::MaxDepth => "maximum depth reached",
            StopReason::TooFewSamples => "too few samples",
            StopReason::Pure => "node is already pure",
            StopReason::NoInformativeSplit => "no split improves impurity",
        };
        f.write_str(text)
    }
}

/// The routing rule of a binary split.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum SplitRule {
    /// Samples with `value <= threshold` go left.
    Continuous {
        /// Midpoint between two consecutive training values.
        threshold: f64,
    },
    /// Samples whose category is in `left` go left, `right` go right.
    Categorical {
        /// Categories routed to the left child.
        left: Vec<String>,
        /// Categories routed to the right child.
        right: Vec<String>,
    },
}

/// A binary split on one feature.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Split {
    pub(crate) feature: FeatureIndex,
    pub(crate) rule: SplitRule,
    pub(crate) gain: f64,
}

impl Split {
    /// Return the feature this split tests.
    #[must_use]
    pub fn feature(&self) -> FeatureIndex {
        self.feature
    }

    /// Return the routing rule.
    #[must_use]
    pub fn rule(&self) -> &SplitRule {
        &self.rule
    }

    /// Return the impurity decrease achieved on the training samples.
    #[must_use]
    pub fn gain(&self) -> f64 {
        self.gain
    }
}

/// Leaf-or-internal tag of a node.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum NodeKind {
    /// A terminal node.
    Leaf,
    /// An interior node that owns exactly two children.
    Internal {
        /// The split applied at this node.
        split: Split,
        /// Index of the left child node.
        left: NodeIndex,
        /// Index of the right child node.
        right: NodeIndex,
    },
}

/// A node in a tree arena.
///
/// Every node carries the statistics of the training samples that reached
/// it; only [`NodeKind::Internal`] nodes carry a split.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Node {
    pub(crate) id: NodeIndex,
    pub(crate) n_samples: usize,
    pub(crate) distribution: Vec<usize>,
    pub(crate) impurity: Impurity,
    pub(crate) prediction: usize,
    pub(crate) confidence: f64,
    pub(crate) depth: usize,
    pub(crate) kind: NodeKind,
}

impl Node {
    /// Build a leaf from per-class sample counts.
    pub(crate) fn leaf(
        id: NodeIndex,
        depth: usize,
        distribution: Vec<usize>,
        criterion: Criterion,
    ) -> Self {
        let n_samples: usize = distribution.iter().sum();
        let impurity = criterion.impurity(&distribution, n_samples);
        let prediction = majority_class(&distribution);
        let confidence = if n_samples == 0 {
            0.0
        } else {
            distribution[prediction] as f64 / n_samples as f64
        };
        Self {
            id,
            n_samples,
            distribution,
            impurity,
            prediction,
            confidence,
            depth,
            kind: NodeKind::Leaf,
        }
    }

    /// Return this node's arena index.
    #[must_use]
    pub fn id(&self) -> NodeIndex {
        self.id
    }

    /// Return the number of training samples that reached this node.
    #[must_use]
    pub fn n_samples(&self) -> usize {
        self.n_samples
    }

    /// Return the per-class training sample counts.
    #[must_use]
    pub fn distribution(&self) -> &[usize] {
        &self.distribution
    }

    /// Return the impurity of the samples at this node.
    #[must_use]
    pub fn impurity(&self) -> Impurity {
        self.impurity
    }

    /// Return the majority class index.
    #[must_use]
    pub fn prediction(&self) -> usize {
        self.prediction
    }

    /// Return the majority class share, `majority count / n`.
    #[must_use]
    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    /// Return the depth (root is 0).
    #[must_use]
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Return the leaf/internal tag.
    #[must_use]
    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    /// Return the split, if this is an internal node.
    #[must_use]
    pub fn split(&self) -> Option<&Split> {
        match &self.kind {
            NodeKind::Internal { split, .. } => Some(split),
            NodeKind::Leaf => None,
        }
    }

    /// Return `(left, right)` child indices, if this is an internal node.
    #[must_use]
    pub fn children(&self) -> Option<(NodeIndex, NodeIndex)> {
        match &self.kind {
            NodeKind::Internal { left, right, .. } => Some((*left, *right)),
            NodeKind::Leaf => None,
        }
    }

    /// Return `true` if this node is a leaf.
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        matches!(self.kind, NodeKind::Leaf)
    }
}

/// Index of the largest count; the lowest index wins ties.
pub(crate) fn majority_class(counts: &[usize]) -> usize {
    let mut best = 0;
    for (class, &count) in counts.iter().enumerate() {
        if count > counts[best] {
            best = class;
        }
    }
    best
}
