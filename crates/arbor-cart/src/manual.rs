//! Interactive tree construction with previewed, validated commits.
//!
//! A [`ManualBuilder`] starts as a single undecided root. The caller picks a
//! node, tries candidate splits through [`ManualBuilder::preview_split`]
//! (pure), and then commits a split or a leaf. Every commit validates fully
//! before mutating anything, so a failed commit leaves the builder exactly
//! as it was. Once no undecided node remains, [`ManualBuilder::tree`]
//! yields an ordinary [`Tree`].

use std::fmt;

use tracing::{debug, info, instrument};

use crate::builder::stop_reason;
use crate::config::TreeConfig;
use crate::criterion::{Criterion, class_counts};
use crate::dataset::{Column, Dataset, FeatureKind, Value};
use crate::error::CartError;
use crate::importance::FeatureImportance;
use crate::node::{FeatureIndex, Node, NodeIndex, NodeKind, Side, Split, SplitRule, majority_class};
use crate::predict::{Prediction, ProbabilityVector};
use crate::rules::Rule;
use crate::split::partition;
use crate::tree::Tree;

/// Decision state of a node under construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    /// Not decided yet.
    Undecided,
    /// Committed as an internal node with two children.
    Split,
    /// Committed as terminal.
    Leaf,
}

impl NodeState {
    fn as_str(self) -> &'static str {
        match self {
            NodeState::Undecided => "undecided",
            NodeState::Split => "split",
            NodeState::Leaf => "leaf",
        }
    }
}

impl fmt::Display for NodeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Routing rule of a candidate split.
#[derive(Debug, Clone, PartialEq)]
pub enum CandidateRule {
    /// `value <= threshold` goes left.
    Threshold(f64),
    /// Categories in `left` go left; everything else goes right.
    Categories {
        /// Left group.
        left: Vec<String>,
        /// Right group.
        right: Vec<String>,
    },
}

/// A split the caller is considering for one node.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateSplit {
    /// Feature to test.
    pub feature: FeatureIndex,
    /// How to route samples.
    pub rule: CandidateRule,
}

impl CandidateSplit {
    /// Candidate threshold split on a continuous feature.
    #[must_use]
    pub fn threshold(feature: usize, threshold: f64) -> Self {
        Self {
            feature: FeatureIndex::new(feature),
            rule: CandidateRule::Threshold(threshold),
        }
    }

    /// Candidate category split on a categorical feature.
    pub fn categories<S: Into<String>>(
        feature: usize,
        left: impl IntoIterator<Item = S>,
        right: impl IntoIterator<Item = S>,
    ) -> Self {
        Self {
            feature: FeatureIndex::new(feature),
            rule: CandidateRule::Categories {
                left: left.into_iter().map(Into::into).collect(),
                right: right.into_iter().map(Into::into).collect(),
            },
        }
    }

    fn to_rule(&self) -> SplitRule {
        match &self.rule {
            CandidateRule::Threshold(threshold) => SplitRule::Continuous {
                threshold: *threshold,
            },
            CandidateRule::Categories { left, right } => SplitRule::Categorical {
                left: left.clone(),
                right: right.clone(),
            },
        }
    }
}

/// Live statistics of a candidate split.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct SplitPreview {
    /// Samples routed left.
    pub left_n: usize,
    /// Samples routed right.
    pub right_n: usize,
    /// Majority class on the left, `None` when empty.
    pub left_majority: Option<usize>,
    /// Majority class on the right, `None` when empty.
    pub right_majority: Option<usize>,
    /// Majority share on the left (0.0 when empty).
    pub left_confidence: f64,
    /// Majority share on the right (0.0 when empty).
    pub right_confidence: f64,
    /// Fraction of the node's samples routed left.
    pub left_share: f64,
    /// Fraction of the node's samples routed right.
    pub right_share: f64,
    /// Entropy decrease, whatever the tree criterion.
    pub info_gain: f64,
    /// Gini decrease, whatever the tree criterion.
    pub gini_reduction: f64,
}

#[derive(Debug, Clone)]
struct Slot {
    node: Node,
    samples: Vec<usize>,
    state: NodeState,
}

/// Builder for a tree whose splits are chosen by the caller.
#[derive(Debug, Clone)]
pub struct ManualBuilder {
    dataset: Dataset,
    config: TreeConfig,
    slots: Vec<Slot>,
    selected: Option<NodeIndex>,
}

impl ManualBuilder {
    /// Start a manual tree over `dataset` with a single undecided root.
    ///
    /// # Errors
    ///
    /// The same validation errors as [`TreeConfig::fit`].
    #[instrument(skip_all, fields(n_samples = dataset.n_samples()))]
    pub fn initialize(dataset: Dataset, config: TreeConfig) -> Result<Self, CartError> {
        config.validate(&dataset)?;
        let mut builder = Self {
            dataset,
            config,
            slots: Vec::new(),
            selected: None,
        };
        builder.reset();
        Ok(builder)
    }

    /// Discard every decision and return to a single undecided root.
    pub fn reset(&mut self) {
        let samples: Vec<usize> = (0..self.dataset.n_samples()).collect();
        let root = self.make_node(NodeIndex::ROOT, 0, &samples);
        self.slots = vec![Slot {
            node: root,
            samples,
            state: NodeState::Undecided,
        }];
        self.selected = None;
        debug!("manual tree reset");
    }

    /// Return the training data.
    #[must_use]
    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    /// Return the hyperparameters enforced on commits.
    #[must_use]
    pub fn config(&self) -> &TreeConfig {
        &self.config
    }

    /// Return a node by index.
    #[must_use]
    pub fn node(&self, index: NodeIndex) -> Option<&Node> {
        self.slots.get(index.index()).map(|s| &s.node)
    }

    /// Return every node in creation order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.slots.iter().map(|s| &s.node)
    }

    /// Return the decision state of a node.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::UnknownNode`] for an index that does not exist.
    pub fn state(&self, index: NodeIndex) -> Result<NodeState, CartError> {
        Ok(self.slot(index)?.state)
    }

    /// Return the undecided nodes in creation order.
    #[must_use]
    pub fn undecided(&self) -> Vec<NodeIndex> {
        self.slots
            .iter()
            .filter(|s| s.state == NodeState::Undecided)
            .map(|s| s.node.id)
            .collect()
    }

    /// Return `true` when every node has been decided.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.slots.iter().all(|s| s.state != NodeState::Undecided)
    }

    // --- Editing context ---

    /// Make `index` the node being edited.
    ///
    /// # Errors
    ///
    /// [`CartError::UnknownNode`], or [`CartError::IllegalTransition`] when
    /// the node is already decided.
    pub fn select(&mut self, index: NodeIndex) -> Result<(), CartError> {
        self.undecided_slot(index)?;
        self.selected = Some(index);
        Ok(())
    }

    /// Return the node being edited, if any.
    #[must_use]
    pub fn selected(&self) -> Option<NodeIndex> {
        self.selected
    }

    /// Leave the editing context.
    pub fn deselect(&mut self) {
        self.selected = None;
    }

    // --- Inspection ---

    /// Check that the stopping rules allow splitting `index`.
    ///
    /// # Errors
    ///
    /// | Variant                             | When                                     |
    /// |-------------------------------------|------------------------------------------|
    /// | [`CartError::UnknownNode`]          | the node does not exist                  |
    /// | [`CartError::IllegalTransition`]    | the node is already decided              |
    /// | [`CartError::NodeNotSplittable`]    | max depth, too few samples, or pure      |
    pub fn split_check(&self, index: NodeIndex) -> Result<(), CartError> {
        let slot = self.undecided_slot(index)?;
        let node = &slot.node;
        match stop_reason(&self.config, node.depth, node.n_samples, node.impurity.is_pure()) {
            Some(reason) => Err(CartError::NodeNotSplittable {
                node: index,
                reason,
            }),
            None => Ok(()),
        }
    }

    /// Compute branch statistics of `candidate` at `index` without changing anything.
    ///
    /// Samples whose category is in neither group count toward the right.
    ///
    /// # Errors
    ///
    /// [`CartError::UnknownNode`], [`CartError::UnknownFeature`], or
    /// [`CartError::SplitKindMismatch`].
    pub fn preview_split(
        &self,
        index: NodeIndex,
        candidate: &CandidateSplit,
    ) -> Result<SplitPreview, CartError> {
        let slot = self.slot(index)?;
        self.check_kind(candidate)?;
        let (left, right) = partition(&self.dataset, &slot.samples, candidate.feature, &candidate.to_rule());
        Ok(self.preview_partition(&slot.node, &left, &right))
    }

    /// Propose a category grouping close to a 50/50 split of the node's samples.
    ///
    /// Categories present at the node are taken by descending frequency
    /// (first appearance breaks ties); each goes left while the left side
    /// holds no more samples than the right, otherwise right.
    ///
    /// # Errors
    ///
    /// [`CartError::UnknownNode`], [`CartError::UnknownFeature`], or
    /// [`CartError::SplitKindMismatch`] for a continuous feature.
    pub fn auto_balance(&self, index: NodeIndex, feature: usize) -> Result<CandidateSplit, CartError> {
        let slot = self.slot(index)?;
        let (codes, vocabulary) = self.categorical_column(feature)?;

        let mut present: Vec<(usize, usize)> = Vec::new();
        for &i in &slot.samples {
            let code = codes[i];
            match present.iter_mut().find(|(c, _)| *c == code) {
                Some((_, count)) => *count += 1,
                None => present.push((code, 1)),
            }
        }
        present.sort_by(|a, b| b.1.cmp(&a.1));

        let (mut left, mut right) = (Vec::new(), Vec::new());
        let (mut n_left, mut n_right) = (0usize, 0usize);
        for (code, count) in present {
            if n_left <= n_right {
                left.push(vocabulary[code].clone());
                n_left += count;
            } else {
                right.push(vocabulary[code].clone());
                n_right += count;
            }
        }
        Ok(CandidateSplit::categories(feature, left, right))
    }

    /// Propose a threshold at the median of the node's values.
    ///
    /// # Errors
    ///
    /// [`CartError::UnknownNode`], [`CartError::UnknownFeature`], or
    /// [`CartError::SplitKindMismatch`] for a categorical feature.
    pub fn suggest_threshold(&self, index: NodeIndex, feature: usize) -> Result<CandidateSplit, CartError> {
        let slot = self.slot(index)?;
        let spec = self.dataset.schema().feature(feature)?;
        let Column::Continuous(values) = &self.dataset.columns()[feature] else {
            return Err(CartError::SplitKindMismatch {
                feature: spec.name().to_string(),
                expected: spec.kind().as_str(),
            });
        };
        let mut node_values: Vec<f64> = slot.samples.iter().map(|&i| values[i]).collect();
        node_values.sort_by(f64::total_cmp);
        let mid = node_values.len() / 2;
        let median = if node_values.len() % 2 == 1 {
            node_values[mid]
        } else {
            (node_values[mid - 1] + node_values[mid]) / 2.0
        };
        Ok(CandidateSplit::threshold(feature, median))
    }

    // --- Commits ---

    /// Turn undecided node `index` into an internal node with two undecided children.
    ///
    /// Categories present at the node but named in neither group are added
    /// to the right group, matching where their samples are routed.
    ///
    /// # Errors
    ///
    /// | Variant                               | When                                          |
    /// |---------------------------------------|-----------------------------------------------|
    /// | [`CartError::UnknownNode`]            | the node does not exist                       |
    /// | [`CartError::IllegalTransition`]      | the node is already decided                   |
    /// | [`CartError::NodeNotSplittable`]      | a stopping rule applies                       |
    /// | [`CartError::UnknownFeature`]         | the feature does not exist                    |
    /// | [`CartError::SplitKindMismatch`]      | rule kind differs from the feature kind       |
    /// | [`CartError::EmptyCategoryGroup`]     | a category group is empty                     |
    /// | [`CartError::OverlappingCategories`]  | a category is in both groups                  |
    /// | [`CartError::BranchTooSmall`]         | a branch has fewer than `min_samples_leaf`    |
    #[instrument(skip(self, candidate), fields(node = %index, feature = %candidate.feature))]
    pub fn commit_split(
        &mut self,
        index: NodeIndex,
        candidate: &CandidateSplit,
    ) -> Result<(NodeIndex, NodeIndex), CartError> {
        self.split_check(index)?;
        self.check_kind(candidate)?;
        let mut rule = candidate.to_rule();
        if let SplitRule::Categorical { left, right } = &rule {
            check_groups(left, right)?;
        }

        let slot = &self.slots[index.index()];
        let (left_samples, right_samples) = partition(&self.dataset, &slot.samples, candidate.feature, &rule);
        let min_samples_leaf = self.config.min_samples_leaf;
        for (side, n_samples) in [(Side::Left, left_samples.len()), (Side::Right, right_samples.len())] {
            if n_samples < min_samples_leaf {
                return Err(CartError::BranchTooSmall {
                    side,
                    n_samples,
                    min_samples_leaf,
                });
            }
        }

        if let SplitRule::Categorical { left, right } = &mut rule {
            if let Column::Categorical { codes, vocabulary } = &self.dataset.columns()[candidate.feature.index()] {
                for &i in &right_samples {
                    let category = &vocabulary[codes[i]];
                    if !left.contains(category) && !right.contains(category) {
                        right.push(category.clone());
                    }
                }
            }
        }

        // Validated: mutate.
        let parent = &slot.node;
        let depth = parent.depth + 1;
        let n_classes = self.dataset.schema().n_classes();
        let gain = self.config.criterion.gain(
            &parent.distribution,
            &self.counts(&left_samples, n_classes),
            &self.counts(&right_samples, n_classes),
        );
        let left_id = NodeIndex::new(self.slots.len());
        let right_id = NodeIndex::new(self.slots.len() + 1);
        let left_node = self.make_node(left_id, depth, &left_samples);
        let right_node = self.make_node(right_id, depth, &right_samples);

        let slot = &mut self.slots[index.index()];
        slot.node.kind = NodeKind::Internal {
            split: Split {
                feature: candidate.feature,
                rule,
                gain,
            },
            left: left_id,
            right: right_id,
        };
        slot.state = NodeState::Split;
        self.slots.push(Slot {
            node: left_node,
            samples: left_samples,
            state: NodeState::Undecided,
        });
        self.slots.push(Slot {
            node: right_node,
            samples: right_samples,
            state: NodeState::Undecided,
        });
        if self.selected == Some(index) {
            self.selected = None;
        }

        info!(gain, left = %left_id, right = %right_id, "split committed");
        Ok((left_id, right_id))
    }

    /// Mark undecided node `index` as terminal.
    ///
    /// # Errors
    ///
    /// [`CartError::UnknownNode`], or [`CartError::IllegalTransition`] when
    /// the node is already decided.
    #[instrument(skip(self), fields(node = %index))]
    pub fn commit_leaf(&mut self, index: NodeIndex) -> Result<(), CartError> {
        self.undecided_slot(index)?;
        self.slots[index.index()].state = NodeState::Leaf;
        if self.selected == Some(index) {
            self.selected = None;
        }
        info!("leaf committed");
        Ok(())
    }

    /// Mark every remaining undecided node as a leaf; returns how many changed.
    pub fn finalize(&mut self) -> usize {
        let mut n = 0;
        for slot in &mut self.slots {
            if slot.state == NodeState::Undecided {
                slot.state = NodeState::Leaf;
                n += 1;
            }
        }
        self.selected = None;
        debug!(n_finalized = n, "manual tree finalized");
        n
    }

    // --- Completed tree ---

    /// Return the completed tree, numbered in pre-order like a fitted one.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::IncompleteTree`] while any node is undecided.
    pub fn tree(&self) -> Result<Tree, CartError> {
        let n_undecided = self.undecided().len();
        if n_undecided > 0 {
            return Err(CartError::IncompleteTree { n_undecided });
        }
        let mut nodes = Vec::with_capacity(self.slots.len());
        self.export(NodeIndex::ROOT, &mut nodes);
        Ok(Tree::from_parts(
            nodes,
            self.dataset.schema().clone(),
            self.config.criterion,
            self.config.unseen_category,
        ))
    }

    /// [`Tree::predict`] on the completed tree.
    ///
    /// # Errors
    ///
    /// [`CartError::IncompleteTree`] or any prediction error.
    pub fn predict(&self, samples: &[Vec<Value>]) -> Result<Vec<Prediction>, CartError> {
        self.tree()?.predict(samples)
    }

    /// [`Tree::predict_proba`] on the completed tree.
    ///
    /// # Errors
    ///
    /// [`CartError::IncompleteTree`] or any prediction error.
    pub fn predict_proba(&self, samples: &[Vec<Value>]) -> Result<Vec<ProbabilityVector>, CartError> {
        self.tree()?.predict_proba(samples)
    }

    /// [`Tree::rules`] on the completed tree.
    ///
    /// # Errors
    ///
    /// [`CartError::IncompleteTree`].
    pub fn rules(&self) -> Result<Vec<Rule>, CartError> {
        Ok(self.tree()?.rules())
    }

    /// [`Tree::feature_importances`] on the completed tree.
    ///
    /// # Errors
    ///
    /// [`CartError::IncompleteTree`].
    pub fn feature_importances(&self) -> Result<Vec<FeatureImportance>, CartError> {
        Ok(self.tree()?.feature_importances())
    }

    // --- Internals ---

    fn slot(&self, index: NodeIndex) -> Result<&Slot, CartError> {
        self.slots
            .get(index.index())
            .ok_or(CartError::UnknownNode { node: index })
    }

    fn undecided_slot(&self, index: NodeIndex) -> Result<&Slot, CartError> {
        let slot = self.slot(index)?;
        if slot.state != NodeState::Undecided {
            return Err(CartError::IllegalTransition {
                node: index,
                state: slot.state.as_str(),
            });
        }
        Ok(slot)
    }

    fn check_kind(&self, candidate: &CandidateSplit) -> Result<(), CartError> {
        let spec = self.dataset.schema().feature(candidate.feature.index())?;
        let matches = matches!(
            (spec.kind(), &candidate.rule),
            (FeatureKind::Continuous, CandidateRule::Threshold(_))
                | (FeatureKind::Categorical, CandidateRule::Categories { .. })
        );
        if matches {
            Ok(())
        } else {
            Err(CartError::SplitKindMismatch {
                feature: spec.name().to_string(),
                expected: spec.kind().as_str(),
            })
        }
    }

    fn categorical_column(&self, feature: usize) -> Result<(&[usize], &[String]), CartError> {
        let spec = self.dataset.schema().feature(feature)?;
        match &self.dataset.columns()[feature] {
            Column::Categorical { codes, vocabulary } => Ok((codes.as_slice(), vocabulary.as_slice())),
            Column::Continuous(_) => Err(CartError::SplitKindMismatch {
                feature: spec.name().to_string(),
                expected: spec.kind().as_str(),
            }),
        }
    }

    fn counts(&self, samples: &[usize], n_classes: usize) -> Vec<usize> {
        let labels: Vec<usize> = samples.iter().map(|&i| self.dataset.labels()[i]).collect();
        class_counts(&labels, n_classes)
    }

    fn make_node(&self, id: NodeIndex, depth: usize, samples: &[usize]) -> Node {
        let distribution = self.counts(samples, self.dataset.schema().n_classes());
        Node::leaf(id, depth, distribution, self.config.criterion)
    }

    fn preview_partition(&self, parent: &Node, left: &[usize], right: &[usize]) -> SplitPreview {
        let n_classes = self.dataset.schema().n_classes();
        let left_counts = self.counts(left, n_classes);
        let right_counts = self.counts(right, n_classes);
        let side = |counts: &[usize], n: usize| -> (Option<usize>, f64, f64) {
            if n == 0 {
                return (None, 0.0, 0.0);
            }
            let majority = majority_class(counts);
            (
                Some(majority),
                counts[majority] as f64 / n as f64,
                n as f64 / parent.n_samples as f64,
            )
        };
        let (left_majority, left_confidence, left_share) = side(&left_counts, left.len());
        let (right_majority, right_confidence, right_share) = side(&right_counts, right.len());
        SplitPreview {
            left_n: left.len(),
            right_n: right.len(),
            left_majority,
            right_majority,
            left_confidence,
            right_confidence,
            left_share,
            right_share,
            info_gain: Criterion::Entropy.gain(&parent.distribution, &left_counts, &right_counts),
            gini_reduction: Criterion::Gini.gain(&parent.distribution, &left_counts, &right_counts),
        }
    }

    fn export(&self, index: NodeIndex, out: &mut Vec<Node>) -> NodeIndex {
        let id = NodeIndex::new(out.len());
        let source = &self.slots[index.index()].node;
        let mut node = source.clone();
        node.id = id;
        node.kind = NodeKind::Leaf;
        out.push(node);
        if let NodeKind::Internal { split, left, right } = &source.kind {
            let left = self.export(*left, out);
            let right = self.export(*right, out);
            out[id.index()].kind = NodeKind::Internal {
                split: split.clone(),
                left,
                right,
            };
        }
        id
    }
}

fn check_groups(left: &[String], right: &[String]) -> Result<(), CartError> {
    if left.is_empty() {
        return Err(CartError::EmptyCategoryGroup { side: Side::Left });
    }
    if right.is_empty() {
        return Err(CartError::EmptyCategoryGroup { side: Side::Right });
    }
    if let Some(category) = left.iter().find(|c| right.contains(c)) {
        return Err(CartError::OverlappingCategories {
            category: category.clone(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::FeatureSpec;
    use crate::node::StopReason;

    /// size: continuous, color: categorical; class follows size.
    fn dataset() -> Dataset {
        let rows = vec![
            vec![Value::from(1.0), Value::from("red")],
            vec![Value::from(2.0), Value::from("red")],
            vec![Value::from(3.0), Value::from("blue")],
            vec![Value::from(8.0), Value::from("blue")],
            vec![Value::from(9.0), Value::from("green")],
            vec![Value::from(10.0), Value::from("red")],
        ];
        Dataset::new(
            rows,
            &["A", "A", "A", "B", "B", "B"],
            vec![FeatureSpec::continuous("size"), FeatureSpec::categorical("color")],
        )
        .unwrap()
    }

    fn builder(min_samples_leaf: usize) -> ManualBuilder {
        ManualBuilder::initialize(dataset(), TreeConfig::new().with_min_samples_leaf(min_samples_leaf)).unwrap()
    }

    #[test]
    fn starts_with_single_undecided_root() {
        let b = builder(1);
        assert_eq!(b.undecided(), vec![NodeIndex::ROOT]);
        assert_eq!(b.state(NodeIndex::ROOT).unwrap(), NodeState::Undecided);
        assert!(!b.is_complete());
        assert_eq!(b.node(NodeIndex::ROOT).unwrap().n_samples(), 6);
    }

    #[test]
    fn initialize_validates_like_fit() {
        let err = ManualBuilder::initialize(dataset(), TreeConfig::new()).unwrap_err();
        assert!(matches!(err, CartError::TooFewSamples { n_samples: 6, required: 20 }));
    }

    #[test]
    fn selection_context() {
        let mut b = builder(1);
        assert_eq!(b.selected(), None);
        b.select(NodeIndex::ROOT).unwrap();
        assert_eq!(b.selected(), Some(NodeIndex::ROOT));
        b.deselect();
        assert_eq!(b.selected(), None);
        assert!(matches!(
            b.select(NodeIndex::new(7)),
            Err(CartError::UnknownNode { .. })
        ));
    }

    #[test]
    fn preview_reports_both_gains() {
        let b = builder(1);
        let p = b
            .preview_split(NodeIndex::ROOT, &CandidateSplit::threshold(0, 5.5))
            .unwrap();
        assert_eq!((p.left_n, p.right_n), (3, 3));
        assert_eq!((p.left_majority, p.right_majority), (Some(0), Some(1)));
        assert!((p.left_confidence - 1.0).abs() < 1e-12);
        assert!((p.left_share - 0.5).abs() < 1e-12);
        assert!((p.info_gain - 1.0).abs() < 1e-12);
        assert!((p.gini_reduction - 0.5).abs() < 1e-12);
        assert_eq!(b.undecided(), vec![NodeIndex::ROOT]);
    }

    #[test]
    fn preview_of_empty_branch_has_zero_gain() {
        let b = builder(1);
        let p = b
            .preview_split(NodeIndex::ROOT, &CandidateSplit::threshold(0, 100.0))
            .unwrap();
        assert_eq!((p.left_n, p.right_n), (6, 0));
        assert_eq!(p.right_majority, None);
        assert_eq!(p.info_gain, 0.0);
        assert_eq!(p.gini_reduction, 0.0);
    }

    #[test]
    fn preview_unassigned_category_goes_right() {
        let b = builder(1);
        let p = b
            .preview_split(NodeIndex::ROOT, &CandidateSplit::categories(1, ["red"], ["blue"]))
            .unwrap();
        assert_eq!((p.left_n, p.right_n), (3, 3));
    }

    #[test]
    fn kind_mismatch_is_rejected() {
        let b = builder(1);
        assert!(matches!(
            b.preview_split(NodeIndex::ROOT, &CandidateSplit::threshold(1, 0.5)),
            Err(CartError::SplitKindMismatch { .. })
        ));
        assert!(matches!(
            b.preview_split(NodeIndex::ROOT, &CandidateSplit::threshold(5, 0.5)),
            Err(CartError::UnknownFeature { feature: 5, n_features: 2 })
        ));
    }

    #[test]
    fn empty_branch_commit_fails_and_leaves_node_undecided() {
        let mut b = builder(1);
        let err = b
            .commit_split(NodeIndex::ROOT, &CandidateSplit::threshold(0, 0.5))
            .unwrap_err();
        assert!(matches!(
            err,
            CartError::BranchTooSmall {
                side: Side::Left,
                n_samples: 0,
                ..
            }
        ));
        assert_eq!(b.state(NodeIndex::ROOT).unwrap(), NodeState::Undecided);
        assert_eq!(b.nodes().count(), 1);
        assert!(b.node(NodeIndex::ROOT).unwrap().is_leaf());
    }

    #[test]
    fn commit_split_creates_two_undecided_children() {
        let mut b = builder(1);
        b.select(NodeIndex::ROOT).unwrap();
        let (l, r) = b
            .commit_split(NodeIndex::ROOT, &CandidateSplit::threshold(0, 5.5))
            .unwrap();
        assert_eq!(b.state(NodeIndex::ROOT).unwrap(), NodeState::Split);
        assert_eq!(b.undecided(), vec![l, r]);
        assert_eq!(b.selected(), None);
        let root = b.node(NodeIndex::ROOT).unwrap();
        assert!((root.split().unwrap().gain() - 0.5).abs() < 1e-12);
        assert_eq!(b.node(l).unwrap().n_samples() + b.node(r).unwrap().n_samples(), 6);
        assert_eq!(b.node(l).unwrap().depth(), 1);
    }

    #[test]
    fn decided_nodes_reject_second_commit() {
        let mut b = builder(1);
        b.commit_leaf(NodeIndex::ROOT).unwrap();
        assert!(matches!(
            b.commit_leaf(NodeIndex::ROOT),
            Err(CartError::IllegalTransition { state: "leaf", .. })
        ));
        assert!(matches!(
            b.commit_split(NodeIndex::ROOT, &CandidateSplit::threshold(0, 5.5)),
            Err(CartError::IllegalTransition { .. })
        ));
    }

    #[test]
    fn category_groups_are_validated() {
        let mut b = builder(1);
        let empty = CandidateSplit::categories(1, Vec::<String>::new(), vec!["red".to_string()]);
        assert!(matches!(
            b.commit_split(NodeIndex::ROOT, &empty),
            Err(CartError::EmptyCategoryGroup { side: Side::Left })
        ));
        let overlap = CandidateSplit::categories(1, ["red", "blue"], ["blue", "green"]);
        assert!(matches!(
            b.commit_split(NodeIndex::ROOT, &overlap),
            Err(CartError::OverlappingCategories { ref category }) if category == "blue"
        ));
        assert_eq!(b.nodes().count(), 1);
    }

    #[test]
    fn unassigned_categories_join_right_group() {
        let mut b = builder(1);
        b.commit_split(NodeIndex::ROOT, &CandidateSplit::categories(1, ["red"], ["blue"]))
            .unwrap();
        let split = b.node(NodeIndex::ROOT).unwrap().split().unwrap().clone();
        assert_eq!(
            split.rule(),
            &SplitRule::Categorical {
                left: vec!["red".into()],
                right: vec!["blue".into(), "green".into()],
            }
        );
    }

    #[test]
    fn stopping_rules_guard_splits() {
        let ds = dataset();
        let mut b = ManualBuilder::initialize(ds, TreeConfig::new().with_min_samples_leaf(1).with_max_depth(1)).unwrap();
        let (l, _) = b
            .commit_split(NodeIndex::ROOT, &CandidateSplit::threshold(0, 5.5))
            .unwrap();
        assert!(matches!(
            b.split_check(l),
            Err(CartError::NodeNotSplittable {
                reason: StopReason::MaxDepth,
                ..
            })
        ));

        let b = builder(3);
        assert!(b.split_check(NodeIndex::ROOT).is_ok());
    }

    #[test]
    fn auto_balance_and_median() {
        let b = builder(1);
        // red x3, blue x2, green x1: red left, blue right, green right.
        let balanced = b.auto_balance(NodeIndex::ROOT, 1).unwrap();
        assert_eq!(
            balanced.rule,
            CandidateRule::Categories {
                left: vec!["red".into()],
                right: vec!["blue".into(), "green".into()],
            }
        );
        assert!(matches!(
            b.auto_balance(NodeIndex::ROOT, 0),
            Err(CartError::SplitKindMismatch { .. })
        ));

        let median = b.suggest_threshold(NodeIndex::ROOT, 0).unwrap();
        assert_eq!(median.rule, CandidateRule::Threshold(5.5));
    }

    #[test]
    fn incomplete_tree_is_refused() {
        let mut b = builder(1);
        b.commit_split(NodeIndex::ROOT, &CandidateSplit::threshold(0, 5.5))
            .unwrap();
        assert!(matches!(
            b.tree(),
            Err(CartError::IncompleteTree { n_undecided: 2 })
        ));
        assert!(matches!(b.rules(), Err(CartError::IncompleteTree { .. })));
        assert!(matches!(
            b.predict(&[vec![Value::from(1.0), Value::from("red")]]),
            Err(CartError::IncompleteTree { .. })
        ));

        assert_eq!(b.finalize(), 2);
        assert!(b.is_complete());
        let tree = b.tree().unwrap();
        assert_eq!(tree.n_leaves(), 2);
        assert_eq!(b.rules().unwrap().len(), 2);
    }

    #[test]
    fn manual_best_split_matches_fitted_tree() {
        let mut b = builder(1);
        let (l, r) = b
            .commit_split(NodeIndex::ROOT, &CandidateSplit::threshold(0, 5.5))
            .unwrap();
        b.commit_leaf(l).unwrap();
        b.commit_leaf(r).unwrap();
        let manual = b.tree().unwrap();
        let fitted = TreeConfig::new().with_min_samples_leaf(1).fit(&dataset()).unwrap();
        assert_eq!(manual, fitted);
    }

    #[test]
    fn reset_discards_decisions() {
        let mut b = builder(1);
        b.commit_split(NodeIndex::ROOT, &CandidateSplit::threshold(0, 5.5))
            .unwrap();
        b.reset();
        assert_eq!(b.nodes().count(), 1);
        assert_eq!(b.undecided(), vec![NodeIndex::ROOT]);
    }
}
