//! Greedy recursive CART induction.

use tracing::{debug, instrument};

use crate::config::TreeConfig;
use crate::criterion::class_counts;
use crate::dataset::Dataset;
use crate::error::CartError;
use crate::node::{Node, NodeIndex, NodeKind, StopReason};
use crate::split::{find_best_split, partition};
use crate::tree::Tree;

/// Shared state of one `grow` call.
struct Grower<'a> {
    dataset: &'a Dataset,
    config: &'a TreeConfig,
    arena: Vec<Node>,
}

/// Which stopping rule, if any, forbids splitting a node.
///
/// Shared by the automatic builder and the manual builder's split guard.
pub(crate) fn stop_reason(
    config: &TreeConfig,
    depth: usize,
    n_samples: usize,
    pure: bool,
) -> Option<StopReason> {
    if depth >= config.max_depth {
        Some(StopReason::MaxDepth)
    } else if n_samples < 2 * config.min_samples_leaf {
        Some(StopReason::TooFewSamples)
    } else if pure {
        Some(StopReason::Pure)
    } else {
        None
    }
}

/// Validate, then grow a tree over every sample of `dataset`.
#[instrument(skip_all, fields(n_samples = dataset.n_samples(), max_depth = config.max_depth))]
pub(crate) fn grow(config: &TreeConfig, dataset: &Dataset) -> Result<Tree, CartError> {
    config.validate(dataset)?;

    let mut grower = Grower {
        dataset,
        config,
        arena: Vec::new(),
    };
    let samples: Vec<usize> = (0..dataset.n_samples()).collect();
    let root = grower.build(&samples, 0);
    debug_assert_eq!(root, NodeIndex::ROOT);

    debug!(n_nodes = grower.arena.len(), "decision tree built");

    Ok(Tree::from_parts(
        grower.arena,
        dataset.schema().clone(),
        config.criterion,
        config.unseen_category,
    ))
}

impl Grower<'_> {
    /// Build the subtree over `samples` and return its root index.
    ///
    /// Nodes are numbered in pre-order: a parent is pushed as a leaf before
    /// its children are built, then rewritten as internal.
    fn build(&mut self, samples: &[usize], depth: usize) -> NodeIndex {
        let n_classes = self.dataset.schema().n_classes();
        let labels: Vec<usize> = samples.iter().map(|&i| self.dataset.labels()[i]).collect();
        let distribution = class_counts(&labels, n_classes);

        let id = NodeIndex::new(self.arena.len());
        let node = Node::leaf(id, depth, distribution, self.config.criterion);
        let pure = node.impurity().is_pure();
        self.arena.push(node);

        if let Some(reason) = stop_reason(self.config, depth, samples.len(), pure) {
            debug!(node = %id, depth, %reason, "leaf");
            return id;
        }

        let Some(split) = find_best_split(
            self.dataset,
            samples,
            self.config.criterion,
            self.config.min_samples_leaf,
        ) else {
            debug!(node = %id, depth, reason = %StopReason::NoInformativeSplit, "leaf");
            return id;
        };

        let (left_samples, right_samples) = partition(self.dataset, samples, split.feature, &split.rule);
        debug!(
            node = %id,
            feature = %split.feature,
            gain = split.gain,
            n_left = left_samples.len(),
            n_right = right_samples.len(),
            "split"
        );

        let left = self.build(&left_samples, depth + 1);
        let right = self.build(&right_samples, depth + 1);
        self.arena[id.index()].kind = NodeKind::Internal { split, left, right };
        id
    }
}
