use crate::config::UnseenCategoryPolicy;
use crate::criterion::Criterion;
use crate::dataset::Schema;
use crate::node::{Node, NodeIndex};

/// A completed classification tree.
///
/// Stored as an arena-based `Vec<Node>` in pre-order with the root at
/// index 0, so traversal is index chasing and serialization is trivial.
/// Built by [`TreeConfig::fit`](crate::config::TreeConfig::fit) or by
/// completing a [`ManualBuilder`](crate::manual::ManualBuilder); immutable
/// afterwards.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Tree {
    pub(crate) nodes: Vec<Node>,
    pub(crate) schema: Schema,
    pub(crate) criterion: Criterion,
    pub(crate) unseen_category: UnseenCategoryPolicy,
}

/// Summary shape of a tree.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TreeStats {
    /// Total node count.
    pub n_nodes: usize,
    /// Leaf count.
    pub n_leaves: usize,
    /// Depth of the deepest leaf (a single-leaf tree has depth 0).
    pub depth: usize,
    /// Class names in index order.
    pub classes: Vec<String>,
    /// Feature names in column order.
    pub features: Vec<String>,
}

impl Tree {
    pub(crate) fn from_parts(
        nodes: Vec<Node>,
        schema: Schema,
        criterion: Criterion,
        unseen_category: UnseenCategoryPolicy,
    ) -> Self {
        Self {
            nodes,
            schema,
            criterion,
            unseen_category,
        }
    }

    /// Return all nodes in arena (pre-order) order.
    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Return the node at `index`, if it exists.
    #[must_use]
    pub fn node(&self, index: NodeIndex) -> Option<&Node> {
        self.nodes.get(index.index())
    }

    /// Return the root node.
    #[must_use]
    pub fn root(&self) -> &Node {
        &self.nodes[NodeIndex::ROOT.index()]
    }

    /// Return the feature and class metadata.
    #[must_use]
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Return the impurity criterion the tree was grown with.
    #[must_use]
    pub fn criterion(&self) -> Criterion {
        self.criterion
    }

    /// Return the unseen-category routing policy.
    #[must_use]
    pub fn unseen_category(&self) -> UnseenCategoryPolicy {
        self.unseen_category
    }

    /// Return the total node count.
    #[must_use]
    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Return the leaf count.
    #[must_use]
    pub fn n_leaves(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_leaf()).count()
    }

    /// Return the depth of the deepest node.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.nodes.iter().map(Node::depth).max().unwrap_or(0)
    }

    /// Return node counts, depth, and metadata in one record.
    #[must_use]
    pub fn stats(&self) -> TreeStats {
        TreeStats {
            n_nodes: self.n_nodes(),
            n_leaves: self.n_leaves(),
            depth: self.depth(),
            classes: self.schema.classes().to_vec(),
            features: self
                .schema
                .feature_names()
                .into_iter()
                .map(str::to_string)
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::config::TreeConfig;
    use crate::dataset::{FeatureSpec, Value};

    #[test]
    fn stats_of_small_tree() {
        let rows = [1.0, 2.0, 3.0, 8.0, 9.0, 10.0]
            .iter()
            .map(|&v| vec![Value::from(v)])
            .collect();
        let tree = TreeConfig::new()
            .with_min_samples_leaf(1)
            .fit_rows(rows, &["A", "A", "A", "B", "B", "B"], vec![FeatureSpec::continuous("x")])
            .unwrap();
        let stats = tree.stats();
        assert_eq!(stats.n_nodes, 3);
        assert_eq!(stats.n_leaves, 2);
        assert_eq!(stats.depth, 1);
        assert_eq!(stats.classes, vec!["A".to_string(), "B".to_string()]);
        assert_eq!(stats.features, vec!["x".to_string()]);
        assert_eq!(tree.root().id().index(), 0);
    }
}
