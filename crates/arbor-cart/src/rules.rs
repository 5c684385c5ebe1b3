//! Root-to-leaf decision rules.

use std::fmt;

use crate::node::{NodeIndex, NodeKind, SplitRule};
use crate::tree::Tree;

/// One edge test on a root-to-leaf path.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum Condition {
    /// `feature <= threshold`
    LessOrEqual {
        /// Feature name.
        feature: String,
        /// Split threshold.
        threshold: f64,
    },
    /// `feature > threshold`
    Greater {
        /// Feature name.
        feature: String,
        /// Split threshold.
        threshold: f64,
    },
    /// `feature ∈ {categories}`
    InSet {
        /// Feature name.
        feature: String,
        /// Categories of the branch taken.
        categories: Vec<String>,
    },
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::LessOrEqual { feature, threshold } => write!(f, "{feature} ≤ {threshold:.2}"),
            Condition::Greater { feature, threshold } => write!(f, "{feature} > {threshold:.2}"),
            Condition::InSet { feature, categories } => {
                write!(f, "{feature} ∈ {{{}}}", categories.join(", "))
            }
        }
    }
}

/// A conjunction of conditions and the leaf it leads to.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Rule {
    /// Edge tests from the root, outermost first.
    pub conditions: Vec<Condition>,
    /// Predicted class name of the leaf.
    pub prediction: String,
    /// Majority share of the leaf.
    pub confidence: f64,
    /// Training samples that reached the leaf.
    pub n_samples: usize,
    /// The leaf node.
    pub leaf: NodeIndex,
}

impl Rule {
    /// The conditions joined by `AND`, or `Always` for a root leaf.
    #[must_use]
    pub fn condition_text(&self) -> String {
        if self.conditions.is_empty() {
            return "Always".to_string();
        }
        self.conditions
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" AND ")
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IF {} THEN predict {}", self.condition_text(), self.prediction)
    }
}

impl Tree {
    /// Extract one rule per leaf, depth-first with left before right.
    #[must_use]
    pub fn rules(&self) -> Vec<Rule> {
        let mut rules = Vec::with_capacity(self.n_leaves());
        let mut path = Vec::new();
        self.collect_rules(NodeIndex::ROOT, &mut path, &mut rules);
        rules
    }

    fn collect_rules(&self, idx: NodeIndex, path: &mut Vec<Condition>, rules: &mut Vec<Rule>) {
        let node = &self.nodes[idx.index()];
        let NodeKind::Internal { split, left, right } = &node.kind else {
            rules.push(Rule {
                conditions: path.clone(),
                prediction: self.schema.classes()[node.prediction].clone(),
                confidence: node.confidence,
                n_samples: node.n_samples,
                leaf: idx,
            });
            return;
        };

        let feature = self.schema.features()[split.feature.index()].name().to_string();
        let (go_left, go_right) = match &split.rule {
            SplitRule::Continuous { threshold } => (
                Condition::LessOrEqual {
                    feature: feature.clone(),
                    threshold: *threshold,
                },
                Condition::Greater {
                    feature,
                    threshold: *threshold,
                },
            ),
            SplitRule::Categorical { left, right } => (
                Condition::InSet {
                    feature: feature.clone(),
                    categories: left.clone(),
                },
                Condition::InSet {
                    feature,
                    categories: right.clone(),
                },
            ),
        };

        path.push(go_left);
        self.collect_rules(*left, path, rules);
        path.pop();
        path.push(go_right);
        self.collect_rules(*right, path, rules);
        path.pop();
    }
}
