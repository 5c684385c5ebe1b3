//! Impurity-decrease feature importance of a single tree.

use crate::node::FeatureIndex;
use crate::tree::Tree;

/// A ranked feature with name, importance score, and rank.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FeatureImportance {
    /// Feature column.
    pub feature: FeatureIndex,
    /// Feature name.
    pub name: String,
    /// Normalized importance score (sums to 1.0 across all features, or all 0.0).
    pub importance: f64,
    /// 1-based rank (1 = most important).
    pub rank: usize,
}

impl Tree {
    /// Rank features by total `gain * n_samples` over the internal nodes that split on them.
    ///
    /// Totals are normalized to sum to 1.0; a single-leaf tree yields all
    /// zeros. The result holds every feature, sorted by descending importance
    /// with column order kept among equal scores.
    #[must_use]
    pub fn feature_importances(&self) -> Vec<FeatureImportance> {
        let names = self.schema.feature_names();
        let mut totals = vec![0.0f64; names.len()];

        for node in &self.nodes {
            if let Some(split) = node.split() {
                totals[split.feature.index()] += split.gain * node.n_samples as f64;
            }
        }

        let sum: f64 = totals.iter().sum();
        if sum > 0.0 {
            totals.iter_mut().for_each(|v| *v /= sum);
        }

        let mut features: Vec<FeatureImportance> = names
            .iter()
            .zip(&totals)
            .enumerate()
            .map(|(i, (name, &importance))| FeatureImportance {
                feature: FeatureIndex::new(i),
                name: (*name).to_string(),
                importance,
                rank: 0,
            })
            .collect();

        features.sort_by(|a, b| b.importance.total_cmp(&a.importance));
        for (i, feat) in features.iter_mut().enumerate() {
            feat.rank = i + 1;
        }

        features
    }
}

#[cfg(test)]
mod tests {
    use crate::config::TreeConfig;
    use crate::dataset::{FeatureSpec, Value};

    #[test]
    fn informative_feature_ranks_first() {
        let rows: Vec<Vec<Value>> = (0..12)
            .map(|i| vec![Value::from(f64::from(i % 2)), Value::from(f64::from(i))])
            .collect();
        let labels: Vec<&str> = (0..12).map(|i| if i < 6 { "lo" } else { "hi" }).collect();
        let tree = TreeConfig::new()
            .with_min_samples_leaf(1)
            .fit_rows(rows, &labels, vec![FeatureSpec::continuous("noise"), FeatureSpec::continuous("signal")])
            .unwrap();

        let ranked = tree.feature_importances();
        assert_eq!(ranked[0].name, "signal");
        assert_eq!(ranked[0].rank, 1);
        assert!((ranked[0].importance - 1.0).abs() < 1e-12);
        assert_eq!(ranked[1].importance, 0.0);
        let sum: f64 = ranked.iter().map(|f| f.importance).sum();
        assert!((sum - 1.0).abs() < 1e-12);
    }

    #[test]
    fn single_leaf_tree_has_zero_importances() {
        let rows: Vec<Vec<Value>> = (0..4).map(|i| vec![Value::from(f64::from(i))]).collect();
        let tree = TreeConfig::new()
            .with_min_samples_leaf(1)
            .fit(
                &crate::dataset::Dataset::with_classes(
                    rows,
                    &["a"; 4],
                    vec![FeatureSpec::continuous("x")],
                    vec!["a".into(), "b".into()],
                )
                .unwrap(),
            )
            .unwrap();
        assert_eq!(tree.n_nodes(), 1);
        let ranked = tree.feature_importances();
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].importance, 0.0);
        assert_eq!(ranked[0].rank, 1);
    }
}
