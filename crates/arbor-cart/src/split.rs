//! Best-split search over continuous and categorical features.
//!
//! Both searches only consider candidates whose branches each hold at least
//! `min_samples_leaf` samples, and keep the first candidate found on exact
//! gain ties: thresholds in ascending order, bipartition masks in ascending
//! order, features in column order.

use tracing::trace;

use crate::criterion::{Criterion, class_counts};
use crate::dataset::{Column, Dataset, MAX_CATEGORIES};
use crate::node::{FeatureIndex, Split, SplitRule};

/// Gains at or below this are treated as no improvement.
pub(crate) const MIN_GAIN: f64 = 1e-12;

/// Best threshold found on one continuous feature.
#[derive(Debug, Clone, PartialEq)]
pub struct ContinuousSplit {
    /// Midpoint between two consecutive distinct values; `<=` goes left.
    pub threshold: f64,
    /// Impurity decrease of the split.
    pub gain: f64,
    /// Samples routed left.
    pub n_left: usize,
    /// Samples routed right.
    pub n_right: usize,
}

/// Best bipartition found on one categorical feature.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoricalSplit {
    /// Categories routed left, in first-appearance order.
    pub left: Vec<String>,
    /// Categories routed right, in first-appearance order.
    pub right: Vec<String>,
    /// Impurity decrease of the split.
    pub gain: f64,
    /// Samples routed left.
    pub n_left: usize,
    /// Samples routed right.
    pub n_right: usize,
}

/// Find the best threshold for one continuous feature.
///
/// `values[i]` and `labels[i]` describe the i-th sample at the node. The
/// pairs are sorted by value and scanned left to right with incremental
/// class counts; a threshold is only evaluated between two distinct values.
///
/// Returns `None` when the feature is constant or every candidate violates
/// `min_samples_leaf`. The returned gain may be zero.
#[must_use]
pub fn best_continuous_split(
    values: &[f64],
    labels: &[usize],
    n_classes: usize,
    criterion: Criterion,
    min_samples_leaf: usize,
) -> Option<ContinuousSplit> {
    let n_samples = values.len();
    if n_samples < 2 {
        return None;
    }

    let mut sorted: Vec<(f64, usize)> = values.iter().copied().zip(labels.iter().copied()).collect();
    sorted.sort_by(|a, b| a.0.total_cmp(&b.0));

    let parent = class_counts(labels, n_classes);
    let mut left = vec![0usize; n_classes];
    let mut right = parent.clone();
    let mut best: Option<ContinuousSplit> = None;

    for i in 0..(n_samples - 1) {
        let (value, class) = sorted[i];
        left[class] += 1;
        right[class] -= 1;

        let next = sorted[i + 1].0;
        if value == next {
            continue;
        }

        let n_left = i + 1;
        let n_right = n_samples - n_left;
        if n_left < min_samples_leaf || n_right < min_samples_leaf {
            continue;
        }

        let gain = criterion.gain(&parent, &left, &right);
        if best.as_ref().is_none_or(|b| gain > b.gain) {
            best = Some(ContinuousSplit {
                threshold: (value + next) / 2.0,
                gain,
                n_left,
                n_right,
            });
        }
    }

    best
}

/// Find the best bipartition of one categorical feature.
///
/// Categories are numbered in order of first appearance in `values`. Every
/// mask `1..2^(k-1)` is evaluated, with bit `i` sending category `i` to the
/// left; the last category therefore always goes right and each bipartition
/// is visited exactly once. The search is exponential in the number of
/// categories present, so it is bounded by [`MAX_CATEGORIES`].
///
/// Returns `None` when fewer than two or more than [`MAX_CATEGORIES`]
/// categories are present, or every candidate violates `min_samples_leaf`.
/// The returned gain may be zero.
#[must_use]
pub fn best_categorical_split<S: AsRef<str>>(
    values: &[S],
    labels: &[usize],
    n_classes: usize,
    criterion: Criterion,
    min_samples_leaf: usize,
) -> Option<CategoricalSplit> {
    let mut names: Vec<&str> = Vec::new();
    let codes: Vec<usize> = values
        .iter()
        .map(|v| {
            let v = v.as_ref();
            match names.iter().position(|n| *n == v) {
                Some(code) => code,
                None => {
                    names.push(v);
                    names.len() - 1
                }
            }
        })
        .collect();
    if names.len() > MAX_CATEGORIES {
        return None;
    }

    let (mask, best) = search_bipartitions(&codes, names.len(), labels, n_classes, criterion, min_samples_leaf)?;
    let (left, right) = split_names(mask, &names);
    Some(CategoricalSplit {
        left,
        right,
        ..best
    })
}

/// Shared mask enumeration over dense category codes `0..n_categories`.
///
/// Returns the winning mask and a [`CategoricalSplit`] whose name lists are
/// still empty. `n_categories` must not exceed [`MAX_CATEGORIES`].
fn search_bipartitions(
    codes: &[usize],
    n_categories: usize,
    labels: &[usize],
    n_classes: usize,
    criterion: Criterion,
    min_samples_leaf: usize,
) -> Option<(u64, CategoricalSplit)> {
    debug_assert!(n_categories <= MAX_CATEGORIES, "category count must not exceed MAX_CATEGORIES");
    if n_categories < 2 {
        return None;
    }

    let mut per_category = vec![vec![0usize; n_classes]; n_categories];
    for (&code, &label) in codes.iter().zip(labels) {
        per_category[code][label] += 1;
    }
    let totals: Vec<usize> = per_category.iter().map(|c| c.iter().sum()).collect();
    let parent = class_counts(labels, n_classes);
    let n_samples = labels.len();

    let n_masks: u64 = 1 << (n_categories - 1);
    let mut left = vec![0usize; n_classes];
    let mut right = vec![0usize; n_classes];
    let mut best: Option<(u64, CategoricalSplit)> = None;

    for mask in 1..n_masks {
        let n_left: usize = (0..n_categories)
            .filter(|&c| mask & (1u64 << c) != 0)
            .map(|c| totals[c])
            .sum();
        let n_right = n_samples - n_left;
        if n_left < min_samples_leaf || n_right < min_samples_leaf {
            continue;
        }

        left.iter_mut().for_each(|c| *c = 0);
        for (c, counts) in per_category.iter().enumerate() {
            if mask & (1u64 << c) != 0 {
                for (acc, &count) in left.iter_mut().zip(counts) {
                    *acc += count;
                }
            }
        }
        for ((r, &p), &l) in right.iter_mut().zip(&parent).zip(&left) {
            *r = p - l;
        }

        let gain = criterion.gain(&parent, &left, &right);
        if best.as_ref().is_none_or(|(_, b)| gain > b.gain) {
            best = Some((
                mask,
                CategoricalSplit {
                    left: Vec::new(),
                    right: Vec::new(),
                    gain,
                    n_left,
                    n_right,
                },
            ));
        }
    }

    best
}

fn split_names<S: AsRef<str>>(mask: u64, names: &[S]) -> (Vec<String>, Vec<String>) {
    let mut left = Vec::new();
    let mut right = Vec::new();
    for (c, name) in names.iter().enumerate() {
        if mask & (1u64 << c) != 0 {
            left.push(name.as_ref().to_string());
        } else {
            right.push(name.as_ref().to_string());
        }
    }
    (left, right)
}

/// Find the best split of the samples at one node across all features.
///
/// Returns `None` when no feature yields an admissible split with positive
/// gain, which tells the builder to emit a leaf.
pub(crate) fn find_best_split(
    dataset: &Dataset,
    samples: &[usize],
    criterion: Criterion,
    min_samples_leaf: usize,
) -> Option<Split> {
    let n_classes = dataset.schema().n_classes();
    let labels: Vec<usize> = samples.iter().map(|&i| dataset.labels()[i]).collect();
    let mut best: Option<Split> = None;

    for (feature_idx, column) in dataset.columns().iter().enumerate() {
        let candidate = match column {
            Column::Continuous(values) => {
                let node_values: Vec<f64> = samples.iter().map(|&i| values[i]).collect();
                best_continuous_split(&node_values, &labels, n_classes, criterion, min_samples_leaf)
                    .map(|s| (SplitRule::Continuous { threshold: s.threshold }, s.gain))
            }
            Column::Categorical { codes, vocabulary } => {
                // Renumber the codes present here in first-appearance order.
                let mut local = vec![usize::MAX; vocabulary.len()];
                let mut present: Vec<&str> = Vec::new();
                let node_codes: Vec<usize> = samples
                    .iter()
                    .map(|&i| {
                        let code = codes[i];
                        if local[code] == usize::MAX {
                            local[code] = present.len();
                            present.push(&vocabulary[code]);
                        }
                        local[code]
                    })
                    .collect();
                search_bipartitions(&node_codes, present.len(), &labels, n_classes, criterion, min_samples_leaf)
                    .map(|(mask, s)| {
                        let (left, right) = split_names(mask, &present);
                        (SplitRule::Categorical { left, right }, s.gain)
                    })
            }
        };

        if let Some((rule, gain)) = candidate {
            trace!(feature = feature_idx, gain, "feature candidate");
            if best.as_ref().is_none_or(|b| gain > b.gain) {
                best = Some(Split {
                    feature: FeatureIndex::new(feature_idx),
                    rule,
                    gain,
                });
            }
        }
    }

    best.filter(|s| s.gain > MIN_GAIN)
}

/// Partition node samples by a split rule.
///
/// A category in neither group of a categorical rule goes right. Training
/// samples at the node never hit that case for a searched split, since every
/// present category is assigned a side. The rule kind must match the
/// column kind; callers check it before partitioning.
pub(crate) fn partition(
    dataset: &Dataset,
    samples: &[usize],
    feature: FeatureIndex,
    rule: &SplitRule,
) -> (Vec<usize>, Vec<usize>) {
    let column = &dataset.columns()[feature.index()];
    let goes_left: Box<dyn Fn(usize) -> bool + '_> = match (column, rule) {
        (Column::Continuous(values), SplitRule::Continuous { threshold }) => {
            let threshold = *threshold;
            Box::new(move |i| values[i] <= threshold)
        }
        (Column::Categorical { codes, vocabulary }, SplitRule::Categorical { left, .. }) => {
            let left_codes: Vec<bool> = vocabulary.iter().map(|v| left.contains(v)).collect();
            Box::new(move |i| left_codes[codes[i]])
        }
        _ => unreachable!("split rule kind must match the column kind"),
    };
    samples.iter().partition(|&&i| goes_left(i))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{FeatureSpec, Value};

    #[test]
    fn separable_continuous_finds_midpoint() {
        let values = [1.0, 2.0, 3.0, 8.0, 9.0, 10.0];
        let labels = [0, 0, 0, 1, 1, 1];
        let split = best_continuous_split(&values, &labels, 2, Criterion::Gini, 1).unwrap();
        assert!((split.threshold - 5.5).abs() < 1e-12);
        assert!((split.gain - 0.5).abs() < 1e-12);
        assert_eq!((split.n_left, split.n_right), (3, 3));
    }

    #[test]
    fn unsorted_input_is_handled() {
        let values = [9.0, 1.0, 10.0, 3.0, 2.0, 8.0];
        let labels = [1, 0, 1, 0, 0, 1];
        let split = best_continuous_split(&values, &labels, 2, Criterion::Entropy, 1).unwrap();
        assert!(split.threshold > 3.0 && split.threshold < 8.0);
        assert!((split.gain - 1.0).abs() < 1e-12);
    }

    #[test]
    fn constant_feature_returns_none() {
        let split = best_continuous_split(&[5.0; 4], &[0, 0, 1, 1], 2, Criterion::Gini, 1);
        assert!(split.is_none());
    }

    #[test]
    fn min_samples_leaf_enforced() {
        assert!(best_continuous_split(&[1.0, 10.0], &[0, 1], 2, Criterion::Gini, 2).is_none());

        // Best boundary (after 1 sample) is inadmissible with msl = 2.
        let values = [1.0, 5.0, 6.0, 7.0];
        let labels = [0, 1, 1, 1];
        let split = best_continuous_split(&values, &labels, 2, Criterion::Gini, 2).unwrap();
        assert!((split.threshold - 5.5).abs() < 1e-12);
        assert_eq!(split.n_left, 2);
    }

    #[test]
    fn thresholds_only_between_distinct_values() {
        let values = [1.0, 1.0, 2.0, 2.0];
        let labels = [0, 1, 0, 1];
        let split = best_continuous_split(&values, &labels, 2, Criterion::Gini, 1).unwrap();
        assert!((split.threshold - 1.5).abs() < 1e-12);
        assert!(split.gain.abs() < 1e-12);
    }

    #[test]
    fn first_threshold_wins_ties() {
        // Boundaries after 1.0 and after 3.0 give identical gain.
        let values = [1.0, 2.0, 3.0, 4.0];
        let labels = [0, 1, 1, 0];
        let split = best_continuous_split(&values, &labels, 2, Criterion::Gini, 1).unwrap();
        assert!((split.threshold - 1.5).abs() < 1e-12);
    }

    #[test]
    fn separable_categorical_bipartition() {
        let values = ["x", "y", "z", "x", "y", "z"];
        let labels = [0, 1, 1, 0, 1, 1];
        let split = best_categorical_split(&values, &labels, 2, Criterion::Gini, 1).unwrap();
        assert_eq!(split.left, vec!["x".to_string()]);
        assert_eq!(split.right, vec!["y".to_string(), "z".to_string()]);
        assert!(split.gain > 0.0);
        assert_eq!((split.n_left, split.n_right), (2, 4));
    }

    #[test]
    fn categorical_mask_order_follows_first_appearance() {
        let values = ["z", "x", "z", "x"];
        let labels = [1, 0, 1, 0];
        let split = best_categorical_split(&values, &labels, 2, Criterion::Gini, 1).unwrap();
        assert_eq!(split.left, vec!["z".to_string()]);
        assert_eq!(split.right, vec!["x".to_string()]);
    }

    #[test]
    fn single_category_returns_none() {
        let split = best_categorical_split(&["a", "a", "a"], &[0, 1, 0], 2, Criterion::Gini, 1);
        assert!(split.is_none());
    }

    #[test]
    fn categorical_min_samples_leaf_enforced() {
        let values = ["a", "b", "b", "b"];
        let labels = [0, 1, 1, 1];
        assert!(best_categorical_split(&values, &labels, 2, Criterion::Gini, 2).is_none());
    }

    #[test]
    fn categorical_search_refuses_oversized_domains() {
        for n_categories in [MAX_CATEGORIES + 1, 34, 70] {
            let values: Vec<String> = (0..n_categories).map(|i| format!("c{i}")).collect();
            let labels: Vec<usize> = (0..n_categories).map(|i| i % 2).collect();
            let split = best_categorical_split(&values, &labels, 2, Criterion::Gini, 1);
            assert!(split.is_none(), "{n_categories} categories should not be searched");
        }
    }

    #[test]
    fn categorical_search_at_category_limit() {
        // c0..c9 are labeled 0 and c10..c19 are labeled 1; only one mask is pure.
        let values: Vec<String> = (0..MAX_CATEGORIES).map(|i| format!("c{i}")).collect();
        let labels: Vec<usize> = (0..MAX_CATEGORIES).map(|i| usize::from(i >= 10)).collect();
        let split = best_categorical_split(&values, &labels, 2, Criterion::Gini, 1).unwrap();
        let expected: Vec<String> = (0..10).map(|i| format!("c{i}")).collect();
        assert_eq!(split.left, expected);
        assert_eq!(split.right.len(), 10);
        assert!((split.gain - 0.5).abs() < 1e-12);
    }

    #[test]
    fn find_best_split_prefers_informative_feature() {
        let rows = vec![
            vec![Value::from(1.0), Value::from("a")],
            vec![Value::from(2.0), Value::from("b")],
            vec![Value::from(3.0), Value::from("a")],
            vec![Value::from(4.0), Value::from("b")],
        ];
        let ds = Dataset::new(
            rows,
            &["n", "n", "y", "y"],
            vec![FeatureSpec::continuous("x"), FeatureSpec::categorical("c")],
        )
        .unwrap();
        let samples: Vec<usize> = (0..4).collect();
        let split = find_best_split(&ds, &samples, Criterion::Gini, 1).unwrap();
        assert_eq!(split.feature().index(), 0);
        assert_eq!(split.rule(), &SplitRule::Continuous { threshold: 2.5 });

        let (left, right) = partition(&ds, &samples, split.feature(), split.rule());
        assert_eq!(left, vec![0, 1]);
        assert_eq!(right, vec![2, 3]);
    }

    #[test]
    fn find_best_split_none_without_gain() {
        let rows = vec![
            vec![Value::from("a")],
            vec![Value::from("a")],
            vec![Value::from("b")],
            vec![Value::from("b")],
        ];
        let ds = Dataset::new(rows, &["n", "y", "n", "y"], vec![FeatureSpec::categorical("c")]).unwrap();
        let samples: Vec<usize> = (0..4).collect();
        assert!(find_best_split(&ds, &samples, Criterion::Gini, 1).is_none());
    }

    #[test]
    fn partition_categorical_uses_left_set() {
        let rows = vec![
            vec![Value::from("x")],
            vec![Value::from("y")],
            vec![Value::from("z")],
        ];
        let ds = Dataset::new(rows, &["a", "b", "b"], vec![FeatureSpec::categorical("c")]).unwrap();
        let rule = SplitRule::Categorical {
            left: vec!["x".into()],
            right: vec!["y".into()],
        };
        let (left, right) = partition(&ds, &[0, 1, 2], FeatureIndex::new(0), &rule);
        assert_eq!(left, vec![0]);
        assert_eq!(right, vec![1, 2]);
    }

    #[test]
    #[should_panic(expected = "split rule kind must match the column kind")]
    fn partition_rejects_mismatched_rule_kind() {
        let rows = vec![vec![Value::from(1.0)], vec![Value::from(2.0)]];
        let ds = Dataset::new(rows, &["a", "b"], vec![FeatureSpec::continuous("x")]).unwrap();
        let rule = SplitRule::Categorical {
            left: vec!["x".into()],
            right: vec!["y".into()],
        };
        let _ = partition(&ds, &[0, 1], FeatureIndex::new(0), &rule);
    }
}
