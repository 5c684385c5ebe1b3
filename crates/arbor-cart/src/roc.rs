//! Receiver operating characteristic curve and its area.

use crate::error::CartError;
use crate::predict::ProbabilityVector;

/// ROC curve of one positive class.
///
/// `fpr[i]`, `tpr[i]` are the rates when every sample scoring at least
/// `thresholds[i]` is called positive. The first point is (0, 0) with a
/// threshold of +inf; the last is (1, 1).
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RocCurve {
    /// False positive rates, non-decreasing.
    pub fpr: Vec<f64>,
    /// True positive rates, non-decreasing.
    pub tpr: Vec<f64>,
    /// Score cut-off of each point.
    pub thresholds: Vec<f64>,
    /// Trapezoidal area under the curve, in [0, 1].
    pub auc: f64,
}

impl RocCurve {
    fn diagonal() -> Self {
        Self {
            fpr: vec![0.0, 1.0],
            tpr: vec![0.0, 1.0],
            thresholds: vec![f64::INFINITY, f64::NEG_INFINITY],
            auc: 0.5,
        }
    }
}

/// Compute the ROC curve of `positive_class` from per-sample probability vectors.
///
/// Samples are sorted by descending positive-class probability; all samples
/// sharing one probability form a single step. With no positive or no
/// negative sample the curve is the diagonal with an AUC of 0.5.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`CartError::EmptyDataset`] | Zero labels provided |
/// | [`CartError::LengthMismatch`] | Labels and probabilities differ in length |
/// | [`CartError::UnknownClass`] | `positive_class` is outside the probability vectors |
pub fn roc_curve(
    true_labels: &[usize],
    probabilities: &[ProbabilityVector],
    positive_class: usize,
) -> Result<RocCurve, CartError> {
    if true_labels.is_empty() {
        return Err(CartError::EmptyDataset);
    }
    if true_labels.len() != probabilities.len() {
        return Err(CartError::LengthMismatch {
            n_labels: true_labels.len(),
            n_predictions: probabilities.len(),
        });
    }
    if let Some(pv) = probabilities.iter().find(|pv| positive_class >= pv.as_slice().len()) {
        return Err(CartError::UnknownClass {
            class: positive_class,
            n_classes: pv.as_slice().len(),
        });
    }

    let scored: Vec<(f64, bool)> = probabilities
        .iter()
        .zip(true_labels)
        .map(|(pv, &label)| (pv.get(positive_class), label == positive_class))
        .collect();
    Ok(roc_from_scores(scored))
}

/// Build the curve from `(score, is_positive)` pairs.
fn roc_from_scores(mut scored: Vec<(f64, bool)>) -> RocCurve {
    let n_pos = scored.iter().filter(|(_, p)| *p).count();
    let n_neg = scored.len() - n_pos;
    if n_pos == 0 || n_neg == 0 {
        return RocCurve::diagonal();
    }

    scored.sort_by(|a, b| b.0.total_cmp(&a.0));

    let mut fpr = vec![0.0];
    let mut tpr = vec![0.0];
    let mut thresholds = vec![f64::INFINITY];
    let (mut tp, mut fp) = (0usize, 0usize);

    let mut i = 0;
    while i < scored.len() {
        let score = scored[i].0;
        while i < scored.len() && scored[i].0 == score {
            if scored[i].1 {
                tp += 1;
            } else {
                fp += 1;
            }
            i += 1;
        }
        fpr.push(fp as f64 / n_neg as f64);
        tpr.push(tp as f64 / n_pos as f64);
        thresholds.push(score);
    }

    let auc = (1..fpr.len())
        .map(|k| (fpr[k] - fpr[k - 1]) * (tpr[k] + tpr[k - 1]) / 2.0)
        .sum();

    RocCurve {
        fpr,
        tpr,
        thresholds,
        auc,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pv(p_pos: f64) -> ProbabilityVector {
        // Class 0 = pos, class 1 = neg; build from integer counts scaled by 100.
        let pos = (p_pos * 100.0).round() as usize;
        ProbabilityVector::from_counts(&[pos, 100 - pos])
    }

    #[test]
    fn perfect_separation_has_unit_auc() {
        let labels = [0, 1, 0, 1];
        let probs: Vec<_> = [0.9, 0.1, 0.8, 0.4].iter().map(|&p| pv(p)).collect();
        let roc = roc_curve(&labels, &probs, 0).unwrap();
        assert!((roc.auc - 1.0).abs() < 1e-12);
        assert_eq!(roc.fpr.first(), Some(&0.0));
        assert_eq!(roc.tpr.last(), Some(&1.0));
    }

    #[test]
    fn tied_scores_form_one_step() {
        // Same layout as a textbook example: AUC 0.875.
        let labels = [0, 0, 1, 1];
        let probs: Vec<_> = [0.9, 0.4, 0.4, 0.2].iter().map(|&p| pv(p)).collect();
        let roc = roc_curve(&labels, &probs, 0).unwrap();
        assert_eq!(roc.fpr, vec![0.0, 0.0, 0.5, 1.0]);
        assert_eq!(roc.tpr, vec![0.0, 0.5, 1.0, 1.0]);
        assert!((roc.auc - 0.875).abs() < 1e-12);
    }

    #[test]
    fn rates_are_monotone_and_anchored() {
        let labels = [1, 0, 1, 1, 0, 0, 1, 0];
        let probs: Vec<_> = [0.3, 0.7, 0.5, 0.1, 0.5, 0.9, 0.2, 0.6].iter().map(|&p| pv(p)).collect();
        let roc = roc_curve(&labels, &probs, 0).unwrap();
        assert!(roc.fpr.windows(2).all(|w| w[0] <= w[1]));
        assert!(roc.tpr.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!((roc.fpr[0], roc.tpr[0]), (0.0, 0.0));
        assert_eq!((*roc.fpr.last().unwrap(), *roc.tpr.last().unwrap()), (1.0, 1.0));
        assert!((0.0..=1.0).contains(&roc.auc));
    }

    #[test]
    fn single_class_is_diagonal() {
        let labels = [0, 0, 0];
        let probs: Vec<_> = [0.9, 0.2, 0.5].iter().map(|&p| pv(p)).collect();
        let roc = roc_curve(&labels, &probs, 0).unwrap();
        assert_eq!(roc.fpr, vec![0.0, 1.0]);
        assert_eq!(roc.tpr, vec![0.0, 1.0]);
        assert_eq!(roc.auc, 0.5);
    }

    #[test]
    fn input_errors() {
        let probs = vec![pv(0.5)];
        assert!(matches!(roc_curve(&[], &[], 0), Err(CartError::EmptyDataset)));
        assert!(matches!(
            roc_curve(&[0, 1], &probs, 0),
            Err(CartError::LengthMismatch { .. })
        ));
        assert!(matches!(
            roc_curve(&[0], &probs, 2),
            Err(CartError::UnknownClass { class: 2, n_classes: 2 })
        ));
    }
}
