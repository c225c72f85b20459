//! Binary classification metrics over predicted probabilities.
//!
//! Labels are 0/1 (anything above 0.5 counts as positive). The label-based
//! metrics classify a probability as positive when it exceeds
//! [`DECISION_THRESHOLD`]; the ranking metrics use the raw probabilities.

use std::cmp::Ordering;

use log::warn;
use ndarray::{Array1, ArrayView1};

/// Probabilities strictly above this are predicted positive.
pub const DECISION_THRESHOLD: f64 = 0.5;

const TIE_EPS: f64 = 1e-12;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BinaryMetrics {
    pub precision: f64,
    pub average_precision: f64,
    pub sensitivity: f64,
    pub specificity: f64,
    pub auc_roc: f64,
    pub brier: f64,
}

impl BinaryMetrics {
    /// Row labels of the metric table, in the order of [`BinaryMetrics::values`].
    pub const NAMES: [&'static str; 6] = [
        "Precision/PPV",
        "Average Precision",
        "Sensitivity",
        "Specificity",
        "AUC ROC",
        "Brier Score",
    ];

    pub fn values(&self) -> [f64; 6] {
        [
            self.precision,
            self.average_precision,
            self.sensitivity,
            self.specificity,
            self.auc_roc,
            self.brier,
        ]
    }

    /// Computes every metric. Rows where either the label or the probability
    /// is missing are excluded first.
    pub fn compute(labels: ArrayView1<f64>, probabilities: ArrayView1<f64>) -> Self {
        let (labels, probabilities) = complete_pairs(labels, probabilities);
        let labels = labels.view();
        let probabilities = probabilities.view();
        let counts = ConfusionCounts::at_threshold(labels, probabilities, DECISION_THRESHOLD);
        BinaryMetrics {
            precision: counts.precision(),
            average_precision: average_precision(labels, probabilities),
            sensitivity: counts.sensitivity(),
            specificity: counts.specificity(),
            auc_roc: auc_roc(labels, probabilities),
            brier: brier_score(labels, probabilities),
        }
    }
}

fn is_positive(label: f64) -> bool {
    label > 0.5
}

/// Drops rows where the label or the probability is NaN.
pub fn complete_pairs(
    labels: ArrayView1<f64>,
    probabilities: ArrayView1<f64>,
) -> (Array1<f64>, Array1<f64>) {
    let (kept_labels, kept_probabilities): (Vec<f64>, Vec<f64>) = labels
        .iter()
        .zip(probabilities.iter())
        .filter(|(y, p)| !y.is_nan() && !p.is_nan())
        .map(|(&y, &p)| (y, p))
        .unzip();
    let dropped = labels.len() - kept_labels.len();
    if dropped > 0 {
        warn!("Excluded {dropped} of {} rows with a missing label or probability.", labels.len());
    }
    (Array1::from(kept_labels), Array1::from(kept_probabilities))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConfusionCounts {
    pub true_positives: usize,
    pub false_positives: usize,
    pub true_negatives: usize,
    pub false_negatives: usize,
}

impl ConfusionCounts {
    pub fn at_threshold(
        labels: ArrayView1<f64>,
        probabilities: ArrayView1<f64>,
        threshold: f64,
    ) -> Self {
        let mut counts = ConfusionCounts::default();
        for (&y, &p) in labels.iter().zip(probabilities.iter()) {
            match (is_positive(y), p > threshold) {
                (true, true) => counts.true_positives += 1,
                (false, true) => counts.false_positives += 1,
                (false, false) => counts.true_negatives += 1,
                (true, false) => counts.false_negatives += 1,
            }
        }
        counts
    }

    /// 0 when nothing is predicted positive.
    pub fn precision(&self) -> f64 {
        ratio(self.true_positives, self.true_positives + self.false_positives)
    }

    pub fn sensitivity(&self) -> f64 {
        ratio(self.true_positives, self.true_positives + self.false_negatives)
    }

    pub fn specificity(&self) -> f64 {
        ratio(self.true_negatives, self.true_negatives + self.false_positives)
    }
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

/// Scores sorted in descending order and grouped into ties; yields
/// `(positives, negatives)` per group.
fn tie_groups(labels: ArrayView1<f64>, probabilities: ArrayView1<f64>) -> Vec<(f64, f64)> {
    let mut pairs: Vec<(f64, f64)> = probabilities
        .iter()
        .zip(labels.iter())
        .map(|(&p, &y)| (p, y))
        .collect();
    pairs.sort_unstable_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));

    let mut groups = Vec::new();
    let mut i = 0;
    while i < pairs.len() {
        let score = pairs[i].0;
        let mut positives = 0.0;
        let mut negatives = 0.0;
        while i < pairs.len() && (pairs[i].0 - score).abs() <= TIE_EPS {
            if is_positive(pairs[i].1) {
                positives += 1.0;
            } else {
                negatives += 1.0;
            }
            i += 1;
        }
        groups.push((positives, negatives));
    }
    groups
}

/// Area under the ROC curve by the trapezoid rule, ties grouped. NaN when
/// only one class is present.
pub fn auc_roc(labels: ArrayView1<f64>, probabilities: ArrayView1<f64>) -> f64 {
    let total_positives = labels.iter().filter(|&&y| is_positive(y)).count() as f64;
    let total_negatives = labels.len() as f64 - total_positives;
    if total_positives == 0.0 || total_negatives == 0.0 {
        warn!("AUC ROC is undefined when only one class is present.");
        return f64::NAN;
    }

    let mut auc = 0.0;
    let (mut tp, mut fp) = (0.0, 0.0);
    let (mut last_tpr, mut last_fpr) = (0.0, 0.0);
    for (positives, negatives) in tie_groups(labels, probabilities) {
        tp += positives;
        fp += negatives;
        let tpr = tp / total_positives;
        let fpr = fp / total_negatives;
        auc += (fpr - last_fpr) * (tpr + last_tpr) / 2.0;
        last_tpr = tpr;
        last_fpr = fpr;
    }
    auc
}

/// Step-wise area under the precision-recall curve. 0 when there are no positives.
pub fn average_precision(labels: ArrayView1<f64>, probabilities: ArrayView1<f64>) -> f64 {
    let total_positives = labels.iter().filter(|&&y| is_positive(y)).count() as f64;
    if total_positives == 0.0 {
        return 0.0;
    }

    let mut ap = 0.0;
    let (mut tp, mut fp) = (0.0, 0.0);
    let mut last_recall = 0.0;
    for (positives, negatives) in tie_groups(labels, probabilities) {
        tp += positives;
        fp += negatives;
        let recall = tp / total_positives;
        let precision = tp / (tp + fp);
        ap += (recall - last_recall) * precision;
        last_recall = recall;
    }
    ap
}

/// Mean squared difference between probability and label.
pub fn brier_score(labels: ArrayView1<f64>, probabilities: ArrayView1<f64>) -> f64 {
    let n = labels.len() as f64;
    labels
        .iter()
        .zip(probabilities.iter())
        .map(|(&y, &p)| (p - y) * (p - y))
        .sum::<f64>()
        / n
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn perfect_separation() {
        let labels = array![0.0, 0.0, 1.0, 1.0];
        let probs = array![0.1, 0.2, 0.8, 0.9];
        let metrics = BinaryMetrics::compute(labels.view(), probs.view());
        assert_abs_diff_eq!(metrics.auc_roc, 1.0);
        assert_abs_diff_eq!(metrics.average_precision, 1.0);
        assert_abs_diff_eq!(metrics.precision, 1.0);
        assert_abs_diff_eq!(metrics.sensitivity, 1.0);
        assert_abs_diff_eq!(metrics.specificity, 1.0);
        // (0.01 + 0.04 + 0.04 + 0.01) / 4
        assert_abs_diff_eq!(metrics.brier, 0.025, epsilon = 1e-12);
    }

    #[test]
    fn hand_checked_mixed_ranking() {
        // Descending: 0.9(1) 0.7(0) 0.6(1) 0.3(0) 0.2(1) 0.1(0)
        let labels = array![1.0, 0.0, 1.0, 0.0, 1.0, 0.0];
        let probs = array![0.9, 0.7, 0.6, 0.3, 0.2, 0.1];

        // Positive/negative pairs ranked correctly: 3 + 2 + 1 out of 9.
        assert_abs_diff_eq!(auc_roc(labels.view(), probs.view()), 6.0 / 9.0, epsilon = 1e-12);

        let expected_ap = (1.0 / 3.0) * 1.0 + (1.0 / 3.0) * (2.0 / 3.0) + (1.0 / 3.0) * (3.0 / 5.0);
        assert_abs_diff_eq!(
            average_precision(labels.view(), probs.view()),
            expected_ap,
            epsilon = 1e-12
        );

        let counts = ConfusionCounts::at_threshold(labels.view(), probs.view(), DECISION_THRESHOLD);
        assert_eq!(
            counts,
            ConfusionCounts {
                true_positives: 2,
                false_positives: 1,
                true_negatives: 2,
                false_negatives: 1,
            }
        );
        assert_abs_diff_eq!(counts.precision(), 2.0 / 3.0, epsilon = 1e-12);
        assert_abs_diff_eq!(counts.sensitivity(), 2.0 / 3.0, epsilon = 1e-12);
        assert_abs_diff_eq!(counts.specificity(), 2.0 / 3.0, epsilon = 1e-12);
    }

    #[test]
    fn threshold_is_strict() {
        let labels = array![1.0, 0.0];
        let probs = array![0.5, 0.4];
        let counts = ConfusionCounts::at_threshold(labels.view(), probs.view(), DECISION_THRESHOLD);
        assert_eq!(counts.true_positives, 0);
        assert_eq!(counts.false_negatives, 1);
        assert_eq!(counts.precision(), 0.0);
    }

    #[test]
    fn ties_are_grouped() {
        let labels = array![1.0, 0.0];
        let probs = array![0.4, 0.4];
        assert_abs_diff_eq!(auc_roc(labels.view(), probs.view()), 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(average_precision(labels.view(), probs.view()), 0.5, epsilon = 1e-12);
    }

    #[test]
    fn single_class_auc_is_nan() {
        let labels = array![0.0, 0.0, 0.0];
        let probs = array![0.1, 0.5, 0.9];
        assert!(auc_roc(labels.view(), probs.view()).is_nan());
        assert_eq!(average_precision(labels.view(), probs.view()), 0.0);
    }

    #[test]
    fn missing_rows_are_excluded() {
        let labels = array![1.0, f64::NAN, 0.0, 1.0];
        let probs = array![0.9, 0.8, 0.1, f64::NAN];
        let (kept_labels, kept_probs) = complete_pairs(labels.view(), probs.view());
        assert_eq!(kept_labels.to_vec(), vec![1.0, 0.0]);
        assert_eq!(kept_probs.to_vec(), vec![0.9, 0.1]);

        let metrics = BinaryMetrics::compute(labels.view(), probs.view());
        assert_abs_diff_eq!(metrics.brier, (0.01 + 0.01) / 2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(metrics.auc_roc, 1.0);
    }
}
