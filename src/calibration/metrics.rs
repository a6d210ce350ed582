use ndarray::Zip;
use serde::{Deserialize, Serialize};

use super::observation::ObservationColumns;
use crate::scoring::{AdjustmentParams, IMPACT_THRESHOLD};

/// Binary prediction outcome counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionCounts {
    pub true_positive: usize,
    pub false_positive: usize,
    pub true_negative: usize,
    pub false_negative: usize,
}

impl ConfusionCounts {
    pub fn record(&mut self, predicted: bool, actual: bool) {
        match (predicted, actual) {
            (true, true) => self.true_positive += 1,
            (true, false) => self.false_positive += 1,
            (false, false) => self.true_negative += 1,
            (false, true) => self.false_negative += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.true_positive + self.false_positive + self.true_negative + self.false_negative
    }

    pub fn accuracy(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        (self.true_positive + self.true_negative) as f64 / total as f64
    }

    pub fn precision(&self) -> f64 {
        ratio(self.true_positive, self.true_positive + self.false_positive)
    }

    pub fn recall(&self) -> f64 {
        ratio(self.true_positive, self.true_positive + self.false_negative)
    }

    /// Harmonic mean of precision and recall, 0 when both are 0
    pub fn f1(&self) -> f64 {
        let (p, r) = (self.precision(), self.recall());
        if p + r > 0.0 { 2.0 * p * r / (p + r) } else { 0.0 }
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 { 0.0 } else { num as f64 / den as f64 }
}

/// Confusion counts of `adjust(p_base, vix, alpha, beta) > 50` against the labels
pub fn evaluate(
    params: &AdjustmentParams,
    columns: &ObservationColumns,
    vix_critical: f64,
) -> ConfusionCounts {
    let mut counts = ConfusionCounts::default();
    Zip::from(&columns.p_base)
        .and(&columns.vix)
        .and(&columns.labels)
        .for_each(|&p_base, &vix, &actual| {
            counts.record(params.predicts_impact(p_base, vix, vix_critical), actual);
        });
    counts
}

/// Confusion counts of the VIX-blind predictor `p_base > 50`
pub fn evaluate_baseline(columns: &ObservationColumns) -> ConfusionCounts {
    let mut counts = ConfusionCounts::default();
    Zip::from(&columns.p_base)
        .and(&columns.labels)
        .for_each(|&p_base, &actual| counts.record(p_base > IMPACT_THRESHOLD, actual));
    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn f1_from_counts() {
        let counts = ConfusionCounts {
            true_positive: 6,
            false_positive: 2,
            true_negative: 10,
            false_negative: 4,
        };
        assert!((counts.precision() - 0.75).abs() < 1e-12);
        assert!((counts.recall() - 0.6).abs() < 1e-12);
        assert!((counts.f1() - 2.0 * 0.75 * 0.6 / 1.35).abs() < 1e-12);
        assert!((counts.accuracy() - 16.0 / 22.0).abs() < 1e-12);
    }

    #[test]
    fn empty_counts_score_zero() {
        let counts = ConfusionCounts::default();
        assert_eq!(counts.f1(), 0.0);
        assert_eq!(counts.accuracy(), 0.0);
    }

    #[test]
    fn evaluate_uses_adjusted_probability() {
        use ndarray::array;
        // 48% base: only high VIX pushes it above 50
        let columns = ObservationColumns {
            p_base: array![48.0, 48.0],
            vix: array![15.0, 40.0],
            labels: array![false, true],
        };
        let counts = evaluate(&AdjustmentParams::HEURISTIC, &columns, 20.0);
        assert_eq!(counts.true_negative, 1);
        assert_eq!(counts.true_positive, 1);
        assert_eq!(counts.f1(), 1.0);

        let baseline = evaluate_baseline(&columns);
        assert_eq!(baseline.false_negative, 1);
        assert_eq!(baseline.f1(), 0.0);
    }
}
