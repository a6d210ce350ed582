use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::info;

use super::metrics::ConfusionCounts;
use super::observation::Observation;
use super::parameters::ParameterSet;
use crate::category::Category;
use crate::scoring::IMPACT_THRESHOLD;

/// Fraction of rows held out at the end of the dataset
pub const DEFAULT_HOLDOUT: f64 = 0.2;

/// Fewest observations a category needs in the VIX effect table
pub const MIN_VIX_EFFECT_OBSERVATIONS: usize = 20;

/// Hold-out comparison of the static `p_base > 50` rule with the adjusted one
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub baseline: ConfusionCounts,
    pub contextual: ConfusionCounts,
    pub test_size: usize,
}

impl ValidationReport {
    pub fn f1_gain(&self) -> f64 {
        self.contextual.f1() - self.baseline.f1()
    }

    pub fn accuracy_gain(&self) -> f64 {
        self.contextual.accuracy() - self.baseline.accuracy()
    }
}

/// Scores the trailing `holdout` share of `observations` in dataset order.
///
/// The test slice has `floor(len * holdout)` rows. Returns `None` when that
/// is zero.
pub fn validate_against_baseline(
    observations: &[Observation],
    parameters: &ParameterSet,
    vix_critical: f64,
    holdout: f64,
) -> Option<ValidationReport> {
    let holdout = holdout.clamp(0.0, 1.0);
    let n_test = ((observations.len() as f64) * holdout) as usize;
    let test = &observations[observations.len() - n_test.min(observations.len())..];
    if test.is_empty() {
        return None;
    }

    let mut report = ValidationReport {
        baseline: ConfusionCounts::default(),
        contextual: ConfusionCounts::default(),
        test_size: test.len(),
    };
    for obs in test {
        let (_, resolved) = parameters.resolve(obs.category);
        report.baseline.record(obs.p_base > IMPACT_THRESHOLD, obs.realized_impact);
        let predicted = resolved.params.predicts_impact(obs.p_base, obs.vix, vix_critical);
        report.contextual.record(predicted, obs.realized_impact);
    }

    info!(
        test_size = report.test_size,
        baseline_f1 = report.baseline.f1(),
        contextual_f1 = report.contextual.f1(),
        baseline_accuracy = report.baseline.accuracy(),
        contextual_accuracy = report.contextual.accuracy(),
        "Hold-out validation"
    );
    Some(report)
}

/// Impact rate in calm versus stressed markets for one category
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VixEffect {
    pub category: Category,
    pub n_observations: usize,
    pub median_vix: f64,
    pub low_vix_impact_rate: f64,
    pub high_vix_impact_rate: f64,
    /// high / low rate, 1.0 when the low rate is 0
    pub amplification: f64,
}

/// Splits each category at its median VIX; low includes the median itself.
///
/// Sorted by amplification, strongest first.
pub fn vix_effect_by_category(
    observations: &[Observation],
    min_observations: usize,
) -> Vec<VixEffect> {
    let mut groups: BTreeMap<Category, Vec<&Observation>> = BTreeMap::new();
    for obs in observations {
        groups.entry(obs.category).or_default().push(obs);
    }

    let mut effects: Vec<VixEffect> = groups
        .into_iter()
        .filter(|(_, group)| !group.is_empty() && group.len() >= min_observations)
        .map(|(category, group)| {
            let mut vix: Vec<f64> = group.iter().map(|o| o.vix).collect();
            vix.sort_by(f64::total_cmp);
            let median_vix = median(&vix);

            let (low, high): (Vec<&Observation>, Vec<&Observation>) =
                group.iter().copied().partition(|o| o.vix <= median_vix);
            let low_rate = impact_rate(&low);
            let high_rate = impact_rate(&high);
            VixEffect {
                category,
                n_observations: group.len(),
                median_vix,
                low_vix_impact_rate: low_rate,
                high_vix_impact_rate: high_rate,
                amplification: if low_rate > 0.0 { high_rate / low_rate } else { 1.0 },
            }
        })
        .collect();
    // Stable, so ties stay in category order
    effects.sort_by(|a, b| b.amplification.total_cmp(&a.amplification));
    effects
}

fn median(sorted: &[f64]) -> f64 {
    let n = sorted.len();
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    }
}

fn impact_rate(group: &[&Observation]) -> f64 {
    if group.is_empty() {
        return 0.0;
    }
    group.iter().filter(|o| o.realized_impact).count() as f64 / group.len() as f64
}
