use std::collections::BTreeMap;

use tracing::{debug, info};

use super::parameters::{CalibratedParameters, ParameterSource};
use crate::category::Category;
use crate::scoring::AdjustmentParams;
use crate::tokens::TokenTable;

const ALPHA_MIN: f64 = 0.15;
const ALPHA_MAX: f64 = 0.65;
const BETA_MIN: f64 = 0.8;
const BETA_MAX: f64 = 3.0;

/// Category-name keyword groups, checked in order: (keywords, alpha multiplier, beta bonus)
const KEYWORD_GROUPS: [(&[&str], f64, f64); 4] = [
    (&["war", "terrorism", "terror", "attack"], 1.5, 0.8),
    (&["crisis", "crash", "bailout"], 1.3, 0.6),
    (&["fed", "ecb", "rates", "policy"], 1.2, 0.3),
    (&["gdp", "employment", "unemployment"], 1.1, 0.2),
];

/// Alpha/beta from a category's average volatility and the kind of news it is.
///
/// `avg_volatility` is a fraction (0.007 for a 0.7% mean move).
pub fn rule_based_params(category: Category, avg_volatility: f64) -> AdjustmentParams {
    let label = category.as_str();
    let mut alpha = (ALPHA_MIN + avg_volatility * 5.0).clamp(ALPHA_MIN, ALPHA_MAX);
    let mut bonus = 0.0;

    if let Some((_, multiplier, group_bonus)) = KEYWORD_GROUPS
        .iter()
        .find(|(keywords, _, _)| keywords.iter().any(|kw| label.contains(kw)))
    {
        alpha = (alpha * multiplier).min(ALPHA_MAX);
        bonus = *group_bonus;
    }

    let beta = (BETA_MIN + avg_volatility * 15.0 + bonus).clamp(BETA_MIN, BETA_MAX);
    AdjustmentParams::new(alpha, beta)
}

/// Rule-based parameters for every category the table has for `asset`
pub fn rule_based_table(
    tokens: &TokenTable,
    asset: &str,
) -> BTreeMap<Category, CalibratedParameters> {
    let table: BTreeMap<_, _> = tokens
        .records_for_asset(asset)
        .filter(|r| !r.category.is_sentinel())
        .map(|record| {
            let params = rule_based_params(record.category, record.avg_volatility);
            debug!(
                category = %record.category,
                alpha = params.alpha,
                beta = params.beta,
                token = record.token,
                volatility_pct = record.avg_volatility * 100.0,
                "Assigned rule-based parameters"
            );
            (
                record.category,
                CalibratedParameters {
                    params,
                    source: ParameterSource::RuleBased,
                    f1_score: None,
                    n_observations: record.num_events as usize,
                },
            )
        })
        .collect();
    info!(asset, categories = table.len(), "Rule-based parameters assigned");
    table
}
