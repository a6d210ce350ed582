use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::category::Category;
use crate::scoring::AdjustmentParams;

/// How a parameter pair was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterSource {
    HeuristicDefault,
    RuleBased,
    TokenTable,
    SwarmSearch,
    GridSearch,
}

/// Where a resolved parameter pair came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterScope {
    Global,
    Category(Category),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibratedParameters {
    pub params: AdjustmentParams,
    pub source: ParameterSource,
    pub f1_score: Option<f64>,
    pub n_observations: usize,
}

impl CalibratedParameters {
    pub fn heuristic() -> Self {
        Self {
            params: AdjustmentParams::HEURISTIC,
            source: ParameterSource::HeuristicDefault,
            f1_score: None,
            n_observations: 0,
        }
    }

    pub fn unfitted(params: AdjustmentParams, source: ParameterSource) -> Self {
        Self {
            params,
            source,
            f1_score: None,
            n_observations: 0,
        }
    }
}

/// Global parameters plus per-category overrides; immutable once built
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSet {
    pub global: CalibratedParameters,
    pub per_category: BTreeMap<Category, CalibratedParameters>,
}

impl ParameterSet {
    pub fn global_only(global: CalibratedParameters) -> Self {
        Self {
            global,
            per_category: BTreeMap::new(),
        }
    }

    pub fn heuristic() -> Self {
        Self::global_only(CalibratedParameters::heuristic())
    }

    pub fn for_category(&self, category: Category) -> Option<&CalibratedParameters> {
        self.per_category.get(&category)
    }

    /// Category override when present, global otherwise
    pub fn resolve(&self, category: Category) -> (ParameterScope, &CalibratedParameters) {
        match self.per_category.get(&category) {
            Some(p) => (ParameterScope::Category(category), p),
            None => (ParameterScope::Global, &self.global),
        }
    }
}

impl Default for ParameterSet {
    fn default() -> Self {
        Self::heuristic()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_prefers_category_override() {
        let mut set = ParameterSet::heuristic();
        let fitted = CalibratedParameters {
            params: AdjustmentParams::new(0.4, 2.1),
            source: ParameterSource::SwarmSearch,
            f1_score: Some(0.61),
            n_observations: 44,
        };
        set.per_category.insert(Category::Terrorism, fitted);

        let (scope, p) = set.resolve(Category::Terrorism);
        assert_eq!(scope, ParameterScope::Category(Category::Terrorism));
        assert_eq!(p.params.beta, 2.1);

        let (scope, p) = set.resolve(Category::FedRates);
        assert_eq!(scope, ParameterScope::Global);
        assert_eq!(p.params, AdjustmentParams::HEURISTIC);
    }
}
