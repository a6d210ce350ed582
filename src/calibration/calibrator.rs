use std::collections::BTreeMap;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use super::CalibrationError;
use super::observation::{Observation, ObservationColumns};
use super::parameters::{CalibratedParameters, ParameterSet};
use super::rules;
use super::search::{
    F1Objective, GridSearch, SearchOutcome, SearchSpace, SearchStrategy, SwarmSearch,
};
use crate::category::Category;
use crate::scoring::DEFAULT_VIX_CRITICAL;
use crate::tokens::TokenTable;

/// Fewest observations a category needs for its own search
pub const MIN_CATEGORY_OBSERVATIONS: usize = 30;

/// What a skipped category resolves to in the final parameter set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkippedCategoryPolicy {
    /// Leave it out, so lookups resolve to the global parameters
    #[default]
    UseGlobal,
    /// Assign rule-based parameters from the token table
    RuleBased,
}

/// Outcome of a per-category pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoryCalibration {
    pub fitted: BTreeMap<Category, CalibratedParameters>,
    /// Categories below the observation threshold, with their counts
    pub skipped: BTreeMap<Category, usize>,
}

/// Fits alpha/beta to labelled observations with a pluggable search strategy
pub struct Calibrator {
    strategy: Box<dyn SearchStrategy>,
    fallback: GridSearch,
    space: SearchSpace,
    vix_critical: f64,
    min_category_observations: usize,
}

impl Calibrator {
    pub fn new<S: SearchStrategy + 'static>(strategy: S) -> Self {
        Self {
            strategy: Box::new(strategy),
            fallback: GridSearch::default(),
            space: SearchSpace::default(),
            vix_critical: DEFAULT_VIX_CRITICAL,
            min_category_observations: MIN_CATEGORY_OBSERVATIONS,
        }
    }

    pub fn with_vix_critical(mut self, vix_critical: f64) -> Self {
        self.vix_critical = vix_critical;
        self
    }

    pub fn with_min_category_observations(mut self, min: usize) -> Self {
        self.min_category_observations = min;
        self
    }

    pub fn with_space(mut self, space: SearchSpace) -> Self {
        self.space = space;
        self
    }

    pub fn vix_critical(&self) -> f64 {
        self.vix_critical
    }

    /// One parameter pair for all observations
    #[instrument(skip_all, fields(strategy = self.strategy.name(), n_obs = observations.len()))]
    pub fn calibrate(
        &self,
        observations: &[Observation],
    ) -> Result<CalibratedParameters, CalibrationError> {
        if observations.is_empty() {
            return Err(CalibrationError::NoObservations);
        }
        let fitted = self.search(observations)?;
        info!(
            alpha = fitted.params.alpha,
            beta = fitted.params.beta,
            f1 = ?fitted.f1_score,
            source = ?fitted.source,
            "Global parameters calibrated"
        );
        Ok(fitted)
    }

    /// `calibrate`, with the heuristic defaults when there is nothing to fit
    pub fn calibrate_or_default(&self, observations: &[Observation]) -> CalibratedParameters {
        match self.calibrate(observations) {
            Ok(fitted) => fitted,
            Err(e) => {
                warn!(
                    error = %e,
                    alpha = CalibratedParameters::heuristic().params.alpha,
                    beta = CalibratedParameters::heuristic().params.beta,
                    "Calibration fell back to heuristic defaults; \
                     check date alignment of the inputs"
                );
                CalibratedParameters::heuristic()
            }
        }
    }

    /// Fits one category from the observations labelled with it
    pub fn calibrate_category(
        &self,
        category: Category,
        observations: &[Observation],
    ) -> Result<CalibratedParameters, CalibrationError> {
        let group: Vec<Observation> = observations
            .iter()
            .filter(|o| o.category == category)
            .cloned()
            .collect();
        if group.len() < self.min_category_observations {
            return Err(CalibrationError::InsufficientObservations {
                category,
                count: group.len(),
                required: self.min_category_observations,
            });
        }
        self.search(&group)
    }

    /// Independent search per category; thin categories are skipped
    #[instrument(skip_all, fields(strategy = self.strategy.name(), n_obs = observations.len()))]
    pub fn calibrate_per_category(&self, observations: &[Observation]) -> CategoryCalibration {
        let mut groups: BTreeMap<Category, Vec<Observation>> = BTreeMap::new();
        for obs in observations.iter().filter(|o| !o.category.is_sentinel()) {
            groups.entry(obs.category).or_default().push(obs.clone());
        }

        let mut result = CategoryCalibration::default();
        let mut eligible = Vec::new();
        for (category, group) in groups {
            if group.len() >= self.min_category_observations {
                eligible.push((category, group));
            } else {
                info!(
                    category = %category,
                    count = group.len(),
                    required = self.min_category_observations,
                    "Too few observations, skipping category"
                );
                result.skipped.insert(category, group.len());
            }
        }

        let fitted: Vec<(Category, Result<CalibratedParameters, CalibrationError>)> = eligible
            .par_iter()
            .map(|(category, group)| (*category, self.search(group)))
            .collect();

        for (category, outcome) in fitted {
            match outcome {
                Ok(params) => {
                    info!(
                        category = %category,
                        alpha = params.params.alpha,
                        beta = params.params.beta,
                        f1 = ?params.f1_score,
                        n_obs = params.n_observations,
                        "Category calibrated"
                    );
                    result.fitted.insert(category, params);
                }
                Err(e) => {
                    warn!(
                        category = %category,
                        error = %e,
                        "Category calibration failed, skipping"
                    );
                    result.skipped.insert(category, 0);
                }
            }
        }
        result
    }

    /// Global pass plus per-category pass, assembled into a parameter set
    pub fn build_parameter_set(
        &self,
        observations: &[Observation],
        tokens: &TokenTable,
        asset: &str,
        policy: SkippedCategoryPolicy,
    ) -> ParameterSet {
        let global = self.calibrate_or_default(observations);
        let per_category = self.calibrate_per_category(observations);
        let mut set = ParameterSet {
            global,
            per_category: per_category.fitted,
        };

        if policy == SkippedCategoryPolicy::RuleBased {
            for (category, params) in rules::rule_based_table(tokens, asset) {
                set.per_category.entry(category).or_insert(params);
            }
        }
        set
    }

    fn search(
        &self,
        observations: &[Observation],
    ) -> Result<CalibratedParameters, CalibrationError> {
        let objective = F1Objective::new(
            ObservationColumns::from_observations(observations),
            self.vix_critical,
            self.space,
        );
        let outcome = match self.strategy.search(&objective) {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(
                    strategy = self.strategy.name(),
                    error = %e,
                    "Search failed, falling back to grid search"
                );
                self.fallback.search(&objective)?
            }
        };
        Ok(to_calibrated(outcome, observations.len()))
    }
}

impl Default for Calibrator {
    fn default() -> Self {
        Self::new(SwarmSearch::default())
    }
}

fn to_calibrated(outcome: SearchOutcome, n_observations: usize) -> CalibratedParameters {
    CalibratedParameters {
        params: outcome.params,
        source: outcome.source,
        f1_score: Some(outcome.f1),
        n_observations,
    }
}
