use std::sync::Arc;

use argmin::core::{CostFunction, Executor, State};
use argmin::solver::particleswarm::ParticleSwarm;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::CalibrationError;
use super::metrics;
use super::observation::ObservationColumns;
use super::parameters::ParameterSource;
use crate::scoring::AdjustmentParams;

/// Box bounds of the alpha/beta search
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SearchSpace {
    pub alpha: (f64, f64),
    pub beta: (f64, f64),
}

impl SearchSpace {
    pub fn clamp(&self, alpha: f64, beta: f64) -> AdjustmentParams {
        AdjustmentParams::new(
            alpha.clamp(self.alpha.0, self.alpha.1),
            beta.clamp(self.beta.0, self.beta.1),
        )
    }

    pub fn contains(&self, params: &AdjustmentParams) -> bool {
        (self.alpha.0..=self.alpha.1).contains(&params.alpha)
            && (self.beta.0..=self.beta.1).contains(&params.beta)
    }
}

impl Default for SearchSpace {
    fn default() -> Self {
        Self {
            alpha: (0.1, 2.5),
            beta: (0.5, 3.0),
        }
    }
}

/// F1 of the thresholded adjustment over a fixed set of observations
#[derive(Debug, Clone)]
pub struct F1Objective {
    columns: Arc<ObservationColumns>,
    vix_critical: f64,
    space: SearchSpace,
}

impl F1Objective {
    pub fn new(columns: ObservationColumns, vix_critical: f64, space: SearchSpace) -> Self {
        Self {
            columns: Arc::new(columns),
            vix_critical,
            space,
        }
    }

    pub fn space(&self) -> &SearchSpace {
        &self.space
    }

    pub fn n_observations(&self) -> usize {
        self.columns.len()
    }

    pub fn f1(&self, params: &AdjustmentParams) -> f64 {
        metrics::evaluate(params, &self.columns, self.vix_critical).f1()
    }
}

impl CostFunction for F1Objective {
    type Param = Vec<f64>;
    type Output = f64;

    // The swarm minimises, so the cost is negative F1
    fn cost(&self, param: &Self::Param) -> Result<Self::Output, argmin::core::Error> {
        let (alpha, beta) = match param.as_slice() {
            [alpha, beta] => (*alpha, *beta),
            _ => {
                let msg = format!("expected [alpha, beta], got {} values", param.len());
                return Err(argmin::core::Error::msg(msg));
            }
        };
        Ok(-self.f1(&self.space.clamp(alpha, beta)))
    }
}

/// Best parameters a strategy found
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchOutcome {
    pub params: AdjustmentParams,
    pub f1: f64,
    pub evaluations: usize,
    pub source: ParameterSource,
}

/// Black-box maximiser of the F1 objective
pub trait SearchStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn search(&self, objective: &F1Objective) -> Result<SearchOutcome, CalibrationError>;
}

/// Exhaustive search over a fixed alpha x beta lattice
#[derive(Debug, Clone, PartialEq)]
pub struct GridSearch {
    pub alphas: Vec<f64>,
    pub betas: Vec<f64>,
}

impl Default for GridSearch {
    fn default() -> Self {
        Self {
            alphas: vec![0.3, 0.5, 0.75, 1.0, 1.5],
            betas: vec![0.8, 1.0, 1.2, 1.5, 2.0],
        }
    }
}

impl SearchStrategy for GridSearch {
    fn name(&self) -> &'static str {
        "grid"
    }

    #[instrument(skip_all, fields(n_obs = objective.n_observations()))]
    fn search(&self, objective: &F1Objective) -> Result<SearchOutcome, CalibrationError> {
        // Ties keep the earlier point; nothing better than F1 = 0 keeps the heuristic
        let mut best = SearchOutcome {
            params: AdjustmentParams::HEURISTIC,
            f1: 0.0,
            evaluations: 0,
            source: ParameterSource::GridSearch,
        };
        for &alpha in &self.alphas {
            for &beta in &self.betas {
                let params = AdjustmentParams::new(alpha, beta);
                let f1 = objective.f1(&params);
                best.evaluations += 1;
                if f1 > best.f1 {
                    best.params = params;
                    best.f1 = f1;
                }
            }
        }
        debug!(
            alpha = best.params.alpha,
            beta = best.params.beta,
            f1 = best.f1,
            "Grid search finished"
        );
        Ok(best)
    }
}

/// Seed of the swarm's generator unless configured otherwise
pub const DEFAULT_SWARM_SEED: u64 = 42;

/// Particle swarm over the search space (argmin), compared against the heuristic point.
///
/// The generator is seeded, so the same observations always give the same parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SwarmSearch {
    pub particles: usize,
    pub iterations: u64,
    pub seed: u64,
}

impl SwarmSearch {
    /// Splits roughly `evaluations` cost calls into particles x iterations
    pub fn with_budget(evaluations: usize) -> Self {
        let particles = 10usize;
        let iterations = (evaluations / particles).saturating_sub(1).max(1) as u64;
        Self {
            particles,
            iterations,
            seed: DEFAULT_SWARM_SEED,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

impl Default for SwarmSearch {
    fn default() -> Self {
        Self::with_budget(50)
    }
}

impl SearchStrategy for SwarmSearch {
    fn name(&self) -> &'static str {
        "swarm"
    }

    #[instrument(
        skip_all,
        fields(
            n_obs = objective.n_observations(),
            particles = self.particles,
            iterations = self.iterations,
            seed = self.seed,
        )
    )]
    fn search(&self, objective: &F1Objective) -> Result<SearchOutcome, CalibrationError> {
        let space = *objective.space();
        let bounds = (vec![space.alpha.0, space.beta.0], vec![space.alpha.1, space.beta.1]);
        let solver = ParticleSwarm::new(bounds, self.particles)
            .with_rng_generator(StdRng::seed_from_u64(self.seed));

        let result = Executor::new(objective.clone(), solver)
            .configure(|state| state.max_iters(self.iterations))
            .run()
            .map_err(|e| CalibrationError::Optimizer(e.to_string()))?;

        let state = result.state();
        let best = state.get_best_param().ok_or_else(|| {
            CalibrationError::Optimizer("particle swarm returned no best particle".to_string())
        })?;
        let (alpha, beta) = match best.position.as_slice() {
            [alpha, beta] => (*alpha, *beta),
            other => {
                return Err(CalibrationError::Optimizer(format!(
                    "particle swarm returned {} coordinates",
                    other.len()
                )));
            }
        };

        let mut outcome = SearchOutcome {
            params: space.clamp(alpha, beta),
            f1: 0.0,
            evaluations: self.particles * (self.iterations as usize + 1),
            source: ParameterSource::SwarmSearch,
        };
        outcome.f1 = objective.f1(&outcome.params);

        let seed = AdjustmentParams::HEURISTIC;
        let seed_f1 = objective.f1(&seed);
        outcome.evaluations += 1;
        if seed_f1 > outcome.f1 {
            debug!(seed_f1, swarm_f1 = outcome.f1, "Heuristic point beats the swarm");
            outcome.params = seed;
            outcome.f1 = seed_f1;
        }

        debug!(
            alpha = outcome.params.alpha,
            beta = outcome.params.beta,
            f1 = outcome.f1,
            "Swarm search finished"
        );
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array1, array};

    fn objective() -> F1Objective {
        // Impacts happen only on high-VIX days; base 45% needs amplification
        let columns = ObservationColumns {
            p_base: array![45.0, 45.0, 45.0, 45.0, 45.0, 45.0],
            vix: array![12.0, 16.0, 19.0, 30.0, 36.0, 44.0],
            labels: array![false, false, false, true, true, true],
        };
        F1Objective::new(columns, 20.0, SearchSpace::default())
    }

    #[test]
    fn cost_is_negative_f1() {
        let obj = objective();
        let cost = obj.cost(&vec![1.0, 1.0]).unwrap();
        assert_eq!(cost, -obj.f1(&AdjustmentParams::new(1.0, 1.0)));
    }

    #[test]
    fn cost_rejects_wrong_dimension() {
        assert!(objective().cost(&vec![1.0]).is_err());
    }

    #[test]
    fn grid_finds_a_separating_point() {
        let outcome = GridSearch::default().search(&objective()).unwrap();
        assert_eq!(outcome.evaluations, 25);
        assert_eq!(outcome.f1, 1.0);
        assert_eq!(outcome.source, ParameterSource::GridSearch);
    }

    #[test]
    fn grid_keeps_heuristic_when_nothing_scores() {
        let columns = ObservationColumns {
            p_base: array![10.0, 10.0],
            vix: array![15.0, 18.0],
            labels: array![false, false],
        };
        let obj = F1Objective::new(columns, 20.0, SearchSpace::default());
        let outcome = GridSearch::default().search(&obj).unwrap();
        assert_eq!(outcome.params, AdjustmentParams::HEURISTIC);
        assert_eq!(outcome.f1, 0.0);
    }

    #[test]
    fn swarm_stays_in_bounds_and_beats_seed() {
        let obj = objective();
        let outcome = SwarmSearch::default().search(&obj).unwrap();
        assert!(obj.space().contains(&outcome.params));
        assert!(outcome.f1 >= obj.f1(&AdjustmentParams::HEURISTIC));
        assert!((outcome.f1 - obj.f1(&outcome.params)).abs() < 1e-12);
    }

    #[test]
    fn budget_split() {
        assert_eq!(
            SwarmSearch::with_budget(50),
            SwarmSearch {
                particles: 10,
                iterations: 4,
                seed: DEFAULT_SWARM_SEED,
            }
        );
        assert_eq!(SwarmSearch::with_budget(5).iterations, 1);
    }

    fn noisy_objective() -> F1Objective {
        // Overlapping classes so the optimum is not a wide plateau
        let n = 200;
        let p_base = Array1::from_iter((0..n).map(|i| 35.0 + (i % 7) as f64 * 3.0));
        let vix = Array1::from_iter((0..n).map(|i| 10.0 + (i * 37 % 41) as f64));
        let labels = Array1::from_iter((0..n).map(|i| (i * 37 % 41) > 14 && i % 5 != 0));
        F1Objective::new(ObservationColumns { p_base, vix, labels }, 20.0, SearchSpace::default())
    }

    #[test]
    fn swarm_is_reproducible_for_a_seed() {
        let obj = noisy_objective();
        let search = SwarmSearch::default();
        let first = search.search(&obj).unwrap();
        for _ in 0..4 {
            let again = search.search(&obj).unwrap();
            assert_eq!(again.params, first.params);
            assert_eq!(again.f1, first.f1);
        }
    }
}
