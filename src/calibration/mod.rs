//! Offline fitting of the contextual adjustment parameters.
//!
//! Observations come either from a prepared dataset or from joining dated
//! headlines to market history ([`join`]). The [`Calibrator`] then maximises
//! the F1 score of the `adjust > 50` prediction over them.

pub mod analysis;
pub mod calibrator;
pub mod join;
pub mod metrics;
pub mod observation;
pub mod parameters;
pub mod rules;
pub mod search;

use thiserror::Error;

use crate::category::Category;

pub use analysis::{ValidationReport, VixEffect, validate_against_baseline, vix_effect_by_category};
pub use calibrator::{
    CategoryCalibration, Calibrator, MIN_CATEGORY_OBSERVATIONS, SkippedCategoryPolicy,
};
pub use join::{Headline, JoinPolicy, JoinReport, MarketCalendar, MarketDay, build_observations};
pub use metrics::ConfusionCounts;
pub use observation::{DatasetError, Observation, ObservationColumns, load_observations};
pub use parameters::{CalibratedParameters, ParameterScope, ParameterSet, ParameterSource};
pub use search::{F1Objective, GridSearch, SearchOutcome, SearchSpace, SearchStrategy, SwarmSearch};

#[derive(Debug, Error, PartialEq)]
pub enum CalibrationError {
    #[error("no observations to calibrate on")]
    NoObservations,

    #[error("category {category} has {count} observations, {required} required")]
    InsufficientObservations {
        category: Category,
        count: usize,
        required: usize,
    },

    #[error("optimizer failed: {0}")]
    Optimizer(String),
}
