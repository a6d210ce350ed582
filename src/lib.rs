//! News impact scoring: classify a headline, look up its historical token
//! and adjust the implied probability for the current VIX level.

pub mod artifacts;
pub mod calibration;
pub mod category;
pub mod classifier;
pub mod config;
pub mod engine;
pub mod logging;
pub mod scoring;
pub mod tokens;

pub use category::Category;
pub use engine::{ImpactAssessment, ImpactEngine};
