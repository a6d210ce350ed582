pub mod adjustment;
pub mod signals;

pub use adjustment::{
    AdjustmentParams, DEFAULT_VIX_CRITICAL, IMPACT_THRESHOLD, adjust, base_probability,
    vix_adjustment_pct,
};
pub use signals::{Confidence, Direction};
