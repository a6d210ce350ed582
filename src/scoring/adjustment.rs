use serde::{Deserialize, Serialize};

/// VIX level at which fear starts amplifying impact
pub const DEFAULT_VIX_CRITICAL: f64 = 20.0;

/// Adjusted probability above which an impact is predicted
pub const IMPACT_THRESHOLD: f64 = 50.0;

/// Alpha (amplifier) and beta (convexity exponent) of the VIX adjustment
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdjustmentParams {
    pub alpha: f64,
    pub beta: f64,
}

impl AdjustmentParams {
    /// Used whenever no calibration data is available
    pub const HEURISTIC: AdjustmentParams = AdjustmentParams { alpha: 0.75, beta: 1.50 };

    pub fn new(alpha: f64, beta: f64) -> Self {
        Self { alpha, beta }
    }

    pub fn adjust(&self, p_base: f64, vix: f64, vix_critical: f64) -> f64 {
        adjust(p_base, vix, self.alpha, self.beta, vix_critical)
    }

    /// Binary prediction used by calibration
    pub fn predicts_impact(&self, p_base: f64, vix: f64, vix_critical: f64) -> bool {
        self.adjust(p_base, vix, vix_critical) > IMPACT_THRESHOLD
    }
}

impl Default for AdjustmentParams {
    fn default() -> Self {
        Self::HEURISTIC
    }
}

/// Contextual impact probability in [0, 100].
///
/// With `v = vix / vix_critical`, fear below the critical level damps the
/// base probability linearly (`p_base * (1 - 0.1 * alpha * (1 - v))`) and
/// fear above it amplifies by a power law (`p_base * (1 + alpha * (v - 1)^beta)`).
/// Both branches equal `p_base` at `v == 1`. Inputs are not validated: the
/// caller guarantees `vix > 0` and `0 <= p_base <= 100`.
pub fn adjust(p_base: f64, vix: f64, alpha: f64, beta: f64, vix_critical: f64) -> f64 {
    let v = vix / vix_critical;
    let p = if v <= 1.0 {
        p_base * (1.0 - alpha * 0.1 * (1.0 - v))
    } else {
        p_base * (1.0 + alpha * (v - 1.0).powf(beta))
    };
    p.clamp(0.0, 100.0)
}

/// Base probability implied by a token: token 10 is 100%
pub fn base_probability(token: f64) -> f64 {
    token / 10.0 * 100.0
}

/// Relative change (in %) from the base to the contextual probability
pub fn vix_adjustment_pct(p_base: f64, p_contextual: f64) -> f64 {
    if p_base > 0.0 {
        (p_contextual / p_base - 1.0) * 100.0
    } else {
        0.0
    }
}
