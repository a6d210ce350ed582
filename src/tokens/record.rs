use serde::{Deserialize, Serialize};

use crate::category::Category;
use crate::scoring::base_probability;

/// Token assumed for a (category, asset) pair with no history
pub const MODERATE_TOKEN: f64 = 5.0;

/// Historical impact of one news category on one asset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenRecord {
    pub category: Category,
    pub asset: String,
    pub token: f64,                // Impact score in [1, 10]
    pub num_events: u32,           // Historical events behind the token
    pub pct_up: f64,               // % of events followed by an up day
    pub pct_down: f64,             // % of events followed by a down day
    pub avg_volatility: f64,       // Mean absolute move, as a fraction (0.007 = 0.7%)
    pub alpha: Option<f64>,        // Per-row alpha when the table carries one
    pub beta: Option<f64>,         // Per-row beta when the table carries one
}

impl TokenRecord {
    /// Explicit fallback for pairs missing from the table
    pub fn moderate(category: Category, asset: impl Into<String>) -> Self {
        Self {
            category,
            asset: asset.into(),
            token: MODERATE_TOKEN,
            num_events: 0,
            pct_up: 50.0,
            pct_down: 50.0,
            avg_volatility: 0.0,
            alpha: None,
            beta: None,
        }
    }

    pub fn base_probability(&self) -> f64 {
        base_probability(self.token)
    }

    /// True when this is the fallback record rather than observed history
    pub fn is_moderate_default(&self) -> bool {
        self.num_events == 0 && self.token == MODERATE_TOKEN
    }
}
