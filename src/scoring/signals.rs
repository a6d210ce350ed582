use std::fmt;

use serde::{Deserialize, Serialize};

use crate::tokens::TokenRecord;

/// How much history backs a token
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl Confidence {
    pub fn from_record(record: &TokenRecord) -> Self {
        if record.num_events >= 100 && record.token >= 7.0 {
            Confidence::High
        } else if record.num_events >= 50 && record.token >= 5.0 {
            Confidence::Medium
        } else {
            Confidence::Low
        }
    }
}

/// Historical tendency of the asset after events of a category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Bullish,
    SlightlyBullish,
    Neutral,
    SlightlyBearish,
    Bearish,
}

impl Direction {
    pub fn from_record(record: &TokenRecord) -> Self {
        let (up, down) = (record.pct_up, record.pct_down);
        if up > 60.0 {
            Direction::Bullish
        } else if down > 60.0 {
            Direction::Bearish
        } else if up > 55.0 {
            Direction::SlightlyBullish
        } else if down > 55.0 {
            Direction::SlightlyBearish
        } else {
            Direction::Neutral
        }
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Confidence::Low => "low",
            Confidence::Medium => "medium",
            Confidence::High => "high",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::Category;

    fn record(token: f64, num_events: u32, pct_up: f64) -> TokenRecord {
        TokenRecord {
            token,
            num_events,
            pct_up,
            pct_down: 100.0 - pct_up,
            ..TokenRecord::moderate(Category::FedRates, "SPY")
        }
    }

    #[test]
    fn confidence_needs_history_and_token() {
        assert_eq!(Confidence::from_record(&record(7.4, 230, 50.0)), Confidence::High);
        assert_eq!(Confidence::from_record(&record(6.9, 230, 50.0)), Confidence::Medium);
        assert_eq!(Confidence::from_record(&record(9.0, 20, 50.0)), Confidence::Low);
        let moderate = TokenRecord::moderate(Category::Other, "SPY");
        assert_eq!(Confidence::from_record(&moderate), Confidence::Low);
    }

    #[test]
    fn direction_follows_up_down_split() {
        assert_eq!(Direction::from_record(&record(5.0, 10, 62.0)), Direction::Bullish);
        assert_eq!(Direction::from_record(&record(5.0, 10, 38.0)), Direction::Bearish);
        assert_eq!(Direction::from_record(&record(5.0, 10, 57.0)), Direction::SlightlyBullish);
        assert_eq!(Direction::from_record(&record(5.0, 10, 44.0)), Direction::SlightlyBearish);
        assert_eq!(Direction::from_record(&record(5.0, 10, 50.0)), Direction::Neutral);
    }
}
