use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// News event label used to key the token table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Terrorism,
    WarRussia,
    WarMiddleEast,
    FinancialCrisis,
    FedRates,
    EcbPolicy,
    OilShock,
    OilSupply,
    GoldDemand,
    UsGdpData,
    UsEmploymentData,
    ChinaEconomy,
    UsHousing,
    CorporateEarnings,
    TradeData,
    Brexit,
    ElectionsUs,
    UsConsumerData,
    TechSector,
    /// No keyword set matched
    Other,
    /// Rejected by the relevance filter before matching
    Irrelevant,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown category label: {0}")]
pub struct UnknownCategory(pub String);

impl Category {
    pub const ALL: [Category; 21] = [
        Category::Terrorism,
        Category::WarRussia,
        Category::WarMiddleEast,
        Category::FinancialCrisis,
        Category::FedRates,
        Category::EcbPolicy,
        Category::OilShock,
        Category::OilSupply,
        Category::GoldDemand,
        Category::UsGdpData,
        Category::UsEmploymentData,
        Category::ChinaEconomy,
        Category::UsHousing,
        Category::CorporateEarnings,
        Category::TradeData,
        Category::Brexit,
        Category::ElectionsUs,
        Category::UsConsumerData,
        Category::TechSector,
        Category::Other,
        Category::Irrelevant,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Terrorism => "terrorism",
            Category::WarRussia => "war_russia",
            Category::WarMiddleEast => "war_middle_east",
            Category::FinancialCrisis => "financial_crisis",
            Category::FedRates => "fed_rates",
            Category::EcbPolicy => "ecb_policy",
            Category::OilShock => "oil_shock",
            Category::OilSupply => "oil_supply",
            Category::GoldDemand => "gold_demand",
            Category::UsGdpData => "us_gdp_data",
            Category::UsEmploymentData => "us_employment_data",
            Category::ChinaEconomy => "china_economy",
            Category::UsHousing => "us_housing",
            Category::CorporateEarnings => "corporate_earnings",
            Category::TradeData => "trade_data",
            Category::Brexit => "brexit",
            Category::ElectionsUs => "elections_us",
            Category::UsConsumerData => "us_consumer_data",
            Category::TechSector => "tech_sector",
            Category::Other => "other",
            Category::Irrelevant => "irrelevant",
        }
    }

    /// True for the `other` and `irrelevant` sentinels
    pub fn is_sentinel(&self) -> bool {
        matches!(self, Category::Other | Category::Irrelevant)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let label = s.trim();
        Category::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == label)
            .ok_or_else(|| UnknownCategory(label.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_parse_back() {
        for category in Category::ALL {
            assert_eq!(category.as_str().parse::<Category>(), Ok(category));
        }
    }

    #[test]
    fn serde_uses_snake_case_labels() {
        let json = serde_json::to_string(&Category::WarMiddleEast).unwrap();
        assert_eq!(json, "\"war_middle_east\"");
    }

    #[test]
    fn unknown_label_is_an_error() {
        assert_eq!(
            "crypto_mania".parse::<Category>(),
            Err(UnknownCategory("crypto_mania".to_string()))
        );
    }
}
