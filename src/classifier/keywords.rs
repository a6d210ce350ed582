use crate::category::Category;

/// One (category, keyword set) pair of the keyword table
#[derive(Debug, Clone)]
pub struct KeywordRule {
    pub category: Category,
    keywords: Vec<String>,
}

impl KeywordRule {
    pub fn new<S: AsRef<str>>(category: Category, keywords: &[S]) -> Self {
        Self {
            category,
            keywords: keywords.iter().map(|k| k.as_ref().to_lowercase()).collect(),
        }
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    /// `lowered` must already be lower-cased
    pub fn matches(&self, lowered: &str) -> bool {
        self.keywords.iter().any(|kw| lowered.contains(kw.as_str()))
    }
}

/// Ordered keyword table. Position is priority: when a text matches several
/// rules the earliest rule decides the category.
#[derive(Debug, Clone)]
pub struct KeywordTable {
    rules: Vec<KeywordRule>,
}

impl KeywordTable {
    pub fn new(rules: Vec<KeywordRule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[KeywordRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// First matching category, if any
    pub fn first_match(&self, lowered: &str) -> Option<Category> {
        self.rules.iter().find(|r| r.matches(lowered)).map(|r| r.category)
    }

    /// Every matching category, in priority order, without repeats
    pub fn all_matches(&self, lowered: &str) -> Vec<Category> {
        let mut out: Vec<Category> = Vec::new();
        for rule in self.rules.iter().filter(|r| r.matches(lowered)) {
            if !out.contains(&rule.category) {
                out.push(rule.category);
            }
        }
        out
    }
}

impl Default for KeywordTable {
    // High-volatility event types first, then monetary policy and
    // commodities, then macro releases, then the low-volatility sectors.
    fn default() -> Self {
        Self::new(vec![
            KeywordRule::new(
                Category::Terrorism,
                &["terror", "bombing", "attack", "killed", "atentado"],
            ),
            KeywordRule::new(Category::WarRussia, &["russia", "ukraine", "putin", "kremlin"]),
            KeywordRule::new(
                Category::WarMiddleEast,
                &["iran", "iraq", "syria", "israel", "palestine"],
            ),
            KeywordRule::new(
                Category::FinancialCrisis,
                &["crisis", "crash", "panic", "bailout", "collapse", "quiebra"],
            ),
            KeywordRule::new(
                Category::FedRates,
                &["fed", "fomc", "interest rate", "federal reserve", "reserva federal"],
            ),
            KeywordRule::new(
                Category::EcbPolicy,
                &["ecb", "draghi", "lagarde", "european central bank", "banco central europeo"],
            ),
            KeywordRule::new(
                Category::OilShock,
                &["oil price", "opec", "crude", "petroleum", "petroleo"],
            ),
            KeywordRule::new(Category::GoldDemand, &["gold", "precious metals"]),
            KeywordRule::new(
                Category::UsGdpData,
                &["gdp", "economic growth", "gross domestic", "pib"],
            ),
            KeywordRule::new(
                Category::UsEmploymentData,
                &["employment", "jobs", "unemployment", "payroll", "desempleo"],
            ),
            KeywordRule::new(Category::ChinaEconomy, &["china", "beijing", "yuan", "chinese"]),
            KeywordRule::new(Category::UsHousing, &["housing", "home sales", "real estate"]),
            KeywordRule::new(
                Category::CorporateEarnings,
                &["earnings", "profit", "quarterly results"],
            ),
            KeywordRule::new(Category::TradeData, &["trade", "exports", "imports"]),
            KeywordRule::new(Category::Brexit, &["brexit", "uk referendum"]),
            KeywordRule::new(Category::ElectionsUs, &["us election", "president", "congress"]),
            KeywordRule::new(Category::UsConsumerData, &["consumer confidence", "retail sales"]),
            KeywordRule::new(
                Category::TechSector,
                &["apple", "google", "microsoft", "amazon", "nvidia"],
            ),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keywords_are_lowercased() {
        let rule = KeywordRule::new(Category::FedRates, &["FOMC"]);
        assert_eq!(rule.keywords(), &["fomc".to_string()]);
        assert!(rule.matches("the fomc met today"));
    }

    #[test]
    fn earlier_rule_wins() {
        let table = KeywordTable::default();
        // "crisis" (financial_crisis) is listed before "fed" (fed_rates)
        let lowered = "fed responds to banking crisis";
        assert_eq!(table.first_match(lowered), Some(Category::FinancialCrisis));
        assert_eq!(
            table.all_matches(lowered),
            vec![Category::FinancialCrisis, Category::FedRates]
        );
    }

    #[test]
    fn default_table_has_no_sentinels() {
        assert!(KeywordTable::default().rules().iter().all(|r| !r.category.is_sentinel()));
    }
}
