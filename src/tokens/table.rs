use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use super::record::TokenRecord;
use crate::category::Category;

#[derive(Debug, Error)]
pub enum TokenTableError {
    #[error("failed to open token table {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed token table: {0}")]
    Csv(#[from] csv::Error),
    #[error("{category}/{asset}: {field} = {value} is out of range")]
    OutOfRange {
        category: Category,
        asset: String,
        field: &'static str,
        value: f64,
    },
    #[error("duplicate token entry for {category}/{asset}")]
    Duplicate { category: Category, asset: String },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LookupError {
    #[error("no token for category {category} on asset {asset}")]
    NotFound { category: Category, asset: String },
}

/// Raw CSV row, column names as produced by the offline token builder
#[derive(Debug, Deserialize)]
struct TokenRow {
    categoria: String,
    asset: String,
    token: f64,
    num_eventos: f64,
    volatilidad_promedio: f64,
    pct_alcista: f64,
    #[serde(default)]
    pct_bajista: Option<f64>,
    #[serde(default)]
    alpha: Option<f64>,
    #[serde(default)]
    beta: Option<f64>,
}

/// Read-only (category, asset) -> token mapping
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<TokenRecord>", into = "Vec<TokenRecord>")]
pub struct TokenTable {
    records: BTreeMap<(Category, String), TokenRecord>,
}

impl TokenTable {
    pub fn from_records(records: Vec<TokenRecord>) -> Result<Self, TokenTableError> {
        let mut table = Self::default();
        for record in records {
            table.insert(record)?;
        }
        Ok(table)
    }

    #[instrument(skip_all, fields(path = %path.display()))]
    pub fn from_csv_path(path: &Path) -> Result<Self, TokenTableError> {
        info!(file = %path.display(), "Loading token table");
        let file = File::open(path).map_err(|source| TokenTableError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let table = Self::from_csv_reader(file)?;
        info!(records = table.len(), "Token table loaded");
        Ok(table)
    }

    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self, TokenTableError> {
        let mut csv_reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
        let mut table = Self::default();
        let mut skipped = 0usize;

        for row in csv_reader.deserialize::<TokenRow>() {
            let row = row?;
            let category = match row.categoria.parse::<Category>() {
                Ok(category) => category,
                Err(e) => {
                    warn!(error = %e, asset = %row.asset, "Skipping token row");
                    skipped += 1;
                    continue;
                }
            };
            if row.num_eventos < 0.0 || !row.num_eventos.is_finite() {
                return Err(TokenTableError::OutOfRange {
                    category,
                    asset: row.asset,
                    field: "num_eventos",
                    value: row.num_eventos,
                });
            }
            let record = TokenRecord {
                category,
                asset: row.asset,
                token: row.token,
                num_events: row.num_eventos.round() as u32,
                pct_up: row.pct_alcista,
                pct_down: row.pct_bajista.unwrap_or(100.0 - row.pct_alcista),
                avg_volatility: row.volatilidad_promedio,
                alpha: row.alpha,
                beta: row.beta,
            };
            table.insert(record)?;
        }

        if skipped > 0 {
            debug!(skipped, "Token rows with unknown categories were skipped");
        }
        Ok(table)
    }

    /// Adds a record, rejecting duplicates and out-of-range values
    pub fn insert(&mut self, record: TokenRecord) -> Result<(), TokenTableError> {
        validate(&record)?;
        let key = (record.category, record.asset.clone());
        if self.records.contains_key(&key) {
            return Err(TokenTableError::Duplicate {
                category: record.category,
                asset: record.asset,
            });
        }
        self.records.insert(key, record);
        Ok(())
    }

    pub fn lookup(&self, category: Category, asset: &str) -> Result<&TokenRecord, LookupError> {
        self.records
            .get(&(category, asset.to_string()))
            .ok_or_else(|| LookupError::NotFound {
                category,
                asset: asset.to_string(),
            })
    }

    /// Lookup with the moderate default record substituted on a miss
    pub fn lookup_or_default(&self, category: Category, asset: &str) -> TokenRecord {
        match self.lookup(category, asset) {
            Ok(record) => record.clone(),
            Err(e) => {
                debug!(error = %e, "Using moderate default token");
                TokenRecord::moderate(category, asset)
            }
        }
    }

    pub fn records_for_asset<'a>(
        &'a self,
        asset: &'a str,
    ) -> impl Iterator<Item = &'a TokenRecord> + 'a {
        self.records.values().filter(move |r| r.asset == asset)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TokenRecord> {
        self.records.values()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl TryFrom<Vec<TokenRecord>> for TokenTable {
    type Error = TokenTableError;

    fn try_from(records: Vec<TokenRecord>) -> Result<Self, Self::Error> {
        Self::from_records(records)
    }
}

impl From<TokenTable> for Vec<TokenRecord> {
    fn from(table: TokenTable) -> Self {
        table.records.into_values().collect()
    }
}

fn validate(record: &TokenRecord) -> Result<(), TokenTableError> {
    let checks: [(&'static str, f64, f64, f64); 4] = [
        ("token", record.token, 1.0, 10.0),
        ("pct_up", record.pct_up, 0.0, 100.0),
        ("pct_down", record.pct_down, 0.0, 100.0),
        ("avg_volatility", record.avg_volatility, 0.0, f64::INFINITY),
    ];
    for (field, value, lo, hi) in checks {
        // NaN fails both comparisons
        if !(value >= lo && value <= hi) {
            return Err(TokenTableError::OutOfRange {
                category: record.category,
                asset: record.asset.clone(),
                field,
                value,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const CSV: &str = "\
categoria,asset,token,num_eventos,volatilidad_promedio,pct_alcista,pct_bajista
fed_rates,SPY,5.8,412,0.0061,48.5,51.5
fed_rates,QQQ,6.3,412,0.0083,47.0,53.0
terrorism,SPY,7.4,230,0.0070,41.0,59.0
";

    #[test]
    fn loads_rows_from_csv() {
        let table = TokenTable::from_csv_reader(CSV.as_bytes()).unwrap();
        assert_eq!(table.len(), 3);
        let fed = table.lookup(Category::FedRates, "SPY").unwrap();
        assert_eq!(fed.token, 5.8);
        assert_eq!(fed.num_events, 412);
        assert_eq!(fed.pct_down, 51.5);
        assert!(fed.alpha.is_none());
    }

    #[test]
    fn lookup_is_exact_on_both_keys() {
        let table = TokenTable::from_csv_reader(CSV.as_bytes()).unwrap();
        assert_eq!(table.lookup(Category::FedRates, "QQQ").unwrap().token, 6.3);
        assert_eq!(
            table.lookup(Category::Terrorism, "QQQ"),
            Err(LookupError::NotFound {
                category: Category::Terrorism,
                asset: "QQQ".to_string()
            })
        );
    }

    #[test]
    fn missing_pair_falls_back_to_moderate() {
        let table = TokenTable::from_csv_reader(CSV.as_bytes()).unwrap();
        let record = table.lookup_or_default(Category::Other, "SPY");
        assert_eq!(record.token, 5.0);
        assert_eq!(record.num_events, 0);
        assert_eq!(record.base_probability(), 50.0);
        assert!(record.is_moderate_default());
    }

    #[test]
    fn duplicate_pair_is_rejected() {
        let csv = format!("{CSV}fed_rates,SPY,6.0,10,0.005,50.0,50.0\n");
        let err = TokenTable::from_csv_reader(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, TokenTableError::Duplicate { category: Category::FedRates, .. }));
    }

    #[test]
    fn token_outside_range_is_rejected() {
        let csv = "categoria,asset,token,num_eventos,volatilidad_promedio,pct_alcista\n\
                   fed_rates,SPY,11.0,10,0.005,50.0\n";
        let err = TokenTable::from_csv_reader(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, TokenTableError::OutOfRange { field: "token", .. }));
    }

    #[test]
    fn unknown_category_rows_are_skipped() {
        let csv = "categoria,asset,token,num_eventos,volatilidad_promedio,pct_alcista\n\
                   meme_stocks,SPY,9.0,10,0.02,50.0\n\
                   brexit,SPY,6.1,35,0.009,45.0\n";
        let table = TokenTable::from_csv_reader(csv.as_bytes()).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.lookup(Category::Brexit, "SPY").unwrap().pct_down, 55.0);
    }

    #[test]
    fn optional_alpha_beta_columns_are_read() {
        let csv = "categoria,asset,token,num_eventos,volatilidad_promedio,\
                   pct_alcista,pct_bajista,alpha,beta\n\
                   fed_rates,SPY,5.8,412,0.0061,48.5,51.5,0.4,1.3\n\
                   terrorism,SPY,7.4,230,0.0070,41.0,59.0,,\n";
        let table = TokenTable::from_csv_reader(csv.as_bytes()).unwrap();
        assert_eq!(table.lookup(Category::FedRates, "SPY").unwrap().alpha, Some(0.4));
        assert_eq!(table.lookup(Category::Terrorism, "SPY").unwrap().beta, None);
    }

    #[test]
    fn records_for_asset_filters() {
        let table = TokenTable::from_csv_reader(CSV.as_bytes()).unwrap();
        let spy: Vec<_> = table.records_for_asset("SPY").map(|r| r.category).collect();
        assert_eq!(spy, vec![Category::Terrorism, Category::FedRates]);
    }
}
