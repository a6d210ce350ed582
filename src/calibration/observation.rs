use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use ndarray::Array1;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::category::Category;

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("failed to open {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed dataset: {0}")]
    Csv(#[from] csv::Error),
    #[error("row {row}: {reason}")]
    InvalidRow { row: usize, reason: String },
    #[error("unparseable date: {0:?}")]
    InvalidDate(String),
}

/// One labelled calibration row: what was predicted from, and what happened
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub category: Category,
    pub p_base: f64,
    pub vix: f64,
    pub realized_impact: bool, // |next-day return| above the impact threshold
    pub realized_return: f64,
}

#[derive(Debug, Deserialize)]
struct ObservationRow {
    categoria: String,
    p_base: f64,
    vix: f64,
    impacto_real: u8,
    #[serde(default)]
    retorno_real: Option<f64>,
}

/// Observations as ndarray columns, the shape the objective works on
#[derive(Debug, Clone)]
pub struct ObservationColumns {
    pub p_base: Array1<f64>,
    pub vix: Array1<f64>,
    pub labels: Array1<bool>,
}

impl ObservationColumns {
    pub fn from_observations(observations: &[Observation]) -> Self {
        Self {
            p_base: observations.iter().map(|o| o.p_base).collect(),
            vix: observations.iter().map(|o| o.vix).collect(),
            labels: observations.iter().map(|o| o.realized_impact).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

pub fn open(path: &Path) -> Result<File, DatasetError> {
    File::open(path).map_err(|source| DatasetError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[instrument(skip_all, fields(path = %path.display()))]
pub fn load_observations(path: &Path) -> Result<Vec<Observation>, DatasetError> {
    let observations = read_observations(open(path)?)?;
    info!(observations = observations.len(), "Calibration dataset loaded");
    Ok(observations)
}

/// Reads `categoria, p_base, vix, impacto_real, retorno_real` rows
pub fn read_observations<R: Read>(reader: R) -> Result<Vec<Observation>, DatasetError> {
    let mut csv_reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut observations = Vec::new();

    for (i, row) in csv_reader.deserialize::<ObservationRow>().enumerate() {
        let row = row?;
        // Header is line 1
        let line = i + 2;
        let category = match row.categoria.parse::<Category>() {
            Ok(c) if !c.is_sentinel() => c,
            Ok(_) => continue,
            Err(e) => {
                warn!(row = line, error = %e, "Skipping observation");
                continue;
            }
        };
        if !(row.vix.is_finite() && row.vix > 0.0) {
            return Err(DatasetError::InvalidRow {
                row: line,
                reason: format!("vix must be positive, got {}", row.vix),
            });
        }
        if !(0.0..=100.0).contains(&row.p_base) {
            return Err(DatasetError::InvalidRow {
                row: line,
                reason: format!("p_base must be within [0, 100], got {}", row.p_base),
            });
        }
        let realized_impact = match row.impacto_real {
            0 => false,
            1 => true,
            other => {
                return Err(DatasetError::InvalidRow {
                    row: line,
                    reason: format!("impacto_real must be 0 or 1, got {other}"),
                });
            }
        };
        observations.push(Observation {
            category,
            p_base: row.p_base,
            vix: row.vix,
            realized_impact,
            realized_return: row.retorno_real.unwrap_or(0.0),
        });
    }
    Ok(observations)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_rows_and_skips_other() {
        let csv = "categoria,p_base,vix,impacto_real,retorno_real\n\
                   fed_rates,58.0,17.2,1,-0.0081\n\
                   other,50.0,17.2,0,0.001\n\
                   terrorism,74.0,31.0,0,0.002\n";
        let obs = read_observations(csv.as_bytes()).unwrap();
        assert_eq!(obs.len(), 2);
        assert_eq!(obs[0].category, Category::FedRates);
        assert!(obs[0].realized_impact);
        assert!(!obs[1].realized_impact);
    }

    #[test]
    fn non_binary_label_is_rejected() {
        let csv = "categoria,p_base,vix,impacto_real,retorno_real\nfed_rates,58.0,17.2,2,0.0\n";
        let err = read_observations(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, DatasetError::InvalidRow { row: 2, .. }));
    }

    #[test]
    fn non_positive_vix_is_rejected() {
        let csv = "categoria,p_base,vix,impacto_real,retorno_real\nfed_rates,58.0,0.0,1,0.0\n";
        assert!(read_observations(csv.as_bytes()).is_err());
    }

    #[test]
    fn columns_keep_row_order() {
        let obs = vec![
            Observation {
                category: Category::FedRates,
                p_base: 58.0,
                vix: 15.0,
                realized_impact: true,
                realized_return: 0.01,
            },
            Observation {
                category: Category::Brexit,
                p_base: 61.0,
                vix: 25.0,
                realized_impact: false,
                realized_return: 0.0,
            },
        ];
        let cols = ObservationColumns::from_observations(&obs);
        assert_eq!(cols.len(), 2);
        assert_eq!(cols.vix[1], 25.0);
        assert!(cols.labels[0]);
    }
}
