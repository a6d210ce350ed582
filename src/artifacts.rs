//! Persisted output of a calibration run.
//!
//! The binary snapshot is what the scorer loads. The JSON and CSV files are
//! mirrors for people and spreadsheets.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, instrument};

use crate::calibration::{CalibratedParameters, ParameterSet, ParameterSource};
use crate::tokens::TokenTable;

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("binary snapshot encoding failed: {0}")]
    Binary(#[from] bincode::Error),
    #[error("json snapshot encoding failed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("csv mirror failed: {0}")]
    Csv(#[from] csv::Error),
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> ArtifactError + '_ {
    move |source| ArtifactError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Everything the scorer needs to answer queries without recalibrating
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSnapshot {
    pub created_at: DateTime<Utc>,
    pub vix_critical: f64,
    pub asset: String,
    pub parameters: ParameterSet,
    pub tokens: TokenTable,
}

/// Paths written by [`ModelSnapshot::write_all`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub binary: PathBuf,
    pub json: PathBuf,
    pub csv: PathBuf,
}

#[derive(Debug, Serialize)]
struct ParameterRow<'a> {
    categoria: &'a str,
    alpha: f64,
    beta: f64,
    source: ParameterSource,
    f1_score: Option<f64>,
    n_observations: usize,
}

impl<'a> ParameterRow<'a> {
    fn new(label: &'a str, p: &CalibratedParameters) -> Self {
        Self {
            categoria: label,
            alpha: p.params.alpha,
            beta: p.params.beta,
            source: p.source,
            f1_score: p.f1_score,
            n_observations: p.n_observations,
        }
    }
}

impl ModelSnapshot {
    pub fn new(
        vix_critical: f64,
        asset: impl Into<String>,
        parameters: ParameterSet,
        tokens: TokenTable,
    ) -> Self {
        Self {
            created_at: Utc::now(),
            vix_critical,
            asset: asset.into(),
            parameters,
            tokens,
        }
    }

    pub fn save_binary(&self, path: &Path) -> Result<(), ArtifactError> {
        let file = File::create(path).map_err(io_error(path))?;
        let mut writer = BufWriter::new(file);
        bincode::serialize_into(&mut writer, self)?;
        writer.flush().map_err(io_error(path))?;
        Ok(())
    }

    #[instrument(skip_all, fields(path = %path.display()))]
    pub fn load_binary(path: &Path) -> Result<Self, ArtifactError> {
        let file = File::open(path).map_err(io_error(path))?;
        let snapshot: Self = bincode::deserialize_from(BufReader::new(file))?;
        info!(
            created_at = %snapshot.created_at,
            categories = snapshot.parameters.per_category.len(),
            tokens = snapshot.tokens.len(),
            "Parameter snapshot loaded"
        );
        Ok(snapshot)
    }

    pub fn save_json(&self, path: &Path) -> Result<(), ArtifactError> {
        let file = File::create(path).map_err(io_error(path))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.flush().map_err(io_error(path))?;
        Ok(())
    }

    pub fn load_json(path: &Path) -> Result<Self, ArtifactError> {
        let file = File::open(path).map_err(io_error(path))?;
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }

    /// One row per category override, preceded by a `global` row
    pub fn write_category_csv(&self, path: &Path) -> Result<(), ArtifactError> {
        let mut writer = csv::Writer::from_path(path)?;
        writer.serialize(ParameterRow::new("global", &self.parameters.global))?;
        for (category, params) in &self.parameters.per_category {
            writer.serialize(ParameterRow::new(category.as_str(), params))?;
        }
        writer.flush().map_err(io_error(path))?;
        Ok(())
    }

    /// Writes all three files under `dir` with names stamped by `created_at`
    #[instrument(skip_all, fields(dir = %dir.display()))]
    pub fn write_all(&self, dir: &Path) -> Result<ArtifactPaths, ArtifactError> {
        fs::create_dir_all(dir).map_err(io_error(dir))?;
        let stamp = self.created_at.format("%Y%m%d_%H%M%S");
        let paths = ArtifactPaths {
            binary: dir.join(format!("parametros_{stamp}.bin")),
            json: dir.join(format!("parametros_{stamp}.json")),
            csv: dir.join(format!("parametros_categorias_{stamp}.csv")),
        };
        self.save_binary(&paths.binary)?;
        self.save_json(&paths.json)?;
        self.write_category_csv(&paths.csv)?;
        info!(
            binary = %paths.binary.display(),
            json = %paths.json.display(),
            csv = %paths.csv.display(),
            "Calibration artifacts written"
        );
        Ok(paths)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::Category;
    use crate::scoring::AdjustmentParams;
    use crate::tokens::TokenRecord;

    fn snapshot() -> ModelSnapshot {
        let mut parameters = ParameterSet::heuristic();
        parameters.per_category.insert(
            Category::Terrorism,
            CalibratedParameters {
                params: AdjustmentParams::new(1.2, 1.8),
                source: ParameterSource::SwarmSearch,
                f1_score: Some(0.61),
                n_observations: 140,
            },
        );
        let tokens = TokenTable::from_records(vec![TokenRecord {
            token: 6.8,
            num_events: 140,
            ..TokenRecord::moderate(Category::Terrorism, "SPY")
        }])
        .unwrap();
        ModelSnapshot::new(20.0, "SPY", parameters, tokens)
    }

    #[test]
    fn write_all_produces_loadable_files() {
        let dir = tempfile::tempdir().unwrap();
        let snap = snapshot();
        let paths = snap.write_all(dir.path()).unwrap();

        assert_eq!(ModelSnapshot::load_binary(&paths.binary).unwrap(), snap);
        assert_eq!(ModelSnapshot::load_json(&paths.json).unwrap(), snap);

        let csv = fs::read_to_string(&paths.csv).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "categoria,alpha,beta,source,f1_score,n_observations");
        assert!(lines[1].starts_with("global,0.75,1.5,heuristic_default"));
        assert!(lines[2].starts_with("terrorism,1.2,1.8,swarm_search,0.61,140"));
    }

    #[test]
    fn missing_snapshot_is_io_error() {
        let err = ModelSnapshot::load_binary(Path::new("/nonexistent/parametros.bin")).unwrap_err();
        assert!(matches!(err, ArtifactError::Io { .. }));
    }
}
