use dotenvy::dotenv;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use thiserror::Error;

use crate::calibration::search::DEFAULT_SWARM_SEED;
use crate::calibration::{MIN_CATEGORY_OBSERVATIONS, SkippedCategoryPolicy};
use crate::scoring::DEFAULT_VIX_CRITICAL;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?} ({reason})")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// How the `calibrate` binary produces parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StrategyKind {
    /// Particle swarm with grid fallback
    #[default]
    Swarm,
    Grid,
    /// Per-category rules from the token table, no labelled data needed
    Rules,
    Heuristic,
}

impl FromStr for StrategyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "swarm" | "search" => Ok(StrategyKind::Swarm),
            "grid" => Ok(StrategyKind::Grid),
            "rules" => Ok(StrategyKind::Rules),
            "heuristic" => Ok(StrategyKind::Heuristic),
            other => Err(format!("expected swarm, grid, rules or heuristic, got {other}")),
        }
    }
}

fn parse_policy(s: &str) -> Result<SkippedCategoryPolicy, String> {
    match s.trim().to_ascii_lowercase().as_str() {
        "global" => Ok(SkippedCategoryPolicy::UseGlobal),
        "rules" => Ok(SkippedCategoryPolicy::RuleBased),
        other => Err(format!("expected global or rules, got {other}")),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub token_table_path: PathBuf,
    pub calibration_data_path: Option<PathBuf>,
    pub headlines_path: Option<PathBuf>,
    pub market_history_path: Option<PathBuf>,
    pub output_dir: PathBuf,
    /// Binary snapshot the scorer loads; heuristic parameters when unset
    pub parameters_path: Option<PathBuf>,
    pub default_asset: String,
    pub vix_critical: f64,
    pub min_category_observations: usize,
    pub search_budget: usize,
    /// Seed of the swarm's generator; same seed and data give the same parameters
    pub search_seed: u64,
    pub strategy: StrategyKind,
    pub skipped_category_policy: SkippedCategoryPolicy,
}

impl Config {
    /// Reads `.env` (if any) and then the process environment
    pub fn load() -> Result<Self, ConfigError> {
        dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let path = |key: &str| var(key).map(PathBuf::from);

        let vix_critical: f64 = parse(&var, "VIX_CRITICAL", DEFAULT_VIX_CRITICAL)?;
        if !(vix_critical.is_finite() && vix_critical > 0.0) {
            return Err(ConfigError::Invalid {
                key: "VIX_CRITICAL",
                value: vix_critical.to_string(),
                reason: "must be positive".to_string(),
            });
        }

        Ok(Config {
            token_table_path: path("TOKEN_TABLE_PATH")
                .unwrap_or_else(|| PathBuf::from("data/tokens_por_categoria.csv")),
            calibration_data_path: path("CALIBRATION_DATA_PATH"),
            headlines_path: path("HEADLINES_PATH"),
            market_history_path: path("MARKET_HISTORY_PATH"),
            output_dir: path("OUTPUT_DIR").unwrap_or_else(|| PathBuf::from("output")),
            parameters_path: path("PARAMETERS_PATH"),
            default_asset: var("DEFAULT_ASSET").unwrap_or_else(|| "SPY".to_string()),
            vix_critical,
            min_category_observations: parse(
                &var,
                "MIN_CATEGORY_OBSERVATIONS",
                MIN_CATEGORY_OBSERVATIONS,
            )?,
            search_budget: parse(&var, "SEARCH_BUDGET", 50)?,
            search_seed: parse(&var, "SEARCH_SEED", DEFAULT_SWARM_SEED)?,
            strategy: parse(&var, "CALIBRATION_STRATEGY", StrategyKind::default())?,
            skipped_category_policy: match var("SKIPPED_CATEGORY_POLICY") {
                Some(raw) => parse_policy(&raw).map_err(|reason| ConfigError::Invalid {
                    key: "SKIPPED_CATEGORY_POLICY",
                    value: raw,
                    reason,
                })?,
                None => SkippedCategoryPolicy::default(),
            },
        })
    }
}

fn parse<T, F>(var: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: ToString,
    F: Fn(&str) -> Option<String>,
{
    match var(key) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            value: raw.clone(),
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}
