use std::path::Path;

use chrono::Utc;
use dotenvy::dotenv;
use eyre::WrapErr;
use tracing::{info, info_span, instrument, warn};

use news_impact_scorer::artifacts::ModelSnapshot;
use news_impact_scorer::calibration::analysis::{DEFAULT_HOLDOUT, MIN_VIX_EFFECT_OBSERVATIONS};
use news_impact_scorer::calibration::{
    self, CalibratedParameters, Calibrator, GridSearch, JoinPolicy, Observation, ParameterSet,
    SwarmSearch, join, rules,
};
use news_impact_scorer::classifier::Classifier;
use news_impact_scorer::config::{Config, StrategyKind};
use news_impact_scorer::logging;
use news_impact_scorer::tokens::TokenTable;

#[instrument(name = "calibrate_main")]
fn main() -> eyre::Result<()> {
    // Load environment variables from .env file, if present
    dotenv().ok();

    if let Err(e) = logging::init_logging(env!("CARGO_BIN_NAME")) {
        eprintln!("Failed to initialize logging: {}", e);
        return Err(e);
    }

    let cfg = Config::load().wrap_err("Invalid configuration")?;
    let run_id = Utc::now().format("%Y%m%dT%H%M%S").to_string();
    let span = info_span!(
        "calibration_run",
        run_id = %run_id,
        bin = env!("CARGO_BIN_NAME"),
        strategy = ?cfg.strategy,
    );
    let _enter = span.enter();
    info!(
        asset = %cfg.default_asset,
        vix_critical = cfg.vix_critical,
        seed = cfg.search_seed,
        "Configuration loaded and logging initialized"
    );

    let tokens = TokenTable::from_csv_path(&cfg.token_table_path).wrap_err_with(|| {
        format!("Failed to load token table {}", cfg.token_table_path.display())
    })?;

    let observations = load_observations(&cfg, &tokens)?;
    let parameters = build_parameters(&cfg, &tokens, &observations);

    if !observations.is_empty() {
        calibration::validate_against_baseline(
            &observations,
            &parameters,
            cfg.vix_critical,
            DEFAULT_HOLDOUT,
        );
        let effects =
            calibration::vix_effect_by_category(&observations, MIN_VIX_EFFECT_OBSERVATIONS);
        for effect in effects {
            info!(
                category = %effect.category,
                n_obs = effect.n_observations,
                median_vix = effect.median_vix,
                low_vix_rate = effect.low_vix_impact_rate,
                high_vix_rate = effect.high_vix_impact_rate,
                amplification = effect.amplification,
                "VIX effect"
            );
        }
    }

    let asset = cfg.default_asset.clone();
    let snapshot = ModelSnapshot::new(cfg.vix_critical, asset, parameters, tokens);
    let paths = snapshot
        .write_all(&cfg.output_dir)
        .wrap_err_with(|| format!("Failed to write artifacts to {}", cfg.output_dir.display()))?;
    info!(snapshot = %paths.binary.display(), "Calibration run completed");
    Ok(())
}

/// Prepared dataset first, then the historical join, else nothing
fn load_observations(cfg: &Config, tokens: &TokenTable) -> eyre::Result<Vec<Observation>> {
    if let Some(path) = &cfg.calibration_data_path {
        return calibration::load_observations(path)
            .wrap_err_with(|| format!("Failed to load calibration dataset {}", path.display()));
    }
    match (&cfg.headlines_path, &cfg.market_history_path) {
        (Some(headlines), Some(market)) => {
            join_history(headlines, market, tokens, &cfg.default_asset)
        }
        _ => {
            warn!("No calibration dataset or history configured");
            Ok(Vec::new())
        }
    }
}

fn join_history(
    headlines: &Path,
    market: &Path,
    tokens: &TokenTable,
    asset: &str,
) -> eyre::Result<Vec<Observation>> {
    let headlines = join::load_headlines(headlines)
        .wrap_err_with(|| format!("Failed to load headlines {}", headlines.display()))?;
    let calendar = join::load_market_calendar(market)
        .wrap_err_with(|| format!("Failed to load market history {}", market.display()))?;
    let (observations, _report) = calibration::build_observations(
        &headlines,
        &calendar,
        &Classifier::default(),
        tokens,
        asset,
        JoinPolicy::default(),
    );
    Ok(observations)
}

fn build_parameters(
    cfg: &Config,
    tokens: &TokenTable,
    observations: &[Observation],
) -> ParameterSet {
    let calibrator = match cfg.strategy {
        StrategyKind::Heuristic => return ParameterSet::heuristic(),
        StrategyKind::Rules => {
            return ParameterSet {
                global: CalibratedParameters::heuristic(),
                per_category: rules::rule_based_table(tokens, &cfg.default_asset),
            };
        }
        StrategyKind::Swarm => {
            let swarm = SwarmSearch::with_budget(cfg.search_budget).with_seed(cfg.search_seed);
            Calibrator::new(swarm)
        }
        StrategyKind::Grid => Calibrator::new(GridSearch::default()),
    };
    calibrator
        .with_vix_critical(cfg.vix_critical)
        .with_min_category_observations(cfg.min_category_observations)
        .build_parameter_set(observations, tokens, &cfg.default_asset, cfg.skipped_category_policy)
}
