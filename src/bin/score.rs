use std::path::PathBuf;

use clap::Parser;
use dotenvy::dotenv;
use eyre::WrapErr;
use tracing::{debug, info};

use news_impact_scorer::artifacts::ModelSnapshot;
use news_impact_scorer::calibration::ParameterSet;
use news_impact_scorer::classifier::{Classifier, DenyListFilter};
use news_impact_scorer::config::Config;
use news_impact_scorer::engine::ImpactEngine;
use news_impact_scorer::logging;
use news_impact_scorer::tokens::TokenTable;

/// Score a headline against the current VIX level
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Headline or news text
    text: String,

    /// Current VIX close
    #[arg(long)]
    vix: f64,

    /// Asset to look the token up for (defaults to DEFAULT_ASSET)
    #[arg(long)]
    asset: Option<String>,

    /// Parameter snapshot (.bin or .json) written by `calibrate`
    #[arg(long)]
    parameters: Option<PathBuf>,

    /// Token table CSV, used when no snapshot is given
    #[arg(long)]
    tokens: Option<PathBuf>,

    /// Classify off-topic texts as irrelevant
    #[arg(long)]
    deny_irrelevant: bool,
}

fn main() -> eyre::Result<()> {
    dotenv().ok();
    let args = Args::parse();

    if let Err(e) = logging::init_logging(env!("CARGO_BIN_NAME")) {
        eprintln!("Failed to initialize logging: {}", e);
        return Err(e);
    }

    let cfg = Config::load().wrap_err("Invalid configuration")?;
    let classifier = if args.deny_irrelevant {
        Classifier::default().with_relevance_filter(DenyListFilter::default())
    } else {
        Classifier::default()
    };

    let engine = match args.parameters.as_ref().or(cfg.parameters_path.as_ref()) {
        Some(path) => {
            let snapshot = if path.extension().is_some_and(|ext| ext == "json") {
                ModelSnapshot::load_json(path)
            } else {
                ModelSnapshot::load_binary(path)
            }
            .wrap_err_with(|| format!("Failed to load parameter snapshot {}", path.display()))?;
            ImpactEngine::from_snapshot(classifier, snapshot)
        }
        None => {
            let path = args.tokens.as_ref().unwrap_or(&cfg.token_table_path);
            let tokens = TokenTable::from_csv_path(path)
                .wrap_err_with(|| format!("Failed to load token table {}", path.display()))?;
            info!("No parameter snapshot configured, using heuristic parameters");
            let parameters = ParameterSet::heuristic();
            let asset = cfg.default_asset.clone();
            ImpactEngine::new(classifier, tokens, parameters, cfg.vix_critical, asset)
        }
    };

    debug!(candidates = ?engine.classifier().matching_categories(&args.text), "Keyword matches");
    let asset = args.asset.as_deref().unwrap_or(engine.asset());
    let assessment = engine.query_asset(&args.text, args.vix, asset);
    println!("{}", serde_json::to_string_pretty(&assessment)?);
    Ok(())
}
