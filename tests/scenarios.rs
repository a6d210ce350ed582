use news_impact_scorer::Category;
use news_impact_scorer::calibration::{
    CalibratedParameters, Calibrator, GridSearch, Observation, ParameterScope, ParameterSource,
    SkippedCategoryPolicy,
};
use news_impact_scorer::classifier::Classifier;
use news_impact_scorer::engine::ImpactEngine;
use news_impact_scorer::scoring::AdjustmentParams;
use news_impact_scorer::tokens::{TokenRecord, TokenTable};

fn fed_table() -> TokenTable {
    TokenTable::from_records(vec![TokenRecord {
        token: 5.8,
        num_events: 412,
        pct_up: 48.5,
        pct_down: 51.5,
        avg_volatility: 0.0061,
        ..TokenRecord::moderate(Category::FedRates, "SPY")
    }])
    .unwrap()
}

#[test]
fn fed_headline_damped_when_calm_and_amplified_when_stressed() {
    let classifier = Classifier::default();
    assert_eq!(classifier.classify("Fed raises interest rates"), Category::FedRates);

    let engine = ImpactEngine::heuristic(fed_table(), "SPY");
    let calm = engine.query("Fed raises interest rates", 15.0);
    assert_eq!((calm.alpha, calm.beta), (0.75, 1.5));
    assert!(calm.contextual_probability < calm.base_probability);

    let stressed = engine.query("Fed raises interest rates", 40.0);
    assert!(stressed.contextual_probability > stressed.base_probability);
    assert!(stressed.contextual_probability <= 100.0);
}

#[test]
fn unmatched_text_gets_moderate_token() {
    let table = fed_table();
    assert_eq!(Classifier::default().classify(""), Category::Other);
    assert!(table.lookup(Category::Other, "SPY").is_err());

    let record = table.lookup_or_default(Category::Other, "SPY");
    assert_eq!(record.token, 5.0);
    assert_eq!(record.base_probability(), 50.0);

    let engine = ImpactEngine::heuristic(table, "SPY");
    assert_eq!(engine.query("", 20.0).base_probability, 50.0);
}

fn observations(category: Category, n: usize) -> Vec<Observation> {
    (0..n)
        .map(|i| {
            let vix = 11.0 + (i % 12) as f64 * 2.5;
            Observation {
                category,
                p_base: 48.0,
                vix,
                realized_impact: vix > 24.0,
                realized_return: if vix > 24.0 { -0.011 } else { 0.001 },
            }
        })
        .collect()
}

#[test]
fn thin_category_falls_back_to_global_parameters() {
    let mut data = observations(Category::FedRates, 60);
    data.extend(observations(Category::Brexit, 12));

    let tokens = TokenTable::from_records(vec![
        TokenRecord {
            token: 5.8,
            num_events: 412,
            ..TokenRecord::moderate(Category::FedRates, "SPY")
        },
        TokenRecord {
            token: 6.4,
            num_events: 12,
            ..TokenRecord::moderate(Category::Brexit, "SPY")
        },
    ])
    .unwrap();

    let calibrator = Calibrator::new(GridSearch::default());
    let per_category = calibrator.calibrate_per_category(&data);
    assert_eq!(per_category.skipped.get(&Category::Brexit), Some(&12));

    let policy = SkippedCategoryPolicy::UseGlobal;
    let set = calibrator.build_parameter_set(&data, &tokens, "SPY", policy);
    assert!(set.for_category(Category::FedRates).is_some());
    let (scope, resolved) = set.resolve(Category::Brexit);
    assert_eq!(scope, ParameterScope::Global);
    assert_eq!(*resolved, set.global);

    let engine = ImpactEngine::new(Classifier::default(), tokens, set, 20.0, "SPY");
    let a = engine.query("Brexit talks stall", 30.0);
    assert_eq!(a.parameter_scope, ParameterScope::Global);
    assert_eq!(a.parameter_source, ParameterSource::GridSearch);
}

#[test]
fn no_data_means_heuristic_defaults() {
    let policy = SkippedCategoryPolicy::UseGlobal;
    let set = Calibrator::default().build_parameter_set(&[], &fed_table(), "SPY", policy);
    assert_eq!(set.global, CalibratedParameters::heuristic());
    assert_eq!(set.global.params, AdjustmentParams::HEURISTIC);
    assert!(set.per_category.is_empty());
}
