use serde::Serialize;
use tracing::{debug, instrument, warn};

use crate::artifacts::ModelSnapshot;
use crate::calibration::{CalibratedParameters, ParameterScope, ParameterSet, ParameterSource};
use crate::category::Category;
use crate::classifier::Classifier;
use crate::scoring::{
    AdjustmentParams, Confidence, DEFAULT_VIX_CRITICAL, Direction, vix_adjustment_pct,
};
use crate::tokens::{MODERATE_TOKEN, TokenRecord, TokenTable};

/// Probability reported when nothing can be computed
pub const PLACEHOLDER_PROBABILITY: f64 = 30.0;

/// Answer to one (text, VIX) query
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImpactAssessment {
    pub category: Category,
    pub asset: String,
    pub token: f64,
    pub base_probability: f64,
    pub contextual_probability: f64,
    pub vix_adjustment_pct: f64,
    pub alpha: f64,
    pub beta: f64,
    pub vix: f64,
    pub vix_normalized: f64,
    pub num_events: u32,
    pub confidence: Confidence,
    pub direction: Direction,
    pub parameter_scope: ParameterScope,
    pub parameter_source: ParameterSource,
    /// Set when the numbers are the fixed placeholder rather than a computation
    pub placeholder: bool,
}

/// Classifier, token table and calibrated parameters behind one query call.
///
/// Everything is read-only after construction, so one engine can serve
/// any number of threads.
pub struct ImpactEngine {
    classifier: Classifier,
    tokens: TokenTable,
    parameters: ParameterSet,
    vix_critical: f64,
    asset: String,
}

impl ImpactEngine {
    pub fn new(
        classifier: Classifier,
        tokens: TokenTable,
        parameters: ParameterSet,
        vix_critical: f64,
        asset: impl Into<String>,
    ) -> Self {
        Self {
            classifier,
            tokens,
            parameters,
            vix_critical,
            asset: asset.into(),
        }
    }

    pub fn from_snapshot(classifier: Classifier, snapshot: ModelSnapshot) -> Self {
        Self::new(
            classifier,
            snapshot.tokens,
            snapshot.parameters,
            snapshot.vix_critical,
            snapshot.asset,
        )
    }

    /// Heuristic parameters over a bare token table
    pub fn heuristic(tokens: TokenTable, asset: impl Into<String>) -> Self {
        Self::new(
            Classifier::default(),
            tokens,
            ParameterSet::heuristic(),
            DEFAULT_VIX_CRITICAL,
            asset,
        )
    }

    pub fn asset(&self) -> &str {
        &self.asset
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    pub fn tokens(&self) -> &TokenTable {
        &self.tokens
    }

    pub fn parameters(&self) -> &ParameterSet {
        &self.parameters
    }

    /// Scores `text` for the engine's default asset
    pub fn query(&self, text: &str, vix: f64) -> ImpactAssessment {
        self.query_asset(text, vix, &self.asset)
    }

    #[instrument(skip(self, text), fields(text_len = text.len()))]
    pub fn query_asset(&self, text: &str, vix: f64, asset: &str) -> ImpactAssessment {
        let category = self.classifier.classify(text);
        if category == Category::Irrelevant {
            debug!("Text rejected by relevance filter");
            return self.placeholder(category, asset, vix);
        }
        let record = self.tokens.lookup_or_default(category, asset);
        self.assess(&record, vix)
    }

    /// Applies the contextual adjustment to an already looked-up record
    pub fn assess(&self, record: &TokenRecord, vix: f64) -> ImpactAssessment {
        if !(vix.is_finite() && vix > 0.0) {
            warn!(
                vix,
                category = %record.category,
                "VIX must be positive and finite, returning placeholder"
            );
            return self.placeholder(record.category, &record.asset, vix);
        }

        let (scope, resolved) = self.resolve_parameters(record);
        let base = record.base_probability();
        let contextual = resolved.params.adjust(base, vix, self.vix_critical);
        ImpactAssessment {
            category: record.category,
            asset: record.asset.clone(),
            token: record.token,
            base_probability: base,
            contextual_probability: contextual,
            vix_adjustment_pct: vix_adjustment_pct(base, contextual),
            alpha: resolved.params.alpha,
            beta: resolved.params.beta,
            vix,
            vix_normalized: vix / self.vix_critical,
            num_events: record.num_events,
            confidence: Confidence::from_record(record),
            direction: Direction::from_record(record),
            parameter_scope: scope,
            parameter_source: resolved.source,
            placeholder: false,
        }
    }

    /// Category override, then the token row's own alpha/beta, then global
    fn resolve_parameters(&self, record: &TokenRecord) -> (ParameterScope, CalibratedParameters) {
        if let Some(params) = self.parameters.for_category(record.category) {
            return (ParameterScope::Category(record.category), *params);
        }
        if let (Some(alpha), Some(beta)) = (record.alpha, record.beta) {
            let params = AdjustmentParams::new(alpha, beta);
            return (
                ParameterScope::Category(record.category),
                CalibratedParameters::unfitted(params, ParameterSource::TokenTable),
            );
        }
        (ParameterScope::Global, self.parameters.global)
    }

    fn placeholder(&self, category: Category, asset: &str, vix: f64) -> ImpactAssessment {
        let params = self.parameters.global;
        ImpactAssessment {
            category,
            asset: asset.to_string(),
            token: MODERATE_TOKEN,
            base_probability: PLACEHOLDER_PROBABILITY,
            contextual_probability: PLACEHOLDER_PROBABILITY,
            vix_adjustment_pct: 0.0,
            alpha: params.params.alpha,
            beta: params.params.beta,
            vix,
            vix_normalized: 0.0,
            num_events: 0,
            confidence: Confidence::Low,
            direction: Direction::Neutral,
            parameter_scope: ParameterScope::Global,
            parameter_source: params.source,
            placeholder: true,
        }
    }
}
