use news_impact_scorer::Category;
use news_impact_scorer::classifier::Classifier;
use news_impact_scorer::scoring::{DEFAULT_VIX_CRITICAL, adjust};
use news_impact_scorer::tokens::{LookupError, TokenRecord, TokenTable};
use proptest::prelude::*;

fn real_category() -> impl Strategy<Value = Category> {
    let labelled: Vec<Category> =
        Category::ALL.iter().copied().filter(|c| !c.is_sentinel()).collect();
    proptest::sample::select(labelled)
}

proptest! {
    #[test]
    fn adjusted_probability_stays_in_bounds(
        p_base in 0.0f64..=100.0,
        vix in 0.01f64..300.0,
        alpha in 0.1f64..=2.5,
        beta in 0.5f64..=3.0,
    ) {
        let p = adjust(p_base, vix, alpha, beta, DEFAULT_VIX_CRITICAL);
        prop_assert!((0.0..=100.0).contains(&p), "adjust returned {}", p);
    }

    #[test]
    fn both_branches_meet_at_critical_vix(
        p_base in 0.0f64..=100.0,
        alpha in 0.1f64..=2.5,
        beta in 0.5f64..=3.0,
        vix_critical in 5.0f64..60.0,
    ) {
        prop_assert_eq!(adjust(p_base, vix_critical, alpha, beta, vix_critical), p_base);

        // The power branch approaches p_base like eps^beta
        let eps = 1e-12;
        let below = adjust(p_base, vix_critical * (1.0 - eps), alpha, beta, vix_critical);
        let above = adjust(p_base, vix_critical * (1.0 + eps), alpha, beta, vix_critical);
        prop_assert!((below - p_base).abs() < 1e-3);
        prop_assert!((above - p_base).abs() < 1e-3);
    }

    #[test]
    fn stressed_markets_never_lower_the_probability(
        p_base in 0.0f64..=100.0,
        alpha in 0.1f64..=2.5,
        beta in 0.5f64..=3.0,
        v1 in 1.0f64..5.0,
        dv in 0.0f64..5.0,
    ) {
        let low = adjust(p_base, DEFAULT_VIX_CRITICAL * v1, alpha, beta, DEFAULT_VIX_CRITICAL);
        let high_vix = DEFAULT_VIX_CRITICAL * (v1 + dv);
        let high = adjust(p_base, high_vix, alpha, beta, DEFAULT_VIX_CRITICAL);
        prop_assert!(low <= high + 1e-9, "{} > {}", low, high);
        prop_assert!(low >= p_base - 1e-9);
    }

    #[test]
    fn classification_is_deterministic(text in ".{0,120}") {
        let first = Classifier::default().classify(&text);
        let second = Classifier::default().classify(&text);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn lookup_returns_exactly_the_inserted_record(
        entries in proptest::collection::btree_map(
            (real_category(), "[A-Z]{2,4}"),
            (1.0f64..=10.0, 0u32..500),
            1..20,
        ),
        other_asset in "[a-z]{5}",
    ) {
        let records: Vec<TokenRecord> = entries
            .iter()
            .map(|((category, asset), (token, num_events))| TokenRecord {
                token: *token,
                num_events: *num_events,
                ..TokenRecord::moderate(*category, asset.clone())
            })
            .collect();
        let table = TokenTable::from_records(records.clone()).unwrap();

        for record in &records {
            prop_assert_eq!(table.lookup(record.category, &record.asset).unwrap(), record);
            // Lowercase assets never collide with the generated uppercase ones
            prop_assert_eq!(
                table.lookup(record.category, &other_asset),
                Err(LookupError::NotFound { category: record.category, asset: other_asset.clone() })
            );
        }
    }
}
