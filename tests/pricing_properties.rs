//! Property tests for the pricing invariants.

use price_analyzer::elasticity::{self, ElasticityOutcome};
use price_analyzer::model::{HistoricalStats, ProductGroup, ProductSeries, RawRecord, Transaction};
use price_analyzer::profit::optimal_price;
use price_analyzer::sweep::CompetitorBand;
use price_analyzer::{run_sweep, PricingConfig};
use proptest::prelude::*;

fn points() -> impl Strategy<Value = Vec<(f64, u64)>> {
    prop::collection::vec((27_001.0f64..38_999.0, 0u64..200), 3..40)
}

fn series(points: &[(f64, u64)]) -> ProductSeries {
    ProductSeries {
        product_id: "P".to_string(),
        transactions: points
            .iter()
            .map(|&(price, quantity)| Transaction { date: String::new(), price, quantity })
            .collect(),
    }
}

proptest! {
    #[test]
    fn adjusted_price_stays_in_band(
        pts in points(),
        delta in 0.01f64..0.5,
        competitor in 20_000.0f64..40_000.0,
        cost in 10_000.0f64..25_000.0,
    ) {
        let config = PricingConfig {
            deltas: vec![delta],
            competitor_price: competitor,
            unit_cost: cost,
            ..PricingConfig::default()
        };
        let band = CompetitorBand::new(delta, &config);
        prop_assume!(band.lower <= band.upper);

        let group = ProductGroup {
            product_id: "P".to_string(),
            rows: pts.iter().map(|&(price, q)| RawRecord {
                date: String::new(),
                part_number: "P".to_string(),
                price,
                quantity: q as i64,
            }).collect(),
        };
        let report = run_sweep(&[group], &config);
        prop_assert_eq!(report.recommendations.len(), 1);
        let price = report.recommendations[0].competitor_adjusted_price;
        prop_assert!(band.contains(price));
        prop_assert!(price >= competitor * (1.0 - config.max_competitor_deviation) - 1e-9);
        prop_assert!(price <= competitor * (1.0 + config.max_competitor_deviation) + 1e-9);
    }

    #[test]
    fn demand_price_never_undercuts_margin(pts in points(), demand in 0.5f64..500.0) {
        let config = PricingConfig { expected_demand: demand, ..PricingConfig::default() };
        if let ElasticityOutcome::Fitted { demand_price: Some(price), .. } =
            elasticity::estimate(&series(&pts), &config)
        {
            prop_assert!(price >= config.margin_floor());
        }
    }

    #[test]
    fn optimizer_picks_a_candidate(pts in points()) {
        let band = HistoricalStats { q1_price: 28_000.0, q3_price: 30_000.0 };
        let s = series(&pts);
        let picked = optimal_price(&s.transactions, 20_000.0, &band, 0.3);
        let picked = picked.expect("non-empty candidates always yield a price");
        prop_assert!(!picked.is_nan());
        prop_assert!(pts.iter().any(|(p, _)| *p == picked));
    }
}
