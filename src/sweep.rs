//! Sensitivity sweep over (delta x product).
//!
//! Each product is cleaned and analysed once; the delta-independent parts
//! (quartiles, historical optimum, demand curve, outliers) are then combined
//! with every delta's competitor band. Rows come out delta-major, then in
//! product order, whether or not the per-product work ran in parallel.

use std::collections::HashMap;

use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::charts;
use crate::cleaner::clean_product;
use crate::config::PricingConfig;
use crate::elasticity::{self, ElasticityOutcome};
use crate::error::PricingError;
use crate::model::{
    HistoricalStats, OutlierScan, PriceRecommendation, ProductChart, ProductGroup, ProductSeries,
};
use crate::outliers;
use crate::profit::optimal_price;
use crate::stats::historical_stats;

/// Price interval the competitor-adjusted price must land in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompetitorBand {
    pub lower: f64,
    pub upper: f64,
}

impl CompetitorBand {
    /// Intersection of the delta band, the margin floor and the deviation cap.
    pub fn new(delta: f64, config: &PricingConfig) -> Self {
        let c = config.competitor_price;
        let cap = config.max_competitor_deviation;
        let lower = (c * (1.0 - delta))
            .max(config.margin_floor())
            .max(c * (1.0 - cap));
        let upper = (c * (1.0 + delta)).min(c * (1.0 + cap));
        Self { lower, upper }
    }

    pub fn contains(&self, price: f64) -> bool {
        price >= self.lower && price <= self.upper
    }

    /// Cap at `upper`, then raise to `lower`. A crossed band resolves to `lower`.
    pub fn clamp(&self, price: f64) -> f64 {
        price.min(self.upper).max(self.lower)
    }
}

/// Everything about one product that does not depend on delta.
#[derive(Debug, Clone)]
pub struct ProductAnalysis {
    pub series: ProductSeries,
    pub stats: HistoricalStats,
    pub historical_optimal_price: Option<f64>,
    pub elasticity: ElasticityOutcome,
    pub predicted_quantity: Option<f64>,
    pub outliers: OutlierScan,
}

/// Clean and analyse one product. `Ok(None)` when too few rows survive cleaning.
pub fn analyze_product(
    group: &ProductGroup,
    config: &PricingConfig,
) -> Result<Option<ProductAnalysis>, PricingError> {
    let Some(series) = clean_product(&group.product_id, &group.rows, config) else {
        debug!(
            product = %group.product_id,
            rows = group.rows.len(),
            min_days = config.min_days,
            "not enough clean rows, skipping"
        );
        return Ok(None);
    };

    let stats = historical_stats(&series)
        .ok_or_else(|| PricingError::NoQuartiles(group.product_id.clone()))?;

    let historical_optimal_price = optimal_price(
        &series.transactions,
        config.unit_cost,
        &stats,
        config.outlier_penalty,
    );

    let elasticity = elasticity::estimate(&series, config);
    if let ElasticityOutcome::Failed(e) = &elasticity {
        debug!(product = %group.product_id, error = %e, "demand curve unavailable");
    }
    let predicted_quantity = elasticity.predicted_quantity(config.target_price);

    let outliers = outliers::detect(&series, config.outlier_iqr_multiplier);

    Ok(Some(ProductAnalysis {
        series,
        stats,
        historical_optimal_price,
        elasticity,
        predicted_quantity,
        outliers,
    }))
}

/// Build the row for one delta from a product's analysis.
pub fn recommend(
    analysis: &ProductAnalysis,
    delta: f64,
    config: &PricingConfig,
) -> Result<PriceRecommendation, PricingError> {
    let band = CompetitorBand::new(delta, config);
    if !(band.lower.is_finite() && band.upper.is_finite()) {
        return Err(PricingError::InvalidBand {
            lower: band.lower,
            upper: band.upper,
        });
    }

    let in_band = analysis.series.within(band.lower, band.upper);
    let picked = if in_band.is_empty() {
        None
    } else {
        optimal_price(&in_band, config.unit_cost, &analysis.stats, config.outlier_penalty)
    };
    let adjusted = band.clamp(picked.unwrap_or(config.competitor_price));
    if !adjusted.is_finite() {
        return Err(PricingError::NonFinitePrice(adjusted));
    }

    let model = analysis.elasticity.model();
    Ok(PriceRecommendation {
        delta,
        product_id: analysis.series.product_id.clone(),
        historical_optimal_price: analysis.historical_optimal_price,
        competitor_adjusted_price: adjusted,
        demand_target_price: analysis.elasticity.demand_price(),
        predicted_quantity: analysis.predicted_quantity,
        elasticity: model.map(|m| m.elasticity),
        intercept: model.map(|m| m.intercept),
        days_analyzed: analysis.series.len(),
        outliers: analysis.outliers.clone(),
    })
}

/// Rows plus the per-product chart data derived from them.
#[derive(Debug, Clone, Default)]
pub struct SweepReport {
    pub recommendations: Vec<PriceRecommendation>,
    pub charts: Vec<ProductChart>,
}

impl SweepReport {
    pub fn is_empty(&self) -> bool {
        self.recommendations.is_empty()
    }
}

/// Run every delta against every product group, in the given group order.
pub fn run_sweep(groups: &[ProductGroup], config: &PricingConfig) -> SweepReport {
    let analyses: Vec<Result<Option<ProductAnalysis>, PricingError>> = if config.parallel {
        groups.par_iter().map(|g| analyze_product(g, config)).collect()
    } else {
        groups.iter().map(|g| analyze_product(g, config)).collect()
    };

    let mut ready: Vec<&ProductAnalysis> = Vec::with_capacity(analyses.len());
    for (group, analysis) in groups.iter().zip(&analyses) {
        match analysis {
            Ok(Some(a)) => ready.push(a),
            Ok(None) => {}
            Err(e) => warn!(product = %group.product_id, error = %e, "analysis failed, skipping product"),
        }
    }

    let mut recommendations = Vec::with_capacity(config.deltas.len() * ready.len());
    for &delta in &config.deltas {
        for analysis in &ready {
            match recommend(analysis, delta, config) {
                Ok(row) => recommendations.push(row),
                Err(e) => warn!(
                    product = %analysis.series.product_id,
                    delta,
                    error = %e,
                    "pricing failed, skipping pair"
                ),
            }
        }
    }

    let mut adjusted: HashMap<&str, Vec<(f64, f64)>> = HashMap::with_capacity(ready.len());
    for r in &recommendations {
        adjusted
            .entry(r.product_id.as_str())
            .or_default()
            .push((r.delta, r.competitor_adjusted_price));
    }
    let charts = ready
        .iter()
        .filter_map(|a| {
            let prices = adjusted.remove(a.series.product_id.as_str()).unwrap_or_default();
            charts::product_chart(a, prices)
        })
        .collect();

    info!(
        products = groups.len(),
        analysed = ready.len(),
        deltas = config.deltas.len(),
        rows = recommendations.len(),
        "sweep complete"
    );

    SweepReport {
        recommendations,
        charts,
    }
}
