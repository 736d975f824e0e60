//! Per-product chart data and its JSON export.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::error::WriteError;
use crate::model::{ProductChart, SeriesPoint};
use crate::sweep::ProductAnalysis;

/// Samples drawn along the fitted curve.
pub const CURVE_SAMPLES: usize = 100;

/// Chart data for one analysed product from its `(delta, adjusted price)`
/// pairs, or `None` if none of its rows survived.
pub fn product_chart(
    analysis: &ProductAnalysis,
    adjusted_prices: Vec<(f64, f64)>,
) -> Option<ProductChart> {
    if adjusted_prices.is_empty() {
        return None;
    }

    Some(ProductChart {
        product_id: analysis.series.product_id.clone(),
        series: analysis
            .series
            .transactions
            .iter()
            .map(|t| SeriesPoint { price: t.price, quantity: t.quantity })
            .collect(),
        model: analysis.elasticity.model(),
        historical_optimal_price: analysis.historical_optimal_price,
        demand_target_price: analysis.elasticity.demand_price(),
        adjusted_prices,
    })
}

impl ProductChart {
    /// `samples` evenly spaced points of the fitted curve between the lowest
    /// and highest observed price. Empty without a model.
    pub fn fitted_curve(&self, samples: usize) -> Vec<[f64; 2]> {
        let Some(model) = self.model else {
            return Vec::new();
        };
        let Some((lo, hi)) = self.price_range() else {
            return Vec::new();
        };
        if samples < 2 {
            return vec![[lo, model.quantity_at(lo)]];
        }
        let step = (hi - lo) / (samples - 1) as f64;
        (0..samples)
            .map(|i| {
                let p = lo + step * i as f64;
                [p, model.quantity_at(p)]
            })
            .filter(|[_, q]| q.is_finite())
            .collect()
    }

    pub fn price_range(&self) -> Option<(f64, f64)> {
        let mut prices = self.series.iter().map(|s| s.price);
        let first = prices.next()?;
        Some(prices.fold((first, first), |(lo, hi), p| (lo.min(p), hi.max(p))))
    }
}

#[derive(serde::Serialize)]
struct ChartFile<'a> {
    #[serde(flatten)]
    chart: &'a ProductChart,
    fitted_curve: Vec<[f64; 2]>,
}

/// File-name safe version of a part number.
pub fn file_stem(product_id: &str) -> String {
    let stem: String = product_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    format!("prices_{}", stem)
}

/// Write one `prices_<id>.json` per chart into `dir`. Part numbers that
/// sanitise to a stem already used in this batch get a `_2`, `_3`, ...
/// suffix.
pub fn write_charts(dir: &Path, charts: &[ProductChart]) -> Result<Vec<PathBuf>, WriteError> {
    fs::create_dir_all(dir)?;
    let mut written = Vec::with_capacity(charts.len());
    let mut used: HashSet<String> = HashSet::with_capacity(charts.len());
    for chart in charts {
        let base = file_stem(&chart.product_id);
        let mut stem = base.clone();
        let mut n = 2;
        while !used.insert(stem.clone()) {
            stem = format!("{}_{}", base, n);
            n += 1;
        }
        if stem != base {
            warn!(product = %chart.product_id, file = %stem, "chart file name taken, using suffix");
        }
        let path = dir.join(format!("{}.json", stem));
        let body = ChartFile {
            chart,
            fitted_curve: chart.fitted_curve(CURVE_SAMPLES),
        };
        fs::write(&path, serde_json::to_string_pretty(&body)?)?;
        written.push(path);
    }
    info!(dir = %dir.display(), count = written.len(), "chart data written");
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ElasticityModel;

    fn chart() -> ProductChart {
        ProductChart {
            product_id: "AB/12".to_string(),
            series: vec![
                SeriesPoint { price: 28000.0, quantity: 5 },
                SeriesPoint { price: 27000.0, quantity: 9 },
                SeriesPoint { price: 30000.0, quantity: 2 },
            ],
            model: Some(ElasticityModel { elasticity: -2.0, intercept: 22.0 }),
            historical_optimal_price: Some(28000.0),
            demand_target_price: None,
            adjusted_prices: vec![(0.05, 28000.0), (0.06, 28000.0)],
        }
    }

    #[test]
    fn test_fitted_curve_spans_price_range() {
        let curve = chart().fitted_curve(CURVE_SAMPLES);
        assert_eq!(curve.len(), CURVE_SAMPLES);
        assert_eq!(curve[0][0], 27000.0);
        assert!((curve[CURVE_SAMPLES - 1][0] - 30000.0).abs() < 1e-6);
        assert!(curve[0][1] > curve[CURVE_SAMPLES - 1][1]);
    }

    #[test]
    fn test_fitted_curve_without_model() {
        let mut c = chart();
        c.model = None;
        assert!(c.fitted_curve(10).is_empty());
    }

    #[test]
    fn test_file_stem_sanitises() {
        assert_eq!(file_stem("AB/12 x"), "prices_AB_12_x");
    }

    #[test]
    fn test_write_charts() {
        let dir = tempfile::tempdir().unwrap();
        let paths = write_charts(dir.path(), &[chart()]).unwrap();
        assert_eq!(paths.len(), 1);

        let text = fs::read_to_string(&paths[0]).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["product_id"], "AB/12");
        assert_eq!(value["fitted_curve"].as_array().unwrap().len(), CURVE_SAMPLES);
        assert!(value["demand_target_price"].is_null());
    }

    #[test]
    fn test_write_charts_colliding_stems_kept_apart() {
        let dir = tempfile::tempdir().unwrap();
        let mut slash = chart();
        slash.product_id = "A/1".to_string();
        let mut underscore = chart();
        underscore.product_id = "A_1".to_string();
        let mut suffixed = chart();
        suffixed.product_id = "A_1_2".to_string();

        let paths = write_charts(dir.path(), &[slash, underscore, suffixed]).unwrap();
        let names: Vec<String> = paths
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["prices_A_1.json", "prices_A_1_2.json", "prices_A_1_2_2.json"]);
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 3);

        let text = fs::read_to_string(&paths[1]).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["product_id"], "A_1");
    }
}
