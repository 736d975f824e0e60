use serde::{Deserialize, Serialize};

/// One row as it arrives from the input table, before cleaning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    pub date: String,
    pub part_number: String,
    pub price: f64,
    pub quantity: i64,
}

/// Raw rows sharing one part number, in input order.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductGroup {
    pub product_id: String,
    pub rows: Vec<RawRecord>,
}

/// A cleaned transaction: price inside the plausible range, quantity >= 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub date: String,
    pub price: f64,
    pub quantity: u64,
}

/// Cleaned transactions for one part number.
#[derive(Debug, Clone)]
pub struct ProductSeries {
    pub product_id: String,
    pub transactions: Vec<Transaction>,
}

impl ProductSeries {
    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    pub fn prices(&self) -> Vec<f64> {
        self.transactions.iter().map(|t| t.price).collect()
    }

    pub fn quantities(&self) -> Vec<f64> {
        self.transactions.iter().map(|t| t.quantity as f64).collect()
    }

    /// Rows whose price lies in `[lower, upper]`, copied into a new vector.
    pub fn within(&self, lower: f64, upper: f64) -> Vec<Transaction> {
        self.transactions
            .iter()
            .filter(|t| t.price >= lower && t.price <= upper)
            .cloned()
            .collect()
    }
}

/// 25th / 75th percentile of a product's cleaned prices.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HistoricalStats {
    pub q1_price: f64,
    pub q3_price: f64,
}

impl HistoricalStats {
    /// False when q1 == q3; the range penalty is skipped in that case.
    pub fn has_spread(&self) -> bool {
        self.q3_price > self.q1_price
    }

    pub fn contains(&self, price: f64) -> bool {
        price >= self.q1_price && price <= self.q3_price
    }
}

/// ln(q + eps) = intercept + elasticity * ln(p)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ElasticityModel {
    pub elasticity: f64,
    pub intercept: f64,
}

impl ElasticityModel {
    pub fn quantity_at(&self, price: f64) -> f64 {
        self.intercept.exp() * price.powf(self.elasticity)
    }
}

/// Result of the outlier scan for one product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "detail", rename_all = "lowercase")]
pub enum OutlierScan {
    None,
    Found(Vec<String>),
    Unknown(String),
}

impl OutlierScan {
    pub const NONE_MARKER: &'static str = "none";
    pub const UNKNOWN_MARKER: &'static str = "unknown";

    pub fn render(&self) -> String {
        match self {
            OutlierScan::None => Self::NONE_MARKER.to_string(),
            OutlierScan::Found(list) => list.join(", "),
            OutlierScan::Unknown(_) => Self::UNKNOWN_MARKER.to_string(),
        }
    }
}

/// One output row per (delta, product).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceRecommendation {
    pub delta: f64,
    pub product_id: String,
    pub historical_optimal_price: Option<f64>,
    pub competitor_adjusted_price: f64,
    pub demand_target_price: Option<f64>,
    pub predicted_quantity: Option<f64>,
    pub elasticity: Option<f64>,
    pub intercept: Option<f64>,
    pub days_analyzed: usize,
    pub outliers: OutlierScan,
}

/// Flat shape used by the table writers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecommendationRecord {
    pub delta: f64,
    pub part_number: String,
    pub historical_optimal_price: Option<f64>,
    pub competitor_adjusted_price: f64,
    pub demand_target_price: Option<f64>,
    pub predicted_quantity: Option<f64>,
    pub elasticity: Option<f64>,
    pub intercept: Option<f64>,
    pub days_analyzed: usize,
    pub outliers: String,
}

impl From<&PriceRecommendation> for RecommendationRecord {
    fn from(r: &PriceRecommendation) -> Self {
        RecommendationRecord {
            delta: r.delta,
            part_number: r.product_id.clone(),
            historical_optimal_price: r.historical_optimal_price,
            competitor_adjusted_price: r.competitor_adjusted_price,
            demand_target_price: r.demand_target_price,
            predicted_quantity: r.predicted_quantity,
            elasticity: r.elasticity,
            intercept: r.intercept,
            days_analyzed: r.days_analyzed,
            outliers: r.outliers.render(),
        }
    }
}

/// Cleaned point as drawn on a chart.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub price: f64,
    pub quantity: u64,
}

/// Everything a renderer needs to draw one product.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductChart {
    pub product_id: String,
    pub series: Vec<SeriesPoint>,
    pub model: Option<ElasticityModel>,
    pub historical_optimal_price: Option<f64>,
    pub demand_target_price: Option<f64>,
    pub adjusted_prices: Vec<(f64, f64)>, // (delta, price)
}
