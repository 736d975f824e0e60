use crate::model::{HistoricalStats, ProductSeries};

/// Quantile of unsorted `values` with linear interpolation between ranks.
/// Returns `None` for an empty slice or when any value is NaN.
pub fn quantile(values: &[f64], q: f64) -> Option<f64> {
    if values.is_empty() || values.iter().any(|v| v.is_nan()) {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    quantile_sorted(&sorted, q)
}

/// Same as [`quantile`] on an already sorted slice.
fn quantile_sorted(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let pos = (sorted.len() - 1) as f64 * q.clamp(0.0, 1.0);
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

/// First and third quartile.
pub fn quartiles(values: &[f64]) -> Option<(f64, f64)> {
    Some((quantile(values, 0.25)?, quantile(values, 0.75)?))
}

pub fn historical_stats(series: &ProductSeries) -> Option<HistoricalStats> {
    let (q1_price, q3_price) = quartiles(&series.prices())?;
    Some(HistoricalStats { q1_price, q3_price })
}
