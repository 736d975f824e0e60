use crate::model::{HistoricalStats, Transaction};

/// Profit of selling `quantity` at `price`, haircut by `penalty` when the
/// price falls outside the historical [Q1, Q3] band. A band with no spread
/// applies no haircut.
pub fn penalized_profit(
    price: f64,
    quantity: u64,
    cost: f64,
    band: &HistoricalStats,
    penalty: f64,
) -> f64 {
    let profit = (price - cost) * quantity as f64;
    if band.has_spread() && !band.contains(price) {
        profit * (1.0 - penalty)
    } else {
        profit
    }
}

/// Price of the candidate with the highest penalized profit.
///
/// Only a strictly greater profit replaces the current best, so ties keep the
/// first candidate in iteration order. NaN profits are never picked. An empty
/// candidate set yields `None`.
pub fn optimal_price(
    candidates: &[Transaction],
    cost: f64,
    band: &HistoricalStats,
    penalty: f64,
) -> Option<f64> {
    let mut best_profit = f64::NEG_INFINITY;
    let mut best_price = None;

    for t in candidates {
        let profit = penalized_profit(t.price, t.quantity, cost, band, penalty);
        if !profit.is_nan() && profit > best_profit {
            best_profit = profit;
            best_price = Some(t.price);
        }
    }

    best_price
}
