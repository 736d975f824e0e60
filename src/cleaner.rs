use crate::config::PricingConfig;
use crate::model::{ProductSeries, RawRecord, Transaction};

/// Keep rows with a plausible price and a non-negative quantity, in input order.
pub fn clean(rows: &[RawRecord], config: &PricingConfig) -> Vec<Transaction> {
    rows.iter()
        .filter(|r| r.price > config.price_floor && r.price < config.price_ceiling)
        .filter_map(|r| {
            let quantity = u64::try_from(r.quantity).ok()?;
            Some(Transaction {
                date: r.date.clone(),
                price: r.price,
                quantity,
            })
        })
        .collect()
}

/// Clean one product's rows; `None` when fewer than `min_days` rows survive.
pub fn clean_product(
    product_id: &str,
    rows: &[RawRecord],
    config: &PricingConfig,
) -> Option<ProductSeries> {
    let transactions = clean(rows, config);
    if transactions.len() < config.min_days {
        return None;
    }
    Some(ProductSeries {
        product_id: product_id.to_string(),
        transactions,
    })
}
