//! IQR outlier scan over price and quantity.

use crate::model::{OutlierScan, ProductSeries, Transaction};
use crate::stats::quartiles;
use tracing::warn;

#[derive(Debug, Clone, Copy)]
enum Dimension {
    Price,
    Quantity,
}

impl Dimension {
    fn value(self, t: &Transaction) -> f64 {
        match self {
            Dimension::Price => t.price,
            Dimension::Quantity => t.quantity as f64,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Dimension::Price => "price",
            Dimension::Quantity => "quantity",
        }
    }
}

fn signature(t: &Transaction) -> String {
    format!("{}:{}", t.price, t.quantity)
}

/// Flag rows outside `[Q1 - k*IQR, Q3 + k*IQR]` on price, then on quantity.
///
/// A dimension with zero IQR is not tested. Signatures are unique and keep
/// the order in which they were first flagged. A scan that cannot compute
/// its bounds reports [`OutlierScan::Unknown`] instead of an empty list.
pub fn detect(series: &ProductSeries, multiplier: f64) -> OutlierScan {
    let mut flagged: Vec<String> = Vec::new();

    for dim in [Dimension::Price, Dimension::Quantity] {
        let values: Vec<f64> = series.transactions.iter().map(|t| dim.value(t)).collect();
        if values.is_empty() {
            continue;
        }
        let Some((q1, q3)) = quartiles(&values) else {
            warn!(product = %series.product_id, dimension = dim.name(), "outlier quartiles undefined");
            return OutlierScan::Unknown(format!("{} quartiles undefined", dim.name()));
        };
        let iqr = q3 - q1;
        if iqr == 0.0 {
            continue;
        }
        let lower = q1 - multiplier * iqr;
        let upper = q3 + multiplier * iqr;
        if !(lower.is_finite() && upper.is_finite()) {
            warn!(product = %series.product_id, dimension = dim.name(), "outlier bounds not finite");
            return OutlierScan::Unknown(format!("{} bounds not finite", dim.name()));
        }

        for (t, v) in series.transactions.iter().zip(&values) {
            if *v < lower || *v > upper {
                let sig = signature(t);
                if !flagged.contains(&sig) {
                    flagged.push(sig);
                }
            }
        }
    }

    if flagged.is_empty() {
        OutlierScan::None
    } else {
        OutlierScan::Found(flagged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(points: &[(f64, u64)]) -> ProductSeries {
        ProductSeries {
            product_id: "P".to_string(),
            transactions: points
                .iter()
                .map(|&(price, quantity)| Transaction { date: String::new(), price, quantity })
                .collect(),
        }
    }

    #[test]
    fn test_zero_iqr_dimension_is_skipped() {
        // price has no spread, quantity has one wild value
        let s = series(&[(28000.0, 5), (28000.0, 5), (28000.0, 6), (28000.0, 5), (28000.0, 500)]);
        assert_eq!(detect(&s, 1.5), OutlierScan::Found(vec!["28000:500".to_string()]));

        let flat = series(&[(28000.0, 5), (28000.0, 5), (28000.0, 5)]);
        assert_eq!(detect(&flat, 1.5), OutlierScan::None);
    }

    #[test]
    fn test_price_outlier_flagged_once() {
        // 38000 is extreme on both price and quantity
        let s = series(&[
            (28000.0, 5),
            (28100.0, 6),
            (28200.0, 5),
            (28300.0, 7),
            (38000.0, 90),
        ]);
        assert_eq!(detect(&s, 1.5), OutlierScan::Found(vec!["38000:90".to_string()]));
    }

    #[test]
    fn test_order_of_first_occurrence() {
        let s = series(&[
            (28000.0, 90),
            (28100.0, 6),
            (28200.0, 5),
            (28300.0, 7),
            (38000.0, 5),
            (28150.0, 6),
        ]);
        // price pass flags 38000 first, quantity pass adds 28000 after it
        assert_eq!(
            detect(&s, 1.5),
            OutlierScan::Found(vec!["38000:5".to_string(), "28000:90".to_string()])
        );
    }

    #[test]
    fn test_nan_price_is_unknown() {
        let s = series(&[(28000.0, 5), (f64::NAN, 6), (28200.0, 5)]);
        assert!(matches!(detect(&s, 1.5), OutlierScan::Unknown(_)));
    }

    #[test]
    fn test_empty_series_has_no_outliers() {
        assert_eq!(detect(&series(&[]), 1.5), OutlierScan::None);
    }
}
