//! Log-log demand curve fit and its inversion at a target demand.

use statrs::statistics::Statistics;

use crate::config::PricingConfig;
use crate::error::FitError;
use crate::model::{ElasticityModel, ProductSeries};

/// Slopes smaller than this in magnitude are treated as flat demand.
pub const FLAT_ELASTICITY: f64 = 1e-9;

/// Outcome of fitting one product's demand curve.
#[derive(Debug, Clone, PartialEq)]
pub enum ElasticityOutcome {
    /// The curve was fitted. `demand_price` is `None` when no positive
    /// expected demand was configured.
    Fitted {
        model: ElasticityModel,
        demand_price: Option<f64>,
    },
    Failed(FitError),
}

impl ElasticityOutcome {
    pub fn model(&self) -> Option<ElasticityModel> {
        match self {
            ElasticityOutcome::Fitted { model, .. } => Some(*model),
            ElasticityOutcome::Failed(_) => None,
        }
    }

    pub fn demand_price(&self) -> Option<f64> {
        match self {
            ElasticityOutcome::Fitted { demand_price, .. } => *demand_price,
            ElasticityOutcome::Failed(_) => None,
        }
    }

    /// Quantity the fitted curve predicts at `price`, when the fit has a
    /// usable (non-zero) elasticity.
    pub fn predicted_quantity(&self, price: f64) -> Option<f64> {
        let model = self.model()?;
        if model.elasticity == 0.0 {
            return None;
        }
        let q = model.quantity_at(price);
        q.is_finite().then_some(q)
    }
}

/// Ordinary least squares of ln(q + epsilon) on ln(p) over the whole series.
pub fn fit(series: &ProductSeries, epsilon: f64) -> Result<ElasticityModel, FitError> {
    let n = series.len();
    if n < 2 {
        return Err(FitError::TooFewPoints(n));
    }
    let first = series.transactions[0].price;
    if series.transactions.iter().all(|t| t.price == first) {
        return Err(FitError::NoPriceVariance);
    }

    let x: Vec<f64> = series.transactions.iter().map(|t| t.price.ln()).collect();
    let y: Vec<f64> = series
        .transactions
        .iter()
        .map(|t| (t.quantity as f64 + epsilon).ln())
        .collect();

    let var_x = x.iter().variance();
    if !var_x.is_finite() {
        return Err(FitError::NonFinite);
    }
    if var_x <= 0.0 {
        return Err(FitError::NoPriceVariance);
    }

    let elasticity = x.iter().covariance(y.iter()) / var_x;
    let intercept = y.iter().mean() - elasticity * x.iter().mean();

    if !(elasticity.is_finite() && intercept.is_finite()) {
        return Err(FitError::NonFinite);
    }
    Ok(ElasticityModel { elasticity, intercept })
}

/// Price at which the curve meets `expected_demand`, floored at the minimum
/// margin. `Ok(None)` when expected demand is not positive.
pub fn demand_price(model: &ElasticityModel, config: &PricingConfig) -> Result<Option<f64>, FitError> {
    if config.expected_demand <= 0.0 {
        return Ok(None);
    }
    if model.elasticity.abs() < FLAT_ELASTICITY {
        return Err(FitError::FlatElasticity(model.elasticity));
    }
    let theoretical = ((config.expected_demand.ln() - model.intercept) / model.elasticity).exp();
    if !theoretical.is_finite() {
        return Err(FitError::NonFinite);
    }
    Ok(Some(theoretical.max(config.margin_floor())))
}

/// Fit the curve and solve it for the configured expected demand.
pub fn estimate(series: &ProductSeries, config: &PricingConfig) -> ElasticityOutcome {
    let result = fit(series, config.quantity_epsilon)
        .and_then(|model| Ok((model, demand_price(&model, config)?)));
    match result {
        Ok((model, demand_price)) => ElasticityOutcome::Fitted { model, demand_price },
        Err(e) => ElasticityOutcome::Failed(e),
    }
}
