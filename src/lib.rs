//! Price recommendation from historical transactions.
//!
//! Three strategies per part number: the historically most profitable price,
//! a competitor-anchored price held inside a tolerance band, and a price
//! solved from a fitted log-log demand curve. [`sweep::run_sweep`] runs them
//! for every tolerance delta and product.

pub mod charts;
pub mod cleaner;
pub mod config;
pub mod elasticity;
pub mod error;
pub mod loader;
pub mod model;
pub mod outliers;
pub mod profit;
pub mod stats;
pub mod sweep;
pub mod ui;
pub mod writer;

pub use config::{AnalyzerConfig, PricingConfig};
pub use model::{PriceRecommendation, ProductChart};
pub use sweep::{run_sweep, SweepReport};
