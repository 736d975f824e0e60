//! Error types for loading, pricing and writing.

use thiserror::Error;

/// Configuration error type
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation errors: {}", .0.join("; "))]
    Validation(Vec<String>),
}

/// Input table could not be read
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Missing column '{0}' in input header")]
    MissingColumn(String),
}

/// Output table could not be written
#[derive(Debug, Error)]
pub enum WriteError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Why a demand curve could not be fitted or inverted
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FitError {
    #[error("need at least 2 observations, got {0}")]
    TooFewPoints(usize),

    #[error("all observed prices are identical")]
    NoPriceVariance,

    #[error("elasticity {0:e} is too close to zero to invert")]
    FlatElasticity(f64),

    #[error("fit produced a non-finite value")]
    NonFinite,
}

/// A single (delta, product) pair failed and was skipped
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PricingError {
    #[error("no quartiles for product {0}")]
    NoQuartiles(String),

    #[error("competitor band [{lower}, {upper}] is not finite")]
    InvalidBand { lower: f64, upper: f64 },

    #[error("adjusted price {0} is not finite")]
    NonFinitePrice(f64),
}
