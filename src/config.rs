//! Analyzer configuration.
//!
//! Loaded from a TOML file with environment variable overrides. Every pricing
//! constant lives in [`PricingConfig`], which is passed by reference into the
//! components that need it.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

pub use crate::error::ConfigError;

/// Constants driving the price recommendation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingConfig {
    /// Published price at which predicted quantity is reported
    pub target_price: f64,
    /// Tolerance fractions around the competitor price, swept in order
    pub deltas: Vec<f64>,
    /// Minimum cleaned rows required to analyse a product
    pub min_days: usize,
    pub competitor_price: f64,
    /// Demand the demand-target price is solved for; <= 0 disables it
    pub expected_demand: f64,
    pub outlier_iqr_multiplier: f64,
    /// Profit haircut for prices outside the historical [Q1, Q3] band
    pub outlier_penalty: f64,
    /// Minimum markup over unit cost
    pub min_margin: f64,
    /// Hard cap on distance from the competitor price
    pub max_competitor_deviation: f64,
    pub unit_cost: f64,
    /// Exclusive lower bound of a plausible price
    pub price_floor: f64,
    /// Exclusive upper bound of a plausible price
    pub price_ceiling: f64,
    /// Added to quantities before taking logs
    pub quantity_epsilon: f64,
    /// Analyse products on the rayon pool
    pub parallel: bool,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            target_price: 29_000.0,
            deltas: vec![0.05, 0.06, 0.07, 0.08, 0.09, 0.10],
            min_days: 3,
            competitor_price: 28_500.0,
            expected_demand: 7.0,
            outlier_iqr_multiplier: 1.5,
            outlier_penalty: 0.3,
            min_margin: 0.10,
            max_competitor_deviation: 0.2,
            unit_cost: 20_000.0,
            price_floor: 27_000.0,
            price_ceiling: 39_000.0,
            quantity_epsilon: 0.001,
            parallel: false,
        }
    }
}

impl PricingConfig {
    /// Lowest price that still meets the margin floor.
    pub fn margin_floor(&self) -> f64 {
        self.unit_cost * (1.0 + self.min_margin)
    }

    fn validate_into(&self, errors: &mut Vec<String>) {
        if self.deltas.is_empty() {
            errors.push("deltas must contain at least one value".to_string());
        }
        for delta in &self.deltas {
            if !(*delta > 0.0 && *delta < 1.0) {
                errors.push(format!("delta {} must lie in (0, 1)", delta));
            }
        }
        if self.min_days == 0 {
            errors.push("min_days must be greater than 0".to_string());
        }
        for (name, value) in [
            ("target_price", self.target_price),
            ("competitor_price", self.competitor_price),
            ("unit_cost", self.unit_cost),
            ("quantity_epsilon", self.quantity_epsilon),
        ] {
            if !(value.is_finite() && value > 0.0) {
                errors.push(format!("{} must be positive, got {}", name, value));
            }
        }
        for (name, value) in [
            ("outlier_penalty", self.outlier_penalty),
            ("min_margin", self.min_margin),
            ("max_competitor_deviation", self.max_competitor_deviation),
        ] {
            if !(0.0..1.0).contains(&value) {
                errors.push(format!("{} must lie in [0, 1), got {}", name, value));
            }
        }
        if !(self.outlier_iqr_multiplier.is_finite() && self.outlier_iqr_multiplier >= 0.0) {
            errors.push(format!(
                "outlier_iqr_multiplier must be non-negative, got {}",
                self.outlier_iqr_multiplier
            ));
        }
        if !self.expected_demand.is_finite() {
            errors.push("expected_demand must be finite".to_string());
        }
        if !(self.price_floor < self.price_ceiling) {
            errors.push(format!(
                "price_floor {} must be below price_ceiling {}",
                self.price_floor, self.price_ceiling
            ));
        }
    }
}

/// Supported input table sources
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum InputFormat {
    #[default]
    Csv,
    Sqlite,
}

/// Supported result table sinks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Csv,
    Json,
    Sqlite,
}

/// Header names of the four columns the analyzer reads
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnMap {
    pub date: String,
    pub part_number: String,
    pub price: String,
    pub quantity: String,
}

impl Default for ColumnMap {
    fn default() -> Self {
        Self {
            date: "date".to_string(),
            part_number: "part_number".to_string(),
            price: "price".to_string(),
            quantity: "quantity".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    pub path: PathBuf,
    pub format: InputFormat,
    /// Table (sheet) name for SQLite inputs
    pub table: String,
    pub columns: ColumnMap,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("transactions.csv"),
            format: InputFormat::Csv,
            table: "BASE_MODELOS".to_string(),
            columns: ColumnMap::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub path: PathBuf,
    pub format: OutputFormat,
    /// Table name for SQLite outputs
    pub table: String,
    /// Per-product chart data is written here when set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub charts_dir: Option<PathBuf>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("recommendations.csv"),
            format: OutputFormat::Csv,
            table: "recommendations".to_string(),
            charts_dir: None,
        }
    }
}

/// Top-level configuration file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    pub log_level: String,
    pub pricing: PricingConfig,
    pub input: InputConfig,
    pub output: OutputConfig,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            pricing: PricingConfig::default(),
            input: InputConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

impl AnalyzerConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Ok(toml::from_str(&content)?)
    }

    /// Load from `path` if it exists, otherwise start from defaults
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            debug!(path = %path.display(), "config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Apply `PRICE_ANALYZER_*` environment variable overrides
    pub fn with_env_override(mut self) -> Self {
        if let Ok(level) = std::env::var("PRICE_ANALYZER_LOG_LEVEL") {
            self.log_level = level;
        }
        if let Ok(path) = std::env::var("PRICE_ANALYZER_INPUT") {
            self.input.path = PathBuf::from(path);
        }
        if let Ok(path) = std::env::var("PRICE_ANALYZER_OUTPUT") {
            self.output.path = PathBuf::from(path);
        }
        if let Some(v) = env_f64("PRICE_ANALYZER_COMPETITOR_PRICE") {
            self.pricing.competitor_price = v;
        }
        if let Some(v) = env_f64("PRICE_ANALYZER_UNIT_COST") {
            self.pricing.unit_cost = v;
        }
        if let Some(v) = env_f64("PRICE_ANALYZER_EXPECTED_DEMAND") {
            self.pricing.expected_demand = v;
        }
        self
    }

    /// Validate the configuration, collecting every problem
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&self.log_level.to_lowercase().as_str()) {
            errors.push(format!(
                "Invalid log_level '{}'. Valid values: {:?}",
                self.log_level, valid_log_levels
            ));
        }

        self.pricing.validate_into(&mut errors);

        if self.input.table.trim().is_empty() {
            errors.push("input.table cannot be empty".to_string());
        }
        if self.output.table.trim().is_empty() {
            errors.push("output.table cannot be empty".to_string());
        }
        let cols = &self.input.columns;
        for (name, value) in [
            ("date", &cols.date),
            ("part_number", &cols.part_number),
            ("price", &cols.price),
            ("quantity", &cols.quantity),
        ] {
            if value.trim().is_empty() {
                errors.push(format!("input.columns.{} cannot be empty", name));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }
}

fn env_f64(key: &str) -> Option<f64> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}
