//! # Sales Forecast
//!
//! A Rust library for forecasting daily sales per product category with an
//! ensemble of two independently trained models:
//!
//! - a gradient-boosted tree regressor over 25 engineered calendar, lag,
//!   rolling, momentum, and interaction features, and
//! - one additive Holt-Winters smoother per category capturing trend and
//!   weekly seasonality directly from the raw series.
//!
//! At inference time the boosting leg is rolled forward day by day (each
//! step's prediction feeds the next step's lag and rolling features), the
//! two legs are blended 60/40, clipped to non-negative, and wrapped in
//! confidence bounds derived from per-category residual dispersion.
//!
//! ## Quick Start
//!
//! ```no_run
//! use sales_forecast::config::ForecastConfig;
//! use sales_forecast::data::DataLoader;
//! use sales_forecast::ensemble::{EnsembleForecastModel, TimePeriod};
//!
//! # fn main() -> sales_forecast::Result<()> {
//! // Load the raw {date, category, sales, revenue} table
//! let table = DataLoader::from_csv("sales.csv")?;
//!
//! // Train both legs of the ensemble
//! let mut model = EnsembleForecastModel::new(ForecastConfig::default());
//! let report = model.train(&table)?;
//! println!("validation R²: {:.3}", report.boosting.validation_r2);
//!
//! // Forecast the next week for one category
//! let forecasts = model.predict(&["Electronics".to_string()], TimePeriod::Week, None)?;
//! for point in &forecasts["Electronics"] {
//!     println!("{}: {} [{}, {}]",
//!         point.date, point.predicted_sales,
//!         point.confidence_lower, point.confidence_upper);
//! }
//!
//! // Persist the trained state as one versioned bundle
//! model.save("models/ensemble.json")?;
//! let reloaded = EnsembleForecastModel::load("models/ensemble.json")?;
//! assert!(reloaded.is_trained());
//! # Ok(())
//! # }
//! ```

pub mod bundle;
pub mod config;
pub mod data;
pub mod ensemble;
pub mod error;
pub mod features;
pub mod metrics;
pub mod models;
pub mod rolling;

// Re-export commonly used types
pub use crate::config::ForecastConfig;
pub use crate::data::{DataLoader, SalesRecord, SalesTable};
pub use crate::ensemble::{
    EnsembleForecastModel, ForecastPoint, ForecastRequest, ModelMetadata, TimePeriod,
    TrainingReport,
};
pub use crate::error::{ForecastError, Result};
pub use crate::features::CategoryEncoding;

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
