//! Cafe Insights: point-of-sale analytics for small retail businesses
//!
//! This library turns raw transaction records into time-of-day features,
//! RFM customer segments, a weekly seasonal decomposition of daily sales and
//! an additive Holt-Winters forecast, summarised as KPI and breakdown tables.

pub mod aggregate;
pub mod cli;
pub mod config;
pub mod data;
pub mod decompose;
pub mod error;
pub mod features;
pub mod forecast;
pub mod frame;
pub mod metric;
pub mod pipeline;
pub mod report;
pub mod segment;
pub mod series;
pub mod viz;

// Re-export public items for easier access
pub use aggregate::{breakdowns, overall_metrics, Breakdown, Dimension, OverallMetrics};
pub use cli::Args;
pub use config::AnalysisConfig;
pub use data::{load_transactions, Transaction};
pub use decompose::{decompose, Decomposition};
pub use error::{AnalysisError, SchemaError};
pub use features::{featurize, EnrichedTransaction, Seasonality, TimeBlock};
pub use forecast::{forecast_sales, HoltWinters, SalesForecast, SmoothingParams};
pub use metric::Metric;
pub use pipeline::{run_analysis, SalesReport};
pub use report::write_report;
pub use segment::{assign_segment, segment_customers, CustomerProfile, Segment};
pub use series::{DailySeries, WEEKLY_PERIOD};
pub use viz::{create_decomposition_plot, create_forecast_plot};

/// Common result type used at the I/O edges of the application
pub type Result<T> = anyhow::Result<T>;
