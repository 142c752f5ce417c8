//! Summary KPIs and per-dimension sales breakdowns

use chrono::Month;
use polars::prelude::*;
use std::fmt;

use crate::data::{COL_CATEGORY, COL_LOCATION, COL_TOTAL_PRICE};
use crate::error::AnalysisError;
use crate::features::{EnrichedTransaction, Seasonality, TimeBlock};
use crate::frame::{
    enriched_frame, f64_values, i64_values, str_values, COL_HOUR, COL_MONTH, COL_SEASONALITY,
    COL_TIME_BLOCK,
};
use crate::forecast::SalesForecast;
use crate::metric::Metric;
use crate::segment::CustomerProfile;
use crate::series::DailySeries;

/// Headline numbers for one analysis run.
#[derive(Debug, Clone, PartialEq)]
pub struct OverallMetrics {
    pub total_sales: f64,
    /// One order per transaction row.
    pub order_count: usize,
    pub average_order_value: Metric,
    pub total_items_sold: u64,
    pub customer_count: usize,
    pub average_customer_age_days: Metric,
    /// `None` when the forecast stage did not run to completion.
    pub forecast_confidence_pct: Option<Metric>,
    pub expected_sales_growth_pct: Option<Metric>,
}

impl OverallMetrics {
    /// Display rows as (metric, formatted value) pairs.
    pub fn to_rows(&self) -> Vec<(&'static str, String)> {
        let percent = |value: Option<Metric>| match value {
            Some(Metric::Defined(v)) => format!("{:.1}%", v),
            Some(Metric::Undefined) => Metric::Undefined.to_string(),
            None => "unavailable".to_string(),
        };

        vec![
            ("Total Sales", format_currency(self.total_sales)),
            ("Total Orders", self.order_count.to_string()),
            (
                "Average Order Value",
                self.average_order_value
                    .value()
                    .map(format_currency)
                    .unwrap_or_else(|| Metric::Undefined.to_string()),
            ),
            ("Total Items Sold", self.total_items_sold.to_string()),
            ("Total Customers", self.customer_count.to_string()),
            (
                "Average Customer Lifetime (days)",
                format!("{:.1}", self.average_customer_age_days),
            ),
            ("Forecast Accuracy", percent(self.forecast_confidence_pct)),
            ("Expected Sales Growth", percent(self.expected_sales_growth_pct)),
        ]
    }
}

/// Combine records, profiles and the forecast into the headline metrics.
///
/// `history` must be the series the forecast was fitted on, so growth
/// compares like with like.
pub fn overall_metrics(
    records: &[EnrichedTransaction],
    customers: &[CustomerProfile],
    history: &DailySeries,
    forecast: Option<&SalesForecast>,
) -> OverallMetrics {
    let total_sales: f64 = records.iter().map(|r| r.total_price).sum();
    let order_count = records.len();

    OverallMetrics {
        total_sales,
        order_count,
        average_order_value: Metric::ratio(total_sales, order_count as f64),
        total_items_sold: records.iter().map(|r| r.quantity).sum(),
        customer_count: customers.len(),
        average_customer_age_days: Metric::mean(
            customers.iter().map(|c| c.customer_age_days as f64),
        ),
        forecast_confidence_pct: forecast.map(|f| f.metrics.confidence_pct()),
        expected_sales_growth_pct: forecast
            .map(|f| expected_growth_pct(f.mean_forecast(), history.mean())),
    }
}

/// `(mean forecast / mean history - 1) * 100`.
pub fn expected_growth_pct(forecast_mean: Metric, history_mean: Metric) -> Metric {
    match (forecast_mean, history_mean) {
        (Metric::Defined(forecast), Metric::Defined(history)) => {
            Metric::ratio(forecast, history).map(|r| (r - 1.0) * 100.0)
        }
        _ => Metric::Undefined,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dimension {
    Hour,
    TimeBlock,
    Seasonality,
    Month,
    Category,
    Location,
}

impl Dimension {
    pub const ALL: [Dimension; 6] = [
        Dimension::Hour,
        Dimension::TimeBlock,
        Dimension::Seasonality,
        Dimension::Month,
        Dimension::Category,
        Dimension::Location,
    ];

    /// Column header for the grouping key.
    pub fn as_str(self) -> &'static str {
        match self {
            Dimension::Hour => "Hour",
            Dimension::TimeBlock => "Time Block",
            Dimension::Seasonality => "Seasonality",
            Dimension::Month => "Month",
            Dimension::Category => "Category",
            Dimension::Location => "Location",
        }
    }

    /// Snake-case name used for output file names.
    pub fn slug(self) -> &'static str {
        match self {
            Dimension::Hour => "hour",
            Dimension::TimeBlock => "time_block",
            Dimension::Seasonality => "seasonality",
            Dimension::Month => "month",
            Dimension::Category => "category",
            Dimension::Location => "location",
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BreakdownRow {
    pub key: String,
    pub total_sales: f64,
    pub order_count: usize,
    pub average_order_value: Metric,
}

/// Sales grouped by one dimension. Rows follow the natural order of the key:
/// hour of day, block and peak order, calendar month, or name.
#[derive(Debug, Clone, PartialEq)]
pub struct Breakdown {
    pub dimension: Dimension,
    pub rows: Vec<BreakdownRow>,
}

impl Breakdown {
    pub fn row(&self, key: &str) -> Option<&BreakdownRow> {
        self.rows.iter().find(|r| r.key == key)
    }

    pub fn total_sales(&self) -> f64 {
        self.rows.iter().map(|r| r.total_sales).sum()
    }
}

const TOTAL_SALES: &str = "Total Sales";
const ORDER_COUNT: &str = "Order Count";

pub fn breakdown(
    records: &[EnrichedTransaction],
    dimension: Dimension,
) -> Result<Breakdown, AnalysisError> {
    if records.is_empty() {
        return Ok(Breakdown {
            dimension,
            rows: Vec::new(),
        });
    }
    group_sales(&enriched_frame(records)?, dimension)
}

/// One breakdown per dimension, in [`Dimension::ALL`] order.
pub fn breakdowns(records: &[EnrichedTransaction]) -> Result<Vec<Breakdown>, AnalysisError> {
    if records.is_empty() {
        return Dimension::ALL
            .iter()
            .map(|&dimension| breakdown(records, dimension))
            .collect();
    }

    let df = enriched_frame(records)?;
    Dimension::ALL
        .iter()
        .map(|&dimension| group_sales(&df, dimension))
        .collect()
}

fn frame_column(dimension: Dimension) -> &'static str {
    match dimension {
        Dimension::Hour => COL_HOUR,
        Dimension::TimeBlock => COL_TIME_BLOCK,
        Dimension::Seasonality => COL_SEASONALITY,
        Dimension::Month => COL_MONTH,
        Dimension::Category => COL_CATEGORY,
        Dimension::Location => COL_LOCATION,
    }
}

fn group_sales(df: &DataFrame, dimension: Dimension) -> Result<Breakdown, AnalysisError> {
    let key = frame_column(dimension);
    let groups = df
        .clone()
        .lazy()
        .group_by([col(key)])
        .agg([
            col(COL_TOTAL_PRICE).sum().alias(TOTAL_SALES),
            col(COL_TOTAL_PRICE).count().alias(ORDER_COUNT),
        ])
        .collect()?;

    let sales = f64_values(&groups, TOTAL_SALES)?;
    let orders = i64_values(&groups, ORDER_COUNT)?;

    // Temporal keys are integer codes and sort numerically; names sort as text.
    let keys: Vec<(i64, String)> = match dimension {
        Dimension::Category | Dimension::Location => str_values(&groups, key)?
            .into_iter()
            .map(|name| (0, name))
            .collect(),
        _ => i64_values(&groups, key)?
            .into_iter()
            .map(|code| Ok((code, code_label(dimension, code)?)))
            .collect::<Result<_, AnalysisError>>()?,
    };

    let mut rows: Vec<((i64, String), BreakdownRow)> = keys
        .into_iter()
        .zip(sales.into_iter().zip(orders))
        .map(|(sort_key, (total_sales, order_count))| {
            let row = BreakdownRow {
                key: sort_key.1.clone(),
                total_sales,
                order_count: order_count as usize,
                average_order_value: Metric::ratio(total_sales, order_count as f64),
            };
            (sort_key, row)
        })
        .collect();
    rows.sort_by(|a, b| a.0.cmp(&b.0));

    Ok(Breakdown {
        dimension,
        rows: rows.into_iter().map(|(_, row)| row).collect(),
    })
}

fn code_label(dimension: Dimension, code: i64) -> Result<String, AnalysisError> {
    let index = usize::try_from(code).ok();
    let label = match dimension {
        Dimension::Hour => Some(code.to_string()),
        Dimension::TimeBlock => index
            .and_then(|i| TimeBlock::ALL.get(i))
            .map(|b| b.as_str().to_string()),
        Dimension::Seasonality => index
            .and_then(|i| Seasonality::ALL.get(i))
            .map(|s| s.as_str().to_string()),
        Dimension::Month => u8::try_from(code)
            .ok()
            .and_then(|m| Month::try_from(m).ok())
            .map(|m| m.name().to_string()),
        Dimension::Category | Dimension::Location => None,
    };
    label.ok_or_else(|| AnalysisError::Frame(format!("unknown {} code {}", dimension, code)))
}

/// Format as dollars with thousands separators, e.g. `$1,234.56`.
pub fn format_currency(value: f64) -> String {
    let cents = (value.abs() * 100.0).round() as u64;
    let digits = (cents / 100).to_string();

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    let sign = if value < 0.0 && cents > 0 { "-" } else { "" };
    format!("{}${}.{:02}", sign, grouped, cents % 100)
}
