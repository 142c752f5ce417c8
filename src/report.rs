//! CSV output of the analysis tables using Polars

use polars::prelude::*;
use std::fs::{self, File};
use std::path::{Path, PathBuf};

use crate::aggregate::{Breakdown, OverallMetrics};
use crate::decompose::Decomposition;
use crate::forecast::SalesForecast;
use crate::pipeline::SalesReport;
use crate::segment::CustomerProfile;

pub const OVERALL_METRICS_FILE: &str = "overall_metrics.csv";
pub const CUSTOMER_METRICS_FILE: &str = "customer_metrics.csv";
pub const SALES_FORECAST_FILE: &str = "sales_forecast.csv";
pub const DECOMPOSITION_FILE: &str = "sales_decomposition.csv";

const DATE_FORMAT: &str = "%Y-%m-%d";
const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Write every available table of `report` into `output_dir`.
///
/// Tables of failed stages are skipped. Returns the written paths in the
/// order they were written.
pub fn write_report(
    report: &SalesReport,
    output_dir: impl AsRef<Path>,
) -> crate::Result<Vec<PathBuf>> {
    let output_dir = output_dir.as_ref();
    fs::create_dir_all(output_dir)?;

    let mut written = Vec::new();
    let mut write = |name: String, mut df: DataFrame| -> crate::Result<()> {
        let path = output_dir.join(name);
        write_csv(&mut df, &path)?;
        written.push(path);
        Ok(())
    };

    write(OVERALL_METRICS_FILE.to_string(), overall_metrics_frame(&report.overall)?)?;
    write(CUSTOMER_METRICS_FILE.to_string(), customer_metrics_frame(&report.customers)?)?;

    match &report.forecast {
        Ok(forecast) => write(SALES_FORECAST_FILE.to_string(), forecast_frame(forecast)?)?,
        Err(err) => tracing::warn!(%err, "no forecast table written"),
    }
    if let Ok(decomposition) = &report.decomposition {
        write(DECOMPOSITION_FILE.to_string(), decomposition_frame(decomposition)?)?;
    }

    for table in &report.breakdowns {
        let name = format!("sales_by_{}.csv", table.dimension.slug());
        write(name, breakdown_frame(table)?)?;
    }

    tracing::info!(files = written.len(), dir = %output_dir.display(), "wrote report tables");
    Ok(written)
}

fn write_csv(df: &mut DataFrame, path: &Path) -> crate::Result<()> {
    let mut file = File::create(path)?;
    CsvWriter::new(&mut file).include_header(true).finish(df)?;
    Ok(())
}

/// Two string columns, `Metric` and `Value`, with display formatting applied.
pub fn overall_metrics_frame(metrics: &OverallMetrics) -> PolarsResult<DataFrame> {
    let (names, values): (Vec<&str>, Vec<String>) = metrics.to_rows().into_iter().unzip();
    DataFrame::new(vec![Series::new("Metric", names), Series::new("Value", values)])
}

/// One row per customer. Undefined purchase frequencies are written as nulls.
pub fn customer_metrics_frame(customers: &[CustomerProfile]) -> PolarsResult<DataFrame> {
    let timestamps = |visit: fn(&CustomerProfile) -> chrono::NaiveDateTime| {
        customers
            .iter()
            .map(|c| visit(c).format(DATETIME_FORMAT).to_string())
            .collect::<Vec<_>>()
    };

    DataFrame::new(vec![
        Series::new(
            "Transaction ID",
            customers.iter().map(|c| c.transaction_id.as_str()).collect::<Vec<_>>(),
        ),
        Series::new(
            "Visit Count",
            customers.iter().map(|c| c.visit_count as u64).collect::<Vec<_>>(),
        ),
        Series::new(
            "Total Spent",
            customers.iter().map(|c| c.total_spent).collect::<Vec<_>>(),
        ),
        Series::new(
            "Average Order Value",
            customers.iter().map(|c| c.avg_order_value).collect::<Vec<_>>(),
        ),
        Series::new("First Visit", timestamps(|c| c.first_visit)),
        Series::new("Last Visit", timestamps(|c| c.last_visit)),
        Series::new(
            "Customer Age",
            customers.iter().map(|c| c.customer_age_days).collect::<Vec<_>>(),
        ),
        Series::new(
            "Purchase Frequency",
            customers
                .iter()
                .map(|c| c.purchase_frequency.value())
                .collect::<Vec<_>>(),
        ),
        Series::new(
            "Recency",
            customers.iter().map(|c| c.recency_days).collect::<Vec<_>>(),
        ),
        Series::new(
            "Customer Segment",
            customers.iter().map(|c| c.segment.as_str()).collect::<Vec<_>>(),
        ),
    ])
}

pub fn forecast_frame(forecast: &SalesForecast) -> PolarsResult<DataFrame> {
    let dates: Vec<String> = forecast
        .points
        .iter()
        .map(|p| p.date.format(DATE_FORMAT).to_string())
        .collect();
    let sales: Vec<f64> = forecast.points.iter().map(|p| p.forecasted_sales).collect();

    DataFrame::new(vec![
        Series::new("Date", dates),
        Series::new("Forecasted Sales", sales),
    ])
}

pub fn decomposition_frame(decomposition: &Decomposition) -> PolarsResult<DataFrame> {
    let dates: Vec<String> = decomposition
        .dates
        .iter()
        .map(|d| d.format(DATE_FORMAT).to_string())
        .collect();

    DataFrame::new(vec![
        Series::new("Date", dates),
        Series::new("Observed", decomposition.observed.to_vec()),
        Series::new("Trend", decomposition.trend.to_vec()),
        Series::new("Seasonal", decomposition.seasonal.to_vec()),
        Series::new("Residual", decomposition.residual.to_vec()),
    ])
}

/// Key column named after the dimension, then sales, orders and average.
pub fn breakdown_frame(table: &Breakdown) -> PolarsResult<DataFrame> {
    let rows = &table.rows;
    DataFrame::new(vec![
        Series::new(
            table.dimension.as_str(),
            rows.iter().map(|r| r.key.clone()).collect::<Vec<_>>(),
        ),
        Series::new(
            "Total Sales",
            rows.iter().map(|r| r.total_sales).collect::<Vec<_>>(),
        ),
        Series::new(
            "Order Count",
            rows.iter().map(|r| r.order_count as u64).collect::<Vec<_>>(),
        ),
        Series::new(
            "Average Order Value",
            rows.iter()
                .map(|r| r.average_order_value.value())
                .collect::<Vec<_>>(),
        ),
    ])
}
