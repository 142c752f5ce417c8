//! End-to-end analysis: featurize, segment, decompose, forecast, aggregate

use crate::aggregate::{breakdowns, overall_metrics, Breakdown, OverallMetrics};
use crate::config::AnalysisConfig;
use crate::data::Transaction;
use crate::decompose::{decompose, Decomposition};
use crate::error::AnalysisError;
use crate::features::featurize;
use crate::forecast::{forecast_sales, SalesForecast};
use crate::segment::{segment_counts, segment_customers, CustomerProfile, Segment};
use crate::series::{DailySeries, WEEKLY_PERIOD};

/// Everything one analysis run produces.
///
/// Decomposition and forecasting fail independently of the other stages;
/// their outcome is kept as a `Result` so callers can report what is missing.
#[derive(Debug, Clone)]
pub struct SalesReport {
    pub overall: OverallMetrics,
    pub breakdowns: Vec<Breakdown>,
    pub customers: Vec<CustomerProfile>,
    pub segment_counts: Vec<(Segment, usize)>,
    /// Daily series the decomposition and forecast were computed on.
    pub history: DailySeries,
    pub decomposition: Result<Decomposition, AnalysisError>,
    pub forecast: Result<SalesForecast, AnalysisError>,
}

impl SalesReport {
    /// True when every stage produced output.
    pub fn is_complete(&self) -> bool {
        self.decomposition.is_ok() && self.forecast.is_ok()
    }

    pub fn stage_failures(&self) -> Vec<&AnalysisError> {
        [self.decomposition.as_ref().err(), self.forecast.as_ref().err()]
            .into_iter()
            .flatten()
            .collect()
    }

    pub fn forecast(&self) -> Option<&SalesForecast> {
        self.forecast.as_ref().ok()
    }

    pub fn decomposition(&self) -> Option<&Decomposition> {
        self.decomposition.as_ref().ok()
    }
}

/// Run every stage over `transactions`.
///
/// Schema and configuration errors abort the run. A series too short for
/// decomposition or forecasting only fails that stage.
pub fn run_analysis(
    transactions: &[Transaction],
    config: &AnalysisConfig,
) -> Result<SalesReport, AnalysisError> {
    config.validate()?;

    let records = featurize(transactions, &config.time_blocks, &config.peaks)?;
    let customers = segment_customers(&records, &config.segments)?;
    let counts = segment_counts(&customers);

    let history = DailySeries::from_transactions(&records, config.forecast.fill_missing_dates)?;
    tracing::info!(
        transactions = records.len(),
        customers = customers.len(),
        days = history.len(),
        "prepared daily sales series"
    );

    let decomposition = stage_outcome(decompose(&history, WEEKLY_PERIOD))?;
    let forecast = stage_outcome(forecast_sales(
        &history,
        WEEKLY_PERIOD,
        config.forecast.horizon_days,
    ))?;

    let overall = overall_metrics(&records, &customers, &history, forecast.as_ref().ok());
    let breakdowns = breakdowns(&records)?;

    Ok(SalesReport {
        overall,
        breakdowns,
        customers,
        segment_counts: counts,
        history,
        decomposition,
        forecast,
    })
}

/// Keep insufficient-data failures as the stage's outcome; propagate the rest.
fn stage_outcome<T>(
    result: Result<T, AnalysisError>,
) -> Result<Result<T, AnalysisError>, AnalysisError> {
    match result {
        Err(err) if err.is_insufficient_data() => {
            tracing::warn!(%err, "stage skipped");
            Ok(Err(err))
        }
        Err(err) => Err(err),
        Ok(value) => Ok(Ok(value)),
    }
}
