//! Polars view of enriched transactions for the grouping stages

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use polars::prelude::*;

use crate::data::{COL_CATEGORY, COL_LOCATION, COL_TOTAL_PRICE, COL_TRANSACTION_ID};
use crate::error::AnalysisError;
use crate::features::EnrichedTransaction;

/// Microseconds since the Unix epoch.
pub const COL_TIMESTAMP_MICROS: &str = "Timestamp";
/// Days since 0001-01-01 (chrono's `num_days_from_ce`).
pub const COL_DATE: &str = "Date";
pub const COL_HOUR: &str = "Hour";
/// Position of the block in `TimeBlock::ALL`.
pub const COL_TIME_BLOCK: &str = "Time Block";
/// Position of the window in `Seasonality::ALL`.
pub const COL_SEASONALITY: &str = "Seasonality";
/// Month number, 1 to 12.
pub const COL_MONTH: &str = "Month";

pub const MICROS_PER_DAY: i64 = 86_400_000_000;

/// Build one row per enriched transaction.
///
/// Temporal fields are stored as integer codes so they group and sort in
/// their natural order; the decoders below map them back.
pub fn enriched_frame(records: &[EnrichedTransaction]) -> PolarsResult<DataFrame> {
    let ids: Vec<&str> = records.iter().map(|r| r.transaction_id.as_str()).collect();
    let prices: Vec<f64> = records.iter().map(|r| r.total_price).collect();
    let timestamps: Vec<i64> = records
        .iter()
        .map(|r| r.timestamp.and_utc().timestamp_micros())
        .collect();
    let dates: Vec<i32> = records.iter().map(|r| r.date.num_days_from_ce()).collect();
    let hours: Vec<u32> = records.iter().map(|r| r.hour).collect();
    let blocks: Vec<u32> = records.iter().map(|r| r.time_block as u32).collect();
    let windows: Vec<u32> = records.iter().map(|r| r.seasonality as u32).collect();
    let months: Vec<u32> = records.iter().map(|r| r.month.number_from_month()).collect();
    let categories: Vec<&str> = records.iter().map(|r| r.category.as_str()).collect();
    let locations: Vec<&str> = records.iter().map(|r| r.location.as_str()).collect();

    DataFrame::new(vec![
        Series::new(COL_TRANSACTION_ID, ids),
        Series::new(COL_TOTAL_PRICE, prices),
        Series::new(COL_TIMESTAMP_MICROS, timestamps),
        Series::new(COL_DATE, dates),
        Series::new(COL_HOUR, hours),
        Series::new(COL_TIME_BLOCK, blocks),
        Series::new(COL_SEASONALITY, windows),
        Series::new(COL_MONTH, months),
        Series::new(COL_CATEGORY, categories),
        Series::new(COL_LOCATION, locations),
    ])
}

pub(crate) fn f64_values(df: &DataFrame, name: &str) -> PolarsResult<Vec<f64>> {
    Ok(df
        .column(name)?
        .cast(&DataType::Float64)?
        .f64()?
        .into_no_null_iter()
        .collect())
}

pub(crate) fn i64_values(df: &DataFrame, name: &str) -> PolarsResult<Vec<i64>> {
    Ok(df
        .column(name)?
        .cast(&DataType::Int64)?
        .i64()?
        .into_no_null_iter()
        .collect())
}

pub(crate) fn str_values(df: &DataFrame, name: &str) -> PolarsResult<Vec<String>> {
    Ok(df
        .column(name)?
        .str()?
        .into_no_null_iter()
        .map(str::to_string)
        .collect())
}

pub(crate) fn date_from_code(days: i64) -> Result<NaiveDate, AnalysisError> {
    i32::try_from(days)
        .ok()
        .and_then(NaiveDate::from_num_days_from_ce_opt)
        .ok_or_else(|| AnalysisError::Frame(format!("day number {} is out of range", days)))
}

pub(crate) fn datetime_from_micros(micros: i64) -> Result<NaiveDateTime, AnalysisError> {
    DateTime::from_timestamp_micros(micros)
        .map(|dt| dt.naive_utc())
        .ok_or_else(|| AnalysisError::Frame(format!("timestamp {} is out of range", micros)))
}
