//! Daily sales series built from enriched transactions

use chrono::{Duration, NaiveDate};
use ndarray::Array1;
use polars::prelude::*;
use std::collections::BTreeMap;

use crate::data::COL_TOTAL_PRICE;
use crate::error::AnalysisError;
use crate::features::EnrichedTransaction;
use crate::frame::{date_from_code, enriched_frame, f64_values, i64_values, COL_DATE};
use crate::metric::Metric;

const DAILY_SALES: &str = "Daily Sales";

/// Seasonal period of the daily series (one week).
pub const WEEKLY_PERIOD: usize = 7;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DailySalesPoint {
    pub date: NaiveDate,
    pub total_sales: f64,
}

/// Sales per calendar date, sorted ascending by date.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DailySeries {
    points: Vec<DailySalesPoint>,
}

impl DailySeries {
    /// Sum `total_price` per date. When `fill_missing_dates` is set, every
    /// calendar date between the first and last sale is present, with 0.0
    /// for days without transactions.
    pub fn from_transactions(
        records: &[EnrichedTransaction],
        fill_missing_dates: bool,
    ) -> Result<Self, AnalysisError> {
        let sparse = aggregate_daily(records)?;
        if !fill_missing_dates {
            return Ok(Self { points: sparse });
        }

        let dense = densify(&sparse);
        let filled = dense.len() - sparse.len();
        if filled > 0 {
            tracing::warn!(filled, "filled calendar dates without sales with zero");
        }
        Ok(Self { points: dense })
    }

    /// Build from points in any order; duplicate dates are summed.
    pub fn from_points(points: impl IntoIterator<Item = DailySalesPoint>) -> Self {
        let totals = points
            .into_iter()
            .fold(BTreeMap::<NaiveDate, f64>::new(), |mut totals, point| {
                *totals.entry(point.date).or_insert(0.0) += point.total_sales;
                totals
            });
        Self {
            points: to_points(totals),
        }
    }

    pub fn points(&self) -> &[DailySalesPoint] {
        &self.points
    }

    pub fn values(&self) -> Array1<f64> {
        self.points.iter().map(|p| p.total_sales).collect()
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.points.iter().map(|p| p.date).collect()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.points.first().map(|p| p.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.points.last().map(|p| p.date)
    }

    pub fn mean(&self) -> Metric {
        Metric::mean(self.points.iter().map(|p| p.total_sales))
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Sum of sales per date present in the data, ascending by date.
pub fn aggregate_daily(records: &[EnrichedTransaction]) -> Result<Vec<DailySalesPoint>, AnalysisError> {
    if records.is_empty() {
        return Ok(Vec::new());
    }

    let daily = enriched_frame(records)?
        .lazy()
        .group_by([col(COL_DATE)])
        .agg([col(COL_TOTAL_PRICE).sum().alias(DAILY_SALES)])
        .collect()?;

    let days = i64_values(&daily, COL_DATE)?;
    let sales = f64_values(&daily, DAILY_SALES)?;

    let mut points = days
        .into_iter()
        .zip(sales)
        .map(|(day, total_sales)| {
            Ok(DailySalesPoint {
                date: date_from_code(day)?,
                total_sales,
            })
        })
        .collect::<Result<Vec<_>, AnalysisError>>()?;
    points.sort_by_key(|p| p.date);
    Ok(points)
}

/// Insert a zero-sales point for every missing date between the first and
/// last point. Input must be sorted ascending by date.
pub fn densify(points: &[DailySalesPoint]) -> Vec<DailySalesPoint> {
    let (Some(first), Some(last)) = (points.first(), points.last()) else {
        return Vec::new();
    };

    let by_date: BTreeMap<NaiveDate, f64> =
        points.iter().map(|p| (p.date, p.total_sales)).collect();
    let days = (last.date - first.date).num_days();

    (0..=days)
        .map(|offset| {
            let date = first.date + Duration::days(offset);
            DailySalesPoint {
                date,
                total_sales: by_date.get(&date).copied().unwrap_or(0.0),
            }
        })
        .collect()
}

fn to_points(totals: BTreeMap<NaiveDate, f64>) -> Vec<DailySalesPoint> {
    totals
        .into_iter()
        .map(|(date, total_sales)| DailySalesPoint { date, total_sales })
        .collect()
}
