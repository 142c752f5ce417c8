//! RFM customer segmentation over transaction groups

use chrono::NaiveDateTime;
use polars::prelude::*;
use std::fmt;

use crate::config::SegmentThresholds;
use crate::data::{COL_TOTAL_PRICE, COL_TRANSACTION_ID};
use crate::error::{AnalysisError, SchemaError};
use crate::features::EnrichedTransaction;
use crate::frame::{
    datetime_from_micros, enriched_frame, f64_values, i64_values, str_values,
    COL_TIMESTAMP_MICROS,
};
use crate::metric::Metric;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Segment {
    Loyal,
    Regular,
    Recent,
    Churned,
}

impl Segment {
    pub const ALL: [Segment; 4] = [
        Segment::Loyal,
        Segment::Regular,
        Segment::Recent,
        Segment::Churned,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Segment::Loyal => "Loyal",
            Segment::Regular => "Regular",
            Segment::Recent => "Recent",
            Segment::Churned => "Churned",
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Aggregated purchase history of one transaction group.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomerProfile {
    pub transaction_id: String,
    pub visit_count: usize,
    pub total_spent: f64,
    pub avg_order_value: f64,
    pub first_visit: NaiveDateTime,
    pub last_visit: NaiveDateTime,
    /// Whole days between first and last visit; 0 for a single visit.
    pub customer_age_days: i64,
    /// Visits per day of customer age; undefined when the age is 0.
    pub purchase_frequency: Metric,
    /// Whole days from the last visit to the newest timestamp in the dataset.
    pub recency_days: i64,
    pub segment: Segment,
}

/// Assign a segment; rules are checked in order and the first match wins.
///
/// An undefined frequency fails both frequency rules, leaving recency alone
/// to decide between `Recent` and `Churned`.
pub fn assign_segment(
    recency_days: i64,
    purchase_frequency: Metric,
    thresholds: &SegmentThresholds,
) -> Segment {
    if recency_days <= thresholds.loyal_max_recency_days
        && purchase_frequency.at_least(thresholds.loyal_min_frequency)
    {
        Segment::Loyal
    } else if recency_days <= thresholds.regular_max_recency_days
        && purchase_frequency.at_least(thresholds.regular_min_frequency)
    {
        Segment::Regular
    } else if recency_days <= thresholds.recent_max_recency_days {
        Segment::Recent
    } else {
        Segment::Churned
    }
}

const VISIT_COUNT: &str = "Visit Count";
const TOTAL_SPENT: &str = "Total Spent";
const AVG_ORDER_VALUE: &str = "Average Order Value";
const FIRST_VISIT: &str = "First Visit";
const LAST_VISIT: &str = "Last Visit";

/// Build one profile per distinct transaction ID, ordered by ID.
///
/// Recency is measured against the newest timestamp of the whole input, so
/// every profile has `recency_days >= 0`.
pub fn segment_customers(
    records: &[EnrichedTransaction],
    thresholds: &SegmentThresholds,
) -> Result<Vec<CustomerProfile>, AnalysisError> {
    if let Some(row) = records
        .iter()
        .position(|r| r.transaction_id.trim().is_empty())
    {
        return Err(SchemaError::MissingValue {
            row,
            column: COL_TRANSACTION_ID.to_string(),
        }
        .into());
    }

    let Some(reference) = records.iter().map(|r| r.timestamp).max() else {
        return Ok(Vec::new());
    };

    // Per-customer RFM inputs
    let groups = enriched_frame(records)?
        .lazy()
        .group_by([col(COL_TRANSACTION_ID)])
        .agg([
            col(COL_TOTAL_PRICE).count().alias(VISIT_COUNT),
            col(COL_TOTAL_PRICE).sum().alias(TOTAL_SPENT),
            col(COL_TOTAL_PRICE).mean().alias(AVG_ORDER_VALUE),
            col(COL_TIMESTAMP_MICROS).min().alias(FIRST_VISIT),
            col(COL_TIMESTAMP_MICROS).max().alias(LAST_VISIT),
        ])
        .collect()?;

    let ids = str_values(&groups, COL_TRANSACTION_ID)?;
    let visits = i64_values(&groups, VISIT_COUNT)?;
    let spent = f64_values(&groups, TOTAL_SPENT)?;
    let averages = f64_values(&groups, AVG_ORDER_VALUE)?;
    let firsts = i64_values(&groups, FIRST_VISIT)?;
    let lasts = i64_values(&groups, LAST_VISIT)?;

    let mut profiles = Vec::with_capacity(groups.height());
    for (i, transaction_id) in ids.into_iter().enumerate() {
        let first_visit = datetime_from_micros(firsts[i])?;
        let last_visit = datetime_from_micros(lasts[i])?;
        let visit_count = visits[i] as usize;

        let customer_age_days = (last_visit - first_visit).num_days();
        let purchase_frequency = Metric::ratio(visit_count as f64, customer_age_days as f64);
        let recency_days = (reference - last_visit).num_days();

        profiles.push(CustomerProfile {
            transaction_id,
            visit_count,
            total_spent: spent[i],
            avg_order_value: averages[i],
            first_visit,
            last_visit,
            customer_age_days,
            purchase_frequency,
            recency_days,
            segment: assign_segment(recency_days, purchase_frequency, thresholds),
        });
    }
    profiles.sort_by(|a, b| a.transaction_id.cmp(&b.transaction_id));

    tracing::debug!(customers = profiles.len(), %reference, "segmented customers");
    Ok(profiles)
}

/// Number of customers in each segment; every segment is listed.
pub fn segment_counts(profiles: &[CustomerProfile]) -> Vec<(Segment, usize)> {
    Segment::ALL
        .iter()
        .map(|&segment| {
            let count = profiles.iter().filter(|p| p.segment == segment).count();
            (segment, count)
        })
        .collect()
}
