//! Calendar and time-of-day features derived from transaction timestamps

use chrono::{DateTime, Datelike, Month, NaiveDate, NaiveDateTime, Timelike, Weekday};
use std::fmt;

use crate::config::{PeakWindows, TimeBlockBounds};
use crate::data::{Transaction, COL_TIMESTAMP};
use crate::error::SchemaError;

/// Accepted timestamp layouts, tried in order after RFC 3339.
const DATETIME_FORMATS: [&str; 6] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%m/%d/%Y"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TimeBlock {
    Morning,
    Afternoon,
    Evening,
}

impl TimeBlock {
    pub const ALL: [TimeBlock; 3] = [TimeBlock::Morning, TimeBlock::Afternoon, TimeBlock::Evening];

    /// Morning and afternoon come from `bounds`; every other hour is evening.
    pub fn from_hour(hour: u32, bounds: &TimeBlockBounds) -> Self {
        if bounds.morning.contains(hour) {
            TimeBlock::Morning
        } else if bounds.afternoon.contains(hour) {
            TimeBlock::Afternoon
        } else {
            TimeBlock::Evening
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TimeBlock::Morning => "Morning",
            TimeBlock::Afternoon => "Afternoon",
            TimeBlock::Evening => "Evening",
        }
    }
}

impl fmt::Display for TimeBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Traffic bucket of an hour. Independent of [`TimeBlock`]: 06:00 is a
/// morning hour but low traffic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Seasonality {
    MorningPeak,
    LunchPeak,
    EveningPeak,
    LowTraffic,
}

impl Seasonality {
    pub const ALL: [Seasonality; 4] = [
        Seasonality::MorningPeak,
        Seasonality::LunchPeak,
        Seasonality::EveningPeak,
        Seasonality::LowTraffic,
    ];

    pub fn from_hour(hour: u32, peaks: &PeakWindows) -> Self {
        if peaks.morning.contains(hour) {
            Seasonality::MorningPeak
        } else if peaks.lunch.contains(hour) {
            Seasonality::LunchPeak
        } else if peaks.evening.contains(hour) {
            Seasonality::EveningPeak
        } else {
            Seasonality::LowTraffic
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Seasonality::MorningPeak => "Morning Peak",
            Seasonality::LunchPeak => "Lunch Peak",
            Seasonality::EveningPeak => "Evening Peak",
            Seasonality::LowTraffic => "Low Traffic",
        }
    }
}

impl fmt::Display for Seasonality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A transaction with its parsed timestamp and derived calendar features.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedTransaction {
    pub timestamp: NaiveDateTime,
    pub transaction_id: String,
    pub total_price: f64,
    pub quantity: u64,
    pub category: String,
    pub location: String,
    pub hour: u32,
    pub month: Month,
    pub day_of_week: Weekday,
    pub date: NaiveDate,
    pub time_block: TimeBlock,
    pub seasonality: Seasonality,
}

impl EnrichedTransaction {
    pub fn month_name(&self) -> &'static str {
        self.month.name()
    }

    pub fn day_name(&self) -> &'static str {
        weekday_name(self.day_of_week)
    }
}

/// Enrich every transaction, one-to-one and in input order.
///
/// Fails on the first row whose timestamp cannot be parsed; no partial
/// result is returned.
pub fn featurize(
    transactions: &[Transaction],
    time_blocks: &TimeBlockBounds,
    peaks: &PeakWindows,
) -> Result<Vec<EnrichedTransaction>, SchemaError> {
    let enriched = transactions
        .iter()
        .enumerate()
        .map(|(row, tx)| enrich(row, tx, time_blocks, peaks))
        .collect::<Result<Vec<_>, _>>()?;

    tracing::debug!(records = enriched.len(), "featurized transactions");
    Ok(enriched)
}

fn enrich(
    row: usize,
    tx: &Transaction,
    time_blocks: &TimeBlockBounds,
    peaks: &PeakWindows,
) -> Result<EnrichedTransaction, SchemaError> {
    let unparseable = || SchemaError::Unparseable {
        row,
        column: COL_TIMESTAMP.to_string(),
        value: tx.timestamp.clone(),
    };

    let timestamp = parse_timestamp(&tx.timestamp).ok_or_else(unparseable)?;
    let month = u8::try_from(timestamp.month())
        .ok()
        .and_then(|m| Month::try_from(m).ok())
        .ok_or_else(unparseable)?;
    let hour = timestamp.hour();

    Ok(EnrichedTransaction {
        timestamp,
        transaction_id: tx.transaction_id.clone(),
        total_price: tx.total_price,
        quantity: tx.quantity,
        category: tx.category.clone(),
        location: tx.location.clone(),
        hour,
        month,
        day_of_week: timestamp.weekday(),
        date: timestamp.date(),
        time_block: TimeBlock::from_hour(hour, time_blocks),
        seasonality: Seasonality::from_hour(hour, peaks),
    })
}

/// Parse a wall-clock timestamp. Offsets in RFC 3339 input are dropped so the
/// hour stays the local hour of the sale.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_local());
    }

    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}

pub fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}
