//! Transaction records and CSV loading using Polars

use polars::prelude::*;
use std::path::Path;

use crate::error::{AnalysisError, SchemaError};

pub const COL_TIMESTAMP: &str = "Date Time";
pub const COL_TRANSACTION_ID: &str = "Transaction ID";
pub const COL_TOTAL_PRICE: &str = "Total Price";
pub const COL_QUANTITY: &str = "Quantity";
pub const COL_CATEGORY: &str = "Category";
pub const COL_LOCATION: &str = "Location";

/// Column names every input table must provide.
pub const REQUIRED_COLUMNS: [&str; 6] = [
    COL_TIMESTAMP,
    COL_TRANSACTION_ID,
    COL_TOTAL_PRICE,
    COL_QUANTITY,
    COL_CATEGORY,
    COL_LOCATION,
];

/// One point-of-sale line item as read from the source table.
///
/// The timestamp stays raw text; parsing it is the featurizer's job.
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    pub timestamp: String,
    /// Grouping key for the line items of one visit.
    pub transaction_id: String,
    pub total_price: f64,
    pub quantity: u64,
    pub category: String,
    pub location: String,
}

/// Load a CSV file of point-of-sale records.
///
/// Every column is read as text, so identifiers such as `007` keep their
/// spelling; numeric columns are parsed row by row afterwards.
///
/// # Arguments
/// * `file_path` - Path to a CSV file with the columns in [`REQUIRED_COLUMNS`]
///
/// # Returns
/// * One `Transaction` per row, in file order
pub fn load_transactions(file_path: impl AsRef<Path>) -> crate::Result<Vec<Transaction>> {
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .try_into_reader_with_file_path(Some(file_path.as_ref().to_path_buf()))?
        .finish()?;

    tracing::debug!(rows = df.height(), "loaded transaction table");
    transactions_from_frame(&df)
}

/// Convert a DataFrame into typed transactions, validating the column contract.
pub fn transactions_from_frame(df: &DataFrame) -> crate::Result<Vec<Transaction>> {
    for name in REQUIRED_COLUMNS {
        if df.column(name).is_err() {
            return Err(schema(SchemaError::MissingColumn(name.to_string())));
        }
    }

    let timestamps = string_column(df, COL_TIMESTAMP)?;
    let ids = string_column(df, COL_TRANSACTION_ID)?;
    let prices = string_column(df, COL_TOTAL_PRICE)?;
    let quantities = string_column(df, COL_QUANTITY)?;
    let categories = string_column(df, COL_CATEGORY)?;
    let locations = string_column(df, COL_LOCATION)?;

    let mut transactions = Vec::with_capacity(df.height());
    for row in 0..df.height() {
        let total_price = number(prices[row].as_deref(), row, COL_TOTAL_PRICE)?;
        if !total_price.is_finite() || total_price < 0.0 {
            return Err(schema(out_of_range(row, COL_TOTAL_PRICE, "decimal", total_price)));
        }

        let quantity = number(quantities[row].as_deref(), row, COL_QUANTITY)?;
        if !quantity.is_finite() || quantity < 0.0 || quantity.fract() != 0.0 {
            return Err(schema(out_of_range(row, COL_QUANTITY, "integer", quantity)));
        }

        transactions.push(Transaction {
            timestamp: required(timestamps[row].clone(), row, COL_TIMESTAMP)?,
            transaction_id: required(ids[row].clone(), row, COL_TRANSACTION_ID)?,
            total_price,
            quantity: quantity as u64,
            category: required(categories[row].clone(), row, COL_CATEGORY)?,
            location: required(locations[row].clone(), row, COL_LOCATION)?,
        });
    }

    Ok(transactions)
}

/// Trimmed cell text; blank cells count as missing.
fn string_column(df: &DataFrame, name: &str) -> crate::Result<Vec<Option<String>>> {
    let series = df.column(name)?.cast(&DataType::String)?;
    let values = series
        .str()?
        .into_iter()
        .map(|value| {
            value
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        })
        .collect();
    Ok(values)
}

fn number(value: Option<&str>, row: usize, column: &str) -> crate::Result<f64> {
    let raw = required(value, row, column)?;
    raw.parse().map_err(|_| {
        schema(SchemaError::Unparseable {
            row,
            column: column.to_string(),
            value: raw.to_string(),
        })
    })
}

fn required<T>(value: Option<T>, row: usize, column: &str) -> crate::Result<T> {
    value.ok_or_else(|| {
        schema(SchemaError::MissingValue {
            row,
            column: column.to_string(),
        })
    })
}

fn out_of_range(row: usize, column: &str, expected: &'static str, value: f64) -> SchemaError {
    SchemaError::OutOfRange {
        row,
        column: column.to_string(),
        expected,
        value,
    }
}

fn schema(err: SchemaError) -> anyhow::Error {
    AnalysisError::from(err).into()
}
