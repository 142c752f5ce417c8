//! Error taxonomy for the analysis core

use polars::error::PolarsError;
use thiserror::Error;

/// A required column or field is absent, empty, or cannot be interpreted.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchemaError {
    #[error("missing required column '{0}'")]
    MissingColumn(String),

    #[error("row {row}: '{column}' is empty")]
    MissingValue { row: usize, column: String },

    #[error("row {row}: cannot parse '{column}' value {value:?}")]
    Unparseable {
        row: usize,
        column: String,
        value: String,
    },

    #[error("row {row}: '{column}' must be a non-negative {expected}, got {value}")]
    OutOfRange {
        row: usize,
        column: String,
        expected: &'static str,
        value: f64,
    },
}

/// Failures raised by the analysis stages.
///
/// `Schema` aborts the whole run. `InsufficientData` only aborts the stage
/// that raised it (decomposition or forecasting); the pipeline keeps the
/// error next to the other stage outputs.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalysisError {
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("insufficient data for {stage}: need at least {required} daily points, got {actual}")]
    InsufficientData {
        stage: &'static str,
        required: usize,
        actual: usize,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A grouping query over the transaction frame failed.
    #[error("frame operation failed: {0}")]
    Frame(String),
}

impl From<PolarsError> for AnalysisError {
    fn from(err: PolarsError) -> Self {
        AnalysisError::Frame(err.to_string())
    }
}

impl AnalysisError {
    pub fn is_schema(&self) -> bool {
        matches!(self, AnalysisError::Schema(_))
    }

    pub fn is_insufficient_data(&self) -> bool {
        matches!(self, AnalysisError::InsufficientData { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_failed_precondition() {
        let err: AnalysisError = SchemaError::MissingColumn("Date Time".to_string()).into();
        assert!(err.is_schema());
        assert_eq!(
            err.to_string(),
            "schema error: missing required column 'Date Time'"
        );

        let err = AnalysisError::InsufficientData {
            stage: "sales forecast",
            required: 14,
            actual: 9,
        };
        assert!(err.is_insufficient_data());
        assert!(err.to_string().contains("need at least 14"));
        assert!(err.to_string().contains("got 9"));
    }

    #[test]
    fn test_polars_errors_become_frame_errors() {
        let err: AnalysisError = PolarsError::ColumnNotFound("Visit Count".into()).into();
        assert!(matches!(err, AnalysisError::Frame(ref message) if message.contains("Visit Count")));
        assert!(!err.is_schema());
    }
}
