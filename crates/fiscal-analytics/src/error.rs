//! Error types for the fiscal analytics core.
//!
//! Only two classes of problem surface as errors: structurally invalid input
//! tables (fatal for the whole run) and configuration mistakes such as an
//! unknown strategy name (fatal only for the call that received them).
//! Cell-level parse failures and undersized samples are reported as data in
//! the cleaning log and in the engine results instead.
//!
//! Errors are serializable as `{code, message}` so a report sink can embed
//! them next to the results they relate to.

use serde::Serialize;
use serde::ser::SerializeStruct;
use thiserror::Error;

/// The main error type for the analytics pipeline.
#[derive(Error, Debug)]
pub enum AnalyticsError {
    /// The input table has no columns.
    #[error("Input table has no columns")]
    NoColumns,

    /// The input table has columns but an engine needs at least one row.
    #[error("Input table has no rows")]
    EmptyTable,

    /// An unknown strategy or method name was supplied.
    #[error("Unknown {kind} '{value}' (expected one of: {expected})")]
    UnknownStrategy {
        kind: &'static str,
        value: String,
        expected: &'static str,
    },

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Column was not found in the table.
    #[error("Column '{0}' not found in table")]
    ColumnNotFound(String),

    /// Column exists but cannot be used as a numeric feature.
    #[error("Column '{0}' is not numeric")]
    NotNumeric(String),

    /// Column exists but holds no dates or timestamps.
    #[error("Column '{0}' is not a date/time column")]
    NotTemporal(String),

    /// A cleaning stage failed on something other than cell content.
    #[error("Cleaning failed: {0}")]
    CleaningFailed(String),

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Error with added context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<AnalyticsError>,
    },
}

impl AnalyticsError {
    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        AnalyticsError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Stable error code for downstream consumers.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NoColumns => "NO_COLUMNS",
            Self::EmptyTable => "EMPTY_TABLE",
            Self::UnknownStrategy { .. } => "UNKNOWN_STRATEGY",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::ColumnNotFound(_) => "COLUMN_NOT_FOUND",
            Self::NotNumeric(_) => "NOT_NUMERIC",
            Self::NotTemporal(_) => "NOT_TEMPORAL",
            Self::CleaningFailed(_) => "CLEANING_FAILED",
            Self::Io(_) => "IO_ERROR",
            Self::Polars(_) => "POLARS_ERROR",
            Self::Json(_) => "JSON_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }

    /// Malformed or empty input. Aborts the whole run.
    pub fn is_structural(&self) -> bool {
        match self {
            Self::NoColumns | Self::EmptyTable => true,
            Self::WithContext { source, .. } => source.is_structural(),
            _ => false,
        }
    }

    /// Bad strategy name or option value. Aborts only the failing call.
    pub fn is_configuration(&self) -> bool {
        match self {
            Self::UnknownStrategy { .. } | Self::InvalidConfig(_) => true,
            Self::WithContext { source, .. } => source.is_configuration(),
            _ => false,
        }
    }
}

impl Serialize for AnalyticsError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("AnalyticsError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for analytics operations.
pub type Result<T> = std::result::Result<T, AnalyticsError>;

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, polars::error::PolarsError> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| AnalyticsError::Polars(e).with_context(context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code() {
        assert_eq!(AnalyticsError::NoColumns.error_code(), "NO_COLUMNS");
        assert_eq!(
            AnalyticsError::ColumnNotFound("revenue".to_string()).error_code(),
            "COLUMN_NOT_FOUND"
        );
    }

    #[test]
    fn test_classification() {
        assert!(AnalyticsError::NoColumns.is_structural());
        assert!(AnalyticsError::EmptyTable.is_structural());
        assert!(!AnalyticsError::NoColumns.is_configuration());

        let unknown = AnalyticsError::UnknownStrategy {
            kind: "missing strategy",
            value: "interpolate".to_string(),
            expected: "auto, drop",
        };
        assert!(unknown.is_configuration());
        assert!(!unknown.is_structural());
    }

    #[test]
    fn test_unknown_strategy_message() {
        let error = AnalyticsError::UnknownStrategy {
            kind: "outlier method",
            value: "mad".to_string(),
            expected: "iqr, zscore",
        };
        let message = error.to_string();
        assert!(message.contains("outlier method"));
        assert!(message.contains("'mad'"));
        assert!(message.contains("iqr, zscore"));
    }

    #[test]
    fn test_error_serialization() {
        let error = AnalyticsError::ColumnNotFound("Revenue".to_string());
        let json = serde_json::to_string(&error).unwrap();
        assert!(json.contains("COLUMN_NOT_FOUND"));
        assert!(json.contains("Revenue"));
    }

    #[test]
    fn test_with_context_preserves_classification() {
        let error = AnalyticsError::NoColumns.with_context("During cleaning");
        assert!(error.to_string().contains("During cleaning"));
        assert_eq!(error.error_code(), "NO_COLUMNS");
        assert!(error.is_structural());
    }
}
