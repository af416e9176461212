//! Semantic type inference for schema-less columns.

use crate::config::AnalyticsConfig;
use crate::error::{AnalyticsError, Result};
use crate::types::{ColumnTypes, SemanticType};
use crate::utils::{
    is_datetime_dtype, is_missing_marker, is_numeric_dtype, parse_datetime, parse_numeric_string,
};
use polars::prelude::*;
use tracing::debug;

/// Name fragments that mark a column as temporal.
pub const TEMPORAL_NAME_TOKENS: [&str; 2] = ["date", "time"];

/// Decides Numeric / Temporal / Categorical / Unknown for every column.
#[derive(Debug, Clone)]
pub struct TypeInferencer {
    numeric_sample_size: usize,
    temporal_parse_ratio: f64,
}

impl Default for TypeInferencer {
    fn default() -> Self {
        Self {
            numeric_sample_size: 100,
            temporal_parse_ratio: 0.5,
        }
    }
}

impl TypeInferencer {
    pub fn new(numeric_sample_size: usize, temporal_parse_ratio: f64) -> Self {
        Self {
            numeric_sample_size: numeric_sample_size.max(1),
            temporal_parse_ratio,
        }
    }

    pub fn from_config(config: &AnalyticsConfig) -> Self {
        Self::new(config.numeric_sample_size, config.temporal_parse_ratio)
    }

    /// Infer the semantic type of every column, in column order.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyticsError::NoColumns`] for a table without columns.
    pub fn infer(&self, df: &DataFrame) -> Result<ColumnTypes> {
        if df.width() == 0 {
            return Err(AnalyticsError::NoColumns);
        }

        let mut types = ColumnTypes::new();
        for column in df.get_columns() {
            let series = column.as_materialized_series();
            let semantic = self.infer_column(series)?;
            debug!("Column '{}' inferred as {}", series.name(), semantic);
            types.insert(series.name().to_string(), semantic);
        }
        Ok(types)
    }

    /// Infer the semantic type of a single column.
    pub fn infer_column(&self, series: &Series) -> Result<SemanticType> {
        if series.null_count() == series.len() {
            return Ok(SemanticType::Unknown);
        }

        let dtype = series.dtype();
        if is_datetime_dtype(dtype) {
            return Ok(SemanticType::Temporal);
        }
        if is_numeric_dtype(dtype) {
            return Ok(SemanticType::Numeric);
        }
        if dtype != &DataType::String {
            return Ok(SemanticType::Categorical);
        }

        let values: Vec<&str> = series
            .str()?
            .into_iter()
            .flatten()
            .filter(|v| !is_missing_marker(v))
            .collect();

        if values.is_empty() {
            return Ok(SemanticType::Unknown);
        }

        if has_temporal_name(series.name()) || self.mostly_dates(&values) {
            return Ok(SemanticType::Temporal);
        }

        if self.sample_is_numeric(&values) {
            return Ok(SemanticType::Numeric);
        }

        Ok(SemanticType::Categorical)
    }

    fn mostly_dates(&self, values: &[&str]) -> bool {
        let parsed = values.iter().filter(|v| parse_datetime(v).is_some()).count();
        parsed as f64 / values.len() as f64 > self.temporal_parse_ratio
    }

    // One unparsable value in the sample rules the column out.
    fn sample_is_numeric(&self, values: &[&str]) -> bool {
        values
            .iter()
            .take(self.numeric_sample_size)
            .all(|v| parse_numeric_string(v).is_some())
    }
}

/// Case-insensitive match against [`TEMPORAL_NAME_TOKENS`].
pub fn has_temporal_name(name: &str) -> bool {
    let lower = name.to_lowercase();
    TEMPORAL_NAME_TOKENS.iter().any(|token| lower.contains(token))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn infer(series: Series) -> SemanticType {
        TypeInferencer::default().infer_column(&series).unwrap()
    }

    #[test]
    fn test_temporal_by_name() {
        let series = Series::new("Posting Date".into(), &["Q1", "Q2"]);
        assert_eq!(infer(series), SemanticType::Temporal);

        let series = Series::new("created_TIME".into(), &["x", "y"]);
        assert_eq!(infer(series), SemanticType::Temporal);
    }

    #[test]
    fn test_temporal_by_values() {
        let series = Series::new(
            "period".into(),
            &["2023-01-31", "2023-02-28", "2023-03-31", "n/a"],
        );
        assert_eq!(infer(series), SemanticType::Temporal);
    }

    #[test]
    fn test_temporal_ratio_must_be_exceeded() {
        let series = Series::new("period".into(), &["2023-01-31", "opening", "closing", "2023-02-28"]);
        assert_eq!(infer(series), SemanticType::Categorical);

        let lenient = TypeInferencer::new(100, 0.4);
        let series = Series::new("period".into(), &["2023-01-31", "opening", "closing", "2023-02-28"]);
        assert_eq!(lenient.infer_column(&series).unwrap(), SemanticType::Temporal);
    }

    #[test]
    fn test_numeric_strings() {
        let series = Series::new(
            "revenue".into(),
            &[Some("$1,200"), None, Some("850.5"), Some("N/A"), Some("-30")],
        );
        assert_eq!(infer(series), SemanticType::Numeric);
    }

    #[test]
    fn test_single_bad_value_disqualifies_numeric() {
        let series = Series::new("amount".into(), &["10", "20", "thirty", "40"]);
        assert_eq!(infer(series), SemanticType::Categorical);
    }

    #[test]
    fn test_bad_value_outside_sample_is_ignored() {
        let inferencer = TypeInferencer::new(3, 0.5);
        let series = Series::new("amount".into(), &["10", "20", "30", "forty"]);
        assert_eq!(inferencer.infer_column(&series).unwrap(), SemanticType::Numeric);
    }

    #[test]
    fn test_native_dtypes() {
        let numeric = Series::new("fiscal_year".into(), &[2021i64, 2022, 2023]);
        assert_eq!(infer(numeric), SemanticType::Numeric);

        let flags = Series::new("approved".into(), &[true, false]);
        assert_eq!(infer(flags), SemanticType::Categorical);
    }

    #[test]
    fn test_all_missing_is_unknown() {
        let nulls = Series::new("notes".into(), &[None::<&str>, None, None]);
        assert_eq!(infer(nulls), SemanticType::Unknown);

        let markers = Series::new("notes".into(), &["N/A", "", "null"]);
        assert_eq!(infer(markers), SemanticType::Unknown);
    }

    #[test]
    fn test_infer_table_keeps_order() {
        let df = df![
            "date" => ["2023-01-01", "2023-02-01"],
            "revenue" => [100.0, 200.0],
            "region" => ["North", "South"],
        ]
        .unwrap();

        let types = TypeInferencer::default().infer(&df).unwrap();
        let collected: Vec<(String, SemanticType)> =
            types.iter().map(|(n, t)| (n.to_string(), t)).collect();

        assert_eq!(
            collected,
            vec![
                ("date".to_string(), SemanticType::Temporal),
                ("revenue".to_string(), SemanticType::Numeric),
                ("region".to_string(), SemanticType::Categorical),
            ]
        );
    }

    #[test]
    fn test_infer_rejects_empty_table() {
        let df = DataFrame::empty();
        let err = TypeInferencer::default().infer(&df).unwrap_err();
        assert!(err.is_structural());
    }
}
