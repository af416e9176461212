use crate::error::Result;
use crate::types::{ColumnTypes, SemanticType};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Missing-value count of one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissingCount {
    pub column: String,
    pub count: usize,
    pub percentage: f64,
}

/// Shape and completeness overview of a table, as seen right after loading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetSummary {
    pub total_rows: usize,
    pub total_columns: usize,
    pub columns: Vec<String>,
    pub missing: Vec<MissingCount>,
    pub duplicate_rows: usize,
    pub numeric_columns: Vec<String>,
    pub categorical_columns: Vec<String>,
    pub temporal_columns: Vec<String>,
}

impl DatasetSummary {
    pub fn from_table(df: &DataFrame, types: &ColumnTypes) -> Result<Self> {
        let rows = df.height();
        let missing = df
            .get_columns()
            .iter()
            .map(|col| {
                let count = col.null_count();
                MissingCount {
                    column: col.name().to_string(),
                    count,
                    percentage: if rows == 0 {
                        0.0
                    } else {
                        count as f64 / rows as f64 * 100.0
                    },
                }
            })
            .collect();

        let duplicate_rows = if df.width() == 0 {
            0
        } else {
            rows - df
                .unique_stable(None, UniqueKeepStrategy::First, None)?
                .height()
        };

        Ok(Self {
            total_rows: rows,
            total_columns: df.width(),
            columns: df
                .get_column_names()
                .iter()
                .map(|n| n.to_string())
                .collect(),
            missing,
            duplicate_rows,
            numeric_columns: types.columns_of(SemanticType::Numeric),
            categorical_columns: types.columns_of(SemanticType::Categorical),
            temporal_columns: types.columns_of(SemanticType::Temporal),
        })
    }

    /// Total missing cells across the table.
    pub fn total_missing(&self) -> usize {
        self.missing.iter().map(|m| m.count).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_counts() {
        let df = df![
            "revenue" => [Some(1.0), Some(1.0), None, Some(4.0)],
            "region" => [Some("North"), Some("North"), Some("South"), None],
        ]
        .unwrap();
        let mut types = ColumnTypes::new();
        types.insert("revenue", SemanticType::Numeric);
        types.insert("region", SemanticType::Categorical);

        let summary = DatasetSummary::from_table(&df, &types).unwrap();

        assert_eq!(summary.total_rows, 4);
        assert_eq!(summary.total_columns, 2);
        assert_eq!(summary.duplicate_rows, 1);
        assert_eq!(summary.total_missing(), 2);
        assert_eq!(summary.missing[0].percentage, 25.0);
        assert_eq!(summary.numeric_columns, vec!["revenue"]);
        assert!(summary.temporal_columns.is_empty());
    }
}
