//! Missing-value resolution: drop high-missing columns, then impute.

use crate::config::MissingStrategy;
use crate::imputers::{StatisticalImputer, UNKNOWN_PLACEHOLDER};
use crate::types::{CleaningLogEntry, CleaningOp, ColumnTypes, LogTarget, SemanticType};
use anyhow::Result;
use polars::prelude::*;
use serde_json::json;
use tracing::{debug, info, warn};

/// Drop every column whose missing fraction is strictly above `threshold`.
///
/// Always returns one `DropColumns` entry, listing each dropped column with its ratio.
pub(crate) fn drop_high_missing_columns(
    df: &mut DataFrame,
    types: &mut ColumnTypes,
    threshold: f64,
) -> Result<CleaningLogEntry> {
    let rows = df.height();
    let mut dropped: Vec<(String, f64)> = Vec::new();

    if rows > 0 {
        for col in df.get_columns() {
            let ratio = col.null_count() as f64 / rows as f64;
            if ratio > threshold {
                dropped.push((col.name().to_string(), ratio));
            }
        }
    }

    let names: Vec<String> = dropped.iter().map(|(name, _)| name.clone()).collect();
    if !names.is_empty() {
        let cols_ref: Vec<PlSmallStr> = names.iter().map(|s| s.as_str().into()).collect();
        *df = df.drop_many(cols_ref);
        for name in &names {
            types.remove(name);
        }
        info!(
            "Dropped {} columns with more than {:.0}% missing values: {:?}",
            names.len(),
            threshold * 100.0,
            names
        );
    }

    let summary = if names.is_empty() {
        format!("No columns above {:.0}% missing", threshold * 100.0)
    } else {
        format!(
            "Dropped {} columns above {:.0}% missing",
            names.len(),
            threshold * 100.0
        )
    };
    let details: Vec<serde_json::Value> = dropped
        .iter()
        .map(|(column, ratio)| json!({ "column": column, "missing_ratio": ratio }))
        .collect();

    Ok(
        CleaningLogEntry::new(CleaningOp::DropColumns, LogTarget::Columns(names), summary)
            .with_params(json!({ "threshold": threshold }))
            .with_effect(json!({ "dropped": details })),
    )
}

/// Fill or drop the remaining missing values according to `strategy`.
pub(crate) fn impute(
    df: &mut DataFrame,
    types: &ColumnTypes,
    strategy: MissingStrategy,
) -> Result<Vec<CleaningLogEntry>> {
    if strategy == MissingStrategy::Drop {
        return Ok(vec![drop_incomplete_rows(df)?]);
    }

    let mut log = Vec::new();
    let columns: Vec<(String, SemanticType)> = types
        .iter()
        .filter(|(name, _)| df.column(name).is_ok())
        .map(|(name, semantic)| (name.to_string(), semantic))
        .collect();

    for (name, semantic) in columns {
        let entry = match (strategy, semantic) {
            (MissingStrategy::Auto, SemanticType::Numeric) => {
                let entry = StatisticalImputer::fill_median(df, &name)?;
                if entry.is_none() && has_nulls(df, &name) {
                    warn!("Column '{}' has no values to take a median from", name);
                }
                entry
            }
            (MissingStrategy::Auto, SemanticType::Temporal) => {
                StatisticalImputer::fill_forward(df, &name)?
            }
            (MissingStrategy::Auto, SemanticType::Categorical | SemanticType::Unknown) => {
                StatisticalImputer::fill_mode(df, &name, Some(UNKNOWN_PLACEHOLDER))?
            }
            (MissingStrategy::ForwardFill, _) => StatisticalImputer::fill_forward(df, &name)?,
            (MissingStrategy::BackwardFill, _) => StatisticalImputer::fill_backward(df, &name)?,
            (MissingStrategy::Mean, SemanticType::Numeric) => {
                StatisticalImputer::fill_mean(df, &name)?
            }
            (MissingStrategy::Median, SemanticType::Numeric) => {
                StatisticalImputer::fill_median(df, &name)?
            }
            (MissingStrategy::Mode, _) => StatisticalImputer::fill_mode(df, &name, None)?,
            (MissingStrategy::Mean | MissingStrategy::Median, _) => None,
            (MissingStrategy::Drop, _) => None,
        };

        if let Some(entry) = entry {
            debug!("{}", entry.summary);
            log.push(entry);
        }
    }

    info!(
        "Imputed missing values in {} columns ({})",
        log.len(),
        strategy.as_str()
    );
    Ok(log)
}

/// Remove every row that still has a missing value. Always logs one `DropRows` entry.
pub(crate) fn drop_incomplete_rows(df: &mut DataFrame) -> Result<CleaningLogEntry> {
    let before = df.height();
    let mut keep = vec![true; before];
    for col in df.get_columns() {
        let nulls = col.as_materialized_series().is_null();
        for (row, is_null) in nulls.into_iter().enumerate() {
            if is_null == Some(true) {
                keep[row] = false;
            }
        }
    }

    let mask = BooleanChunked::from_slice("mask".into(), &keep);
    *df = df.filter(&mask)?;
    let removed = before - df.height();
    info!("Dropped {} rows with missing values", removed);

    Ok(CleaningLogEntry::new(
        CleaningOp::DropRows,
        LogTarget::Table,
        format!("Dropped {removed} rows with missing values"),
    )
    .with_params(json!({ "strategy": MissingStrategy::Drop.as_str() }))
    .with_effect(json!({ "removed_rows": removed })))
}

fn has_nulls(df: &DataFrame, name: &str) -> bool {
    df.column(name).map(|c| c.null_count() > 0).unwrap_or(false)
}
