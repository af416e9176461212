//! Data cleaning module for preprocessing datasets.
//!
//! The [`CleaningPipeline`] runs a fixed sequence of stages over its own
//! copy of the input table:
//! 1. Normalize column names (collisions are suffixed and flagged)
//! 2. Infer semantic types and coerce columns to them
//! 3. Remove exact duplicate rows
//! 4. Drop high-missing columns, then impute what is left
//!
//! Every stage appends to an ordered audit log of [`CleaningLogEntry`]s.

mod converters;
mod missing;
mod names;

use crate::config::AnalyticsConfig;
use crate::error::{AnalyticsError, Result};
use crate::profiler::TypeInferencer;
use crate::types::{CleaningLogEntry, CleaningOp, ColumnTypes, LogTarget, SemanticType};
use crate::utils::{canonical_datetime, is_missing_marker};
use converters::Coerced;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info, warn};

/// Result of a cleaning run.
#[derive(Debug, Clone)]
pub struct CleaningOutcome {
    /// The clean table. The caller's input is left untouched.
    pub table: DataFrame,
    /// Every mutation, in execution order.
    pub log: Vec<CleaningLogEntry>,
    /// Semantic type of every surviving column, in column order.
    pub semantic_types: ColumnTypes,
}

/// Serializable overview of a cleaning run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleaningReport {
    /// (rows, columns)
    pub final_shape: (usize, usize),
    /// One summary line per log entry.
    pub operations: Vec<String>,
    /// Missing values left per column, in column order.
    pub remaining_missing: Vec<(String, usize)>,
    pub final_columns: Vec<String>,
}

impl CleaningOutcome {
    pub fn report(&self) -> CleaningReport {
        CleaningReport {
            final_shape: (self.table.height(), self.table.width()),
            operations: self.log.iter().map(|e| e.summary.clone()).collect(),
            remaining_missing: self
                .table
                .get_columns()
                .iter()
                .map(|c| (c.name().to_string(), c.null_count()))
                .collect(),
            final_columns: self
                .table
                .get_column_names()
                .iter()
                .map(|n| n.to_string())
                .collect(),
        }
    }

    /// Log entries of one kind, in order.
    pub fn entries(&self, operation: CleaningOp) -> impl Iterator<Item = &CleaningLogEntry> {
        self.log.iter().filter(move |e| e.operation == operation)
    }
}

/// Ordered cleaning stages with an audit log.
///
/// # Example
///
/// ```rust,ignore
/// use fiscal_analytics::{AnalyticsConfig, CleaningPipeline};
///
/// let outcome = CleaningPipeline::new(AnalyticsConfig::default()).clean(&raw)?;
/// for entry in &outcome.log {
///     println!("{}", entry.summary);
/// }
/// ```
#[derive(Debug, Clone)]
pub struct CleaningPipeline {
    config: AnalyticsConfig,
    inferencer: TypeInferencer,
}

impl CleaningPipeline {
    pub fn new(config: AnalyticsConfig) -> Self {
        let inferencer = TypeInferencer::from_config(&config);
        Self { config, inferencer }
    }

    /// Clean a copy of `df`.
    ///
    /// Cell-level parse failures never fail the run; they become missing and
    /// are counted in the `CoerceTypes` entry.
    ///
    /// # Errors
    ///
    /// [`AnalyticsError::NoColumns`] for a table without columns.
    pub fn clean(&self, df: &DataFrame) -> Result<CleaningOutcome> {
        if df.width() == 0 {
            return Err(AnalyticsError::NoColumns);
        }

        let stages = self.config.stages;
        let mut table = df.clone();
        let mut log = Vec::new();

        info!(
            "Cleaning {} rows x {} columns",
            table.height(),
            table.width()
        );

        if stages.normalize_names {
            self.normalize_names(&mut table, &mut log)?;
        }

        let mut types = self.inferencer.infer(&table)?;

        if stages.coerce_types {
            log.push(self.coerce_types(&mut table, &types)?);
        }

        if stages.deduplicate {
            log.push(remove_duplicates(&mut table, "Removed {} duplicate rows")?);
        }

        if stages.resolve_missing {
            log.push(
                missing::drop_high_missing_columns(
                    &mut table,
                    &mut types,
                    self.config.missing_threshold,
                )
                .map_err(cleaning_failed)?,
            );
            log.extend(
                missing::impute(&mut table, &types, self.config.missing_strategy)
                    .map_err(cleaning_failed)?,
            );

            // Filling gaps can make rows that differed only in a missing cell identical.
            if stages.deduplicate {
                let entry = remove_duplicates(
                    &mut table,
                    "Removed {} rows duplicated by imputation",
                )?;
                if entry.effect["removed_rows"] != 0 {
                    log.push(entry);
                }
            }
        }

        info!(
            "Cleaning complete: {} rows x {} columns, {} log entries",
            table.height(),
            table.width(),
            log.len()
        );

        Ok(CleaningOutcome {
            table,
            log,
            semantic_types: types,
        })
    }

    fn normalize_names(&self, df: &mut DataFrame, log: &mut Vec<CleaningLogEntry>) -> Result<()> {
        let original: Vec<String> = df
            .get_column_names()
            .iter()
            .map(|n| n.to_string())
            .collect();
        let normalized = names::normalize_names(&original);

        let renamed_columns: Vec<Column> = df
            .get_columns()
            .iter()
            .zip(&normalized.names)
            .map(|(col, name)| col.clone().with_name(name.as_str().into()))
            .collect();
        *df = DataFrame::new(renamed_columns)?;

        let renamed: Vec<serde_json::Value> = normalized
            .renamed
            .iter()
            .map(|(from, to)| json!({ "from": from, "to": to }))
            .collect();
        debug!("Renamed {} columns", renamed.len());
        log.push(
            CleaningLogEntry::new(
                CleaningOp::NormalizeNames,
                LogTarget::Table,
                format!("Normalized {} column names", renamed.len()),
            )
            .with_effect(json!({ "renamed": renamed })),
        );

        for collision in normalized.collisions {
            warn!(
                "Columns {:?} all normalize to '{}'; kept as {:?}",
                collision.sources, collision.base, collision.resolved
            );
            log.push(
                CleaningLogEntry::new(
                    CleaningOp::NameCollision,
                    LogTarget::Columns(collision.sources.clone()),
                    format!(
                        "{} columns normalize to '{}'",
                        collision.sources.len(),
                        collision.base
                    ),
                )
                .with_effect(json!({
                    "base": collision.base,
                    "resolved_as": collision.resolved,
                })),
            );
        }
        Ok(())
    }

    fn coerce_types(&self, df: &mut DataFrame, types: &ColumnTypes) -> Result<CleaningLogEntry> {
        let mut details = Vec::new();
        let mut coerced_columns = Vec::new();
        let mut total_failed = 0;

        for (name, semantic) in types.iter() {
            let series = df.column(name)?.as_materialized_series().clone();
            let from = series.dtype().clone();

            let coerced = match semantic {
                SemanticType::Numeric if from != DataType::Float64 => {
                    converters::to_numeric(&series).map_err(cleaning_failed)?
                }
                SemanticType::Temporal if from != canonical_datetime() => {
                    converters::to_datetime(&series).map_err(cleaning_failed)?
                }
                SemanticType::Categorical => {
                    blank_missing_markers(&series).map_err(cleaning_failed)?
                }
                _ => continue,
            };

            if coerced.series.dtype() == &from && coerced.failed == 0 {
                continue;
            }

            let real_failures = coerced.failed - coerced.markers;
            if real_failures > 0 {
                warn!(
                    "Column '{}': {} values could not be parsed as {} and are now missing",
                    name, real_failures, semantic
                );
            }
            total_failed += coerced.failed;
            details.push(json!({
                "column": name,
                "semantic_type": semantic,
                "from": format!("{from:?}"),
                "to": format!("{:?}", coerced.series.dtype()),
                "failed": coerced.failed,
                "missing_markers": coerced.markers,
            }));
            coerced_columns.push(name.to_string());
            df.replace(name, coerced.series)?;
        }

        info!(
            "Coerced {} columns ({} cells now missing)",
            coerced_columns.len(),
            total_failed
        );

        Ok(CleaningLogEntry::new(
            CleaningOp::CoerceTypes,
            LogTarget::Columns(coerced_columns.clone()),
            format!(
                "Coerced {} columns to their semantic types, {} cells now missing",
                coerced_columns.len(),
                total_failed
            ),
        )
        .with_effect(json!({ "columns": details, "failed_total": total_failed })))
    }
}

fn cleaning_failed(e: anyhow::Error) -> AnalyticsError {
    AnalyticsError::CleaningFailed(e.to_string())
}

/// Turn spreadsheet missing markers in a string column into real missing cells.
fn blank_missing_markers(series: &Series) -> anyhow::Result<Coerced> {
    if series.dtype() != &DataType::String {
        return Ok(Coerced {
            series: series.cast(&DataType::String)?,
            failed: 0,
            markers: 0,
        });
    }

    let mut markers = 0;
    let values: Vec<Option<&str>> = series
        .str()?
        .into_iter()
        .map(|v| match v {
            Some(s) if is_missing_marker(s) => {
                markers += 1;
                None
            }
            other => other,
        })
        .collect();

    Ok(Coerced {
        series: Series::new(series.name().clone(), values),
        failed: markers,
        markers,
    })
}

/// Stable removal of exact duplicate rows, keeping the first occurrence.
fn remove_duplicates(df: &mut DataFrame, summary: &str) -> Result<CleaningLogEntry> {
    let before = df.height();
    *df = df.unique_stable(None, UniqueKeepStrategy::First, None)?;
    let removed = before - df.height();

    if removed > 0 {
        info!("Removed {} duplicate rows", removed);
    } else {
        debug!("No duplicate rows found");
    }

    Ok(CleaningLogEntry::new(
        CleaningOp::RemoveDuplicates,
        LogTarget::Table,
        summary.replacen("{}", &removed.to_string(), 1),
    )
    .with_effect(json!({ "removed_rows": removed })))
}
