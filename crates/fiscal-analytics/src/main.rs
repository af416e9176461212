//! Runner for the fiscal analytics pipeline.
//!
//! Reads its inputs from the environment (a `.env` file is honored):
//!
//! - `FISCAL_DATA_PATH`: CSV file to analyze (required)
//! - `FISCAL_CONFIG`: JSON file holding an `AnalyticsConfig` (optional)
//! - `RUST_LOG`: log filter, `info` by default
//!
//! The ranked insights are printed to stdout as pretty JSON; logs go to stderr.

use anyhow::{Context, Result, anyhow};
use dotenv::dotenv;
use fiscal_analytics::{AnalysisPipeline, AnalyticsConfig};
use polars::io::csv::read::CsvReadOptions;
use polars::prelude::*;
use std::env;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

fn init_logging() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config() -> Result<AnalyticsConfig> {
    let Ok(path) = env::var("FISCAL_CONFIG") else {
        debug!("FISCAL_CONFIG not set, using defaults");
        return Ok(AnalyticsConfig::default());
    };
    let content =
        std::fs::read_to_string(&path).with_context(|| format!("reading config {path}"))?;
    let config: AnalyticsConfig =
        serde_json::from_str(&content).with_context(|| format!("parsing config {path}"))?;
    config
        .validate()
        .map_err(|e| anyhow!("invalid config {path}: {e}"))?;
    info!("Loaded configuration from {}", path);
    Ok(config)
}

fn load_csv(path: &Path) -> Result<DataFrame> {
    match CsvReadOptions::default()
        .with_infer_schema_length(Some(100))
        .with_has_header(true)
        .with_parse_options(CsvParseOptions::default().with_quote_char(Some(b'"')))
        .try_into_reader_with_file_path(Some(PathBuf::from(path)))?
        .finish()
    {
        Ok(df) => Ok(df),
        Err(e) => {
            // Mixed columns can trip schema inference; read everything as text
            // and let type inference decide.
            warn!("Standard CSV load failed ({}), retrying as text", e);
            CsvReadOptions::default()
                .with_infer_schema_length(Some(0))
                .with_has_header(true)
                .try_into_reader_with_file_path(Some(PathBuf::from(path)))?
                .finish()
                .map_err(|e| anyhow!("Failed to read {}: {}", path.display(), e))
        }
    }
}

fn main() -> Result<()> {
    dotenv().ok();
    init_logging();

    let data_path = env::var("FISCAL_DATA_PATH")
        .map_err(|_| anyhow!("FISCAL_DATA_PATH must point at a CSV file"))?;
    let data_path = Path::new(&data_path);
    if !data_path.exists() {
        return Err(anyhow!("Input file not found: {}", data_path.display()));
    }

    let config = load_config()?;
    let raw = load_csv(data_path)?;
    info!(
        "Loaded {} rows x {} columns from {}",
        raw.height(),
        raw.width(),
        data_path.display()
    );

    let report = AnalysisPipeline::builder()
        .config(config)
        .on_progress(|update| {
            debug!(
                "[{:>3.0}%] {}: {}",
                update.progress * 100.0,
                update.stage.display_name(),
                update.message
            );
        })
        .build()?
        .run(&raw)?;

    for line in &report.cleaning.operations {
        info!("Cleaning: {}", line);
    }
    info!(
        "Final shape {:?}, {} insights in {} ms",
        report.cleaning.final_shape, report.insights.total_insights, report.duration_ms
    );

    println!("{}", serde_json::to_string_pretty(&report.insights)?);
    Ok(())
}
