use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Semantic Column Types
// ============================================================================

/// Inferred meaning of a column, computed once and threaded through every engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SemanticType {
    Numeric,
    Temporal,
    Categorical,
    /// All values missing. Takes part in no numeric or temporal logic.
    Unknown,
}

impl SemanticType {
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Numeric => "Numeric",
            Self::Temporal => "Temporal",
            Self::Categorical => "Categorical",
            Self::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for SemanticType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Ordered mapping from column name to [`SemanticType`].
///
/// Column order is the table's column order, which the insight rules rely on
/// ("first numeric columns").
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnTypes {
    entries: Vec<(String, SemanticType)>,
}

impl ColumnTypes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the type of a column, appending it if it is not yet known.
    pub fn insert(&mut self, name: impl Into<String>, semantic: SemanticType) {
        let name = name.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = semantic,
            None => self.entries.push((name, semantic)),
        }
    }

    pub fn get(&self, name: &str) -> Option<SemanticType> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, t)| *t)
    }

    pub fn remove(&mut self, name: &str) {
        self.entries.retain(|(n, _)| n != name);
    }

    /// Rename a column in place, keeping its position.
    pub fn rename(&mut self, from: &str, to: &str) {
        if let Some(entry) = self.entries.iter_mut().find(|(n, _)| n == from) {
            entry.0 = to.to_string();
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, SemanticType)> {
        self.entries.iter().map(|(n, t)| (n.as_str(), *t))
    }

    /// Names of all columns of the given type, in column order.
    pub fn columns_of(&self, semantic: SemanticType) -> Vec<String> {
        self.entries
            .iter()
            .filter(|(_, t)| *t == semantic)
            .map(|(n, _)| n.clone())
            .collect()
    }

    pub fn numeric_columns(&self) -> Vec<String> {
        self.columns_of(SemanticType::Numeric)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ============================================================================
// Cleaning Audit Log
// ============================================================================

/// Kinds of mutation recorded by the cleaning pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CleaningOp {
    /// Column names were normalized.
    NormalizeNames,
    /// Two or more columns normalized to the same name and were suffixed.
    NameCollision,
    /// A column was parsed to its semantic type.
    CoerceTypes,
    /// Exact duplicate rows were removed.
    RemoveDuplicates,
    /// Columns over the missing threshold were dropped.
    DropColumns,
    /// Rows with missing values were dropped.
    DropRows,
    /// Missing values in a column were filled.
    Impute,
}

impl CleaningOp {
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::NormalizeNames => "Normalize Names",
            Self::NameCollision => "Name Collision",
            Self::CoerceTypes => "Coerce Types",
            Self::RemoveDuplicates => "Remove Duplicates",
            Self::DropColumns => "Drop Columns",
            Self::DropRows => "Drop Rows",
            Self::Impute => "Impute",
        }
    }
}

/// What a log entry applies to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogTarget {
    Table,
    Column(String),
    Columns(Vec<String>),
}

/// One immutable entry of the cleaning audit trail.
///
/// `params` holds the inputs of the decision (strategy, threshold, ...) and
/// `effect` what it did (counts, dropped names, fill values), so the ordered
/// log is enough to replay every decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleaningLogEntry {
    pub operation: CleaningOp,
    pub target: LogTarget,
    pub params: serde_json::Value,
    pub effect: serde_json::Value,
    /// Human-readable one-line summary.
    pub summary: String,
}

impl CleaningLogEntry {
    pub fn new(operation: CleaningOp, target: LogTarget, summary: impl Into<String>) -> Self {
        Self {
            operation,
            target,
            params: serde_json::Value::Null,
            effect: serde_json::Value::Null,
            summary: summary.into(),
        }
    }

    pub fn with_params(mut self, params: serde_json::Value) -> Self {
        self.params = params;
        self
    }

    pub fn with_effect(mut self, effect: serde_json::Value) -> Self {
        self.effect = effect;
        self
    }
}

// ============================================================================
// Column Profiles
// ============================================================================

/// Shape class derived from skewness and excess kurtosis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistributionClass {
    ApproximatelyNormal,
    HeavyOrLightTailed,
    RightSkewed,
    LeftSkewed,
}

impl DistributionClass {
    /// Classify from skewness and excess kurtosis.
    pub fn classify(skewness: f64, kurtosis: f64) -> Self {
        if skewness.abs() < 0.5 {
            if kurtosis.abs() < 0.5 {
                Self::ApproximatelyNormal
            } else {
                Self::HeavyOrLightTailed
            }
        } else if skewness > 0.0 {
            Self::RightSkewed
        } else {
            Self::LeftSkewed
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::ApproximatelyNormal => "Approximately Normal",
            Self::HeavyOrLightTailed => "Normal with heavy/light tails",
            Self::RightSkewed => "Right-skewed (positive skew)",
            Self::LeftSkewed => "Left-skewed (negative skew)",
        }
    }
}

/// Outliers of a single column under one method.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlierSet {
    pub method: crate::config::OutlierMethod,
    /// Lower acceptance bound (IQR only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lower_bound: Option<f64>,
    /// Upper acceptance bound (IQR only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upper_bound: Option<f64>,
    /// Row indices of the outlying values, ascending.
    pub indices: Vec<usize>,
    /// The outlying values, in row order.
    pub values: Vec<f64>,
    /// Outliers as a percentage of non-missing values.
    pub percentage: f64,
}

impl OutlierSet {
    pub fn count(&self) -> usize {
        self.indices.len()
    }
}

/// Descriptive statistics of one numeric column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnProfile {
    pub name: String,
    /// Number of non-missing values.
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    /// Sample standard deviation (n - 1).
    pub std: f64,
    pub skewness: f64,
    /// Excess kurtosis.
    pub kurtosis: f64,
    pub min: f64,
    pub max: f64,
    pub q1: f64,
    pub q3: f64,
    pub distribution: DistributionClass,
    pub outliers: OutlierSet,
}

// ============================================================================
// Insights
// ============================================================================

/// Category of a ranked insight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightCategory {
    DataQuality,
    Distribution,
    Relationships,
    Segmentation,
    AnomalyDetection,
}

impl InsightCategory {
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::DataQuality => "Data Quality",
            Self::Distribution => "Distribution",
            Self::Relationships => "Relationships",
            Self::Segmentation => "Segmentation",
            Self::AnomalyDetection => "Anomaly Detection",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    High,
    Medium,
}

/// A ranked, human-readable finding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    /// 1-based position in the ranked output.
    pub rank: usize,
    pub category: InsightCategory,
    pub severity: Severity,
    pub title: String,
    pub description: String,
    pub impact: String,
    /// Engine-specific supporting data.
    pub evidence: serde_json::Value,
}

// ============================================================================
// Tests
// ============================================================================
