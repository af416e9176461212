//! Imputation module for handling missing values.
//!
//! This module provides the statistical imputation strategies used by the
//! cleaning pipeline (median, mean, mode, forward/backward fill).

mod statistical;

pub use statistical::{StatisticalImputer, UNKNOWN_PLACEHOLDER};
