//! Error types for the analysis pipeline.
//!
//! Row-level problems never surface here: malformed rows are dropped and
//! counted by the normalizer. `AnalysisError` covers schema-level failures
//! where the input table itself cannot be read.

use polars::prelude::PolarsError;
use thiserror::Error;

/// Errors raised while reading a transaction table.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// A required column is absent from the input table.
    #[error("Required column '{column}' not found in transaction table")]
    MissingColumn {
        /// Name the column was looked up under
        column: String,
    },

    /// The input table holds a different number of rows per column.
    #[error("Column '{column}' has {actual} rows, expected {expected}")]
    RaggedColumn {
        column: String,
        expected: usize,
        actual: usize,
    },

    /// A column could not be read with the type the analysis needs.
    #[error(transparent)]
    Polars(#[from] PolarsError),
}
