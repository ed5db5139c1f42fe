// ⚠️ Error Taxonomy - fatal vs. isolated failures
//
// DataSourceError / AggregationError / ConfigError abort the run.
// ModelError stays inside a single category and is surfaced as a
// CategoryForecastError in the forecast report.

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// DATA SOURCES (fatal)
// ============================================================================

#[derive(Error, Debug)]
pub enum DataSourceError {
    /// File missing or unreadable
    #[error("Failed to read {source_name}: {source}")]
    Io {
        source_name: String,
        #[source]
        source: std::io::Error,
    },

    /// Header row lacks a column the pipeline depends on
    #[error("{source_name} is missing required column '{column}'")]
    MissingColumn { source_name: String, column: String },

    /// Row-level parse failure
    #[error("{source_name} line {line}: {message}")]
    Malformed {
        source_name: String,
        line: usize,
        message: String,
    },

    /// CSV framing error (bad quoting, ragged rows)
    #[error("CSV error in {source_name}: {source}")]
    Csv {
        source_name: String,
        #[source]
        source: csv::Error,
    },
}

// ============================================================================
// AGGREGATION (fatal)
// ============================================================================

#[derive(Error, Debug, PartialEq)]
pub enum AggregationError {
    #[error("No categorised order items to aggregate")]
    NoData,
}

// ============================================================================
// MODELS (isolated per category)
// ============================================================================

/// Errors raised by a single model fit or prediction
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    /// Insufficient data points for the operation
    #[error("Insufficient data: need at least {required} points, got {actual}")]
    InsufficientData { required: usize, actual: usize },

    /// Invalid parameter value
    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter { name: String, reason: String },

    /// Model has not been fitted yet
    #[error("Model must be fitted before prediction")]
    NotFitted,

    /// Singular system, non-finite residuals, no admissible candidate
    #[error("Numerical error: {0}")]
    NumericalError(String),

    /// NaN or infinite values in the series
    #[error("Invalid data: {0}")]
    InvalidData(String),
}

/// A category whose model could not be fitted or could not forecast.
///
/// Recorded in the report instead of aborting the run.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[error("Error processing category {category}: {message}")]
pub struct CategoryForecastError {
    pub category: String,
    pub message: String,
}

impl CategoryForecastError {
    pub fn new(category: &str, error: &ModelError) -> Self {
        CategoryForecastError {
            category: category.to_string(),
            message: error.to_string(),
        }
    }
}

// ============================================================================
// CONFIGURATION (fatal)
// ============================================================================

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_error_message_names_category() {
        let err = CategoryForecastError::new(
            "toys",
            &ModelError::InsufficientData {
                required: 14,
                actual: 3,
            },
        );

        assert_eq!(err.category, "toys");
        assert_eq!(
            err.to_string(),
            "Error processing category toys: Insufficient data: need at least 14 points, got 3"
        );
    }

    #[test]
    fn test_missing_column_message() {
        let err = DataSourceError::MissingColumn {
            source_name: "orders.csv".to_string(),
            column: "order_id".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "orders.csv is missing required column 'order_id'"
        );
    }
}
