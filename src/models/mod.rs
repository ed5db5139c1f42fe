//! Time series models used by the forecaster
//!
//! - [`smoothing`]: additive Holt-Winters with a fitted parameter grid
//! - [`arima`]: non-seasonal ARIMA with automatic order selection
//! - [`linalg`]: the small least-squares solver both rely on

pub mod arima;
pub mod linalg;
pub mod smoothing;

use crate::error::ModelError;

/// Result type for model operations
pub type Result<T> = std::result::Result<T, ModelError>;

/// Common trait for the forecasting models
pub trait Predictor {
    /// Fit the model to historical data
    fn fit(&mut self, data: &[f64]) -> Result<()>;

    /// Predict `steps` future values
    fn predict(&self, steps: usize) -> Result<Vec<f64>>;

    /// Check if the model has been fitted
    fn is_fitted(&self) -> bool;

    /// Short human-readable description, e.g. "ARIMA(1,1,0)"
    fn describe(&self) -> String;
}

/// Reject NaN / infinite observations before any fitting
pub(crate) fn ensure_finite(data: &[f64]) -> Result<()> {
    if let Some(pos) = data.iter().position(|x| !x.is_finite()) {
        return Err(ModelError::InvalidData(format!(
            "Series contains a NaN or infinite value at position {}",
            pos
        )));
    }
    Ok(())
}
