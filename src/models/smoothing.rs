//! Additive Holt-Winters (triple exponential smoothing)
//!
//! Level, trend and seasonal components are all additive:
//!
//! - `ℓ_t = α (y_t − s_{t−m}) + (1 − α)(ℓ_{t−1} + b_{t−1})`
//! - `b_t = β (ℓ_t − ℓ_{t−1}) + (1 − β) b_{t−1}`
//! - `s_t = γ (y_t − ℓ_t) + (1 − γ) s_{t−m}`
//! - `ŷ_{n+h} = ℓ_n + h b_n + s_{n+h−m}`
//!
//! [`HoltWinters::auto`] picks α, β, γ from a fixed grid by one-step-ahead
//! SSE, so fits are reproducible.

use super::{ensure_finite, Predictor, Result};
use crate::error::ModelError;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Candidate values for α, β and γ, searched in this order
pub const PARAMETER_GRID: [f64; 11] = [0.01, 0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8, 0.9, 0.99];

/// Longest accepted seasonal cycle (a year of daily data)
pub const MAX_PERIOD: usize = 366;

/// Holt-Winters model with additive trend and additive seasonality
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HoltWinters {
    /// Level smoothing parameter
    alpha: f64,
    /// Trend smoothing parameter
    beta: f64,
    /// Seasonal smoothing parameter
    gamma: f64,
    /// Seasonal period length
    period: usize,
    /// Current level
    level: f64,
    /// Current trend
    trend: f64,
    /// Seasonal components, indexed by `t mod period`
    seasonal: Vec<f64>,
    /// Number of observations seen by `fit`
    n_obs: usize,
    /// One-step-ahead sum of squared errors from the last fit
    sse: f64,
    /// Whether model has been fitted
    fitted: bool,
}

impl HoltWinters {
    /// Create a new model with fixed smoothing parameters
    ///
    /// # Arguments
    ///
    /// * `alpha` - Level smoothing (0 < alpha < 1)
    /// * `beta` - Trend smoothing (0 < beta < 1)
    /// * `gamma` - Seasonal smoothing (0 < gamma < 1)
    /// * `period` - Number of observations per seasonal cycle (≥ 2)
    pub fn new(alpha: f64, beta: f64, gamma: f64, period: usize) -> Result<Self> {
        for (name, value) in [("alpha", alpha), ("beta", beta), ("gamma", gamma)] {
            if !(0.0 < value && value < 1.0) {
                return Err(ModelError::InvalidParameter {
                    name: name.to_string(),
                    reason: "must be between 0 and 1 (exclusive)".to_string(),
                });
            }
        }
        if !(2..=MAX_PERIOD).contains(&period) {
            return Err(ModelError::InvalidParameter {
                name: "period".to_string(),
                reason: format!("must be between 2 and {}", MAX_PERIOD),
            });
        }

        Ok(Self {
            alpha,
            beta,
            gamma,
            period,
            level: 0.0,
            trend: 0.0,
            seasonal: Vec::new(),
            n_obs: 0,
            sse: 0.0,
            fitted: false,
        })
    }

    /// Fit with α, β, γ chosen from [`PARAMETER_GRID`] by lowest SSE
    ///
    /// Ties keep the first combination in grid order.
    pub fn auto(data: &[f64], period: usize) -> Result<Self> {
        // Validates the period and the data once, up front
        let mut probe = Self::new(0.5, 0.5, 0.5, period)?;
        probe.check_data(data)?;

        let mut best: Option<(f64, f64, f64, f64)> = None;
        for &alpha in &PARAMETER_GRID {
            for &beta in &PARAMETER_GRID {
                for &gamma in &PARAMETER_GRID {
                    probe.alpha = alpha;
                    probe.beta = beta;
                    probe.gamma = gamma;
                    let sse = probe.run(data);
                    if !sse.is_finite() {
                        continue;
                    }
                    if best.map_or(true, |(b, ..)| sse < b) {
                        best = Some((sse, alpha, beta, gamma));
                    }
                }
            }
        }

        let (sse, alpha, beta, gamma) = best.ok_or_else(|| {
            ModelError::NumericalError("No smoothing parameters gave a finite fit".to_string())
        })?;
        debug!(alpha, beta, gamma, sse, "selected Holt-Winters parameters");

        let mut model = Self::new(alpha, beta, gamma, period)?;
        model.fit(data)?;
        Ok(model)
    }

    /// Get all components: (level, trend, seasonal)
    pub fn components(&self) -> (f64, f64, &[f64]) {
        (self.level, self.trend, &self.seasonal)
    }

    /// Get smoothing parameters: (alpha, beta, gamma)
    pub fn params(&self) -> (f64, f64, f64) {
        (self.alpha, self.beta, self.gamma)
    }

    /// One-step-ahead SSE of the last fit
    pub fn sse(&self) -> f64 {
        self.sse
    }

    fn check_data(&self, data: &[f64]) -> Result<()> {
        let min_required = self.period * 2;
        if data.len() < min_required {
            return Err(ModelError::InsufficientData {
                required: min_required,
                actual: data.len(),
            });
        }
        ensure_finite(data)
    }

    fn initialize(&mut self, data: &[f64]) {
        let m = self.period;
        let first_season_avg = data[..m].iter().sum::<f64>() / m as f64;
        let second_season_avg = data[m..2 * m].iter().sum::<f64>() / m as f64;

        self.level = first_season_avg;
        self.trend = (second_season_avg - first_season_avg) / m as f64;
        self.seasonal = data[..m].iter().map(|x| x - first_season_avg).collect();
    }

    /// Run the smoothing recursions over `data`, returning the SSE
    fn run(&mut self, data: &[f64]) -> f64 {
        self.initialize(data);

        let mut sse = 0.0;
        for (i, &value) in data.iter().enumerate().skip(self.period) {
            let slot = i % self.period;
            let prev_level = self.level;
            let prev_seasonal = self.seasonal[slot];

            let forecast = prev_level + self.trend + prev_seasonal;
            let error = value - forecast;
            sse += error * error;

            self.level =
                self.alpha * (value - prev_seasonal) + (1.0 - self.alpha) * (prev_level + self.trend);
            self.trend = self.beta * (self.level - prev_level) + (1.0 - self.beta) * self.trend;
            self.seasonal[slot] =
                self.gamma * (value - self.level) + (1.0 - self.gamma) * prev_seasonal;
        }

        self.n_obs = data.len();
        sse
    }
}

impl Predictor for HoltWinters {
    fn fit(&mut self, data: &[f64]) -> Result<()> {
        self.check_data(data)?;
        self.sse = self.run(data);
        if !self.sse.is_finite() {
            return Err(ModelError::NumericalError(
                "Smoothing recursion diverged".to_string(),
            ));
        }
        self.fitted = true;
        Ok(())
    }

    fn predict(&self, steps: usize) -> Result<Vec<f64>> {
        if !self.fitted {
            return Err(ModelError::NotFitted);
        }

        let forecasts = (1..=steps)
            .map(|h| {
                let slot = (self.n_obs + h - 1) % self.period;
                self.level + h as f64 * self.trend + self.seasonal[slot]
            })
            .collect();

        Ok(forecasts)
    }

    fn is_fitted(&self) -> bool {
        self.fitted
    }

    fn describe(&self) -> String {
        format!(
            "HoltWinters(additive, m={}, α={:.2}, β={:.2}, γ={:.2})",
            self.period, self.alpha, self.beta, self.gamma
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WEEK: [f64; 7] = [10.0, 10.0, 10.0, 10.0, 10.0, 20.0, 20.0];

    #[test]
    fn test_parameter_validation() {
        assert!(HoltWinters::new(0.3, 0.1, 0.2, 7).is_ok());
        assert!(HoltWinters::new(0.0, 0.1, 0.2, 7).is_err());
        assert!(HoltWinters::new(0.3, 1.0, 0.2, 7).is_err());
        assert!(HoltWinters::new(0.3, 0.1, 0.2, 1).is_err());
        assert!(HoltWinters::new(0.3, 0.1, 0.2, MAX_PERIOD).is_ok());
        assert!(HoltWinters::new(0.3, 0.1, 0.2, MAX_PERIOD + 1).is_err());
    }

    #[test]
    fn test_huge_period_is_rejected_before_any_work() {
        let err = HoltWinters::auto(&[1.0; 30], usize::MAX).unwrap_err();
        assert!(matches!(err, ModelError::InvalidParameter { .. }));
    }

    #[test]
    fn test_constant_series_is_flat() {
        let data = vec![5.0; 30];
        let model = HoltWinters::auto(&data, 7).unwrap();
        let forecast = model.predict(14).unwrap();

        assert_eq!(forecast.len(), 14);
        for value in forecast {
            assert!((value - 5.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_weekly_pattern_continues_after_partial_week() {
        // 30 days: the last observation is WEEK[1], so the forecast starts at WEEK[2]
        let data: Vec<f64> = (0..30).map(|i| WEEK[i % 7]).collect();
        let model = HoltWinters::auto(&data, 7).unwrap();
        let forecast = model.predict(14).unwrap();

        for (h, value) in forecast.iter().enumerate() {
            let expected = WEEK[(30 + h) % 7];
            assert!(
                (value - expected).abs() < 1e-6,
                "step {}: got {}, expected {}",
                h,
                value,
                expected
            );
        }
    }

    #[test]
    fn test_trend_is_extrapolated() {
        let data: Vec<f64> = (0..42).map(|i| 100.0 + 2.0 * i as f64 + WEEK[i % 7]).collect();
        let model = HoltWinters::auto(&data, 7).unwrap();
        let forecast = model.predict(7).unwrap();

        let last_week: f64 = data[35..].iter().sum();
        let next_week: f64 = forecast.iter().sum();
        assert!(next_week > last_week);
    }

    #[test]
    fn test_insufficient_data() {
        let err = HoltWinters::auto(&[1.0; 10], 7).unwrap_err();
        assert_eq!(
            err,
            ModelError::InsufficientData {
                required: 14,
                actual: 10
            }
        );
    }

    #[test]
    fn test_nan_rejected() {
        let mut data = vec![1.0; 21];
        data[4] = f64::NAN;
        assert!(matches!(
            HoltWinters::auto(&data, 7),
            Err(ModelError::InvalidData(_))
        ));
    }

    #[test]
    fn test_predict_before_fit() {
        let model = HoltWinters::new(0.3, 0.1, 0.2, 7).unwrap();
        assert_eq!(model.predict(3), Err(ModelError::NotFitted));
    }

    #[test]
    fn test_auto_is_deterministic() {
        let data: Vec<f64> = (0..60)
            .map(|i| 20.0 + (i as f64 * 0.7).sin() * 3.0 + WEEK[i % 7])
            .collect();
        let a = HoltWinters::auto(&data, 7).unwrap();
        let b = HoltWinters::auto(&data, 7).unwrap();

        assert_eq!(a.params(), b.params());
        assert_eq!(a.predict(14).unwrap(), b.predict(14).unwrap());
    }
}
