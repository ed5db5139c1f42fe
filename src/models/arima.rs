//! Non-seasonal ARIMA with automatic order selection
//!
//! - `p`: autoregressive order
//! - `d`: degree of differencing
//! - `q`: moving-average order
//!
//! [`Arima`] is fitted with the two-stage Hannan–Rissanen procedure: a long
//! autoregression estimates the innovations, then one least-squares pass
//! regresses the differenced series on its own lags and the lagged
//! innovations. Residuals for the information criterion come from the
//! conditional-sum-of-squares recursion.
//!
//! [`AutoArima`] picks `d` with repeated KPSS level-stationarity tests and
//! then searches `(p, q)` by AIC.

use super::linalg::ols;
use super::{ensure_finite, Predictor, Result};
use crate::error::ModelError;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Highest AR or MA order a model accepts
pub const MAX_ORDER: usize = 10;

/// Highest differencing order a model accepts
pub const MAX_DIFF: usize = 2;

/// 5% critical value of the KPSS level-stationarity test
pub const KPSS_CRITICAL_5PCT: f64 = 0.463;

/// Residuals larger than this multiple of the series scale mean the
/// recursion has blown up
const EXPLOSION_FACTOR: f64 = 1e6;

/// AIC differences below this are ties
const AIC_TIE_EPS: f64 = 1e-9;

// ============================================================================
// DIFFERENCING & STATIONARITY
// ============================================================================

/// Apply `order` rounds of first differencing
pub fn difference(data: &[f64], order: usize) -> Vec<f64> {
    let mut result = data.to_vec();
    for _ in 0..order {
        result = result.windows(2).map(|w| w[1] - w[0]).collect();
    }
    result
}

/// KPSS statistic for level stationarity
///
/// Uses a Bartlett window with `trunc(4 · (n/100)^¼)` lags for the long-run
/// variance. A series with zero long-run variance scores 0.
pub fn kpss_stat(data: &[f64]) -> f64 {
    let n = data.len();
    if n < 2 {
        return 0.0;
    }

    let mean = data.iter().sum::<f64>() / n as f64;
    let residuals: Vec<f64> = data.iter().map(|x| x - mean).collect();

    let lags = (4.0 * (n as f64 / 100.0).powf(0.25)).trunc() as usize;
    let autocov = |lag: usize| -> f64 {
        residuals[lag..]
            .iter()
            .zip(&residuals)
            .map(|(a, b)| a * b)
            .sum::<f64>()
            / n as f64
    };

    let mut long_run_var = autocov(0);
    for lag in 1..=lags.min(n - 1) {
        let weight = 1.0 - lag as f64 / (lags as f64 + 1.0);
        long_run_var += 2.0 * weight * autocov(lag);
    }

    if long_run_var <= 1e-12 {
        return 0.0;
    }

    let mut partial = 0.0;
    let mut sum_sq = 0.0;
    for r in &residuals {
        partial += r;
        sum_sq += partial * partial;
    }

    sum_sq / ((n * n) as f64 * long_run_var)
}

/// Number of differences needed before the KPSS test stops rejecting
pub fn ndiffs(data: &[f64], max_d: usize) -> usize {
    let mut d = 0;
    while d < max_d {
        let series = difference(data, d);
        if series.len() < 3 || kpss_stat(&series) <= KPSS_CRITICAL_5PCT {
            break;
        }
        d += 1;
    }
    d
}

// ============================================================================
// ARIMA(p, d, q)
// ============================================================================

/// ARIMA model for time series forecasting
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Arima {
    /// AR order (p)
    p: usize,
    /// Differencing order (d)
    d: usize,
    /// MA order (q)
    q: usize,
    /// Whether a constant is estimated for the differenced series
    include_intercept: bool,
    /// Residuals before this index are left out of the SSE
    conditioning: usize,
    /// Constant term
    intercept: f64,
    /// AR coefficients (lag 1 first)
    ar_coeffs: Vec<f64>,
    /// MA coefficients (lag 1 first)
    ma_coeffs: Vec<f64>,
    /// Last value of the series at each differencing level below `d`
    level_tails: Vec<f64>,
    /// Differenced series seen by `fit`
    differenced: Vec<f64>,
    /// CSS residuals aligned with `differenced`
    residuals: Vec<f64>,
    /// Sum of squared residuals over the conditioning window
    sse: f64,
    /// Number of residuals in the SSE
    n_effective: usize,
    /// Whether the model has been fitted
    fitted: bool,
}

impl Arima {
    /// Create a new ARIMA model with specified orders
    ///
    /// # Arguments
    ///
    /// * `p` - Order of autoregressive component (0-10)
    /// * `d` - Degree of differencing (0-2)
    /// * `q` - Order of moving average component (0-10)
    pub fn new(p: usize, d: usize, q: usize) -> Result<Self> {
        if p > MAX_ORDER {
            return Err(ModelError::InvalidParameter {
                name: "p".to_string(),
                reason: "AR order must be <= 10".to_string(),
            });
        }
        if d > MAX_DIFF {
            return Err(ModelError::InvalidParameter {
                name: "d".to_string(),
                reason: "Differencing order must be <= 2".to_string(),
            });
        }
        if q > MAX_ORDER {
            return Err(ModelError::InvalidParameter {
                name: "q".to_string(),
                reason: "MA order must be <= 10".to_string(),
            });
        }

        Ok(Self {
            p,
            d,
            q,
            include_intercept: d < 2,
            conditioning: p,
            intercept: 0.0,
            ar_coeffs: vec![0.0; p],
            ma_coeffs: vec![0.0; q],
            level_tails: Vec::new(),
            differenced: Vec::new(),
            residuals: Vec::new(),
            sse: 0.0,
            n_effective: 0,
            fitted: false,
        })
    }

    pub fn with_intercept(mut self, include: bool) -> Self {
        self.include_intercept = include;
        self
    }

    /// Start the SSE window at `start` (never before `p`)
    ///
    /// Candidates compared by AIC need the same window.
    pub fn with_conditioning(mut self, start: usize) -> Self {
        self.conditioning = start;
        self
    }

    pub fn order(&self) -> (usize, usize, usize) {
        (self.p, self.d, self.q)
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    pub fn ar_coefficients(&self) -> &[f64] {
        &self.ar_coeffs
    }

    pub fn ma_coefficients(&self) -> &[f64] {
        &self.ma_coeffs
    }

    pub fn sse(&self) -> f64 {
        self.sse
    }

    /// Akaike information criterion from the CSS residuals
    pub fn aic(&self) -> f64 {
        let n = self.n_effective.max(1) as f64;
        let k = self.p + self.q + usize::from(self.include_intercept);
        n * (self.sse / n).max(1e-12).ln() + 2.0 * (k as f64 + 1.0)
    }

    fn min_required(&self) -> usize {
        self.p + self.d + self.q + 10
    }

    /// Regressor vector for index `t`: [1?, w_{t-1}..w_{t-p}, e_{t-1}..e_{t-q}]
    fn regressors(&self, w: &[f64], e: &[f64], t: usize) -> Vec<f64> {
        let mut row = Vec::with_capacity(1 + self.p + self.q);
        if self.include_intercept {
            row.push(1.0);
        }
        row.extend((1..=self.p).map(|i| w[t - i]));
        row.extend((1..=self.q).map(|j| e[t - j]));
        row
    }

    /// Stage one: residuals of a long autoregression stand in for innovations
    fn estimate_innovations(&self, w: &[f64], order: usize) -> Result<Vec<f64>> {
        let mut rows = Vec::with_capacity(w.len().saturating_sub(order));
        let mut targets = Vec::with_capacity(rows.capacity());
        for t in order..w.len() {
            let mut row = Vec::with_capacity(order + 1);
            if self.include_intercept {
                row.push(1.0);
            }
            row.extend((1..=order).map(|i| w[t - i]));
            rows.push(row);
            targets.push(w[t]);
        }

        let beta = ols(&rows, &targets)?;

        let mut innovations = vec![0.0; w.len()];
        for (t, row) in (order..w.len()).zip(&rows) {
            let fitted: f64 = row.iter().zip(&beta).map(|(x, b)| x * b).sum();
            innovations[t] = w[t] - fitted;
        }
        Ok(innovations)
    }

    /// One-step prediction of `w[t]` from everything before it
    fn one_step(&self, w: &[f64], e: &[f64], t: usize) -> f64 {
        let ar: f64 = self
            .ar_coeffs
            .iter()
            .enumerate()
            .filter(|(i, _)| t > *i)
            .map(|(i, phi)| phi * w[t - i - 1])
            .sum();
        let ma: f64 = self
            .ma_coeffs
            .iter()
            .enumerate()
            .filter(|(j, _)| t > *j)
            .map(|(j, theta)| theta * e[t - j - 1])
            .sum();
        self.intercept + ar + ma
    }
}

impl Predictor for Arima {
    fn fit(&mut self, data: &[f64]) -> Result<()> {
        let min_required = self.min_required();
        if data.len() < min_required {
            return Err(ModelError::InsufficientData {
                required: min_required,
                actual: data.len(),
            });
        }
        ensure_finite(data)?;

        self.level_tails = (0..self.d)
            .filter_map(|k| difference(data, k).last().copied())
            .collect();
        let w = difference(data, self.d);

        let (innovations, start) = if self.q > 0 {
            let long_order = self.p.max(self.q) + 5;
            let innovations = self.estimate_innovations(&w, long_order)?;
            (innovations, self.p.max(long_order + self.q))
        } else {
            (vec![0.0; w.len()], self.p)
        };

        // Stage two: regress w_t on its lags and the lagged innovations
        let mut rows = Vec::with_capacity(w.len().saturating_sub(start));
        let mut targets = Vec::with_capacity(rows.capacity());
        for t in start..w.len() {
            rows.push(self.regressors(&w, &innovations, t));
            targets.push(w[t]);
        }
        if rows.is_empty() {
            return Err(ModelError::InsufficientData {
                required: start + 1 + self.d,
                actual: data.len(),
            });
        }

        let beta = ols(&rows, &targets)?;
        let mut coeffs = beta.into_iter();
        self.intercept = if self.include_intercept {
            coeffs.next().unwrap_or(0.0)
        } else {
            0.0
        };
        self.ar_coeffs = coeffs.by_ref().take(self.p).collect();
        self.ma_coeffs = coeffs.take(self.q).collect();

        // Conditional sum of squares, innovations before `p` set to zero
        let mut residuals = vec![0.0; w.len()];
        for t in self.p..w.len() {
            residuals[t] = w[t] - self.one_step(&w, &residuals, t);
        }

        let window_start = self.conditioning.max(self.p);
        if window_start >= w.len() {
            return Err(ModelError::InsufficientData {
                required: window_start + 1 + self.d,
                actual: data.len(),
            });
        }

        let sse: f64 = residuals[window_start..].iter().map(|e| e * e).sum();
        let scale = 1.0 + w.iter().fold(0.0f64, |m, v| m.max(v.abs()));
        if !sse.is_finite() || residuals.iter().any(|e| e.abs() > EXPLOSION_FACTOR * scale) {
            return Err(ModelError::NumericalError(format!(
                "Residual recursion diverged for {}",
                self.describe()
            )));
        }

        self.sse = sse;
        self.n_effective = w.len() - window_start;
        self.differenced = w;
        self.residuals = residuals;
        self.fitted = true;
        Ok(())
    }

    fn predict(&self, steps: usize) -> Result<Vec<f64>> {
        if !self.fitted {
            return Err(ModelError::NotFitted);
        }

        let n = self.differenced.len();
        let mut w = self.differenced.clone();
        let mut e = self.residuals.clone();
        for _ in 0..steps {
            let t = w.len();
            let next = self.one_step(&w, &e, t);
            w.push(next);
            // Future innovations have expectation zero
            e.push(0.0);
        }

        let mut forecasts = w.split_off(n);
        for &tail in self.level_tails.iter().rev() {
            let mut acc = tail;
            for value in forecasts.iter_mut() {
                acc += *value;
                *value = acc;
            }
        }

        if forecasts.iter().any(|v| !v.is_finite()) {
            return Err(ModelError::NumericalError(
                "Forecast recursion produced a non-finite value".to_string(),
            ));
        }

        Ok(forecasts)
    }

    fn is_fitted(&self) -> bool {
        self.fitted
    }

    fn describe(&self) -> String {
        format!("ARIMA({},{},{})", self.p, self.d, self.q)
    }
}

// ============================================================================
// AUTOMATIC ORDER SELECTION
// ============================================================================

/// Bounds of the order search
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArimaSearch {
    pub max_p: usize,
    pub max_d: usize,
    pub max_q: usize,
}

impl Default for ArimaSearch {
    fn default() -> Self {
        ArimaSearch {
            max_p: 5,
            max_d: 2,
            max_q: 5,
        }
    }
}

/// ARIMA whose order is chosen at fit time
///
/// `d` comes from [`ndiffs`]; `(p, q)` minimise AIC over the search grid.
/// Ties go to the smaller `p + q`, then the smaller `p`, so the choice is
/// deterministic.
#[derive(Debug, Clone)]
pub struct AutoArima {
    search: ArimaSearch,
    selected: Option<Arima>,
}

impl AutoArima {
    pub fn new(search: ArimaSearch) -> Self {
        AutoArima {
            search,
            selected: None,
        }
    }

    /// Order of the selected model, once fitted
    pub fn selected_order(&self) -> Option<(usize, usize, usize)> {
        self.selected.as_ref().map(Arima::order)
    }

    fn is_better(candidate: &Arima, best: &Arima) -> bool {
        let diff = candidate.aic() - best.aic();
        if diff.abs() < AIC_TIE_EPS {
            let (cp, _, cq) = candidate.order();
            let (bp, _, bq) = best.order();
            (cp + cq, cp) < (bp + bq, bp)
        } else {
            diff < 0.0
        }
    }
}

impl Default for AutoArima {
    fn default() -> Self {
        Self::new(ArimaSearch::default())
    }
}

impl Predictor for AutoArima {
    fn fit(&mut self, data: &[f64]) -> Result<()> {
        ensure_finite(data)?;
        self.selected = None;

        let d = ndiffs(data, self.search.max_d.min(MAX_DIFF));
        let conditioning = self.search.max_p;

        let mut best: Option<Arima> = None;
        let mut first_error: Option<ModelError> = None;

        for p in 0..=self.search.max_p {
            for q in 0..=self.search.max_q {
                let attempt = Arima::new(p, d, q).map(|m| {
                    m.with_intercept(d < 2).with_conditioning(conditioning)
                });
                let mut candidate = match attempt {
                    Ok(m) => m,
                    Err(err) => {
                        first_error.get_or_insert(err);
                        continue;
                    }
                };

                if let Err(err) = candidate.fit(data) {
                    debug!(p, d, q, error = %err, "skipping ARIMA candidate");
                    first_error.get_or_insert(err);
                    continue;
                }

                let replace = match &best {
                    Some(current) => Self::is_better(&candidate, current),
                    None => true,
                };
                if replace {
                    best = Some(candidate);
                }
            }
        }

        let model = best.ok_or_else(|| {
            first_error.unwrap_or_else(|| {
                ModelError::NumericalError("No ARIMA candidate could be fitted".to_string())
            })
        })?;

        debug!(
            order = %model.describe(),
            aic = model.aic(),
            "selected ARIMA order"
        );
        self.selected = Some(model);
        Ok(())
    }

    fn predict(&self, steps: usize) -> Result<Vec<f64>> {
        self.selected
            .as_ref()
            .ok_or(ModelError::NotFitted)?
            .predict(steps)
    }

    fn is_fitted(&self) -> bool {
        self.selected.is_some()
    }

    fn describe(&self) -> String {
        match &self.selected {
            Some(model) => format!("AutoARIMA {}", model.describe()),
            None => "AutoARIMA (unfitted)".to_string(),
        }
    }
}
