// 🔮 Forecaster - one model per category, failures isolated
//
// Each category column of the filled matrix is fitted on its own. A
// category that cannot be fitted is recorded as a CategoryForecastError and
// left out of the table; the run always continues with the rest.

use crate::aggregation::{aggregate_daily, DailySalesMatrix};
use crate::error::{AggregationError, CategoryForecastError};
use crate::imputation::{fill_gaps, ImputationConfig, ImputationReport};
use crate::loader::OrderItemRecord;
use crate::models::arima::{ArimaSearch, AutoArima};
use crate::models::smoothing::HoltWinters;
use crate::models::{self, Predictor};
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info, warn};

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Which model family every category is fitted with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    /// Additive Holt-Winters with a weekly season
    #[default]
    SeasonalSmoothing,
    /// Non-seasonal ARIMA with automatic order selection
    AutoArima,
}

impl ModelKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelKind::SeasonalSmoothing => "seasonal_smoothing",
            ModelKind::AutoArima => "auto_arima",
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "seasonal_smoothing" | "holt_winters" => Ok(ModelKind::SeasonalSmoothing),
            "auto_arima" | "arima" => Ok(ModelKind::AutoArima),
            other => Err(format!(
                "unknown model '{}' (expected seasonal_smoothing or auto_arima)",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    pub model_kind: ModelKind,
    pub horizon_days: usize,
    pub seasonal_period: usize,
    pub arima: ArimaSearch,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        ForecastConfig {
            model_kind: ModelKind::SeasonalSmoothing,
            horizon_days: 14,
            seasonal_period: 7,
            arima: ArimaSearch::default(),
        }
    }
}

/// Fit the configured model on one series
pub fn fit_model(config: &ForecastConfig, data: &[f64]) -> models::Result<Box<dyn Predictor>> {
    match config.model_kind {
        ModelKind::SeasonalSmoothing => {
            let model = HoltWinters::auto(data, config.seasonal_period)?;
            Ok(Box::new(model))
        }
        ModelKind::AutoArima => {
            let mut model = AutoArima::new(config.arima);
            model.fit(data)?;
            Ok(Box::new(model))
        }
    }
}

// ============================================================================
// OUTPUT TYPES
// ============================================================================

/// Forecast for one category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastSeries {
    pub category: String,
    /// Description of the fitted model, e.g. "AutoARIMA ARIMA(1,1,0)"
    pub model: String,
    pub points: Vec<(NaiveDate, f64)>,
}

impl ForecastSeries {
    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|(_, v)| *v).collect()
    }
}

/// Per-category result: a forecast or the reason there is none
pub type CategoryOutcome = Result<ForecastSeries, CategoryForecastError>;

/// Successful forecasts side by side, indexed by future day
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ForecastTable {
    pub days: Vec<NaiveDate>,
    /// Category → one value per entry of `days`
    pub columns: BTreeMap<String, Vec<f64>>,
}

impl ForecastTable {
    pub fn from_series(days: Vec<NaiveDate>, series: &[ForecastSeries]) -> Self {
        let columns = series
            .iter()
            .map(|s| (s.category.clone(), s.values()))
            .collect();
        ForecastTable { days, columns }
    }

    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Everything one forecast run produced
#[derive(Debug, Clone, Serialize)]
pub struct ForecastReport {
    pub model_kind: ModelKind,
    pub horizon_days: usize,
    pub table: ForecastTable,
    pub series: Vec<ForecastSeries>,
    pub failures: Vec<CategoryForecastError>,
    pub imputation: ImputationReport,
    /// Filled history the models were fitted on
    #[serde(skip_serializing)]
    pub history: DailySalesMatrix,
}

impl ForecastReport {
    pub fn succeeded(&self) -> usize {
        self.series.len()
    }

    pub fn failed(&self) -> usize {
        self.failures.len()
    }
}

// ============================================================================
// FORECASTING
// ============================================================================

/// The `horizon` days following `last_day`
pub fn future_days(last_day: NaiveDate, horizon: usize) -> Vec<NaiveDate> {
    (1..=horizon)
        .map(|h| last_day + Duration::days(h as i64))
        .collect()
}

/// Fit and forecast a single category
pub fn forecast_category(
    category: &str,
    values: &[f64],
    days: &[NaiveDate],
    config: &ForecastConfig,
) -> CategoryOutcome {
    let attempt = fit_model(config, values).and_then(|model| {
        let forecast = model.predict(days.len())?;
        Ok((model.describe(), forecast))
    });

    match attempt {
        Ok((model, forecast)) => {
            debug!(category, model = %model, "category forecast ready");
            Ok(ForecastSeries {
                category: category.to_string(),
                model,
                points: days.iter().copied().zip(forecast).collect(),
            })
        }
        Err(err) => {
            let failure = CategoryForecastError::new(category, &err);
            warn!(category, error = %err, "{}", failure);
            Err(failure)
        }
    }
}

/// Forecast every column of `matrix`, in category order
pub fn forecast_matrix(matrix: &DailySalesMatrix, config: &ForecastConfig) -> Vec<CategoryOutcome> {
    let Some(last_day) = matrix.last_day() else {
        return Vec::new();
    };
    let days = future_days(last_day, config.horizon_days);

    matrix
        .iter_columns()
        .map(|(category, values)| forecast_category(category, values, &days, config))
        .collect()
}

/// Split outcomes into the report pieces
pub fn collect_outcomes(
    days: Vec<NaiveDate>,
    outcomes: Vec<CategoryOutcome>,
) -> (ForecastTable, Vec<ForecastSeries>, Vec<CategoryForecastError>) {
    let mut series = Vec::new();
    let mut failures = Vec::new();
    for outcome in outcomes {
        match outcome {
            Ok(s) => series.push(s),
            Err(f) => failures.push(f),
        }
    }
    let table = ForecastTable::from_series(days, &series);
    (table, series, failures)
}

/// Aggregate → fill → forecast
///
/// Only an empty input is fatal; per-category problems end up in
/// `ForecastReport::failures`.
pub fn run_forecast_pipeline(
    records: &[OrderItemRecord],
    imputation: &ImputationConfig,
    config: &ForecastConfig,
) -> Result<ForecastReport, AggregationError> {
    let matrix = aggregate_daily(records)?;
    let (filled, imputation_report) = fill_gaps(&matrix, imputation);
    Ok(forecast_filled(filled, imputation_report, config))
}

/// Forecast an already filled matrix
pub fn forecast_filled(
    filled: DailySalesMatrix,
    imputation: ImputationReport,
    config: &ForecastConfig,
) -> ForecastReport {
    let days = filled
        .last_day()
        .map(|last| future_days(last, config.horizon_days))
        .unwrap_or_default();

    let outcomes = forecast_matrix(&filled, config);
    let (table, series, failures) = collect_outcomes(days, outcomes);

    info!(
        model = %config.model_kind,
        horizon_days = config.horizon_days,
        succeeded = series.len(),
        failed = failures.len(),
        "forecast run complete"
    );

    ForecastReport {
        model_kind: config.model_kind,
        horizon_days: config.horizon_days,
        table,
        series,
        failures,
        imputation,
        history: filled,
    }
}

// ============================================================================
// TESTS
// ============================================================================
