// ⚙️ Configuration - data locations, pipeline policies, logging
//
// Layering:
//   1. Defaults (every field has one)
//   2. Optional JSON config file (`--config`)
//   3. CLI overrides applied by the binary

use crate::error::ConfigError;
use crate::forecasting::ForecastConfig;
use crate::imputation::ImputationConfig;
use crate::models::arima::{MAX_DIFF, MAX_ORDER};
use crate::models::smoothing::MAX_PERIOD;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

// ============================================================================
// DATA PATHS
// ============================================================================

/// Where the CSV exports live
///
/// File names default to the names of the public dataset export and can be
/// overridden one by one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataPaths {
    pub data_dir: PathBuf,
    pub orders: String,
    pub order_items: String,
    pub products: String,
    pub category_translation: String,
    pub sellers: String,
    pub order_reviews: String,
}

impl Default for DataPaths {
    fn default() -> Self {
        DataPaths {
            data_dir: PathBuf::from("data"),
            orders: "orders.csv".to_string(),
            order_items: "order_items.csv".to_string(),
            products: "products.csv".to_string(),
            category_translation: "product_category_name_translation.csv".to_string(),
            sellers: "sellers.csv".to_string(),
            order_reviews: "order_reviews.csv".to_string(),
        }
    }
}

impl DataPaths {
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        DataPaths {
            data_dir: data_dir.into(),
            ..Default::default()
        }
    }

    pub fn orders_path(&self) -> PathBuf {
        self.data_dir.join(&self.orders)
    }

    pub fn order_items_path(&self) -> PathBuf {
        self.data_dir.join(&self.order_items)
    }

    pub fn products_path(&self) -> PathBuf {
        self.data_dir.join(&self.products)
    }

    pub fn category_translation_path(&self) -> PathBuf {
        self.data_dir.join(&self.category_translation)
    }

    pub fn sellers_path(&self) -> PathBuf {
        self.data_dir.join(&self.sellers)
    }

    pub fn order_reviews_path(&self) -> PathBuf {
        self.data_dir.join(&self.order_reviews)
    }
}

// ============================================================================
// ANALYSIS SETTINGS
// ============================================================================

/// Settings for turnover and review rankings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RankingConfig {
    /// Length of top/bottom lists
    pub top_n: usize,
    /// Words that flag a review as talking about price
    pub price_keywords: Vec<String>,
    /// Optional JSON lexicon replacing the built-in one
    pub lexicon_path: Option<PathBuf>,
}

impl Default for RankingConfig {
    fn default() -> Self {
        RankingConfig {
            top_n: 10,
            price_keywords: vec![
                "price".to_string(),
                "preço".to_string(),
                "preco".to_string(),
            ],
            lexicon_path: None,
        }
    }
}

/// Logging settings (RUST_LOG wins when set)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            level: "info".to_string(),
            json: false,
        }
    }
}

// ============================================================================
// APP CONFIG
// ============================================================================

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub data: DataPaths,
    pub imputation: ImputationConfig,
    pub forecast: ForecastConfig,
    pub ranking: RankingConfig,
    pub log: LogConfig,
}

impl AppConfig {
    /// Load configuration from a JSON file; missing fields take defaults
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;

        let config: AppConfig =
            serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
                path: path.display().to_string(),
                source,
            })?;

        config.validate()?;
        Ok(config)
    }

    /// Load from `path` when given, defaults otherwise
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => Self::from_file(p),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.forecast.horizon_days == 0 {
            return Err(ConfigError::Invalid(
                "forecast.horizon_days must be > 0".to_string(),
            ));
        }
        if !(2..=MAX_PERIOD).contains(&self.forecast.seasonal_period) {
            return Err(ConfigError::Invalid(format!(
                "forecast.seasonal_period must be between 2 and {}",
                MAX_PERIOD
            )));
        }
        let search = &self.forecast.arima;
        if search.max_p > MAX_ORDER || search.max_q > MAX_ORDER {
            return Err(ConfigError::Invalid(format!(
                "forecast.arima.max_p and max_q must be <= {}",
                MAX_ORDER
            )));
        }
        if search.max_d > MAX_DIFF {
            return Err(ConfigError::Invalid(format!(
                "forecast.arima.max_d must be <= {}",
                MAX_DIFF
            )));
        }
        if self.ranking.top_n == 0 {
            return Err(ConfigError::Invalid("ranking.top_n must be > 0".to_string()));
        }
        Ok(())
    }
}

// ============================================================================
// TRACING
// ============================================================================

/// Initializes tracing using the configured level as the default filter
pub fn init_tracing(log: &LogConfig) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_directive = format!("sales_insights={}", log.level);
    let filter_directive = std::env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);

    // Logs go to stderr so report tables on stdout stay clean
    if log.json {
        let _ = fmt()
            .with_env_filter(EnvFilter::new(filter_directive))
            .with_writer(std::io::stderr)
            .json()
            .try_init();
    } else {
        let _ = fmt()
            .with_env_filter(EnvFilter::new(filter_directive))
            .with_writer(std::io::stderr)
            .try_init();
    }
}
