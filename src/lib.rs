// Sales Insights - Core Library
// Daily sales forecasting, turnover ranking and review sentiment over the
// e-commerce CSV exports. Used by the CLI and the integration tests.

pub mod error;
pub mod entities;
pub mod config;
pub mod loader;        // CSV tables + joins
pub mod aggregation;   // Daily Aggregator
pub mod imputation;    // Gap Filler
pub mod models;        // Holt-Winters, ARIMA, least squares
pub mod forecasting;   // Forecaster
pub mod turnover;      // Turnover ranking
pub mod sentiment;     // Review sentiment
pub mod report;        // Console tables + exports

// Re-export commonly used types
pub use error::{
    AggregationError, CategoryForecastError, ConfigError, DataSourceError, ModelError,
};
pub use entities::{
    CategoryTranslation, Order, OrderItem, Product, Review, Seller,
};
pub use config::{init_tracing, AppConfig, DataPaths, LogConfig, RankingConfig};
pub use loader::{
    join_sales, join_sales_with_sellers, load_order_items, load_orders, load_products,
    load_reviews, load_sellers, load_translations, OrderItemRecord, SalesSources,
};
pub use aggregation::{aggregate_daily, DailySalesMatrix};
pub use imputation::{
    fill_gaps, AmbiguousImputation, ImputationConfig, ImputationReport, MissingPolicy,
    WeekdayFallback,
};
pub use models::{
    arima::{ArimaSearch, AutoArima, Arima},
    smoothing::HoltWinters,
    Predictor,
};
pub use forecasting::{
    forecast_matrix, run_forecast_pipeline, CategoryOutcome, ForecastConfig, ForecastReport,
    ForecastSeries, ForecastTable, ModelKind,
};
pub use turnover::{analyze_turnover, Turnover, TurnoverSummary};
pub use sentiment::{
    analyze_reviews, classify_comment, clean_text, Lexicon, ReviewAnalysis, Sentiment,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
