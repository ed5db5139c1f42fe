// Only compile UI module when TUI feature is enabled
#[cfg(feature = "tui")]
mod ui;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sales_insights::{
    analyze_reviews, analyze_turnover, init_tracing, join_sales_with_sellers, load_order_items,
    load_reviews, load_sellers, report, run_forecast_pipeline, AppConfig,
    ForecastReport, Lexicon, MissingPolicy, ModelKind, SalesSources, WeekdayFallback,
};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Parser)]
#[command(name = "sales-insights")]
#[command(about = "Daily sales forecasting, turnover ranking and review sentiment", long_about = None)]
#[command(version)]
struct Cli {
    /// JSON config file (missing fields take defaults)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding the CSV exports
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Forecast daily item sales per category
    Forecast {
        /// Model type (seasonal_smoothing, auto_arima)
        #[arg(short, long)]
        model: Option<ModelKind>,

        /// Number of days to forecast
        #[arg(long)]
        horizon: Option<usize>,

        /// Which cells count as missing (calendar_gaps, zero_as_missing)
        #[arg(long)]
        missing_policy: Option<MissingPolicy>,

        /// Fill for weekdays with no known value (column_mean, zero, unresolved)
        #[arg(long)]
        fallback: Option<WeekdayFallback>,

        /// Directory for forecast.csv and forecast_report.json
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Rank sellers and products by turnover
    Turnover {
        /// Length of top/bottom lists
        #[arg(long)]
        top: Option<usize>,
    },

    /// Review sentiment per product and seller
    Sentiment {
        /// Length of best/worst lists
        #[arg(long)]
        top: Option<usize>,

        /// JSON lexicon replacing the built-in one
        #[arg(long)]
        lexicon: Option<PathBuf>,
    },

    /// Classify a single comment (reads one line from stdin without --text)
    Classify {
        #[arg(long)]
        text: Option<String>,

        /// JSON lexicon replacing the built-in one
        #[arg(long)]
        lexicon: Option<PathBuf>,
    },

    /// Browse history and forecast charts in the terminal
    View {
        /// Model type (seasonal_smoothing, auto_arima)
        #[arg(short, long)]
        model: Option<ModelKind>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(dir) = &cli.data_dir {
        config.data.data_dir = dir.clone();
    }
    if let Some(level) = &cli.log_level {
        config.log.level = level.clone();
    }
    if cli.json_logs {
        config.log.json = true;
    }
    init_tracing(&config.log);

    match cli.command {
        Commands::Forecast {
            model,
            horizon,
            missing_policy,
            fallback,
            output,
        } => {
            if let Some(model) = model {
                config.forecast.model_kind = model;
            }
            if let Some(horizon) = horizon {
                config.forecast.horizon_days = horizon;
            }
            if let Some(policy) = missing_policy {
                config.imputation.missing_policy = policy;
            }
            if let Some(fallback) = fallback {
                config.imputation.fallback = fallback;
            }
            config.validate().context("Invalid forecast options")?;
            run_forecast(&config, output.as_deref())?;
        }
        Commands::Turnover { top } => {
            if let Some(top) = top {
                config.ranking.top_n = top;
            }
            config.validate().context("Invalid turnover options")?;
            run_turnover(&config)?;
        }
        Commands::Sentiment { top, lexicon } => {
            if let Some(top) = top {
                config.ranking.top_n = top;
            }
            if lexicon.is_some() {
                config.ranking.lexicon_path = lexicon;
            }
            config.validate().context("Invalid sentiment options")?;
            run_sentiment(&config)?;
        }
        Commands::Classify { text, lexicon } => {
            let path = lexicon.or_else(|| config.ranking.lexicon_path.clone());
            run_classify(text, path.as_deref())?;
        }
        Commands::View { model } => {
            let config = view_config(config, model)?;
            run_view(&config)?;
        }
    }

    Ok(())
}

/// Apply `view` flags, then validate like every other subcommand
fn view_config(mut config: AppConfig, model: Option<ModelKind>) -> Result<AppConfig> {
    if let Some(model) = model {
        config.forecast.model_kind = model;
    }
    config.validate().context("Invalid view options")?;
    Ok(config)
}

fn build_forecast(config: &AppConfig) -> Result<ForecastReport> {
    println!("📂 Loading sales data from {}...", config.data.data_dir.display());
    let sources = SalesSources::load(&config.data).context("Failed to load sales sources")?;
    let records = sources.join();
    println!("✓ Joined {} order items", records.len());

    println!("\n🔮 Fitting {} models...", config.forecast.model_kind);
    let report = run_forecast_pipeline(&records, &config.imputation, &config.forecast)
        .context("Failed to build the daily sales matrix")?;
    Ok(report)
}

fn run_forecast(config: &AppConfig, output: Option<&Path>) -> Result<()> {
    let forecast = build_forecast(config)?;

    println!();
    print!("{}", report::render_forecast(&forecast));

    if let Some(dir) = output {
        let written = report::export_forecast(&forecast, dir)
            .with_context(|| format!("Failed to export forecast to {}", dir.display()))?;
        println!();
        for path in written {
            println!("💾 Wrote {}", path.display());
        }
    }

    Ok(())
}

fn run_turnover(config: &AppConfig) -> Result<()> {
    println!("📂 Loading sales data from {}...", config.data.data_dir.display());
    let sources = SalesSources::load(&config.data).context("Failed to load sales sources")?;
    let sellers = load_sellers(&config.data.sellers_path()).context("Failed to load sellers")?;

    let records = join_sales_with_sellers(&sources.join(), &sellers);
    println!("✓ {} order items with a known seller\n", records.len());

    let summary = analyze_turnover(&records, &sources.products, config.ranking.top_n);
    print!("{}", report::render_turnover(&summary));
    Ok(())
}

fn run_sentiment(config: &AppConfig) -> Result<()> {
    let lexicon = Lexicon::load(config.ranking.lexicon_path.as_deref())
        .context("Failed to load sentiment lexicon")?;

    println!("📂 Loading reviews from {}...", config.data.data_dir.display());
    let reviews = load_reviews(&config.data.order_reviews_path()).context("Failed to load reviews")?;
    let items = load_order_items(&config.data.order_items_path()).context("Failed to load order items")?;
    let sellers = load_sellers(&config.data.sellers_path()).context("Failed to load sellers")?;
    info!(
        reviews = reviews.len(),
        items = items.len(),
        sellers = sellers.len(),
        "review sources loaded"
    );
    println!("✓ Loaded {} reviews\n", reviews.len());

    let analysis = analyze_reviews(
        &reviews,
        &items,
        &sellers,
        &lexicon,
        config.ranking.top_n,
        &config.ranking.price_keywords,
    );
    print!("{}", report::render_sentiment(&analysis));
    Ok(())
}

fn run_classify(text: Option<String>, lexicon_path: Option<&Path>) -> Result<()> {
    let lexicon = Lexicon::load(lexicon_path).context("Failed to load sentiment lexicon")?;

    let comment = match text {
        Some(text) => text,
        None => {
            print!("Enter a comment for classification: ");
            io::stdout().flush().context("Failed to flush stdout")?;
            let mut line = String::new();
            io::stdin()
                .lock()
                .read_line(&mut line)
                .context("Failed to read comment from stdin")?;
            line
        }
    };

    println!("The comment is {}.", lexicon.classify_comment(&comment));
    Ok(())
}

#[cfg(feature = "tui")]
fn run_view(config: &AppConfig) -> Result<()> {
    println!("🖥️  Loading Sales Insights charts...\n");
    let forecast = build_forecast(config)?;

    println!("✓ {} categories forecast, {} failed\n", forecast.succeeded(), forecast.failed());
    println!("Starting UI... (Press 'q' to quit)\n");

    let mut app = ui::App::new(forecast);
    ui::run_ui(&mut app)?;

    println!("\n✅ UI closed successfully");
    Ok(())
}

#[cfg(not(feature = "tui"))]
fn run_view(_config: &AppConfig) -> Result<()> {
    eprintln!("❌ TUI mode not available!");
    eprintln!("   Rebuild with: cargo build --features tui");
    std::process::exit(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_view_config_applies_model() {
        let config = view_config(AppConfig::default(), Some(ModelKind::AutoArima)).unwrap();
        assert_eq!(config.forecast.model_kind, ModelKind::AutoArima);
    }

    #[test]
    fn test_view_config_rejects_invalid_config() {
        let mut config = AppConfig::default();
        config.forecast.horizon_days = 0;
        assert!(view_config(config, None).is_err());

        let mut config = AppConfig::default();
        config.forecast.seasonal_period = 1;
        assert!(view_config(config, Some(ModelKind::SeasonalSmoothing)).is_err());
    }
}
