// End-to-end runs over CSV fixtures written to a temp directory

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use sales_insights::{
    aggregate_daily, analyze_reviews, analyze_turnover, fill_gaps, join_sales_with_sellers,
    load_order_items, load_reviews, load_sellers, report, run_forecast_pipeline, DataPaths,
    DataSourceError, ForecastConfig, ImputationConfig, Lexicon, MissingPolicy, ModelKind,
    SalesSources, Sentiment, WeekdayFallback,
};
use std::fmt::Write as _;
use std::fs;
use tempfile::TempDir;

const DAYS: i64 = 28;
/// No order at all on this day offset (2018-01-10, a Wednesday)
const GAP_DAY: i64 = 9;

fn start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2018, 1, 1).unwrap()
}

/// toys: 3 items a day; books: 1 a day, 2 on weekends;
/// garden: 1 a day except Tuesdays; one untranslated product a day
fn write_fixtures() -> (TempDir, DataPaths) {
    let dir = tempfile::tempdir().unwrap();

    let mut orders = String::from("order_id,customer_id,order_status,order_purchase_timestamp\n");
    let mut items =
        String::from("order_id,order_item_id,product_id,seller_id,shipping_limit_date,price,freight_value\n");
    let mut reviews = String::from("review_id,order_id,review_score,review_comment_message\n");

    for offset in 0..DAYS {
        if offset == GAP_DAY {
            continue;
        }
        let day = start() + Duration::days(offset);
        let order_id = format!("o{:02}", offset);
        writeln!(orders, "{},c{},delivered,{} 10:30:00", order_id, offset, day).unwrap();

        let mut n = 0;
        let mut push = |product: &str, seller: &str, price: f64| {
            n += 1;
            writeln!(
                items,
                "{},{},{},{},{} 00:00:00,{:.2},5.0",
                order_id, n, product, seller, day, price
            )
            .unwrap();
        };

        for _ in 0..3 {
            push("toy-car", "seller-a", 20.0);
        }
        let books = match day.weekday() {
            Weekday::Sat | Weekday::Sun => 2,
            _ => 1,
        };
        for _ in 0..books {
            push("novel", "seller-b", 35.0);
        }
        if day.weekday() != Weekday::Tue {
            push("rake", "seller-c", 12.5);
        }
        push("mystery", "seller-a", 1.0);

        let (score, comment) = match offset % 3 {
            0 => (5, "Excellent product, arrived fast"),
            1 => (1, "Terrible, it arrived broken"),
            _ => (3, "Arrived on Tuesday"),
        };
        writeln!(reviews, "r{},{},{},\"{}\"", offset, order_id, score, comment).unwrap();
    }
    writeln!(reviews, "r-bare,o00,4,").unwrap();

    let products = "\
product_id,product_category_name,product_weight_g,product_length_cm,product_height_cm,product_width_cm
toy-car,brinquedos,300,10,5,5
novel,livros,450,20,15,3
rake,ferramentas_jardim,1500,120,10,30
mystery,sem_traducao,,,,
";
    let translations = "\
product_category_name,product_category_name_english
brinquedos,toys
livros,books
ferramentas_jardim,garden_tools
";
    let sellers = "\
seller_id,seller_zip_code_prefix,seller_city,seller_state
seller-a,13023,campinas,SP
seller-b,13844,mogi guacu,SP
seller-c,20031,rio de janeiro,RJ
";

    let paths = DataPaths::with_data_dir(dir.path());
    fs::write(paths.orders_path(), orders).unwrap();
    fs::write(paths.order_items_path(), items).unwrap();
    fs::write(paths.products_path(), products).unwrap();
    fs::write(paths.category_translation_path(), translations).unwrap();
    fs::write(paths.sellers_path(), sellers).unwrap();
    fs::write(paths.order_reviews_path(), reviews).unwrap();

    (dir, paths)
}

#[test]
fn test_forecast_end_to_end() {
    let (_dir, paths) = write_fixtures();
    let sources = SalesSources::load(&paths).unwrap();
    let records = sources.join();

    let matrix = aggregate_daily(&records).unwrap();
    assert_eq!(matrix.len(), DAYS as usize);
    assert_eq!(matrix.categories(), &["books", "garden_tools", "toys"]);
    assert!(!matrix.observed()[GAP_DAY as usize]);

    let (filled, imputation) = fill_gaps(&matrix, &ImputationConfig::default());
    let gap_day = start() + Duration::days(GAP_DAY);
    assert_eq!(filled.value(gap_day, "toys"), Some(3.0));
    assert_eq!(filled.value(gap_day, "books"), Some(1.0));
    assert_eq!(imputation.filled_cells, 3);

    let forecast = run_forecast_pipeline(&records, &ImputationConfig::default(), &ForecastConfig::default())
        .unwrap();

    assert!(forecast.failures.is_empty(), "{:?}", forecast.failures);
    assert_eq!(forecast.table.days.len(), 14);
    assert_eq!(forecast.table.days[0], NaiveDate::from_ymd_opt(2018, 1, 29).unwrap());

    for value in &forecast.table.columns["toys"] {
        assert!((value - 3.0).abs() < 1e-6);
    }
    for (day, value) in forecast.table.days.iter().zip(&forecast.table.columns["books"]) {
        let expected = match day.weekday() {
            Weekday::Sat | Weekday::Sun => 2.0,
            _ => 1.0,
        };
        assert!((value - expected).abs() < 1e-6, "{}: {}", day, value);
    }
    println!("{}", report::render_forecast(&forecast));
}

#[test]
fn test_unresolved_weekday_fails_only_that_category() {
    let (_dir, paths) = write_fixtures();
    let records = SalesSources::load(&paths).unwrap().join();

    let imputation = ImputationConfig {
        missing_policy: MissingPolicy::ZeroAsMissing,
        fallback: WeekdayFallback::Unresolved,
    };
    let forecast = run_forecast_pipeline(&records, &imputation, &ForecastConfig::default()).unwrap();

    assert_eq!(forecast.failures.len(), 1);
    assert_eq!(forecast.failures[0].category, "garden_tools");
    assert!(forecast.table.columns.contains_key("toys"));
    assert!(forecast.table.columns.contains_key("books"));

    let lenient = ImputationConfig {
        missing_policy: MissingPolicy::ZeroAsMissing,
        fallback: WeekdayFallback::ColumnMean,
    };
    let forecast = run_forecast_pipeline(&records, &lenient, &ForecastConfig::default()).unwrap();
    assert!(forecast.failures.is_empty());
    assert_eq!(forecast.imputation.ambiguous.len(), 1);
    assert_eq!(forecast.imputation.ambiguous[0].weekday, Weekday::Tue);
}

#[test]
fn test_arima_run_is_deterministic() {
    let (_dir, paths) = write_fixtures();
    let records = SalesSources::load(&paths).unwrap().join();
    let config = ForecastConfig {
        model_kind: ModelKind::AutoArima,
        ..Default::default()
    };

    let a = run_forecast_pipeline(&records, &ImputationConfig::default(), &config).unwrap();
    let b = run_forecast_pipeline(&records, &ImputationConfig::default(), &config).unwrap();

    assert_eq!(a.table, b.table);
    assert_eq!(a.failures, b.failures);
    for value in &a.table.columns["toys"] {
        assert!((value - 3.0).abs() < 1e-6);
    }
}

#[test]
fn test_export_forecast() {
    let (dir, paths) = write_fixtures();
    let records = SalesSources::load(&paths).unwrap().join();
    let forecast =
        run_forecast_pipeline(&records, &ImputationConfig::default(), &ForecastConfig::default()).unwrap();

    let out = dir.path().join("out");
    report::export_forecast(&forecast, &out).unwrap();

    let csv = fs::read_to_string(out.join(report::FORECAST_CSV)).unwrap();
    let mut lines = csv.lines();
    assert_eq!(lines.next(), Some("date,books,garden_tools,toys"));
    assert_eq!(lines.count(), 14);
}

#[test]
fn test_missing_column_aborts_load() {
    let (_dir, paths) = write_fixtures();
    fs::write(paths.orders_path(), "order_id,purchased_at\no1,2018-01-01\n").unwrap();

    match SalesSources::load(&paths) {
        Err(DataSourceError::MissingColumn { column, .. }) => {
            assert_eq!(column, "order_purchase_timestamp")
        }
        other => panic!("expected MissingColumn, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_turnover_end_to_end() {
    let (_dir, paths) = write_fixtures();
    let sources = SalesSources::load(&paths).unwrap();
    let sellers = load_sellers(&paths.sellers_path()).unwrap();
    let records = join_sales_with_sellers(&sources.join(), &sellers);

    let summary = analyze_turnover(&records, &sources.products, 10);

    // 27 active days: seller-a sells 3 cars at 20 plus one mystery item at 1
    assert_eq!(summary.top_sellers[0].id, "seller-a");
    assert!((summary.top_sellers[0].turnover - 27.0 * 61.0).abs() < 1e-6);
    assert_eq!(summary.top_product_per_category.len(), 3);
    assert_eq!(summary.seller_extremes.len(), 3);
    println!("{}", report::render_turnover(&summary));
}

#[test]
fn test_sentiment_end_to_end() {
    let (_dir, paths) = write_fixtures();
    let reviews = load_reviews(&paths.order_reviews_path()).unwrap();
    let items = load_order_items(&paths.order_items_path()).unwrap();
    let sellers = load_sellers(&paths.sellers_path()).unwrap();

    let analysis = analyze_reviews(
        &reviews,
        &items,
        &sellers,
        &Lexicon::default(),
        5,
        &["price".to_string()],
    );

    // The bare rating has no comment and is left out
    assert_eq!(analysis.reviews_considered, 27);
    assert_eq!(analysis.totals.positive, 9);
    assert_eq!(analysis.totals.negative, 9);
    assert_eq!(analysis.totals.neutral, 9);

    let positive = analysis
        .score_by_sentiment
        .iter()
        .find(|s| s.sentiment == Sentiment::Positive)
        .unwrap();
    assert_eq!(positive.mean_score, 5.0);
    assert_eq!(analysis.price_mentions, 0);
    println!("{}", report::render_sentiment(&analysis));
}
