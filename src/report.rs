// 📋 Reporter - console tables and CSV / JSON exports
//
// Each `render_*` builds the text block a command prints, so the binary
// only has to `print!` it and tests can inspect it.

use crate::error::CategoryForecastError;
use crate::forecasting::{ForecastReport, ForecastTable};
use crate::imputation::ImputationReport;
use crate::sentiment::ReviewAnalysis;
use crate::turnover::{Turnover, TurnoverSummary};
use anyhow::{Context, Result};
use serde::Serialize;
use std::fmt::Write as _;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

const RULE: &str = "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━";

/// File names used by `export_forecast`
pub const FORECAST_CSV: &str = "forecast.csv";
pub const FORECAST_JSON: &str = "forecast_report.json";

// ============================================================================
// CONSOLE
// ============================================================================

fn header(out: &mut String, title: &str) {
    let _ = writeln!(out, "{}", title);
    let _ = writeln!(out, "{}", RULE);
}

pub fn render_forecast(report: &ForecastReport) -> String {
    let mut out = String::new();
    header(
        &mut out,
        &format!(
            "🔮 {}-day forecast ({})",
            report.horizon_days, report.model_kind
        ),
    );

    if let (Some(first), Some(last)) = (report.table.days.first(), report.table.days.last()) {
        let _ = writeln!(out, "📅 {} → {}", first, last);
    }
    let _ = writeln!(
        out,
        "✓ {} categories forecast, {} failed\n",
        report.succeeded(),
        report.failed()
    );

    let width = report
        .series
        .iter()
        .map(|s| s.category.chars().count())
        .max()
        .unwrap_or(8)
        .max(8);

    for series in &report.series {
        let values: Vec<String> = series.points.iter().map(|(_, v)| format!("{:7.2}", v)).collect();
        let _ = writeln!(
            out,
            "{:<width$}  {:<28} {}",
            series.category,
            series.model,
            values.join(" "),
            width = width
        );
    }

    out.push_str(&render_imputation(&report.imputation));
    out.push_str(&render_failures(&report.failures));
    out
}

pub fn render_imputation(report: &ImputationReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "\n🩹 {}", report.summary());
    for ambiguous in &report.ambiguous {
        let resolved = match ambiguous.resolved_to {
            Some(v) => format!("{:.2}", v),
            None => "unresolved".to_string(),
        };
        let _ = writeln!(
            out,
            "   ⚠️  {} / {}: {} cells → {}",
            ambiguous.category, ambiguous.weekday, ambiguous.missing_cells, resolved
        );
    }
    out
}

pub fn render_failures(failures: &[CategoryForecastError]) -> String {
    let mut out = String::new();
    if failures.is_empty() {
        return out;
    }
    let _ = writeln!(out, "\n❌ {} categories could not be forecast", failures.len());
    for failure in failures {
        let _ = writeln!(out, "   {}", failure);
    }
    out
}

fn turnover_rows(out: &mut String, title: &str, rows: &[Turnover]) {
    let _ = writeln!(out, "\n{}", title);
    for (rank, row) in rows.iter().enumerate() {
        let category = row.category.as_deref().unwrap_or("-");
        let _ = writeln!(
            out,
            "  {:>2}. {:<34} {:>12.2}  {}",
            rank + 1,
            row.id,
            row.turnover,
            category
        );
    }
}

fn correlation(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |r| format!("{:+.3}", r))
}

pub fn render_turnover(summary: &TurnoverSummary) -> String {
    let mut out = String::new();
    header(&mut out, "💰 Turnover ranking");

    turnover_rows(&mut out, "🏆 Top sellers", &summary.top_sellers);
    turnover_rows(&mut out, "🐢 Bottom sellers", &summary.bottom_sellers);
    turnover_rows(&mut out, "📦 Top products", &summary.top_products);
    turnover_rows(
        &mut out,
        "🏷️  Top product per category",
        &summary.top_product_per_category,
    );

    let _ = writeln!(out, "\n⚖️  Top / bottom seller per category");
    for extremes in &summary.seller_extremes {
        let _ = writeln!(
            out,
            "  {:<32} ↑ {} ({:.2})  ↓ {} ({:.2})",
            extremes.category,
            extremes.top.id,
            extremes.top.turnover,
            extremes.bottom.id,
            extremes.bottom.turnover
        );
    }

    let _ = writeln!(out, "\n📈 Correlations");
    let _ = writeln!(
        out,
        "  weight ↔ turnover: {}",
        correlation(summary.correlations.weight_turnover)
    );
    let _ = writeln!(
        out,
        "  price  ↔ turnover: {}",
        correlation(summary.correlations.price_turnover)
    );
    out
}

pub fn render_sentiment(analysis: &ReviewAnalysis) -> String {
    let mut out = String::new();
    header(&mut out, "💬 Review sentiment");

    let _ = writeln!(
        out,
        "✓ {} reviews ({} rows after item join): {} positive, {} neutral, {} negative",
        analysis.reviews_considered,
        analysis.joined_rows,
        analysis.totals.positive,
        analysis.totals.neutral,
        analysis.totals.negative
    );

    let _ = writeln!(out, "\n⭐ Review score distribution");
    let peak = analysis.score_histogram.iter().copied().max().unwrap_or(0).max(1);
    for (i, count) in analysis.score_histogram.iter().enumerate() {
        let bar = "█".repeat(count * 40 / peak);
        let _ = writeln!(out, "  {} {:<40} {}", i + 1, bar, count);
    }

    let _ = writeln!(out, "\n🎯 Average score by sentiment");
    for score in &analysis.score_by_sentiment {
        let _ = writeln!(
            out,
            "  {:<8} {:.2} ({} rows)",
            score.sentiment, score.mean_score, score.rows
        );
    }

    let _ = writeln!(out, "\n👍 Best reviewed products");
    for p in &analysis.best_products {
        let _ = writeln!(
            out,
            "  {:<34} {:.2} of {}",
            p.product_id,
            p.positive_ratio,
            p.counts.total()
        );
    }

    let _ = writeln!(out, "\n👎 Worst reviewed products");
    for p in &analysis.worst_products {
        let _ = writeln!(
            out,
            "  {:<34} {:.2} of {}",
            p.product_id,
            p.positive_ratio,
            p.counts.total()
        );
    }

    let _ = writeln!(out, "\n🚩 Sellers with the most negative feedback");
    for s in &analysis.worst_sellers {
        let location = match (&s.city, &s.state) {
            (Some(city), Some(state)) => format!("{}/{}", city, state),
            (Some(city), None) => city.clone(),
            (None, Some(state)) => state.clone(),
            (None, None) => "-".to_string(),
        };
        let _ = writeln!(
            out,
            "  {:<34} {:.2} of {}  {}",
            s.seller_id,
            s.negative_ratio,
            s.counts.total(),
            location
        );
    }

    let _ = writeln!(out, "\n🏷️  {} rows mention price", analysis.price_mentions);
    for example in &analysis.price_mention_examples {
        let _ = writeln!(out, "  \"{}\"", example);
    }
    out
}

// ============================================================================
// FILE EXPORT
// ============================================================================

/// `date,<category>...` with one row per forecast day
pub fn write_forecast_csv_to<W: Write>(table: &ForecastTable, writer: W) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);

    let mut header = vec!["date".to_string()];
    header.extend(table.columns.keys().cloned());
    wtr.write_record(&header).context("Failed to write CSV header")?;

    for (i, day) in table.days.iter().enumerate() {
        let mut row = vec![day.format("%Y-%m-%d").to_string()];
        row.extend(
            table
                .columns
                .values()
                .map(|column| column.get(i).map(|v| v.to_string()).unwrap_or_default()),
        );
        wtr.write_record(&row).context("Failed to write CSV row")?;
    }

    wtr.flush().context("Failed to flush CSV writer")?;
    Ok(())
}

pub fn write_forecast_csv(table: &ForecastTable, path: &Path) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    write_forecast_csv_to(table, file)
}

/// Pretty JSON dump of any report
pub fn write_report_json<T: Serialize>(report: &T, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(report).context("Failed to serialize report")?;
    fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

/// Write forecast.csv and forecast_report.json into `dir`
pub fn export_forecast(report: &ForecastReport, dir: &Path) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory {}", dir.display()))?;

    let csv_path = dir.join(FORECAST_CSV);
    let json_path = dir.join(FORECAST_JSON);
    write_forecast_csv(&report.table, &csv_path)?;
    write_report_json(report, &json_path)?;

    info!(dir = %dir.display(), "forecast exported");
    Ok(vec![csv_path, json_path])
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregation::DailySalesMatrix;
    use crate::forecasting::{forecast_filled, ForecastConfig};
    use chrono::NaiveDate;
    use std::collections::BTreeMap;

    fn report() -> ForecastReport {
        let start = NaiveDate::from_ymd_opt(2018, 1, 1).unwrap();
        let mut columns = BTreeMap::new();
        columns.insert("toys".to_string(), vec![5.0; 21]);
        columns.insert("tiny".to_string(), vec![1.0; 3]);
        let matrix = DailySalesMatrix::from_columns(start, columns, vec![true; 21]).unwrap();

        let config = ForecastConfig {
            horizon_days: 3,
            ..Default::default()
        };
        forecast_filled(matrix, ImputationReport::default(), &config)
    }

    #[test]
    fn test_render_forecast_lists_successes_and_failures() {
        let mut report = report();
        // Make one category fail on purpose
        report.failures.push(CategoryForecastError {
            category: "garden_tools".to_string(),
            message: "Insufficient data: need at least 14 points, got 3".to_string(),
        });

        let text = render_forecast(&report);
        assert!(text.contains("3-day forecast (seasonal_smoothing)"));
        assert!(text.contains("toys"));
        assert!(text.contains("Error processing category garden_tools"));
        println!("{}", text);
    }

    #[test]
    fn test_forecast_csv_layout() {
        let report = report();
        let mut buffer = Vec::new();
        write_forecast_csv_to(&report.table, &mut buffer).unwrap();

        let text = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "date,tiny,toys");
        assert_eq!(lines.len(), 4);
        assert!(lines[1].starts_with("2018-01-22,"));
    }

    #[test]
    fn test_export_forecast_writes_both_files() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");

        let paths = export_forecast(&report(), &out).unwrap();
        assert_eq!(paths.len(), 2);

        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(out.join(FORECAST_JSON)).unwrap()).unwrap();
        assert_eq!(json["model_kind"], "seasonal_smoothing");
        assert!(json.get("history").is_none());
        assert!(out.join(FORECAST_CSV).exists());
    }
}
