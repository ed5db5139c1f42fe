// 🩹 Gap Filler - weekday-conditional mean imputation
//
// A cell is "missing" according to MissingPolicy. Each missing cell takes
// the mean of the known cells of the same column on the same weekday.
// When a weekday has no known cell at all, WeekdayFallback decides.

use crate::aggregation::DailySalesMatrix;
use chrono::Weekday;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{info, warn};

// ============================================================================
// POLICIES
// ============================================================================

/// Which cells count as missing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingPolicy {
    /// Only days with no order at all (added by reindexing) are missing;
    /// a zero on an active day is a real zero
    #[default]
    CalendarGaps,

    /// Every zero cell is missing
    ZeroAsMissing,
}

/// What a weekday class with no known value resolves to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeekdayFallback {
    /// Mean of all known values in the column (0.0 if there are none)
    #[default]
    ColumnMean,

    /// 0.0
    Zero,

    /// Leave NaN; the forecaster rejects the category
    Unresolved,
}

impl MissingPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            MissingPolicy::CalendarGaps => "calendar_gaps",
            MissingPolicy::ZeroAsMissing => "zero_as_missing",
        }
    }
}

impl WeekdayFallback {
    pub fn as_str(&self) -> &'static str {
        match self {
            WeekdayFallback::ColumnMean => "column_mean",
            WeekdayFallback::Zero => "zero",
            WeekdayFallback::Unresolved => "unresolved",
        }
    }
}

impl fmt::Display for MissingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for WeekdayFallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MissingPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "calendar_gaps" => Ok(MissingPolicy::CalendarGaps),
            "zero_as_missing" => Ok(MissingPolicy::ZeroAsMissing),
            other => Err(format!(
                "unknown missing policy '{}' (expected calendar_gaps or zero_as_missing)",
                other
            )),
        }
    }
}

impl FromStr for WeekdayFallback {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "column_mean" => Ok(WeekdayFallback::ColumnMean),
            "zero" => Ok(WeekdayFallback::Zero),
            "unresolved" => Ok(WeekdayFallback::Unresolved),
            other => Err(format!(
                "unknown weekday fallback '{}' (expected column_mean, zero or unresolved)",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ImputationConfig {
    pub missing_policy: MissingPolicy,
    pub fallback: WeekdayFallback,
}

// ============================================================================
// REPORT
// ============================================================================

/// A weekday class with no known value in a column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmbiguousImputation {
    pub category: String,
    pub weekday: Weekday,
    pub missing_cells: usize,
    /// Value written into the cells; None when left unresolved
    pub resolved_to: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ImputationReport {
    pub filled_cells: usize,
    pub ambiguous: Vec<AmbiguousImputation>,
}

impl ImputationReport {
    pub fn summary(&self) -> String {
        format!(
            "Filled {} cells, {} weekday classes resolved by fallback",
            self.filled_cells,
            self.ambiguous.len()
        )
    }
}

// ============================================================================
// GAP FILLING
// ============================================================================

const WEEKDAYS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

fn is_missing(policy: MissingPolicy, value: f64, observed: bool) -> bool {
    if value.is_nan() {
        return true;
    }
    match policy {
        MissingPolicy::CalendarGaps => !observed,
        MissingPolicy::ZeroAsMissing => value == 0.0,
    }
}

/// Fill missing cells with same-weekday means
///
/// Pure: the input matrix is untouched and the same input always gives the
/// same output.
pub fn fill_gaps(
    matrix: &DailySalesMatrix,
    config: &ImputationConfig,
) -> (DailySalesMatrix, ImputationReport) {
    let mut report = ImputationReport::default();
    let observed = matrix.observed();
    let weekday_slots: Vec<usize> = (0..matrix.len())
        .map(|i| matrix.weekday(i).num_days_from_monday() as usize)
        .collect();

    let mut filled_columns = Vec::with_capacity(matrix.categories().len());

    for (category, values) in matrix.iter_columns() {
        let missing: Vec<bool> = values
            .iter()
            .zip(observed)
            .map(|(v, o)| is_missing(config.missing_policy, *v, *o))
            .collect();

        let mut sums = [0.0f64; 7];
        let mut known = [0usize; 7];
        let mut gaps = [0usize; 7];
        for (i, value) in values.iter().enumerate() {
            let slot = weekday_slots[i];
            if missing[i] {
                gaps[slot] += 1;
            } else {
                sums[slot] += value;
                known[slot] += 1;
            }
        }

        let known_total: usize = known.iter().sum();
        let column_mean = if known_total > 0 {
            sums.iter().sum::<f64>() / known_total as f64
        } else {
            0.0
        };

        let mut fill = [f64::NAN; 7];
        for slot in 0..7 {
            if gaps[slot] == 0 {
                continue;
            }
            if known[slot] > 0 {
                fill[slot] = sums[slot] / known[slot] as f64;
                continue;
            }

            let resolved_to = match config.fallback {
                WeekdayFallback::ColumnMean => Some(column_mean),
                WeekdayFallback::Zero => Some(0.0),
                WeekdayFallback::Unresolved => None,
            };
            warn!(
                category,
                weekday = %WEEKDAYS[slot],
                missing_cells = gaps[slot],
                fallback = %config.fallback,
                "no known value for weekday, using fallback"
            );
            report.ambiguous.push(AmbiguousImputation {
                category: category.to_string(),
                weekday: WEEKDAYS[slot],
                missing_cells: gaps[slot],
                resolved_to,
            });
            fill[slot] = resolved_to.unwrap_or(f64::NAN);
        }

        let column: Vec<f64> = values
            .iter()
            .enumerate()
            .map(|(i, v)| {
                if !missing[i] {
                    return *v;
                }
                let value = fill[weekday_slots[i]];
                if !value.is_nan() {
                    report.filled_cells += 1;
                }
                value
            })
            .collect();

        filled_columns.push(column);
    }

    info!(
        policy = %config.missing_policy,
        filled = report.filled_cells,
        ambiguous = report.ambiguous.len(),
        "filled daily gaps"
    );

    (matrix.with_values(filled_columns), report)
}

// ============================================================================
// TESTS
// ============================================================================
