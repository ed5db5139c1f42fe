// 📅 Daily Aggregator - order items → dense category × day matrix
//
// Timestamps are truncated to calendar days, counted per (day, category)
// and pivoted to one column per category. The day axis is then reindexed
// over the full min..=max range so no calendar day is skipped.

use crate::error::AggregationError;
use crate::loader::OrderItemRecord;
use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

// ============================================================================
// DAILY SALES MATRIX
// ============================================================================

/// DailySalesMatrix - item counts per (calendar day, category)
///
/// Invariants:
/// - `days` is contiguous from the first to the last observed day
/// - every column has exactly `days.len()` values
/// - `categories` is sorted and never changes after aggregation
/// - `observed[i]` is true iff at least one order item fell on `days[i]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailySalesMatrix {
    days: Vec<NaiveDate>,
    categories: Vec<String>,
    columns: Vec<Vec<f64>>,
    observed: Vec<bool>,
}

impl DailySalesMatrix {
    /// Build a matrix from explicit columns starting at `start`
    ///
    /// Every column must have the same length as `observed`.
    pub fn from_columns(
        start: NaiveDate,
        columns: BTreeMap<String, Vec<f64>>,
        observed: Vec<bool>,
    ) -> Result<Self, AggregationError> {
        if observed.is_empty() || columns.is_empty() {
            return Err(AggregationError::NoData);
        }

        let len = observed.len();
        let days: Vec<NaiveDate> = (0..len).map(|i| start + Duration::days(i as i64)).collect();

        let mut categories = Vec::with_capacity(columns.len());
        let mut values = Vec::with_capacity(columns.len());
        for (category, mut column) in columns {
            // Short columns are padded with zeros, long ones cut to the axis
            column.resize(len, 0.0);
            categories.push(category);
            values.push(column);
        }

        Ok(DailySalesMatrix {
            days,
            categories,
            columns: values,
            observed,
        })
    }

    /// Same axis and categories, new values (used by the gap filler)
    pub(crate) fn with_values(&self, columns: Vec<Vec<f64>>) -> Self {
        debug_assert_eq!(columns.len(), self.categories.len());
        DailySalesMatrix {
            days: self.days.clone(),
            categories: self.categories.clone(),
            columns,
            observed: self.observed.clone(),
        }
    }

    pub fn days(&self) -> &[NaiveDate] {
        &self.days
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    pub fn observed(&self) -> &[bool] {
        &self.observed
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    pub fn first_day(&self) -> Option<NaiveDate> {
        self.days.first().copied()
    }

    pub fn last_day(&self) -> Option<NaiveDate> {
        self.days.last().copied()
    }

    /// Weekday of the day at `index`
    pub fn weekday(&self, index: usize) -> Weekday {
        self.days[index].weekday()
    }

    /// Values of one category, aligned with `days()`
    pub fn column(&self, category: &str) -> Option<&[f64]> {
        self.categories
            .binary_search_by(|c| c.as_str().cmp(category))
            .ok()
            .map(|i| self.columns[i].as_slice())
    }

    /// (category, values) pairs in category order
    pub fn iter_columns(&self) -> impl Iterator<Item = (&str, &[f64])> {
        self.categories
            .iter()
            .zip(self.columns.iter())
            .map(|(c, v)| (c.as_str(), v.as_slice()))
    }

    /// Single cell lookup
    pub fn value(&self, day: NaiveDate, category: &str) -> Option<f64> {
        let first = self.first_day()?;
        let offset = (day - first).num_days();
        if offset < 0 {
            return None;
        }
        self.column(category)?.get(offset as usize).copied()
    }

    /// Cells that are NaN (left unresolved by the gap filler)
    pub fn unresolved_cells(&self) -> usize {
        self.columns
            .iter()
            .map(|c| c.iter().filter(|v| v.is_nan()).count())
            .sum()
    }
}

// ============================================================================
// AGGREGATION
// ============================================================================

/// Count order items per (day, category) over a contiguous day range
///
/// Records without a category are skipped, the way a group-by drops
/// missing keys.
pub fn aggregate_daily(records: &[OrderItemRecord]) -> Result<DailySalesMatrix, AggregationError> {
    let mut counts: BTreeMap<(NaiveDate, &str), f64> = BTreeMap::new();
    let mut categories: BTreeSet<&str> = BTreeSet::new();
    let mut active_days: BTreeSet<NaiveDate> = BTreeSet::new();
    let mut skipped = 0usize;

    for record in records {
        let Some(category) = record.category.as_deref() else {
            skipped += 1;
            continue;
        };
        let day = record.purchase_timestamp.date();

        *counts.entry((day, category)).or_insert(0.0) += 1.0;
        categories.insert(category);
        active_days.insert(day);
    }

    if skipped > 0 {
        debug!(skipped, "order items without a category left out of the matrix");
    }

    let (Some(&start), Some(&end)) = (active_days.first(), active_days.last()) else {
        return Err(AggregationError::NoData);
    };

    let len = (end - start).num_days() as usize + 1;
    let observed: Vec<bool> = (0..len)
        .map(|i| active_days.contains(&(start + Duration::days(i as i64))))
        .collect();

    let mut columns: BTreeMap<String, Vec<f64>> = categories
        .iter()
        .map(|c| (c.to_string(), vec![0.0; len]))
        .collect();

    for ((day, category), count) in counts {
        let offset = (day - start).num_days() as usize;
        if let Some(column) = columns.get_mut(category) {
            column[offset] = count;
        }
    }

    let matrix = DailySalesMatrix::from_columns(start, columns, observed)?;

    info!(
        days = matrix.len(),
        categories = matrix.categories().len(),
        gap_days = matrix.observed().iter().filter(|o| !**o).count(),
        first_day = %start,
        last_day = %end,
        "aggregated daily sales"
    );

    Ok(matrix)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn record(day: &str, category: Option<&str>) -> OrderItemRecord {
        OrderItemRecord {
            order_id: format!("o-{}", day),
            order_item_id: 1,
            product_id: "p".to_string(),
            seller_id: "s".to_string(),
            price: 1.0,
            purchase_timestamp: NaiveDate::parse_from_str(day, "%Y-%m-%d")
                .unwrap()
                .and_hms_opt(12, 0, 0)
                .unwrap(),
            category: category.map(str::to_string),
        }
    }

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_counts_and_reindexing() {
        let records = vec![
            record("2018-01-01", Some("toys")),
            record("2018-01-01", Some("toys")),
            record("2018-01-01", Some("books")),
            record("2018-01-04", Some("books")),
        ];

        let matrix = aggregate_daily(&records).unwrap();

        assert_eq!(matrix.len(), 4);
        assert_eq!(matrix.categories(), &["books".to_string(), "toys".to_string()]);
        assert_eq!(matrix.column("toys").unwrap(), &[2.0, 0.0, 0.0, 0.0]);
        assert_eq!(matrix.column("books").unwrap(), &[1.0, 0.0, 0.0, 1.0]);
        assert_eq!(matrix.observed(), &[true, false, false, true]);
        assert_eq!(matrix.value(d("2018-01-04"), "books"), Some(1.0));
    }

    #[test]
    fn test_single_day_category_gets_full_range() {
        let records = vec![
            record("2018-03-01", Some("books")),
            record("2018-03-10", Some("books")),
            record("2018-03-05", Some("garden_tools")),
        ];

        let matrix = aggregate_daily(&records).unwrap();
        let garden = matrix.column("garden_tools").unwrap();

        assert_eq!(garden.len(), 10);
        assert_eq!(garden.iter().sum::<f64>(), 1.0);
        assert_eq!(garden[4], 1.0);
    }

    #[test]
    fn test_uncategorised_rows_skipped() {
        let records = vec![record("2018-01-01", None), record("2018-01-02", Some("toys"))];
        let matrix = aggregate_daily(&records).unwrap();

        // The uncategorised day does not widen the axis
        assert_eq!(matrix.first_day(), Some(d("2018-01-02")));
        assert_eq!(matrix.categories().len(), 1);
    }

    #[test]
    fn test_no_data() {
        assert_eq!(aggregate_daily(&[]), Err(AggregationError::NoData));
        assert_eq!(
            aggregate_daily(&[record("2018-01-01", None)]),
            Err(AggregationError::NoData)
        );
    }

    #[test]
    fn test_aggregation_is_idempotent() {
        let records = vec![
            record("2018-01-01", Some("toys")),
            record("2018-01-09", Some("books")),
        ];
        assert_eq!(aggregate_daily(&records), aggregate_daily(&records));
    }

    proptest! {
        #[test]
        fn prop_day_axis_is_contiguous(offsets in proptest::collection::vec((0i64..400, 0usize..3), 1..60)) {
            let base = d("2017-01-01");
            let names = ["toys", "books", "garden_tools"];
            let records: Vec<OrderItemRecord> = offsets
                .iter()
                .map(|(offset, cat)| {
                    let day = (base + Duration::days(*offset)).format("%Y-%m-%d").to_string();
                    record(&day, Some(names[*cat]))
                })
                .collect();

            let matrix = aggregate_daily(&records).unwrap();
            let min = offsets.iter().map(|(o, _)| *o).min().unwrap();
            let max = offsets.iter().map(|(o, _)| *o).max().unwrap();

            prop_assert_eq!(matrix.len() as i64, max - min + 1);
            for pair in matrix.days().windows(2) {
                prop_assert_eq!(pair[1] - pair[0], Duration::days(1));
            }
            let total: f64 = matrix.iter_columns().map(|(_, v)| v.iter().sum::<f64>()).sum();
            prop_assert_eq!(total as usize, records.len());
        }
    }
}
