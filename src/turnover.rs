// 💰 Turnover Ranking - who sells the most, and what
//
// Turnover is the sum of item prices. Rankings are sorted by turnover
// descending with ties broken by id ascending, so every listing is stable.

use crate::entities::Product;
use crate::loader::OrderItemRecord;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use tracing::info;

// ============================================================================
// TURNOVER ROWS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turnover {
    /// Seller or product id
    pub id: String,
    /// Category for products (None for sellers, or products with no category)
    pub category: Option<String>,
    pub turnover: f64,
}

/// Highest and lowest seller of one category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryExtremes {
    pub category: String,
    pub top: Turnover,
    pub bottom: Turnover,
}

/// Product size next to its turnover
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductDimensionTurnover {
    pub product_id: String,
    pub weight_g: Option<f64>,
    pub volume_cm3: Option<f64>,
    pub turnover: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TurnoverCorrelations {
    /// Pearson r between product weight and product turnover
    pub weight_turnover: Option<f64>,
    /// Pearson r between item price and its product's turnover
    pub price_turnover: Option<f64>,
}

/// Every turnover table the `turnover` command prints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnoverSummary {
    pub top_sellers: Vec<Turnover>,
    pub bottom_sellers: Vec<Turnover>,
    pub top_products: Vec<Turnover>,
    pub top_product_per_category: Vec<Turnover>,
    pub seller_extremes: Vec<CategoryExtremes>,
    pub correlations: TurnoverCorrelations,
}

fn by_turnover_desc(a: &Turnover, b: &Turnover) -> Ordering {
    b.turnover
        .partial_cmp(&a.turnover)
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.id.cmp(&b.id))
}

fn ranked(totals: BTreeMap<&str, (Option<&str>, f64)>) -> Vec<Turnover> {
    let mut rows: Vec<Turnover> = totals
        .into_iter()
        .map(|(id, (category, turnover))| Turnover {
            id: id.to_string(),
            category: category.map(str::to_string),
            turnover,
        })
        .collect();
    rows.sort_by(by_turnover_desc);
    rows
}

// ============================================================================
// RANKINGS
// ============================================================================

/// Σ price per seller, highest first
pub fn seller_turnover(records: &[OrderItemRecord]) -> Vec<Turnover> {
    let mut totals: BTreeMap<&str, (Option<&str>, f64)> = BTreeMap::new();
    for r in records {
        totals.entry(r.seller_id.as_str()).or_insert((None, 0.0)).1 += r.price;
    }
    ranked(totals)
}

/// Σ price per product, highest first
pub fn product_turnover(records: &[OrderItemRecord]) -> Vec<Turnover> {
    let mut totals: BTreeMap<&str, (Option<&str>, f64)> = BTreeMap::new();
    for r in records {
        totals
            .entry(r.product_id.as_str())
            .or_insert((r.category.as_deref(), 0.0))
            .1 += r.price;
    }
    ranked(totals)
}

/// First `n` rows of a ranking (highest turnover)
pub fn top_n(ranking: &[Turnover], n: usize) -> Vec<Turnover> {
    ranking.iter().take(n).cloned().collect()
}

/// Lowest `n` rows, lowest first
pub fn bottom_n(ranking: &[Turnover], n: usize) -> Vec<Turnover> {
    let mut rows: Vec<Turnover> = ranking.to_vec();
    rows.sort_by(|a, b| {
        a.turnover
            .partial_cmp(&b.turnover)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.id.cmp(&b.id))
    });
    rows.truncate(n);
    rows
}

/// Best-selling product of every category, in category order
///
/// Products without a category are not ranked.
pub fn top_product_per_category(products: &[Turnover]) -> Vec<Turnover> {
    let mut best: BTreeMap<&str, &Turnover> = BTreeMap::new();
    for row in products {
        let Some(category) = row.category.as_deref() else {
            continue;
        };
        let replace = match best.get(category) {
            Some(current) => by_turnover_desc(row, current) == Ordering::Less,
            None => true,
        };
        if replace {
            best.insert(category, row);
        }
    }
    best.into_values().cloned().collect()
}

/// Top and bottom seller by turnover within each category
pub fn seller_extremes_per_category(records: &[OrderItemRecord]) -> Vec<CategoryExtremes> {
    let mut per_category: BTreeMap<&str, BTreeMap<&str, (Option<&str>, f64)>> = BTreeMap::new();
    for r in records {
        let Some(category) = r.category.as_deref() else {
            continue;
        };
        per_category
            .entry(category)
            .or_default()
            .entry(r.seller_id.as_str())
            .or_insert((Some(category), 0.0))
            .1 += r.price;
    }

    per_category
        .into_iter()
        .filter_map(|(category, sellers)| {
            let ranking = ranked(sellers);
            let top = ranking.first()?.clone();
            let bottom = bottom_n(&ranking, 1).into_iter().next()?;
            Some(CategoryExtremes {
                category: category.to_string(),
                top,
                bottom,
            })
        })
        .collect()
}

/// Weight and volume of every ranked product next to its turnover
pub fn product_dimension_turnover(
    products: &[Product],
    ranking: &[Turnover],
) -> Vec<ProductDimensionTurnover> {
    let by_id: HashMap<&str, &Product> = products.iter().map(|p| (p.product_id.as_str(), p)).collect();

    ranking
        .iter()
        .filter_map(|row| {
            let product = by_id.get(row.id.as_str())?;
            Some(ProductDimensionTurnover {
                product_id: row.id.clone(),
                weight_g: product.product_weight_g,
                volume_cm3: product.volume_cm3(),
                turnover: row.turnover,
            })
        })
        .collect()
}

// ============================================================================
// CORRELATION
// ============================================================================

/// Pearson correlation coefficient
///
/// None for fewer than two pairs or when either side has zero variance.
pub fn pearson(pairs: &[(f64, f64)]) -> Option<f64> {
    if pairs.len() < 2 {
        return None;
    }
    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|(x, _)| x).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|(_, y)| y).sum::<f64>() / n;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (x, y) in pairs {
        let dx = x - mean_x;
        let dy = y - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    if var_x <= f64::EPSILON || var_y <= f64::EPSILON {
        return None;
    }
    Some(cov / (var_x.sqrt() * var_y.sqrt()))
}

pub fn turnover_correlations(
    records: &[OrderItemRecord],
    dimensions: &[ProductDimensionTurnover],
    products: &[Turnover],
) -> TurnoverCorrelations {
    let weight_pairs: Vec<(f64, f64)> = dimensions
        .iter()
        .filter_map(|d| d.weight_g.map(|w| (w, d.turnover)))
        .collect();

    let product_totals: HashMap<&str, f64> =
        products.iter().map(|p| (p.id.as_str(), p.turnover)).collect();
    let price_pairs: Vec<(f64, f64)> = records
        .iter()
        .filter_map(|r| product_totals.get(r.product_id.as_str()).map(|t| (r.price, *t)))
        .collect();

    TurnoverCorrelations {
        weight_turnover: pearson(&weight_pairs),
        price_turnover: pearson(&price_pairs),
    }
}

// ============================================================================
// SUMMARY
// ============================================================================

/// Build every ranking from seller-joined records
pub fn analyze_turnover(records: &[OrderItemRecord], products: &[Product], n: usize) -> TurnoverSummary {
    let sellers = seller_turnover(records);
    let product_ranking = product_turnover(records);
    let dimensions = product_dimension_turnover(products, &product_ranking);

    let summary = TurnoverSummary {
        top_sellers: top_n(&sellers, n),
        bottom_sellers: bottom_n(&sellers, n),
        top_products: top_n(&product_ranking, n),
        top_product_per_category: top_product_per_category(&product_ranking),
        seller_extremes: seller_extremes_per_category(records),
        correlations: turnover_correlations(records, &dimensions, &product_ranking),
    };

    info!(
        sellers = sellers.len(),
        products = product_ranking.len(),
        categories = summary.top_product_per_category.len(),
        "turnover rankings built"
    );

    summary
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn item(product: &str, seller: &str, category: Option<&str>, price: f64) -> OrderItemRecord {
        OrderItemRecord {
            order_id: format!("o-{}-{}", product, seller),
            order_item_id: 1,
            product_id: product.to_string(),
            seller_id: seller.to_string(),
            price,
            purchase_timestamp: NaiveDate::from_ymd_opt(2018, 2, 1)
                .unwrap()
                .and_hms_opt(10, 0, 0)
                .unwrap(),
            category: category.map(str::to_string),
        }
    }

    fn sample() -> Vec<OrderItemRecord> {
        vec![
            item("p1", "s1", Some("toys"), 100.0),
            item("p1", "s1", Some("toys"), 100.0),
            item("p2", "s2", Some("toys"), 50.0),
            item("p3", "s2", Some("books"), 30.0),
            item("p4", "s3", Some("books"), 30.0),
            item("p5", "s3", None, 5.0),
        ]
    }

    fn product(id: &str, weight: Option<f64>) -> Product {
        Product {
            product_id: id.to_string(),
            product_category_name: None,
            product_weight_g: weight,
            product_length_cm: Some(10.0),
            product_height_cm: Some(10.0),
            product_width_cm: Some(10.0),
        }
    }

    #[test]
    fn test_seller_ranking_order() {
        let sellers = seller_turnover(&sample());
        let ids: Vec<&str> = sellers.iter().map(|s| s.id.as_str()).collect();

        assert_eq!(ids, vec!["s1", "s2", "s3"]);
        assert_eq!(sellers[0].turnover, 200.0);
        assert_eq!(sellers[1].turnover, 80.0);
    }

    #[test]
    fn test_ties_broken_by_id() {
        let products = product_turnover(&sample());
        let p3 = products.iter().position(|p| p.id == "p3").unwrap();
        let p4 = products.iter().position(|p| p.id == "p4").unwrap();
        assert!(p3 < p4);
    }

    #[test]
    fn test_top_and_bottom_n() {
        let sellers = seller_turnover(&sample());

        assert_eq!(top_n(&sellers, 1)[0].id, "s1");
        let bottom = bottom_n(&sellers, 2);
        assert_eq!(bottom[0].id, "s3");
        assert_eq!(bottom[1].id, "s2");
        assert_eq!(top_n(&sellers, 10).len(), 3);
    }

    #[test]
    fn test_top_product_per_category() {
        let best = top_product_per_category(&product_turnover(&sample()));

        assert_eq!(best.len(), 2);
        assert_eq!(best[0].category.as_deref(), Some("books"));
        assert_eq!(best[0].id, "p3");
        assert_eq!(best[1].category.as_deref(), Some("toys"));
        assert_eq!(best[1].id, "p1");
        assert_eq!(best[1].turnover, 200.0);
    }

    #[test]
    fn test_seller_extremes_per_category() {
        let extremes = seller_extremes_per_category(&sample());

        assert_eq!(extremes.len(), 2);
        let toys = &extremes[1];
        assert_eq!(toys.category, "toys");
        assert_eq!(toys.top.id, "s1");
        assert_eq!(toys.bottom.id, "s2");

        // s2 and s3 tie in books, both sides go to the lower id
        let books = &extremes[0];
        assert_eq!(books.top.id, "s2");
        assert_eq!(books.bottom.id, "s2");
    }

    #[test]
    fn test_pearson() {
        let perfect: Vec<(f64, f64)> = (0..5).map(|i| (i as f64, 2.0 * i as f64 + 1.0)).collect();
        assert!((pearson(&perfect).unwrap() - 1.0).abs() < 1e-12);

        let inverse: Vec<(f64, f64)> = (0..5).map(|i| (i as f64, -(i as f64))).collect();
        assert!((pearson(&inverse).unwrap() + 1.0).abs() < 1e-12);

        assert_eq!(pearson(&[(1.0, 2.0)]), None);
        assert_eq!(pearson(&[(1.0, 2.0), (1.0, 3.0)]), None);
    }

    #[test]
    fn test_dimensions_skip_unknown_products() {
        let ranking = product_turnover(&sample());
        let products = vec![product("p1", Some(500.0)), product("p2", None)];

        let dims = product_dimension_turnover(&products, &ranking);
        assert_eq!(dims.len(), 2);
        assert_eq!(dims[0].product_id, "p1");
        assert_eq!(dims[0].volume_cm3, Some(1000.0));
        assert_eq!(dims[1].weight_g, None);
    }

    #[test]
    fn test_analyze_turnover() {
        let products = vec![
            product("p1", Some(900.0)),
            product("p2", Some(400.0)),
            product("p3", Some(100.0)),
        ];
        let summary = analyze_turnover(&sample(), &products, 2);

        assert_eq!(summary.top_sellers.len(), 2);
        assert_eq!(summary.bottom_sellers[0].id, "s3");
        assert_eq!(summary.top_products[0].id, "p1");
        assert!(summary.correlations.weight_turnover.unwrap() > 0.9);
        assert!(summary.correlations.price_turnover.is_some());
        println!("✅ turnover summary: {:?}", summary.correlations);
    }
}
