// 📂 Data Loader / Joiner - CSV tables → denormalized order-item rows
//
// Every source is read through the same path:
//   1. Header check against the columns the pipeline depends on
//   2. serde deserialization row by row (line numbers kept for errors)
//   3. Relational joins on exact key equality
//
// Loaders are generic over `Read` so tests can feed in-memory CSV.

use crate::config::DataPaths;
use crate::entities::{CategoryTranslation, Order, OrderItem, Product, RawOrder, Review, Seller};
use crate::error::DataSourceError;
use chrono::NaiveDateTime;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info, warn};

// ============================================================================
// REQUIRED COLUMNS
// ============================================================================

pub const ORDERS_COLUMNS: &[&str] = &["order_id", "order_purchase_timestamp"];
pub const ORDER_ITEMS_COLUMNS: &[&str] =
    &["order_id", "order_item_id", "product_id", "seller_id", "price"];
pub const PRODUCTS_COLUMNS: &[&str] = &[
    "product_id",
    "product_category_name",
    "product_weight_g",
    "product_length_cm",
    "product_height_cm",
    "product_width_cm",
];
pub const TRANSLATION_COLUMNS: &[&str] =
    &["product_category_name", "product_category_name_english"];
pub const SELLERS_COLUMNS: &[&str] = &["seller_id", "seller_city", "seller_state"];
pub const REVIEWS_COLUMNS: &[&str] = &["order_id", "review_score", "review_comment_message"];

// ============================================================================
// JOINED RECORD
// ============================================================================

/// OrderItemRecord - one order item enriched with its order and product
///
/// Produced by `join_sales`; read-only afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItemRecord {
    pub order_id: String,
    pub order_item_id: u32,
    pub product_id: String,
    pub seller_id: String,
    pub price: f64,
    pub purchase_timestamp: NaiveDateTime,
    /// Translated (English) category; None when the product has no
    /// category or the category has no translation
    pub category: Option<String>,
}

/// The four tables the daily-sales pipeline needs
#[derive(Debug, Clone, Default)]
pub struct SalesSources {
    pub orders: Vec<Order>,
    pub order_items: Vec<OrderItem>,
    pub products: Vec<Product>,
    pub translations: Vec<CategoryTranslation>,
}

impl SalesSources {
    /// Load orders, order items, products and translations from disk
    pub fn load(paths: &DataPaths) -> Result<Self, DataSourceError> {
        let sources = SalesSources {
            orders: load_orders(&paths.orders_path())?,
            order_items: load_order_items(&paths.order_items_path())?,
            products: load_products(&paths.products_path())?,
            translations: load_translations(&paths.category_translation_path())?,
        };

        info!(
            orders = sources.orders.len(),
            order_items = sources.order_items.len(),
            products = sources.products.len(),
            translations = sources.translations.len(),
            "loaded sales sources"
        );

        Ok(sources)
    }

    /// Join the loaded tables (see `join_sales`)
    pub fn join(&self) -> Vec<OrderItemRecord> {
        join_sales(&self.orders, &self.order_items, &self.products, &self.translations)
    }
}

// ============================================================================
// GENERIC TABLE READER
// ============================================================================

fn source_name(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("unknown.csv")
        .to_string()
}

fn open_source(path: &Path) -> Result<File, DataSourceError> {
    File::open(path).map_err(|source| DataSourceError::Io {
        source_name: path.display().to_string(),
        source,
    })
}

/// Read a whole CSV table into `T`, after checking the header row
pub fn read_table<T, R>(
    reader: R,
    source_name: &str,
    required_columns: &[&str],
) -> Result<Vec<T>, DataSourceError>
where
    T: DeserializeOwned,
    R: Read,
{
    read_table_with(reader, source_name, required_columns, csv::Trim::All)
}

/// `read_table` with an explicit trimming mode for cell values
pub fn read_table_with<T, R>(
    reader: R,
    source_name: &str,
    required_columns: &[&str],
    trim: csv::Trim,
) -> Result<Vec<T>, DataSourceError>
where
    T: DeserializeOwned,
    R: Read,
{
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(trim)
        .from_reader(reader);

    let headers = rdr.headers().map_err(|source| DataSourceError::Csv {
        source_name: source_name.to_string(),
        source,
    })?;

    // Exports saved from spreadsheets may start with a UTF-8 BOM
    let present: HashSet<&str> = headers
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}'))
        .collect();

    for column in required_columns {
        if !present.contains(column) {
            return Err(DataSourceError::MissingColumn {
                source_name: source_name.to_string(),
                column: column.to_string(),
            });
        }
    }

    let mut rows = Vec::new();
    for (index, result) in rdr.deserialize().enumerate() {
        let row: T = result.map_err(|e| DataSourceError::Malformed {
            source_name: source_name.to_string(),
            line: e.position().map(|p| p.line() as usize).unwrap_or(index + 2),
            message: e.to_string(),
        })?;
        rows.push(row);
    }

    debug!(source = source_name, rows = rows.len(), "read table");
    Ok(rows)
}

// ============================================================================
// PER-SOURCE LOADERS
// ============================================================================

pub fn load_orders_from<R: Read>(reader: R, source_name: &str) -> Result<Vec<Order>, DataSourceError> {
    let raw: Vec<RawOrder> = read_table(reader, source_name, ORDERS_COLUMNS)?;

    raw.into_iter()
        .enumerate()
        .map(|(index, row)| {
            let timestamp = row.order_purchase_timestamp.clone();
            Order::from_raw(row).ok_or_else(|| DataSourceError::Malformed {
                source_name: source_name.to_string(),
                line: index + 2, // 1-indexed + header row
                message: format!("Invalid purchase timestamp: '{}'", timestamp),
            })
        })
        .collect()
}

pub fn load_orders(path: &Path) -> Result<Vec<Order>, DataSourceError> {
    load_orders_from(open_source(path)?, &source_name(path))
}

pub fn load_order_items_from<R: Read>(
    reader: R,
    source_name: &str,
) -> Result<Vec<OrderItem>, DataSourceError> {
    read_table(reader, source_name, ORDER_ITEMS_COLUMNS)
}

pub fn load_order_items(path: &Path) -> Result<Vec<OrderItem>, DataSourceError> {
    load_order_items_from(open_source(path)?, &source_name(path))
}

pub fn load_products_from<R: Read>(
    reader: R,
    source_name: &str,
) -> Result<Vec<Product>, DataSourceError> {
    read_table(reader, source_name, PRODUCTS_COLUMNS)
}

pub fn load_products(path: &Path) -> Result<Vec<Product>, DataSourceError> {
    load_products_from(open_source(path)?, &source_name(path))
}

pub fn load_translations_from<R: Read>(
    reader: R,
    source_name: &str,
) -> Result<Vec<CategoryTranslation>, DataSourceError> {
    read_table(reader, source_name, TRANSLATION_COLUMNS)
}

pub fn load_translations(path: &Path) -> Result<Vec<CategoryTranslation>, DataSourceError> {
    load_translations_from(open_source(path)?, &source_name(path))
}

pub fn load_sellers_from<R: Read>(reader: R, source_name: &str) -> Result<Vec<Seller>, DataSourceError> {
    read_table(reader, source_name, SELLERS_COLUMNS)
}

pub fn load_sellers(path: &Path) -> Result<Vec<Seller>, DataSourceError> {
    load_sellers_from(open_source(path)?, &source_name(path))
}

/// Comment cells are read untrimmed so whitespace-only comments survive
pub fn load_reviews_from<R: Read>(reader: R, source_name: &str) -> Result<Vec<Review>, DataSourceError> {
    read_table_with(reader, source_name, REVIEWS_COLUMNS, csv::Trim::Headers)
}

pub fn load_reviews(path: &Path) -> Result<Vec<Review>, DataSourceError> {
    load_reviews_from(open_source(path)?, &source_name(path))
}

// ============================================================================
// JOINS
// ============================================================================

/// Portuguese category name → English name (left side of a left join)
pub fn translation_map(translations: &[CategoryTranslation]) -> HashMap<&str, &str> {
    translations
        .iter()
        .map(|t| {
            (
                t.product_category_name.as_str(),
                t.product_category_name_english.as_str(),
            )
        })
        .collect()
}

/// product_id → translated category, for every product in the catalogue
///
/// products ⟕ translations: products without a translation map to None.
pub fn product_categories(
    products: &[Product],
    translations: &[CategoryTranslation],
) -> HashMap<String, Option<String>> {
    let english = translation_map(translations);

    products
        .iter()
        .map(|p| {
            let category = p
                .product_category_name
                .as_deref()
                .and_then(|name| english.get(name))
                .map(|name| name.to_string());
            (p.product_id.clone(), category)
        })
        .collect()
}

/// order_items ⋈ orders ⋈ (products ⟕ translations)
///
/// Items whose order or product is unknown are dropped (inner joins).
/// Items whose product has no translated category are kept with
/// `category = None`. Output is sorted by purchase time, then by
/// (order_id, order_item_id).
pub fn join_sales(
    orders: &[Order],
    order_items: &[OrderItem],
    products: &[Product],
    translations: &[CategoryTranslation],
) -> Vec<OrderItemRecord> {
    let purchase_times: HashMap<&str, NaiveDateTime> = orders
        .iter()
        .map(|o| (o.order_id.as_str(), o.purchase_timestamp))
        .collect();
    let categories = product_categories(products, translations);

    let mut missing_order = 0usize;
    let mut missing_product = 0usize;

    let mut records: Vec<OrderItemRecord> = order_items
        .iter()
        .filter_map(|item| {
            let Some(purchase_timestamp) = purchase_times.get(item.order_id.as_str()) else {
                missing_order += 1;
                return None;
            };
            let Some(category) = categories.get(&item.product_id) else {
                missing_product += 1;
                return None;
            };

            Some(OrderItemRecord {
                order_id: item.order_id.clone(),
                order_item_id: item.order_item_id,
                product_id: item.product_id.clone(),
                seller_id: item.seller_id.clone(),
                price: item.price,
                purchase_timestamp: *purchase_timestamp,
                category: category.clone(),
            })
        })
        .collect();

    if missing_order > 0 || missing_product > 0 {
        warn!(
            missing_order,
            missing_product, "order items dropped by inner joins"
        );
    }

    records.sort_by(|a, b| {
        a.purchase_timestamp
            .cmp(&b.purchase_timestamp)
            .then_with(|| a.order_id.cmp(&b.order_id))
            .then_with(|| a.order_item_id.cmp(&b.order_item_id))
    });

    let uncategorised = records.iter().filter(|r| r.category.is_none()).count();
    info!(
        joined = records.len(),
        uncategorised, "joined order items with orders and products"
    );

    records
}

/// records ⋈ sellers - keeps only items sold by a known seller
pub fn join_sales_with_sellers(records: &[OrderItemRecord], sellers: &[Seller]) -> Vec<OrderItemRecord> {
    let known: HashSet<&str> = sellers.iter().map(|s| s.seller_id.as_str()).collect();

    records
        .iter()
        .filter(|r| known.contains(r.seller_id.as_str()))
        .cloned()
        .collect()
}

// ============================================================================
// TESTS
// ============================================================================
