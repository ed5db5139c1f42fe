// 📦 Product Entities - catalogue rows and category translations
//
// Category names in the catalogue are Portuguese; the translation table
// maps them to the English names used everywhere downstream.

use serde::{Deserialize, Serialize};

/// Product catalogue row (products.csv)
///
/// Only the fields the analyses use are kept; other columns are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub product_id: String,
    pub product_category_name: Option<String>,
    pub product_weight_g: Option<f64>,
    pub product_length_cm: Option<f64>,
    pub product_height_cm: Option<f64>,
    pub product_width_cm: Option<f64>,
}

impl Product {
    /// Volume in cubic centimetres when all three dimensions are known
    pub fn volume_cm3(&self) -> Option<f64> {
        Some(self.product_length_cm? * self.product_height_cm? * self.product_width_cm?)
    }
}

/// Row of product_category_name_translation.csv
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryTranslation {
    pub product_category_name: String,
    pub product_category_name_english: String,
}
