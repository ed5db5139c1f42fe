// 🏪 Seller Entity - marketplace sellers and their location

use serde::{Deserialize, Serialize};

/// Row of sellers.csv
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Seller {
    pub seller_id: String,
    pub seller_city: Option<String>,
    pub seller_state: Option<String>,
}

impl Seller {
    /// "city/STATE" for display, with "?" for unknown parts
    pub fn location(&self) -> String {
        format!(
            "{}/{}",
            self.seller_city.as_deref().unwrap_or("?"),
            self.seller_state.as_deref().unwrap_or("?")
        )
    }
}
