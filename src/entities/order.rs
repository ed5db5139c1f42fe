// 🧾 Order Entities - orders and their line items
//
// An order owns the purchase timestamp; an order item carries the
// product, the seller and the price. The two meet on order_id.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

// ============================================================================
// ORDER
// ============================================================================

/// RawOrder - row of orders.csv before timestamp parsing
#[derive(Debug, Clone, Deserialize)]
pub struct RawOrder {
    pub order_id: String,
    pub order_purchase_timestamp: String,
}

/// Order with a parsed purchase timestamp
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub order_id: String,
    pub purchase_timestamp: NaiveDateTime,
}

impl Order {
    pub fn new(order_id: &str, purchase_timestamp: NaiveDateTime) -> Self {
        Order {
            order_id: order_id.to_string(),
            purchase_timestamp,
        }
    }

    /// Parse a raw row; None when the timestamp is not in a supported format
    pub fn from_raw(raw: RawOrder) -> Option<Self> {
        let purchase_timestamp = parse_timestamp(&raw.order_purchase_timestamp)?;
        Some(Order {
            order_id: raw.order_id,
            purchase_timestamp,
        })
    }

    /// Calendar day of the purchase
    pub fn purchase_day(&self) -> NaiveDate {
        self.purchase_timestamp.date()
    }
}

/// Parse the timestamp formats found in the order exports
///
/// Accepted:
/// - `2017-10-02 10:56:33`
/// - `2017-10-02T10:56:33`
/// - `2017-10-02` (midnight)
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();

    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(ts) = NaiveDateTime::parse_from_str(value, format) {
            return Some(ts);
        }
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

// ============================================================================
// ORDER ITEM
// ============================================================================

/// One line of an order (order_items.csv)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub order_id: String,
    /// Sequence number of the item inside its order (1-based)
    pub order_item_id: u32,
    pub product_id: String,
    pub seller_id: String,
    pub price: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_timestamp_formats() {
        let expected = NaiveDate::from_ymd_opt(2017, 10, 2)
            .unwrap()
            .and_hms_opt(10, 56, 33)
            .unwrap();

        assert_eq!(parse_timestamp("2017-10-02 10:56:33"), Some(expected));
        assert_eq!(parse_timestamp("2017-10-02T10:56:33"), Some(expected));
        assert_eq!(
            parse_timestamp("2017-10-02"),
            NaiveDate::from_ymd_opt(2017, 10, 2).unwrap().and_hms_opt(0, 0, 0)
        );
    }

    #[test]
    fn test_parse_timestamp_rejects_garbage() {
        assert_eq!(parse_timestamp("10/02/2017"), None);
        assert_eq!(parse_timestamp("2017-10-02 10:56"), None);
        assert_eq!(parse_timestamp(""), None);
    }

    #[test]
    fn test_order_purchase_day_truncates_time() {
        let order = Order::from_raw(RawOrder {
            order_id: "o1".to_string(),
            order_purchase_timestamp: "2018-01-05 23:59:59".to_string(),
        })
        .unwrap();

        assert_eq!(order.purchase_day(), NaiveDate::from_ymd_opt(2018, 1, 5).unwrap());
    }
}
