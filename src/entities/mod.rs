// Entity Models - one record type per source table
//
// Each entity mirrors a CSV row:
// - Raw* structs are deserialized straight from the file (strings as-is)
// - The public structs carry parsed values (timestamps, optional fields)

pub mod order;
pub mod product;
pub mod seller;
pub mod review;

pub use order::{Order, OrderItem, RawOrder, parse_timestamp};
pub use product::{Product, CategoryTranslation};
pub use seller::Seller;
pub use review::Review;
