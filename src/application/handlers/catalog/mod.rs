//! Catalog query handlers - public product listing.

mod list_products;

pub use list_products::{ListProductsHandler, ProductSummary};
