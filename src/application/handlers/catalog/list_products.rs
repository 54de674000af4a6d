//! ListProductsHandler - Query handler for the public product catalog.

use std::sync::Arc;

use serde::Serialize;

use crate::ports::{PaymentError, PaymentProvider, Product};

/// Fallback currency when a price carries none.
const DEFAULT_CURRENCY: &str = "USD";

/// Simplified product representation served to the frontend.
#[derive(Debug, Clone, Serialize)]
pub struct ProductSummary {
    pub id: String,
    pub name: String,
    pub description: String,
    /// Price in major units (e.g. dollars).
    pub price: f64,
    pub currency: String,
    pub features: Vec<String>,
    pub popular: bool,
}

/// Handler for listing purchasable products.
///
/// Fetches the provider catalog and reshapes each entry: first listed
/// price (tolerating absent fields), minor-to-major unit conversion, a
/// popularity flag derived from the name, and benefits flattened into a
/// feature list.
pub struct ListProductsHandler {
    payment_provider: Arc<dyn PaymentProvider>,
}

impl ListProductsHandler {
    pub fn new(payment_provider: Arc<dyn PaymentProvider>) -> Self {
        Self { payment_provider }
    }

    pub async fn handle(&self) -> Result<Vec<ProductSummary>, PaymentError> {
        let products = self.payment_provider.list_products().await?;

        Ok(products
            .into_iter()
            .filter(|p| p.is_recurring && !p.is_archived)
            .map(reshape)
            .collect())
    }
}

/// Reshape a provider product into its external representation.
fn reshape(product: Product) -> ProductSummary {
    let first_price = product.prices.first();

    let amount_minor = first_price.and_then(|p| p.amount_minor).unwrap_or(0);
    let currency = first_price
        .and_then(|p| p.currency.clone())
        .unwrap_or_else(|| DEFAULT_CURRENCY.to_string());

    ProductSummary {
        popular: is_popular(&product.name),
        features: product
            .benefits
            .into_iter()
            .map(|b| b.description)
            .collect(),
        id: product.id,
        name: product.name,
        description: product.description.unwrap_or_default(),
        price: minor_to_major(amount_minor),
        currency,
    }
}

/// Convert minor units (cents) to major units.
fn minor_to_major(amount_minor: i64) -> f64 {
    amount_minor as f64 / 100.0
}

/// A product is flagged popular when its name contains "pro" in any
/// letter case.
fn is_popular(name: &str) -> bool {
    name.to_lowercase().contains("pro")
}
