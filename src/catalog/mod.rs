//! Catalog
//!
//! The demo storefront's product list, shipped as a YAML fixture and
//! parsed into minor-unit prices at load time.

use rust_decimal::{Decimal, prelude::ToPrimitive};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The built-in demo catalog.
const PRODUCTS_YAML: &str = include_str!("products.yaml");

/// Errors related to catalog parsing.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// YAML parsing error.
    #[error("failed to parse catalog: {0}")]
    Yaml(#[from] serde_norway::Error),

    /// A price string could not be converted to minor units.
    #[error("invalid price format: {0}")]
    InvalidPrice(String),
}

/// A product offered by the storefront.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// Stable identifier, used as the cart line key.
    pub id: String,

    /// Display name.
    pub name: String,

    /// Unit price in minor units.
    pub price: u64,

    /// Short marketing description.
    pub description: String,
}

/// Product entry as written in the catalog file.
#[derive(Debug, Deserialize)]
struct RawProduct {
    id: String,
    name: String,
    price: String,
    description: String,
}

/// Wrapper for the products list in YAML.
#[derive(Debug, Deserialize)]
struct CatalogFixture {
    products: Vec<RawProduct>,
}

impl TryFrom<RawProduct> for Product {
    type Error = CatalogError;

    fn try_from(raw: RawProduct) -> Result<Self, Self::Error> {
        Ok(Product {
            price: parse_price(&raw.price)?,
            id: raw.id,
            name: raw.name,
            description: raw.description,
        })
    }
}

/// The products sold by the demo storefront, in catalog order.
///
/// # Errors
///
/// Returns a [`CatalogError`] if the built-in catalog does not parse;
/// that indicates a packaging defect, not a runtime condition.
pub fn sample_products() -> Result<Vec<Product>, CatalogError> {
    let fixture: CatalogFixture = serde_norway::from_str(PRODUCTS_YAML)?;

    fixture
        .products
        .into_iter()
        .map(Product::try_from)
        .collect()
}

/// Parse a decimal price string (e.g. "199.00") into minor units.
fn parse_price(price: &str) -> Result<u64, CatalogError> {
    let amount = price
        .trim()
        .parse::<Decimal>()
        .map_err(|_err| CatalogError::InvalidPrice(price.to_string()))?;

    amount
        .checked_mul(Decimal::new(100, 0))
        .and_then(|value| value.round_dp(0).to_u64())
        .ok_or_else(|| CatalogError::InvalidPrice(price.to_string()))
}
