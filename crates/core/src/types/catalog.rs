//! Catalog records held by the buyer's cart and wishlist.
//!
//! These are the shapes persisted under the `cart` and `wishlist` storage
//! keys, so field names follow the backend's camelCase JSON.

use serde::{Deserialize, Serialize};

use crate::{Price, ProductId};

/// The subset of a product needed to put it in a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSummary {
    /// Product identifier (the backend's `_id`).
    #[serde(alias = "_id", alias = "id")]
    pub product_id: ProductId,
    /// Display name.
    pub name: String,
    /// Unit price.
    pub price: Price,
}

impl ProductSummary {
    /// Create a product summary.
    #[must_use]
    pub fn new(product_id: impl Into<ProductId>, name: impl Into<String>, price: Price) -> Self {
        Self {
            product_id: product_id.into(),
            name: name.into(),
            price,
        }
    }
}

/// One line of the buyer's cart.
///
/// `quantity` is always at least 1 while the item is stored; the cart store
/// removes lines instead of keeping them at zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    /// Product identifier, unique within a cart.
    #[serde(alias = "_id", alias = "id")]
    pub product_id: ProductId,
    /// Display name captured when the item was first added.
    pub name: String,
    /// Unit price captured when the item was first added.
    pub price: Price,
    /// Number of units.
    pub quantity: u32,
}

impl CartItem {
    /// Build a cart line from a product summary.
    #[must_use]
    pub fn from_product(product: &ProductSummary, quantity: u32) -> Self {
        Self {
            product_id: product.product_id.clone(),
            name: product.name.clone(),
            price: product.price,
            quantity,
        }
    }

    /// Price of this line (unit price times quantity), or `None` if it
    /// does not fit in a decimal.
    #[must_use]
    pub fn line_total(&self) -> Option<Price> {
        self.price.checked_times(self.quantity)
    }
}

/// A product saved for later.
///
/// Only the id matters for membership; every other product field the caller
/// supplied is kept so the wishlist can be rendered without refetching.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WishlistItem {
    /// Product identifier, unique within a wishlist.
    #[serde(rename = "productId", alias = "_id", alias = "id")]
    pub product_id: ProductId,
    /// Remaining product fields, verbatim.
    #[serde(flatten)]
    pub fields: serde_json::Map<String, serde_json::Value>,
}

impl WishlistItem {
    /// Create a wishlist entry with no extra fields.
    #[must_use]
    pub fn new(product_id: impl Into<ProductId>) -> Self {
        Self {
            product_id: product_id.into(),
            fields: serde_json::Map::new(),
        }
    }

    /// Attach an extra product field.
    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.fields.insert(key.into(), value);
        self
    }
}

impl From<&ProductSummary> for WishlistItem {
    fn from(product: &ProductSummary) -> Self {
        Self::new(product.product_id.clone())
            .with_field("name", serde_json::Value::String(product.name.clone()))
            .with_field(
                "price",
                serde_json::Value::String(product.price.amount().to_string()),
            )
    }
}
