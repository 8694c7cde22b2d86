//! # Cart Service
//!
//! Cart mutations that feed checkout. The unit price of a line is captured
//! here, when the line is added, and checkout charges that captured price.
//!
//! ## Price Capture
//! ```text
//! add_item(product, size, color, qty)
//!      │
//!      ├── size AND color given, variant row exists ──► variant.price
//!      └── otherwise ─────────────────────────────────► product.price
//! ```
//!
//! Adding the same (product, size, color) twice merges into one line.
//! Stock is not reserved here; checkout is the only place stock moves.

use std::sync::Arc;

use tracing::{debug, warn};

use stitch_core::validation::{validate_attribute, validate_cart_size, validate_quantity};
use stitch_core::{Cart, CoreError};
use stitch_db::Database;

use crate::cache::{keys, CacheInvalidator};
use crate::error::CheckoutResult;

/// A request to put a product in the cart.
#[derive(Debug, Clone)]
pub struct AddCartItem {
    pub product_id: String,
    pub size: Option<String>,
    pub color: Option<String>,
    pub quantity: i64,
}

#[derive(Clone)]
pub struct CartService {
    db: Database,
    cache: Arc<dyn CacheInvalidator>,
}

impl CartService {
    pub fn new(db: Database, cache: Arc<dyn CacheInvalidator>) -> Self {
        CartService { db, cache }
    }

    /// Returns the user's cart, creating an empty one on first access.
    pub async fn get(&self, user_id: &str) -> CheckoutResult<Cart> {
        Ok(self.db.carts().get_or_create(user_id).await?)
    }

    /// Adds a product to the cart, merging with an existing identical line.
    pub async fn add_item(&self, user_id: &str, request: AddCartItem) -> CheckoutResult<Cart> {
        validate_quantity(request.quantity)?;
        let size = validate_attribute("size", request.size.as_deref())?;
        let color = validate_attribute("color", request.color.as_deref())?;

        let product = self
            .db
            .products()
            .get_by_id(&request.product_id)
            .await?
            .filter(|p| p.is_active)
            .ok_or_else(|| CoreError::ProductNotFound(request.product_id.clone()))?;

        let cart = self.db.carts().get_or_create(user_id).await?;
        let carts = self.db.carts();

        match carts
            .find_line(&cart.id, &product.id, size.as_deref(), color.as_deref())
            .await?
        {
            Some(line) => {
                let merged = line.quantity + request.quantity;
                validate_quantity(merged)?;
                carts.set_quantity(&cart.id, &line.id, merged).await?;
                debug!(user_id = %user_id, product_id = %product.id, quantity = merged, "Cart line merged");
            }
            None => {
                validate_cart_size(cart.items.len())?;

                let unit_price = match (size.as_deref(), color.as_deref()) {
                    (Some(s), Some(c)) => self
                        .db
                        .products()
                        .find_variant(&product.id, s, c)
                        .await?
                        .map(|v| v.price)
                        .unwrap_or(product.price),
                    _ => product.price,
                };

                carts
                    .insert_item(
                        &cart.id,
                        &product.id,
                        size.as_deref(),
                        color.as_deref(),
                        request.quantity,
                        unit_price,
                    )
                    .await?;
                debug!(user_id = %user_id, product_id = %product.id, unit_price = %unit_price, "Cart line added");
            }
        }

        self.reload(user_id).await
    }

    /// Sets a line's quantity. Zero removes the line.
    pub async fn update_quantity(&self, user_id: &str, item_id: &str, quantity: i64) -> CheckoutResult<Cart> {
        if quantity == 0 {
            return self.remove_item(user_id, item_id).await;
        }
        validate_quantity(quantity)?;

        let cart = self.db.carts().get_or_create(user_id).await?;
        if !self.db.carts().set_quantity(&cart.id, item_id, quantity).await? {
            return Err(CoreError::CartItemNotFound(item_id.to_string()).into());
        }

        self.reload(user_id).await
    }

    /// Removes a line from the cart.
    pub async fn remove_item(&self, user_id: &str, item_id: &str) -> CheckoutResult<Cart> {
        let cart = self.db.carts().get_or_create(user_id).await?;
        if !self.db.carts().delete_item(&cart.id, item_id).await? {
            return Err(CoreError::CartItemNotFound(item_id.to_string()).into());
        }

        self.reload(user_id).await
    }

    async fn reload(&self, user_id: &str) -> CheckoutResult<Cart> {
        if let Err(err) = self.cache.delete(&keys::cart(user_id)).await {
            warn!(user_id = %user_id, error = %err, "Cart cache invalidation failed");
        }
        Ok(self.db.carts().get_or_create(user_id).await?)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
