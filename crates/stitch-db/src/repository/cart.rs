//! # Cart Repository
//!
//! Storage for the one-cart-per-user pre-checkout collection.
//!
//! ## Cart Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. CREATE (lazily)                                                     │
//! │     └── get_or_create(user) → Cart { items: [] }                        │
//! │                                                                         │
//! │  2. MUTATE                                                              │
//! │     └── insert_item / add_quantity / set_quantity / delete_item         │
//! │                                                                         │
//! │  3. EMPTIED by checkout                                                 │
//! │     └── UnitOfWork::clear_cart (same transaction as the order insert)   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Line items carry the unit price captured when they were added; price
//! selection lives in the checkout crate's cart service.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::convert;
use crate::error::{DbError, DbResult};
use stitch_core::{Cart, CartItem, Money};

// =============================================================================
// Row Mapping
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct CartRow {
    id: String,
    user_id: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
struct CartItemRow {
    id: String,
    cart_id: String,
    product_id: String,
    size: Option<String>,
    color: Option<String>,
    quantity: i64,
    unit_price: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<CartItemRow> for CartItem {
    type Error = DbError;

    fn try_from(row: CartItemRow) -> DbResult<Self> {
        Ok(CartItem {
            unit_price: convert::money("cart_items.unit_price", &row.unit_price)?,
            id: row.id,
            cart_id: row.cart_id,
            product_id: row.product_id,
            size: row.size,
            color: row.color,
            quantity: row.quantity,
            created_at: row.created_at,
        })
    }
}

const ITEM_COLUMNS: &str =
    "id, cart_id, product_id, size, color, quantity, unit_price, created_at";

// =============================================================================
// Repository
// =============================================================================

#[derive(Debug, Clone)]
pub struct CartRepository {
    pool: SqlitePool,
}

impl CartRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CartRepository { pool }
    }

    /// Returns the user's cart, creating an empty one on first use.
    pub async fn get_or_create(&self, user_id: &str) -> DbResult<Cart> {
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO carts (id, user_id, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?3)
            ON CONFLICT (user_id) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(user_id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        self.load(user_id)
            .await?
            .ok_or_else(|| DbError::not_found("Cart", user_id))
    }

    /// Loads the user's cart with its items in insertion order.
    pub async fn load(&self, user_id: &str) -> DbResult<Option<Cart>> {
        let Some(cart) = sqlx::query_as::<_, CartRow>(
            "SELECT id, user_id, created_at, updated_at FROM carts WHERE user_id = ?1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?
        else {
            return Ok(None);
        };

        let rows = sqlx::query_as::<_, CartItemRow>(&format!(
            "SELECT {ITEM_COLUMNS} FROM cart_items WHERE cart_id = ?1 ORDER BY created_at, rowid"
        ))
        .bind(&cart.id)
        .fetch_all(&self.pool)
        .await?;

        let items = rows
            .into_iter()
            .map(CartItem::try_from)
            .collect::<DbResult<Vec<_>>>()?;

        debug!(cart_id = %cart.id, items = items.len(), "Loaded cart");

        Ok(Some(Cart {
            id: cart.id,
            user_id: cart.user_id,
            items,
            created_at: cart.created_at,
            updated_at: cart.updated_at,
        }))
    }

    /// Finds the line for (product, size, color); NULL selectors match NULL.
    pub async fn find_line(
        &self,
        cart_id: &str,
        product_id: &str,
        size: Option<&str>,
        color: Option<&str>,
    ) -> DbResult<Option<CartItem>> {
        let row = sqlx::query_as::<_, CartItemRow>(&format!(
            r#"
            SELECT {ITEM_COLUMNS} FROM cart_items
            WHERE cart_id = ?1 AND product_id = ?2 AND size IS ?3 AND color IS ?4
            "#
        ))
        .bind(cart_id)
        .bind(product_id)
        .bind(size)
        .bind(color)
        .fetch_optional(&self.pool)
        .await?;

        row.map(CartItem::try_from).transpose()
    }

    /// Inserts a new line with a captured unit price.
    pub async fn insert_item(
        &self,
        cart_id: &str,
        product_id: &str,
        size: Option<&str>,
        color: Option<&str>,
        quantity: i64,
        unit_price: Money,
    ) -> DbResult<CartItem> {
        let item = CartItem {
            id: Uuid::new_v4().to_string(),
            cart_id: cart_id.to_string(),
            product_id: product_id.to_string(),
            size: size.map(str::to_string),
            color: color.map(str::to_string),
            quantity,
            unit_price,
            created_at: Utc::now(),
        };

        debug!(cart_id = %cart_id, product_id = %product_id, quantity, "Inserting cart item");

        sqlx::query(
            r#"
            INSERT INTO cart_items (id, cart_id, product_id, size, color, quantity, unit_price, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&item.id)
        .bind(&item.cart_id)
        .bind(&item.product_id)
        .bind(&item.size)
        .bind(&item.color)
        .bind(item.quantity)
        .bind(item.unit_price.to_storage_string())
        .bind(item.created_at)
        .execute(&self.pool)
        .await?;

        self.touch(cart_id).await?;
        Ok(item)
    }

    /// Sets a line's quantity. Returns `false` if the line is not in the cart.
    pub async fn set_quantity(&self, cart_id: &str, item_id: &str, quantity: i64) -> DbResult<bool> {
        let result = sqlx::query("UPDATE cart_items SET quantity = ?1 WHERE id = ?2 AND cart_id = ?3")
            .bind(quantity)
            .bind(item_id)
            .bind(cart_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 1 {
            self.touch(cart_id).await?;
        }
        Ok(result.rows_affected() == 1)
    }

    /// Removes a line. Returns `false` if the line is not in the cart.
    pub async fn delete_item(&self, cart_id: &str, item_id: &str) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM cart_items WHERE id = ?1 AND cart_id = ?2")
            .bind(item_id)
            .bind(cart_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 1 {
            self.touch(cart_id).await?;
        }
        Ok(result.rows_affected() == 1)
    }

    async fn touch(&self, cart_id: &str) -> DbResult<()> {
        sqlx::query("UPDATE carts SET updated_at = ?1 WHERE id = ?2")
            .bind(Utc::now())
            .bind(cart_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
