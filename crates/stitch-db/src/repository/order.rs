//! # Order Repository
//!
//! Read access to committed orders plus the row-level insert used by the
//! unit of work.
//!
//! ## Storage Layout
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  orders                                                                 │
//! │  ├── subtotal / discount / tax / shipping / total   TEXT (decimal)      │
//! │  ├── shipping_address / billing_address             TEXT (JSON snapshot)│
//! │  ├── order_number                                   UNIQUE              │
//! │  └── (user_id, idempotency_key)                     UNIQUE              │
//! │                                                                         │
//! │  order_items (1:N, ON DELETE CASCADE)                                   │
//! │  └── price / total TEXT, product_name frozen at order time              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::convert;
use crate::error::{DbError, DbResult};
use stitch_core::{Order, OrderItem, OrderStatus, PaymentMethod, PaymentStatus};

// =============================================================================
// Row Mapping
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: String,
    order_number: String,
    user_id: String,
    status: OrderStatus,
    payment_status: PaymentStatus,
    payment_method: PaymentMethod,
    subtotal: String,
    discount: String,
    tax: String,
    shipping: String,
    total: String,
    shipping_address: String,
    billing_address: String,
    coupon_id: Option<String>,
    notes: Option<String>,
    idempotency_key: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl OrderRow {
    fn into_order(self, items: Vec<OrderItem>) -> DbResult<Order> {
        Ok(Order {
            subtotal: convert::money("orders.subtotal", &self.subtotal)?,
            discount: convert::money("orders.discount", &self.discount)?,
            tax: convert::money("orders.tax", &self.tax)?,
            shipping: convert::money("orders.shipping", &self.shipping)?,
            total: convert::money("orders.total", &self.total)?,
            shipping_address: convert::json("orders.shipping_address", &self.shipping_address)?,
            billing_address: convert::json("orders.billing_address", &self.billing_address)?,
            id: self.id,
            order_number: self.order_number,
            user_id: self.user_id,
            status: self.status,
            payment_status: self.payment_status,
            payment_method: self.payment_method,
            coupon_id: self.coupon_id,
            notes: self.notes,
            idempotency_key: self.idempotency_key,
            items,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OrderItemRow {
    id: String,
    order_id: String,
    product_id: String,
    product_name: String,
    size: Option<String>,
    color: Option<String>,
    price: String,
    quantity: i64,
    total: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<OrderItemRow> for OrderItem {
    type Error = DbError;

    fn try_from(row: OrderItemRow) -> DbResult<Self> {
        Ok(OrderItem {
            price: convert::money("order_items.price", &row.price)?,
            total: convert::money("order_items.total", &row.total)?,
            id: row.id,
            order_id: row.order_id,
            product_id: row.product_id,
            product_name: row.product_name,
            size: row.size,
            color: row.color,
            quantity: row.quantity,
            created_at: row.created_at,
        })
    }
}

const ORDER_COLUMNS: &str = r#"
    id, order_number, user_id, status, payment_status, payment_method,
    subtotal, discount, tax, shipping, total,
    shipping_address, billing_address, coupon_id, notes, idempotency_key,
    created_at, updated_at
"#;

const ITEM_COLUMNS: &str = r#"
    oi.id, oi.order_id, oi.product_id, oi.product_name, oi.size, oi.color,
    oi.price, oi.quantity, oi.total, oi.created_at
"#;

// =============================================================================
// Insert (used inside a transaction)
// =============================================================================

/// Inserts an order and all of its items on the given connection.
pub(crate) async fn insert_order(conn: &mut SqliteConnection, order: &Order) -> DbResult<()> {
    debug!(id = %order.id, order_number = %order.order_number, items = order.items.len(), "Inserting order");

    sqlx::query(&format!(
        r#"
        INSERT INTO orders ({ORDER_COLUMNS})
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)
        "#
    ))
    .bind(&order.id)
    .bind(&order.order_number)
    .bind(&order.user_id)
    .bind(order.status)
    .bind(order.payment_status)
    .bind(order.payment_method)
    .bind(order.subtotal.to_storage_string())
    .bind(order.discount.to_storage_string())
    .bind(order.tax.to_storage_string())
    .bind(order.shipping.to_storage_string())
    .bind(order.total.to_storage_string())
    .bind(serde_json::to_string(&order.shipping_address)?)
    .bind(serde_json::to_string(&order.billing_address)?)
    .bind(&order.coupon_id)
    .bind(&order.notes)
    .bind(&order.idempotency_key)
    .bind(order.created_at)
    .bind(order.updated_at)
    .execute(&mut *conn)
    .await?;

    for item in &order.items {
        sqlx::query(
            r#"
            INSERT INTO order_items (
                id, order_id, product_id, product_name, size, color,
                price, quantity, total, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&item.id)
        .bind(&item.order_id)
        .bind(&item.product_id)
        .bind(&item.product_name)
        .bind(&item.size)
        .bind(&item.color)
        .bind(item.price.to_storage_string())
        .bind(item.quantity)
        .bind(item.total.to_storage_string())
        .bind(item.created_at)
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}

/// Reads a user's orders and their items on one connection.
async fn list_with_items(conn: &mut SqliteConnection, user_id: &str) -> DbResult<Vec<Order>> {
    let rows = sqlx::query_as::<_, OrderRow>(&format!(
        "SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = ?1 ORDER BY created_at DESC, rowid DESC"
    ))
    .bind(user_id)
    .fetch_all(&mut *conn)
    .await?;

    let item_rows = sqlx::query_as::<_, OrderItemRow>(&format!(
        r#"
        SELECT {ITEM_COLUMNS}
        FROM order_items oi
        INNER JOIN orders o ON o.id = oi.order_id
        WHERE o.user_id = ?1
        ORDER BY oi.rowid
        "#
    ))
    .bind(user_id)
    .fetch_all(&mut *conn)
    .await?;

    let mut items_by_order: HashMap<String, Vec<OrderItem>> = HashMap::new();
    for row in item_rows {
        let item = OrderItem::try_from(row)?;
        items_by_order.entry(item.order_id.clone()).or_default().push(item);
    }

    rows.into_iter()
        .map(|row| {
            let items = items_by_order.remove(&row.id).unwrap_or_default();
            row.into_order(items)
        })
        .collect()
}

// =============================================================================
// Repository
// =============================================================================

#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository { pool }
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Order>> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        self.with_items(row).await
    }

    /// Gets an order only if it belongs to `user_id`.
    pub async fn get_for_user(&self, user_id: &str, order_id: &str) -> DbResult<Option<Order>> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?1 AND user_id = ?2"
        ))
        .bind(order_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        self.with_items(row).await
    }

    /// Finds the order a previous checkout created under an idempotency key.
    pub async fn find_by_idempotency_key(&self, user_id: &str, key: &str) -> DbResult<Option<Order>> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = ?1 AND idempotency_key = ?2"
        ))
        .bind(user_id)
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        self.with_items(row).await
    }

    /// Lists the user's orders, newest first, each with its items.
    ///
    /// Orders and items are read inside one read transaction, so an order
    /// committed mid-listing is either fully present or absent.
    pub async fn list_for_user(&self, user_id: &str) -> DbResult<Vec<Order>> {
        let mut tx = self.pool.begin().await?;
        let orders = list_with_items(&mut *tx, user_id).await?;
        tx.commit().await?;

        debug!(user_id = %user_id, count = orders.len(), "Listed orders");
        Ok(orders)
    }

    pub async fn count_for_user(&self, user_id: &str) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders WHERE user_id = ?1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn items_for(&self, order_id: &str) -> DbResult<Vec<OrderItem>> {
        let rows = sqlx::query_as::<_, OrderItemRow>(&format!(
            "SELECT {ITEM_COLUMNS} FROM order_items oi WHERE oi.order_id = ?1 ORDER BY oi.rowid"
        ))
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(OrderItem::try_from).collect()
    }

    async fn with_items(&self, row: Option<OrderRow>) -> DbResult<Option<Order>> {
        match row {
            Some(row) => {
                let items = self.items_for(&row.id).await?;
                Ok(Some(row.into_order(items)?))
            }
            None => Ok(None),
        }
    }
}
