//! # Unit of Work
//!
//! An explicit transaction handle for the checkout's atomic phase. Every read
//! and write that must commit or roll back together is a method here, so no
//! checkout mutation can accidentally run on the pool outside the
//! transaction.
//!
//! ## Compare-and-Decrement
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Two checkouts race for the last unit (quantity = 1)                    │
//! │                                                                         │
//! │  Tx A                                    Tx B                           │
//! │  UPDATE products                         UPDATE products                │
//! │    SET quantity = quantity - 1             SET quantity = quantity - 1  │
//! │    WHERE id = ? AND quantity >= 1          WHERE id = ? AND quantity >= 1│
//! │  → 1 row (holds SQLite write lock)       → waits on the write lock      │
//! │  COMMIT                                  → 0 rows (quantity is now 0)   │
//! │                                          → Insufficient, ROLLBACK       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The same shape guards coupon usage:
//! `used_count = used_count + 1 WHERE usage_limit IS NULL OR used_count < usage_limit`.
//!
//! ## Ordering Rule
//! The first statement of a unit of work should be a write. In WAL mode a
//! transaction that reads first and then tries to write after another
//! writer committed fails with `SQLITE_BUSY_SNAPSHOT` instead of waiting.
//!
//! Dropping a `UnitOfWork` without calling [`UnitOfWork::commit`] rolls the
//! transaction back.

use chrono::Utc;
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::order;
use stitch_core::Order;

/// Outcome of a conditional stock decrement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decrement {
    Applied,
    /// Stock was below the requested amount; nothing changed.
    Insufficient { available: i64 },
}

/// One open database transaction.
pub struct UnitOfWork {
    tx: Transaction<'static, Sqlite>,
}

impl UnitOfWork {
    pub(crate) async fn begin(pool: &SqlitePool) -> DbResult<Self> {
        let tx = pool.begin().await?;
        debug!("Unit of work started");
        Ok(UnitOfWork { tx })
    }

    /// Consumes one use of a coupon if it still has uses left.
    ///
    /// ## Returns
    /// * `Ok(true)` - `used_count` was incremented by exactly 1
    /// * `Ok(false)` - limit already reached (or coupon gone); nothing changed
    pub async fn consume_coupon(&mut self, coupon_id: &str) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE coupons
            SET used_count = used_count + 1
            WHERE id = ?1 AND (usage_limit IS NULL OR used_count < usage_limit)
            "#,
        )
        .bind(coupon_id)
        .execute(&mut *self.tx)
        .await?;

        let applied = result.rows_affected() == 1;
        debug!(coupon_id = %coupon_id, applied, "Coupon usage increment");
        Ok(applied)
    }

    /// Inserts the order row and its items.
    pub async fn insert_order(&mut self, order: &Order) -> DbResult<()> {
        order::insert_order(&mut self.tx, order).await
    }

    /// Decrements a variant's stock if enough remains.
    pub async fn decrement_variant_stock(&mut self, variant_id: &str, quantity: i64) -> DbResult<Decrement> {
        let result = sqlx::query(
            r#"
            UPDATE product_variants
            SET quantity = quantity - ?1
            WHERE id = ?2 AND quantity >= ?1
            "#,
        )
        .bind(quantity)
        .bind(variant_id)
        .execute(&mut *self.tx)
        .await?;

        if result.rows_affected() == 1 {
            return Ok(Decrement::Applied);
        }

        let available: Option<i64> =
            sqlx::query_scalar("SELECT quantity FROM product_variants WHERE id = ?1")
                .bind(variant_id)
                .fetch_optional(&mut *self.tx)
                .await?;

        debug!(variant_id = %variant_id, quantity, ?available, "Variant stock decrement refused");
        Ok(Decrement::Insufficient {
            available: available.unwrap_or(0),
        })
    }

    /// Decrements a product's aggregate stock if enough remains.
    pub async fn decrement_product_stock(&mut self, product_id: &str, quantity: i64) -> DbResult<Decrement> {
        let result = sqlx::query(
            r#"
            UPDATE products
            SET quantity = quantity - ?1, updated_at = ?3
            WHERE id = ?2 AND quantity >= ?1
            "#,
        )
        .bind(quantity)
        .bind(product_id)
        .bind(Utc::now())
        .execute(&mut *self.tx)
        .await?;

        if result.rows_affected() == 1 {
            return Ok(Decrement::Applied);
        }

        let available: Option<i64> = sqlx::query_scalar("SELECT quantity FROM products WHERE id = ?1")
            .bind(product_id)
            .fetch_optional(&mut *self.tx)
            .await?;

        debug!(product_id = %product_id, quantity, ?available, "Product stock decrement refused");
        Ok(Decrement::Insufficient {
            available: available.unwrap_or(0),
        })
    }

    /// Deletes every line of a cart. Returns the number of lines removed.
    pub async fn clear_cart(&mut self, cart_id: &str) -> DbResult<u64> {
        let result = sqlx::query("DELETE FROM cart_items WHERE cart_id = ?1")
            .bind(cart_id)
            .execute(&mut *self.tx)
            .await?;

        sqlx::query("UPDATE carts SET updated_at = ?1 WHERE id = ?2")
            .bind(Utc::now())
            .bind(cart_id)
            .execute(&mut *self.tx)
            .await?;

        Ok(result.rows_affected())
    }

    /// Commits every change made through this unit of work.
    pub async fn commit(self) -> DbResult<()> {
        self.tx
            .commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;
        debug!("Unit of work committed");
        Ok(())
    }

    /// Discards every change made through this unit of work.
    pub async fn rollback(self) -> DbResult<()> {
        self.tx
            .rollback()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;
        debug!("Unit of work rolled back");
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::address::NewAddress;
    use crate::{Database, DbConfig};
    use chrono::Duration;
    use rust_decimal_macros::dec;
    use stitch_core::{
        Coupon, DiscountType, Money, OrderItem, OrderStatus, PaymentMethod, PaymentStatus,
    };
    use uuid::Uuid;

    struct Fixture {
        db: Database,
        user_id: String,
        product_id: String,
        variant_id: String,
        cart_id: String,
        address: stitch_core::Address,
    }

    async fn fixture() -> Fixture {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let user = db.users().create("uow@example.com", "Uow").await.unwrap();
        let product = db
            .products()
            .create("DRS-01", "Wrap Dress", Money::from_units(500_000), 3)
            .await
            .unwrap();
        let variant = db
            .products()
            .create_variant(&product.id, "S", "Green", Money::from_units(500_000), 1)
            .await
            .unwrap();
        let cart = db.carts().get_or_create(&user.id).await.unwrap();
        db.carts()
            .insert_item(&cart.id, &product.id, Some("S"), Some("Green"), 1, Money::from_units(500_000))
            .await
            .unwrap();
        let address = db
            .addresses()
            .create(
                &user.id,
                NewAddress {
                    full_name: "Uow",
                    phone: "1",
                    street: "1 Main",
                    city: "City",
                    state: "ST",
                    postal_code: "00000",
                    country: "VN",
                },
            )
            .await
            .unwrap();

        Fixture {
            db,
            user_id: user.id,
            product_id: product.id,
            variant_id: variant.id,
            cart_id: cart.id,
            address,
        }
    }

    fn order_for(f: &Fixture, key: Option<&str>) -> Order {
        let now = Utc::now();
        let id = Uuid::new_v4().to_string();
        Order {
            id: id.clone(),
            order_number: format!("ORD-TEST-{}", &id[..8]),
            user_id: f.user_id.clone(),
            status: OrderStatus::Pending,
            payment_status: PaymentStatus::Pending,
            payment_method: PaymentMethod::Cod,
            subtotal: Money::from_units(500_000),
            discount: Money::zero(),
            tax: Money::from_decimal(dec!(41250.5)),
            shipping: Money::from_units(30_000),
            total: Money::from_decimal(dec!(571250.5)),
            shipping_address: f.address.snapshot(),
            billing_address: f.address.snapshot(),
            coupon_id: None,
            notes: Some("gift wrap".to_string()),
            idempotency_key: key.map(str::to_string),
            items: vec![OrderItem {
                id: Uuid::new_v4().to_string(),
                order_id: id,
                product_id: f.product_id.clone(),
                product_name: "Wrap Dress".to_string(),
                size: Some("S".to_string()),
                color: Some("Green".to_string()),
                price: Money::from_units(500_000),
                quantity: 1,
                total: Money::from_units(500_000),
                created_at: now,
            }],
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_commit_persists_order_exactly() {
        let f = fixture().await;
        let order = order_for(&f, None);

        let mut uow = f.db.begin().await.unwrap();
        uow.insert_order(&order).await.unwrap();
        assert_eq!(uow.clear_cart(&f.cart_id).await.unwrap(), 1);
        uow.commit().await.unwrap();

        let loaded = f.db.orders().get_for_user(&f.user_id, &order.id).await.unwrap().unwrap();
        assert_eq!(loaded.total, order.total);
        assert_eq!(loaded.tax, Money::from_decimal(dec!(41250.5)));
        assert_eq!(loaded.shipping_address, order.shipping_address);
        assert_eq!(loaded.items.len(), 1);
        assert_eq!(loaded.status, OrderStatus::Pending);
        assert!(f.db.carts().load(&f.user_id).await.unwrap().unwrap().is_empty());

        let listed = f.db.orders().list_for_user(&f.user_id).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].items.len(), 1);
        assert!(f.db.orders().get_for_user("someone-else", &order.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_drop_rolls_back() {
        let f = fixture().await;
        {
            let mut uow = f.db.begin().await.unwrap();
            uow.insert_order(&order_for(&f, None)).await.unwrap();
            assert_eq!(
                uow.decrement_product_stock(&f.product_id, 1).await.unwrap(),
                Decrement::Applied
            );
            uow.clear_cart(&f.cart_id).await.unwrap();
        }

        assert_eq!(f.db.orders().count_for_user(&f.user_id).await.unwrap(), 0);
        let product = f.db.products().get_by_id(&f.product_id).await.unwrap().unwrap();
        assert_eq!(product.quantity, 3);
        assert_eq!(f.db.carts().load(&f.user_id).await.unwrap().unwrap().items.len(), 1);
    }

    #[tokio::test]
    async fn test_decrement_refuses_to_go_negative() {
        let f = fixture().await;
        let mut uow = f.db.begin().await.unwrap();

        assert_eq!(
            uow.decrement_variant_stock(&f.variant_id, 2).await.unwrap(),
            Decrement::Insufficient { available: 1 }
        );
        assert_eq!(
            uow.decrement_variant_stock(&f.variant_id, 1).await.unwrap(),
            Decrement::Applied
        );
        assert_eq!(
            uow.decrement_variant_stock(&f.variant_id, 1).await.unwrap(),
            Decrement::Insufficient { available: 0 }
        );
        assert_eq!(
            uow.decrement_product_stock("missing", 1).await.unwrap(),
            Decrement::Insufficient { available: 0 }
        );
        uow.rollback().await.unwrap();

        let variant = f.db.products().get_variant(&f.variant_id).await.unwrap().unwrap();
        assert_eq!(variant.quantity, 1);
    }

    #[tokio::test]
    async fn test_consume_coupon_respects_limit() {
        let f = fixture().await;
        let now = Utc::now();
        let coupon = Coupon {
            id: Uuid::new_v4().to_string(),
            code: "ONCE".to_string(),
            discount_type: DiscountType::Fixed,
            value: dec!(10000),
            min_order_amount: None,
            max_discount_amount: None,
            is_active: true,
            valid_from: now - Duration::days(1),
            valid_until: now + Duration::days(1),
            usage_limit: Some(1),
            used_count: 0,
        };
        f.db.coupons().insert(&coupon).await.unwrap();

        let mut uow = f.db.begin().await.unwrap();
        assert!(uow.consume_coupon(&coupon.id).await.unwrap());
        assert!(!uow.consume_coupon(&coupon.id).await.unwrap());
        uow.commit().await.unwrap();

        let stored = f.db.coupons().get_by_id(&coupon.id).await.unwrap().unwrap();
        assert_eq!(stored.used_count, 1);
    }

    #[tokio::test]
    async fn test_duplicate_idempotency_key_is_unique_violation() {
        let f = fixture().await;

        let mut uow = f.db.begin().await.unwrap();
        uow.insert_order(&order_for(&f, Some("key-1"))).await.unwrap();
        uow.commit().await.unwrap();

        let mut uow = f.db.begin().await.unwrap();
        let err = uow.insert_order(&order_for(&f, Some("key-1"))).await.unwrap_err();
        assert!(err.is_unique_violation_on("orders.idempotency_key"), "{err:?}");
        uow.rollback().await.unwrap();

        let found = f
            .db
            .orders()
            .find_by_idempotency_key(&f.user_id, "key-1")
            .await
            .unwrap();
        assert!(found.is_some());
        assert_eq!(f.db.orders().count_for_user(&f.user_id).await.unwrap(), 1);
    }
}
