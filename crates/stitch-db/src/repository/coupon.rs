//! # Coupon Repository
//!
//! Plain lookups for coupon resolution. Usage is only ever consumed through
//! [`UnitOfWork::consume_coupon`](crate::UnitOfWork::consume_coupon).

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use crate::convert;
use crate::error::DbResult;
use stitch_core::{Coupon, DiscountType};

#[derive(Debug, sqlx::FromRow)]
struct CouponRow {
    id: String,
    code: String,
    discount_type: DiscountType,
    value: String,
    min_order_amount: Option<String>,
    max_discount_amount: Option<String>,
    is_active: bool,
    valid_from: DateTime<Utc>,
    valid_until: DateTime<Utc>,
    usage_limit: Option<i64>,
    used_count: i64,
}

impl TryFrom<CouponRow> for Coupon {
    type Error = crate::DbError;

    fn try_from(row: CouponRow) -> DbResult<Self> {
        Ok(Coupon {
            value: convert::decimal("coupons.value", &row.value)?,
            min_order_amount: convert::optional_money(
                "coupons.min_order_amount",
                row.min_order_amount.as_deref(),
            )?,
            max_discount_amount: convert::optional_money(
                "coupons.max_discount_amount",
                row.max_discount_amount.as_deref(),
            )?,
            id: row.id,
            code: row.code,
            discount_type: row.discount_type,
            is_active: row.is_active,
            valid_from: row.valid_from,
            valid_until: row.valid_until,
            usage_limit: row.usage_limit,
            used_count: row.used_count,
        })
    }
}

const COUPON_COLUMNS: &str = r#"
    id, code, discount_type, value, min_order_amount, max_discount_amount,
    is_active, valid_from, valid_until, usage_limit, used_count
"#;

#[derive(Debug, Clone)]
pub struct CouponRepository {
    pool: SqlitePool,
}

impl CouponRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CouponRepository { pool }
    }

    pub async fn insert(&self, coupon: &Coupon) -> DbResult<()> {
        debug!(id = %coupon.id, code = %coupon.code, "Inserting coupon");

        sqlx::query(
            r#"
            INSERT INTO coupons (
                id, code, discount_type, value, min_order_amount, max_discount_amount,
                is_active, valid_from, valid_until, usage_limit, used_count
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )
        .bind(&coupon.id)
        .bind(&coupon.code)
        .bind(coupon.discount_type)
        .bind(coupon.value.normalize().to_string())
        .bind(convert::optional_money_text(coupon.min_order_amount))
        .bind(convert::optional_money_text(coupon.max_discount_amount))
        .bind(coupon.is_active)
        .bind(coupon.valid_from)
        .bind(coupon.valid_until)
        .bind(coupon.usage_limit)
        .bind(coupon.used_count)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Coupon>> {
        let row = sqlx::query_as::<_, CouponRow>(&format!(
            "SELECT {COUPON_COLUMNS} FROM coupons WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Coupon::try_from).transpose()
    }

    /// Case-sensitive lookup by code.
    pub async fn get_by_code(&self, code: &str) -> DbResult<Option<Coupon>> {
        let row = sqlx::query_as::<_, CouponRow>(&format!(
            "SELECT {COUPON_COLUMNS} FROM coupons WHERE code = ?1"
        ))
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Coupon::try_from).transpose()
    }
}
