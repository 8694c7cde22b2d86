//! # Product Repository
//!
//! Catalog reads and writes for products and their size/color variants.
//!
//! ## Stock Columns
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  products.quantity           aggregate stock, CHECK (quantity >= 0)     │
//! │  product_variants.quantity   per size/color, CHECK (quantity >= 0)      │
//! │                                                                         │
//! │  The two are managed independently. Checkout decrements the matching   │
//! │  variant (if any) AND the aggregate, each with its own conditional     │
//! │  UPDATE inside the unit of work. Nothing here decrements stock.        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::convert;
use crate::error::DbResult;
use stitch_core::{Money, Product, ProductVariant};

// =============================================================================
// Row Mapping
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: String,
    sku: String,
    name: String,
    price: String,
    quantity: i64,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ProductRow> for Product {
    type Error = crate::DbError;

    fn try_from(row: ProductRow) -> DbResult<Self> {
        Ok(Product {
            price: convert::money("products.price", &row.price)?,
            id: row.id,
            sku: row.sku,
            name: row.name,
            quantity: row.quantity,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct VariantRow {
    id: String,
    product_id: String,
    size: String,
    color: String,
    price: String,
    quantity: i64,
}

impl TryFrom<VariantRow> for ProductVariant {
    type Error = crate::DbError;

    fn try_from(row: VariantRow) -> DbResult<Self> {
        Ok(ProductVariant {
            price: convert::money("product_variants.price", &row.price)?,
            id: row.id,
            product_id: row.product_id,
            size: row.size,
            color: row.color,
            quantity: row.quantity,
        })
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for product database operations.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Creates an active product with a generated id.
    pub async fn create(&self, sku: &str, name: &str, price: Money, quantity: i64) -> DbResult<Product> {
        let now = Utc::now();
        let product = Product {
            id: Uuid::new_v4().to_string(),
            sku: sku.to_string(),
            name: name.to_string(),
            price,
            quantity,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        self.insert(&product).await?;
        Ok(product)
    }

    pub async fn insert(&self, product: &Product) -> DbResult<()> {
        debug!(id = %product.id, sku = %product.sku, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, sku, name, price, quantity, is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&product.id)
        .bind(&product.sku)
        .bind(&product.name)
        .bind(product.price.to_storage_string())
        .bind(product.quantity)
        .bind(product.is_active)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Gets a product by its ID.
    ///
    /// ## Returns
    /// * `Ok(Some(Product))` - Product found
    /// * `Ok(None)` - Product not found
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let row = sqlx::query_as::<_, ProductRow>(
            r#"
            SELECT id, sku, name, price, quantity, is_active, created_at, updated_at
            FROM products
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Product::try_from).transpose()
    }

    /// Activates or deactivates a product. Returns `false` if nothing matched.
    pub async fn set_active(&self, id: &str, is_active: bool) -> DbResult<bool> {
        let result = sqlx::query("UPDATE products SET is_active = ?1, updated_at = ?2 WHERE id = ?3")
            .bind(is_active)
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    /// Overwrites the aggregate stock (catalog administration and tests).
    pub async fn set_quantity(&self, id: &str, quantity: i64) -> DbResult<bool> {
        let result = sqlx::query("UPDATE products SET quantity = ?1, updated_at = ?2 WHERE id = ?3")
            .bind(quantity)
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    // =========================================================================
    // Variants
    // =========================================================================

    pub async fn create_variant(
        &self,
        product_id: &str,
        size: &str,
        color: &str,
        price: Money,
        quantity: i64,
    ) -> DbResult<ProductVariant> {
        let variant = ProductVariant {
            id: Uuid::new_v4().to_string(),
            product_id: product_id.to_string(),
            size: size.to_string(),
            color: color.to_string(),
            price,
            quantity,
        };

        debug!(id = %variant.id, product_id = %product_id, size = %size, color = %color, "Inserting variant");

        sqlx::query(
            r#"
            INSERT INTO product_variants (id, product_id, size, color, price, quantity)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&variant.id)
        .bind(&variant.product_id)
        .bind(&variant.size)
        .bind(&variant.color)
        .bind(variant.price.to_storage_string())
        .bind(variant.quantity)
        .execute(&self.pool)
        .await?;

        Ok(variant)
    }

    /// Looks up the variant selected by (product, size, color).
    ///
    /// `None` means the product is sold without variant-level tracking for
    /// this selection; callers treat it as "no variant", not as an error.
    pub async fn find_variant(
        &self,
        product_id: &str,
        size: &str,
        color: &str,
    ) -> DbResult<Option<ProductVariant>> {
        let row = sqlx::query_as::<_, VariantRow>(
            r#"
            SELECT id, product_id, size, color, price, quantity
            FROM product_variants
            WHERE product_id = ?1 AND size = ?2 AND color = ?3
            "#,
        )
        .bind(product_id)
        .bind(size)
        .bind(color)
        .fetch_optional(&self.pool)
        .await?;

        row.map(ProductVariant::try_from).transpose()
    }

    pub async fn get_variant(&self, id: &str) -> DbResult<Option<ProductVariant>> {
        let row = sqlx::query_as::<_, VariantRow>(
            "SELECT id, product_id, size, color, price, quantity FROM product_variants WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(ProductVariant::try_from).transpose()
    }

    pub async fn list_variants(&self, product_id: &str) -> DbResult<Vec<ProductVariant>> {
        let rows = sqlx::query_as::<_, VariantRow>(
            r#"
            SELECT id, product_id, size, color, price, quantity
            FROM product_variants
            WHERE product_id = ?1
            ORDER BY size, color
            "#,
        )
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(ProductVariant::try_from).collect()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
