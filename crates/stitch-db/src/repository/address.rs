//! # Address Repository
//!
//! Saved addresses. Every lookup used by checkout is scoped by user id, so an
//! address belonging to somebody else is indistinguishable from a missing
//! one.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;
use stitch_core::Address;

#[derive(Debug, sqlx::FromRow)]
struct AddressRow {
    id: String,
    user_id: String,
    full_name: String,
    phone: String,
    street: String,
    city: String,
    state: String,
    postal_code: String,
    country: String,
}

impl From<AddressRow> for Address {
    fn from(row: AddressRow) -> Self {
        Address {
            id: row.id,
            user_id: row.user_id,
            full_name: row.full_name,
            phone: row.phone,
            street: row.street,
            city: row.city,
            state: row.state,
            postal_code: row.postal_code,
            country: row.country,
        }
    }
}

/// Fields for a new address.
#[derive(Debug, Clone)]
pub struct NewAddress<'a> {
    pub full_name: &'a str,
    pub phone: &'a str,
    pub street: &'a str,
    pub city: &'a str,
    pub state: &'a str,
    pub postal_code: &'a str,
    pub country: &'a str,
}

#[derive(Debug, Clone)]
pub struct AddressRepository {
    pool: SqlitePool,
}

impl AddressRepository {
    pub fn new(pool: SqlitePool) -> Self {
        AddressRepository { pool }
    }

    pub async fn create(&self, user_id: &str, new: NewAddress<'_>) -> DbResult<Address> {
        let address = Address {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            full_name: new.full_name.to_string(),
            phone: new.phone.to_string(),
            street: new.street.to_string(),
            city: new.city.to_string(),
            state: new.state.to_string(),
            postal_code: new.postal_code.to_string(),
            country: new.country.to_string(),
        };

        debug!(id = %address.id, user_id = %user_id, "Inserting address");

        sqlx::query(
            r#"
            INSERT INTO addresses (
                id, user_id, full_name, phone, street,
                city, state, postal_code, country, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&address.id)
        .bind(&address.user_id)
        .bind(&address.full_name)
        .bind(&address.phone)
        .bind(&address.street)
        .bind(&address.city)
        .bind(&address.state)
        .bind(&address.postal_code)
        .bind(&address.country)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(address)
    }

    /// Gets an address only if it belongs to `user_id`.
    pub async fn get_for_user(&self, user_id: &str, address_id: &str) -> DbResult<Option<Address>> {
        let row = sqlx::query_as::<_, AddressRow>(
            r#"
            SELECT id, user_id, full_name, phone, street, city, state, postal_code, country
            FROM addresses
            WHERE id = ?1 AND user_id = ?2
            "#,
        )
        .bind(address_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Address::from))
    }

    pub async fn list_for_user(&self, user_id: &str) -> DbResult<Vec<Address>> {
        let rows = sqlx::query_as::<_, AddressRow>(
            r#"
            SELECT id, user_id, full_name, phone, street, city, state, postal_code, country
            FROM addresses
            WHERE user_id = ?1
            ORDER BY created_at, rowid
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Address::from).collect())
    }

    /// Edits the street line of an address. Historical orders keep their
    /// snapshots.
    pub async fn update_street(&self, user_id: &str, address_id: &str, street: &str) -> DbResult<bool> {
        let result = sqlx::query("UPDATE addresses SET street = ?1 WHERE id = ?2 AND user_id = ?3")
            .bind(street)
            .bind(address_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    /// Deletes an address. Returns `false` if nothing matched.
    pub async fn delete(&self, user_id: &str, address_id: &str) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM addresses WHERE id = ?1 AND user_id = ?2")
            .bind(address_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }
}
