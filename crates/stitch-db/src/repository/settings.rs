//! # Settings Repository
//!
//! The store-wide settings singleton (`settings.id = 1`).

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::convert;
use crate::error::{DbError, DbResult};
use stitch_core::{Settings, TaxRate};

#[derive(Debug, sqlx::FromRow)]
struct SettingsRow {
    shipping_fee: String,
    free_shipping_threshold: Option<String>,
    tax_rate: String,
    payment_cod_enabled: bool,
    payment_bank_transfer_enabled: bool,
    payment_credit_card_enabled: bool,
}

impl TryFrom<SettingsRow> for Settings {
    type Error = DbError;

    fn try_from(row: SettingsRow) -> DbResult<Self> {
        Ok(Settings {
            shipping_fee: convert::money("settings.shipping_fee", &row.shipping_fee)?,
            free_shipping_threshold: convert::optional_money(
                "settings.free_shipping_threshold",
                row.free_shipping_threshold.as_deref(),
            )?,
            tax_rate: TaxRate::from_percent(convert::decimal("settings.tax_rate", &row.tax_rate)?),
            payment_cod_enabled: row.payment_cod_enabled,
            payment_bank_transfer_enabled: row.payment_bank_transfer_enabled,
            payment_credit_card_enabled: row.payment_credit_card_enabled,
        })
    }
}

#[derive(Debug, Clone)]
pub struct SettingsRepository {
    pool: SqlitePool,
}

impl SettingsRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SettingsRepository { pool }
    }

    /// Reads the singleton row.
    ///
    /// ## Returns
    /// * `Err(DbError::NotFound)` - the store has never been configured
    pub async fn get(&self) -> DbResult<Settings> {
        let row = sqlx::query_as::<_, SettingsRow>(
            r#"
            SELECT shipping_fee, free_shipping_threshold, tax_rate,
                   payment_cod_enabled, payment_bank_transfer_enabled, payment_credit_card_enabled
            FROM settings
            WHERE id = 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("Settings", "1"))?;

        Settings::try_from(row)
    }

    /// Creates or replaces the singleton row.
    pub async fn save(&self, settings: &Settings) -> DbResult<()> {
        debug!(
            shipping_fee = %settings.shipping_fee,
            tax_rate = %settings.tax_rate.percent(),
            "Saving store settings"
        );

        sqlx::query(
            r#"
            INSERT INTO settings (
                id, shipping_fee, free_shipping_threshold, tax_rate,
                payment_cod_enabled, payment_bank_transfer_enabled, payment_credit_card_enabled,
                updated_at
            ) VALUES (1, ?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT (id) DO UPDATE SET
                shipping_fee = excluded.shipping_fee,
                free_shipping_threshold = excluded.free_shipping_threshold,
                tax_rate = excluded.tax_rate,
                payment_cod_enabled = excluded.payment_cod_enabled,
                payment_bank_transfer_enabled = excluded.payment_bank_transfer_enabled,
                payment_credit_card_enabled = excluded.payment_credit_card_enabled,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(settings.shipping_fee.to_storage_string())
        .bind(convert::optional_money_text(settings.free_shipping_threshold))
        .bind(settings.tax_rate.percent().normalize().to_string())
        .bind(settings.payment_cod_enabled)
        .bind(settings.payment_bank_transfer_enabled)
        .bind(settings.payment_credit_card_enabled)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
