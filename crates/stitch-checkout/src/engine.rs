//! # Order Transaction
//!
//! Turns the user's cart into a persisted order.
//!
//! ## Checkout Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  create(request)                                                        │
//! │                                                                         │
//! │  0. validate input; replay existing order for (user, idempotency key)   │
//! │                                                                         │
//! │  PRE-CHECKS (read-only, nothing persisted on failure)                   │
//! │  1. payment method enabled?            ── no ──► PaymentMethodDisabled  │
//! │  2. cart exists and non-empty?         ── no ──► EmptyCart              │
//! │  3. addresses owned by user?           ── no ──► AddressNotFound        │
//! │  4. StockValidator                     ── no ──► InsufficientStock      │
//! │  5. CouponResolver                     ── no ──► Coupon*                │
//! │  6. PricingCalculator                                                   │
//! │                                                                         │
//! │  ATOMIC PHASE (one UnitOfWork)                                          │
//! │  a. order number (generated up front)                                   │
//! │  b. coupon used_count + 1   (conditional) ── 0 rows ──► CouponExhausted │
//! │  c. INSERT order + items                                                │
//! │  d. per line: variant - qty, product - qty                              │
//! │                             (conditional) ── 0 rows ──► InsufficientStock│
//! │  e. DELETE cart items                                                   │
//! │  f. COMMIT                  any failure above ──► ROLLBACK              │
//! │                                                                         │
//! │  AFTER COMMIT (spawned, never awaited)                                  │
//! │  - invalidate orders:user:{id}:*, delete cart:user:{id}                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Step (b) runs first in the unit of work so the transaction's first
//! statement is a write (see `stitch_db::unit_of_work`). Without a coupon
//! the order insert is the first write.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use stitch_core::stock::variant_label;
use stitch_core::validation::{validate_id, validate_idempotency_key, validate_notes};
use stitch_core::{
    Address, CartItem, Coupon, CouponResolver, CoreError, Order, OrderItem, OrderStatus,
    PaymentMethod, PaymentStatus, PricingCalculator, Product, ProductVariant, StockRequest,
    StockValidator,
};
use stitch_db::{Database, Decrement, UnitOfWork};

use crate::cache::{keys, CacheInvalidator};
use crate::error::{CheckoutError, CheckoutResult};
use crate::order_number;
use crate::settings::SettingsProvider;

// =============================================================================
// Request / Outcome
// =============================================================================

/// A checkout submission on behalf of an authenticated user.
#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    pub user_id: String,
    pub shipping_address_id: String,
    /// Defaults to the shipping address.
    pub billing_address_id: Option<String>,
    pub payment_method: PaymentMethod,
    pub notes: Option<String>,
    pub coupon_id: Option<String>,
    pub idempotency_key: Option<String>,
}

/// Result of a checkout.
#[derive(Debug, Clone)]
pub struct CheckoutOutcome {
    pub order: Order,
    /// `false` when an earlier request with the same idempotency key
    /// already created this order.
    pub created: bool,
}

/// One cart line resolved against the catalog.
struct PlannedLine {
    item: CartItem,
    product: Product,
    variant: Option<ProductVariant>,
}

/// Everything the atomic phase needs, computed during pre-checks.
struct CheckoutPlan {
    cart_id: String,
    lines: Vec<PlannedLine>,
    coupon: Option<Coupon>,
    order: Order,
}

// =============================================================================
// Engine
// =============================================================================

/// The order-fulfillment engine.
///
/// Cheap to clone; collaborators are shared.
#[derive(Clone)]
pub struct OrderTransaction {
    db: Database,
    settings: Arc<dyn SettingsProvider>,
    cache: Arc<dyn CacheInvalidator>,
}

impl OrderTransaction {
    pub fn new(
        db: Database,
        settings: Arc<dyn SettingsProvider>,
        cache: Arc<dyn CacheInvalidator>,
    ) -> Self {
        OrderTransaction { db, settings, cache }
    }

    /// Runs a checkout.
    ///
    /// ## Returns
    /// * `Ok(CheckoutOutcome { created: true, .. })` - order committed
    /// * `Ok(CheckoutOutcome { created: false, .. })` - idempotent replay
    /// * `Err(CheckoutError::Rejected(_))` - business rule; nothing persisted
    /// * `Err(CheckoutError::Transaction(_))` - persistence failure; rolled back
    pub async fn create(&self, request: CheckoutRequest) -> CheckoutResult<CheckoutOutcome> {
        let request = normalize(request)?;

        if let Some(existing) = self.find_replay(&request).await? {
            info!(
                user_id = %request.user_id,
                order_number = %existing.order_number,
                "Checkout replayed by idempotency key"
            );
            return Ok(CheckoutOutcome {
                order: existing,
                created: false,
            });
        }

        let plan = match self.prepare(&request).await {
            Ok(plan) => plan,
            Err(err) => return self.settle_failure(&request, err).await,
        };

        let mut uow = match self.db.begin().await {
            Ok(uow) => uow,
            Err(err) => return self.settle_failure(&request, err.into()).await,
        };
        match apply(&mut uow, &plan).await {
            Ok(()) => {
                if let Err(err) = uow.commit().await {
                    return self.settle_failure(&request, err.into()).await;
                }
            }
            Err(err) => {
                if let Err(rollback_err) = uow.rollback().await {
                    error!(error = %rollback_err, "Rollback failed; connection discards the transaction");
                }
                return self.settle_failure(&request, err).await;
            }
        }

        info!(
            user_id = %plan.order.user_id,
            order_id = %plan.order.id,
            order_number = %plan.order.order_number,
            total = %plan.order.total,
            items = plan.order.items.len(),
            "Order committed"
        );

        self.spawn_invalidation(&plan.order.user_id);

        Ok(CheckoutOutcome {
            order: plan.order,
            created: true,
        })
    }

    // =========================================================================
    // Pre-checks
    // =========================================================================

    async fn find_replay(&self, request: &CheckoutRequest) -> CheckoutResult<Option<Order>> {
        match &request.idempotency_key {
            Some(key) => Ok(self
                .db
                .orders()
                .find_by_idempotency_key(&request.user_id, key)
                .await?),
            None => Ok(None),
        }
    }

    async fn prepare(&self, request: &CheckoutRequest) -> CheckoutResult<CheckoutPlan> {
        let user_id = request.user_id.as_str();

        // 1. Payment method
        let settings = self.settings.get_settings().await?;
        if !settings.is_enabled(request.payment_method) {
            return Err(CoreError::PaymentMethodDisabled(
                request.payment_method.as_str().to_string(),
            )
            .into());
        }

        // 2. Cart
        let cart = match self.db.carts().load(user_id).await? {
            Some(cart) if !cart.is_empty() => cart,
            _ => return Err(CoreError::EmptyCart.into()),
        };

        // 3. Addresses
        let shipping = self.owned_address(user_id, &request.shipping_address_id).await?;
        let billing = match request.billing_address_id.as_deref() {
            Some(id) if id != shipping.id => self.owned_address(user_id, id).await?,
            _ => shipping.clone(),
        };

        // 4. Stock
        let mut lines = Vec::with_capacity(cart.items.len());
        for item in &cart.items {
            let product = self
                .db
                .products()
                .get_by_id(&item.product_id)
                .await?
                .filter(|p| p.is_active)
                .ok_or_else(|| CoreError::ProductNotFound(item.product_id.clone()))?;

            let variant = match item.variant_selector() {
                Some((size, color)) => self.db.products().find_variant(&product.id, size, color).await?,
                None => None,
            };

            lines.push(PlannedLine {
                item: item.clone(),
                product,
                variant,
            });
        }

        let stock_requests: Vec<StockRequest<'_>> = lines
            .iter()
            .map(|line| StockRequest {
                product: &line.product,
                variant: line.variant.as_ref(),
                requested: line.item.quantity,
            })
            .collect();
        StockValidator::validate(&stock_requests)?;

        // 5. Coupon
        let subtotal = cart.subtotal();
        let now = Utc::now();
        let found = match request.coupon_id.as_deref() {
            Some(id) => self.db.coupons().get_by_id(id).await?,
            None => None,
        };
        let resolution =
            CouponResolver::resolve(request.coupon_id.as_deref(), found.as_ref(), subtotal, now)?;

        // 6. Pricing
        let breakdown = PricingCalculator::compute(subtotal, resolution.discount, &settings);
        debug!(
            user_id = %user_id,
            subtotal = %breakdown.subtotal,
            discount = %breakdown.discount,
            shipping = %breakdown.shipping,
            tax = %breakdown.tax,
            total = %breakdown.total,
            "Checkout priced"
        );

        let order_id = Uuid::new_v4().to_string();
        let items = lines
            .iter()
            .map(|line| OrderItem {
                id: Uuid::new_v4().to_string(),
                order_id: order_id.clone(),
                product_id: line.product.id.clone(),
                product_name: line.product.name.clone(),
                size: line.item.size.clone(),
                color: line.item.color.clone(),
                price: line.item.unit_price,
                quantity: line.item.quantity,
                total: line.item.line_total(),
                created_at: now,
            })
            .collect();

        let order = Order {
            id: order_id,
            order_number: order_number::generate(now),
            user_id: user_id.to_string(),
            status: OrderStatus::Pending,
            payment_status: PaymentStatus::Pending,
            payment_method: request.payment_method,
            subtotal: breakdown.subtotal,
            discount: breakdown.discount,
            tax: breakdown.tax,
            shipping: breakdown.shipping,
            total: breakdown.total,
            shipping_address: shipping.snapshot(),
            billing_address: billing.snapshot(),
            coupon_id: resolution.coupon_id().map(str::to_string),
            notes: request.notes.clone(),
            idempotency_key: request.idempotency_key.clone(),
            items,
            created_at: now,
            updated_at: now,
        };

        Ok(CheckoutPlan {
            cart_id: cart.id,
            lines,
            coupon: resolution.coupon,
            order,
        })
    }

    async fn owned_address(&self, user_id: &str, address_id: &str) -> CheckoutResult<Address> {
        self.db
            .addresses()
            .get_for_user(user_id, address_id)
            .await?
            .ok_or_else(|| CoreError::AddressNotFound(address_id.to_string()).into())
    }

    // =========================================================================
    // After the atomic phase
    // =========================================================================

    /// Turns a failed attempt into a replay when a concurrent request with
    /// the same idempotency key won; otherwise logs and returns `err`.
    ///
    /// The loser can fail in several ways (cart already cleared, unique
    /// violation on the key, last coupon use taken), so the key is checked
    /// regardless of the error.
    async fn settle_failure(
        &self,
        request: &CheckoutRequest,
        err: CheckoutError,
    ) -> CheckoutResult<CheckoutOutcome> {
        if let Some(key) = &request.idempotency_key {
            match self.db.orders().find_by_idempotency_key(&request.user_id, key).await {
                Ok(Some(order)) => {
                    info!(
                        user_id = %request.user_id,
                        order_number = %order.order_number,
                        error = %err,
                        "Concurrent checkout with same idempotency key; returning existing order"
                    );
                    return Ok(CheckoutOutcome {
                        order,
                        created: false,
                    });
                }
                Ok(None) => {}
                Err(lookup_err) => {
                    warn!(user_id = %request.user_id, error = %lookup_err, "Idempotency lookup after failure failed");
                }
            }
        }
        Err(log_failure(&request.user_id, err))
    }

    fn spawn_invalidation(&self, user_id: &str) {
        let cache = Arc::clone(&self.cache);
        let user_id = user_id.to_string();

        tokio::spawn(async move {
            if let Err(err) = cache.invalidate(&keys::orders_pattern(&user_id)).await {
                warn!(user_id = %user_id, error = %err, "Order list cache invalidation failed");
            }
            if let Err(err) = cache.delete(&keys::cart(&user_id)).await {
                warn!(user_id = %user_id, error = %err, "Cart cache invalidation failed");
            }
        });
    }
}

// =============================================================================
// Atomic Phase
// =============================================================================

/// Applies every mutation of a checkout through one unit of work.
///
/// Returning `Err` means the caller must roll back.
async fn apply(uow: &mut UnitOfWork, plan: &CheckoutPlan) -> CheckoutResult<()> {
    if let Some(coupon) = &plan.coupon {
        if !uow.consume_coupon(&coupon.id).await? {
            return Err(CoreError::CouponExhausted(coupon.code.clone()).into());
        }
    }

    uow.insert_order(&plan.order).await?;

    for line in &plan.lines {
        let qty = line.item.quantity;

        if let Some(variant) = &line.variant {
            if let Decrement::Insufficient { available } =
                uow.decrement_variant_stock(&variant.id, qty).await?
            {
                return Err(CoreError::InsufficientStock {
                    product: line.product.name.clone(),
                    variant: Some(variant_label(variant)),
                    available,
                    requested: qty,
                }
                .into());
            }
        }

        if let Decrement::Insufficient { available } =
            uow.decrement_product_stock(&line.product.id, qty).await?
        {
            return Err(CoreError::InsufficientStock {
                product: line.product.name.clone(),
                variant: None,
                available,
                requested: qty,
            }
            .into());
        }
    }

    uow.clear_cart(&plan.cart_id).await?;
    Ok(())
}

// =============================================================================
// Helpers
// =============================================================================

fn normalize(request: CheckoutRequest) -> CheckoutResult<CheckoutRequest> {
    validate_id("shippingAddressId", &request.shipping_address_id)?;
    if let Some(id) = &request.billing_address_id {
        validate_id("billingAddressId", id)?;
    }
    if let Some(id) = &request.coupon_id {
        validate_id("couponId", id)?;
    }

    let notes = validate_notes(request.notes.as_deref())?;
    let idempotency_key = request
        .idempotency_key
        .as_deref()
        .map(validate_idempotency_key)
        .transpose()?;

    Ok(CheckoutRequest {
        notes,
        idempotency_key,
        ..request
    })
}

fn log_failure(user_id: &str, err: CheckoutError) -> CheckoutError {
    match &err {
        CheckoutError::Rejected(reason) => {
            warn!(user_id = %user_id, code = reason.code(), reason = %reason, "Checkout rejected");
        }
        CheckoutError::Transaction(db_err) => {
            error!(user_id = %user_id, error = %db_err, "Checkout transaction failed");
        }
        CheckoutError::Settings(msg) => {
            error!(user_id = %user_id, error = %msg, "Checkout could not read store settings");
        }
    }
    err
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use chrono::Duration as ChronoDuration;
    use rust_decimal_macros::dec;
    use stitch_core::{DiscountType, Money, Settings, TaxRate};
    use stitch_db::{DbConfig, NewAddress};

    use crate::cache::CacheError;
    use crate::settings::DbSettingsProvider;

    // -------------------------------------------------------------------------
    // Fixture
    // -------------------------------------------------------------------------

    #[derive(Default)]
    struct RecordingCache {
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl CacheInvalidator for RecordingCache {
        async fn invalidate(&self, pattern: &str) -> Result<(), CacheError> {
            self.calls.lock().unwrap().push(format!("invalidate {pattern}"));
            Ok(())
        }

        async fn delete(&self, key: &str) -> Result<(), CacheError> {
            self.calls.lock().unwrap().push(format!("delete {key}"));
            Ok(())
        }
    }

    impl RecordingCache {
        async fn wait_for(&self, n: usize) -> Vec<String> {
            for _ in 0..100 {
                if self.calls.lock().unwrap().len() >= n {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
            self.calls.lock().unwrap().clone()
        }
    }

    /// Every eviction fails, the way an unreachable Redis would.
    #[derive(Default)]
    struct FailingCache {
        attempts: Mutex<usize>,
    }

    #[async_trait]
    impl CacheInvalidator for FailingCache {
        async fn invalidate(&self, _pattern: &str) -> Result<(), CacheError> {
            *self.attempts.lock().unwrap() += 1;
            Err(CacheError::Unavailable("connection refused".to_string()))
        }

        async fn delete(&self, _key: &str) -> Result<(), CacheError> {
            *self.attempts.lock().unwrap() += 1;
            Err(CacheError::Unavailable("connection refused".to_string()))
        }
    }

    struct Shopper {
        user_id: String,
        address_id: String,
    }

    struct Store {
        db: Database,
        engine: OrderTransaction,
        cache: Arc<RecordingCache>,
        product: Product,
        variant: ProductVariant,
    }

    fn store_settings() -> Settings {
        Settings {
            shipping_fee: Money::from_units(30_000),
            free_shipping_threshold: Some(Money::from_units(1_000_000)),
            tax_rate: TaxRate::from_percent(dec!(10)),
            payment_cod_enabled: true,
            payment_bank_transfer_enabled: true,
            payment_credit_card_enabled: false,
        }
    }

    async fn open_store(db: Database) -> Store {
        db.settings().save(&store_settings()).await.unwrap();
        let product = db
            .products()
            .create("TEE-BLK", "Oversized Tee", Money::from_units(250_000), 10)
            .await
            .unwrap();
        let variant = db
            .products()
            .create_variant(&product.id, "M", "Black", Money::from_units(250_000), 4)
            .await
            .unwrap();

        let cache = Arc::new(RecordingCache::default());
        let engine = OrderTransaction::new(
            db.clone(),
            Arc::new(DbSettingsProvider::new(db.clone())),
            cache.clone(),
        );

        Store {
            db,
            engine,
            cache,
            product,
            variant,
        }
    }

    async fn memory_store() -> Store {
        open_store(Database::new(DbConfig::in_memory()).await.unwrap()).await
    }

    async fn shopper(db: &Database, email: &str) -> Shopper {
        let user = db.users().create(email, "Shopper").await.unwrap();
        let address = db
            .addresses()
            .create(
                &user.id,
                NewAddress {
                    full_name: "Shopper",
                    phone: "0900000000",
                    street: "12 Silk Road",
                    city: "Hanoi",
                    state: "HN",
                    postal_code: "100000",
                    country: "VN",
                },
            )
            .await
            .unwrap();
        Shopper {
            user_id: user.id,
            address_id: address.id,
        }
    }

    async fn fill_cart(db: &Database, shopper: &Shopper, product: &Product, variant: Option<&ProductVariant>, qty: i64) {
        let cart = db.carts().get_or_create(&shopper.user_id).await.unwrap();
        let (size, color, price) = match variant {
            Some(v) => (Some(v.size.as_str()), Some(v.color.as_str()), v.price),
            None => (None, None, product.price),
        };
        db.carts()
            .insert_item(&cart.id, &product.id, size, color, qty, price)
            .await
            .unwrap();
    }

    fn request(shopper: &Shopper) -> CheckoutRequest {
        CheckoutRequest {
            user_id: shopper.user_id.clone(),
            shipping_address_id: shopper.address_id.clone(),
            billing_address_id: None,
            payment_method: PaymentMethod::Cod,
            notes: None,
            coupon_id: None,
            idempotency_key: None,
        }
    }

    fn coupon(code: &str, kind: DiscountType, value: rust_decimal::Decimal) -> Coupon {
        let now = Utc::now();
        Coupon {
            id: Uuid::new_v4().to_string(),
            code: code.to_string(),
            discount_type: kind,
            value,
            min_order_amount: None,
            max_discount_amount: None,
            is_active: true,
            valid_from: now - ChronoDuration::days(1),
            valid_until: now + ChronoDuration::days(30),
            usage_limit: None,
            used_count: 0,
        }
    }

    async fn stock_of(db: &Database, product_id: &str, variant_id: &str) -> (i64, i64) {
        let product = db.products().get_by_id(product_id).await.unwrap().unwrap();
        let variant = db.products().get_variant(variant_id).await.unwrap().unwrap();
        (product.quantity, variant.quantity)
    }

    fn rejection(err: &CheckoutError) -> &CoreError {
        err.as_rejection()
            .unwrap_or_else(|| panic!("expected a business rejection, got {err:?}"))
    }

    // -------------------------------------------------------------------------
    // Happy path
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_checkout_creates_order_and_moves_stock() {
        let s = memory_store().await;
        let alice = shopper(&s.db, "alice@example.com").await;
        fill_cart(&s.db, &alice, &s.product, Some(&s.variant), 2).await;

        let mut req = request(&alice);
        req.notes = Some("  leave at door  ".to_string());
        let outcome = s.engine.create(req).await.unwrap();
        let order = &outcome.order;

        assert!(outcome.created);
        assert!(order.order_number.starts_with("ORD-"));
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.payment_status, PaymentStatus::Pending);
        assert_eq!(order.subtotal, Money::from_units(500_000));
        assert_eq!(order.shipping, Money::from_units(30_000));
        assert_eq!(order.tax, Money::from_units(50_000));
        assert_eq!(order.total, Money::from_units(580_000));
        assert_eq!(order.notes.as_deref(), Some("leave at door"));
        assert_eq!(order.billing_address, order.shipping_address);
        assert_eq!(order.items.len(), 1);
        assert_eq!(order.items[0].size.as_deref(), Some("M"));
        assert_eq!(order.items[0].total, Money::from_units(500_000));

        let stored = s.db.orders().get_by_id(&order.id).await.unwrap().unwrap();
        assert_eq!(&stored, order);

        assert_eq!(stock_of(&s.db, &s.product.id, &s.variant.id).await, (8, 2));
        assert!(s.db.carts().load(&alice.user_id).await.unwrap().unwrap().is_empty());

        let calls = s.cache.wait_for(2).await;
        assert!(calls.contains(&format!("invalidate orders:user:{}:*", alice.user_id)));
        assert!(calls.contains(&format!("delete cart:user:{}", alice.user_id)));
    }

    #[tokio::test]
    async fn test_cache_outage_never_fails_checkout() {
        let s = memory_store().await;
        let cache = Arc::new(FailingCache::default());
        let engine = OrderTransaction::new(
            s.db.clone(),
            Arc::new(DbSettingsProvider::new(s.db.clone())),
            cache.clone(),
        );
        let ned = shopper(&s.db, "ned@example.com").await;
        fill_cart(&s.db, &ned, &s.product, Some(&s.variant), 1).await;

        let outcome = engine.create(request(&ned)).await.unwrap();
        assert!(outcome.created);

        for _ in 0..100 {
            if *cache.attempts.lock().unwrap() >= 2 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(*cache.attempts.lock().unwrap(), 2);

        let stored = s.db.orders().get_by_id(&outcome.order.id).await.unwrap();
        assert_eq!(stored.as_ref(), Some(&outcome.order));
        assert!(s.db.carts().load(&ned.user_id).await.unwrap().unwrap().is_empty());
        assert_eq!(stock_of(&s.db, &s.product.id, &s.variant.id).await, (9, 3));
    }

    #[tokio::test]
    async fn test_address_snapshot_is_frozen() {
        let s = memory_store().await;
        let alice = shopper(&s.db, "frozen@example.com").await;
        fill_cart(&s.db, &alice, &s.product, None, 1).await;

        let order = s.engine.create(request(&alice)).await.unwrap().order;
        assert!(s
            .db
            .addresses()
            .update_street(&alice.user_id, &alice.address_id, "99 New Street")
            .await
            .unwrap());

        let stored = s.db.orders().get_by_id(&order.id).await.unwrap().unwrap();
        assert_eq!(stored.shipping_address.street, "12 Silk Road");
    }

    #[tokio::test]
    async fn test_percentage_coupon_with_cap() {
        let s = memory_store().await;
        let bob = shopper(&s.db, "bob@example.com").await;
        fill_cart(&s.db, &bob, &s.product, Some(&s.variant), 2).await;

        let mut c = coupon("TENOFF", DiscountType::Percentage, dec!(10));
        c.max_discount_amount = Some(Money::from_units(40_000));
        s.db.coupons().insert(&c).await.unwrap();

        let mut req = request(&bob);
        req.coupon_id = Some(c.id.clone());
        let order = s.engine.create(req).await.unwrap().order;

        assert_eq!(order.discount, Money::from_units(40_000));
        assert_eq!(order.shipping, Money::from_units(30_000));
        assert_eq!(order.tax, Money::from_units(46_000));
        assert_eq!(order.total, Money::from_units(536_000));
        assert_eq!(order.coupon_id.as_deref(), Some(c.id.as_str()));

        let stored = s.db.coupons().get_by_id(&c.id).await.unwrap().unwrap();
        assert_eq!(stored.used_count, 1);
    }

    #[tokio::test]
    async fn test_separate_billing_address() {
        let s = memory_store().await;
        let cara = shopper(&s.db, "cara@example.com").await;
        fill_cart(&s.db, &cara, &s.product, None, 1).await;
        let billing = s
            .db
            .addresses()
            .create(
                &cara.user_id,
                NewAddress {
                    full_name: "Cara Billing",
                    phone: "0911111111",
                    street: "1 Ledger St",
                    city: "Da Nang",
                    state: "DN",
                    postal_code: "550000",
                    country: "VN",
                },
            )
            .await
            .unwrap();

        let mut req = request(&cara);
        req.billing_address_id = Some(billing.id.clone());
        let order = s.engine.create(req).await.unwrap().order;

        assert_eq!(order.billing_address.street, "1 Ledger St");
        assert_eq!(order.shipping_address.street, "12 Silk Road");
        // No variant selected: only aggregate stock moves.
        assert_eq!(stock_of(&s.db, &s.product.id, &s.variant.id).await, (9, 4));
    }

    // -------------------------------------------------------------------------
    // Rejections
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_empty_cart_rejected() {
        let s = memory_store().await;
        let dan = shopper(&s.db, "dan@example.com").await;

        let err = s.engine.create(request(&dan)).await.unwrap_err();
        assert_eq!(rejection(&err), &CoreError::EmptyCart);

        s.db.carts().get_or_create(&dan.user_id).await.unwrap();
        let err = s.engine.create(request(&dan)).await.unwrap_err();
        assert_eq!(rejection(&err), &CoreError::EmptyCart);
    }

    #[tokio::test]
    async fn test_disabled_payment_method_rejected() {
        let s = memory_store().await;
        let eve = shopper(&s.db, "eve@example.com").await;
        fill_cart(&s.db, &eve, &s.product, None, 1).await;

        let mut req = request(&eve);
        req.payment_method = PaymentMethod::CreditCard;
        let err = s.engine.create(req).await.unwrap_err();

        assert_eq!(
            rejection(&err),
            &CoreError::PaymentMethodDisabled("CREDIT_CARD".to_string())
        );
        assert_eq!(s.db.orders().count_for_user(&eve.user_id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_foreign_address_rejected_without_mutation() {
        let s = memory_store().await;
        let fay = shopper(&s.db, "fay@example.com").await;
        let gus = shopper(&s.db, "gus@example.com").await;
        fill_cart(&s.db, &fay, &s.product, Some(&s.variant), 1).await;

        let mut req = request(&fay);
        req.shipping_address_id = gus.address_id.clone();
        let err = s.engine.create(req).await.unwrap_err();

        assert_eq!(rejection(&err), &CoreError::AddressNotFound(gus.address_id.clone()));
        assert_eq!(stock_of(&s.db, &s.product.id, &s.variant.id).await, (10, 4));
        assert_eq!(s.db.carts().load(&fay.user_id).await.unwrap().unwrap().items.len(), 1);
    }

    #[tokio::test]
    async fn test_insufficient_variant_stock_rejected() {
        let s = memory_store().await;
        let hal = shopper(&s.db, "hal@example.com").await;
        fill_cart(&s.db, &hal, &s.product, Some(&s.variant), 5).await;

        let err = s.engine.create(request(&hal)).await.unwrap_err();
        assert_eq!(
            rejection(&err),
            &CoreError::InsufficientStock {
                product: "Oversized Tee".to_string(),
                variant: Some("M/Black".to_string()),
                available: 4,
                requested: 5,
            }
        );
    }

    #[tokio::test]
    async fn test_inactive_product_rejected() {
        let s = memory_store().await;
        let ida = shopper(&s.db, "ida@example.com").await;
        fill_cart(&s.db, &ida, &s.product, None, 1).await;
        s.db.products().set_active(&s.product.id, false).await.unwrap();

        let err = s.engine.create(request(&ida)).await.unwrap_err();
        assert_eq!(rejection(&err), &CoreError::ProductNotFound(s.product.id.clone()));
    }

    #[tokio::test]
    async fn test_coupon_rejections() {
        let s = memory_store().await;
        let jon = shopper(&s.db, "jon@example.com").await;
        fill_cart(&s.db, &jon, &s.product, None, 1).await;

        let mut req = request(&jon);
        let missing = Uuid::new_v4().to_string();
        req.coupon_id = Some(missing.clone());
        let err = s.engine.create(req.clone()).await.unwrap_err();
        assert_eq!(rejection(&err), &CoreError::CouponNotFound(missing));

        let mut expired = coupon("OLD", DiscountType::Fixed, dec!(10000));
        expired.valid_until = Utc::now() - ChronoDuration::hours(1);
        s.db.coupons().insert(&expired).await.unwrap();
        req.coupon_id = Some(expired.id.clone());
        let err = s.engine.create(req.clone()).await.unwrap_err();
        assert_eq!(rejection(&err), &CoreError::CouponExpired("OLD".to_string()));

        let mut big_spender = coupon("BIG", DiscountType::Fixed, dec!(10000));
        big_spender.min_order_amount = Some(Money::from_units(1_000_000));
        s.db.coupons().insert(&big_spender).await.unwrap();
        req.coupon_id = Some(big_spender.id.clone());
        let err = s.engine.create(req).await.unwrap_err();
        assert_eq!(
            rejection(&err),
            &CoreError::CouponMinimumNotMet {
                required: Money::from_units(1_000_000)
            }
        );
    }

    #[tokio::test]
    async fn test_unknown_coupon_code_is_coupon_not_found() {
        let s = memory_store().await;
        let kim = shopper(&s.db, "kim@example.com").await;
        fill_cart(&s.db, &kim, &s.product, None, 1).await;

        let mut req = request(&kim);
        req.coupon_id = Some("SUMMER10".to_string());
        let err = s.engine.create(req).await.unwrap_err();
        assert_eq!(rejection(&err), &CoreError::CouponNotFound("SUMMER10".to_string()));
        assert_eq!(s.db.orders().count_for_user(&kim.user_id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_unknown_address_id_is_address_not_found() {
        let s = memory_store().await;
        let kim = shopper(&s.db, "kim@example.com").await;
        fill_cart(&s.db, &kim, &s.product, None, 1).await;

        let mut req = request(&kim);
        req.shipping_address_id = "addr-123".to_string();
        let err = s.engine.create(req).await.unwrap_err();
        assert_eq!(rejection(&err), &CoreError::AddressNotFound("addr-123".to_string()));

        let mut req = request(&kim);
        req.billing_address_id = Some("addr-456".to_string());
        let err = s.engine.create(req).await.unwrap_err();
        assert_eq!(rejection(&err), &CoreError::AddressNotFound("addr-456".to_string()));
    }

    #[tokio::test]
    async fn test_blank_address_id_is_validation_error() {
        let s = memory_store().await;
        let kim = shopper(&s.db, "kim@example.com").await;

        let mut req = request(&kim);
        req.shipping_address_id = "   ".to_string();
        let err = s.engine.create(req).await.unwrap_err();
        assert!(matches!(rejection(&err), CoreError::Validation(_)));
    }

    // -------------------------------------------------------------------------
    // Atomicity
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_commit_time_shortfall_rolls_back_everything() {
        let s = memory_store().await;
        let lou = shopper(&s.db, "lou@example.com").await;
        fill_cart(&s.db, &lou, &s.product, Some(&s.variant), 2).await;
        let c = coupon("FLAT", DiscountType::Fixed, dec!(50000));
        s.db.coupons().insert(&c).await.unwrap();

        let mut req = request(&lou);
        req.coupon_id = Some(c.id.clone());
        let plan = s.engine.prepare(&req).await.unwrap();

        // Aggregate stock drops after the pre-check passed.
        s.db.products().set_quantity(&s.product.id, 1).await.unwrap();

        let mut uow = s.db.begin().await.unwrap();
        let err = apply(&mut uow, &plan).await.unwrap_err();
        uow.rollback().await.unwrap();

        assert_eq!(
            rejection(&err),
            &CoreError::InsufficientStock {
                product: "Oversized Tee".to_string(),
                variant: None,
                available: 1,
                requested: 2,
            }
        );
        // Coupon use, order insert and variant decrement all rolled back.
        assert_eq!(s.db.orders().count_for_user(&lou.user_id).await.unwrap(), 0);
        assert_eq!(s.db.coupons().get_by_id(&c.id).await.unwrap().unwrap().used_count, 0);
        assert_eq!(stock_of(&s.db, &s.product.id, &s.variant.id).await, (1, 4));
        assert_eq!(s.db.carts().load(&lou.user_id).await.unwrap().unwrap().items.len(), 1);
    }

    // -------------------------------------------------------------------------
    // Idempotency
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_idempotent_replay_returns_same_order() {
        let s = memory_store().await;
        let max = shopper(&s.db, "max@example.com").await;
        fill_cart(&s.db, &max, &s.product, None, 1).await;

        let mut req = request(&max);
        req.idempotency_key = Some("checkout-7f3a".to_string());

        let first = s.engine.create(req.clone()).await.unwrap();
        let second = s.engine.create(req).await.unwrap();

        assert!(first.created);
        assert!(!second.created);
        assert_eq!(first.order.id, second.order.id);
        assert_eq!(s.db.orders().count_for_user(&max.user_id).await.unwrap(), 1);
        assert_eq!(stock_of(&s.db, &s.product.id, &s.variant.id).await.0, 9);
    }

    #[tokio::test]
    async fn test_same_key_different_users_are_independent() {
        let s = memory_store().await;
        let ned = shopper(&s.db, "ned@example.com").await;
        let ola = shopper(&s.db, "ola@example.com").await;
        fill_cart(&s.db, &ned, &s.product, None, 1).await;
        fill_cart(&s.db, &ola, &s.product, None, 1).await;

        let mut a = request(&ned);
        a.idempotency_key = Some("shared".to_string());
        let mut b = request(&ola);
        b.idempotency_key = Some("shared".to_string());

        assert!(s.engine.create(a).await.unwrap().created);
        assert!(s.engine.create(b).await.unwrap().created);
    }

    // -------------------------------------------------------------------------
    // Races (file-backed database, several connections)
    // -------------------------------------------------------------------------

    async fn file_store(dir: &tempfile::TempDir) -> Store {
        let db = Database::new(DbConfig::new(dir.path().join("race.db")).max_connections(5))
            .await
            .unwrap();
        open_store(db).await
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_race_for_last_unit_sells_once() {
        let dir = tempfile::tempdir().unwrap();
        let s = file_store(&dir).await;
        s.db.products().set_quantity(&s.product.id, 1).await.unwrap();

        let pam = shopper(&s.db, "pam@example.com").await;
        let quinn = shopper(&s.db, "quinn@example.com").await;
        fill_cart(&s.db, &pam, &s.product, None, 1).await;
        fill_cart(&s.db, &quinn, &s.product, None, 1).await;

        let a = tokio::spawn({
            let engine = s.engine.clone();
            let req = request(&pam);
            async move { engine.create(req).await }
        });
        let b = tokio::spawn({
            let engine = s.engine.clone();
            let req = request(&quinn);
            async move { engine.create(req).await }
        });
        let results = [a.await.unwrap(), b.await.unwrap()];

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        let loser = results.iter().find_map(|r| r.as_ref().err()).unwrap();
        assert!(matches!(rejection(loser), CoreError::InsufficientStock { .. }));
        assert_eq!(stock_of(&s.db, &s.product.id, &s.variant.id).await.0, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_race_for_last_coupon_use() {
        let dir = tempfile::tempdir().unwrap();
        let s = file_store(&dir).await;
        let mut c = coupon("LASTONE", DiscountType::Fixed, dec!(20000));
        c.usage_limit = Some(1);
        s.db.coupons().insert(&c).await.unwrap();

        let rae = shopper(&s.db, "rae@example.com").await;
        let sid = shopper(&s.db, "sid@example.com").await;
        fill_cart(&s.db, &rae, &s.product, None, 1).await;
        fill_cart(&s.db, &sid, &s.product, None, 1).await;

        let spawn = |shopper: &Shopper| {
            let engine = s.engine.clone();
            let mut req = request(shopper);
            req.coupon_id = Some(c.id.clone());
            tokio::spawn(async move { engine.create(req).await })
        };
        let a = spawn(&rae);
        let b = spawn(&sid);
        let results = [a.await.unwrap(), b.await.unwrap()];

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        let loser = results.iter().find_map(|r| r.as_ref().err()).unwrap();
        assert_eq!(rejection(loser), &CoreError::CouponExhausted("LASTONE".to_string()));
        assert_eq!(s.db.coupons().get_by_id(&c.id).await.unwrap().unwrap().used_count, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_race_with_same_idempotency_key_creates_one_order() {
        let dir = tempfile::tempdir().unwrap();
        let s = file_store(&dir).await;
        let tia = shopper(&s.db, "tia@example.com").await;
        fill_cart(&s.db, &tia, &s.product, None, 1).await;

        let mut req = request(&tia);
        req.idempotency_key = Some("double-click".to_string());

        let a = tokio::spawn({
            let engine = s.engine.clone();
            let req = req.clone();
            async move { engine.create(req).await }
        });
        let b = tokio::spawn({
            let engine = s.engine.clone();
            async move { engine.create(req).await }
        });
        let a = a.await.unwrap().unwrap();
        let b = b.await.unwrap().unwrap();

        assert_eq!(a.order.id, b.order.id);
        assert_eq!([a.created, b.created].iter().filter(|c| **c).count(), 1);
        assert_eq!(s.db.orders().count_for_user(&tia.user_id).await.unwrap(), 1);
        assert_eq!(stock_of(&s.db, &s.product.id, &s.variant.id).await.0, 9);
    }
}
