//! Order routes: checkout and order reads.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{HeaderMap, StatusCode},
    response::Response,
    Json,
};
use serde::Deserialize;
use tracing::warn;

use stitch_checkout::{cache::keys, CheckoutRequest};
use stitch_core::{CoreError, Order, PaymentMethod};

use super::cached_json;
use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

pub const IDEMPOTENCY_KEY_HEADER: &str = "idempotency-key";

/// Body of `POST /orders`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutBody {
    pub shipping_address_id: String,
    pub billing_address_id: Option<String>,
    pub payment_method: PaymentMethod,
    pub notes: Option<String>,
    pub coupon_id: Option<String>,
}

/// `POST /orders`
///
/// 201 with the new order, or 200 with the existing one when the
/// idempotency key was already used by this customer.
pub async fn create(
    State(state): State<AppState>,
    user: AuthUser,
    headers: HeaderMap,
    body: Result<Json<CheckoutBody>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Order>)> {
    let Json(body) = body.map_err(|rejection| ApiError::InvalidRequest(rejection.body_text()))?;

    let idempotency_key = headers
        .get(IDEMPOTENCY_KEY_HEADER)
        .map(|value| {
            value
                .to_str()
                .map(str::to_string)
                .map_err(|_| ApiError::InvalidRequest("Idempotency-Key must be visible ASCII".to_string()))
        })
        .transpose()?;

    let request = CheckoutRequest {
        user_id: user.user_id.clone(),
        shipping_address_id: body.shipping_address_id,
        billing_address_id: body.billing_address_id,
        payment_method: body.payment_method,
        notes: body.notes,
        coupon_id: body.coupon_id,
        idempotency_key,
    };

    let budget = state.config().checkout_timeout();
    let outcome = match tokio::time::timeout(budget, state.checkout().create(request)).await {
        Ok(result) => result?,
        Err(_) => {
            warn!(user_id = %user.user_id, timeout_secs = budget.as_secs(), "Checkout timed out");
            return Err(ApiError::CheckoutTimeout);
        }
    };

    let status = if outcome.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(outcome.order)))
}

/// `GET /orders`
pub async fn list(State(state): State<AppState>, user: AuthUser) -> ApiResult<Response> {
    let key = keys::order_list(&user.user_id);
    let ttl = state.config().order_list_cache_ttl();

    cached_json(&state, &key, ttl, async {
        state
            .db()
            .orders()
            .list_for_user(&user.user_id)
            .await
            .map_err(ApiError::from)
    })
    .await
}

/// `GET /orders/{id}`
pub async fn show(
    State(state): State<AppState>,
    user: AuthUser,
    Path(order_id): Path<String>,
) -> ApiResult<Json<Order>> {
    state
        .db()
        .orders()
        .get_for_user(&user.user_id, &order_id)
        .await?
        .map(Json)
        .ok_or_else(|| CoreError::OrderNotFound(order_id).into())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::http::Method;
    use serde_json::{json, Value};

    use super::*;
    use crate::cache::CacheHandles;
    use crate::routes::test_support::{spawn_app, MemoryCache, TestApp};

    async fn add_to_cart(app: &TestApp, quantity: i64) {
        let (status, _) = app
            .send(
                Method::POST,
                "/cart/items",
                Some(json!({
                    "productId": app.product.id,
                    "size": app.variant.size,
                    "color": app.variant.color,
                    "quantity": quantity,
                })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
    }

    fn checkout_body(app: &TestApp) -> Value {
        json!({
            "shippingAddressId": app.address_id,
            "paymentMethod": "COD",
        })
    }

    #[tokio::test]
    async fn test_checkout_returns_201_with_breakdown() {
        let app = spawn_app(CacheHandles::noop()).await;
        add_to_cart(&app, 2).await;

        let (status, order) = app.send(Method::POST, "/orders", Some(checkout_body(&app))).await;

        assert_eq!(status, StatusCode::CREATED);
        assert!(order["orderNumber"].as_str().unwrap().starts_with("ORD-"));
        assert_eq!(order["status"], "PENDING");
        assert_eq!(order["paymentStatus"], "PENDING");
        assert_eq!(order["paymentMethod"], "COD");
        assert_eq!(order["items"].as_array().unwrap().len(), 1);
        assert_eq!(order["subtotal"].as_str().unwrap().parse::<f64>().unwrap(), 500_000.0);
        assert_eq!(order["total"].as_str().unwrap().parse::<f64>().unwrap(), 580_000.0);
    }

    #[tokio::test]
    async fn test_empty_cart_is_400_with_code() {
        let app = spawn_app(CacheHandles::noop()).await;
        let (status, body) = app.send(Method::POST, "/orders", Some(checkout_body(&app))).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "EMPTY_CART");
        assert!(body["message"].is_string());
    }

    #[tokio::test]
    async fn test_disabled_payment_method_is_400() {
        let app = spawn_app(CacheHandles::noop()).await;
        add_to_cart(&app, 1).await;

        let (status, body) = app
            .send(
                Method::POST,
                "/orders",
                Some(json!({ "shippingAddressId": app.address_id, "paymentMethod": "CREDIT_CARD" })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "PAYMENT_METHOD_DISABLED");
    }

    #[tokio::test]
    async fn test_unknown_coupon_and_address_codes() {
        let app = spawn_app(CacheHandles::noop()).await;
        add_to_cart(&app, 1).await;

        let (status, body) = app
            .send(
                Method::POST,
                "/orders",
                Some(json!({
                    "shippingAddressId": app.address_id,
                    "paymentMethod": "COD",
                    "couponId": "SUMMER10",
                })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "COUPON_NOT_FOUND");

        let (status, body) = app
            .send(
                Method::POST,
                "/orders",
                Some(json!({ "shippingAddressId": "addr-123", "paymentMethod": "COD" })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "ADDRESS_NOT_FOUND");
    }

    #[tokio::test]
    async fn test_malformed_body_is_400() {
        let app = spawn_app(CacheHandles::noop()).await;

        let (status, body) = app
            .send(
                Method::POST,
                "/orders",
                Some(json!({ "shippingAddressId": app.address_id, "paymentMethod": "BITCOIN" })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "INVALID_REQUEST");
    }

    #[tokio::test]
    async fn test_stock_shortfall_is_400() {
        let app = spawn_app(CacheHandles::noop()).await;
        add_to_cart(&app, 3).await;
        app.db.products().set_quantity(&app.product.id, 2).await.unwrap();

        let (status, body) = app.send(Method::POST, "/orders", Some(checkout_body(&app))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "INSUFFICIENT_STOCK");
    }

    #[tokio::test]
    async fn test_idempotency_key_replay_is_200() {
        let app = spawn_app(CacheHandles::noop()).await;
        add_to_cart(&app, 1).await;
        let headers = [(IDEMPOTENCY_KEY_HEADER, "retry-1")];

        let (first_status, first) = app
            .send_with(Method::POST, "/orders", Some(checkout_body(&app)), &headers)
            .await;
        let (second_status, second) = app
            .send_with(Method::POST, "/orders", Some(checkout_body(&app)), &headers)
            .await;

        assert_eq!(first_status, StatusCode::CREATED);
        assert_eq!(second_status, StatusCode::OK);
        assert_eq!(first["id"], second["id"]);
    }

    #[tokio::test]
    async fn test_show_order_and_foreign_order_is_404() {
        let app = spawn_app(CacheHandles::noop()).await;
        add_to_cart(&app, 1).await;
        let (_, order) = app.send(Method::POST, "/orders", Some(checkout_body(&app))).await;
        let id = order["id"].as_str().unwrap();

        let (status, shown) = app.send(Method::GET, &format!("/orders/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(shown["orderNumber"], order["orderNumber"]);

        let (status, body) = app
            .send(Method::GET, "/orders/00000000-0000-4000-8000-000000000000", None)
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "ORDER_NOT_FOUND");
    }

    #[tokio::test]
    async fn test_order_list_cache_is_invalidated_by_checkout() {
        let app = spawn_app(CacheHandles::new(MemoryCache::default())).await;

        let (status, list) = app.send(Method::GET, "/orders", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(list.as_array().unwrap().len(), 0);

        add_to_cart(&app, 1).await;
        let (status, _) = app.send(Method::POST, "/orders", Some(checkout_body(&app))).await;
        assert_eq!(status, StatusCode::CREATED);

        // Invalidation runs in the background.
        let mut seen = 0;
        for _ in 0..100 {
            let (_, list) = app.send(Method::GET, "/orders", None).await;
            seen = list.as_array().unwrap().len();
            if seen == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(seen, 1);
    }
}
