//! Cart routes.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    response::Response,
    Json,
};
use serde::{Deserialize, Serialize};

use stitch_checkout::{cache::keys, AddCartItem};
use stitch_core::{Cart, Money};

use super::cached_json;
use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// A cart with its derived totals.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartView {
    #[serde(flatten)]
    pub cart: Cart,
    pub subtotal: Money,
    pub total_quantity: i64,
}

impl From<Cart> for CartView {
    fn from(cart: Cart) -> Self {
        CartView {
            subtotal: cart.subtotal(),
            total_quantity: cart.total_quantity(),
            cart,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddItemBody {
    pub product_id: String,
    pub size: Option<String>,
    pub color: Option<String>,
    pub quantity: i64,
}

#[derive(Debug, Deserialize)]
pub struct UpdateItemBody {
    pub quantity: i64,
}

fn invalid_body(rejection: JsonRejection) -> ApiError {
    ApiError::InvalidRequest(rejection.body_text())
}

/// `GET /cart`
pub async fn show(State(state): State<AppState>, user: AuthUser) -> ApiResult<Response> {
    let key = keys::cart(&user.user_id);
    let ttl = state.config().cart_cache_ttl();

    cached_json(&state, &key, ttl, async {
        state
            .carts()
            .get(&user.user_id)
            .await
            .map(CartView::from)
            .map_err(ApiError::from)
    })
    .await
}

/// `POST /cart/items`
pub async fn add_item(
    State(state): State<AppState>,
    user: AuthUser,
    body: Result<Json<AddItemBody>, JsonRejection>,
) -> ApiResult<Json<CartView>> {
    let Json(body) = body.map_err(invalid_body)?;

    let cart = state
        .carts()
        .add_item(
            &user.user_id,
            AddCartItem {
                product_id: body.product_id,
                size: body.size,
                color: body.color,
                quantity: body.quantity,
            },
        )
        .await?;
    Ok(Json(cart.into()))
}

/// `PATCH /cart/items/{id}`
pub async fn update_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path(item_id): Path<String>,
    body: Result<Json<UpdateItemBody>, JsonRejection>,
) -> ApiResult<Json<CartView>> {
    let Json(body) = body.map_err(invalid_body)?;

    let cart = state
        .carts()
        .update_quantity(&user.user_id, &item_id, body.quantity)
        .await?;
    Ok(Json(cart.into()))
}

/// `DELETE /cart/items/{id}`
pub async fn remove_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path(item_id): Path<String>,
) -> ApiResult<Json<CartView>> {
    let cart = state.carts().remove_item(&user.user_id, &item_id).await?;
    Ok(Json(cart.into()))
}
