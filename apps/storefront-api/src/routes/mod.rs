//! HTTP routes.
//!
//! ```text
//! GET    /health              liveness + database check
//! POST   /orders              checkout (Idempotency-Key header optional)
//! GET    /orders              caller's orders, newest first (cached)
//! GET    /orders/{id}         one order owned by the caller
//! GET    /cart                caller's cart (cached)
//! POST   /cart/items          add a product
//! PATCH  /cart/items/{id}     set quantity (0 removes)
//! DELETE /cart/items/{id}     remove a line
//! ```

pub mod cart;
pub mod orders;

use std::future::Future;
use std::time::Duration;

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::json;
use tokio::time::Instant;
use tower_http::trace::TraceLayer;
use tracing::{debug, warn};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Builds the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/orders", get(orders::list).post(orders::create))
        .route("/orders/{id}", get(orders::show))
        .route("/cart", get(cart::show))
        .route("/cart/items", post(cart::add_item))
        .route(
            "/cart/items/{id}",
            axum::routing::patch(cart::update_item).delete(cart::remove_item),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Response {
    if state.db().health_check().await {
        Json(json!({ "status": "ok" })).into_response()
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "unavailable" })),
        )
            .into_response()
    }
}

/// Loads slower than this are served but not cached.
const CACHE_FILL_BUDGET: Duration = Duration::from_millis(250);

/// Serves `key` from the cache, or loads, caches and serves it.
///
/// Cache failures are logged and otherwise ignored.
///
/// A load that read rows before a checkout committed can land in the cache
/// after that checkout's eviction ran, leaving a stale entry until `ttl`.
/// Skipping the fill for slow loads keeps that window to
/// [`CACHE_FILL_BUDGET`].
pub(crate) async fn cached_json<T, F>(
    state: &AppState,
    key: &str,
    ttl: Duration,
    load: F,
) -> ApiResult<Response>
where
    T: Serialize,
    F: Future<Output = ApiResult<T>>,
{
    match state.cache().get(key).await {
        Ok(Some(body)) => return Ok(json_body(body)),
        Ok(None) => {}
        Err(err) => warn!(key = %key, error = %err, "Cache read failed"),
    }

    let started = Instant::now();
    let value = load.await?;
    let elapsed = started.elapsed();
    let body = serde_json::to_string(&value)
        .map_err(|e| ApiError::Internal(format!("Failed to serialize response: {}", e)))?;

    if elapsed > CACHE_FILL_BUDGET {
        debug!(key = %key, elapsed_ms = elapsed.as_millis() as u64, "Slow load; cache fill skipped");
    } else if let Err(err) = state.cache().set_with_ttl(key, &body, ttl).await {
        warn!(key = %key, error = %err, "Cache write failed");
    }

    Ok(json_body(body))
}

fn json_body(body: String) -> Response {
    ([(header::CONTENT_TYPE, "application/json")], body).into_response()
}

// =============================================================================
// Test Support
// =============================================================================
