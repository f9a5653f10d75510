//! Shopping cart.

use std::sync::Arc;

use axum::extract::State;
use common::{CartItem, NewCartItem, UserId};
use serde::Serialize;
use storage::Store;

use super::AppState;
use crate::auth::AuthUser;
use crate::error::{ApiError, Json, Path};

#[derive(Serialize)]
pub struct CountResponse {
    pub count: i64,
}

/// GET /customers/{id}/cart
#[tracing::instrument(skip_all, fields(customer_id = %id))]
pub async fn list<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    caller: AuthUser,
    Path(id): Path<UserId>,
) -> Result<Json<Vec<CartItem>>, ApiError> {
    caller.ensure_owner(id)?;
    Ok(Json(state.customers.cart_items(id).await?))
}

/// POST /customers/{id}/cart: adds the items and returns the whole cart.
#[tracing::instrument(skip_all, fields(customer_id = %id, items = items.len()))]
pub async fn add<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    caller: AuthUser,
    Path(id): Path<UserId>,
    Json(items): Json<Vec<NewCartItem>>,
) -> Result<Json<Vec<CartItem>>, ApiError> {
    caller.ensure_owner(id)?;
    state.customers.add_cart_items(id, &items).await?;
    Ok(Json(state.customers.cart_items(id).await?))
}

/// GET /customers/{id}/cart/count: total quantity in the cart.
#[tracing::instrument(skip_all, fields(customer_id = %id))]
pub async fn count<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    caller: AuthUser,
    Path(id): Path<UserId>,
) -> Result<Json<CountResponse>, ApiError> {
    caller.ensure_owner(id)?;
    let count = state.customers.cart_item_count(id).await?;
    Ok(Json(CountResponse { count }))
}
