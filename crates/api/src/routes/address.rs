//! Shipping address of a customer.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use common::{Address, UserId};
use storage::Store;

use super::AppState;
use crate::auth::AuthUser;
use crate::error::{ApiError, Json, Path};

/// PUT /customers/{id}/address: creates the address, or updates it when
/// the body carries the id of the customer's current address.
#[tracing::instrument(skip_all, fields(customer_id = %id))]
pub async fn put<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    caller: AuthUser,
    Path(id): Path<UserId>,
    Json(address): Json<Address>,
) -> Result<Json<Address>, ApiError> {
    caller.ensure_owner(id)?;
    let address = state.customers.update_customer_address(id, &address).await?;
    Ok(Json(address))
}

/// GET /customers/{id}/address: `null` when the customer has none.
#[tracing::instrument(skip_all, fields(customer_id = %id))]
pub async fn get<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    caller: AuthUser,
    Path(id): Path<UserId>,
) -> Result<Json<Option<Address>>, ApiError> {
    caller.ensure_owner(id)?;
    Ok(Json(state.customers.customer_address(id).await?))
}

/// DELETE /customers/{id}/address
#[tracing::instrument(skip_all, fields(customer_id = %id))]
pub async fn delete<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    caller: AuthUser,
    Path(id): Path<UserId>,
) -> Result<StatusCode, ApiError> {
    caller.ensure_owner(id)?;
    state.customers.delete_customer_address(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
