//! Orders of a customer.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use common::{NewOrder, Order, OrderId, UserId};
use storage::Store;

use super::{AppState, Created};
use crate::auth::AuthUser;
use crate::error::{ApiError, Json, Path};

/// GET /customers/{id}/orders
#[tracing::instrument(skip_all, fields(customer_id = %id))]
pub async fn list<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    caller: AuthUser,
    Path(id): Path<UserId>,
) -> Result<Json<Vec<Order>>, ApiError> {
    caller.ensure_owner(id)?;
    Ok(Json(state.customers.orders_by_customer(id).await?))
}

/// POST /customers/{id}/orders: places an order and decrements stock.
#[tracing::instrument(skip_all, fields(customer_id = %id, product_id = %order.product_id))]
pub async fn create<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    caller: AuthUser,
    Path(id): Path<UserId>,
    Json(order): Json<NewOrder>,
) -> Result<(StatusCode, Json<Created<OrderId>>), ApiError> {
    caller.ensure_owner(id)?;
    let order_id = state.customers.create_order(id, &order).await?;
    Ok((StatusCode::CREATED, Json(Created { id: order_id })))
}
