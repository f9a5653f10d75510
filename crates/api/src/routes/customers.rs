//! Customer signup.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use common::{NewCustomer, UserId};
use serde::Deserialize;
use storage::Store;

use super::{AppState, Created};
use crate::error::{ApiError, Json};

/// Signup body. A client-supplied `roles` field is ignored.
#[derive(Deserialize)]
pub struct CreateCustomerRequest {
    #[serde(flatten)]
    pub customer: NewCustomer,
    pub password: String,
}

/// POST /customers: registers a customer with the customer role.
#[tracing::instrument(skip_all, fields(email = %req.customer.email))]
pub async fn create<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<CreateCustomerRequest>,
) -> Result<(StatusCode, Json<Created<UserId>>), ApiError> {
    let id = state
        .customers
        .create_customer(&req.customer, &req.password)
        .await?;
    Ok((StatusCode::CREATED, Json(Created { id })))
}
