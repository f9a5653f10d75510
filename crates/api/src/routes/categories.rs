//! Product categories.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use common::{Category, CategoryId};
use serde::Deserialize;
use storage::Store;

use super::{AppState, Created};
use crate::auth::AuthUser;
use crate::error::{ApiError, Json};

#[derive(Deserialize)]
pub struct CreateCategoryRequest {
    pub name: String,
}

/// GET /categories
#[tracing::instrument(skip_all)]
pub async fn list<S: Store>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<Category>>, ApiError> {
    Ok(Json(state.products.categories().await?))
}

/// POST /categories: admin only.
#[tracing::instrument(skip_all, fields(name = %req.name))]
pub async fn create<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    caller: AuthUser,
    Json(req): Json<CreateCategoryRequest>,
) -> Result<(StatusCode, Json<Created<CategoryId>>), ApiError> {
    caller.require_admin()?;
    let id = state.products.create_category(&req.name).await?;
    Ok((StatusCode::CREATED, Json(Created { id })))
}
