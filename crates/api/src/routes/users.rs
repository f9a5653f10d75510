//! Profile and login endpoints.

use std::sync::Arc;

use axum::extract::State;
use common::{ProfileUpdate, User, UserId};
use serde::{Deserialize, Serialize};
use storage::Store;

use super::AppState;
use crate::auth::AuthUser;
use crate::error::{ApiError, Json, Path};

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: User,
}

/// GET /users/{id}
#[tracing::instrument(skip_all, fields(user_id = %id))]
pub async fn get<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    caller: AuthUser,
    Path(id): Path<UserId>,
) -> Result<Json<User>, ApiError> {
    caller.ensure_owner(id)?;
    Ok(Json(state.customers.user(id).await?))
}

/// PUT /users/{id}: replaces the profile fields and returns the stored user.
#[tracing::instrument(skip_all, fields(user_id = %id))]
pub async fn update<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    caller: AuthUser,
    Path(id): Path<UserId>,
    Json(profile): Json<ProfileUpdate>,
) -> Result<Json<User>, ApiError> {
    caller.ensure_owner(id)?;
    Ok(Json(state.customers.update_user(id, &profile).await?))
}

/// POST /users/authentication: exchanges credentials for a bearer token.
#[tracing::instrument(skip_all)]
pub async fn authenticate<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let (matched, id) = state
        .customers
        .email_match_password(&req.email, &req.password)
        .await?;
    if !matched {
        metrics::counter!("authentication_failures_total").increment(1);
        return Err(ApiError::Unauthorized(
            "invalid email or password".to_string(),
        ));
    }

    let user = state.customers.user(id).await?;
    let token = state
        .tokens
        .issue(&user)
        .map_err(|e| ApiError::Internal(format!("issuing token for user {id}: {e}")))?;
    tracing::info!(user_id = %id, "user authenticated");
    Ok(Json(LoginResponse { token, user }))
}
