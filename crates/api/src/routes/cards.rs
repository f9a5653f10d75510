//! Saved payment cards of the authenticated customer.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use common::{CardId, CreditCard, NewCreditCard};
use serde::Serialize;
use storage::Store;

use super::{AppState, Created};
use crate::auth::AuthUser;
use crate::error::{ApiError, Json, Path};

/// Card as shown to its owner: masked number, no CVC.
#[derive(Debug, Serialize)]
pub struct CardResponse {
    pub id: CardId,
    pub name: String,
    pub number: String,
    pub expiry: String,
}

impl From<CreditCard> for CardResponse {
    fn from(card: CreditCard) -> Self {
        Self {
            id: card.id,
            number: card.masked_number(),
            name: card.name,
            expiry: card.expiry,
        }
    }
}

/// POST /customers/cards
#[tracing::instrument(skip_all, fields(customer_id = %caller.id))]
pub async fn create<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    caller: AuthUser,
    Json(card): Json<NewCreditCard>,
) -> Result<(StatusCode, Json<Created<CardId>>), ApiError> {
    let id = state.customers.save_credit_card(caller.id, &card).await?;
    Ok((StatusCode::CREATED, Json(Created { id })))
}

/// GET /customers/cards
#[tracing::instrument(skip_all, fields(customer_id = %caller.id))]
pub async fn list<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    caller: AuthUser,
) -> Result<Json<Vec<CardResponse>>, ApiError> {
    let cards = state.customers.credit_cards(caller.id).await?;
    Ok(Json(cards.into_iter().map(CardResponse::from).collect()))
}

/// DELETE /customers/cards/{id}
#[tracing::instrument(skip_all, fields(customer_id = %caller.id, card_id = %id))]
pub async fn delete<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    caller: AuthUser,
    Path(id): Path<CardId>,
) -> Result<StatusCode, ApiError> {
    state.customers.delete_credit_card(caller.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
