//! Catalog browsing and product management.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use common::{CategoryId, Money, NewProduct, Product, ProductFilter, ProductId};
use serde::Deserialize;
use storage::Store;

use super::{AppState, Created};
use crate::auth::AuthUser;
use crate::error::{ApiError, Json, Path, Query};

/// Query string of `GET /products`. Prices are in cents.
#[derive(Debug, Default, Deserialize)]
pub struct ProductsQuery {
    pub category: Option<CategoryId>,
    pub q: Option<String>,
    pub page: Option<i64>,
    pub size: Option<i64>,
    #[serde(rename = "min-price")]
    pub min_price: Option<i64>,
    #[serde(rename = "max-price")]
    pub max_price: Option<i64>,
    /// Minimum discount in percent.
    pub discount: Option<i64>,
}

impl ProductsQuery {
    fn filter(&self) -> ProductFilter {
        ProductFilter {
            min_price: self.min_price.map(Money::from_cents),
            max_price: self.max_price.map(Money::from_cents),
            min_discount: self.discount,
        }
    }

    fn search_term(&self) -> Option<&str> {
        self.q.as_deref().map(str::trim).filter(|q| !q.is_empty())
    }
}

/// GET /products: one page of products matching every given criterion.
#[tracing::instrument(skip(state))]
pub async fn list<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Query(query): Query<ProductsQuery>,
) -> Result<Json<Vec<Product>>, ApiError> {
    let products = state
        .products
        .products(
            query.category,
            query.search_term(),
            query.filter(),
            query.page.unwrap_or(1),
            query.size.unwrap_or(state.page_size),
        )
        .await?;
    Ok(Json(products))
}

/// GET /products/{id}
#[tracing::instrument(skip(state))]
pub async fn get<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<ProductId>,
) -> Result<Json<Product>, ApiError> {
    Ok(Json(state.products.product(id).await?))
}

/// POST /products: admin only.
#[tracing::instrument(skip_all, fields(name = %product.name))]
pub async fn create<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    caller: AuthUser,
    Json(product): Json<NewProduct>,
) -> Result<(StatusCode, Json<Created<ProductId>>), ApiError> {
    caller.require_admin()?;
    let id = state.products.create_product(&product).await?;
    Ok((StatusCode::CREATED, Json(Created { id })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_names_match_public_parameters() {
        let query: ProductsQuery = serde_json::from_value(serde_json::json!({
            "category": 3,
            "q": "  mug ",
            "min-price": 100,
            "max-price": 900,
            "discount": 25
        }))
        .unwrap();

        assert_eq!(query.category, Some(CategoryId::new(3)));
        assert_eq!(query.search_term(), Some("mug"));
        let filter = query.filter();
        assert_eq!(filter.min_price, Some(Money::from_cents(100)));
        assert_eq!(filter.max_price, Some(Money::from_cents(900)));
        assert_eq!(filter.min_discount, Some(25));
    }

    #[test]
    fn test_blank_search_is_ignored() {
        let query = ProductsQuery {
            q: Some("   ".to_string()),
            ..ProductsQuery::default()
        };
        assert_eq!(query.search_term(), None);
    }
}
