//! HTTP API server for the storefront backend.
//!
//! Provides REST endpoints for the catalog, customer accounts, addresses,
//! saved cards, carts and orders, with bearer token authentication,
//! structured logging (tracing) and Prometheus metrics.

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;

use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::header::X_CONTENT_TYPE_OPTIONS;
use axum::http::{HeaderValue, StatusCode};
use axum::middleware;
use axum::response::Response;
use axum::routing::{delete, get, post};
use domain::{Argon2Hasher, CustomerService, ProductService};
use metrics_exporter_prometheus::PrometheusHandle;
use storage::Store;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any as AnyOrigin, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use auth::TokenCodec;
use routes::AppState;

/// Largest accepted request body.
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Builds the shared state from a store and the token settings.
pub fn create_state<S: Store>(
    store: S,
    tokens: TokenCodec,
    hasher: Argon2Hasher,
    page_size: i64,
) -> Arc<AppState<S>> {
    Arc::new(AppState {
        products: ProductService::new(store.clone()),
        customers: CustomerService::with_hasher(store, hasher),
        tokens,
        page_size,
    })
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: Store>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
    request_timeout: Duration,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::render))
        .with_state(metrics_handle);

    let tokens = state.tokens.clone();

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/customers", post(routes::customers::create::<S>))
        .route(
            "/customers/cards",
            get(routes::cards::list::<S>).post(routes::cards::create::<S>),
        )
        .route("/customers/cards/{id}", delete(routes::cards::delete::<S>))
        .route(
            "/customers/{id}/address",
            get(routes::address::get::<S>)
                .put(routes::address::put::<S>)
                .delete(routes::address::delete::<S>),
        )
        .route(
            "/customers/{id}/cart",
            get(routes::cart::list::<S>).post(routes::cart::add::<S>),
        )
        .route("/customers/{id}/cart/count", get(routes::cart::count::<S>))
        .route(
            "/customers/{id}/orders",
            get(routes::orders::list::<S>).post(routes::orders::create::<S>),
        )
        .route(
            "/users/authentication",
            post(routes::users::authenticate::<S>),
        )
        .route(
            "/users/{id}",
            get(routes::users::get::<S>).put(routes::users::update::<S>),
        )
        .route(
            "/products",
            get(routes::products::list::<S>).post(routes::products::create::<S>),
        )
        .route("/products/{id}", get(routes::products::get::<S>))
        .route(
            "/categories",
            get(routes::categories::list::<S>).post(routes::categories::create::<S>),
        )
        .with_state(state)
        .layer(middleware::from_fn_with_state(tokens, auth::authenticate))
        .merge(metrics_router)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(SetResponseHeaderLayer::overriding(
            X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(TimeoutLayer::new(request_timeout))
        .layer(
            CorsLayer::new()
                .allow_origin(AnyOrigin)
                .allow_methods(AnyOrigin)
                .allow_headers(AnyOrigin),
        )
        .layer(TraceLayer::new_for_http())
}

fn panic_response(_panic: Box<dyn Any + Send + 'static>) -> Response {
    tracing::error!("request handler panicked");
    error::error_response(StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
}
