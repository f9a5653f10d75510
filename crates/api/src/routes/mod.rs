//! HTTP handlers grouped by resource.

pub mod address;
pub mod cards;
pub mod cart;
pub mod categories;
pub mod customers;
pub mod health;
pub mod metrics;
pub mod orders;
pub mod products;
pub mod users;

use domain::{CustomerService, ProductService};
use serde::Serialize;

use crate::auth::TokenCodec;

/// Shared application state accessible from all handlers.
pub struct AppState<S> {
    pub products: ProductService<S>,
    pub customers: CustomerService<S>,
    pub tokens: TokenCodec,
    /// Page size used when a product listing does not ask for one.
    pub page_size: i64,
}

/// Body returned by endpoints that create a resource.
#[derive(Debug, Serialize)]
pub struct Created<T> {
    pub id: T,
}
