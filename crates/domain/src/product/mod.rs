//! Catalog operations.

mod service;

pub use service::ProductService;
