//! Domain layer for the storefront backend.
//!
//! This crate provides the services the HTTP layer calls into:
//! - `ProductService` for catalog search and management
//! - `CustomerService` for accounts, addresses, cards, carts and orders
//! - `DomainError`, a structured error with a kind, context frames and an
//!   optional client-facing message

pub mod customer;
pub mod error;
pub mod password;
pub mod product;
mod tx;
pub mod validation;

pub use customer::CustomerService;
pub use error::{DomainError, ErrorKind, Frame, ResultExt};
pub use password::{Argon2Hasher, PasswordError};
pub use product::ProductService;
