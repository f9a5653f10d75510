//! Persistence adapters for the storefront backend.
//!
//! The store traits in [`store`] describe every operation the domain
//! services need. Writes that must be grouped take a transaction obtained
//! from [`Transactional::begin`]; because every store trait extends
//! `Transactional`, a backend shares one transaction type across its product,
//! user, address and order stores.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod query;
pub mod store;

pub use error::{Result, StorageError};
pub use memory::{FailPoint, InMemoryStore, InMemoryTx};
pub use postgres::{PgTx, PostgresStore};
pub use query::ProductQuery;
pub use store::{AddressStore, OrderStore, ProductStore, Store, Transaction, Transactional, UserStore};
