//! Shared identifiers and data model for the storefront backend.
//!
//! Every layer (storage adapters, domain services, HTTP handlers) speaks in
//! these types, so they carry serde derives but no behaviour beyond simple
//! accessors.

pub mod order;
pub mod product;
pub mod types;
pub mod user;

pub use order::{CartItem, NewCartItem, NewOrder, Order};
pub use product::{Category, NewProduct, Price, Product, ProductFilter};
pub use types::{AddressId, CardId, CategoryId, Money, OrderId, Page, ProductId, RoleId, UserId};
pub use user::{Address, CreditCard, NewCreditCard, NewCustomer, ProfileUpdate, User};
