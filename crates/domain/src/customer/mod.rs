//! Customer accounts, addresses, cards, carts and orders.

mod service;

pub use service::CustomerService;
