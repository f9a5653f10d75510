//! Orders and cart contents.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{AddressId, Money, OrderId, Product, ProductId, UserId};

/// A placed order with the product it refers to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub customer_id: UserId,
    pub product: Product,
    /// Price per unit charged when the order was placed.
    pub unit_price: Money,
    pub quantity: i32,
    /// Cleared when the customer later deletes the address.
    pub shipping_address_id: Option<AddressId>,
    pub ordered_at: DateTime<Utc>,
}

/// Order request: which product and how many.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrder {
    pub product_id: ProductId,
    pub quantity: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub product: Product,
    pub quantity: i32,
}

fn one() -> i32 {
    1
}

/// Item to add to a cart. Quantity defaults to one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCartItem {
    pub product_id: ProductId,
    #[serde(default = "one")]
    pub quantity: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cart_item_quantity_defaults_to_one() {
        let item: NewCartItem =
            serde_json::from_value(serde_json::json!({ "product_id": 9 })).unwrap();
        assert_eq!(item.product_id, ProductId::new(9));
        assert_eq!(item.quantity, 1);
    }
}
