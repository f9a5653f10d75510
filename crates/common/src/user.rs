//! Accounts, addresses and saved payment cards.

use serde::{Deserialize, Serialize};

use crate::{AddressId, CardId, RoleId, UserId};

/// A stored user. The password hash is never part of this type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub roles: Vec<RoleId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address_id: Option<AddressId>,
}

/// Signup payload. Roles are assigned by the service, not the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCustomer {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

/// Mutable profile fields of a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileUpdate {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

/// Shipping address. `id` is `None` until the address has been stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    #[serde(default)]
    pub id: Option<AddressId>,
    pub country: String,
    pub state: String,
    pub city: String,
    pub postal_code: String,
    /// Street line.
    pub address: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditCard {
    pub id: CardId,
    pub customer_id: UserId,
    pub name: String,
    pub number: String,
    pub cvc: String,
    /// `MM/YY`.
    pub expiry: String,
}

impl CreditCard {
    /// Card number with everything but the last four digits hidden.
    pub fn masked_number(&self) -> String {
        let digits: Vec<char> = self.number.chars().collect();
        let visible = digits.len().saturating_sub(4);
        let last_four: String = digits.iter().skip(visible).collect();
        format!("**** {last_four}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCreditCard {
    pub name: String,
    pub number: String,
    pub cvc: String,
    pub expiry: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masked_number_keeps_last_four() {
        let card = CreditCard {
            id: CardId::new(1),
            customer_id: UserId::new(1),
            name: "Personal".to_string(),
            number: "4242424242421234".to_string(),
            cvc: "123".to_string(),
            expiry: "08/29".to_string(),
        };
        assert_eq!(card.masked_number(), "**** 1234");
    }

    #[test]
    fn address_id_is_optional_on_input() {
        let address: Address = serde_json::from_value(serde_json::json!({
            "country": "NL",
            "state": "NH",
            "city": "Amsterdam",
            "postal_code": "1011",
            "address": "Damrak 1"
        }))
        .unwrap();
        assert_eq!(address.id, None);
    }
}
